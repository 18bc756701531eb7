use async_trait::async_trait;
use pizzeria_types::domain::order::{NewOrderItem, Order, OrderItem, OrderStatus};
use pizzeria_types::domain::user::{NewUser, User};
use pizzeria_types::ports::{OrderRepository, RepoError, UserRepository};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

const MIGRATIONS: [&str; 3] = [
    include_str!("../migrations/0001_create_users.sql"),
    include_str!("../migrations/0002_create_orders.sql"),
    include_str!("../migrations/0003_create_order_items.sql"),
];

/// SQLite adapter. Every read-then-write sequence runs inside one transaction;
/// a transaction dropped before `commit` rolls back.
#[derive(Clone)]
pub struct SqliteRepo {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct DbUser {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
    active: bool,
    admin: bool,
}

impl From<DbUser> for User {
    fn from(r: DbUser) -> Self {
        User {
            id: r.id,
            name: r.name,
            email: r.email,
            password_hash: r.password_hash,
            active: r.active,
            admin: r.admin,
        }
    }
}

#[derive(FromRow)]
struct DbOrder {
    id: i64,
    owner_user_id: i64,
    status: String,
    total_price: f64,
}

#[derive(FromRow)]
struct DbOrderItem {
    id: i64,
    order_id: i64,
    quantity: i64,
    flavor: String,
    size: String,
    unit_price: f64,
}

impl From<DbOrderItem> for OrderItem {
    fn from(r: DbOrderItem) -> Self {
        OrderItem {
            id: r.id,
            quantity: r.quantity,
            flavor: r.flavor,
            size: r.size,
            unit_price: r.unit_price,
            order_id: r.order_id,
        }
    }
}

impl DbOrder {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepoError> {
        let status =
            OrderStatus::from_str(&self.status).map_err(|e| RepoError::DbError(e.to_string()))?;
        Ok(Order {
            id: self.id,
            owner_user_id: self.owner_user_id,
            status,
            total_price: self.total_price,
            items,
        })
    }
}

fn db_err(e: sqlx::Error) -> RepoError {
    RepoError::DbError(e.to_string())
}

const USER_COLUMNS: &str = "id, name, email, password_hash, active, admin";
const ITEM_COLUMNS: &str = "id, order_id, quantity, flavor, size, unit_price";

async fn fetch_order(conn: &mut SqliteConnection, id: i64) -> Result<Option<Order>, RepoError> {
    let row: Option<DbOrder> =
        sqlx::query_as("SELECT id, owner_user_id, status, total_price FROM orders WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(db_err)?;
    let Some(row) = row else {
        return Ok(None);
    };
    let items: Vec<DbOrderItem> = sqlx::query_as(&format!(
        "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ? ORDER BY id"
    ))
    .bind(id)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_err)?;
    row.into_order(items.into_iter().map(OrderItem::from).collect())
        .map(Some)
}

async fn recalculate_total(conn: &mut SqliteConnection, order_id: i64) -> Result<(), RepoError> {
    sqlx::query(
        "UPDATE orders SET total_price = (
             SELECT COALESCE(SUM(unit_price * quantity), 0.0) FROM order_items WHERE order_id = ?
         ) WHERE id = ?",
    )
    .bind(order_id)
    .bind(order_id)
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;
    Ok(())
}

impl SqliteRepo {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        for ddl in MIGRATIONS {
            sqlx::query(ddl).execute(&pool).await?;
        }
        tracing::debug!(url = database_url, "sqlite schema ready");

        Ok(Self { pool })
    }
}

#[async_trait]
impl UserRepository for SqliteRepo {
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError> {
        let res = sqlx::query(
            "INSERT INTO users (name, email, password_hash, active, admin) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.active)
        .bind(user.admin)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RepoError::Conflict(format!("email {} already registered", user.email))
            }
            other => db_err(other),
        })?;
        Ok(user.into_user(res.last_insert_rowid()))
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, RepoError> {
        let row: Option<DbUser> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(row.map(User::from))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let row: Option<DbUser> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(row.map(User::from))
    }

    async fn list_users(&self) -> Result<Vec<User>, RepoError> {
        let rows: Vec<DbUser> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn delete_user(&self, id: i64) -> Result<bool, RepoError> {
        // orders and order_items go with the user through ON DELETE CASCADE
        let res = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl OrderRepository for SqliteRepo {
    async fn create(&self, owner_user_id: i64) -> Result<Order, RepoError> {
        let res = sqlx::query("INSERT INTO orders (owner_user_id, status, total_price) VALUES (?, ?, 0)")
            .bind(owner_user_id)
            .bind(OrderStatus::Pending.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(Order::new(res.last_insert_rowid(), owner_user_id))
    }

    async fn get(&self, id: i64) -> Result<Option<Order>, RepoError> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        fetch_order(&mut conn, id).await
    }

    async fn list(&self) -> Result<Vec<Order>, RepoError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let rows: Vec<DbOrder> =
            sqlx::query_as("SELECT id, owner_user_id, status, total_price FROM orders ORDER BY id")
                .fetch_all(&mut *tx)
                .await
                .map_err(db_err)?;
        let items: Vec<DbOrderItem> =
            sqlx::query_as(&format!("SELECT {ITEM_COLUMNS} FROM order_items ORDER BY id"))
                .fetch_all(&mut *tx)
                .await
                .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;

        let mut by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for it in items {
            by_order.entry(it.order_id).or_default().push(it.into());
        }
        rows.into_iter()
            .map(|r| {
                let items = by_order.remove(&r.id).unwrap_or_default();
                r.into_order(items)
            })
            .collect::<Result<Vec<_>, _>>()
    }

    async fn find_by_item(&self, item_id: i64) -> Result<Option<Order>, RepoError> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        let order_id: Option<i64> =
            sqlx::query_scalar("SELECT order_id FROM order_items WHERE id = ?")
                .bind(item_id)
                .fetch_optional(&mut *conn)
                .await
                .map_err(db_err)?;
        match order_id {
            Some(order_id) => fetch_order(&mut conn, order_id).await,
            None => Ok(None),
        }
    }

    async fn add_item(
        &self,
        order_id: i64,
        item: NewOrderItem,
    ) -> Result<Option<Order>, RepoError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        // Write first so the transaction holds the write lock before it reads.
        let inserted = sqlx::query(
            "INSERT INTO order_items (order_id, quantity, flavor, size, unit_price)
             SELECT ?, ?, ?, ?, ?
             WHERE EXISTS (SELECT 1 FROM orders WHERE id = ? AND status = ?)",
        )
        .bind(order_id)
        .bind(item.quantity)
        .bind(&item.flavor)
        .bind(&item.size)
        .bind(item.unit_price)
        .bind(order_id)
        .bind(OrderStatus::Pending.as_str())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        if inserted.rows_affected() == 0 {
            return match fetch_order(&mut tx, order_id).await? {
                Some(_) => Err(RepoError::Conflict(format!(
                    "order {order_id} is not pending"
                ))),
                None => Ok(None),
            };
        }

        recalculate_total(&mut tx, order_id).await?;
        let order = fetch_order(&mut tx, order_id).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(order)
    }

    async fn remove_item(&self, item_id: i64) -> Result<Option<Order>, RepoError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let order_id: Option<i64> =
            sqlx::query_scalar("DELETE FROM order_items WHERE id = ? RETURNING order_id")
                .bind(item_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;
        let Some(order_id) = order_id else {
            return Ok(None);
        };

        recalculate_total(&mut tx, order_id).await?;
        let order = fetch_order(&mut tx, order_id).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(order)
    }

    async fn cancel(&self, id: i64) -> Result<Option<Order>, RepoError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let updated = sqlx::query("UPDATE orders SET status = ? WHERE id = ?")
            .bind(OrderStatus::Cancelled.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        let order = fetch_order(&mut tx, id).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(order)
    }
}
