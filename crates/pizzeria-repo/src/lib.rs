#[cfg(not(any(feature = "memory", feature = "sqlite")))]
compile_error!("Enable a repo feature: `memory` or `sqlite`.");

use async_trait::async_trait;
use pizzeria_types::domain::order::{NewOrderItem, Order};
use pizzeria_types::domain::user::{NewUser, User};
use pizzeria_types::ports::{OrderRepository, RepoError, UserRepository};

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
const DEFAULT_SQLITE_URL: &str = "sqlite://pizzeria.db";

/// Storage backend selected at startup from the enabled features.
#[derive(Clone)]
pub enum Repo {
    #[cfg(feature = "memory")]
    Memory(memory::InMemoryRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteRepo),
}

pub async fn build_repo(url: Option<&str>) -> anyhow::Result<Repo> {
    Repo::build_repo(url).await
}

impl Repo {
    #[cfg(all(feature = "memory", not(feature = "sqlite")))]
    pub async fn build_repo(_: Option<&str>) -> anyhow::Result<Self> {
        tracing::info!("using in-memory storage");
        Ok(Self::Memory(memory::InMemoryRepo::new()))
    }

    #[cfg(all(feature = "sqlite", not(feature = "memory")))]
    pub async fn build_repo(database_url: Option<&str>) -> anyhow::Result<Self> {
        let url = database_url.unwrap_or(DEFAULT_SQLITE_URL);
        tracing::info!(url, "using sqlite storage");
        Ok(Self::Sqlite(sqlite::SqliteRepo::new(url).await?))
    }

    // Both features: an explicit url selects sqlite, otherwise memory.
    #[cfg(all(feature = "sqlite", feature = "memory"))]
    pub async fn build_repo(database_url: Option<&str>) -> anyhow::Result<Self> {
        match database_url {
            Some(url) => {
                tracing::info!(url, "using sqlite storage");
                Ok(Self::Sqlite(sqlite::SqliteRepo::new(url).await?))
            }
            None => {
                tracing::info!(
                    default_url = DEFAULT_SQLITE_URL,
                    "no DATABASE_URL given, using in-memory storage"
                );
                Ok(Self::Memory(memory::InMemoryRepo::new()))
            }
        }
    }
}

macro_rules! delegate {
    ($self:ident, $method:ident($($arg:expr),*)) => {
        match $self {
            #[cfg(feature = "memory")]
            Repo::Memory(r) => r.$method($($arg),*).await,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(r) => r.$method($($arg),*).await,
        }
    };
}

#[async_trait]
impl UserRepository for Repo {
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError> {
        delegate!(self, create_user(user))
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, RepoError> {
        delegate!(self, get_user(id))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        delegate!(self, find_user_by_email(email))
    }

    async fn list_users(&self) -> Result<Vec<User>, RepoError> {
        delegate!(self, list_users())
    }

    async fn delete_user(&self, id: i64) -> Result<bool, RepoError> {
        delegate!(self, delete_user(id))
    }
}

#[async_trait]
impl OrderRepository for Repo {
    async fn create(&self, owner_user_id: i64) -> Result<Order, RepoError> {
        delegate!(self, create(owner_user_id))
    }

    async fn get(&self, id: i64) -> Result<Option<Order>, RepoError> {
        delegate!(self, get(id))
    }

    async fn list(&self) -> Result<Vec<Order>, RepoError> {
        delegate!(self, list())
    }

    async fn find_by_item(&self, item_id: i64) -> Result<Option<Order>, RepoError> {
        delegate!(self, find_by_item(item_id))
    }

    async fn add_item(
        &self,
        order_id: i64,
        item: NewOrderItem,
    ) -> Result<Option<Order>, RepoError> {
        delegate!(self, add_item(order_id, item))
    }

    async fn remove_item(&self, item_id: i64) -> Result<Option<Order>, RepoError> {
        delegate!(self, remove_item(item_id))
    }

    async fn cancel(&self, id: i64) -> Result<Option<Order>, RepoError> {
        delegate!(self, cancel(id))
    }
}
