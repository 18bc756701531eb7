use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use pizzeria_types::domain::order::{NewOrderItem, Order};
use pizzeria_types::domain::user::{NewUser, User};
use pizzeria_types::ports::{OrderRepository, RepoError, UserRepository};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Sequences {
    user: AtomicI64,
    order: AtomicI64,
    item: AtomicI64,
}

fn next(seq: &AtomicI64) -> i64 {
    seq.fetch_add(1, Ordering::Relaxed) + 1
}

/// In-memory adapter. An order's mutations happen under its `DashMap` entry
/// guard, which makes each read-then-write sequence atomic per aggregate.
#[derive(Clone, Default)]
pub struct InMemoryRepo {
    users: Arc<DashMap<i64, User>>,
    emails: Arc<DashMap<String, i64>>,
    orders: Arc<DashMap<i64, Order>>,
    // item id -> order id
    item_index: Arc<DashMap<i64, i64>>,
    ids: Arc<Sequences>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryRepo {
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError> {
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(RepoError::Conflict(format!(
                "email {} already registered",
                user.email
            ))),
            Entry::Vacant(slot) => {
                let id = next(&self.ids.user);
                let user = user.into_user(id);
                self.users.insert(id, user.clone());
                slot.insert(id);
                Ok(user)
            }
        }
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, RepoError> {
        Ok(self.users.get(&id).map(|r| r.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let id = match self.emails.get(email).map(|r| *r.value()) {
            Some(id) => id,
            None => return Ok(None),
        };
        Ok(self.users.get(&id).map(|r| r.clone()))
    }

    async fn list_users(&self) -> Result<Vec<User>, RepoError> {
        let mut users: Vec<User> = self.users.iter().map(|kv| kv.value().clone()).collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn delete_user(&self, id: i64) -> Result<bool, RepoError> {
        let Some((_, user)) = self.users.remove(&id) else {
            return Ok(false);
        };
        self.emails.remove(&user.email);
        let item_index = &self.item_index;
        self.orders.retain(|_, order| {
            if order.owner_user_id != id {
                return true;
            }
            for item in &order.items {
                item_index.remove(&item.id);
            }
            false
        });
        Ok(true)
    }
}

#[async_trait]
impl OrderRepository for InMemoryRepo {
    async fn create(&self, owner_user_id: i64) -> Result<Order, RepoError> {
        let order = Order::new(next(&self.ids.order), owner_user_id);
        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get(&self, id: i64) -> Result<Option<Order>, RepoError> {
        Ok(self.orders.get(&id).map(|r| r.clone()))
    }

    async fn list(&self) -> Result<Vec<Order>, RepoError> {
        let mut orders: Vec<Order> = self.orders.iter().map(|kv| kv.value().clone()).collect();
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }

    async fn find_by_item(&self, item_id: i64) -> Result<Option<Order>, RepoError> {
        let order_id = match self.item_index.get(&item_id).map(|r| *r.value()) {
            Some(id) => id,
            None => return Ok(None),
        };
        self.get(order_id).await
    }

    async fn add_item(
        &self,
        order_id: i64,
        item: NewOrderItem,
    ) -> Result<Option<Order>, RepoError> {
        let Some(mut order) = self.orders.get_mut(&order_id) else {
            return Ok(None);
        };
        let item = item.into_item(next(&self.ids.item), order_id);
        let item_id = item.id;
        order
            .add_item(item)
            .map_err(|e| RepoError::Conflict(e.to_string()))?;
        self.item_index.insert(item_id, order_id);
        Ok(Some(order.clone()))
    }

    async fn remove_item(&self, item_id: i64) -> Result<Option<Order>, RepoError> {
        let order_id = match self.item_index.get(&item_id).map(|r| *r.value()) {
            Some(id) => id,
            None => return Ok(None),
        };
        let Some(mut order) = self.orders.get_mut(&order_id) else {
            return Ok(None);
        };
        if order.remove_item(item_id).is_none() {
            return Ok(None);
        }
        self.item_index.remove(&item_id);
        Ok(Some(order.clone()))
    }

    async fn cancel(&self, id: i64) -> Result<Option<Order>, RepoError> {
        if let Some(mut order) = self.orders.get_mut(&id) {
            order.cancel();
            return Ok(Some(order.clone()));
        }
        Ok(None)
    }
}
