use async_trait::async_trait;

use super::RepoError;
use crate::domain::order::{NewOrderItem, Order};

/// Each mutating method is atomic: the item change and the total recompute
/// are committed together or not at all.
#[async_trait]
pub trait OrderRepository: Send + Sync + 'static {
    async fn create(&self, owner_user_id: i64) -> Result<Order, RepoError>;
    async fn get(&self, id: i64) -> Result<Option<Order>, RepoError>;
    async fn list(&self) -> Result<Vec<Order>, RepoError>;
    /// Order that contains `item_id`, if any.
    async fn find_by_item(&self, item_id: i64) -> Result<Option<Order>, RepoError>;
    /// `Ok(None)` when the order does not exist, `Conflict` when it is not pending.
    async fn add_item(&self, order_id: i64, item: NewOrderItem)
        -> Result<Option<Order>, RepoError>;
    /// `Ok(None)` when the item does not exist.
    async fn remove_item(&self, item_id: i64) -> Result<Option<Order>, RepoError>;
    async fn cancel(&self, id: i64) -> Result<Option<Order>, RepoError>;
}
