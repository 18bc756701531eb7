use async_trait::async_trait;

use super::RepoError;
use crate::domain::user::{NewUser, User};

#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Fails with `RepoError::Conflict` when the email is already registered.
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError>;
    async fn get_user(&self, id: i64) -> Result<Option<User>, RepoError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
    async fn list_users(&self) -> Result<Vec<User>, RepoError>;
    /// Removes the user together with their orders and items.
    async fn delete_user(&self, id: i64) -> Result<bool, RepoError>;
}
