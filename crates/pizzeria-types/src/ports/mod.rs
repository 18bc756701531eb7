pub mod order_repository;
pub mod user_repository;

pub use order_repository::OrderRepository;
pub use user_repository::UserRepository;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("db error: {0}")]
    DbError(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Everything the application layer needs from one storage backend.
pub trait Storage: UserRepository + OrderRepository + Clone {}

impl<T> Storage for T where T: UserRepository + OrderRepository + Clone {}
