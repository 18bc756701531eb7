//! Credential hashing and bearer token signing.

pub mod password;
pub mod token;

pub use password::{HashCost, PasswordError, PasswordHasher};
pub use token::{Claims, TokenError, TokenKind, TokenService};
