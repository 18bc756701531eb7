//! Access control gate: every protected operation goes through
//! [`AccessGate::authenticate`] and then [`authorize`] with one of the two
//! [`Rule`]s.

use pizzeria_types::domain::user::User;
use pizzeria_types::ports::UserRepository;
use std::sync::Arc;

use crate::errors::AppError;
use crate::security::{TokenError, TokenKind, TokenService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    AdminOnly,
    /// Admins, or the user whose id owns the resource.
    AdminOrOwner(i64),
}

impl Rule {
    pub fn allows(&self, user: &User) -> bool {
        match *self {
            Rule::AdminOnly => user.admin,
            Rule::AdminOrOwner(owner_id) => user.admin || user.id == owner_id,
        }
    }
}

pub fn authorize(user: &User, rule: Rule) -> Result<(), AppError> {
    if rule.allows(user) {
        return Ok(());
    }
    tracing::warn!(user_id = user.id, ?rule, "access denied");
    Err(AppError::Forbidden("access denied".into()))
}

pub struct AccessGate<R: UserRepository> {
    repo: R,
    tokens: Arc<TokenService>,
}

impl<R: UserRepository> AccessGate<R> {
    pub fn new(repo: R, tokens: Arc<TokenService>) -> Self {
        Self { repo, tokens }
    }

    /// Resolves an access token to a live, active user.
    pub async fn authenticate(&self, token: &str) -> Result<User, AppError> {
        let user_id = self
            .tokens
            .verify(token, TokenKind::Access)
            .map_err(token_rejection)?;
        self.load_active(user_id).await
    }

    pub(crate) async fn load_active(&self, user_id: i64) -> Result<User, AppError> {
        match self.repo.get_user(user_id).await? {
            Some(user) if user.active => Ok(user),
            Some(_) => Err(AppError::Unauthorized("inactive user".into())),
            None => Err(AppError::Unauthorized("invalid access".into())),
        }
    }
}

pub(crate) fn token_rejection(e: TokenError) -> AppError {
    match e {
        TokenError::Encoding(e) => AppError::Internal(e.into()),
        other => {
            tracing::debug!(reason = %other, "token rejected");
            AppError::Unauthorized("access denied, check the validity of the token".into())
        }
    }
}
