use crate::application::access::{authorize, token_rejection, AccessGate, Rule};
use crate::errors::AppError;
use crate::security::{PasswordHasher, TokenKind, TokenService};
use pizzeria_types::domain::user::{NewUser, User, UserSummary};
use pizzeria_types::ports::UserRepository;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct AuthService<R: UserRepository> {
    repo: R,
    gate: Arc<AccessGate<R>>,
    hasher: Arc<PasswordHasher>,
    tokens: Arc<TokenService>,
}

impl<R: UserRepository> AuthService<R> {
    pub fn new(
        repo: R,
        gate: Arc<AccessGate<R>>,
        hasher: Arc<PasswordHasher>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            repo,
            gate,
            hasher,
            tokens,
        }
    }

    pub async fn register(
        &self,
        name: String,
        email: String,
        password: String,
        active: bool,
        admin: bool,
    ) -> Result<User, AppError> {
        if password.is_empty() {
            return Err(AppError::BadRequest("password empty".into()));
        }
        if self.repo.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("user e-mail already registered".into()));
        }

        let hasher = self.hasher.clone();
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(e.into()))?
            .map_err(|e| AppError::Internal(e.into()))?;

        let new_user = NewUser::new(name, email, password_hash, active, admin)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        // the unique index still guards against a concurrent registration
        let user = self.repo.create_user(new_user).await?;
        tracing::info!(user_id = user.id, admin = user.admin, "user registered");
        Ok(user)
    }

    /// Unknown email, wrong password and inactive account all yield
    /// `InvalidCredentials` after the same amount of hashing work.
    async fn check_credentials(&self, email: &str, password: String) -> Result<User, AppError> {
        let user = self.repo.find_user_by_email(email).await?;
        let hasher = self.hasher.clone();
        let digest = user.as_ref().map(|u| u.password_hash.clone());
        let matched = tokio::task::spawn_blocking(move || match digest {
            Some(digest) => hasher.verify(&password, &digest),
            None => hasher.verify_dummy(&password),
        })
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

        match user {
            Some(user) if matched && user.active => Ok(user),
            _ => {
                tracing::info!("login rejected");
                Err(AppError::InvalidCredentials)
            }
        }
    }

    pub async fn login(&self, email: &str, password: String) -> Result<TokenPair, AppError> {
        let user = self.check_credentials(email, password).await?;
        let access_token = self.issue(user.id, TokenKind::Access)?;
        let refresh_token = self.issue(user.id, TokenKind::Refresh)?;
        tracing::info!(user_id = user.id, "login succeeded");
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Form login issues an access token only.
    pub async fn login_form(&self, username: &str, password: String) -> Result<String, AppError> {
        let user = self.check_credentials(username, password).await?;
        self.issue(user.id, TokenKind::Access)
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AppError> {
        let user_id = self
            .tokens
            .verify(refresh_token, TokenKind::Refresh)
            .map_err(token_rejection)?;
        let user = self.gate.load_active(user_id).await?;
        self.issue(user.id, TokenKind::Access)
    }

    pub async fn list_users(&self, caller: &User) -> Result<Vec<UserSummary>, AppError> {
        authorize(caller, Rule::AdminOnly)?;
        let users = self.repo.list_users().await?;
        Ok(users.into_iter().map(UserSummary::from).collect())
    }

    /// Deletes the user along with their orders.
    pub async fn delete_user(&self, id: i64, caller: &User) -> Result<User, AppError> {
        authorize(caller, Rule::AdminOnly)?;
        let target = self
            .repo
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", id)))?;
        if !self.repo.delete_user(id).await? {
            return Err(AppError::NotFound(format!("user {}", id)));
        }
        tracing::info!(user_id = id, by = caller.id, "user deleted");
        Ok(target)
    }

    fn issue(&self, user_id: i64, kind: TokenKind) -> Result<String, AppError> {
        self.tokens
            .issue(user_id, kind)
            .map_err(|e| AppError::Internal(e.into()))
    }
}
