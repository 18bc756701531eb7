use chrono::{Duration, Utc};
use jsonwebtoken::Algorithm;
use std::env;
use std::fmt;
use std::str::FromStr;

use crate::security::HashCost;

/// Process-wide settings, read once at startup and passed down explicitly.
#[derive(Clone)]
pub struct Config {
    pub server_port: String,
    pub database_url: Option<String>,
    pub secret_key: String,
    pub algorithm: Algorithm,
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_days: i64,
    pub password_hash_memory_kib: u32,
    pub password_hash_iterations: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let server_port = env::var("SERVER_PORT").unwrap_or_else(|_| "3000".into());
        let database_url = env::var("DATABASE_URL").ok();
        let secret_key = env::var("SECRET_KEY")
            .map_err(|_| anyhow::anyhow!("SECRET_KEY must be set"))?;
        if secret_key.trim().is_empty() {
            anyhow::bail!("SECRET_KEY must not be empty");
        }
        let algorithm = parse_algorithm(&env::var("ALGORITHM").unwrap_or_else(|_| "HS256".into()))?;
        let cost = HashCost::default();
        Ok(Self {
            server_port,
            database_url,
            secret_key,
            algorithm,
            access_token_expire_minutes: parse_lifetime(
                "ACCESS_TOKEN_EXPIRE_MINUTES",
                env::var("ACCESS_TOKEN_EXPIRE_MINUTES").ok(),
                60,
                Duration::try_minutes,
            )?,
            refresh_token_expire_days: parse_lifetime(
                "REFRESH_TOKEN_EXPIRE_DAYS",
                env::var("REFRESH_TOKEN_EXPIRE_DAYS").ok(),
                7,
                Duration::try_days,
            )?,
            password_hash_memory_kib: parse_var("PASSWORD_HASH_MEMORY_KIB", cost.memory_kib)?,
            password_hash_iterations: parse_var("PASSWORD_HASH_ITERATIONS", cost.iterations)?,
        })
    }

    pub fn access_token_ttl(&self) -> anyhow::Result<Duration> {
        lifetime(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            self.access_token_expire_minutes,
            Duration::try_minutes,
        )
    }

    pub fn refresh_token_ttl(&self) -> anyhow::Result<Duration> {
        lifetime(
            "REFRESH_TOKEN_EXPIRE_DAYS",
            self.refresh_token_expire_days,
            Duration::try_days,
        )
    }

    pub fn hash_cost(&self) -> HashCost {
        HashCost {
            memory_kib: self.password_hash_memory_kib,
            iterations: self.password_hash_iterations,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server_port", &self.server_port)
            .field("database_url", &self.database_url)
            .field("secret_key", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("access_token_expire_minutes", &self.access_token_expire_minutes)
            .field("refresh_token_expire_days", &self.refresh_token_expire_days)
            .field("password_hash_memory_kib", &self.password_hash_memory_kib)
            .field("password_hash_iterations", &self.password_hash_iterations)
            .finish()
    }
}

/// Only the symmetric HMAC family is accepted.
pub fn parse_algorithm(name: &str) -> anyhow::Result<Algorithm> {
    let alg = Algorithm::from_str(name.trim())
        .map_err(|_| anyhow::anyhow!("unknown ALGORITHM {name:?}"))?;
    match alg {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(alg),
        other => anyhow::bail!("ALGORITHM {other:?} is not a symmetric HMAC algorithm"),
    }
}

/// Token lifetimes must be positive and keep `now + ttl` representable.
fn lifetime(key: &str, value: i64, unit: fn(i64) -> Option<Duration>) -> anyhow::Result<Duration> {
    if value <= 0 {
        anyhow::bail!("{key} must be positive, got {value}");
    }
    unit(value)
        .filter(|ttl| Utc::now().checked_add_signed(*ttl).is_some())
        .ok_or_else(|| anyhow::anyhow!("{key}={value} is out of range"))
}

fn parse_lifetime(
    key: &str,
    raw: Option<String>,
    default: i64,
    unit: fn(i64) -> Option<Duration>,
) -> anyhow::Result<i64> {
    let value = match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {key}={raw:?}: {e}"))?,
        None => default,
    };
    lifetime(key, value, unit)?;
    Ok(value)
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {key}={raw:?}: {e}")),
        Err(_) => Ok(default),
    }
}
