use serde::{Deserialize, Serialize};

/// Stored account. Never serialized directly; use [`UserSummary`] for output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub active: bool,
    pub admin: bool,
}

/// Account data waiting for an id from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub active: bool,
    pub admin: bool,
}

impl NewUser {
    pub fn new(
        name: String,
        email: String,
        password_hash: String,
        active: bool,
        admin: bool,
    ) -> anyhow::Result<Self> {
        if name.trim().is_empty() {
            anyhow::bail!("name empty");
        }
        validate_email(&email)?;
        if password_hash.is_empty() {
            anyhow::bail!("password hash empty");
        }
        Ok(Self {
            name,
            email,
            password_hash,
            active,
            admin,
        })
    }

    pub fn into_user(self, id: i64) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            active: self.active,
            admin: self.admin,
        }
    }
}

pub fn validate_email(email: &str) -> anyhow::Result<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.trim().is_empty() && !domain.trim().is_empty() => Ok(()),
        _ => anyhow::bail!("invalid email"),
    }
}

/// Public projection of a [`User`] without the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub active: bool,
    pub admin: bool,
}

impl From<User> for UserSummary {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            active: u.active,
            admin: u.admin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_validation() {
        assert!(NewUser::new("Alice".into(), "alice@example.com".into(), "h".into(), true, false).is_ok());
        assert!(NewUser::new("".into(), "alice@example.com".into(), "h".into(), true, false).is_err());
        assert!(NewUser::new("Alice".into(), "alice".into(), "h".into(), true, false).is_err());
        assert!(NewUser::new("Alice".into(), "@example.com".into(), "h".into(), true, false).is_err());
        assert!(NewUser::new("Alice".into(), "alice@".into(), "h".into(), true, false).is_err());
        assert!(NewUser::new("Alice".into(), "alice@example.com".into(), "".into(), true, false).is_err());
    }

    #[test]
    fn summary_has_no_password_field() {
        let user = NewUser::new("Bob".into(), "bob@example.com".into(), "$argon2id$x".into(), true, true)
            .unwrap()
            .into_user(3);
        let json = serde_json::to_value(UserSummary::from(user)).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["admin"], true);
        assert!(json.get("password_hash").is_none());
        assert!(json.get("password").is_none());
    }
}
