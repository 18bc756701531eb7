//! Argon2id password hashing.
//!
//! Digests are PHC strings carrying their own salt and cost parameters, so a
//! digest produced under an older cost setting still verifies after the
//! configured cost changes.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("invalid hash cost: {0}")]
    InvalidCost(String),
    #[error("password hashing failed")]
    HashingFailed,
}

/// Tunable work factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
        }
    }
}

pub struct PasswordHasher {
    argon2: Argon2<'static>,
    // Verified against when a login names an unknown account.
    dummy_digest: String,
}

impl PasswordHasher {
    pub fn new(cost: HashCost) -> Result<Self, PasswordError> {
        let params = Params::new(cost.memory_kib, cost.iterations, 1, None)
            .map_err(|e| PasswordError::InvalidCost(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let mut hasher = Self {
            argon2,
            dummy_digest: String::new(),
        };
        hasher.dummy_digest = hasher.hash("dummy password for timing equalization")?;
        Ok(hasher)
    }

    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let digest = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|_| PasswordError::HashingFailed)?;
        Ok(digest.to_string())
    }

    /// Malformed digests verify as `false`.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        match PasswordHash::new(digest) {
            Ok(parsed) => self
                .argon2
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Spends the same work as a real verification and always fails.
    pub fn verify_dummy(&self, plaintext: &str) -> bool {
        let _ = self.verify(plaintext, &self.dummy_digest);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> PasswordHasher {
        PasswordHasher::new(HashCost {
            memory_kib: 64,
            iterations: 1,
        })
        .unwrap()
    }

    #[test]
    fn hash_and_verify() {
        let hasher = cheap();
        let digest = hasher.hash("pw1").unwrap();
        assert!(digest.starts_with("$argon2id$"));
        assert!(!digest.contains("pw1"));
        assert!(hasher.verify("pw1", &digest));
        assert!(!hasher.verify("pw2", &digest));
    }

    #[test]
    fn salts_differ() {
        let hasher = cheap();
        let a = hasher.hash("same").unwrap();
        let b = hasher.hash("same").unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify("same", &a));
        assert!(hasher.verify("same", &b));
    }

    #[test]
    fn malformed_digest_is_a_mismatch() {
        let hasher = cheap();
        assert!(!hasher.verify("pw1", "not-a-valid-hash"));
        assert!(!hasher.verify("pw1", ""));
        assert!(!hasher.verify("pw1", "$argon2id$v=19$m=64,t=1,p=1$broken"));
    }

    #[test]
    fn digests_verify_across_cost_changes() {
        let old = cheap();
        let digest = old.hash("pw1").unwrap();
        let new = PasswordHasher::new(HashCost {
            memory_kib: 128,
            iterations: 2,
        })
        .unwrap();
        assert!(new.verify("pw1", &digest));
    }

    #[test]
    fn dummy_never_matches() {
        let hasher = cheap();
        assert!(!hasher.verify_dummy("dummy password for timing equalization"));
    }

    #[test]
    fn rejects_invalid_cost() {
        let res = PasswordHasher::new(HashCost {
            memory_kib: 1,
            iterations: 0,
        });
        assert!(matches!(res, Err(PasswordError::InvalidCost(_))));
    }
}
