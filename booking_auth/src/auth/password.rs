//! Salted, cost-tunable password hashing with Argon2id.
//!
//! Hashes are PHC strings (`$argon2id$v=19$m=...,t=...,p=1$<salt>$<hash>`), so
//! each stored credential carries its own salt and cost. Verification always
//! uses the parameters embedded in the stored hash, which lets the configured
//! cost change without invalidating existing records.

use super::errors::{AuthError, AuthResult};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        self, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
        rand_core::OsRng,
    },
};
use std::sync::Arc;

/// Default time cost (iterations)
pub const DEFAULT_HASH_COST: u32 = 10;

/// Default memory cost in KiB
pub const DEFAULT_HASH_MEMORY_KIB: u32 = Params::DEFAULT_M_COST;

/// Password hasher
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
    /// Hash of a random throwaway secret, verified against when the user does
    /// not exist so that lookup misses cost the same as wrong passwords.
    dummy_hash: Arc<str>,
}

impl PasswordHasher {
    /// Create a hasher with the given time cost and memory cost.
    ///
    /// # Errors
    ///
    /// * `AuthError::Hashing` - Parameters are outside Argon2's accepted range
    pub fn new(cost: u32, memory_kib: u32) -> AuthResult<Self> {
        let params = Params::new(memory_kib, cost, 1, None)
            .map_err(|e| AuthError::Hashing(e.to_string()))?;

        let mut hasher = Self {
            params,
            dummy_hash: Arc::from(""),
        };
        let throwaway = SaltString::generate(&mut OsRng);
        hasher.dummy_hash = Arc::from(hasher.hash_blocking(throwaway.as_str())?);

        Ok(hasher)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password with a fresh random salt (blocking).
    pub fn hash_blocking(&self, password: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        Ok(self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .to_string())
    }

    /// Verify a password against a stored hash (blocking).
    ///
    /// Returns `Ok(false)` on mismatch. A stored hash that cannot be parsed or
    /// recomputed is an error, never a silent pass.
    pub fn verify_blocking(&self, password: &str, hash: &str) -> AuthResult<bool> {
        let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Hashing(e.to_string()))?;

        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::Hashing(e.to_string())),
        }
    }

    /// Hash a password on the blocking thread pool.
    pub async fn hash(&self, password: &str) -> AuthResult<String> {
        let hasher = self.clone();
        let password = password.to_string();

        tokio::task::spawn_blocking(move || hasher.hash_blocking(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("Hashing task failed: {e}")))?
    }

    /// Verify a password on the blocking thread pool.
    pub async fn verify(&self, password: &str, hash: &str) -> AuthResult<bool> {
        let hasher = self.clone();
        let password = password.to_string();
        let hash = hash.to_string();

        tokio::task::spawn_blocking(move || hasher.verify_blocking(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("Verification task failed: {e}")))?
    }

    /// Burn one verification's worth of work without a real credential.
    pub async fn verify_dummy(&self, password: &str) {
        let dummy = self.dummy_hash.to_string();
        let _ = self.verify(password, &dummy).await;
    }
}

impl Default for PasswordHasher {
    /// # Panics
    ///
    /// Never: the default parameters are within Argon2's limits.
    fn default() -> Self {
        Self::new(DEFAULT_HASH_COST, DEFAULT_HASH_MEMORY_KIB)
            .expect("default Argon2 parameters are valid")
    }
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("t_cost", &self.params.t_cost())
            .field("m_cost", &self.params.m_cost())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fast_hasher() -> PasswordHasher {
        PasswordHasher::new(1, 1024).expect("valid test params")
    }

    #[tokio::test]
    async fn test_hash_and_verify_password() {
        let hasher = fast_hasher();
        let hash = hasher.hash("Passw0rd").await.expect("Failed to hash");
        assert!(hash.starts_with("$argon2id$"));

        assert!(hasher.verify("Passw0rd", &hash).await.unwrap());
        assert!(!hasher.verify("WrongPass1", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_hash_is_salted() {
        let hasher = fast_hasher();
        let first = hasher.hash("Passw0rd").await.unwrap();
        let second = hasher.hash("Passw0rd").await.unwrap();
        assert_ne!(first, second, "Each hash should have a unique salt");
    }

    #[test]
    fn test_hash_embeds_cost() {
        let hasher = PasswordHasher::new(3, 1024).unwrap();
        let hash = hasher.hash_blocking("Passw0rd").unwrap();
        assert!(hash.contains("m=1024,t=3,p=1"), "unexpected params in {hash}");
    }

    #[test]
    fn test_verify_uses_embedded_params() {
        let old = PasswordHasher::new(1, 1024).unwrap();
        let hash = old.hash_blocking("Passw0rd").unwrap();

        let new = PasswordHasher::new(2, 2048).unwrap();
        assert!(new.verify_blocking("Passw0rd", &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_error() {
        let hasher = fast_hasher();
        let result = hasher.verify_blocking("Passw0rd", "not-a-hash");
        assert!(matches!(result, Err(AuthError::Hashing(_))));
    }

    #[test]
    fn test_invalid_params_rejected() {
        assert!(matches!(PasswordHasher::new(0, 1024), Err(AuthError::Hashing(_))));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn prop_verify_roundtrip(p in "[a-zA-Z0-9]{6,24}", q in "[a-zA-Z0-9]{6,24}") {
            let hasher = fast_hasher();
            let hash = hasher.hash_blocking(&p).unwrap();
            prop_assert!(hasher.verify_blocking(&p, &hash).unwrap());
            if p != q {
                prop_assert!(!hasher.verify_blocking(&q, &hash).unwrap());
            }
        }
    }
}
