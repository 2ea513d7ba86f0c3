//! Argon2id password hashing for admin accounts.
//!
//! Hashes are stored as PHC strings, so the cost parameters and salt travel
//! with each hash and older hashes keep verifying after the configured cost
//! changes.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use gatekeep_core::error::CoreError;

/// Default minimum password length.
pub const DEFAULT_MIN_LENGTH: usize = 8;
/// Default Argon2 memory cost in KiB (19 MiB).
pub const DEFAULT_MEMORY_KIB: u32 = 19 * 1024;
/// Default Argon2 iteration count.
pub const DEFAULT_ITERATIONS: u32 = 2;

/// Password hashing cost and strength rules.
#[derive(Debug, Clone, Copy)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub memory_kib: u32,
    pub iterations: u32,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_LENGTH,
            memory_kib: DEFAULT_MEMORY_KIB,
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl PasswordPolicy {
    /// Load the policy from environment variables.
    ///
    /// | Env Var               | Default |
    /// |-----------------------|---------|
    /// | `PASSWORD_MIN_LENGTH` | `8`     |
    /// | `ARGON2_MEMORY_KIB`   | `19456` |
    /// | `ARGON2_ITERATIONS`   | `2`     |
    pub fn from_env() -> Self {
        let min_length: usize = std::env::var("PASSWORD_MIN_LENGTH")
            .unwrap_or_else(|_| DEFAULT_MIN_LENGTH.to_string())
            .parse()
            .expect("PASSWORD_MIN_LENGTH must be a valid usize");

        let memory_kib: u32 = std::env::var("ARGON2_MEMORY_KIB")
            .unwrap_or_else(|_| DEFAULT_MEMORY_KIB.to_string())
            .parse()
            .expect("ARGON2_MEMORY_KIB must be a valid u32");

        let iterations: u32 = std::env::var("ARGON2_ITERATIONS")
            .unwrap_or_else(|_| DEFAULT_ITERATIONS.to_string())
            .parse()
            .expect("ARGON2_ITERATIONS must be a valid u32");

        Self {
            min_length,
            memory_kib,
            iterations,
        }
    }
}

/// Argon2id hasher configured once at startup.
#[derive(Debug, Clone)]
pub struct Passwords {
    params: Params,
    min_length: usize,
}

impl Passwords {
    /// Fails if the cost parameters are outside what Argon2 accepts.
    pub fn new(policy: &PasswordPolicy) -> Result<Self, argon2::Error> {
        let params = Params::new(policy.memory_kib, policy.iterations, 1, None)?;
        Ok(Self {
            params,
            min_length: policy.min_length,
        })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext password with a random salt, returning a PHC string.
    pub fn hash(&self, password: &str) -> Result<String, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self.argon2().hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    /// Verify a plaintext password against a stored PHC hash.
    ///
    /// Returns `Ok(false)` on mismatch; `Err` only for unparseable hashes.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
        let parsed = PasswordHash::new(hash)?;
        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Spend one hash worth of work and report a mismatch. Used when the
    /// account does not exist so the response time matches a wrong password.
    pub fn verify_absent(&self, password: &str) -> bool {
        if let Err(e) = self.hash(password) {
            tracing::warn!(error = %e, "Decoy password hash failed");
        }
        false
    }

    /// Enforce the configured minimum length (in characters).
    pub fn check_strength(&self, password: &str) -> Result<(), CoreError> {
        if password.chars().count() < self.min_length {
            return Err(CoreError::Validation(format!(
                "Password must be at least {} characters long",
                self.min_length
            )));
        }
        Ok(())
    }
}
