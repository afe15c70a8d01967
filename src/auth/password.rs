use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::{error, warn};

/// Argon2id hashing with a per-call random salt.
///
/// Holds a digest of a throwaway password so callers can burn the same amount
/// of work on an unknown account as on a real one.
#[derive(Clone)]
pub struct Passwords {
    dummy_hash: String,
}

impl Passwords {
    pub fn new() -> anyhow::Result<Self> {
        let dummy_hash = hash_password("contactbook-timing-equalizer")?;
        Ok(Self { dummy_hash })
    }

    pub fn hash(&self, plain: &str) -> anyhow::Result<String> {
        hash_password(plain)
    }

    pub fn verify(&self, plain: &str, hash: &str) -> bool {
        verify_password(plain, hash)
    }

    /// Always `false`, at the cost of a real verification.
    pub fn verify_dummy(&self, plain: &str) -> bool {
        let _ = verify_password(plain, &self.dummy_hash);
        false
    }
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Malformed digests verify as `false`.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "stored password hash is malformed");
            return false;
        }
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}
