//! Secret hashing and verification.
//!
//! Client secrets and user passwords are stored as Argon2id PHC strings. The
//! verifier only ever answers "matches" or "does not match"; why a stored hash
//! could not be checked is logged, never returned.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// Outcome of checking a plaintext secret against a stored hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Success,
    /// Matches, but the stored hash was produced with other parameters than the
    /// current ones. Callers may upgrade the hash; nothing does so today.
    SuccessRehashNeeded,
    Failed,
}

impl Verification {
    pub fn is_success(self) -> bool {
        !matches!(self, Verification::Failed)
    }
}

/// Argon2id hasher with a fixed work factor.
#[derive(Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl CredentialHasher {
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a secret with a fresh random salt.
    ///
    /// Returns the PHC-formatted hash string suitable for storage.
    pub fn hash(&self, plaintext: &str) -> Result<String, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self.argon2().hash_password(plaintext.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    /// Verify a secret against a stored hash.
    ///
    /// The cost parameters are read from the stored hash, so hashes made with
    /// older settings still verify (and report `SuccessRehashNeeded`).
    pub fn verify(&self, hash: &str, plaintext: &str) -> Verification {
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "stored credential hash is malformed");
                return Verification::Failed;
            }
        };

        match self.argon2().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) if self.needs_rehash(&parsed) => Verification::SuccessRehashNeeded,
            Ok(()) => Verification::Success,
            Err(argon2::password_hash::Error::Password) => Verification::Failed,
            Err(e) => {
                tracing::warn!(error = %e, "credential hash could not be verified");
                Verification::Failed
            }
        }
    }

    fn needs_rehash(&self, parsed: &PasswordHash<'_>) -> bool {
        if parsed.algorithm != Algorithm::Argon2id.ident() {
            return true;
        }
        match Params::try_from(parsed) {
            Ok(stored) => {
                stored.m_cost() != self.params.m_cost()
                    || stored.t_cost() != self.params.t_cost()
                    || stored.p_cost() != self.params.p_cost()
            }
            Err(_) => true,
        }
    }
}

/// Hash a secret with the default work factor.
pub fn hash_secret(plaintext: &str) -> Result<String, argon2::password_hash::Error> {
    CredentialHasher::default().hash(plaintext)
}

/// Verify a secret against a stored hash with the default work factor.
pub fn verify_secret(hash: &str, plaintext: &str) -> Verification {
    CredentialHasher::default().verify(hash, plaintext)
}

/// Generate a random client secret: 32 bytes, standard base64.
pub fn generate_client_secret() -> Result<String, getrandom::Error> {
    use base64::Engine;
    let mut bytes = [0u8; 32];
    getrandom::fill(&mut bytes)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}
