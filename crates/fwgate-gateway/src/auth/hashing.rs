//! Salted one-way hashing of API keys.
//!
//! Encoded form: `sha3-256$<salt hex>$<digest hex>`, digest = SHA3-256(salt || key).

use rand::RngCore;
use sha3::{Digest, Sha3_256};
use subtle::{Choice, ConstantTimeEq};

const SCHEME: &str = "sha3-256";
const SALT_LEN: usize = 16;
const DIGEST_LEN: usize = 32;

/// Decoding failures for stored hashes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HashError {
    #[error("unsupported hash scheme: {0}")]
    Scheme(String),
    #[error("malformed hash encoding")]
    Malformed,
    #[error("invalid hex in hash: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Hash of one API key with its salt.
#[derive(Clone, PartialEq, Eq)]
pub struct HashedKey {
    salt: [u8; SALT_LEN],
    digest: [u8; DIGEST_LEN],
}

impl HashedKey {
    /// Hash `key` under a fresh random salt.
    pub fn derive(key: &str) -> Self {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        Self::with_salt(key, salt)
    }

    /// Hash `key` under a given salt.
    pub fn with_salt(key: &str, salt: [u8; SALT_LEN]) -> Self {
        Self {
            salt,
            digest: digest(&salt, key),
        }
    }

    /// Constant-time check of `key` against this hash.
    pub fn verify(&self, key: &str) -> Choice {
        digest(&self.salt, key).ct_eq(&self.digest)
    }

    /// Short stable identifier, safe to log and used for revocation.
    pub fn id(&self) -> String {
        hex::encode(&self.digest[..8])
    }

    pub fn encode(&self) -> String {
        format!(
            "{SCHEME}${}${}",
            hex::encode(self.salt),
            hex::encode(self.digest)
        )
    }

    pub fn decode(encoded: &str) -> Result<Self, HashError> {
        let mut parts = encoded.split('$');
        let (Some(scheme), Some(salt), Some(digest), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(HashError::Malformed);
        };
        if scheme != SCHEME {
            return Err(HashError::Scheme(scheme.to_string()));
        }

        let salt: [u8; SALT_LEN] = hex::decode(salt)?
            .try_into()
            .map_err(|_| HashError::Malformed)?;
        let digest: [u8; DIGEST_LEN] = hex::decode(digest)?
            .try_into()
            .map_err(|_| HashError::Malformed)?;
        Ok(Self { salt, digest })
    }
}

impl std::fmt::Debug for HashedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashedKey").field("id", &self.id()).finish()
    }
}

fn digest(salt: &[u8], key: &str) -> [u8; DIGEST_LEN] {
    let mut hasher = Sha3_256::new();
    hasher.update(salt);
    hasher.update(key.as_bytes());
    hasher.finalize().into()
}
