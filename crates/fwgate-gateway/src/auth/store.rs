//! Credential store: hashed API keys and their roles.
//!
//! The in-memory store is copy-on-write. `verify` reads an immutable snapshot
//! and scans every record; `add_key` and `revoke_key` publish a new snapshot.

use fwgate_telemetry::key_prefix;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use subtle::{Choice, ConditionallySelectable};
use tracing::{debug, error, info, warn};

use crate::auth::hashing::HashedKey;
use crate::domain::config::BootstrapKey;
use crate::domain::roles::Role;

/// Identifier of a stored credential, safe to log.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyId(String);

impl KeyId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for KeyId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Key verification and management.
///
/// Management operations are not reachable from the request path.
pub trait CredentialStore: Send + Sync {
    /// Role of `key`, or `None` when no record matches.
    fn verify(&self, key: &str) -> Option<Role>;

    /// Store `key` with `role`. A key that already verifies has its role replaced.
    fn add_key(&self, key: &str, role: Role) -> KeyId;

    /// Remove the record with identifier `id`. Returns whether one existed.
    fn revoke_key(&self, id: &KeyId) -> bool;

    /// Number of stored records.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone)]
struct StoredRecord {
    id: KeyId,
    encoded: String,
    role: Role,
}

/// Process-local credential store for development and tests.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    records: RwLock<Arc<Vec<StoredRecord>>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load development keys. Entries with a missing field or unknown role
    /// are logged and skipped individually. Returns the number loaded.
    pub fn load_bootstrap(&self, entries: &[BootstrapKey]) -> usize {
        if entries.is_empty() {
            warn!("No bootstrap API keys configured, credential store is empty");
            return 0;
        }

        let mut loaded = 0;
        for (index, entry) in entries.iter().enumerate() {
            let (Some(key), Some(role_name)) = (&entry.key, &entry.role) else {
                warn!(index, "Skipping bootstrap key entry with missing key or role");
                continue;
            };
            if key.is_empty() {
                warn!(index, "Skipping bootstrap key entry with empty key");
                continue;
            }
            match role_name.parse::<Role>() {
                Ok(role) => {
                    self.add_key(key.expose(), role);
                    loaded += 1;
                }
                Err(e) => {
                    error!(
                        index,
                        key_prefix = %key_prefix(key.expose()),
                        error = %e,
                        "Skipping bootstrap key with invalid role"
                    );
                }
            }
        }

        info!(loaded, "Loaded bootstrap API keys into in-memory store");
        loaded
    }

    /// Insert an already-encoded hash. The encoding is checked at verify time.
    pub fn insert_encoded(&self, id: KeyId, encoded: impl Into<String>, role: Role) {
        let record = StoredRecord {
            id,
            encoded: encoded.into(),
            role,
        };
        self.publish(|records| records.push(record));
    }

    fn snapshot(&self) -> Arc<Vec<StoredRecord>> {
        Arc::clone(&*self.records.read())
    }

    fn publish(&self, update: impl FnOnce(&mut Vec<StoredRecord>)) {
        let mut guard = self.records.write();
        let mut next: Vec<StoredRecord> = (**guard).clone();
        update(&mut next);
        *guard = Arc::new(next);
    }

    /// Index of the last record matching `key`, scanning every record.
    fn find(records: &[StoredRecord], key: &str) -> Option<usize> {
        let mut found = Choice::from(0);
        let mut index = 0u64;

        for (i, record) in records.iter().enumerate() {
            let hit = match HashedKey::decode(&record.encoded) {
                Ok(hashed) => hashed.verify(key),
                Err(e) => {
                    error!(key_id = %record.id, error = %e, "Corrupt credential record ignored");
                    Choice::from(0)
                }
            };
            index.conditional_assign(&(i as u64), hit);
            found |= hit;
        }

        bool::from(found).then_some(index as usize)
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn verify(&self, key: &str) -> Option<Role> {
        let records = self.snapshot();
        Self::find(&records, key).map(|i| records[i].role)
    }

    fn add_key(&self, key: &str, role: Role) -> KeyId {
        let mut guard = self.records.write();
        let mut next: Vec<StoredRecord> = (**guard).clone();

        let id = match Self::find(&next, key) {
            Some(i) => {
                next[i].role = role;
                debug!(key_id = %next[i].id, role = %role, "Replaced role for existing key");
                next[i].id.clone()
            }
            None => {
                let hashed = HashedKey::derive(key);
                let id = KeyId(hashed.id());
                next.push(StoredRecord {
                    id: id.clone(),
                    encoded: hashed.encode(),
                    role,
                });
                debug!(key_id = %id, role = %role, "Added key");
                id
            }
        };

        *guard = Arc::new(next);
        id
    }

    fn revoke_key(&self, id: &KeyId) -> bool {
        let mut removed = false;
        self.publish(|records| {
            let before = records.len();
            records.retain(|record| record.id != *id);
            removed = records.len() != before;
        });
        if removed {
            info!(key_id = %id, "Revoked key");
        } else {
            warn!(key_id = %id, "Attempted to revoke unknown key");
        }
        removed
    }

    fn len(&self) -> usize {
        self.records.read().len()
    }
}
