//! API-key authentication and role-based authorization.
//!
//! ```text
//! X-API-Key ──▶ Authenticator ──▶ CredentialStore::verify ──▶ Identity
//!                                                               │
//!                  AccessControl::authorize(operation) ◀────────┘
//!                  AccessControl::authorize_workflow(name)
//! ```

pub mod access;
pub mod authenticator;
pub mod hashing;
pub mod store;

pub use access::AccessControl;
pub use authenticator::{ApiKey, Authenticator, Identity, API_KEY_HEADER};
pub use hashing::{HashError, HashedKey};
pub use store::{CredentialStore, InMemoryCredentialStore, KeyId};
