//! Flat-file user accounts.
//!
//! - `hash` - password digests, legacy unsalted and salted/iterated
//! - `repository` - the [`CredentialRepository`] seam and its flat-file implementation
//! - `store` - registration/login rules and the [`Session`] handed to the pipeline

mod hash;
mod repository;
mod store;

pub use hash::{hash_password, verify_password, HashScheme, DEFAULT_ROUNDS};
pub use repository::{CredentialRecord, CredentialRepository, FlatFileRepository};
pub use store::{AuthError, CredentialStore, Session, MIN_PASSWORD_LEN};
