//! Persistent key-value storage for role sessions.
//!
//! The session manager never touches a global; it is handed an
//! `Arc<dyn CredentialStore>` by whoever builds it.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Credential store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credential store is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Credential store lock poisoned")]
    Poisoned,
}

/// Synchronous string key-value store, the shape of browser local storage.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}
