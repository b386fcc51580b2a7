use super::{CredentialStore, StoreError};
use dashmap::DashMap;

/// Process-local store. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).map(|value| value.clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.get("admin_token").unwrap(), None);

        store.set("admin_token", "a1").unwrap();
        assert_eq!(store.get("admin_token").unwrap().as_deref(), Some("a1"));

        store.set("admin_token", "a2").unwrap();
        assert_eq!(store.get("admin_token").unwrap().as_deref(), Some("a2"));

        store.delete("admin_token").unwrap();
        store.delete("admin_token").unwrap();
        assert!(store.is_empty());
    }
}
