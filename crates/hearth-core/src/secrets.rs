//! Secret store adapter.
//!
//! A single trait so every adapter (chat, email, network) fetches
//! credentials the same way regardless of where they actually live,
//! instead of each provider config carrying its own one-off credential-file
//! field.
//!
//! Naming convention per §9 Open Question 2: all keys are written as
//! `credential-<service>`. Keys read back under other historical prefixes
//! (`pii-`, `financial-`) are accepted as informational tags only — this
//! store never writes them.

use keyring::Entry;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

const SERVICE_NAMESPACE: &str = "hearth";

/// Fetch and store opaque secrets (bot tokens, SMTP passwords, relay auth).
pub trait SecretStore: Send + Sync {
    fn get(&self, service_name: &str) -> crate::error::Result<Option<String>>;
    fn set(&self, service_name: &str, value: &str) -> crate::error::Result<()>;
    fn delete(&self, service_name: &str) -> crate::error::Result<()>;
}

fn credential_key(service_name: &str) -> String {
    format!("credential-{service_name}")
}

/// Backed by the OS-native secret facility (macOS Keychain, Secret Service,
/// Windows Credential Manager) via the `keyring` crate.
pub struct KeyringSecretStore;

impl KeyringSecretStore {
    pub fn new() -> Self {
        Self
    }

    fn entry(&self, service_name: &str) -> crate::error::Result<Entry> {
        Entry::new(SERVICE_NAMESPACE, &credential_key(service_name))
            .map_err(|e| crate::error::HearthError::SecretStore(e.to_string()))
    }
}

impl Default for KeyringSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for KeyringSecretStore {
    fn get(&self, service_name: &str) -> crate::error::Result<Option<String>> {
        match self.entry(service_name)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(crate::error::HearthError::SecretStore(e.to_string())),
        }
    }

    fn set(&self, service_name: &str, value: &str) -> crate::error::Result<()> {
        self.entry(service_name)?
            .set_password(value)
            .map_err(|e| crate::error::HearthError::SecretStore(e.to_string()))
    }

    fn delete(&self, service_name: &str) -> crate::error::Result<()> {
        match self.entry(service_name)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(crate::error::HearthError::SecretStore(e.to_string())),
        }
    }
}

/// Fallback for headless hosts with no OS keyring (CI, containers). Backs
/// onto a single JSON file with `0600` permissions on unix.
pub struct FileSecretStore {
    path: PathBuf,
    cache: RwLock<HashMap<String, String>>,
}

impl FileSecretStore {
    pub fn new(path: PathBuf) -> crate::error::Result<Self> {
        let cache = crate::state::read_json_state(&path, HashMap::new())?;
        Ok(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    fn persist(&self, map: &HashMap<String, String>) -> crate::error::Result<()> {
        crate::state::write_json_state_atomic(&self.path, map)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(meta) = std::fs::metadata(&self.path) {
                let mut perms = meta.permissions();
                perms.set_mode(0o600);
                let _ = std::fs::set_permissions(&self.path, perms);
            }
        }
        Ok(())
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, service_name: &str) -> crate::error::Result<Option<String>> {
        let key = credential_key(service_name);
        Ok(self.cache.read().unwrap().get(&key).cloned())
    }

    fn set(&self, service_name: &str, value: &str) -> crate::error::Result<()> {
        let key = credential_key(service_name);
        let mut guard = self.cache.write().unwrap();
        guard.insert(key, value.to_string());
        self.persist(&guard)
    }

    fn delete(&self, service_name: &str) -> crate::error::Result<()> {
        let key = credential_key(service_name);
        let mut guard = self.cache.write().unwrap();
        guard.remove(&key);
        self.persist(&guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_roundtrips_secret() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSecretStore::new(dir.path().join("secrets.json")).unwrap();

        assert_eq!(store.get("telegram-main").unwrap(), None);
        store.set("telegram-main", "abc123").unwrap();
        assert_eq!(
            store.get("telegram-main").unwrap(),
            Some("abc123".to_string())
        );

        store.delete("telegram-main").unwrap();
        assert_eq!(store.get("telegram-main").unwrap(), None);
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");

        {
            let store = FileSecretStore::new(path.clone()).unwrap();
            store.set("smtp-main", "hunter2").unwrap();
        }

        let store = FileSecretStore::new(path).unwrap();
        assert_eq!(store.get("smtp-main").unwrap(), Some("hunter2".to_string()));
    }
}
