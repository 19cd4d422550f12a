//! Loads and persists the two sender files (`safe-senders.json`,
//! `3rd-party-senders.json`) using the same atomic-write and
//! corruption-quarantine helpers every other crate's state goes through.

use crate::error::Result;
use crate::types::{SafeSenders, ThirdPartySenders};
use hearth_core::state::{quarantine_corrupt_file, read_json_state, write_json_state_atomic};
use std::path::PathBuf;

pub struct SenderStore {
    safe_senders_path: PathBuf,
    third_party_path: PathBuf,
}

impl SenderStore {
    pub fn new(safe_senders_path: PathBuf, third_party_path: PathBuf) -> Self {
        Self {
            safe_senders_path,
            third_party_path,
        }
    }

    pub fn load_safe_senders(&self) -> Result<SafeSenders> {
        match read_json_state(&self.safe_senders_path, SafeSenders::default()) {
            Ok(v) => Ok(v),
            Err(hearth_core::HearthError::StateCorruption { .. }) => {
                quarantine_corrupt_file(&self.safe_senders_path)?;
                Ok(SafeSenders::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn load_third_party(&self) -> Result<ThirdPartySenders> {
        match read_json_state(&self.third_party_path, ThirdPartySenders::default()) {
            Ok(v) => Ok(v),
            Err(hearth_core::HearthError::StateCorruption { .. }) => {
                quarantine_corrupt_file(&self.third_party_path)?;
                Ok(ThirdPartySenders::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save_safe_senders(&self, senders: &SafeSenders) -> Result<()> {
        write_json_state_atomic(&self.safe_senders_path, senders)?;
        Ok(())
    }

    pub fn save_third_party(&self, senders: &ThirdPartySenders) -> Result<()> {
        write_json_state_atomic(&self.third_party_path, senders)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SenderKey;

    #[test]
    fn roundtrips_safe_senders() {
        let dir = tempfile::tempdir().unwrap();
        let store = SenderStore::new(dir.path().join("safe.json"), dir.path().join("3rd.json"));
        let mut senders = store.load_safe_senders().unwrap();
        senders.insert(&SenderKey::new("telegram", "123"));
        store.save_safe_senders(&senders).unwrap();

        let reloaded = store.load_safe_senders().unwrap();
        assert!(reloaded.contains(&SenderKey::new("telegram", "123")));
    }

    #[test]
    fn quarantines_corrupt_third_party_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("3rd.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = SenderStore::new(dir.path().join("safe.json"), path.clone());

        let senders = store.load_third_party().unwrap();
        assert!(senders.0.is_empty());
        assert!(!path.exists());
    }
}
