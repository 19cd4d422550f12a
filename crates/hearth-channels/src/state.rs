//! The process-wide channel-state atom (§9: "the channel-state atom
//! deserves explicit atomic-write semantics").
//!
//! Persisted as a single word in `channel.txt` under the state directory so
//! the active channel survives a daemon restart.

use hearth_core::types::ChannelState;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::RwLock;

pub struct ChannelStateStore {
    path: PathBuf,
    current: RwLock<ChannelState>,
}

impl ChannelStateStore {
    pub fn load(path: PathBuf) -> Self {
        let current = std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| ChannelState::from_str(&raw).ok())
            .unwrap_or_default();
        Self {
            path,
            current: RwLock::new(current),
        }
    }

    pub fn get(&self) -> ChannelState {
        *self.current.read().unwrap()
    }

    /// Atomically update and persist the channel state: write to a sibling
    /// `.tmp` file, then rename over the target so a concurrent reader never
    /// observes a half-written value.
    pub fn set(&self, state: ChannelState) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, state.to_string())?;
        std::fs::rename(&tmp, &self.path)?;
        *self.current.write().unwrap() = state;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_terminal_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChannelStateStore::load(dir.path().join("channel.txt"));
        assert_eq!(store.get(), ChannelState::Terminal);
    }

    #[test]
    fn set_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("channel.txt");
        let store = ChannelStateStore::load(path.clone());
        store.set(ChannelState::Chat).unwrap();
        assert_eq!(store.get(), ChannelState::Chat);

        let reloaded = ChannelStateStore::load(path);
        assert_eq!(reloaded.get(), ChannelState::Chat);
    }
}
