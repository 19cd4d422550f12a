//! Append-only, rotating `peer-comms.jsonl` (§4.7: "each inbound and
//! outbound event appends a JSONL record to a rotating peer-comms log"),
//! reusing `hearth-core`'s generic JSONL rotation.

use crate::types::{PeerCommsLogRecord, PeerDirection, PeerTransportKind};
use std::path::{Path, PathBuf};

pub struct PeerCommsLog {
    path: PathBuf,
}

impl PeerCommsLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn record(
        &self,
        direction: PeerDirection,
        peer: &str,
        transport: PeerTransportKind,
        message_id: &str,
        ok: bool,
    ) -> hearth_core::Result<()> {
        let record = PeerCommsLogRecord {
            direction,
            peer: peer.to_string(),
            transport,
            message_id: message_id.to_string(),
            ok,
            recorded_at: chrono::Utc::now(),
        };
        hearth_core::state::append_jsonl(&self.path, &record)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let log = PeerCommsLog::new(dir.path().join("peer-comms.jsonl"));
        log.record(PeerDirection::Out, "r2d2", PeerTransportKind::Relay, "m1", true)
            .unwrap();
        log.record(PeerDirection::In, "r2d2", PeerTransportKind::Lan, "m2", true)
            .unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
