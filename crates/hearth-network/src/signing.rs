//! Canonical-JSON signing helpers built on top of [`crate::identity`].
//!
//! Outbound relay bodies are signed over their canonical (sorted-key) JSON
//! serialization, and that exact byte string is what gets posted — so the
//! recipient verifies against precisely the bytes it received, per §6.2
//! ("Signature is over the canonical JSON string sent as the body").

use crate::error::Result;
use crate::identity::AgentIdentity;
use crate::types::RelayMessage;
use serde::Serialize;

/// Serialize `value` with sorted object keys.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let v = serde_json::to_value(value)?;
    let sorted = sort_value(v);
    Ok(serde_json::to_vec(&sorted)?)
}

fn sort_value(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = serde_json::Map::new();
            for (k, v) in entries {
                sorted.insert(k, sort_value(v));
            }
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(sort_value).collect())
        }
        other => other,
    }
}

/// Sign a [`RelayMessage`]'s canonical JSON bytes; the caller posts these
/// same bytes as the request body.
pub fn sign_message(identity: &AgentIdentity, message: &RelayMessage) -> Result<(Vec<u8>, String)> {
    let bytes = canonical_json(message)?;
    let signature = identity.sign(&bytes);
    Ok((bytes, signature))
}

/// Verify a [`RelayMessage`] payload's detached signature against the
/// sender's known public key.
pub fn verify_payload(payload: &RelayMessage, signature: &str, sender_public_key: &str) -> Result<bool> {
    let bytes = canonical_json(payload)?;
    crate::identity::verify(&bytes, signature, sender_public_key)
}

/// Sign an arbitrary signing string (the `"GET /inbox/<name> <timestamp>"`
/// form used for inbox polling and acking, per §4.8/§6.2).
pub fn sign_string(identity: &AgentIdentity, signing_string: &str) -> String {
    identity.sign(signing_string.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::types::AgentMessageKind;

    fn sample_message() -> RelayMessage {
        RelayMessage {
            from: "hearth-alpha".into(),
            to: "hearth-beta".into(),
            kind: AgentMessageKind::Text { text: "hi".into() },
            timestamp: chrono::Utc::now(),
            message_id: "m1".into(),
            nonce: "n1".into(),
        }
    }

    #[test]
    fn sign_then_verify_succeeds() {
        let identity = AgentIdentity::generate();
        let message = sample_message();
        let (_, sig) = sign_message(&identity, &message).unwrap();
        assert!(verify_payload(&message, &sig, &identity.public_key_base64()).unwrap());
    }

    #[test]
    fn verify_fails_for_mutated_payload() {
        let identity = AgentIdentity::generate();
        let mut message = sample_message();
        let (_, sig) = sign_message(&identity, &message).unwrap();

        message.nonce = "different".into();
        assert!(!verify_payload(&message, &sig, &identity.public_key_base64()).unwrap());
    }

    #[test]
    fn canonical_json_is_order_independent() {
        #[derive(Serialize)]
        struct A {
            b: u32,
            a: u32,
        }
        #[derive(Serialize)]
        struct B {
            a: u32,
            b: u32,
        }
        let one = canonical_json(&A { b: 2, a: 1 }).unwrap();
        let two = canonical_json(&B { a: 1, b: 2 }).unwrap();
        assert_eq!(one, two);
    }

    #[test]
    fn signing_string_round_trips() {
        let identity = AgentIdentity::generate();
        let s = "GET /inbox/hearth-alpha 2026-07-28T00:00:00Z";
        let sig = sign_string(&identity, s);
        assert!(crate::identity::verify(s.as_bytes(), &sig, &identity.public_key_base64()).unwrap());
    }
}
