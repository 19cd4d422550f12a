//! Ed25519 identity bootstrap (§4.8): "generate an Ed25519 keypair; store
//! the private key in the secret store under a well-known name." The
//! private key never leaves the host (§3 `AgentIdentity` invariant).

use crate::error::{NetworkError, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use hearth_core::secrets::SecretStore;

/// Secret-store key suffix, combined with the `credential-` prefix per §9
/// Open Question 2 to form `credential-network-identity`.
pub const IDENTITY_SECRET_NAME: &str = "network-identity";

pub struct AgentIdentity {
    signing_key: SigningKey,
}

impl AgentIdentity {
    /// Load the existing identity from the secret store, or generate and
    /// persist a fresh one if none exists yet — the bootstrap step in §4.8.
    pub fn load_or_bootstrap(store: &dyn SecretStore) -> Result<Self> {
        match store.get(IDENTITY_SECRET_NAME)? {
            Some(encoded) => Self::from_encoded(&encoded),
            None => {
                let identity = Self::generate();
                store.set(IDENTITY_SECRET_NAME, &identity.encode())?;
                Ok(identity)
            }
        }
    }

    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
        Self { signing_key }
    }

    fn from_encoded(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| NetworkError::Transport(format!("corrupt stored identity: {e}")))?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| NetworkError::Transport("stored identity has wrong length".into()))?;
        Ok(Self { signing_key: SigningKey::from_bytes(&array) })
    }

    fn encode(&self) -> String {
        STANDARD.encode(self.signing_key.to_bytes())
    }

    pub fn public_key_base64(&self) -> String {
        STANDARD.encode(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign(&self, payload: &[u8]) -> String {
        let signature: Signature = self.signing_key.sign(payload);
        STANDARD.encode(signature.to_bytes())
    }
}

/// Verify `signature_b64` over `payload` against `public_key_b64`, per P5
/// (`verify(p, sign(p, sk), pk) == true`).
pub fn verify(payload: &[u8], signature_b64: &str, public_key_b64: &str) -> Result<bool> {
    let pk_bytes = STANDARD
        .decode(public_key_b64)
        .map_err(|_| NetworkError::BadSignature)?;
    let pk_array: [u8; 32] = pk_bytes.try_into().map_err(|_| NetworkError::BadSignature)?;
    let verifying_key = VerifyingKey::from_bytes(&pk_array).map_err(|_| NetworkError::BadSignature)?;

    let sig_bytes = STANDARD
        .decode(signature_b64)
        .map_err(|_| NetworkError::BadSignature)?;
    let sig_array: [u8; 64] = sig_bytes.try_into().map_err(|_| NetworkError::BadSignature)?;
    let signature = Signature::from_bytes(&sig_array);

    Ok(verifying_key.verify(payload, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::secrets::FileSecretStore;

    #[test]
    fn sign_then_verify_round_trips() {
        let identity = AgentIdentity::generate();
        let payload = b"hello peer";
        let sig = identity.sign(payload);
        assert!(verify(payload, &sig, &identity.public_key_base64()).unwrap());
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let identity = AgentIdentity::generate();
        let sig = identity.sign(b"hello peer");
        assert!(!verify(b"goodbye peer", &sig, &identity.public_key_base64()).unwrap());
    }

    #[test]
    fn bootstrap_persists_and_reloads_same_identity() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSecretStore::new(dir.path().join("secrets.json")).unwrap();

        let first = AgentIdentity::load_or_bootstrap(&store).unwrap();
        let pk = first.public_key_base64();

        let second = AgentIdentity::load_or_bootstrap(&store).unwrap();
        assert_eq!(second.public_key_base64(), pk);
    }
}
