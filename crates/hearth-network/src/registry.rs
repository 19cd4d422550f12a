//! Relay agent registration (§4.8): `POST /registry/agents` publishes this
//! agent's name and public key, unauthenticated per §4.8's "registration
//! auth" note — a new agent has no registered key yet to sign with.

use crate::error::{NetworkError, Result};
use crate::types::{AgentRegistration, RegistrationOutcome, RegistrationStatus};

pub async fn register(
    client: &reqwest::Client,
    relay_url: &str,
    registration: &AgentRegistration,
) -> Result<RegistrationOutcome> {
    let url = format!("{}/registry/agents", relay_url.trim_end_matches('/'));
    let resp = client
        .post(&url)
        .json(registration)
        .send()
        .await
        .map_err(|e| NetworkError::Transport(e.to_string()))?;

    match resp.status() {
        status if status.is_success() => Ok(RegistrationOutcome::Registered),
        reqwest::StatusCode::CONFLICT => {
            let status = check_status(client, relay_url, &registration.name).await?;
            Ok(RegistrationOutcome::AlreadyRegistered(status))
        }
        status => {
            let body = resp.text().await.unwrap_or_default();
            Err(NetworkError::RelayRejected { status: status.as_u16(), body })
        }
    }
}

/// `GET /registry/agents/<name>` — used after a `409` on (re-)registration
/// to learn whether the relay still considers this key `pending`,
/// `approved`, or `revoked`.
pub async fn check_status(
    client: &reqwest::Client,
    relay_url: &str,
    name: &str,
) -> Result<RegistrationStatus> {
    let url = format!("{}/registry/agents/{}", relay_url.trim_end_matches('/'), name);
    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(|e| NetworkError::Transport(e.to_string()))?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(NetworkError::RelayRejected { status, body });
    }

    #[derive(serde::Deserialize)]
    struct StatusResponse {
        status: RegistrationStatus,
    }
    let parsed: StatusResponse = resp.json().await.map_err(|e| NetworkError::Transport(e.to_string()))?;
    Ok(parsed.status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_serializes_with_expected_fields() {
        let registration = AgentRegistration {
            name: "hearth-alpha".into(),
            public_key: "pk123".into(),
            owner_email: Some("owner@example.com".into()),
        };
        let json = serde_json::to_value(&registration).unwrap();
        assert_eq!(json["name"], "hearth-alpha");
        assert_eq!(json["public_key"], "pk123");
    }
}
