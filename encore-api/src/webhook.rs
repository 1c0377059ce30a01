use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::checkout::issue_and_notify;
use crate::error::AppError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// How far a signed timestamp may lag before the delivery is treated as
/// a replay.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Verify a `t=<unix>,v1=<hex>` signature header against the shared
/// secret. The signed payload is `{t}.{raw body}`; comparison is
/// constant-time via the Mac verifier.
pub fn verify_signature(payload: &[u8], header: &str, secret: &str, now: i64) -> bool {
    let mut timestamp: Option<i64> = None;
    let mut signature: Option<Vec<u8>> = None;

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signature = hex::decode(value).ok(),
            _ => {}
        }
    }

    let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
        return false;
    };

    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return false;
    }

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac.verify_slice(&signature).is_ok()
}

/// POST /v1/webhooks/checkout
/// Asynchronous payment-completion notification from the gateway.
///
/// Nothing in the payload is trusted beyond the event type and session
/// id: the signature must verify first, and line-item detail is always
/// re-fetched from the gateway by session id. A 500 makes the gateway
/// retry; the unique external order id keeps those retries idempotent.
pub async fn handle_checkout_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::BadSignature)?;

    let now = chrono::Utc::now().timestamp();
    if !verify_signature(&body, header, &state.webhook_secret, now) {
        return Err(AppError::BadSignature);
    }

    let payload: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|_| AppError::ValidationError {
            message: "Malformed webhook payload".to_string(),
            details: None,
        })?;

    let event_type = payload["type"].as_str().unwrap_or_default();
    if event_type != "checkout.session.completed" {
        tracing::debug!(event_type, "ignoring webhook event");
        return Ok(StatusCode::OK);
    }

    let session_id = payload["data"]["object"]["id"]
        .as_str()
        .ok_or(AppError::ValidationError {
            message: "Webhook payload has no session id".to_string(),
            details: None,
        })?;

    tracing::info!(session_id, "checkout completed webhook received");

    let (session, line_items) = state
        .gateway
        .retrieve_session(session_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let (order, created) = state
        .assembler
        .assemble_paid(&session, line_items)
        .await
        .map_err(AppError::from_checkout)?;

    if created {
        issue_and_notify(&state, &order).await;
    }

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const SECRET: &str = "whsec_test123secret456";

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        let signature = hex::encode(mac.finalize().into_bytes());
        format!("t={timestamp},v1={signature}")
    }

    #[test]
    fn test_valid_signature_accepted() {
        let payload = b"{\"type\":\"checkout.session.completed\"}";
        let now = Utc::now().timestamp();
        let header = sign(payload, SECRET, now);
        assert!(verify_signature(payload, &header, SECRET, now));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = b"{\"type\":\"checkout.session.completed\"}";
        let now = Utc::now().timestamp();
        let header = sign(payload, "wrong_secret", now);
        assert!(!verify_signature(payload, &header, SECRET, now));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let payload = b"{\"type\":\"checkout.session.completed\"}";
        let tampered = b"{\"type\":\"checkout.session.completed\",\"hacked\":true}";
        let now = Utc::now().timestamp();
        let header = sign(payload, SECRET, now);
        assert!(!verify_signature(tampered, &header, SECRET, now));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let payload = b"{}";
        let now = Utc::now().timestamp();
        let header = sign(payload, SECRET, now - 600);
        assert!(!verify_signature(payload, &header, SECRET, now));
    }

    #[test]
    fn test_missing_parts_rejected() {
        let payload = b"{}";
        let now = Utc::now().timestamp();
        assert!(!verify_signature(payload, "v1=deadbeef", SECRET, now));
        assert!(!verify_signature(payload, &format!("t={now}"), SECRET, now));
        assert!(!verify_signature(payload, "", SECRET, now));
    }
}
