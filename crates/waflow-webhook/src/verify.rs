// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook authenticity checks.
//!
//! The setup handshake compares the tenant's verification token and
//! echoes the challenge. Delivery validation computes HMAC-SHA256 over
//! the raw, unparsed body and compares against the signature header with
//! a length-checked, timing-safe comparison. Failures never reveal which
//! check missed.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use waflow_core::WaflowError;

type HmacSha256 = Hmac<Sha256>;

/// Expected value of the handshake `mode` parameter.
pub const SUBSCRIBE_MODE: &str = "subscribe";

/// Prefix of the delivery signature header value.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Validate the setup handshake and return the challenge to echo back.
///
/// Plain equality is acceptable on this path; the endpoint is rate
/// limited per source address.
pub fn verify_subscribe(
    expected_token: &str,
    mode: &str,
    token: &str,
    challenge: &str,
) -> Result<String, WaflowError> {
    if mode != SUBSCRIBE_MODE || token != expected_token {
        return Err(WaflowError::Auth("handshake rejected".into()));
    }
    Ok(challenge.to_string())
}

/// Verify the delivery signature header against the raw request body.
pub fn verify_signature(
    app_secret: &str,
    raw_body: &[u8],
    signature_header: &str,
) -> Result<(), WaflowError> {
    let hex_digest = signature_header
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or_else(|| WaflowError::Auth("malformed signature header".into()))?;
    let supplied = hex::decode(hex_digest)
        .map_err(|_| WaflowError::Auth("malformed signature header".into()))?;

    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
        .map_err(|_| WaflowError::Auth("invalid signing secret".into()))?;
    mac.update(raw_body);
    mac.verify_slice(&supplied)
        .map_err(|_| WaflowError::Auth("signature mismatch".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn handshake_echoes_challenge_on_match() {
        let challenge = verify_subscribe("tok", "subscribe", "tok", "1158201444").unwrap();
        assert_eq!(challenge, "1158201444");
    }

    #[test]
    fn handshake_rejects_wrong_mode_or_token() {
        assert!(verify_subscribe("tok", "unsubscribe", "tok", "c").is_err());
        assert!(verify_subscribe("tok", "subscribe", "wrong", "c").is_err());
    }

    #[test]
    fn handshake_failure_is_generic() {
        let bad_mode = verify_subscribe("tok", "unsubscribe", "tok", "c").unwrap_err();
        let bad_token = verify_subscribe("tok", "subscribe", "wrong", "c").unwrap_err();
        assert_eq!(bad_mode.to_string(), bad_token.to_string());
    }

    #[test]
    fn valid_signature_passes() {
        let body = br#"{"entry":[]}"#;
        let header = sign("secret", body);
        assert!(verify_signature("secret", body, &header).is_ok());
    }

    #[test]
    fn tampered_body_fails() {
        let header = sign("secret", br#"{"entry":[]}"#);
        assert!(verify_signature("secret", br#"{"entry":[1]}"#, &header).is_err());
    }

    #[test]
    fn wrong_secret_fails() {
        let body = br#"{"entry":[]}"#;
        let header = sign("other", body);
        assert!(verify_signature("secret", body, &header).is_err());
    }

    #[test]
    fn missing_prefix_and_bad_hex_fail() {
        assert!(verify_signature("secret", b"x", "deadbeef").is_err());
        assert!(verify_signature("secret", b"x", "sha256=not-hex").is_err());
    }

    #[test]
    fn truncated_signature_fails() {
        let body = br#"{"entry":[]}"#;
        let header = sign("secret", body);
        let truncated = &header[..header.len() - 8];
        assert!(verify_signature("secret", body, truncated).is_err());
    }
}
