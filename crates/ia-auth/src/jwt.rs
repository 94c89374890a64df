//! Unverified JWT payload decoding.
//!
//! Intacct access tokens are JWTs whose payload carries the company id
//! (`cnyId`). The signature is not checked: the token is only read locally.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::{Error, ErrorKind, Result};

/// Claim holding the tenant (company) id.
const TENANT_CLAIM: &str = "cnyId";

/// Decode the payload segment of a `header.payload.signature` token.
pub fn decode_payload(token: &str) -> Result<serde_json::Value> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(Error::new(ErrorKind::TokenInvalid(
            "expected three dot-separated segments".to_string(),
        )));
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| Error::with_source(ErrorKind::TokenInvalid(e.to_string()), e))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| Error::with_source(ErrorKind::TokenInvalid(e.to_string()), e))
}

/// The tenant id claim of a token, if it decodes and carries one.
pub fn tenant_id(token: &str) -> Option<String> {
    let payload = decode_payload(token).ok()?;
    match payload.get(TENANT_CLAIM)? {
        serde_json::Value::String(id) => Some(id.clone()),
        serde_json::Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) fn encode_test_token(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.signature")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_payload() {
        let token = encode_test_token(&serde_json::json!({"cnyId": "ACME-US", "sub": "u1"}));
        let payload = decode_payload(&token).unwrap();
        assert_eq!(payload["sub"], "u1");
        assert_eq!(tenant_id(&token).as_deref(), Some("ACME-US"));
    }

    #[test]
    fn test_padded_payload_accepted() {
        let token = encode_test_token(&serde_json::json!({"cnyId": "A"}));
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        while parts[1].len() % 4 != 0 {
            parts[1].push('=');
        }
        assert_eq!(tenant_id(&parts.join(".")).as_deref(), Some("A"));
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(matches!(
            decode_payload("only.two").unwrap_err().kind,
            ErrorKind::TokenInvalid(_)
        ));
        assert!(decode_payload("a.!!!.c").is_err());
        assert!(decode_payload("a.bm90LWpzb24.c").is_err());
        assert_eq!(tenant_id("opaque-token"), None);
    }

    #[test]
    fn test_missing_claim() {
        let token = encode_test_token(&serde_json::json!({"sub": "u1"}));
        assert_eq!(tenant_id(&token), None);
    }
}
