/*
[INPUT]:  API secret and canonical message fields
[OUTPUT]: Lowercase hex HMAC-SHA256 signatures and signing timestamps
[POS]:    Auth layer - signing primitive shared by REST and stream auth
[UPDATE]: When changing the canonical string layout or timestamp format
*/

use chrono::{SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::http::{PrimeError, Result};

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 signer keyed with the API secret
#[derive(Clone)]
pub struct HmacSigner {
    mac: HmacSha256,
}

impl std::fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HmacSigner(<redacted>)")
    }
}

impl HmacSigner {
    /// Create a signer from the API secret
    pub fn new(secret: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(PrimeError::signing("API secret is required"));
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| PrimeError::signing(format!("invalid HMAC key: {e}")))?;
        Ok(Self { mac })
    }

    /// Sign an arbitrary message, returning 64 lowercase hex characters
    pub fn sign(&self, message: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Sign a REST request.
    ///
    /// Format: "{timestamp}{METHOD}{path_with_query}{body}"; an absent body
    /// contributes nothing.
    pub fn sign_request(
        &self,
        timestamp: &str,
        method: &str,
        path_with_query: &str,
        body: Option<&str>,
    ) -> String {
        self.sign(&canonical_request(timestamp, method, path_with_query, body))
    }

    /// Sign the stream auth handshake: "{timestamp}{apiKey}"
    pub fn sign_stream_auth(&self, timestamp: &str, api_key: &str) -> String {
        self.sign(&format!("{timestamp}{api_key}"))
    }
}

/// Canonical REST message string
pub fn canonical_request(
    timestamp: &str,
    method: &str,
    path_with_query: &str,
    body: Option<&str>,
) -> String {
    format!(
        "{timestamp}{}{path_with_query}{}",
        method.to_uppercase(),
        body.unwrap_or_default()
    )
}

/// One-shot REST signature helper
pub fn generate_signature(
    secret: &str,
    timestamp: &str,
    method: &str,
    path_with_query: &str,
    body: Option<&str>,
) -> Result<String> {
    Ok(HmacSigner::new(secret)?.sign_request(timestamp, method, path_with_query, body))
}

/// ISO-8601 UTC timestamp with millisecond precision, as sent in `X-Timestamp`
pub fn rest_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Epoch milliseconds, as used by the stream protocol
pub fn epoch_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";
    const TS: &str = "2024-01-15T00:00:00Z";

    fn sig(timestamp: &str, method: &str, path: &str, body: Option<&str>) -> String {
        generate_signature(SECRET, timestamp, method, path, body).unwrap()
    }

    #[test]
    fn test_signature_is_deterministic() {
        let a = sig(TS, "GET", "/v1/accounts/123/balances", None);
        let b = sig(TS, "GET", "/v1/accounts/123/balances", None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_signature_changes_with_timestamp() {
        let a = sig(TS, "GET", "/v1/accounts/123/balances", None);
        let b = sig("2024-01-15T00:00:01Z", "GET", "/v1/accounts/123/balances", None);
        assert_ne!(a, b);
    }

    #[test]
    fn test_signature_changes_with_method() {
        let a = sig(TS, "GET", "/v1/accounts/123/balances", None);
        let b = sig(TS, "POST", "/v1/accounts/123/balances", None);
        assert_ne!(a, b);
    }

    #[test]
    fn test_method_is_uppercased() {
        assert_eq!(sig(TS, "get", "/v1/status", None), sig(TS, "GET", "/v1/status", None));
    }

    #[test]
    fn test_signature_changes_with_body_presence() {
        let without = sig(TS, "POST", "/v1/orders", None);
        let with = sig(TS, "POST", "/v1/orders", Some(r#"{"symbol":"BTC/USD"}"#));
        let empty_object = sig(TS, "POST", "/v1/orders", Some("{}"));
        assert_ne!(without, with);
        assert_ne!(without, empty_object);
    }

    #[test]
    fn test_signature_is_lowercase_hex() {
        let signature = sig(TS, "GET", "/v1/status", None);
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
    }

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2
        let signer = HmacSigner::new("Jefe").unwrap();
        assert_eq!(
            signer.sign("what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_stream_auth_canonical_form() {
        let signer = HmacSigner::new(SECRET).unwrap();
        assert_eq!(
            signer.sign_stream_auth("1700000000000", "key-1"),
            signer.sign("1700000000000key-1")
        );
    }

    #[test]
    fn test_empty_secret_rejected() {
        let err = HmacSigner::new("").unwrap_err();
        assert!(err.is_signing_error());
    }

    #[test]
    fn test_rest_timestamp_format() {
        let ts = rest_timestamp();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
        // millisecond precision: "YYYY-MM-DDTHH:MM:SS.mmmZ"
        assert_eq!(ts.len(), 24);
    }
}
