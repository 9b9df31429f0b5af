//! Webhook signature verification.
//!
//! The provider signs `"<timestamp>.<raw body>"` with HMAC-SHA256 and sends
//! `t=<timestamp>,v1=<hex>` in the signature header. Several `v1` entries may
//! be present while the provider rotates secrets; any one matching is enough.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::events::ProviderEvent;
use crate::utils::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, PartialEq, Eq)]
struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    fn parse(header: &str) -> AppResult<Self> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            match key {
                "t" => timestamp = value.parse::<i64>().ok(),
                // Undecodable entries can never match; skip them.
                "v1" => signatures.extend(hex::decode(value).ok()),
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| AppError::bad_request("Webhook signature has no timestamp"))?;
        if signatures.is_empty() {
            return Err(AppError::bad_request("Webhook signature has no v1 entry"));
        }
        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
    tolerance_secs: i64,
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>, tolerance_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs,
        }
    }

    /// Authenticates `payload` against `header` and decodes it.
    pub fn verify(
        &self,
        payload: &[u8],
        header: &str,
        now: DateTime<Utc>,
    ) -> AppResult<ProviderEvent> {
        let header = SignatureHeader::parse(header)?;

        let within_tolerance = now
            .timestamp()
            .checked_sub(header.timestamp)
            .map(i64::unsigned_abs)
            .is_some_and(|age| age <= self.tolerance_secs.unsigned_abs());
        if !within_tolerance {
            return Err(AppError::bad_request(
                "Webhook timestamp is outside the tolerance window",
            ));
        }

        let mut matched = false;
        for expected in &header.signatures {
            let mac = self.mac(header.timestamp, payload)?;
            if mac.verify_slice(expected).is_ok() {
                matched = true;
                break;
            }
        }
        if !matched {
            return Err(AppError::bad_request("Invalid webhook signature"));
        }

        serde_json::from_slice(payload)
            .map_err(|_| AppError::bad_request("Malformed webhook payload"))
    }

    /// Builds a header value the way the provider would for `payload`.
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> AppResult<String> {
        let signature = self.mac(timestamp, payload)?.finalize().into_bytes();
        Ok(format!("t={timestamp},v1={}", hex::encode(signature)))
    }

    fn mac(&self, timestamp: i64, payload: &[u8]) -> AppResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| AppError::internal("Webhook secret cannot key HMAC-SHA256"))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const PAYLOAD: &[u8] =
        br#"{"id":"evt_1","type":"payment_intent.created","data":{"object":{"id":"pi_1"}}}"#;

    #[test]
    fn test_signed_payload_verifies() {
        let verifier = SignatureVerifier::new("whsec_test", 300);
        let now = Utc::now();
        let header = verifier.sign(PAYLOAD, now.timestamp()).unwrap();

        let event = verifier.verify(PAYLOAD, &header, now).unwrap();
        assert_eq!(event.id, "evt_1");
        assert_eq!(event.event_type, "payment_intent.created");
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let now = Utc::now();
        let header = SignatureVerifier::new("whsec_other", 300)
            .sign(PAYLOAD, now.timestamp())
            .unwrap();

        let err = SignatureVerifier::new("whsec_test", 300)
            .verify(PAYLOAD, &header, now)
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_extreme_timestamps_are_outside_the_window() {
        let verifier = SignatureVerifier::new("whsec_test", 300);
        let now = Utc::now();

        for timestamp in [i64::MIN, i64::MIN + 1, i64::MAX] {
            let header = format!("t={timestamp},v1=00");
            let err = verifier.verify(PAYLOAD, &header, now).unwrap_err();
            assert!(
                matches!(&err, AppError::BadRequest(message) if message.contains("tolerance")),
                "t={timestamp} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_tampered_body_is_rejected() {
        let verifier = SignatureVerifier::new("whsec_test", 300);
        let now = Utc::now();
        let header = verifier.sign(PAYLOAD, now.timestamp()).unwrap();

        let tampered = br#"{"id":"evt_2","type":"payment_intent.created","data":{"object":{}}}"#;
        assert!(verifier.verify(tampered, &header, now).is_err());
    }

    #[test]
    fn test_stale_timestamp_is_rejected() {
        let verifier = SignatureVerifier::new("whsec_test", 300);
        let signed_at = Utc::now() - Duration::minutes(10);
        let header = verifier.sign(PAYLOAD, signed_at.timestamp()).unwrap();

        assert!(verifier.verify(PAYLOAD, &header, Utc::now()).is_err());
    }

    #[test]
    fn test_any_matching_v1_entry_is_accepted() {
        let verifier = SignatureVerifier::new("whsec_test", 300);
        let now = Utc::now();
        let valid = verifier.sign(PAYLOAD, now.timestamp()).unwrap();
        let valid_sig = valid.split_once(",v1=").unwrap().1;
        let header = format!("t={},v1={},v1={valid_sig}", now.timestamp(), "00".repeat(32));

        assert!(verifier.verify(PAYLOAD, &header, now).is_ok());
    }

    #[test]
    fn test_header_parsing() {
        assert!(SignatureHeader::parse("v1=abcd").is_err());
        assert!(SignatureHeader::parse("t=12").is_err());
        assert!(SignatureHeader::parse("garbage").is_err());

        let parsed = SignatureHeader::parse("t=12, v1=abcd, v0=ffff").unwrap();
        assert_eq!(parsed.timestamp, 12);
        assert_eq!(parsed.signatures, vec![vec![0xab, 0xcd]]);
    }
}
