//! Request signing for event deliveries.
//!
//! The runtime sends `X-Inngest-Signature: t=<unix seconds>&s=<hex>` where
//! `s = HMAC-SHA256(key, body || t)` and `key` is the signing key with its
//! `signkey-<env>-` prefix removed.

use ring::hmac;
use thiserror::Error;

pub const SIGNATURE_HEADER: &str = "x-inngest-signature";

/// Maximum age of a signed request, in seconds.
const MAX_SKEW_SECS: u64 = 5 * 60;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing signature header")]
    Missing,

    #[error("malformed signature header")]
    Malformed,

    #[error("signature timestamp outside the allowed window")]
    Expired,

    #[error("signature does not match")]
    Mismatch,
}

pub struct SigningKey {
    key: hmac::Key,
}

impl SigningKey {
    pub fn new(raw: &str) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, strip_key_prefix(raw).as_bytes()),
        }
    }

    /// Produces the header value for `body` signed at `timestamp`.
    pub fn sign(&self, body: &[u8], timestamp: i64) -> String {
        let ts = timestamp.to_string();
        let tag = hmac::sign(&self.key, &signed_message(body, &ts));
        format!("t={}&s={}", ts, hex::encode(tag.as_ref()))
    }

    pub fn verify(&self, body: &[u8], header: Option<&str>, now: i64) -> Result<(), SignatureError> {
        let header = header.ok_or(SignatureError::Missing)?;

        let mut timestamp = None;
        let mut signature = None;
        for pair in header.split('&') {
            match pair.split_once('=') {
                Some(("t", v)) => timestamp = Some(v),
                Some(("s", v)) => signature = Some(v),
                _ => {}
            }
        }
        let (ts, sig) = timestamp.zip(signature).ok_or(SignatureError::Malformed)?;

        let issued: i64 = ts.parse().map_err(|_| SignatureError::Malformed)?;
        if now.abs_diff(issued) > MAX_SKEW_SECS {
            return Err(SignatureError::Expired);
        }

        let expected = hex::decode(sig).map_err(|_| SignatureError::Malformed)?;
        hmac::verify(&self.key, &signed_message(body, ts), &expected)
            .map_err(|_| SignatureError::Mismatch)
    }
}

fn signed_message(body: &[u8], ts: &str) -> Vec<u8> {
    let mut message = Vec::with_capacity(body.len() + ts.len());
    message.extend_from_slice(body);
    message.extend_from_slice(ts.as_bytes());
    message
}

fn strip_key_prefix(raw: &str) -> &str {
    raw.strip_prefix("signkey-")
        .and_then(|rest| rest.split_once('-'))
        .map(|(_, key)| key)
        .unwrap_or(raw)
}
