//! Filestack webhook signatures.
//!
//! `FS-Signature` carries hex(HMAC-SHA256(secret, message)). When an
//! `FS-Timestamp` header accompanies it the message is `"{timestamp}." ++ body`,
//! otherwise it is the body alone. The body is always the exact bytes received.
//! A signed timestamp older or newer than the tolerance window is refused so a
//! captured delivery cannot be replayed later.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{api::error, constants::WebhookSecret};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "FS-Signature";
pub const TIMESTAMP_HEADER: &str = "FS-Timestamp";

fn mac_for(
    secret: &WebhookSecret,
    timestamp: Option<&str>,
    body: &[u8],
) -> Result<HmacSha256, error::SystemError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| error::SystemError::config("webhook secret is not a valid HMAC key"))?;
    if let Some(ts) = timestamp {
        mac.update(ts.as_bytes());
        mac.update(b".");
    }
    mac.update(body);
    Ok(mac)
}

/// Check `signature` against the raw request body in constant time.
pub fn verify(
    secret: &WebhookSecret,
    timestamp: Option<&str>,
    body: &[u8],
    signature: Option<&str>,
) -> Result<(), error::SystemError> {
    let signature = signature
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| error::SystemError::authentication_failed("missing signature"))?;
    let signature = signature.strip_prefix("sha256=").unwrap_or(signature);

    let expected = hex::decode(signature)
        .map_err(|_| error::SystemError::authentication_failed("signature is not valid hex"))?;

    mac_for(secret, timestamp, body)?
        .verify_slice(&expected)
        .map_err(|_| error::SystemError::authentication_failed("signature mismatch"))
}

/// Reject a signed `FS-Timestamp` (unix seconds) that is too far from `now`.
pub fn check_freshness(
    timestamp: &str,
    now: i64,
    tolerance_secs: u64,
) -> Result<(), error::SystemError> {
    let sent: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| error::SystemError::authentication_failed("timestamp is not unix seconds"))?;

    if sent.abs_diff(now) > tolerance_secs {
        return Err(error::SystemError::authentication_failed("timestamp outside tolerance window"));
    }
    Ok(())
}

#[cfg(test)]
pub fn sign(secret: &WebhookSecret, timestamp: Option<&str>, body: &[u8]) -> String {
    let mac = mac_for(secret, timestamp, body).expect("HMAC accepts any key size");
    hex::encode(mac.finalize().into_bytes())
}
