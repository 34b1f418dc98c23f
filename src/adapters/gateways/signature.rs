//! Signed webhook headers.
//!
//! Every gateway callback carries `t=<unix>,v1=<hex hmac>` where the MAC is
//! HMAC-SHA256 over `"<t>.<raw body>"` keyed by the gateway's webhook
//! secret.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::ports::GatewayError;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age for webhook events (5 minutes).
pub const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps (60 seconds).
pub const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

/// Parsed signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub v1_signature: Vec<u8>,
}

impl SignatureHeader {
    /// Parses `t=...,v1=...`; unknown keys are ignored.
    pub fn parse(header: &str) -> Result<Self, GatewayError> {
        if header.trim().is_empty() {
            return Err(GatewayError::invalid_webhook("missing signature header"));
        }

        let mut timestamp = None;
        let mut v1_signature = None;
        for part in header.split(',') {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| GatewayError::invalid_webhook("malformed signature header"))?;
            match key.trim() {
                "t" => {
                    timestamp = Some(
                        value
                            .trim()
                            .parse::<i64>()
                            .map_err(|_| GatewayError::invalid_webhook("invalid signature timestamp"))?,
                    )
                }
                "v1" => {
                    v1_signature = Some(
                        hex::decode(value.trim())
                            .map_err(|_| GatewayError::invalid_webhook("signature is not hex"))?,
                    )
                }
                _ => {}
            }
        }

        Ok(Self {
            timestamp: timestamp.ok_or_else(|| GatewayError::invalid_webhook("missing t= in signature"))?,
            v1_signature: v1_signature
                .ok_or_else(|| GatewayError::invalid_webhook("missing v1= in signature"))?,
        })
    }
}

/// Computes the hex MAC for a payload at a timestamp.
pub fn sign(secret: &SecretString, timestamp: i64, payload: &[u8]) -> Result<String, GatewayError> {
    Ok(hex::encode(mac_bytes(secret, timestamp, payload)?))
}

fn mac_bytes(secret: &SecretString, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, GatewayError> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|e| GatewayError::invalid_webhook(format!("bad webhook secret: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Verifies a header against a payload at `now` (unix seconds).
pub fn verify(
    secret: &SecretString,
    payload: &[u8],
    header: &SignatureHeader,
    now: i64,
) -> Result<(), GatewayError> {
    let age = now - header.timestamp;
    if age > MAX_TIMESTAMP_AGE_SECS {
        tracing::warn!(
            event_timestamp = header.timestamp,
            current_time = now,
            age_secs = age,
            "Webhook event too old - possible replay"
        );
        return Err(GatewayError::invalid_webhook(format!("event too old ({} seconds)", age)));
    }
    if age < -MAX_FUTURE_TOLERANCE_SECS {
        tracing::warn!(
            event_timestamp = header.timestamp,
            current_time = now,
            "Webhook event from the future"
        );
        return Err(GatewayError::invalid_webhook("event timestamp in future"));
    }

    let expected = mac_bytes(secret, header.timestamp, payload)?;
    if expected.as_slice().ct_eq(header.v1_signature.as_slice()).unwrap_u8() != 1 {
        tracing::warn!("Invalid webhook signature");
        return Err(GatewayError::invalid_webhook("invalid signature"));
    }
    Ok(())
}
