//! Compact token (JWT) decoding, claim lookup and expiration checks.
//!
//! Everything here is pure: no storage access, no caching. The signature is
//! not verified, the client only reads its own token to drive the UI; the
//! server remains the authority on validity.
//!
//! Malformed input never escapes as an error: the public functions degrade to
//! `None` / [`ClaimLookup::Undecodable`] / "expired".

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

// base64url, padding optional (JWTs omit it, some encoders keep it).
const B64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("empty token")]
    Empty,
    #[error("expected 3 segments, got {0}")]
    SegmentCount(usize),
    #[error("segment {0} is not valid base64url")]
    Base64(usize),
    #[error("payload is not a JSON object")]
    Payload,
}

/// Decoded claim set. No schema beyond an optional numeric `exp`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Claims(Map<String, Value>);

/// Result of looking up one claim on a token.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimLookup {
    /// The token could not be decoded; nothing is known.
    Undecodable,
    /// The token decoded but the claim is not there.
    Absent,
    Present(Value),
}

impl ClaimLookup {
    /// Flatten into the string contract: `None` = undecodable, `""` = absent.
    ///
    /// Strings are returned as-is, `null` as `""`, other values as their JSON text.
    pub fn into_string(self) -> Option<String> {
        match self {
            Self::Undecodable => None,
            Self::Absent => Some(String::new()),
            Self::Present(Value::String(s)) => Some(s),
            Self::Present(Value::Null) => Some(String::new()),
            Self::Present(other) => Some(other.to_string()),
        }
    }
}

impl Claims {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn lookup(&self, field: &str) -> ClaimLookup {
        match self.0.get(field) {
            Some(value) => ClaimLookup::Present(value.clone()),
            None => ClaimLookup::Absent,
        }
    }

    /// `exp` in epoch seconds, if present and numeric.
    pub fn exp(&self) -> Option<f64> {
        self.0.get("exp").and_then(Value::as_f64)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

/// Decode with the failure reason kept. Prefer [`decode`] at call sites.
pub fn try_decode(token: &str) -> Result<Claims, DecodeError> {
    if token.is_empty() {
        return Err(DecodeError::Empty);
    }

    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(DecodeError::SegmentCount(segments.len()));
    }

    let mut decoded = Vec::with_capacity(3);
    for (index, segment) in segments.iter().enumerate() {
        let bytes = B64URL
            .decode(segment)
            .map_err(|_| DecodeError::Base64(index))?;
        decoded.push(bytes);
    }

    match serde_json::from_slice::<Value>(&decoded[1]) {
        Ok(Value::Object(map)) => Ok(Claims(map)),
        _ => Err(DecodeError::Payload),
    }
}

/// Decode the payload of a compact token. `None` for anything malformed.
pub fn decode(token: &str) -> Option<Claims> {
    match try_decode(token) {
        Ok(claims) => Some(claims),
        Err(err) => {
            tracing::trace!(error = %err, "token not decodable");
            None
        }
    }
}

/// Expiration instant, when the token decodes and carries a usable `exp`.
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    let exp = decode(token)?.exp()?;
    if !exp.is_finite() {
        return None;
    }
    DateTime::from_timestamp(exp.floor() as i64, 0)
}

/// Expired if undecodable, if `exp` is missing, or if `exp <= now`.
pub fn is_expired_at(token: &str, now: DateTime<Utc>) -> bool {
    match decode(token).and_then(|claims| claims.exp()) {
        Some(exp) => exp <= now.timestamp() as f64,
        None => true,
    }
}

/// [`is_expired_at`] against the current wall clock. Never memoized.
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, Utc::now())
}

pub fn lookup_claim(token: &str, field: &str) -> ClaimLookup {
    match decode(token) {
        Some(claims) => claims.lookup(field),
        None => ClaimLookup::Undecodable,
    }
}

/// `None` when the token cannot be decoded, `Some("")` when it decodes
/// without `field`, otherwise the claim's string value.
pub fn get_claim(token: &str, field: &str) -> Option<String> {
    lookup_claim(token, field).into_string()
}
