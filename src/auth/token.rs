//! Expiry derivation for bearer tokens.

use crate::auth::Session;
use crate::error::AppError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::DateTime;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct TokenClaims {
    exp: Option<f64>,
}

fn decode_claims(token: &str) -> Result<TokenClaims, AppError> {
    let mut segments = token.split('.');
    let (Some(_header), Some(claims), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(AppError::InvalidArgument(
            "token is not three dot-separated segments".to_string(),
        ));
    };

    let mut payload = URL_SAFE_NO_PAD.decode(claims.trim_end_matches('='))?;
    Ok(simd_json::from_slice::<TokenClaims>(&mut payload)?)
}

fn epoch_seconds_to_ms(seconds: f64) -> Option<i64> {
    let ms = seconds * 1_000.0;
    if !ms.is_finite() || ms <= 0.0 || ms >= i64::MAX as f64 {
        return None;
    }
    Some(ms as i64)
}

/// Reads `exp` (epoch seconds) from the claims segment of a structured token.
pub fn token_expiry_ms(token: &str) -> Option<i64> {
    match decode_claims(token) {
        Ok(claims) => claims.exp.and_then(epoch_seconds_to_ms),
        Err(error) => {
            tracing::debug!(%error, "token claims not decodable");
            None
        }
    }
}

/// Accepts an RFC 3339 timestamp or epoch milliseconds.
pub fn session_expiry_ms(expires: &str) -> Option<i64> {
    let trimmed = expires.trim();
    if let Ok(epoch_ms) = trimmed.parse::<i64>() {
        return (epoch_ms > 0).then_some(epoch_ms);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|instant| instant.timestamp_millis())
        .filter(|epoch_ms| *epoch_ms > 0)
}

/// The instant after which `session` is invalid, if one can be derived.
pub fn expiry_deadline_ms(session: &Session) -> Option<i64> {
    session
        .access_token
        .as_deref()
        .and_then(token_expiry_ms)
        .or_else(|| session.expires.as_deref().and_then(session_expiry_ms))
}

#[cfg(test)]
pub(crate) fn encode_test_token(claims_json: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = URL_SAFE_NO_PAD.encode(claims_json.as_bytes());
    format!("{header}.{claims}.signature")
}
