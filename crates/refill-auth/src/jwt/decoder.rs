//! Unverified claim decoding.
//!
//! The client never holds the signing key, so tokens are read, not
//! validated. Only the claims segment is decoded.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use refill_core::error::{AppError, ErrorKind};
use refill_core::result::AppResult;

use super::claims::AccessClaims;

/// Decodes the claims segment of a JWT without verifying its signature.
pub fn decode_unverified(token: &str) -> AppResult<AccessClaims> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_)) if !payload.is_empty() => payload,
        _ => {
            return Err(AppError::validation(
                "Invalid token format: expected three segments",
            ));
        }
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Validation,
                "Invalid token format: claims are not base64url",
                e,
            )
        })?;

    serde_json::from_slice(&bytes).map_err(|e| {
        AppError::with_source(
            ErrorKind::Validation,
            "Invalid token format: claims are not a JSON object",
            e,
        )
    })
}

#[cfg(test)]
pub(crate) fn encode_for_test(claims: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}
