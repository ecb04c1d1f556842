//! Claims carried in the backend's access tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The subset of access token claims the client reads.
///
/// Every field is optional; the backend adds claims per role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessClaims {
    /// Subject, the account id. May be a string or a number.
    pub sub: Option<serde_json::Value>,
    /// Role at the time of issuance.
    pub role: Option<String>,
    /// Assigned cafe for cashier accounts.
    pub cafe_id: Option<String>,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: Option<i64>,
    /// Expiration timestamp (seconds since epoch).
    pub exp: Option<i64>,
}

impl AccessClaims {
    /// The subject rendered as a string.
    pub fn subject(&self) -> Option<String> {
        match self.sub.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Returns the expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }
}
