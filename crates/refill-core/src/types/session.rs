//! Session state and the durable credential record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::role::UserRole;

/// In-memory authentication state observed by the rest of the client.
///
/// `is_authenticated` is true only while an access token is present and not
/// known to be expired.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Bearer token for API and realtime requests.
    pub access_token: Option<String>,
    /// Token exchanged for a new pair on refresh.
    pub refresh_token: Option<String>,
    /// Access token expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Account role.
    pub role: Option<UserRole>,
    /// Assigned cafe for cashier accounts, read from the access token claims.
    pub cafe_id: Option<String>,
    /// Whether the session may be used for authenticated requests.
    pub is_authenticated: bool,
    /// Incremented on every login, logout and unrecoverable session loss.
    /// Refreshes keep the epoch.
    pub epoch: u64,
    /// When the token pair was last renewed.
    pub last_refresh_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Whether the access token is expired at `now`. A session without a
    /// known expiry counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => true,
        }
    }

    /// The durable record matching this session, if it holds a full token
    /// pair with expiry and role.
    pub fn credentials(&self) -> Option<StoredCredentials> {
        Some(StoredCredentials::new(
            self.access_token.as_deref()?,
            self.refresh_token.as_deref()?,
            self.expires_at?,
            self.role?,
        ))
    }
}

/// The four durable keys written and cleared as one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    /// `auth_access_token`
    #[serde(rename = "auth_access_token")]
    pub access_token: String,
    /// `auth_refresh_token`
    #[serde(rename = "auth_refresh_token")]
    pub refresh_token: String,
    /// `auth_expiry_time`, RFC 3339.
    #[serde(rename = "auth_expiry_time")]
    pub expires_at: String,
    /// `auth_role`
    #[serde(rename = "auth_role")]
    pub role: String,
}

impl StoredCredentials {
    /// Build a record from typed values.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: DateTime<Utc>,
        role: UserRole,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at: expires_at.to_rfc3339(),
            role: role.as_str().to_string(),
        }
    }

    /// Parsed expiry; `None` when the stored value is not RFC 3339.
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.expires_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// A token pair returned by the refresh endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedTokens {
    /// New access token.
    pub access_token: String,
    /// New refresh token.
    pub refresh_token: String,
    /// New access token expiry.
    pub expires_at: DateTime<Utc>,
}
