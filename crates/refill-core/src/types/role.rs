//! Account role carried alongside the session tokens.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// The role the backend assigned to the logged-in account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// A regular customer account.
    User,
    /// A cafe cashier; the access token also carries an assigned cafe id.
    Cashier,
}

impl UserRole {
    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Cashier => "cashier",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "cashier" => Ok(Self::Cashier),
            other => Err(AppError::validation(format!("Unknown role: {other}"))),
        }
    }
}
