//! Access token claim reading.

pub mod claims;
pub mod decoder;

pub use claims::AccessClaims;
pub use decoder::decode_unverified;
