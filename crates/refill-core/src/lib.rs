//! # refill-core
//!
//! Core crate for the Refill client session layer. Contains configuration
//! schemas, domain types, the seam traits implemented by the other crates,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other Refill crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
