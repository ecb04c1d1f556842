//! # refill-auth
//!
//! Authentication token lifecycle for the Refill client.
//!
//! ## Modules
//!
//! - `jwt`: reading access token claims (cafe id, subject)
//! - `storage`: durable credential storage (file and in-memory)
//! - `token_store`: session state, login/logout and single-flight refresh

pub mod jwt;
pub mod storage;
pub mod token_store;

pub use jwt::{AccessClaims, decode_unverified};
pub use storage::{FileCredentialStorage, MemoryCredentialStorage};
pub use token_store::TokenStore;
