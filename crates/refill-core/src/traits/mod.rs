//! Seam traits defined in `refill-core` and implemented by other crates.

pub mod refresher;
pub mod session;
pub mod storage;

pub use refresher::TokenRefresher;
pub use session::SessionAuthority;
pub use storage::CredentialStorage;
