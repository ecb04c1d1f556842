//! Durable credential storage implementations.

pub mod file;
pub mod memory;

pub use file::FileCredentialStorage;
pub use memory::MemoryCredentialStorage;
