//! Token storage adapters.

mod file_token_storage;
mod memory_token_storage;

pub use file_token_storage::FileTokenStorage;
pub use memory_token_storage::MemoryTokenStorage;
