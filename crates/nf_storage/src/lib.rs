use nf_core::{Error, Result};
use std::sync::Arc;

pub mod backends;

pub use backends::memory::MemoryStorage;

/// Construct a storage backend by name. Only the in-memory backend is built
/// in; external article stores plug in through the `nf_core` traits.
pub async fn create_storage(kind: &str) -> Result<Arc<MemoryStorage>> {
    match kind {
        "memory" => Ok(Arc::new(MemoryStorage::new())),
        other => Err(Error::Storage(format!("unknown storage backend: {}", other))),
    }
}

pub mod prelude {
    pub use super::MemoryStorage;
    pub use nf_core::{ArticleQuery, ArticleStore, InteractionStore};
}
