//! Store Module - configuration-store collaborator
//!
//! The environment resolver reads runner-label descriptors through the
//! [`ConfigStore`] trait. The client is built once by the owning process
//! and passed in explicitly; there is no global instance.
//!
//! Key types:
//! - `ConfigStore`: `lookup(namespace, key) -> bytes | not-found`
//! - `MemoryStore`: DashMap-backed store for embedding and tests
//! - `DirStore`: reads `<root>/<namespace>/<key>` (mounted ConfigMap layout)

mod dir;
mod memory;

use async_trait::async_trait;

use crate::error::Result;

pub use dir::DirStore;
pub use memory::MemoryStore;

/// Read-only key-value lookup shared by all workers
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// `Ok(None)` when the key does not exist
    async fn lookup(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>>;
}
