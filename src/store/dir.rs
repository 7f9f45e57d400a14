//! DirStore - config store backed by a directory tree
//!
//! Layout: `<root>/<namespace>/<key>`, which is how a ConfigMap looks when
//! mounted as a volume (one file per data key).

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::ConfigStore;
use crate::error::{ConvertError, Result};

#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a lookup to a path, refusing anything that could leave `root`
    fn entry_path(&self, namespace: &str, key: &str) -> Option<PathBuf> {
        let is_plain = |segment: &str| {
            let mut components = Path::new(segment).components();
            matches!(
                (components.next(), components.next()),
                (Some(Component::Normal(_)), None)
            )
        };
        if is_plain(namespace) && is_plain(key) {
            Some(self.root.join(namespace).join(key))
        } else {
            None
        }
    }
}

#[async_trait]
impl ConfigStore for DirStore {
    async fn lookup(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let Some(path) = self.entry_path(namespace, key) else {
            debug!(namespace, key, "rejecting non-plain store key");
            return Ok(None);
        };

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConvertError::Store {
                namespace: namespace.to_string(),
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
