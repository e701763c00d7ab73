//! Remembering the bound target across page loads.
//!
//! Only a descriptor (`{tagName, id, name, className}`) is stored; node
//! handles do not survive a reload. On the next session the descriptor is
//! matched against the page by id, then name, then class list plus tag.

use crate::host::HostPage;
use crate::types::{ElementDescriptor, ElementRef, NodeId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Key the last selection is stored under
pub const LAST_SELECTION_KEY: &str = "lastSelectedElement";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Key/value store for string values
#[async_trait::async_trait]
pub trait SelectionStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Store backed by a single JSON object file
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<HashMap<String, String>, StorageError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(HashMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait::async_trait]
impl SelectionStore for FileStore {
    async fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut values = self.read_all().await?;
        Ok(values.remove(key))
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        // A corrupt file is replaced rather than blocking every later save
        let mut values = match self.read_all().await {
            Ok(values) => values,
            Err(StorageError::Serialization(e)) => {
                warn!("Discarding unreadable store {:?}: {}", self.path, e);
                HashMap::new()
            }
            Err(e) => return Err(e),
        };
        values.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(&values)?;
        tokio::fs::write(&self.path, contents).await?;
        debug!("Saved {} to {:?}", key, self.path);
        Ok(())
    }
}

/// In-process store, used when persistence is disabled and in tests
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl SelectionStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values().get(key).cloned())
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Persist the descriptor of the bound target
pub async fn save_selection(
    store: &dyn SelectionStore,
    key: &str,
    target: &ElementRef,
) -> Result<(), StorageError> {
    let json = serde_json::to_string(target.descriptor())?;
    store.save(key, &json).await?;
    info!("Remembered target {}", target.descriptor().label());
    Ok(())
}

/// Read the saved descriptor, if any
pub async fn load_descriptor(
    store: &dyn SelectionStore,
    key: &str,
) -> Result<Option<ElementDescriptor>, StorageError> {
    match store.load(key).await? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// Find the node a saved descriptor most likely refers to
pub fn find_candidate(host: &dyn HostPage, descriptor: &ElementDescriptor) -> Option<NodeId> {
    let mut candidates = Vec::new();

    if !descriptor.id.is_empty() {
        candidates.extend(host.element_by_id(&descriptor.id));
    }
    if !descriptor.name.is_empty() {
        candidates.extend(host.elements_by_name(&descriptor.name));
    }
    if candidates.is_empty() && !descriptor.class_name.trim().is_empty() {
        candidates.extend(
            host.elements_by_class_name(&descriptor.class_name)
                .into_iter()
                .filter(|node| host.tag_name(*node).eq_ignore_ascii_case(&descriptor.tag_name)),
        );
    }

    candidates.into_iter().next()
}
