use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::builtin;
use crate::error::{PipelineError, Result};
use crate::operation::OperationConfig;

/// Maximum catalog file size accepted by [`OperationCatalog::from_file`].
pub const MAX_CATALOG_FILE_SIZE: u64 = 1024 * 1024;

#[derive(Deserialize)]
struct CatalogFile {
    operations: Vec<OperationConfig>,
}

/// Name-keyed, read-only set of operation configs.
#[derive(Debug, Clone, Default)]
pub struct OperationCatalog {
    operations: BTreeMap<String, Arc<OperationConfig>>,
}

impl OperationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The operations served by the reference-data proxy.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for operation in builtin::operations() {
            catalog.insert(operation);
        }
        catalog
    }

    /// Build from a list, rejecting duplicate names.
    pub fn from_operations(operations: impl IntoIterator<Item = OperationConfig>) -> Result<Self> {
        let mut catalog = Self::new();
        for operation in operations {
            if operation.name.is_empty() {
                return Err(PipelineError::InvalidCatalog(
                    "operation name must not be empty".to_string(),
                ));
            }
            if catalog.operations.contains_key(&operation.name) {
                return Err(PipelineError::InvalidCatalog(format!(
                    "duplicate operation {}",
                    operation.name
                )));
            }
            catalog.insert(operation);
        }
        Ok(catalog)
    }

    /// Parse `{"operations": [...]}` using the declarative selector form.
    pub fn from_json(text: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(text)
            .map_err(|err| PipelineError::InvalidCatalog(err.to_string()))?;
        Self::from_operations(file.operations)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path).map_err(|err| {
            PipelineError::InvalidCatalog(format!("{}: {err}", path.display()))
        })?;
        if metadata.len() > MAX_CATALOG_FILE_SIZE {
            return Err(PipelineError::InvalidCatalog(format!(
                "catalog file too large ({} bytes): {}",
                metadata.len(),
                path.display()
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|err| {
            PipelineError::InvalidCatalog(format!("{}: {err}", path.display()))
        })?;
        let catalog = Self::from_json(&text)?;
        tracing::debug!(path = %path.display(), operations = catalog.len(), "loaded operation catalog");
        Ok(catalog)
    }

    /// Insert or replace an operation.
    pub fn insert(&mut self, operation: OperationConfig) {
        self.operations
            .insert(operation.name.clone(), Arc::new(operation));
    }

    pub fn get(&self, name: &str) -> Option<Arc<OperationConfig>> {
        self.operations.get(name).cloned()
    }

    /// Like [`get`](Self::get), but an unknown name is an error.
    pub fn require(&self, name: &str) -> Result<Arc<OperationConfig>> {
        self.get(name)
            .ok_or_else(|| PipelineError::UnknownOperation(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.operations.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperationConfig> {
        self.operations.values().map(|op| op.as_ref())
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
