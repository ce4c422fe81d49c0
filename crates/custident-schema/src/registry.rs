use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use jsonschema::Validator;
use serde_json::{Map, Value};

use crate::config::RegistryConfig;
use crate::error::{Result, SchemaError};
use crate::validator::check_document;

const SCHEMA_SUFFIX: &str = ".schema.json";

struct Entry {
    schema: Value,
    validator: Validator,
}

/// Operation-keyed registry of compiled JSON Schema validators.
///
/// Schemas are read-only after registration; the registry can be shared
/// across concurrent pipeline invocations behind an `Arc`.
pub struct SchemaRegistry {
    entries: BTreeMap<String, Entry>,
    config: RegistryConfig,
}

impl SchemaRegistry {
    /// Create an empty registry with default config.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with explicit config.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            entries: BTreeMap::new(),
            config,
        }
    }

    /// Register a schema for an operation from a JSON string.
    pub fn register(&mut self, operation: &str, schema_json: &str) -> Result<()> {
        let schema: Value = serde_json::from_str(schema_json)?;
        self.register_value(operation, schema)
    }

    /// Register a schema for an operation from a JSON value.
    pub fn register_value(&mut self, operation: &str, schema: Value) -> Result<()> {
        let mut schema_to_compile = schema.clone();
        if self.config.strict_mode {
            apply_strict_mode(&mut schema_to_compile);
        }

        let validator = jsonschema::validator_for(&schema_to_compile)
            .map_err(|err| SchemaError::CompileFailed(format!("{operation}: {err}")))?;

        tracing::debug!(operation, strict = self.config.strict_mode, "registered schema");
        self.entries
            .insert(operation.to_string(), Entry { schema, validator });
        Ok(())
    }

    /// Load `<operation>.schema.json` files from a directory.
    pub fn from_directory(path: &Path) -> Result<Self> {
        Self::from_directory_with_config(path, RegistryConfig::default())
    }

    /// Load schemas from a directory with explicit config.
    pub fn from_directory_with_config(path: &Path, config: RegistryConfig) -> Result<Self> {
        let mut registry = Self::with_config(config);
        let mut loaded_schema_count = 0usize;

        let entries = std::fs::read_dir(path)
            .map_err(|err| SchemaError::LoadFailed(format!("{}: {err}", path.display())))?;

        for entry in entries {
            let entry = entry.map_err(|err| SchemaError::LoadFailed(err.to_string()))?;
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            let entry_path = entry.path();
            let metadata = std::fs::symlink_metadata(&entry_path)
                .map_err(|err| SchemaError::LoadFailed(err.to_string()))?;
            let file_type = metadata.file_type();

            let Some(stem) = file_name.strip_suffix(SCHEMA_SUFFIX) else {
                continue;
            };
            if file_type.is_symlink() {
                return Err(SchemaError::LoadFailed(format!(
                    "refusing to load schema symlink: {file_name}"
                )));
            }
            if !file_type.is_file() {
                continue;
            }
            let operation = operation_from_stem(stem).ok_or_else(|| {
                SchemaError::LoadFailed(format!("unrecognized schema filename: {file_name}"))
            })?;

            loaded_schema_count = loaded_schema_count.saturating_add(1);
            if loaded_schema_count > registry.config.max_schemas_from_directory {
                return Err(SchemaError::LoadFailed(format!(
                    "schema count exceeds configured max ({}): {}",
                    registry.config.max_schemas_from_directory, loaded_schema_count
                )));
            }

            let file = std::fs::File::open(&entry_path).map_err(|err| {
                SchemaError::LoadFailed(format!(
                    "failed opening schema {}: {err}",
                    entry_path.display()
                ))
            })?;
            let opened = file
                .metadata()
                .map_err(|err| SchemaError::LoadFailed(err.to_string()))?;

            #[cfg(unix)]
            {
                if !same_file_identity(&metadata, &opened) {
                    return Err(SchemaError::LoadFailed(format!(
                        "schema file changed during load: {file_name}"
                    )));
                }
            }

            if opened.len() > registry.config.max_schema_file_size as u64 {
                return Err(SchemaError::LoadFailed(format!(
                    "schema file too large ({} bytes): {file_name}",
                    opened.len()
                )));
            }
            let max_bytes = registry.config.max_schema_file_size;
            let read_limit = u64::try_from(max_bytes.saturating_add(1)).unwrap_or(u64::MAX);
            let mut content = String::new();
            file.take(read_limit)
                .read_to_string(&mut content)
                .map_err(|err| {
                    SchemaError::LoadFailed(format!(
                        "failed reading schema {}: {err}",
                        entry_path.display()
                    ))
                })?;
            if content.len() > max_bytes {
                return Err(SchemaError::LoadFailed(format!(
                    "schema file too large while reading: {file_name}"
                )));
            }

            registry.register(operation, &content)?;
        }

        Ok(registry)
    }

    /// Load from embedded `(operation, schema)` strings.
    pub fn from_embedded(schemas: &[(&str, &str)]) -> Result<Self> {
        let mut registry = Self::new();
        for (operation, schema) in schemas {
            registry.register(operation, schema)?;
        }
        Ok(registry)
    }

    /// Check a parsed document against the operation's schema.
    pub fn validate(&self, operation: &str, document: &Value) -> Result<()> {
        match self.entries.get(operation) {
            Some(entry) => check_document(operation, document, &entry.validator),
            None if self.config.fail_on_missing_schema => {
                Err(SchemaError::NoSchema(operation.to_string()))
            }
            None => Ok(()),
        }
    }

    /// Boolean verdict for the operation's schema.
    ///
    /// An operation without a schema is accepted unless
    /// `fail_on_missing_schema` is set.
    pub fn is_valid(&self, operation: &str, document: &Value) -> bool {
        match self.entries.get(operation) {
            Some(entry) => entry.validator.is_valid(document),
            None => !self.config.fail_on_missing_schema,
        }
    }

    /// The first constraint `document` violates, checked against the
    /// compiled (strict-mode rewritten) schema.
    pub fn first_violation(&self, operation: &str, document: &Value) -> Option<String> {
        let entry = self.entries.get(operation)?;
        entry
            .validator
            .iter_errors(document)
            .next()
            .map(|err| err.to_string())
    }

    /// The schema document as registered (before strict-mode rewriting).
    pub fn schema(&self, operation: &str) -> Option<&Value> {
        self.entries.get(operation).map(|entry| &entry.schema)
    }

    /// Check if an operation has a registered schema.
    pub fn has_schema(&self, operation: &str) -> bool {
        self.entries.contains_key(operation)
    }

    /// Operations that have registered schemas, sorted.
    pub fn operations(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Get registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("operations", &self.operations())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(unix)]
fn same_file_identity(inspected: &std::fs::Metadata, opened: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    inspected.dev() == opened.dev() && inspected.ino() == opened.ino()
}

fn operation_from_stem(stem: &str) -> Option<&str> {
    let valid = !stem.is_empty()
        && stem
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    valid.then_some(stem)
}

fn apply_strict_mode(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if is_object_schema(map) && !map.contains_key("additionalProperties") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
            }

            for key in ["properties", "patternProperties", "$defs", "definitions"] {
                if let Some(Value::Object(children)) = map.get_mut(key) {
                    children.values_mut().for_each(apply_strict_mode);
                }
            }
            for key in ["items", "additionalProperties", "not", "if", "then", "else"] {
                if let Some(child) = map.get_mut(key) {
                    apply_strict_mode(child);
                }
            }
            for key in ["prefixItems", "allOf", "anyOf", "oneOf"] {
                if let Some(Value::Array(children)) = map.get_mut(key) {
                    children.iter_mut().for_each(apply_strict_mode);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(apply_strict_mode),
        _ => {}
    }
}

fn is_object_schema(map: &Map<String, Value>) -> bool {
    match map.get("type") {
        Some(Value::String(kind)) => kind == "object",
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| matches!(item, Value::String(kind) if kind == "object")),
        _ => map.contains_key("properties") || map.contains_key("required"),
    }
}
