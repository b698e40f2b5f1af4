//! JSON schema compilation and validation.
//!
//! Validation never mutates its input. [`CompiledSchema::validate`] returns a
//! new, normalized value in which every missing property that declares a
//! `default` in the schema has been filled in, then checks that value.

use crate::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// A schema document compiled into a validator.
pub struct CompiledSchema {
    schema: Value,
    validator: jsonschema::Validator,
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl CompiledSchema {
    /// Compile `schema`. `origin` names the schema in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaCompile`] when the document is not a valid schema.
    pub fn compile(origin: &Path, schema: &Value) -> Result<Self> {
        let validator = jsonschema::validator_for(schema).map_err(|err| Error::SchemaCompile {
            path: origin.to_path_buf(),
            message: err.to_string(),
        })?;
        Ok(Self {
            schema: schema.clone(),
            validator,
        })
    }

    /// The source schema document.
    #[must_use]
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Fill defaults into a copy of `value` and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaValidation`] carrying every validation error.
    pub fn validate(&self, value: &Value) -> Result<Value> {
        let normalized = apply_defaults(&self.schema, &self.schema, value);

        let errors: Vec<String> = self
            .validator
            .iter_errors(&normalized)
            .map(|err| err.to_string())
            .collect();

        if errors.is_empty() {
            Ok(normalized)
        } else {
            Err(Error::SchemaValidation { errors })
        }
    }
}

/// Compiles schemas and keeps the last validator compiled for each origin.
///
/// A cached validator is reused only while the schema document it was
/// compiled from is unchanged; any other document for the same origin is
/// recompiled and replaces it. Each architect owns its own registry, so
/// cached validators never leak between engines.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    cache: Mutex<HashMap<PathBuf, Arc<CompiledSchema>>>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `schema`, reusing the validator cached for `origin` when it
    /// was compiled from the same document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaCompile`] when compilation fails.
    pub fn compile(&self, origin: &Path, schema: &Value) -> Result<Arc<CompiledSchema>> {
        let cached = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(origin)
            .filter(|compiled| compiled.schema() == schema)
            .cloned();
        if let Some(compiled) = cached {
            return Ok(compiled);
        }

        debug!(schema = %origin.display(), "Compiling JSON schema");
        let compiled = Arc::new(CompiledSchema::compile(origin, schema)?);
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(origin.to_path_buf(), Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Number of cached schemas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached schema.
    pub fn clear(&self) {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

/// Return a copy of `value` with schema defaults filled in.
///
/// Follows `properties`, `additionalProperties`, `items` and local `$ref`s
/// (`#/definitions/...`, `#/$defs/...`). Existing values are never replaced.
#[must_use]
pub fn apply_defaults(root: &Value, schema: &Value, value: &Value) -> Value {
    let schema = follow_ref(root, schema);

    match value {
        Value::Object(map) => {
            let mut out = map.clone();
            let properties = schema.get("properties").and_then(Value::as_object);

            if let Some(properties) = properties {
                for (key, subschema) in properties {
                    let subschema = follow_ref(root, subschema);
                    match out.get(key) {
                        Some(existing) => {
                            let filled = apply_defaults(root, subschema, existing);
                            out.insert(key.clone(), filled);
                        }
                        None => {
                            if let Some(default) = subschema.get("default") {
                                let filled = apply_defaults(root, subschema, default);
                                out.insert(key.clone(), filled);
                            }
                        }
                    }
                }
            }

            if let Some(additional) = schema.get("additionalProperties").filter(|s| s.is_object()) {
                for (key, existing) in map {
                    let declared = properties.is_some_and(|p| p.contains_key(key));
                    if !declared {
                        let filled = apply_defaults(root, additional, existing);
                        out.insert(key.clone(), filled);
                    }
                }
            }

            Value::Object(out)
        }
        Value::Array(items) => match schema.get("items").filter(|s| s.is_object()) {
            Some(item_schema) => Value::Array(
                items
                    .iter()
                    .map(|item| apply_defaults(root, item_schema, item))
                    .collect(),
            ),
            None => value.clone(),
        },
        _ => value.clone(),
    }
}

fn follow_ref<'a>(root: &'a Value, schema: &'a Value) -> &'a Value {
    let mut current = schema;
    // Bounded to guard against reference cycles.
    for _ in 0..32 {
        let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
            return current;
        };
        let Some(pointer) = reference.strip_prefix('#') else {
            return current;
        };
        match root.pointer(pointer) {
            Some(target) => current = target,
            None => return current,
        }
    }
    current
}
