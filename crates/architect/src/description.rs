//! Builder description resolution.
//!
//! `package:name` is turned into a [`BuilderDescription`] in four hops:
//! package manifest, builder map, builder entry, then absolute schema and
//! implementation paths.

use crate::builder::BuilderDescription;
use crate::host::{self, Host};
use crate::json::{parse_loose, parse_strict};
use crate::resolve::PackageResolver;
use crate::schema::SchemaRegistry;
use crate::workspace::builders_schema;
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, instrument};

/// Origin under which the builder-map schema is cached.
pub(crate) const BUILDERS_SCHEMA_ORIGIN: &str = "builtin:builders-schema.json";

#[derive(Debug, Deserialize)]
struct BuilderMap {
    builders: BTreeMap<String, BuilderEntry>,
}

#[derive(Debug, Deserialize)]
struct BuilderEntry {
    schema: String,
    class: String,
    #[serde(default)]
    description: Option<String>,
}

/// Split a builder id at its first `:` into package and builder name.
///
/// # Errors
///
/// Returns [`Error::BuilderCannotBeResolved`] when either half is missing.
pub fn split_builder_id(builder: &str) -> Result<(&str, &str)> {
    match builder.split_once(':') {
        Some((package, name)) if !package.is_empty() && !name.is_empty() => Ok((package, name)),
        _ => Err(Error::builder_cannot_be_resolved(
            builder,
            "builder ids have the form `package:builderName`",
        )),
    }
}

/// Resolve the description of `builder`, looking packages up from `workspace_root`.
#[instrument(skip(host, resolver, schemas, workspace_root))]
pub(crate) async fn describe_builder(
    host: &dyn Host,
    resolver: &dyn PackageResolver,
    schemas: &SchemaRegistry,
    workspace_root: &Path,
    builder: &str,
) -> Result<BuilderDescription> {
    let (package, name) = split_builder_id(builder)?;

    let manifest_path = resolver
        .resolve_manifest(host, package, workspace_root)
        .await
        .map_err(|reason| Error::builder_cannot_be_resolved(builder, reason))?;
    debug!(manifest = %manifest_path.display(), "Resolved builder package");

    let manifest_bytes = host
        .read(&manifest_path)
        .await
        .map_err(|err| Error::io(&manifest_path, err))?;
    let manifest = parse_loose(&manifest_path, &manifest_bytes)?;

    let Some(builders_field) = manifest.get("builders").and_then(Value::as_str) else {
        return Err(Error::builder_cannot_be_resolved(
            builder,
            format!("{} has no `builders` field", manifest_path.display()),
        ));
    };

    let map_path = host::resolve(&host::dirname(&manifest_path), Path::new(builders_field));
    let map_bytes = host
        .read(&map_path)
        .await
        .map_err(|err| Error::io(&map_path, err))?;
    let map_document = parse_strict(&map_path, &map_bytes)?;

    let schema = schemas.compile(Path::new(BUILDERS_SCHEMA_ORIGIN), builders_schema()?)?;
    let map_document = schema.validate(&map_document)?;
    let map: BuilderMap =
        serde_json::from_value(map_document).map_err(|err| Error::json(&map_path, err.to_string()))?;

    let Some(entry) = map.builders.get(name) else {
        return Err(Error::builder_cannot_be_resolved(
            builder,
            format!("'{name}' is not listed in {}", map_path.display()),
        ));
    };

    let map_dir = host::dirname(&map_path);
    Ok(BuilderDescription {
        name: name.to_string(),
        builder: builder.to_string(),
        schema: host::resolve(&map_dir, Path::new(&entry.schema)),
        class: host::resolve(&map_dir, Path::new(&entry.class)),
        description: entry.description.clone(),
    })
}
