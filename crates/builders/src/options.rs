use devkit_architect::{Error, ResolvedTarget, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Deserialize a target's (already validated) options into `T`.
pub(crate) fn parse_options<T: DeserializeOwned>(builder: &str, target: &ResolvedTarget) -> Result<T> {
    serde_json::from_value(Value::Object(target.options.clone()))
        .map_err(|err| Error::builder(builder, format!("invalid options: {err}")))
}
