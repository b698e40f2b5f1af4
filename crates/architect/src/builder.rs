//! The builder contract.
//!
//! A builder is the unit of work behind a target. The architect finds a
//! [`BuilderFactory`] for the target's builder id, asks it for a [`Builder`]
//! bound to a [`BuilderContext`], and runs it with the resolved target.

use crate::events::EventSink;
use crate::host::Host;
use crate::json::JsonObject;
use crate::target::ResolvedTarget;
use crate::{Architect, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use tokio_util::sync::CancellationToken;

/// `tracing` target used by builder loggers.
pub const BUILDER_LOG_TARGET: &str = "devkit::builder";

/// An event emitted by a running builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildEvent {
    /// Whether the build (or this step of it) succeeded.
    pub success: bool,
    /// Builder-specific payload, passed through untouched.
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl BuildEvent {
    /// A successful event with no payload.
    #[must_use]
    pub fn success() -> Self {
        Self {
            success: true,
            extra: JsonObject::new(),
        }
    }

    /// A failed event with no payload.
    #[must_use]
    pub fn failure() -> Self {
        Self {
            success: false,
            extra: JsonObject::new(),
        }
    }

    /// Attach a payload field.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Full description of a builder, read from its package's builder map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderDescription {
    /// Builder name within its package.
    pub name: String,
    /// Builder id, `package:name`.
    pub builder: String,
    /// Absolute path of the options schema.
    pub schema: PathBuf,
    /// Absolute path of the implementation entry.
    pub class: PathBuf,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Named logger handed to builders.
///
/// Messages are forwarded to `tracing` under [`BUILDER_LOG_TARGET`]. The null
/// logger drops everything.
#[derive(Debug, Clone, Default)]
pub struct Logger {
    name: Option<Arc<str>>,
}

impl Logger {
    /// A logger that discards every message.
    #[must_use]
    pub fn null() -> Self {
        Self { name: None }
    }

    /// A logger forwarding to `tracing`, tagged with `name`.
    #[must_use]
    pub fn named(name: impl AsRef<str>) -> Self {
        Self {
            name: Some(Arc::from(name.as_ref())),
        }
    }

    /// A logger whose name is nested under this one. Children of the null
    /// logger are null too.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        match &self.name {
            Some(parent) => Self::named(format!("{parent}.{name}")),
            None => Self::null(),
        }
    }

    /// Logger name, `None` for the null logger.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Whether this is the null logger.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.name.is_none()
    }

    /// Log at debug level.
    pub fn debug(&self, message: &str) {
        if let Some(name) = &self.name {
            tracing::debug!(target: BUILDER_LOG_TARGET, logger = %name, "{message}");
        }
    }

    /// Log at info level.
    pub fn info(&self, message: &str) {
        if let Some(name) = &self.name {
            tracing::info!(target: BUILDER_LOG_TARGET, logger = %name, "{message}");
        }
    }

    /// Log at warn level.
    pub fn warn(&self, message: &str) {
        if let Some(name) = &self.name {
            tracing::warn!(target: BUILDER_LOG_TARGET, logger = %name, "{message}");
        }
    }

    /// Log at error level.
    pub fn error(&self, message: &str) {
        if let Some(name) = &self.name {
            tracing::error!(target: BUILDER_LOG_TARGET, logger = %name, "{message}");
        }
    }
}

/// Everything a builder instance may use.
#[derive(Clone)]
pub struct BuilderContext {
    /// Logger for builder output.
    pub logger: Logger,
    /// The engine that created the builder. Weak, so a builder never keeps
    /// the engine alive.
    pub architect: Weak<Architect>,
    /// Host used for file access.
    pub host: Arc<dyn Host>,
}

impl BuilderContext {
    /// Upgrade the engine reference, if the engine is still alive.
    #[must_use]
    pub fn architect(&self) -> Option<Arc<Architect>> {
        self.architect.upgrade()
    }
}

impl std::fmt::Debug for BuilderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuilderContext")
            .field("logger", &self.logger)
            .field("architect_alive", &(self.architect.strong_count() > 0))
            .finish_non_exhaustive()
    }
}

/// Caller-supplied overrides for the default [`BuilderContext`].
#[derive(Clone, Default)]
pub struct PartialBuilderContext {
    /// Replaces the null logger.
    pub logger: Option<Logger>,
    /// Replaces the engine reference.
    pub architect: Option<Weak<Architect>>,
    /// Replaces the engine's host.
    pub host: Option<Arc<dyn Host>>,
}

impl PartialBuilderContext {
    /// No overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the logger.
    #[must_use]
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Override the host.
    #[must_use]
    pub fn with_host(mut self, host: Arc<dyn Host>) -> Self {
        self.host = Some(host);
        self
    }

    /// Override the engine reference.
    #[must_use]
    pub fn with_architect(mut self, architect: Weak<Architect>) -> Self {
        self.architect = Some(architect);
        self
    }

    /// Fill every unset field from `defaults`.
    #[must_use]
    pub fn complete(self, defaults: BuilderContext) -> BuilderContext {
        BuilderContext {
            logger: self.logger.unwrap_or(defaults.logger),
            architect: self.architect.unwrap_or(defaults.architect),
            host: self.host.unwrap_or(defaults.host),
        }
    }
}

impl std::fmt::Debug for PartialBuilderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartialBuilderContext")
            .field("logger", &self.logger)
            .field("architect", &self.architect.is_some())
            .field("host", &self.host.is_some())
            .finish()
    }
}

/// A runnable builder instance.
#[async_trait]
pub trait Builder: Send + Sync {
    /// Run the target, reporting progress through `sink`.
    ///
    /// Implementations should return promptly once `cancel` fires, after
    /// releasing anything they started. An `Err` is delivered to the caller
    /// as the final stream item.
    async fn run(
        &self,
        target: ResolvedTarget,
        sink: EventSink,
        cancel: CancellationToken,
    ) -> Result<()>;
}

/// Creates builder instances bound to a context.
pub trait BuilderFactory: Send + Sync {
    /// Instantiate a builder.
    fn create(&self, context: BuilderContext) -> Box<dyn Builder>;
}

impl<F> BuilderFactory for F
where
    F: Fn(BuilderContext) -> Box<dyn Builder> + Send + Sync,
{
    fn create(&self, context: BuilderContext) -> Box<dyn Builder> {
        self(context)
    }
}
