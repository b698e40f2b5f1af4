//! The architect engine.
//!
//! [`Architect`] ties the pieces together: it owns the loaded workspace, the
//! builder registry and its compiled schema validators, and runs targets through the
//! pipeline description → options validation → instantiate → run.

use crate::builder::{Builder, BuilderContext, BuilderDescription, Logger, PartialBuilderContext};
use crate::description::describe_builder;
use crate::events::BuildEventStream;
use crate::host::{self, Host};
use crate::json::{JsonObject, parse_strict};
use crate::registry::BuilderRegistry;
use crate::resolve::{NodeModulesResolver, PackageResolver};
use crate::schema::{CompiledSchema, SchemaRegistry};
use crate::target::{ResolvedTarget, TargetSpecifier, resolve_target};
use crate::workspace::{Workspace, workspace_schema};
use crate::{Error, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

/// Origin under which the workspace schema is cached.
const WORKSPACE_SCHEMA_ORIGIN: &str = "builtin:workspace-schema.json";

/// Target resolution and build orchestration for one workspace.
///
/// Always handled through an `Arc`: builders receive a weak reference to the
/// engine so they can resolve and run other targets.
pub struct Architect {
    root: PathBuf,
    host: Arc<dyn Host>,
    resolver: Arc<dyn PackageResolver>,
    registry: BuilderRegistry,
    schemas: SchemaRegistry,
    workspace: RwLock<Option<Arc<Workspace>>>,
    this: Weak<Architect>,
}

/// Builder for [`Architect`].
pub struct ArchitectBuilder {
    root: PathBuf,
    host: Arc<dyn Host>,
    resolver: Arc<dyn PackageResolver>,
    registry: BuilderRegistry,
}

impl ArchitectBuilder {
    /// Use `registry` for builder lookup.
    #[must_use]
    pub fn with_registry(mut self, registry: BuilderRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Use a custom package resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn PackageResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Build the engine. A relative root is made absolute against the
    /// current directory.
    #[must_use]
    pub fn build(self) -> Arc<Architect> {
        let root = absolute_root(self.root);
        Arc::new_cyclic(|this| Architect {
            root,
            host: self.host,
            resolver: self.resolver,
            registry: self.registry,
            schemas: SchemaRegistry::new(),
            workspace: RwLock::new(None),
            this: this.clone(),
        })
    }
}

fn normalized_options(builder: &str, normalized: Value) -> Result<JsonObject> {
    match normalized {
        Value::Object(options) => Ok(options),
        other => Err(Error::SchemaValidation {
            errors: vec![format!(
                "Options for '{builder}' normalized to a non-object value: {other}"
            )],
        }),
    }
}

fn absolute_root(root: PathBuf) -> PathBuf {
    match std::path::absolute(&root) {
        Ok(absolute) => host::normalize(&absolute),
        Err(err) => {
            warn!(root = %root.display(), error = %err, "Cannot make workspace root absolute");
            host::normalize(&root)
        }
    }
}

impl Architect {
    /// Start configuring an engine rooted at `root`.
    pub fn builder(root: impl Into<PathBuf>, host: Arc<dyn Host>) -> ArchitectBuilder {
        ArchitectBuilder {
            root: root.into(),
            host,
            resolver: Arc::new(NodeModulesResolver::new()),
            registry: BuilderRegistry::new(),
        }
    }

    /// Create an engine with the default resolver and the given registry.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, host: Arc<dyn Host>, registry: BuilderRegistry) -> Arc<Self> {
        Self::builder(root, host).with_registry(registry).build()
    }

    /// Workspace root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Host used for all reads.
    #[must_use]
    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    /// The engine's builder registry.
    #[must_use]
    pub fn registry(&self) -> &BuilderRegistry {
        &self.registry
    }

    /// Read, parse and load the workspace file at `path` (relative to the root).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`], [`Error::Json`] or [`Error::SchemaValidation`].
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn load_workspace_from_host(&self, path: &Path) -> Result<Arc<Workspace>> {
        let full = host::resolve(&self.root, path);
        let bytes = self
            .host
            .read(&full)
            .await
            .map_err(|err| Error::io(&full, err))?;
        let document = parse_strict(&full, &bytes)?;
        self.load_workspace_from_json(&document)
    }

    /// Validate and load a workspace document, replacing any previous one.
    /// On failure the previously loaded workspace stays in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaValidation`] listing every problem.
    pub fn load_workspace_from_json(&self, document: &Value) -> Result<Arc<Workspace>> {
        let schema = self
            .schemas
            .compile(Path::new(WORKSPACE_SCHEMA_ORIGIN), workspace_schema()?)?;
        let normalized = schema.validate(document)?;
        let workspace = Arc::new(Workspace::from_value(normalized)?);

        info!(projects = workspace.projects.len(), "Workspace loaded");
        *self.workspace.write().unwrap_or_else(PoisonError::into_inner) =
            Some(Arc::clone(&workspace));
        Ok(workspace)
    }

    /// Snapshot of the loaded workspace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkspaceNotYetLoaded`] before a successful load.
    pub fn workspace(&self) -> Result<Arc<Workspace>> {
        self.workspace
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(Error::WorkspaceNotYetLoaded)
    }

    /// Names of every project in the workspace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkspaceNotYetLoaded`] before a successful load.
    pub fn project_names(&self) -> Result<Vec<String>> {
        Ok(self
            .workspace()?
            .project_names()
            .map(str::to_string)
            .collect())
    }

    /// Names of every target of `project` (the default project when `None`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProjectNotFound`] or [`Error::WorkspaceNotYetLoaded`].
    pub fn get_target_names(&self, project: Option<&str>) -> Result<Vec<String>> {
        let workspace = self.workspace()?;
        let name = project.or(workspace.default_project.as_deref());
        let project = name
            .and_then(|name| workspace.project(name))
            .ok_or_else(|| Error::project_not_found(name))?;
        Ok(project.target_names().map(str::to_string).collect())
    }

    /// Resolve a specifier into a target with merged options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkspaceNotYetLoaded`] or a not-found error.
    pub fn get_target(&self, specifier: &TargetSpecifier) -> Result<ResolvedTarget> {
        let workspace = self.workspace()?;
        resolve_target(&workspace, &self.root, specifier)
    }

    /// Resolve the description of the target's builder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BuilderCannotBeResolved`] when any hop fails.
    pub async fn get_builder_description(&self, target: &ResolvedTarget) -> Result<BuilderDescription> {
        describe_builder(
            self.host.as_ref(),
            self.resolver.as_ref(),
            &self.schemas,
            &self.root,
            &target.builder,
        )
        .await
    }

    /// Read and compile the schema at `path`. The document is read on every
    /// call; the compiled validator is reused while the document is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`], [`Error::Json`] or [`Error::SchemaCompile`].
    pub async fn get_schema(&self, path: &Path) -> Result<Arc<CompiledSchema>> {
        let bytes = self
            .host
            .read(path)
            .await
            .map_err(|err| Error::io(path, err))?;
        let document = parse_strict(path, &bytes)?;
        self.schemas.compile(path, &document)
    }

    /// Validate `target`'s options against the builder's schema and return
    /// the normalized options. The target is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaValidation`] listing every problem.
    pub async fn validate_builder_options(
        &self,
        target: &ResolvedTarget,
        description: &BuilderDescription,
    ) -> Result<JsonObject> {
        let schema = self.get_schema(&description.schema).await?;
        let normalized = schema.validate(&Value::Object(target.options.clone()))?;
        normalized_options(&description.builder, normalized)
    }

    /// Validate `value` against an inline schema document and return the
    /// normalized copy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaCompile`] or [`Error::SchemaValidation`].
    pub fn validate_against_schema(&self, value: &Value, schema: &Value) -> Result<Value> {
        CompiledSchema::compile(Path::new("inline-schema"), schema)?.validate(value)
    }

    /// The default context for builders created by this engine.
    #[must_use]
    pub fn default_context(&self) -> BuilderContext {
        BuilderContext {
            logger: Logger::null(),
            architect: self.this.clone(),
            host: Arc::clone(&self.host),
        }
    }

    /// Instantiate the builder described by `description`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BuilderNotRegistered`] when no factory is registered.
    pub fn get_builder(
        &self,
        description: &BuilderDescription,
        context: BuilderContext,
    ) -> Result<Box<dyn Builder>> {
        let factory = self
            .registry
            .get(&description.builder)
            .ok_or_else(|| Error::BuilderNotRegistered {
                builder: description.builder.clone(),
            })?;
        Ok(factory.create(context))
    }

    /// Run `target`.
    ///
    /// Every step before the builder starts is awaited here, so resolution
    /// and validation failures come back as `Err`. Builder failures arrive
    /// as the last stream item. Dropping the stream cancels the builder.
    ///
    /// # Errors
    ///
    /// Returns description, schema, validation or registration errors.
    #[instrument(skip_all, fields(builder = %target.builder, root = %target.root.display()))]
    pub async fn run(
        &self,
        target: ResolvedTarget,
        context: PartialBuilderContext,
    ) -> Result<BuildEventStream> {
        let context = context.complete(self.default_context());

        let description = self.get_builder_description(&target).await?;
        let options = self.validate_builder_options(&target, &description).await?;
        let builder = self.get_builder(&description, context)?;

        debug!(builder = %description.builder, "Starting builder");
        let cancel = CancellationToken::new();
        let (sink, stream) = BuildEventStream::channel(cancel.clone());
        let target = target.with_options(options);
        let span = info_span!("builder", id = %description.builder);

        tokio::spawn(
            async move {
                if let Err(err) = builder.run(target, sink.clone(), cancel).await {
                    debug!(error = %err, "Builder failed");
                    sink.fail(err);
                }
            }
            .instrument(span),
        );

        Ok(stream)
    }

    /// Resolve `specifier` and [`run`](Self::run) it.
    ///
    /// # Errors
    ///
    /// Returns resolution errors as well as everything [`run`](Self::run) returns.
    pub async fn run_specifier(
        &self,
        specifier: &TargetSpecifier,
        context: PartialBuilderContext,
    ) -> Result<BuildEventStream> {
        let target = self.get_target(specifier)?;
        self.run(target, context).await
    }
}

impl std::fmt::Debug for Architect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Architect")
            .field("root", &self.root)
            .field("registry", &self.registry)
            .field("cached_schemas", &self.schemas.len())
            .finish_non_exhaustive()
    }
}
