// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

//! devkit-architect - target resolution and build orchestration
//!
//! A workspace document lists projects, each with named targets. A target
//! binds a builder id (`package:builderName`) to layered options. The
//! [`Architect`] turns a [`TargetSpecifier`] into a [`ResolvedTarget`],
//! finds the builder's description through its package, validates the
//! options against the builder's schema and runs the builder, streaming
//! [`BuildEvent`]s back.
//!
//! # Example
//!
//! ```ignore
//! use devkit_architect::{Architect, BuilderRegistry, LocalHost, PartialBuilderContext, TargetSpecifier};
//! use futures::StreamExt;
//! use std::sync::Arc;
//!
//! let architect = Architect::new("/repo", Arc::new(LocalHost::new()), BuilderRegistry::new());
//! architect.load_workspace_from_host("angular.json".as_ref()).await?;
//!
//! let spec = TargetSpecifier::parse("app:build:production")?;
//! let mut events = architect.run_specifier(&spec, PartialBuilderContext::new()).await?;
//! while let Some(event) = events.next().await {
//!     println!("{:?}", event?);
//! }
//! ```

pub mod architect;
pub mod builder;
pub mod description;
pub mod error;
pub mod events;
pub mod host;
pub mod json;
pub mod registry;
pub mod resolve;
pub mod schema;
pub mod target;
pub mod workspace;

pub use architect::{Architect, ArchitectBuilder};
pub use builder::{
    BUILDER_LOG_TARGET, BuildEvent, Builder, BuilderContext, BuilderDescription, BuilderFactory,
    Logger, PartialBuilderContext,
};
pub use description::split_builder_id;
pub use error::{Error, Result};
pub use events::{BuildEventStream, EventSink};
pub use host::{Host, LocalHost, MemoryHost};
pub use json::{JsonObject, shallow_merge};
pub use registry::BuilderRegistry;
pub use resolve::{NodeModulesResolver, PackageResolver};
pub use schema::{CompiledSchema, SchemaRegistry};
pub use target::{ResolvedTarget, TargetSpecifier};
pub use workspace::{
    Project, ProjectType, TargetDefinition, WORKSPACE_FILE_NAMES, Workspace, find_workspace_file,
};

/// Cancellation token handed to every builder.
pub use tokio_util::sync::CancellationToken;
