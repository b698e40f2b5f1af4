//! Built-in builders for the devkit architect.
//!
//! | Builder id | Behaviour |
//! |------------|-----------|
//! | `@devkit/builders:command` | Run a program once in the project root. |
//! | `@devkit/builders:binary` | Run `buildTarget`, then start its output and restart it on every successful rebuild. |
//! | `@devkit/builders:noop` | Succeed immediately. |
//!
//! The package's manifest and schemas are embedded, so a workspace can name
//! these builders without installing anything:
//!
//! ```ignore
//! let architect = devkit_builders::architect("/repo", Arc::new(LocalHost::new()), BuilderRegistry::new());
//! ```

pub mod binary;
pub mod command;
pub mod noop;
mod options;
pub mod package;
pub mod process;

use devkit_architect::{Architect, Builder, BuilderContext, BuilderRegistry, Host};
use std::path::PathBuf;
use std::sync::Arc;

pub use binary::BinaryBuilder;
pub use command::CommandBuilder;
pub use noop::NoopBuilder;
pub use package::{BuiltinHost, BuiltinResolver, PACKAGE};

/// Register every built-in builder.
pub fn register_builtin(registry: &mut BuilderRegistry) {
    registry.register(command::BUILDER, |context: BuilderContext| {
        Box::new(CommandBuilder::new(context)) as Box<dyn Builder>
    });
    registry.register(binary::BUILDER, |context: BuilderContext| {
        Box::new(BinaryBuilder::new(context)) as Box<dyn Builder>
    });
    registry.register(noop::BUILDER, |context: BuilderContext| {
        Box::new(NoopBuilder::new(context)) as Box<dyn Builder>
    });
}

/// A registry holding only the built-in builders.
#[must_use]
pub fn registry() -> BuilderRegistry {
    let mut registry = BuilderRegistry::new();
    register_builtin(&mut registry);
    registry
}

/// An architect that can resolve and run the built-in builders in addition
/// to everything in `registry`.
pub fn architect(
    root: impl Into<PathBuf>,
    host: Arc<dyn Host>,
    mut registry: BuilderRegistry,
) -> Arc<Architect> {
    register_builtin(&mut registry);
    Architect::builder(root, Arc::new(BuiltinHost::new(host)))
        .with_registry(registry)
        .with_resolver(Arc::new(BuiltinResolver::new()))
        .build()
}
