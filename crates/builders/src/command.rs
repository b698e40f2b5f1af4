//! `command` builder: run a program once and report how it exited.

use crate::options::parse_options;
use crate::process::{DEFAULT_GRACE_PERIOD, ManagedProcess, ProcessSpec};
use async_trait::async_trait;
use devkit_architect::host;
use devkit_architect::{
    BuildEvent, Builder, BuilderContext, CancellationToken, Error, EventSink, ResolvedTarget, Result,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Builder id.
pub const BUILDER: &str = "@devkit/builders:command";

/// Options accepted by the `command` builder.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOptions {
    /// Program to run.
    pub command: String,
    /// Arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory relative to the project root.
    #[serde(default)]
    pub cwd: Option<String>,
    /// Extra environment variables.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// File the command produces, relative to the workspace root.
    #[serde(default)]
    pub output: Option<String>,
    /// Log the command line before running it.
    #[serde(default)]
    pub verbose: bool,
}

/// Runs a program in the project root.
#[derive(Debug)]
pub struct CommandBuilder {
    context: BuilderContext,
}

impl CommandBuilder {
    /// Create a builder bound to `context`.
    #[must_use]
    pub fn new(context: BuilderContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl Builder for CommandBuilder {
    async fn run(
        &self,
        target: ResolvedTarget,
        sink: EventSink,
        cancel: CancellationToken,
    ) -> Result<()> {
        let options: CommandOptions = parse_options(BUILDER, &target)?;
        let logger = self.context.logger.child("command");
        let cwd = match &options.cwd {
            Some(cwd) => host::resolve(&target.root, Path::new(cwd)),
            None => target.root.clone(),
        };

        if options.verbose {
            logger.info(&format!(
                "Running {} {} in {}",
                options.command,
                options.args.join(" "),
                cwd.display()
            ));
        }

        let spec = ProcessSpec {
            program: &options.command,
            args: &options.args,
            cwd: Some(&cwd),
            env: Some(&options.env),
        };
        let mut process = ManagedProcess::spawn(&spec, &logger)
            .map_err(|err| Error::builder(BUILDER, format!("failed to start '{}': {err}", options.command)))?;

        let status = tokio::select! {
            status = process.wait() => status,
            () = cancel.cancelled() => {
                process.teardown(DEFAULT_GRACE_PERIOD).await;
                return Err(Error::Cancelled);
            }
        };
        let status = status.map_err(|err| Error::builder(BUILDER, err.to_string()))?;

        let mut event = if status.success() {
            BuildEvent::success()
        } else {
            BuildEvent::failure()
        };
        if let Some(code) = status.code() {
            event = event.with("exitCode", code);
        }
        if let Some(output) = &options.output {
            event = event.with(
                "outputPath",
                host::resolve(&workspace_root(&self.context, &target), Path::new(output))
                    .display()
                    .to_string(),
            );
        }
        sink.emit(event);
        Ok(())
    }
}

/// Workspace root of the engine, falling back to the project root when the
/// engine is gone.
pub(crate) fn workspace_root(context: &BuilderContext, target: &ResolvedTarget) -> std::path::PathBuf {
    context
        .architect()
        .map_or_else(|| target.root.clone(), |architect| architect.root().to_path_buf())
}
