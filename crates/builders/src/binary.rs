//! `binary` builder: build another target, then keep its output running.
//!
//! Each successful build event from the build target restarts the program.
//! The running program is torn down when the run is cancelled, before every
//! restart, and when the build target fails hard.

use crate::command::workspace_root;
use crate::options::parse_options;
use crate::process::{DEFAULT_GRACE_PERIOD, ManagedProcess, ProcessSpec};
use async_trait::async_trait;
use devkit_architect::host;
use devkit_architect::{
    BuildEvent, Builder, BuilderContext, CancellationToken, Error, EventSink, JsonObject,
    PartialBuilderContext, ResolvedTarget, Result, TargetSpecifier,
};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use tracing::{debug, info};

/// Builder id.
pub const BUILDER: &str = "@devkit/builders:binary";

/// Options accepted by the `binary` builder.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryOptions {
    /// Target producing the program, `project:target[:configuration]`.
    pub build_target: String,
    /// Program to run, relative to the workspace root.
    #[serde(default)]
    pub program: Option<String>,
    /// Arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment variables.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Passed on to the build target.
    #[serde(default)]
    pub verbose: bool,
}

/// Runs the output of another target as a long-lived child process.
#[derive(Debug)]
pub struct BinaryBuilder {
    context: BuilderContext,
}

impl BinaryBuilder {
    /// Create a builder bound to `context`.
    #[must_use]
    pub fn new(context: BuilderContext) -> Self {
        Self { context }
    }

    fn build_target(&self, options: &BinaryOptions) -> Result<ResolvedTarget> {
        let architect = self
            .context
            .architect()
            .ok_or_else(|| Error::builder(BUILDER, "the architect is no longer available"))?;

        let mut overrides = JsonObject::new();
        overrides.insert("verbose".to_string(), Value::Bool(options.verbose));
        let specifier = TargetSpecifier::parse(&options.build_target)
            .map_err(|err| Error::builder(BUILDER, err))?
            .with_overrides(overrides);

        architect.get_target(&specifier)
    }
}

async fn wait_for(process: Option<&mut ManagedProcess>) -> io::Result<ExitStatus> {
    match process {
        Some(process) => process.wait().await,
        None => std::future::pending().await,
    }
}

#[async_trait]
impl Builder for BinaryBuilder {
    async fn run(
        &self,
        target: ResolvedTarget,
        sink: EventSink,
        cancel: CancellationToken,
    ) -> Result<()> {
        let options: BinaryOptions = parse_options(BUILDER, &target)?;
        let logger = self.context.logger.child("binary");

        let build_target = self.build_target(&options)?;
        let root = workspace_root(&self.context, &target);
        let program = match options.program.as_deref() {
            Some(program) => host::resolve(&root, Path::new(program)),
            None => default_program(&root, &build_target).ok_or_else(|| {
                Error::builder(
                    BUILDER,
                    format!(
                        "no program to run: set `program`, or an `output` option on '{}'",
                        options.build_target
                    ),
                )
            })?,
        };
        let program_name = program.display().to_string();

        let architect = self
            .context
            .architect()
            .ok_or_else(|| Error::builder(BUILDER, "the architect is no longer available"))?;
        let mut build = architect
            .run(
                build_target,
                PartialBuilderContext::new().with_logger(logger.child("build")),
            )
            .await?;
        drop(architect);

        let mut process: Option<ManagedProcess> = None;
        let mut build_done = false;
        let mut result = Ok(());

        loop {
            if build_done && process.is_none() {
                break;
            }

            tokio::select! {
                () = cancel.cancelled() => {
                    debug!(program = %program_name, "Binary run cancelled");
                    break;
                }
                item = build.next(), if !build_done => match item {
                    Some(Ok(event)) if event.success => {
                        if let Some(running) = process.as_mut() {
                            running.teardown(DEFAULT_GRACE_PERIOD).await;
                        }
                        let spec = ProcessSpec {
                            program: &program_name,
                            args: &options.args,
                            cwd: Some(target.root.as_path()),
                            env: Some(&options.env),
                        };
                        match ManagedProcess::spawn(&spec, &logger) {
                            Ok(started) => {
                                info!(program = %program_name, pid = started.id(), "Started program");
                                let mut event = BuildEvent::success();
                                if let Some(pid) = started.id() {
                                    event = event.with("pid", pid);
                                }
                                process = Some(started);
                                sink.emit(event);
                            }
                            Err(err) => {
                                logger.error(&format!("failed to start {program_name}: {err}"));
                                process = None;
                                sink.emit(BuildEvent::failure().with("error", err.to_string()));
                            }
                        }
                    }
                    Some(Ok(event)) => {
                        sink.emit(event);
                    }
                    Some(Err(err)) => {
                        result = Err(err);
                        break;
                    }
                    None => build_done = true,
                },
                status = wait_for(process.as_mut()), if process.is_some() => {
                    process = None;
                    let event = match status {
                        Ok(status) => {
                            let event = if status.success() {
                                BuildEvent::success()
                            } else {
                                BuildEvent::failure()
                            };
                            match status.code() {
                                Some(code) => event.with("exitCode", code),
                                None => event,
                            }
                        }
                        Err(err) => BuildEvent::failure().with("error", err.to_string()),
                    };
                    sink.emit(event);
                }
            }
        }

        if let Some(mut running) = process.take() {
            running.teardown(DEFAULT_GRACE_PERIOD).await;
        }
        drop(build);
        result
    }
}

/// Program path taken from the build target's `output` option.
fn default_program(root: &Path, build_target: &ResolvedTarget) -> Option<PathBuf> {
    build_target
        .options
        .get("output")
        .and_then(Value::as_str)
        .map(|output| host::resolve(root, Path::new(output)))
}
