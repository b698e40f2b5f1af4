//! Run a target and stream its build events as JSON lines

use crate::errors::{CliError, Result};
use devkit_architect::{
    Architect, CancellationToken, Logger, PartialBuilderContext, TargetSpecifier,
};
use futures::StreamExt;
use std::io::Write;
use tracing::{info, instrument};

/// Run `specifier`, writing one line per build event to `out`.
///
/// Succeeds only when the last event reports success. Cancelling `shutdown`
/// cancels the build and waits for the builder to wind down.
#[instrument(skip(architect, specifier, shutdown, out))]
pub async fn execute_run(
    architect: &Architect,
    spec: &str,
    specifier: &TargetSpecifier,
    shutdown: CancellationToken,
    out: &mut impl Write,
) -> Result<()> {
    let context = PartialBuilderContext::new().with_logger(Logger::named(spec));
    let mut stream = architect.run_specifier(specifier, context).await?;
    let mut last_success = None;

    loop {
        tokio::select! {
            () = shutdown.cancelled(), if !stream.is_cancelled() => {
                info!(spec, "Cancelling build");
                stream.cancel();
            }
            item = stream.next() => match item {
                Some(Ok(event)) => {
                    writeln!(out, "{}", serde_json::to_string(&event)?)?;
                    out.flush()?;
                    last_success = Some(event.success);
                }
                Some(Err(err)) => return Err(err.into()),
                None => break,
            },
        }
    }

    if last_success == Some(true) {
        Ok(())
    } else {
        Err(CliError::BuildFailed {
            spec: spec.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{fixtures, open_workspace, specifier};
    use serde_json::{Value, json};
    use std::path::Path;

    async fn run(spec: &str, shutdown: CancellationToken) -> (Result<()>, Vec<Value>) {
        let architect = open_workspace(Path::new(fixtures::ROOT), None, fixtures::host())
            .await
            .unwrap();
        let mut out = Vec::new();
        let result = execute_run(
            &architect,
            spec,
            &specifier(spec, Vec::new()).unwrap(),
            shutdown,
            &mut out,
        )
        .await;
        let lines = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        (result, lines)
    }

    #[tokio::test]
    async fn test_run_prints_events() {
        let (result, lines) = run("app:build", CancellationToken::new()).await;
        result.unwrap();
        assert_eq!(lines, vec![json!({"success": true})]);
    }

    #[tokio::test]
    async fn test_run_uses_default_project_and_target() {
        let (result, lines) = run("", CancellationToken::new()).await;
        result.unwrap();
        assert_eq!(lines.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_options_fail_before_running() {
        let (result, lines) = run("app:lint", CancellationToken::new()).await;
        assert!(matches!(
            result,
            Err(CliError::Architect(devkit_architect::Error::SchemaValidation { .. }))
        ));
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_configuration() {
        let (result, _) = run("app:build:prod", CancellationToken::new()).await;
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "Configuration 'prod' could not be found in project.");
    }
}
