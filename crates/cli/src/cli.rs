use crate::tracing::LogLevel;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "architect")]
#[command(about = "Resolve and run workspace targets")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short = 'l',
        long,
        global = true,
        default_value = "warn",
        value_enum,
        help = "Set logging level"
    )]
    pub level: LogLevel,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json: bool,

    #[arg(
        long,
        global = true,
        env = "ARCHITECT_ROOT",
        default_value = ".",
        help = "Workspace root directory"
    )]
    pub root: PathBuf,

    #[arg(
        short = 'w',
        long,
        global = true,
        help = "Workspace file, relative to the root (searched for when omitted)"
    )]
    pub workspace: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(about = "Run a target and print its build events")]
    Run {
        #[arg(help = "Target to run, project:target[:configuration]")]
        spec: String,

        #[arg(
            short = 'o',
            long = "option",
            value_name = "KEY=VALUE",
            value_parser = parse_option,
            help = "Override a builder option (value is parsed as JSON when possible)"
        )]
        options: Vec<(String, Value)>,
    },
    #[command(about = "Print the resolved target as JSON")]
    Target {
        #[arg(help = "Target to resolve, project:target[:configuration]")]
        spec: String,

        #[arg(
            short = 'o',
            long = "option",
            value_name = "KEY=VALUE",
            value_parser = parse_option,
            help = "Override a builder option (value is parsed as JSON when possible)"
        )]
        options: Vec<(String, Value)>,
    },
    #[command(about = "Print the builder description of a target as JSON")]
    Describe {
        #[arg(help = "Target to describe, project:target[:configuration]")]
        spec: String,
    },
    #[command(about = "Validate the workspace file and list its targets")]
    Validate,
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Run { .. } => "run",
            Self::Target { .. } => "target",
            Self::Describe { .. } => "describe",
            Self::Validate => "validate",
        }
    }
}

/// Parse `key=value`. The value is read as JSON, falling back to a plain string.
pub fn parse_option(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("option name is empty in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_run_with_options() {
        let cli = Cli::try_parse_from([
            "architect",
            "run",
            "app:build:production",
            "--option",
            "optimize=false",
            "-o",
            "outputPath=dist/app",
            "-o",
            "assets=[\"a\",\"b\"]",
        ])
        .unwrap();

        match cli.command {
            Commands::Run { spec, options } => {
                assert_eq!(spec, "app:build:production");
                assert_eq!(
                    options,
                    vec![
                        ("optimize".to_string(), json!(false)),
                        ("outputPath".to_string(), json!("dist/app")),
                        ("assets".to_string(), json!(["a", "b"])),
                    ]
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.level, LogLevel::Warn);
        assert!(!cli.json);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "architect",
            "validate",
            "--root",
            "/repo",
            "--workspace",
            "workspace.json",
            "--level",
            "debug",
            "--json",
        ])
        .unwrap();

        assert!(matches!(cli.command, Commands::Validate));
        assert_eq!(cli.root, PathBuf::from("/repo"));
        assert_eq!(cli.workspace, Some(PathBuf::from("workspace.json")));
        assert_eq!(cli.level, LogLevel::Debug);
        assert!(cli.json);
    }

    #[test]
    fn test_option_without_equals_is_rejected() {
        let result = Cli::try_parse_from(["architect", "run", "app:build", "-o", "optimize"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_option_values() {
        assert_eq!(parse_option("port=4200").unwrap(), ("port".to_string(), json!(4200)));
        assert_eq!(
            parse_option("host=localhost").unwrap(),
            ("host".to_string(), json!("localhost"))
        );
        assert_eq!(
            parse_option("define={\"a\":1}").unwrap(),
            ("define".to_string(), json!({"a": 1}))
        );
        assert_eq!(parse_option("empty=").unwrap(), ("empty".to_string(), json!("")));
        assert_eq!(
            parse_option("expr=a=b").unwrap(),
            ("expr".to_string(), json!("a=b"))
        );
        assert!(parse_option("=value").is_err());
    }

    #[test]
    fn test_spec_is_required() {
        assert!(Cli::try_parse_from(["architect", "describe"]).is_err());
    }
}
