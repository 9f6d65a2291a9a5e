//! CLI command definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Idempotent provisioning of the ExploreSpeak AWS backend.
#[derive(Debug, Parser)]
#[command(name = "explorespeak")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: Global,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Silence the command output
    #[arg(long, global = true)]
    pub silent: bool,

    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Output format.
    #[arg(long, global = true, default_value = "pretty")]
    pub format: OutputFormat,

    /// AWS region.
    #[arg(long, global = true, env = "AWS_REGION", default_value = "us-east-1")]
    pub region: String,

    /// Custom endpoint URL (for local emulators).
    #[arg(long, global = true, env = "AWS_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,

    /// JSON manifest to provision instead of the built-in one.
    #[arg(long, global = true, value_name = "PATH")]
    pub manifest: Option<PathBuf>,

    /// Skip confirmation prompts.
    #[arg(long, global = true)]
    pub force: bool,
}

impl Global {
    pub fn is_silent(&self) -> bool {
        self.silent
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Raw JSON output.
    Json,
    /// Human-readable output with colors.
    #[default]
    Pretty,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show planned changes without applying them
    Plan {
        /// Existing REST API id to inspect.
        #[arg(long)]
        api_id: Option<String>,
    },

    /// Create missing DynamoDB tables and indexes
    Tables,

    /// Package and deploy the Lambda functions
    Functions(FunctionsArgs),

    /// Configure API Gateway resources, methods and the stage deployment
    Gateway(GatewayArgs),

    /// Verify that every declared resource exists
    Smoke(SmokeArgs),

    /// Run tables, functions, gateway and smoke tests in order
    #[command(long_about = "Run the full provisioning pipeline.

Tables are created first, then functions are packaged and deployed, then the
REST API is configured and deployed to its stage. Smoke tests run last.
A missing execution role or REST API stops the pipeline.

Environment variables:
  AWS_ENDPOINT_URL    - Use a local emulator (e.g., http://localhost:4566)
  AWS_REGION          - AWS region (defaults to us-east-1)
  AWS_PROFILE         - AWS profile to use for credentials")]
    Deploy(DeployArgs),
}

#[derive(Debug, Clone, Default, clap::Args)]
pub struct FunctionsArgs {
    /// Execution role shared by every function.
    #[arg(long)]
    pub role_name: Option<String>,

    /// Directory that function source paths are resolved against.
    #[arg(long, value_name = "DIR")]
    pub source_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, clap::Args)]
pub struct GatewayArgs {
    /// Existing REST API id. Looked up by name, or created, when omitted.
    #[arg(long)]
    pub api_id: Option<String>,

    /// REST API name.
    #[arg(long)]
    pub api_name: Option<String>,

    /// Deployment stage.
    #[arg(long)]
    pub stage: Option<String>,
}

#[derive(Debug, Clone, Default, clap::Args)]
pub struct SmokeArgs {
    /// Existing REST API id.
    #[arg(long)]
    pub api_id: Option<String>,

    /// Invoke every function with an empty JSON payload.
    #[arg(long)]
    pub invoke: bool,
}

#[derive(Debug, Clone, Default, clap::Args)]
pub struct DeployArgs {
    #[command(flatten)]
    pub functions: FunctionsArgs,

    #[command(flatten)]
    pub gateway: GatewayArgs,

    /// Skip the smoke tests.
    #[arg(long)]
    pub skip_smoke: bool,

    /// Invoke every function during smoke tests.
    #[arg(long)]
    pub invoke: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_deploy_flags() {
        let cli = Cli::try_parse_from([
            "explorespeak",
            "deploy",
            "--role-name",
            "custom-role",
            "--stage",
            "dev",
            "--skip-smoke",
            "--force",
        ])
        .unwrap();

        assert!(cli.global.force);
        let Commands::Deploy(args) = cli.command else {
            panic!("expected deploy");
        };
        assert_eq!(args.functions.role_name.as_deref(), Some("custom-role"));
        assert_eq!(args.gateway.stage.as_deref(), Some("dev"));
        assert!(args.skip_smoke);
        assert!(!args.invoke);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "explorespeak",
            "smoke",
            "--api-id",
            "abc123",
            "--format",
            "json",
            "--silent",
        ])
        .unwrap();

        assert_eq!(cli.global.format, OutputFormat::Json);
        assert!(cli.global.is_silent());
        assert!(matches!(
            cli.command,
            Commands::Smoke(SmokeArgs { api_id: Some(ref id), invoke: false }) if id == "abc123"
        ));
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let result = Cli::try_parse_from(["explorespeak", "plan", "--format", "yaml"]);
        assert!(result.is_err());
    }
}
