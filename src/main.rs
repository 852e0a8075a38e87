use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use mcp_conformance::config::{
    parse_tool_arguments, HarnessConfig, ServerCommand, DEFAULT_PROTOCOL_VERSION,
    DEFAULT_READ_TIMEOUT_MS, DEFAULT_RESOURCE_URI, DEFAULT_SHUTDOWN_TIMEOUT_MS,
    DEFAULT_STARTUP_GRACE_MS, DEFAULT_TOOL_NAME,
};
use mcp_conformance::error::ConfigError;
use mcp_conformance::{harness, report};

/// Exit status when a step failed or the run was interrupted.
const EXIT_FAILED: i32 = 1;
/// Exit status for configuration and launch errors.
const EXIT_ERROR: i32 = 2;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "mcp-conformance")]
#[command(about = "Run the MCP conformance sequence against a stdio server", long_about = None)]
#[command(version)]
struct Cli {
    /// Working directory for the server process
    #[arg(long, env = "MCP_CONFORMANCE_CWD")]
    cwd: Option<PathBuf>,

    /// Wait after launch before the first request, in milliseconds
    #[arg(long, env = "MCP_CONFORMANCE_STARTUP_GRACE_MS", default_value_t = DEFAULT_STARTUP_GRACE_MS)]
    startup_grace_ms: u64,

    /// Maximum wait for each response, in milliseconds
    #[arg(long, env = "MCP_CONFORMANCE_READ_TIMEOUT_MS", default_value_t = DEFAULT_READ_TIMEOUT_MS)]
    read_timeout_ms: u64,

    /// Wait for the server to exit after SIGTERM before killing it, in milliseconds
    #[arg(long, env = "MCP_CONFORMANCE_SHUTDOWN_TIMEOUT_MS", default_value_t = DEFAULT_SHUTDOWN_TIMEOUT_MS)]
    shutdown_timeout_ms: u64,

    /// Protocol version sent in `initialize`
    #[arg(long, env = "MCP_CONFORMANCE_PROTOCOL_VERSION", default_value = DEFAULT_PROTOCOL_VERSION)]
    protocol_version: String,

    /// Resource URI read in the `resources/read` step
    #[arg(long, env = "MCP_CONFORMANCE_RESOURCE_URI", default_value = DEFAULT_RESOURCE_URI)]
    resource_uri: String,

    /// Tool invoked in the `tools/call` step
    #[arg(long, env = "MCP_CONFORMANCE_TOOL_NAME", default_value = DEFAULT_TOOL_NAME)]
    tool_name: String,

    /// Tool arguments as a JSON object
    #[arg(long, env = "MCP_CONFORMANCE_TOOL_ARGUMENTS")]
    tool_arguments: Option<String>,

    /// Notification method to send after a successful `initialize`
    #[arg(long, env = "MCP_CONFORMANCE_NOTIFY_INITIALIZED", value_name = "METHOD")]
    notify_initialized: Option<String>,

    /// Check result shapes against JSON Schemas, not only the absence of errors
    #[arg(long, env = "MCP_CONFORMANCE_STRICT")]
    strict: bool,

    /// Report format
    #[arg(long, env = "MCP_CONFORMANCE_FORMAT", value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Server command followed by its arguments
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    server: Vec<String>,
}

impl Cli {
    fn into_config(self) -> Result<(HarnessConfig, Format), ConfigError> {
        let mut parts = self.server.into_iter();
        let program = parts.next().ok_or(ConfigError::EmptyCommand)?;

        let mut server = ServerCommand::new(program);
        server.args = parts.collect();
        server.working_dir = self.cwd;

        let mut config = HarnessConfig::new(server);
        config.startup_grace = Duration::from_millis(self.startup_grace_ms);
        config.read_timeout = Duration::from_millis(self.read_timeout_ms);
        config.shutdown_timeout = Duration::from_millis(self.shutdown_timeout_ms);
        config.sequence.protocol_version = self.protocol_version;
        config.sequence.resource_uri = self.resource_uri;
        config.sequence.tool_name = self.tool_name;
        config.sequence.initialized_notification = self.notify_initialized;
        config.sequence.strict = self.strict;
        if let Some(raw) = self.tool_arguments {
            config.sequence.tool_arguments = parse_tool_arguments(&raw)?;
        }

        config.validate()?;
        Ok((config, self.format))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (config, format) = match Cli::parse().into_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("mcp-conformance: configuration error: {e}");
            std::process::exit(EXIT_ERROR);
        }
    };

    let result = match harness::execute(&config).await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("mcp-conformance: {e}");
            std::process::exit(EXIT_ERROR);
        }
    };

    match format {
        Format::Text => print!("{}", report::render_text(&result)),
        Format::Json => match report::render_json(&result) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("mcp-conformance: failed to render report: {e}");
                std::process::exit(EXIT_ERROR);
            }
        },
    }

    if !result.all_passed() {
        if let Some(failed) = result.first_failure() {
            tracing::error!(step = %failed.label, method = %failed.method, "conformance run failed");
        }
        std::process::exit(EXIT_FAILED);
    }
}
