use std::path::PathBuf;
use std::time::Duration;

use serde_json::{json, Value};

use crate::error::ConfigError;

/// Default wait between launching the server and the first request (2 seconds).
pub const DEFAULT_STARTUP_GRACE_MS: u64 = 2_000;

/// Default bound on a single response read (10 seconds).
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 10_000;

/// Default wait for the server to exit after SIGTERM before killing it (5 seconds).
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 5_000;

pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";
pub const DEFAULT_RESOURCE_URI: &str = "calendar://events";
pub const DEFAULT_TOOL_NAME: &str = "create_event";
pub const DEFAULT_CLIENT_NAME: &str = "mcp-conformance";

/// How to launch the server under test.
#[derive(Debug, Clone)]
pub struct ServerCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl ServerCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Command line as a single string, for logs and reports.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Inputs of the standard conformance sequence.
#[derive(Debug, Clone)]
pub struct SequenceConfig {
    pub protocol_version: String,
    pub client_name: String,
    pub client_version: String,
    pub resource_uri: String,
    pub tool_name: String,
    pub tool_arguments: Value,
    /// Method of the notification sent after a successful `initialize`, if any.
    pub initialized_notification: Option<String>,
    /// Check result shapes against JSON Schemas instead of only "no error".
    pub strict: bool,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            protocol_version: DEFAULT_PROTOCOL_VERSION.into(),
            client_name: DEFAULT_CLIENT_NAME.into(),
            client_version: env!("CARGO_PKG_VERSION").into(),
            resource_uri: DEFAULT_RESOURCE_URI.into(),
            tool_name: DEFAULT_TOOL_NAME.into(),
            tool_arguments: default_tool_arguments(),
            initialized_notification: None,
            strict: false,
        }
    }
}

/// A representative `create_event` argument set.
pub fn default_tool_arguments() -> Value {
    json!({
        "title": "MCP Test Meeting",
        "description": "A test meeting created via MCP",
        "start": "2024-06-25T14:00:00Z",
        "end": "2024-06-25T15:00:00Z",
        "organizerId": "00000000-0000-0000-0000-000000000001"
    })
}

/// Parse tool arguments given on the command line. Must be a JSON object.
pub fn parse_tool_arguments(raw: &str) -> Result<Value, ConfigError> {
    let value: Value = serde_json::from_str(raw)?;
    if !value.is_object() {
        return Err(ConfigError::ToolArgumentsNotObject);
    }
    Ok(value)
}

/// Complete configuration of one conformance run.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub server: ServerCommand,
    pub startup_grace: Duration,
    pub read_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub sequence: SequenceConfig,
}

impl HarnessConfig {
    pub fn new(server: ServerCommand) -> Self {
        Self {
            server,
            startup_grace: Duration::from_millis(DEFAULT_STARTUP_GRACE_MS),
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            shutdown_timeout: Duration::from_millis(DEFAULT_SHUTDOWN_TIMEOUT_MS),
            sequence: SequenceConfig::default(),
        }
    }

    /// Reject configurations that could never produce a meaningful run.
    ///
    /// A zero startup grace is allowed; zero read or shutdown timeouts are not.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.program.trim().is_empty() {
            return Err(ConfigError::EmptyCommand);
        }
        if self.read_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("read timeout"));
        }
        if self.shutdown_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("shutdown timeout"));
        }
        if !self.sequence.tool_arguments.is_object() {
            return Err(ConfigError::ToolArgumentsNotObject);
        }
        Ok(())
    }
}
