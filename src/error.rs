use std::time::Duration;

use crate::protocol::{JsonRpcError, RpcId};

/// The server process could not be started. Fatal: no steps run.
#[derive(Debug, thiserror::Error)]
#[error("failed to launch `{command}`: {source}")]
pub struct LaunchError {
    pub command: String,
    #[source]
    pub source: std::io::Error,
}

/// Failure on the line channel to the server (stdin/stdout of the child).
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server input stream is closed")]
    Closed,
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("message exceeds {max} bytes")]
    MessageTooLarge { max: usize },
    #[error("server wrote a line that is not valid UTF-8")]
    InvalidUtf8,
}

/// A response line that is not a well-formed JSON-RPC 2.0 response.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("response is not a JSON object")]
    NotAnObject,
    #[error("unexpected jsonrpc version: {0}")]
    WrongVersion(String),
    #[error("response id {actual} does not match request id {expected}")]
    IdMismatch { expected: RpcId, actual: String },
    #[error("response carries both `result` and `error`")]
    BothResultAndError,
    #[error("response carries neither `result` nor `error`")]
    NeitherResultNorError,
    #[error("malformed error object: {0}")]
    MalformedError(String),
}

/// A well-formed response that the step nonetheless rejects.
#[derive(Debug, thiserror::Error)]
pub enum StepFailure {
    #[error("server returned error {}: {}", .0.code, .0.message)]
    ServerError(JsonRpcError),
    #[error("result rejected: {0}")]
    PredicateRejected(String),
}

/// Invalid harness configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("server command must not be empty")]
    EmptyCommand,
    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
    #[error("tool arguments are not valid JSON: {0}")]
    ToolArgumentsJson(#[from] serde_json::Error),
    #[error("tool arguments must be a JSON object")]
    ToolArgumentsNotObject,
}
