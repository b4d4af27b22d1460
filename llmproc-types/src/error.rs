//! Error types for all llmproc crates.

use std::path::PathBuf;
use std::time::Duration;

/// Errors detected while compiling a program.
///
/// All of these are fatal at compile time and never reach a running process.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required field is missing or empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    /// The provider identifier is not one of the supported providers.
    #[error("unknown provider: {0:?}")]
    UnknownProvider(String),
    /// A file-descriptor tool was enabled without the FD system.
    #[error("tool {0:?} requires the file descriptor system to be enabled")]
    FdToolsDisabled(String),
    /// The linked-program table contains a reference cycle.
    #[error("linked program cycle through {0:?}")]
    LinkedProgramCycle(String),
    /// The thinking budget must leave room for regular output.
    #[error("thinking budget ({budget}) must be less than max_tokens ({max_tokens})")]
    ThinkingBudget {
        /// Declared thinking budget in tokens.
        budget: u64,
        /// Declared max_tokens for the program.
        max_tokens: u64,
    },
    /// A preload path does not exist or cannot be read.
    #[error("preload file {path}: {source}")]
    Preload {
        /// The offending path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// Errors from provider transport and response parsing.
///
/// All provider errors are fatal for the current run; the run terminates
/// with the state left consistent (no dangling tool use).
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Network-level error (connection reset, DNS failure, etc.).
    #[error("network error: {0}")]
    Network(String),
    /// Rate limited by the provider.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimit {
        /// Suggested retry delay, if provided by the API.
        retry_after: Option<Duration>,
    },
    /// Authentication/authorization failure.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// Malformed or invalid request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The provider returned a body the client could not parse.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// Non-success HTTP status not covered by a more specific kind.
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body (possibly truncated).
        body: String,
    },
    /// The operation is not supported by this provider.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl ProviderError {
    /// Whether this error is likely transient and the request can be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimit { .. })
    }
}

/// Errors from tool lookup and execution.
///
/// These are recovered: the registry materializes them into error tool
/// results so the conversation survives tool failures.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The requested tool is not registered.
    #[error("tool not found: {0}")]
    NotFound(String),
    /// The input did not match the tool's parameter types.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Tool execution failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    /// The tool call exceeded its time ceiling.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// Tool execution was cancelled.
    #[error("cancelled")]
    Cancelled,
}

/// Errors from file-descriptor operations.
///
/// Returned to the model as `<fd_error>` tool results; the run continues.
#[derive(Debug, thiserror::Error)]
pub enum FdError {
    /// No descriptor with the given id.
    #[error("file descriptor not found: {0}")]
    NotFound(String),
    /// The requested page/line/char range is outside the content.
    #[error("invalid range: {0}")]
    InvalidRange(String),
    /// Export target exists and overwrite was not allowed.
    #[error("file already exists: {0}")]
    FileExists(PathBuf),
    /// Export target is missing and creation was not allowed.
    #[error("file does not exist: {0}")]
    FileMissing(PathBuf),
    /// I/O failure during export.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl FdError {
    /// Short machine-readable tag used in `<fd_error type="…">` output.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidRange(_) => "invalid_range",
            Self::FileExists(_) => "file_exists",
            Self::FileMissing(_) => "file_missing",
            Self::Io(_) => "io_error",
        }
    }
}

/// Errors from MCP aggregator operations.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// Failed to connect to an MCP server.
    #[error("connection failed: {0}")]
    Connection(String),
    /// MCP tool call failed.
    #[error("tool call failed: {0}")]
    ToolCall(String),
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(String),
    /// The call exceeded the per-call timeout ceiling.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// The prefixed name did not contain a `<server>__<tool>` separator.
    #[error("malformed tool name: {0:?}")]
    MalformedName(String),
}

/// Fatal errors that abort a run.
///
/// Everything else (tool failures, FD errors, fork denial) is materialized
/// into error tool results and the run continues.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The provider call failed.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}
