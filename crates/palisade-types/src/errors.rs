/// Unified error type for the Palisade gateway.
///
/// All crates use this error type for propagation across crate boundaries.
/// Internal module errors are converted into the appropriate variant.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Error from configuration loading or validation.
    #[error("config error: {0}")]
    Config(String),

    /// Failure to establish a session to a downstream MCP server.
    #[error("connect error: {0}")]
    Connect(String),

    /// Tool discovery or registration failure during bring-up.
    #[error("discovery error: {0}")]
    Discovery(String),

    /// A downstream RPC failed at runtime (tool call, listing, probe).
    #[error("downstream error: {0}")]
    Downstream(String),

    /// Upstream transport failure (bind, serve, stream I/O).
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Internal failure inside a sanitization scanner.
    #[error("scan error: {0}")]
    Scan(String),

    /// The operation was cancelled by the caller or during shutdown.
    #[error("operation cancelled")]
    Cancelled,

    /// Unexpected runtime failure outside the other categories.
    #[error("internal error: {0}")]
    Internal(String),
}
