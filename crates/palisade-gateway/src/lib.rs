/// Palisade: an MCP gateway with response sanitization.
///
/// One upstream MCP endpoint aggregates the tool surfaces of many
/// downstream MCP servers. Every tool response is driven through a
/// per-downstream sanitization pipeline before it reaches the model:
/// - `downstream` keeps persistent client sessions with health checks
///   and automatic reconnection
/// - `registry` discovers downstream tools, namespaces them, and proxies
///   calls through the pipeline
/// - `upstream` binds the gateway to stdio or streamable HTTP
/// - `gateway` sequences bring-up and signal-aware shutdown
pub mod downstream;
pub mod gateway;
pub mod registry;
pub mod upstream;

#[cfg(test)]
pub(crate) mod testutil;

pub use downstream::{Connector, DefaultConnector, DownstreamManager};
pub use gateway::Gateway;
pub use registry::{GatewayRouter, Registry};
pub use upstream::Upstream;
