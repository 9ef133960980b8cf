/// Shared types, traits, and errors for the Palisade MCP gateway.
///
/// This crate is the foundation the other Palisade crates depend on:
/// - **Config types** (`config`) and the file loader/validator (`loader`)
/// - **Error type** (`errors`) for unified error handling
/// - **Scan result types** (`scan`) and the `Scanner` contract (`traits`)
pub mod config;
pub mod errors;
pub mod loader;
pub mod scan;
pub mod traits;

// Re-export commonly used types at the crate root for convenience.
pub use config::{
    DownstreamConfig, GatewayConfig, HttpConfig, SanitizeConfig, Transport, UpstreamConfig,
};
pub use errors::GatewayError;
pub use scan::{PipelineResult, ScanResult, Verdict};
pub use traits::Scanner;
