//! Trait contracts shared across the Palisade crates.
//!
//! Defined here so every crate can depend on them without circular
//! dependencies.

use tokio_util::sync::CancellationToken;

use crate::errors::GatewayError;
use crate::scan::ScanResult;

/// A single content-inspection stage of the sanitization pipeline.
///
/// Scanners are pure with respect to their input: any transformation is
/// returned in the `ScanResult`, never applied in place. They run on the
/// tool-call hot path and are synchronous; long-running stages should
/// honor `cancel` and fail fast with `GatewayError::Cancelled`.
pub trait Scanner: Send + Sync {
    /// Human-readable identifier for logging.
    fn name(&self) -> &str;

    /// Inspect `content` and return a verdict with optional rewritten content.
    fn scan(&self, content: &str, cancel: &CancellationToken) -> Result<ScanResult, GatewayError>;
}
