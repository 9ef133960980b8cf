/// Content sanitization pipeline for the Palisade MCP gateway.
///
/// Detects and mitigates prompt injection, role-override phrasing,
/// malicious URLs, and invisible-character smuggling in MCP tool responses
/// before they reach the LLM:
/// - Unicode normalization and invisible/control character removal
/// - Response length enforcement
/// - Injection and system-override pattern detection (10+ patterns)
/// - Dangerous-scheme and exfiltration URL detection
/// - Source-boundary tagging of external tool output
pub mod boundary;
pub mod injection;
pub mod length;
pub mod override_scan;
pub mod pipeline;
pub mod unicode;
pub mod url;

pub use boundary::BoundaryScanner;
pub use injection::InjectionScanner;
pub use length::LengthScanner;
pub use override_scan::OverrideScanner;
pub use pipeline::Pipeline;
pub use unicode::UnicodeScanner;
pub use url::UrlScanner;
