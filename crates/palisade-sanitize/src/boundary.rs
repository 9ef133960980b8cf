//! Source-boundary tagging of external tool output.

use tokio_util::sync::CancellationToken;

use palisade_types::errors::GatewayError;
use palisade_types::scan::ScanResult;
use palisade_types::traits::Scanner;

const NAME: &str = "boundary";

/// Wraps content in XML-style delimiters so the LLM can distinguish
/// external tool output from its own instructions. Intended as the last
/// pipeline stage, making the delimiters the outermost envelope.
pub struct BoundaryScanner {
    source: String,
}

impl BoundaryScanner {
    /// `source` labels the envelope, normally the downstream server name.
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
        }
    }
}

impl Scanner for BoundaryScanner {
    fn name(&self) -> &str {
        NAME
    }

    fn scan(&self, content: &str, _cancel: &CancellationToken) -> Result<ScanResult, GatewayError> {
        let escaped = self.source.replace('\\', "\\\\").replace('"', "\\\"");
        let wrapped = format!(
            "<external_tool_response source=\"{escaped}\">\n{content}\n</external_tool_response>"
        );

        Ok(ScanResult::modify(NAME, wrapped, Vec::new()))
    }
}
