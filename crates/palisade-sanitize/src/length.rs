//! Response length enforcement.

use tokio_util::sync::CancellationToken;

use palisade_types::errors::GatewayError;
use palisade_types::scan::ScanResult;
use palisade_types::traits::Scanner;

const NAME: &str = "length";
const TRUNCATION_MARKER: &str = "\n[truncated]";

/// Truncates content exceeding a character (code point) limit.
///
/// A scanner with a non-positive limit must not be added to a pipeline;
/// the pipeline builder skips the stage instead.
pub struct LengthScanner {
    max_chars: usize,
}

impl LengthScanner {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }
}

impl Scanner for LengthScanner {
    fn name(&self) -> &str {
        NAME
    }

    fn scan(&self, content: &str, _cancel: &CancellationToken) -> Result<ScanResult, GatewayError> {
        if content.chars().count() <= self.max_chars {
            return Ok(ScanResult::pass(NAME, content));
        }

        let mut truncated: String = content.chars().take(self.max_chars).collect();
        truncated.push_str(TRUNCATION_MARKER);

        Ok(ScanResult::modify(
            NAME,
            truncated,
            vec!["response exceeded character limit".to_string()],
        ))
    }
}
