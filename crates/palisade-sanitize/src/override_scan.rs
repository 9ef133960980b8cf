//! System prompt override and role-reassignment detection.

use std::sync::LazyLock;

use regex::Regex;
use tokio_util::sync::CancellationToken;

use palisade_types::errors::GatewayError;
use palisade_types::scan::ScanResult;
use palisade_types::traits::Scanner;

const NAME: &str = "override";

/// Phrasings that attempt to reassign the LLM's role or persona.
static OVERRIDE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)you\s+are\s+(now\s+)?acting\s+as",
        r"(?i)(roleplay|role-play|role\s+play)\s+as",
        r"(?i)your\s+(new\s+)?(role|persona|identity)\s+(is|:)",
        r"(?i)pretend\s+(to\s+be|you\s+are)",
        r"(?i)system\s*:\s*you\s+are",
        r"(?i)switch\s+to\s+.*(mode|persona|role)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("override pattern"))
    .collect()
});

/// Detects attempts to override the system prompt or reassign the LLM's
/// identity. Any match blocks the response.
pub struct OverrideScanner;

impl Scanner for OverrideScanner {
    fn name(&self) -> &str {
        NAME
    }

    fn scan(&self, content: &str, _cancel: &CancellationToken) -> Result<ScanResult, GatewayError> {
        for re in OVERRIDE_PATTERNS.iter() {
            if re.is_match(content) {
                return Ok(ScanResult::block(
                    NAME,
                    content,
                    vec![format!(
                        "system prompt override detected: matched {:?}",
                        re.as_str()
                    )],
                ));
            }
        }

        Ok(ScanResult::pass(NAME, content))
    }
}
