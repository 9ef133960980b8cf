//! Prompt injection pattern detection.

use regex::Regex;
use tokio_util::sync::CancellationToken;

use palisade_types::errors::GatewayError;
use palisade_types::scan::ScanResult;
use palisade_types::traits::Scanner;

const NAME: &str = "injection";

/// Regex sources matching common jailbreak phrasing. All are compiled with
/// the case-insensitive flag.
const BUILT_IN_PATTERNS: &[&str] = &[
    r"ignore\s+(all\s+)?(previous|prior|above)\s+(instructions?|prompts?|context)",
    r"disregard\s+(all\s+)?(previous|prior|above)",
    r"forget\s+(everything|all|your)\s+(instructions?|rules|guidelines|training)",
    r"forget\s+everything",
    r"you\s+are\s+now\s+(a|an|the)\s+",
    r"new\s+instructions?\s*:",
    r"from\s+now\s+on,?\s+you\s+(are|will|must|should)",
    r"<\|?im_start\|?>",
    r"<\|?system\|?>",
    r"###\s*(System|Instructions?|Rules)\s*\n",
    r"\[INST\]",
    r"\[/INST\]",
    r"<<SYS>>",
    r"<</SYS>>",
    r"IMPORTANT:\s*ignore",
    r"CRITICAL:\s*override",
];

/// Detects prompt injection phrases via a compiled regex set.
///
/// Any match blocks the response outright; there is no rewriting for this
/// class of content.
pub struct InjectionScanner {
    patterns: Vec<Regex>,
}

impl InjectionScanner {
    /// Build a scanner from configuration. Built-in patterns are included
    /// unless `disable_built_in` is set; custom patterns are always
    /// appended. An invalid custom pattern is a construction-time error.
    pub fn new(disable_built_in: bool, custom_patterns: &[String]) -> Result<Self, GatewayError> {
        let mut sources: Vec<String> = Vec::new();

        if !disable_built_in {
            sources.extend(BUILT_IN_PATTERNS.iter().map(|p| p.to_string()));
        }
        sources.extend(custom_patterns.iter().cloned());

        let mut patterns = Vec::with_capacity(sources.len());
        for p in sources {
            // Force case-insensitivity unless the pattern already carries
            // its own flags.
            let p = if p.starts_with("(?i)") { p } else { format!("(?i){p}") };
            let re = Regex::new(&p).map_err(|e| {
                GatewayError::Scan(format!("compiling injection pattern {p:?}: {e}"))
            })?;
            patterns.push(re);
        }

        Ok(Self { patterns })
    }
}

impl Scanner for InjectionScanner {
    fn name(&self) -> &str {
        NAME
    }

    fn scan(&self, content: &str, cancel: &CancellationToken) -> Result<ScanResult, GatewayError> {
        for re in &self.patterns {
            if cancel.is_cancelled() {
                return Err(GatewayError::Cancelled);
            }
            if re.is_match(content) {
                return Ok(ScanResult::block(
                    NAME,
                    content,
                    vec![format!(
                        "prompt injection detected: matched pattern {:?}",
                        re.as_str()
                    )],
                ));
            }
        }

        Ok(ScanResult::pass(NAME, content))
    }
}
