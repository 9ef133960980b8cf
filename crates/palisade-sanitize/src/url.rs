//! Malicious URL detection.

use std::sync::LazyLock;

use regex::Regex;
use tokio_util::sync::CancellationToken;

use palisade_types::errors::GatewayError;
use palisade_types::scan::ScanResult;
use palisade_types::traits::Scanner;

const NAME: &str = "url";

/// Extracts http/https URLs from text.
static URL_EXTRACTOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s<>"{}|\\^`\[\]]+"#).expect("url extractor pattern")
});

/// Matches javascript: and data:text/html URIs, whitespace-tolerant.
static DANGEROUS_SCHEMES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(javascript\s*:|data\s*:\s*text/html)").expect("dangerous scheme pattern")
});

/// Query-string keys that look like data exfiltration.
static EXFIL_PARAMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[?&](secret|token|key|password|api_key|credential|auth|session_id|private_key)=")
        .expect("exfil param pattern")
});

/// Detects malicious URLs: dangerous URI schemes anywhere in the content
/// and exfiltration-looking query parameters in extracted http(s) URLs.
pub struct UrlScanner;

impl Scanner for UrlScanner {
    fn name(&self) -> &str {
        NAME
    }

    fn scan(&self, content: &str, _cancel: &CancellationToken) -> Result<ScanResult, GatewayError> {
        let mut threats = Vec::new();

        if let Some(m) = DANGEROUS_SCHEMES.find(content) {
            threats.push(format!(
                "dangerous URI scheme detected: {:?}",
                m.as_str().trim()
            ));
        }

        for url in URL_EXTRACTOR.find_iter(content) {
            if EXFIL_PARAMS.is_match(url.as_str()) {
                threats.push(format!("possible data exfiltration URL: {:?}", url.as_str()));
            }
        }

        if !threats.is_empty() {
            return Ok(ScanResult::block(NAME, content, threats));
        }

        Ok(ScanResult::pass(NAME, content))
    }
}
