//! Invisible and malicious Unicode removal.

use tokio_util::sync::CancellationToken;
use unicode_general_category::{get_general_category, GeneralCategory};
use unicode_normalization::UnicodeNormalization;

use palisade_types::errors::GatewayError;
use palisade_types::scan::ScanResult;
use palisade_types::traits::Scanner;

/// Normalizes text to NFKC form and strips invisible or potentially
/// malicious characters: Unicode categories Cf (format), Co (private use),
/// and Cc (control), keeping common whitespace.
pub struct UnicodeScanner;

const NAME: &str = "unicode";

/// Characters to strip after normalization. Space, tab, carriage return,
/// and line feed stay even though they are in Cc.
fn should_strip(c: char) -> bool {
    if matches!(c, '\n' | '\t' | '\r' | ' ') {
        return false;
    }
    matches!(
        get_general_category(c),
        GeneralCategory::Format | GeneralCategory::PrivateUse | GeneralCategory::Control
    )
}

impl Scanner for UnicodeScanner {
    fn name(&self) -> &str {
        NAME
    }

    fn scan(&self, content: &str, _cancel: &CancellationToken) -> Result<ScanResult, GatewayError> {
        let normalized: String = content.nfkc().collect();

        let mut cleaned = String::with_capacity(normalized.len());
        let mut removed = 0usize;
        for c in normalized.chars() {
            if should_strip(c) {
                removed += 1;
                continue;
            }
            cleaned.push(c);
        }

        if removed == 0 && cleaned == content {
            return Ok(ScanResult::pass(NAME, content));
        }

        let threats = if removed > 0 {
            vec!["invisible/control characters removed".to_string()]
        } else {
            Vec::new()
        };

        Ok(ScanResult::modify(NAME, cleaned, threats))
    }
}
