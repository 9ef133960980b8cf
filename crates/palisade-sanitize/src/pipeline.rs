//! Ordered composition of scanners with short-circuit semantics.

use tokio_util::sync::CancellationToken;

use palisade_types::errors::GatewayError;
use palisade_types::scan::{PipelineResult, Verdict};
use palisade_types::traits::Scanner;
use palisade_types::SanitizeConfig;

use crate::boundary::BoundaryScanner;
use crate::injection::InjectionScanner;
use crate::length::LengthScanner;
use crate::override_scan::OverrideScanner;
use crate::unicode::UnicodeScanner;
use crate::url::UrlScanner;

/// Executes an ordered sequence of scanners against content.
///
/// On block it short-circuits; on modify it threads the rewritten content
/// into subsequent scanners. Scanners hold only immutable compiled state,
/// so a pipeline built once at registration is safe to invoke concurrently
/// from many in-flight proxy calls.
pub struct Pipeline {
    scanners: Vec<Box<dyn Scanner>>,
}

impl Pipeline {
    /// Create a pipeline from the given scanners. Execution order matches
    /// the slice order.
    pub fn new(scanners: Vec<Box<dyn Scanner>>) -> Self {
        Self { scanners }
    }

    /// Build a pipeline from a merged sanitization config.
    ///
    /// Stage order is fixed: unicode, length, injection, override, url,
    /// boundary. Normalization runs first so later scanners see canonical
    /// text, truncation early to bound regex cost, and the boundary wrap
    /// last so its delimiters are the outermost envelope. `source` labels
    /// the boundary envelope, normally the downstream server name.
    pub fn from_config(cfg: &SanitizeConfig, source: &str) -> Result<Self, GatewayError> {
        let mut scanners: Vec<Box<dyn Scanner>> = Vec::new();

        if cfg.enable_invisible_text_removal.unwrap_or(false) {
            scanners.push(Box::new(UnicodeScanner));
        }

        if let Some(max) = cfg.max_response_chars {
            if max > 0 {
                scanners.push(Box::new(LengthScanner::new(max as usize)));
            }
        }

        if cfg.enable_prompt_injection_detection.unwrap_or(false) {
            scanners.push(Box::new(InjectionScanner::new(
                cfg.disable_built_in_patterns.unwrap_or(false),
                &cfg.custom_injection_patterns,
            )?));
        }

        if cfg.enable_system_override_detection.unwrap_or(false) {
            scanners.push(Box::new(OverrideScanner));
        }

        if cfg.enable_url_validation.unwrap_or(false) {
            scanners.push(Box::new(UrlScanner));
        }

        if cfg.enable_boundary_injection.unwrap_or(false) {
            scanners.push(Box::new(BoundaryScanner::new(source)));
        }

        Ok(Self::new(scanners))
    }

    /// Number of configured stages.
    pub fn len(&self) -> usize {
        self.scanners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scanners.is_empty()
    }

    /// Run all scanners in order and return an aggregated result.
    ///
    /// An empty pipeline passes content through unchanged. Scanner errors
    /// propagate unwrapped; cancellation fails fast before the next stage.
    pub fn process(
        &self,
        content: &str,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult, GatewayError> {
        let mut current = content.to_string();
        let mut result = PipelineResult {
            final_verdict: Verdict::Pass,
            final_content: String::new(),
            all_threats: Vec::new(),
            stage_results: Vec::with_capacity(self.scanners.len()),
        };

        for scanner in &self.scanners {
            if cancel.is_cancelled() {
                return Err(GatewayError::Cancelled);
            }

            let sr = scanner.scan(&current, cancel)?;
            result.all_threats.extend(sr.threats.iter().cloned());

            match sr.verdict {
                Verdict::Block => {
                    result.final_verdict = Verdict::Block;
                    result.final_content = sr.content.clone();
                    result.stage_results.push(sr);
                    return Ok(result);
                }
                Verdict::Modify => {
                    result.final_verdict = Verdict::Modify;
                    current = sr.content.clone();
                    result.stage_results.push(sr);
                }
                Verdict::Pass => {
                    result.stage_results.push(sr);
                }
            }
        }

        result.final_content = current;
        Ok(result)
    }
}
