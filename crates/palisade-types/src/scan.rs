//! Outcome types for content scanners and the sanitization pipeline.

/// Outcome of a single scan or of a whole pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Content is clean; use it unchanged.
    Pass,
    /// Content was rewritten; use the returned content in place of the input.
    Modify,
    /// Content is malicious and must be rejected.
    Block,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Pass => write!(f, "pass"),
            Verdict::Modify => write!(f, "modify"),
            Verdict::Block => write!(f, "block"),
        }
    }
}

/// Result of one scanner stage.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub verdict: Verdict,
    /// Original content on pass/block, rewritten content on modify.
    pub content: String,
    /// Human-readable threat descriptions.
    pub threats: Vec<String>,
    /// Name of the scanner that produced this result.
    pub scanner: String,
}

impl ScanResult {
    pub fn pass(scanner: &str, content: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Pass,
            content: content.into(),
            threats: Vec::new(),
            scanner: scanner.to_string(),
        }
    }

    pub fn modify(scanner: &str, content: impl Into<String>, threats: Vec<String>) -> Self {
        Self {
            verdict: Verdict::Modify,
            content: content.into(),
            threats,
            scanner: scanner.to_string(),
        }
    }

    pub fn block(scanner: &str, content: impl Into<String>, threats: Vec<String>) -> Self {
        Self {
            verdict: Verdict::Block,
            content: content.into(),
            threats,
            scanner: scanner.to_string(),
        }
    }
}

/// Aggregated result of running content through a pipeline.
///
/// On block, `final_content` is the content as the blocking stage saw it;
/// callers must substitute an error payload rather than forward it.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub final_verdict: Verdict,
    pub final_content: String,
    /// Per-stage threats concatenated in stage order.
    pub all_threats: Vec<String>,
    /// One entry per executed stage; ends at the blocking stage on block.
    pub stage_results: Vec<ScanResult>,
}
