//! Gateway configuration types.
//!
//! The top-level [`GatewayConfig`] is loaded from a JSON document (see
//! `loader`). Sanitization settings use explicit optionals so that a
//! per-downstream override can distinguish "set to false" from "absent,
//! inherit the global value".

use serde::{Deserialize, Serialize};

/// Reserved separator joining `<server>__<tool>` in advertised tool names.
pub const NAMESPACE_SEP: &str = "__";

pub const DEFAULT_MAX_RESPONSE_CHARS: i64 = 16_000;
pub const DEFAULT_HTTP_ADDR: &str = ":8080";
pub const DEFAULT_HTTP_PATH: &str = "/mcp";

/// Wire transport for an MCP endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Stdio,
    Http,
}

impl Default for Transport {
    fn default() -> Self {
        Transport::Stdio
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Stdio => write!(f, "stdio"),
            Transport::Http => write!(f, "http"),
        }
    }
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub upstream: UpstreamConfig,
    pub downstream: Vec<DownstreamConfig>,
    pub sanitization: SanitizeConfig,
}

/// How LLM clients connect to the gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub transport: Transport,
    pub http: HttpConfig,
}

/// HTTP listener settings for the upstream endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Listen address, e.g. `":8080"` or `"127.0.0.1:8080"`.
    pub addr: String,
    /// Mount path for the MCP handler, e.g. `"/mcp"`.
    pub path: String,
}

/// A single downstream MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownstreamConfig {
    pub name: String,
    pub transport: Transport,
    /// Command argv for stdio downstreams.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    /// Endpoint URL for http downstreams.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    /// Per-server overrides applied on top of the global sanitization config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sanitization: Option<SanitizeConfig>,
}

/// Sanitization pipeline settings.
///
/// Used at the root level as global defaults and per downstream as an
/// override layer. Absent fields inherit; see [`SanitizeConfig::merge`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SanitizeConfig {
    /// Character limit for the length stage; a value <= 0 disables it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_response_chars: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_prompt_injection_detection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_invisible_text_removal: Option<bool>,
    #[serde(rename = "enableURLValidation", skip_serializing_if = "Option::is_none")]
    pub enable_url_validation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_boundary_injection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_system_override_detection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_built_in_patterns: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_injection_patterns: Vec<String>,
}

impl SanitizeConfig {
    /// Merge per-server overrides on top of global defaults.
    ///
    /// Fields present in `overlay` replace the global value; absent fields
    /// inherit. A non-empty custom pattern list replaces the global list
    /// rather than concatenating with it.
    pub fn merge(global: &SanitizeConfig, overlay: Option<&SanitizeConfig>) -> SanitizeConfig {
        let Some(overlay) = overlay else {
            return global.clone();
        };

        let mut merged = global.clone();

        if overlay.max_response_chars.is_some() {
            merged.max_response_chars = overlay.max_response_chars;
        }
        if overlay.enable_prompt_injection_detection.is_some() {
            merged.enable_prompt_injection_detection = overlay.enable_prompt_injection_detection;
        }
        if overlay.enable_invisible_text_removal.is_some() {
            merged.enable_invisible_text_removal = overlay.enable_invisible_text_removal;
        }
        if overlay.enable_url_validation.is_some() {
            merged.enable_url_validation = overlay.enable_url_validation;
        }
        if overlay.enable_boundary_injection.is_some() {
            merged.enable_boundary_injection = overlay.enable_boundary_injection;
        }
        if overlay.enable_system_override_detection.is_some() {
            merged.enable_system_override_detection = overlay.enable_system_override_detection;
        }
        if overlay.disable_built_in_patterns.is_some() {
            merged.disable_built_in_patterns = overlay.disable_built_in_patterns;
        }
        if !overlay.custom_injection_patterns.is_empty() {
            merged.custom_injection_patterns = overlay.custom_injection_patterns.clone();
        }

        merged
    }
}

/// Fill in defaults for fields the config file left unset.
pub fn apply_defaults(cfg: &mut GatewayConfig) {
    if cfg.upstream.http.addr.is_empty() {
        cfg.upstream.http.addr = DEFAULT_HTTP_ADDR.to_string();
    }
    if cfg.upstream.http.path.is_empty() {
        cfg.upstream.http.path = DEFAULT_HTTP_PATH.to_string();
    }

    let s = &mut cfg.sanitization;
    s.max_response_chars.get_or_insert(DEFAULT_MAX_RESPONSE_CHARS);
    s.enable_prompt_injection_detection.get_or_insert(true);
    s.enable_invisible_text_removal.get_or_insert(true);
    s.enable_url_validation.get_or_insert(true);
    s.enable_boundary_injection.get_or_insert(true);
    s.enable_system_override_detection.get_or_insert(true);
    s.disable_built_in_patterns.get_or_insert(false);
}
