//! Config file loading and validation.
//!
//! Reads a JSON config file, applies defaults, and validates the result.
//! Any problem here is fatal at startup: the gateway refuses to run with a
//! config it cannot fully honor.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::{apply_defaults, GatewayConfig, SanitizeConfig, Transport};
use crate::errors::GatewayError;

/// Valid downstream names: alphanumeric start, then alphanumerics, hyphens,
/// and underscores. `__` is additionally rejected as the reserved separator.
static VALID_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("valid name pattern"));

/// Read and parse a JSON config file, apply defaults, and validate.
pub fn load(path: &Path) -> Result<GatewayConfig, GatewayError> {
    let data = std::fs::read_to_string(path).map_err(|e| {
        GatewayError::Config(format!("failed to read {}: {e}", path.display()))
    })?;

    let mut cfg: GatewayConfig = serde_json::from_str(&data).map_err(|e| {
        GatewayError::Config(format!("failed to parse {}: {e}", path.display()))
    })?;

    apply_defaults(&mut cfg);
    validate(&cfg)?;

    Ok(cfg)
}

/// Validate a fully-defaulted config for internal consistency.
pub fn validate(cfg: &GatewayConfig) -> Result<(), GatewayError> {
    if !cfg.upstream.http.path.starts_with('/') {
        return Err(GatewayError::Config(format!(
            "upstream http path {:?} must start with '/'",
            cfg.upstream.http.path
        )));
    }

    if cfg.downstream.is_empty() {
        return Err(GatewayError::Config(
            "at least one downstream server is required".to_string(),
        ));
    }

    let mut names = std::collections::HashSet::new();
    for (i, ds) in cfg.downstream.iter().enumerate() {
        if ds.name.is_empty() {
            return Err(GatewayError::Config(format!(
                "downstream[{i}]: name is required"
            )));
        }
        if !VALID_NAME.is_match(&ds.name) {
            return Err(GatewayError::Config(format!(
                "downstream[{i}]: name {:?} must match {}",
                ds.name,
                VALID_NAME.as_str()
            )));
        }
        if ds.name.contains("__") {
            return Err(GatewayError::Config(format!(
                "downstream[{i}]: name {:?} must not contain \"__\" (reserved separator)",
                ds.name
            )));
        }
        if !names.insert(ds.name.as_str()) {
            return Err(GatewayError::Config(format!(
                "downstream[{i}]: duplicate name {:?}",
                ds.name
            )));
        }

        match ds.transport {
            Transport::Stdio if ds.command.is_empty() => {
                return Err(GatewayError::Config(format!(
                    "downstream[{i}] ({}): command is required for stdio transport",
                    ds.name
                )));
            }
            Transport::Http if ds.url.is_empty() => {
                return Err(GatewayError::Config(format!(
                    "downstream[{i}] ({}): url is required for http transport",
                    ds.name
                )));
            }
            _ => {}
        }
    }

    validate_patterns(&cfg.sanitization, "sanitization")?;
    for (i, ds) in cfg.downstream.iter().enumerate() {
        if let Some(s) = &ds.sanitization {
            validate_patterns(s, &format!("downstream[{i}] ({}) sanitization", ds.name))?;
        }
    }

    Ok(())
}

/// Check every custom injection pattern compiles.
fn validate_patterns(cfg: &SanitizeConfig, context: &str) -> Result<(), GatewayError> {
    for (i, pattern) in cfg.custom_injection_patterns.iter().enumerate() {
        Regex::new(pattern).map_err(|e| {
            GatewayError::Config(format!(
                "{context}.customInjectionPatterns[{i}]: invalid regex {pattern:?}: {e}"
            ))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn load_valid_config() {
        let (_dir, path) = write_temp(
            r#"{
                "upstream": {"transport": "stdio"},
                "downstream": [
                    {"name": "fs", "transport": "stdio", "command": ["echo", "hello"]}
                ]
            }"#,
        );

        let cfg = load(&path).unwrap();
        assert_eq!(cfg.upstream.transport, Transport::Stdio);
        assert_eq!(cfg.downstream.len(), 1);
        assert_eq!(cfg.downstream[0].name, "fs");
    }

    #[test]
    fn load_applies_defaults() {
        let (_dir, path) = write_temp(
            r#"{"downstream": [{"name": "a", "transport": "stdio", "command": ["x"]}]}"#,
        );

        let cfg = load(&path).unwrap();
        assert_eq!(cfg.upstream.transport, Transport::Stdio);
        assert_eq!(cfg.upstream.http.addr, crate::config::DEFAULT_HTTP_ADDR);
        assert_eq!(cfg.upstream.http.path, crate::config::DEFAULT_HTTP_PATH);

        let s = &cfg.sanitization;
        assert_eq!(
            s.max_response_chars,
            Some(crate::config::DEFAULT_MAX_RESPONSE_CHARS)
        );
        assert_eq!(s.enable_prompt_injection_detection, Some(true));
        assert_eq!(s.enable_invisible_text_removal, Some(true));
        assert_eq!(s.enable_url_validation, Some(true));
        assert_eq!(s.enable_boundary_injection, Some(true));
        assert_eq!(s.enable_system_override_detection, Some(true));
        assert_eq!(s.disable_built_in_patterns, Some(false));
    }

    #[test]
    fn load_http_upstream() {
        let (_dir, path) = write_temp(
            r#"{
                "upstream": {"transport": "http", "http": {"addr": ":9090", "path": "/api"}},
                "downstream": [
                    {"name": "a", "transport": "http", "url": "https://example.com/mcp"}
                ]
            }"#,
        );

        let cfg = load(&path).unwrap();
        assert_eq!(cfg.upstream.transport, Transport::Http);
        assert_eq!(cfg.upstream.http.addr, ":9090");
        assert_eq!(cfg.upstream.http.path, "/api");
    }

    #[test]
    fn load_rejects_empty_downstream() {
        let (_dir, path) = write_temp(r#"{"downstream": []}"#);
        assert!(load(&path).is_err());
    }

    #[test]
    fn load_rejects_duplicate_names() {
        let (_dir, path) = write_temp(
            r#"{"downstream": [
                {"name": "a", "transport": "stdio", "command": ["x"]},
                {"name": "a", "transport": "stdio", "command": ["y"]}
            ]}"#,
        );
        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("duplicate name"));
    }

    #[test]
    fn load_rejects_stdio_without_command() {
        let (_dir, path) =
            write_temp(r#"{"downstream": [{"name": "a", "transport": "stdio"}]}"#);
        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("command is required"));
    }

    #[test]
    fn load_rejects_http_without_url() {
        let (_dir, path) = write_temp(r#"{"downstream": [{"name": "a", "transport": "http"}]}"#);
        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("url is required"));
    }

    #[test]
    fn load_rejects_unknown_transport() {
        let (_dir, path) = write_temp(
            r#"{
                "upstream": {"transport": "grpc"},
                "downstream": [{"name": "a", "transport": "stdio", "command": ["x"]}]
            }"#,
        );
        let err = load(&path).unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }

    #[test]
    fn load_rejects_invalid_custom_regex() {
        let (_dir, path) = write_temp(
            r#"{
                "downstream": [{"name": "a", "transport": "stdio", "command": ["x"]}],
                "sanitization": {"customInjectionPatterns": ["[invalid"]}
            }"#,
        );
        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("invalid regex"));
    }

    #[test]
    fn load_rejects_invalid_per_downstream_regex() {
        let (_dir, path) = write_temp(
            r#"{
                "downstream": [{
                    "name": "a", "transport": "stdio", "command": ["x"],
                    "sanitization": {"customInjectionPatterns": ["(unclosed"]}
                }]
            }"#,
        );
        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("invalid regex"));
    }

    #[test]
    fn load_missing_file() {
        let err = load(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn load_invalid_json() {
        let (_dir, path) = write_temp("{not json}");
        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn load_rejects_name_with_reserved_separator() {
        let (_dir, path) = write_temp(
            r#"{"downstream": [{"name": "a__b", "transport": "stdio", "command": ["x"]}]}"#,
        );
        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("reserved separator"));
    }

    #[test]
    fn load_rejects_name_with_invalid_chars() {
        let (_dir, path) = write_temp(
            r#"{"downstream": [{"name": "has spaces", "transport": "stdio", "command": ["x"]}]}"#,
        );
        assert!(load(&path).is_err());
    }

    #[test]
    fn load_accepts_hyphens_and_underscores_in_name() {
        let (_dir, path) = write_temp(
            r#"{"downstream": [{"name": "my-server_1", "transport": "stdio", "command": ["x"]}]}"#,
        );
        assert!(load(&path).is_ok());
    }

    #[test]
    fn load_rejects_path_without_leading_slash() {
        let (_dir, path) = write_temp(
            r#"{
                "upstream": {"transport": "http", "http": {"path": "mcp"}},
                "downstream": [{"name": "a", "transport": "stdio", "command": ["x"]}]
            }"#,
        );
        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("must start with '/'"));
    }
}
