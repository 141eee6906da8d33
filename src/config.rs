use std::path::PathBuf;

use crate::errors::AppError;

const DEFAULT_OUTPUT: &str = "grbac_permissions.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source_dir: PathBuf,
    pub output: PathBuf,
    pub default_host: String,
    pub extensions: Vec<String>,
    /// Abort on the first unparsable annotation instead of skipping it
    pub strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            output: PathBuf::from(DEFAULT_OUTPUT),
            default_host: "*".to_string(),
            extensions: vec!["go".to_string()],
            strict: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; `from_env` passes the process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut config = Self::default();

        if let Some(dir) = non_empty(lookup("GRBAC_SOURCE_DIR")) {
            config.source_dir = PathBuf::from(dir);
        }
        if let Some(output) = non_empty(lookup("GRBAC_OUTPUT")) {
            config.output = PathBuf::from(output);
        }
        if let Some(host) = non_empty(lookup("GRBAC_DEFAULT_HOST")) {
            config.default_host = host;
        }
        if let Some(exts) = non_empty(lookup("GRBAC_EXTENSIONS")) {
            config.extensions = parse_extensions(&exts);
            if config.extensions.is_empty() {
                return Err(AppError::configuration("GRBAC_EXTENSIONS must name at least one extension"));
            }
        }
        if let Some(strict) = non_empty(lookup("GRBAC_STRICT")) {
            config.strict = parse_bool(&strict)
                .ok_or_else(|| AppError::configuration("GRBAC_STRICT must be true, false, 1 or 0"))?;
        }

        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Accepts `go`, `.go` and `go, rs` alike.
pub fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
