//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{AppConfig, TlsConfig};
use crate::config::validation::{validate_config, ValidationFinding};

/// Error type for configuration loading.
///
/// Validation findings are not errors; they are logged and returned
/// alongside the configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from an optional TOML file and overlay the
/// environment seen through `env`.
///
/// Findings are returned rather than logged so the caller can report them
/// once logging is configured from the loaded values.
pub fn load_with<F>(path: Option<&Path>, env: F) -> Result<(AppConfig, Vec<ValidationFinding>), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => AppConfig::default(),
    };

    let mut findings = apply_env_overrides(&mut config, env);
    findings.extend(validate_config(&config));
    Ok((config, findings))
}

/// Overlay `DB_*` environment variables onto the configuration.
///
/// Set-but-unparsable values are returned as findings and the previous
/// value is kept.
pub fn apply_env_overrides<F>(config: &mut AppConfig, env: F) -> Vec<ValidationFinding>
where
    F: Fn(&str) -> Option<String>,
{
    let mut findings = Vec::new();
    let db = &mut config.database;

    if let Some(user) = env("DB_USER") {
        db.user = Some(user);
    }
    if let Some(password) = env("DB_PASSWORD") {
        db.password = Some(password);
    }
    if let Some(host) = env("DB_HOST") {
        db.host = Some(host);
    }
    if let Some(name) = env("DB_NAME") {
        db.database = Some(name);
    }
    if let Some(port) = env("DB_PORT") {
        match port.trim().parse() {
            Ok(port) => db.port = port,
            Err(e) => findings.push(ValidationFinding::Invalid {
                field: "DB_PORT",
                reason: format!("{:?}: {}", port, e),
            }),
        }
    }
    if let Some(timeout) = env("DB_CONNECT_TIMEOUT_MS") {
        match timeout.trim().parse() {
            Ok(ms) => db.connect_timeout_ms = ms,
            Err(e) => findings.push(ValidationFinding::Invalid {
                field: "DB_CONNECT_TIMEOUT_MS",
                reason: format!("{:?}: {}", timeout, e),
            }),
        }
    }
    if let Some(ca_cert) = env("DB_SSL_CA") {
        db.tls = (!ca_cert.trim().is_empty()).then_some(TlsConfig { ca_cert });
    }

    findings
}

/// Log each finding as a distinct warning.
pub fn report_findings(findings: &[ValidationFinding]) {
    for finding in findings {
        match finding {
            ValidationFinding::Missing(field) => {
                tracing::warn!(field = %field, "Required configuration value is missing");
            }
            ValidationFinding::Invalid { field, reason } => {
                tracing::warn!(field = %field, reason = %reason, "Configuration value is invalid");
            }
        }
    }
}
