//! Configuration validation.
//!
//! # Responsibilities
//! - Report every required connection field that is absent
//! - Validate value ranges (timeouts > 0, capacity > 0)
//! - Check inline trust anchor material parses as PEM certificates
//!
//! # Design Decisions
//! - Returns all findings, not just the first
//! - Findings are warnings: a process with missing credentials still starts,
//!   and acquisition fails fast with a configuration error instead
//! - Validation is a pure function: AppConfig → Vec<ValidationFinding>

use crate::config::schema::{AppConfig, CaSource};

/// A single problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFinding {
    /// A required field has no value.
    Missing(&'static str),
    /// A field has a value that cannot be used.
    Invalid { field: &'static str, reason: String },
}

impl ValidationFinding {
    pub fn field(&self) -> &'static str {
        match self {
            ValidationFinding::Missing(field) => field,
            ValidationFinding::Invalid { field, .. } => field,
        }
    }
}

impl std::fmt::Display for ValidationFinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationFinding::Missing(field) => write!(f, "{} is not set", field),
            ValidationFinding::Invalid { field, reason } => write!(f, "{} is invalid: {}", field, reason),
        }
    }
}

/// Validate a loaded configuration.
pub fn validate_config(config: &AppConfig) -> Vec<ValidationFinding> {
    let mut findings = Vec::new();
    let db = &config.database;

    for (field, value) in [
        ("database.user", &db.user),
        ("database.password", &db.password),
        ("database.host", &db.host),
        ("database.database", &db.database),
    ] {
        if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
            findings.push(ValidationFinding::Missing(field));
        }
    }

    if db.port == 0 {
        findings.push(ValidationFinding::Invalid {
            field: "database.port",
            reason: "port must be non-zero".into(),
        });
    }
    if db.connect_timeout_ms == 0 {
        findings.push(ValidationFinding::Invalid {
            field: "database.connect_timeout_ms",
            reason: "timeout must be greater than zero".into(),
        });
    }

    if let Some(tls) = &db.tls {
        match tls.source() {
            CaSource::Pem(pem) => {
                let mut reader = pem.as_bytes();
                let parsed: Result<Vec<_>, _> = rustls_pemfile::certs(&mut reader).collect();
                match parsed {
                    Ok(certs) if !certs.is_empty() => {}
                    Ok(_) => findings.push(ValidationFinding::Invalid {
                        field: "database.tls.ca_cert",
                        reason: "no certificates found in PEM block".into(),
                    }),
                    Err(e) => findings.push(ValidationFinding::Invalid {
                        field: "database.tls.ca_cert",
                        reason: e.to_string(),
                    }),
                }
            }
            CaSource::Path(path) if path.is_empty() => {
                findings.push(ValidationFinding::Missing("database.tls.ca_cert"));
            }
            CaSource::Path(_) => {}
        }
    }

    if config.retries.max_attempts == 0 {
        findings.push(ValidationFinding::Invalid {
            field: "retries.max_attempts",
            reason: "at least one attempt is always made".into(),
        });
    }

    if config.admission.capacity == 0 {
        findings.push(ValidationFinding::Invalid {
            field: "admission.capacity",
            reason: "capacity must be at least 1".into(),
        });
    }
    if config.admission.window_ms == 0 {
        findings.push(ValidationFinding::Invalid {
            field: "admission.window_ms",
            reason: "window must be greater than zero".into(),
        });
    }
    if config.admission.max_keys == 0 {
        findings.push(ValidationFinding::Invalid {
            field: "admission.max_keys",
            reason: "store must hold at least one key".into(),
        });
    }

    findings
}
