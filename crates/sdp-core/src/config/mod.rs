//! Configuration loading for bulk SDP runs.
//!
//! The JSON file is deserialized into a loose [`RawConfig`] first, then
//! validated into a strongly-typed [`Config`]. Validation collects every
//! problem it finds so a broken file is reported in one go instead of one
//! field per run.
//!
//! Precedence, highest first:
//! 1. Environment variables (`SDP_BASE_URL`, `SDP_USERNAME`, `SDP_PASSWORD`,
//!    `SDP_TECHNICIAN_KEY`)
//! 2. The config file passed on the command line
//! 3. The built-in default configuration (only when no file is given)

use reqwest::Url;
use reqwest::header::HeaderValue;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::AuthMode;
use crate::operations::{CiUpdate, UserConversion};

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variables that override file values
pub const ENV_BASE_URL: &str = "SDP_BASE_URL";
pub const ENV_USERNAME: &str = "SDP_USERNAME";
pub const ENV_PASSWORD: &str = "SDP_PASSWORD";
pub const ENV_TECHNICIAN_KEY: &str = "SDP_TECHNICIAN_KEY";

/// Validated configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// SDP base URL without trailing slash
    pub base_url: String,
    /// Credentials applied to every request
    pub auth: AuthMode,
    /// Per-request timeout
    pub timeout: Duration,
    /// GET each CI before updating it
    pub fetch_before_update: bool,
    /// CI field updates, in file order
    pub ci_updates: Vec<CiUpdate>,
    /// User-to-technician conversions, in file order
    pub user_conversions: Vec<UserConversion>,
}

/// Configuration as it appears on disk, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfig {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub technician_key: Option<String>,
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub fetch_before_update: bool,
    #[serde(default)]
    pub ci_updates: Vec<RawCiUpdate>,
    #[serde(default)]
    pub user_conversions: Vec<RawUserConversion>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCiUpdate {
    pub ci_id: Option<Value>,
    pub updates: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUserConversion {
    pub user_id: Option<Value>,
    pub technician_data: Option<Value>,
    pub site_ids: Option<Vec<Value>>,
    pub group_ids: Option<Vec<Value>>,
    pub role_ids: Option<Vec<Value>>,
}

/// A single invalid field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted path, e.g. `ci_updates[1].updates`
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Configuration errors. All of them are fatal before any HTTP call.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid configuration:\n  {}", format_field_errors(.0))]
    Invalid(Vec<FieldError>),
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n  ")
}

impl ConfigError {
    /// Field errors, if this is a validation failure
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            ConfigError::Invalid(errors) => errors,
            _ => &[],
        }
    }
}

impl Config {
    /// Load, apply environment overrides, and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: RawConfig = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        raw.with_overrides(|name| std::env::var(name).ok()).validate()
    }

    /// Load the given file, or fall back to the built-in default.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => RawConfig::builtin_default()
                .with_overrides(|name| std::env::var(name).ok())
                .validate(),
        }
    }

    /// Parse and validate a JSON document without environment overrides.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        raw.validate()
    }
}

impl RawConfig {
    /// Placeholder configuration used when no file is supplied.
    pub fn builtin_default() -> Self {
        let technician_data = serde_json::json!({
            "employee_id": "EMP001",
            "department": "IT Support",
            "phone": "+1-234-567-8900",
            "mobile": "+1-234-567-8901",
            "job_title": "IT Technician",
            "cost_per_hour": 50.0,
            "reporting_manager": "MANAGER_ID"
        });

        Self {
            base_url: Some("https://your-sdp-server.com".to_string()),
            username: Some("your-api-user".to_string()),
            password: Some("your-api-password".to_string()),
            technician_key: None,
            timeout_secs: None,
            fetch_before_update: false,
            ci_updates: vec![RawCiUpdate {
                ci_id: Some(Value::from("CI001")),
                updates: Some(serde_json::json!({
                    "name": "Updated Server Name",
                    "description": "Updated description",
                    "status": "Active",
                    "custom_field": "custom_value"
                })),
            }],
            user_conversions: vec![RawUserConversion {
                user_id: Some(Value::from("USER001")),
                technician_data: Some(technician_data),
                site_ids: Some(vec![Value::from("SITE001"), Value::from("SITE002")]),
                group_ids: Some(vec![Value::from("GROUP001"), Value::from("GROUP002")]),
                role_ids: Some(vec![Value::from("ROLE001"), Value::from("ROLE002")]),
            }],
        }
    }

    /// Replace connection fields with values from `lookup` where present.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_BASE_URL) {
            self.base_url = Some(v);
        }
        if let Some(v) = lookup(ENV_USERNAME) {
            self.username = Some(v);
        }
        if let Some(v) = lookup(ENV_PASSWORD) {
            self.password = Some(v);
        }
        if let Some(v) = lookup(ENV_TECHNICIAN_KEY) {
            self.technician_key = Some(v);
        }
        self
    }

    /// Validate every field, returning all problems at once.
    pub fn validate(self) -> Result<Config, ConfigError> {
        let mut errors = Vec::new();

        let base_url = match non_blank(self.base_url) {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
                let url = url.trim_end_matches('/').to_string();
                match Url::parse(&url) {
                    Ok(parsed) if parsed.host_str().is_some_and(|h| !h.is_empty()) => Some(url),
                    Ok(_) => {
                        errors.push(FieldError::new("base_url", "must include a host"));
                        None
                    }
                    Err(e) => {
                        errors.push(FieldError::new("base_url", format!("is not a valid URL: {}", e)));
                        None
                    }
                }
            }
            Some(_) => {
                errors.push(FieldError::new("base_url", "must start with http:// or https://"));
                None
            }
            None => {
                errors.push(FieldError::new("base_url", "is required"));
                None
            }
        };

        let auth = resolve_auth(
            non_blank(self.username),
            non_blank(self.password),
            non_blank(self.technician_key),
            &mut errors,
        );

        let timeout = match self.timeout_secs {
            Some(0) => {
                errors.push(FieldError::new("timeout_secs", "must be greater than 0"));
                None
            }
            Some(secs) => Some(Duration::from_secs(secs)),
            None => Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        };

        let ci_updates: Vec<CiUpdate> = self
            .ci_updates
            .into_iter()
            .enumerate()
            .filter_map(|(i, raw)| validate_ci_update(i, raw, &mut errors))
            .collect();

        let user_conversions: Vec<UserConversion> = self
            .user_conversions
            .into_iter()
            .enumerate()
            .filter_map(|(i, raw)| validate_conversion(i, raw, &mut errors))
            .collect();

        match (base_url, auth, timeout) {
            (Some(base_url), Some(auth), Some(timeout)) if errors.is_empty() => Ok(Config {
                base_url,
                auth,
                timeout,
                fetch_before_update: self.fetch_before_update,
                ci_updates,
                user_conversions,
            }),
            _ => Err(ConfigError::Invalid(errors)),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn resolve_auth(
    username: Option<String>,
    password: Option<String>,
    technician_key: Option<String>,
    errors: &mut Vec<FieldError>,
) -> Option<AuthMode> {
    match (username, password, technician_key) {
        (None, None, Some(key)) => {
            if HeaderValue::from_str(&key).is_err() {
                errors.push(FieldError::new("technician_key", "contains invalid header characters"));
                return None;
            }
            Some(AuthMode::technician_key(key))
        }
        (Some(username), Some(password), None) => Some(AuthMode::basic(username, password)),
        (None, None, None) => {
            errors.push(FieldError::new(
                "auth",
                "configure either username and password or technician_key",
            ));
            None
        }
        (Some(_), None, None) => {
            errors.push(FieldError::new("password", "is required when username is set"));
            None
        }
        (None, Some(_), None) => {
            errors.push(FieldError::new("username", "is required when password is set"));
            None
        }
        (_, _, Some(_)) => {
            errors.push(FieldError::new(
                "auth",
                "both basic credentials and technician_key are configured; set only one",
            ));
            None
        }
    }
}

/// Accept ids written either as strings or integers.
fn id_value(value: Option<Value>, field: &str, errors: &mut Vec<FieldError>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) if n.is_u64() || n.is_i64() => Some(n.to_string()),
        None | Some(Value::Null) => {
            errors.push(FieldError::new(field, "is required"));
            None
        }
        Some(Value::String(_)) => {
            errors.push(FieldError::new(field, "must not be empty"));
            None
        }
        Some(_) => {
            errors.push(FieldError::new(field, "must be a string or integer id"));
            None
        }
    }
}

fn id_list(values: Option<Vec<Value>>, field: &str, errors: &mut Vec<FieldError>) -> Vec<String> {
    values
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(i, v)| id_value(Some(v), &format!("{}[{}]", field, i), errors))
        .collect()
}

fn validate_ci_update(index: usize, raw: RawCiUpdate, errors: &mut Vec<FieldError>) -> Option<CiUpdate> {
    let prefix = format!("ci_updates[{}]", index);
    let ci_id = id_value(raw.ci_id, &format!("{}.ci_id", prefix), errors);

    let updates = match raw.updates {
        Some(Value::Object(map)) if !map.is_empty() => Some(map),
        Some(Value::Object(_)) => {
            errors.push(FieldError::new(format!("{}.updates", prefix), "must not be empty"));
            None
        }
        None | Some(Value::Null) => {
            errors.push(FieldError::new(format!("{}.updates", prefix), "is required"));
            None
        }
        Some(_) => {
            errors.push(FieldError::new(format!("{}.updates", prefix), "must be a JSON object"));
            None
        }
    };

    Some(CiUpdate {
        ci_id: ci_id?,
        updates: updates?,
    })
}

fn validate_conversion(
    index: usize,
    raw: RawUserConversion,
    errors: &mut Vec<FieldError>,
) -> Option<UserConversion> {
    let prefix = format!("user_conversions[{}]", index);
    let user_id = id_value(raw.user_id, &format!("{}.user_id", prefix), errors);

    let technician_data = match raw.technician_data {
        None | Some(Value::Null) => Some(Map::new()),
        Some(Value::Object(map)) => Some(map),
        Some(_) => {
            errors.push(FieldError::new(
                format!("{}.technician_data", prefix),
                "must be a JSON object",
            ));
            None
        }
    };

    let site_ids = id_list(raw.site_ids, &format!("{}.site_ids", prefix), errors);
    let group_ids = id_list(raw.group_ids, &format!("{}.group_ids", prefix), errors);
    let role_ids = id_list(raw.role_ids, &format!("{}.role_ids", prefix), errors);

    Some(UserConversion {
        user_id: user_id?,
        technician_data: technician_data?,
        site_ids,
        group_ids,
        role_ids,
    })
}
