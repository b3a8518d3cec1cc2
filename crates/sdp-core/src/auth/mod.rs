//! Authentication modes for the ServiceDesk Plus API.
//!
//! SDP on-prem accepts either:
//! - HTTP Basic credentials (username + password or API key)
//! - A technician key sent in the `TECHNICIAN_KEY` header
//!
//! The mode is a static configuration choice; the client applies whichever
//! one it was built with to every request.

use reqwest::RequestBuilder;
use reqwest::header::{HeaderName, HeaderValue};
use std::fmt;

use crate::error::{Error, Result};

/// Header carrying the technician key
pub const TECHNICIAN_KEY_HEADER: &str = "technician_key";

/// How requests authenticate against SDP
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// HTTP Basic auth
    Basic { username: String, password: String },
    /// Technician key header
    TechnicianKey { key: String },
}

impl AuthMode {
    /// Basic credentials
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Technician key
    pub fn technician_key(key: impl Into<String>) -> Self {
        Self::TechnicianKey { key: key.into() }
    }

    /// Short label for logs (never includes the secret)
    pub fn label(&self) -> &'static str {
        match self {
            AuthMode::Basic { .. } => "basic",
            AuthMode::TechnicianKey { .. } => "technician-key",
        }
    }

    /// Attach credentials to an outgoing request
    pub fn apply(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        match self {
            AuthMode::Basic { username, password } => Ok(req.basic_auth(username, Some(password))),
            AuthMode::TechnicianKey { key } => {
                let mut value = HeaderValue::from_str(key)
                    .map_err(|_| Error::Validation("technician_key contains invalid header characters".into()))?;
                value.set_sensitive(true);
                Ok(req.header(HeaderName::from_static(TECHNICIAN_KEY_HEADER), value))
            }
        }
    }
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            AuthMode::TechnicianKey { .. } => f
                .debug_struct("TechnicianKey")
                .field("key", &"<redacted>")
                .finish(),
        }
    }
}
