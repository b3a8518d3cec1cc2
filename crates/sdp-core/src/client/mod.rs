//! API client for ServiceDesk Plus on-prem (REST API v3).
//!
//! One `reqwest::Client` is reused for every call. Responses are returned
//! as loose JSON; callers only pick out the few fields they need.
//!
//! # Usage
//!
//! ```rust,no_run
//! use sdp_core::auth::AuthMode;
//! use sdp_core::client::SdpClient;
//!
//! #[tokio::main]
//! async fn main() -> sdp_core::Result<()> {
//!     let client = SdpClient::new("https://sdp.example.com", AuthMode::technician_key("KEY"))?;
//!     let sites = client.list_sites().await?;
//!     println!("{} sites", sites.len());
//!     Ok(())
//! }
//! ```

use reqwest::{Method, Url};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::auth::AuthMode;
use crate::config::{Config, DEFAULT_TIMEOUT_SECS};
use crate::error::{Error, Result};

/// Technician assignment endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    Sites,
    Groups,
    Roles,
}

impl Assignment {
    /// Order in which a conversion applies assignments
    pub const ALL: [Assignment; 3] = [Assignment::Sites, Assignment::Groups, Assignment::Roles];

    /// Path segment under `/api/v3/technicians/{id}/`
    pub fn segment(&self) -> &'static str {
        match self {
            Assignment::Sites => "sites",
            Assignment::Groups => "groups",
            Assignment::Roles => "roles",
        }
    }

    /// Key of the id list in the request body
    pub fn body_key(&self) -> &'static str {
        match self {
            Assignment::Sites => "site_ids",
            Assignment::Groups => "group_ids",
            Assignment::Roles => "role_ids",
        }
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// API client for SDP
#[derive(Clone)]
pub struct SdpClient {
    /// Base URL, e.g. https://sdp.example.com
    base_url: Url,
    /// Credentials applied to every request
    auth: AuthMode,
    /// HTTP client
    client: reqwest::Client,
}

impl SdpClient {
    /// Create a client with the default timeout
    pub fn new(base_url: &str, auth: AuthMode) -> Result<Self> {
        Self::with_timeout(base_url, auth, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with a custom per-request timeout
    pub fn with_timeout(base_url: &str, auth: AuthMode, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| Error::Validation(format!("invalid base_url {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Validation(format!("base_url {} cannot be used as a base", base_url)));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            auth,
            client,
        })
    }

    /// Create a client from validated configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_timeout(&config.base_url, config.auth.clone(), config.timeout)
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    // ─────────────────────────────────────────────────────────────────────────
    // CMDB Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a configuration item by ID
    pub async fn get_ci(&self, ci_id: &str) -> Result<Value> {
        let value = self.get(&["api", "v3", "cmdb", "ci", ci_id], &[]).await?;
        Ok(unwrap_envelope(value, "ci"))
    }

    /// Update configuration item fields
    pub async fn update_ci(&self, ci_id: &str, updates: &Map<String, Value>) -> Result<()> {
        let body = serde_json::json!({ "ci": updates });
        self.send(Method::PUT, &["api", "v3", "cmdb", "ci", ci_id], &body)
            .await?;
        Ok(())
    }

    /// Search configuration items
    pub async fn search_cis(&self, criteria: &[(String, String)]) -> Result<Vec<Value>> {
        let path = ["api", "v3", "cmdb", "ci"];
        let value = self.get(&path, criteria).await?;
        list_field(value, "cis", &path)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // User Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a user by ID
    pub async fn get_user(&self, user_id: &str) -> Result<Value> {
        let value = self.get(&["api", "v3", "users", user_id], &[]).await?;
        Ok(unwrap_envelope(value, "user"))
    }

    /// Search users
    pub async fn search_users(&self, criteria: &[(String, String)]) -> Result<Vec<Value>> {
        let path = ["api", "v3", "users"];
        let value = self.get(&path, criteria).await?;
        list_field(value, "users", &path)
    }

    /// Convert a user to a technician, returning the new technician ID
    pub async fn convert_to_technician(
        &self,
        user_id: &str,
        technician_data: &Map<String, Value>,
    ) -> Result<String> {
        let path = ["api", "v3", "users", user_id, "convert_to_technician"];
        let value = self.send(Method::POST, &path, technician_data).await?;

        match value.get("technician").and_then(|t| t.get("id")) {
            Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(Error::decode(path.join("/"), "response has no technician.id")),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Technician Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a technician by ID
    pub async fn get_technician(&self, technician_id: &str) -> Result<Value> {
        let value = self.get(&["api", "v3", "technicians", technician_id], &[]).await?;
        Ok(unwrap_envelope(value, "technician"))
    }

    /// Update technician fields
    pub async fn update_technician(&self, technician_id: &str, updates: &Map<String, Value>) -> Result<()> {
        let body = serde_json::json!({ "technician": updates });
        self.send(Method::PUT, &["api", "v3", "technicians", technician_id], &body)
            .await?;
        Ok(())
    }

    /// Attach a technician to sites, groups, or roles
    pub async fn assign(&self, assignment: Assignment, technician_id: &str, ids: &[String]) -> Result<()> {
        let mut body = Map::new();
        body.insert(assignment.body_key().to_string(), serde_json::json!(ids));

        let path = ["api", "v3", "technicians", technician_id, assignment.segment()];
        self.send(Method::POST, &path, &body).await?;
        Ok(())
    }

    /// Assign a technician to sites
    pub async fn assign_sites(&self, technician_id: &str, site_ids: &[String]) -> Result<()> {
        self.assign(Assignment::Sites, technician_id, site_ids).await
    }

    /// Assign a technician to groups
    pub async fn assign_groups(&self, technician_id: &str, group_ids: &[String]) -> Result<()> {
        self.assign(Assignment::Groups, technician_id, group_ids).await
    }

    /// Assign roles to a technician
    pub async fn assign_roles(&self, technician_id: &str, role_ids: &[String]) -> Result<()> {
        self.assign(Assignment::Roles, technician_id, role_ids).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lookups
    // ─────────────────────────────────────────────────────────────────────────

    /// List all sites
    pub async fn list_sites(&self) -> Result<Vec<Value>> {
        self.list("sites").await
    }

    /// List all groups
    pub async fn list_groups(&self) -> Result<Vec<Value>> {
        self.list("groups").await
    }

    /// List all roles
    pub async fn list_roles(&self) -> Result<Vec<Value>> {
        self.list("roles").await
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>> {
        let path = ["api", "v3", collection];
        let value = self.get(&path, &[]).await?;
        list_field(value, collection, &path)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // HTTP Helpers
    // ─────────────────────────────────────────────────────────────────────────

    async fn get(&self, segments: &[&str], query: &[(String, String)]) -> Result<Value> {
        self.request(Method::GET, segments, query, Option::<&()>::None).await
    }

    async fn send<B: Serialize + ?Sized>(&self, method: Method, segments: &[&str], body: &B) -> Result<Value> {
        self.request(method, segments, &[], Some(body)).await
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in the constructor
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(String, String)],
        body: Option<&B>,
    ) -> Result<Value> {
        let url = self.endpoint(segments);
        let path = url.path().to_string();
        debug!(auth = self.auth.label(), "API request: {} {}", method, url);

        let mut req = self.client.request(method, url);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(b) = body {
            req = req.json(b);
        }
        let req = self.auth.apply(req)?;

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        debug!(status = status.as_u16(), "API response for {}", path);

        if !status.is_success() {
            return Err(Error::from_status(status, path, text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| Error::decode(path, e.to_string()))
    }
}

/// SDP wraps single records as `{"ci": {...}}`; unwrap when present.
fn unwrap_envelope(value: Value, key: &str) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key(key) => map.remove(key).unwrap_or(Value::Null),
        other => other,
    }
}

/// Pull a list out of a collection response; a missing key means no entries.
fn list_field(value: Value, key: &str, path: &[&str]) -> Result<Vec<Value>> {
    match value {
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => Ok(items),
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(_) => Err(Error::decode(path.join("/"), format!("`{}` is not an array", key))),
        },
        Value::Null => Ok(Vec::new()),
        _ => Err(Error::decode(path.join("/"), "expected a JSON object")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeSdp;
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde_json::json;

    fn basic_client(fake: &FakeSdp) -> SdpClient {
        SdpClient::new(&fake.base_url, AuthMode::basic("api-user", "secret")).unwrap()
    }

    #[test]
    fn test_client_rejects_bad_base_url() {
        let result = SdpClient::new("not a url", AuthMode::technician_key("k"));
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_endpoint_encodes_ids_and_keeps_prefix() {
        let client = SdpClient::new("https://sdp.example.com/sdp/", AuthMode::technician_key("k")).unwrap();
        let url = client.endpoint(&["api", "v3", "cmdb", "ci", "CI 01/x"]);
        assert_eq!(url.as_str(), "https://sdp.example.com/sdp/api/v3/cmdb/ci/CI%2001%2Fx");
        assert_eq!(client.base_url(), "https://sdp.example.com/sdp");
    }

    #[test]
    fn test_unwrap_envelope() {
        assert_eq!(unwrap_envelope(json!({"ci": {"id": "1"}}), "ci"), json!({"id": "1"}));
        assert_eq!(unwrap_envelope(json!({"id": "1"}), "ci"), json!({"id": "1"}));
    }

    #[tokio::test]
    async fn test_get_ci_sends_basic_auth() {
        let fake = FakeSdp::start(vec![(
            "GET /api/v3/cmdb/ci/CI001",
            200,
            json!({"ci": {"id": "CI001", "name": "web-01"}}),
        )])
        .await;

        let ci = basic_client(&fake).get_ci("CI001").await.unwrap();
        assert_eq!(ci["name"], "web-01");

        let calls = fake.calls();
        assert_eq!(calls.len(), 1);
        let header = calls[0].header("authorization").unwrap();
        let decoded = STANDARD.decode(header.trim_start_matches("Basic ")).unwrap();
        assert_eq!(decoded, b"api-user:secret");
        assert!(calls[0].header("technician_key").is_none());
    }

    #[tokio::test]
    async fn test_technician_key_header() {
        let fake = FakeSdp::start(vec![("GET /api/v3/sites", 200, json!({"sites": [{"id": "S1"}]}))]).await;
        let client = SdpClient::new(&fake.base_url, AuthMode::technician_key("ABCD-1234")).unwrap();

        let sites = client.list_sites().await.unwrap();
        assert_eq!(sites.len(), 1);

        let calls = fake.calls();
        assert_eq!(calls[0].header("technician_key"), Some("ABCD-1234"));
        assert!(calls[0].header("authorization").is_none());
    }

    #[tokio::test]
    async fn test_update_ci_wraps_payload() {
        let fake = FakeSdp::start(vec![("PUT /api/v3/cmdb/ci/CI001", 200, json!({"response_status": "success"}))]).await;
        let updates = json!({"status": "Active"}).as_object().cloned().unwrap();

        tokio_test::assert_ok!(basic_client(&fake).update_ci("CI001", &updates).await);

        let calls = fake.calls();
        assert_eq!(calls[0].body, json!({"ci": {"status": "Active"}}));
        assert_eq!(calls[0].header("content-type"), Some("application/json"));
    }

    #[tokio::test]
    async fn test_status_codes_map_to_errors() {
        let fake = FakeSdp::start(vec![
            ("GET /api/v3/users/U401", 401, json!({"error": "bad credentials"})),
            ("GET /api/v3/users/U403", 403, json!({"error": "forbidden"})),
            ("GET /api/v3/users/U500", 500, json!({"error": "boom"})),
        ])
        .await;
        let client = basic_client(&fake);

        let err = client.get_user("U401").await.unwrap_err();
        assert!(matches!(err, Error::Auth { .. }));
        assert!(err.to_string().contains("bad credentials"));

        assert!(matches!(client.get_user("U403").await, Err(Error::Permission { .. })));
        assert!(client.get_user("missing").await.unwrap_err().is_not_found());
        assert_eq!(client.get_user("U500").await.unwrap_err().status(), Some(500));
    }

    #[tokio::test]
    async fn test_transport_error() {
        // Port 9 (discard) on localhost is not listening in test environments
        let client = SdpClient::with_timeout(
            "http://127.0.0.1:9",
            AuthMode::technician_key("k"),
            Duration::from_secs(2),
        )
        .unwrap();

        let err = client.list_roles().await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn test_convert_to_technician_reads_id() {
        let fake = FakeSdp::start(vec![
            ("POST /api/v3/users/USER001/convert_to_technician", 201, json!({"technician": {"id": 42}})),
            ("POST /api/v3/users/USER002/convert_to_technician", 200, json!({"status": "ok"})),
        ])
        .await;
        let client = basic_client(&fake);
        let data = json!({"job_title": "IT Technician"}).as_object().cloned().unwrap();

        assert_eq!(client.convert_to_technician("USER001", &data).await.unwrap(), "42");
        assert_eq!(fake.calls()[0].body, json!({"job_title": "IT Technician"}));

        let err = client.convert_to_technician("USER002", &data).await.unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[tokio::test]
    async fn test_assign_body_keys() {
        let fake = FakeSdp::start(vec![
            ("POST /api/v3/technicians/42/sites", 200, json!({})),
            ("POST /api/v3/technicians/42/groups", 200, json!({})),
            ("POST /api/v3/technicians/42/roles", 200, json!({})),
        ])
        .await;
        let client = basic_client(&fake);
        let ids = vec!["A".to_string(), "B".to_string()];

        client.assign_sites("42", &ids).await.unwrap();
        client.assign_groups("42", &ids).await.unwrap();
        client.assign_roles("42", &ids).await.unwrap();

        let bodies: Vec<Value> = fake.calls().into_iter().map(|c| c.body).collect();
        assert_eq!(
            bodies,
            vec![
                json!({"site_ids": ["A", "B"]}),
                json!({"group_ids": ["A", "B"]}),
                json!({"role_ids": ["A", "B"]}),
            ]
        );
    }

    #[tokio::test]
    async fn test_search_passes_criteria_as_query() {
        let fake = FakeSdp::start(vec![("GET /api/v3/cmdb/ci", 200, json!({"cis": [{"id": "1"}, {"id": "2"}]}))]).await;
        let criteria = vec![("name".to_string(), "Server*".to_string())];

        let cis = basic_client(&fake).search_cis(&criteria).await.unwrap();
        assert_eq!(cis.len(), 2);
        assert_eq!(fake.calls()[0].query.as_deref(), Some("name=Server*"));
    }

    #[tokio::test]
    async fn test_list_missing_key_is_empty() {
        let fake = FakeSdp::start(vec![
            ("GET /api/v3/groups", 200, json!({"response_status": "success"})),
            ("GET /api/v3/roles", 200, json!({"roles": "nope"})),
        ])
        .await;
        let client = basic_client(&fake);

        assert!(client.list_groups().await.unwrap().is_empty());
        assert!(matches!(client.list_roles().await, Err(Error::Decode { .. })));
    }

    #[tokio::test]
    async fn test_update_technician_and_get_technician() {
        let fake = FakeSdp::start(vec![
            ("PUT /api/v3/technicians/42", 200, json!({})),
            ("GET /api/v3/technicians/42", 200, json!({"technician": {"id": "42", "phone": "555"}})),
        ])
        .await;
        let client = basic_client(&fake);
        let updates = json!({"phone": "555"}).as_object().cloned().unwrap();

        client.update_technician("42", &updates).await.unwrap();
        assert_eq!(fake.calls()[0].body, json!({"technician": {"phone": "555"}}));
        assert_eq!(client.get_technician("42").await.unwrap()["phone"], "555");
    }
}
