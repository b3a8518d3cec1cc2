//! CMDB configuration-item updates.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::{CiUpdate, OperationExecutor};
use crate::client::SdpClient;
use crate::error::Result;

/// Applies [`CiUpdate`]s: an optional GET, then one PUT.
pub struct CiUpdateExecutor<'a> {
    client: &'a SdpClient,
    fetch_before_update: bool,
}

impl<'a> CiUpdateExecutor<'a> {
    pub fn new(client: &'a SdpClient) -> Self {
        Self {
            client,
            fetch_before_update: false,
        }
    }

    /// Read the CI first; fails the update if the CI does not exist and
    /// warns about update fields the record does not carry.
    pub fn fetch_before_update(mut self, enabled: bool) -> Self {
        self.fetch_before_update = enabled;
        self
    }
}

#[async_trait(?Send)]
impl<'a> OperationExecutor<CiUpdate> for CiUpdateExecutor<'a> {
    async fn execute(&self, op: &CiUpdate) -> Result<()> {
        if self.fetch_before_update {
            let current = self.client.get_ci(&op.ci_id).await?;
            info!(ci_id = %op.ci_id, "Retrieved CI");

            for field in unknown_fields(&current, &op.updates) {
                warn!(ci_id = %op.ci_id, field, "Field not present on CI, sending update anyway");
            }
        }

        self.client.update_ci(&op.ci_id, &op.updates).await?;
        info!(ci_id = %op.ci_id, fields = op.updates.len(), "Updated CI");
        Ok(())
    }
}

/// Update keys the current record does not have
fn unknown_fields<'u>(current: &Value, updates: &'u Map<String, Value>) -> Vec<&'u str> {
    let Some(record) = current.as_object() else {
        return Vec::new();
    };
    updates
        .keys()
        .filter(|k| !record.contains_key(k.as_str()))
        .map(String::as_str)
        .collect()
}
