//! User-to-technician conversion with site, group, and role assignment.
//!
//! A conversion that succeeds while an assignment fails leaves the user
//! converted. Nothing is undone; the failure is reported with the
//! technician id so an operator can finish the job by hand.

use async_trait::async_trait;
use tracing::{error, info, warn};

use super::{OperationExecutor, UserConversion};
use crate::client::{Assignment, SdpClient};
use crate::error::{Error, Result};

/// Applies [`UserConversion`]s: one convert call, then one call per
/// non-empty assignment list.
pub struct ConversionExecutor<'a> {
    client: &'a SdpClient,
}

impl<'a> ConversionExecutor<'a> {
    pub fn new(client: &'a SdpClient) -> Self {
        Self { client }
    }
}

fn ids_for(op: &UserConversion, assignment: Assignment) -> &[String] {
    match assignment {
        Assignment::Sites => &op.site_ids,
        Assignment::Groups => &op.group_ids,
        Assignment::Roles => &op.role_ids,
    }
}

#[async_trait(?Send)]
impl<'a> OperationExecutor<UserConversion> for ConversionExecutor<'a> {
    async fn execute(&self, op: &UserConversion) -> Result<()> {
        let technician_id = self
            .client
            .convert_to_technician(&op.user_id, &op.technician_data)
            .await?;
        info!(user_id = %op.user_id, %technician_id, "Converted user to technician");

        // Remaining steps still run after one fails
        let mut failures = Vec::new();
        for assignment in Assignment::ALL {
            let ids = ids_for(op, assignment);
            if ids.is_empty() {
                continue;
            }

            match self.client.assign(assignment, &technician_id, ids).await {
                Ok(()) => info!(%technician_id, ?ids, "Assigned technician {}", assignment),
                Err(e) => {
                    error!(%technician_id, ?ids, error = %e, "Failed to assign technician {}", assignment);
                    failures.push(format!("{} assignment failed: {}", assignment, e));
                }
            }
        }

        if failures.is_empty() {
            info!(user_id = %op.user_id, %technician_id, "Processed user with all assignments");
            return Ok(());
        }

        warn!(
            user_id = %op.user_id,
            %technician_id,
            failed = failures.len(),
            "User converted but some assignments failed; conversion was not rolled back"
        );
        Err(Error::PartialConversion {
            user_id: op.user_id.clone(),
            technician_id,
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthMode;
    use crate::test_support::FakeSdp;
    use serde_json::{Map, json};

    fn conversion(user_id: &str) -> UserConversion {
        UserConversion {
            user_id: user_id.to_string(),
            technician_data: json!({"job_title": "IT Technician"}).as_object().cloned().unwrap(),
            site_ids: vec!["SITE001".into()],
            group_ids: vec!["GROUP001".into()],
            role_ids: vec!["ROLE001".into()],
        }
    }

    #[tokio::test]
    async fn test_full_conversion_call_order() {
        let fake = FakeSdp::start(vec![
            ("POST /api/v3/users/USER001/convert_to_technician", 200, json!({"technician": {"id": "T1"}})),
            ("POST /api/v3/technicians/T1/sites", 200, json!({})),
            ("POST /api/v3/technicians/T1/groups", 200, json!({})),
            ("POST /api/v3/technicians/T1/roles", 201, json!({})),
        ])
        .await;
        let client = SdpClient::new(&fake.base_url, AuthMode::technician_key("k")).unwrap();

        ConversionExecutor::new(&client).execute(&conversion("USER001")).await.unwrap();
        assert_eq!(
            fake.routes(),
            vec![
                "POST /api/v3/users/USER001/convert_to_technician",
                "POST /api/v3/technicians/T1/sites",
                "POST /api/v3/technicians/T1/groups",
                "POST /api/v3/technicians/T1/roles",
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_lists_are_skipped() {
        let fake = FakeSdp::start(vec![(
            "POST /api/v3/users/USER001/convert_to_technician",
            200,
            json!({"technician": {"id": 7}}),
        )])
        .await;
        let client = SdpClient::new(&fake.base_url, AuthMode::technician_key("k")).unwrap();
        let op = UserConversion {
            user_id: "USER001".into(),
            technician_data: Map::new(),
            site_ids: vec![],
            group_ids: vec![],
            role_ids: vec![],
        };

        ConversionExecutor::new(&client).execute(&op).await.unwrap();
        assert_eq!(fake.routes().len(), 1);
    }

    #[tokio::test]
    async fn test_site_failure_reports_without_rollback() {
        let fake = FakeSdp::start(vec![
            ("POST /api/v3/users/USER001/convert_to_technician", 200, json!({"technician": {"id": "T1"}})),
            ("POST /api/v3/technicians/T1/sites", 500, json!({"error": "site store offline"})),
            ("POST /api/v3/technicians/T1/groups", 200, json!({})),
            ("POST /api/v3/technicians/T1/roles", 200, json!({})),
        ])
        .await;
        let client = SdpClient::new(&fake.base_url, AuthMode::technician_key("k")).unwrap();

        let err = ConversionExecutor::new(&client)
            .execute(&conversion("USER001"))
            .await
            .unwrap_err();

        match &err {
            Error::PartialConversion { technician_id, failures, .. } => {
                assert_eq!(technician_id, "T1");
                assert_eq!(failures.len(), 1);
                assert!(failures[0].starts_with("sites assignment failed"));
            }
            other => panic!("expected partial conversion, got {:?}", other),
        }
        assert!(err.to_string().contains("site store offline"));

        // Every remaining step ran; nothing undid the conversion
        let routes = fake.routes();
        assert_eq!(routes.len(), 4);
        assert!(routes.iter().all(|r| r.starts_with("POST ")));
    }

    #[tokio::test]
    async fn test_convert_failure_stops_before_assignments() {
        let fake = FakeSdp::start(vec![(
            "POST /api/v3/users/USER001/convert_to_technician",
            403,
            json!({"error": "not allowed"}),
        )])
        .await;
        let client = SdpClient::new(&fake.base_url, AuthMode::technician_key("k")).unwrap();

        let err = ConversionExecutor::new(&client)
            .execute(&conversion("USER001"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Permission { .. }));
        assert_eq!(fake.routes().len(), 1);
    }
}
