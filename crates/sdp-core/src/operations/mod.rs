//! Bulk operations and the executors that carry them out.
//!
//! An operation is one unit of work read from configuration. Executors
//! perform every API call an operation needs and fail with the first
//! error (or, for conversions, an aggregate of assignment failures).

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;

mod ci;
mod conversion;

pub use ci::CiUpdateExecutor;
pub use conversion::ConversionExecutor;

/// A unit of work processed by the batch runner
pub trait Operation {
    /// Label used in logs and reports
    const KIND: &'static str;

    /// Id of the record the operation targets
    fn target_id(&self) -> &str;
}

/// Performs every call required by one operation.
///
/// Calls are awaited in order; implementations never fan out.
#[async_trait(?Send)]
pub trait OperationExecutor<O: Operation> {
    async fn execute(&self, op: &O) -> Result<()>;
}

/// Update fields on a configuration item
#[derive(Debug, Clone, PartialEq)]
pub struct CiUpdate {
    pub ci_id: String,
    pub updates: Map<String, Value>,
}

impl Operation for CiUpdate {
    const KIND: &'static str = "ci-update";

    fn target_id(&self) -> &str {
        &self.ci_id
    }
}

/// Convert a user to a technician and attach sites, groups, and roles
#[derive(Debug, Clone, PartialEq)]
pub struct UserConversion {
    pub user_id: String,
    pub technician_data: Map<String, Value>,
    pub site_ids: Vec<String>,
    pub group_ids: Vec<String>,
    pub role_ids: Vec<String>,
}

impl Operation for UserConversion {
    const KIND: &'static str = "user-conversion";

    fn target_id(&self) -> &str {
        &self.user_id
    }
}
