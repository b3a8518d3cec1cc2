//! Bulk operation runner.
//!
//! Runs operations one at a time, records exactly one result per
//! operation in input order, and never lets a single failure stop the
//! batch. There are no retries.
//!
//! Logging goes through a [`RunObserver`] handed to the runner rather
//! than through process-wide state, so callers and tests decide where
//! events end up.

use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::error::Error;
use crate::operations::{Operation, OperationExecutor};

mod report;

pub use report::{BatchReport, OperationResult};

/// Receives batch progress events
pub trait RunObserver {
    fn batch_started(&self, _kind: &str, _run_id: Uuid, _total: usize) {}

    fn item_succeeded(&self, kind: &str, target_id: &str);

    fn item_failed(&self, kind: &str, target_id: &str, error: &Error);

    fn batch_finished(&self, report: &BatchReport);
}

/// Emits batch events as `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn batch_started(&self, kind: &str, run_id: Uuid, total: usize) {
        info!(kind, %run_id, total, "Starting bulk run");
    }

    fn item_succeeded(&self, kind: &str, target_id: &str) {
        info!(kind, target_id, "Operation succeeded");
    }

    fn item_failed(&self, kind: &str, target_id: &str, error: &Error) {
        error!(kind, target_id, error = %error, "Operation failed");
    }

    fn batch_finished(&self, report: &BatchReport) {
        info!(
            kind = %report.kind,
            run_id = %report.run_id,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Bulk run completed: {}",
            report.summary()
        );
    }
}

/// Sequential runner for a list of operations
pub struct BatchRunner<'a> {
    observer: &'a dyn RunObserver,
}

impl<'a> BatchRunner<'a> {
    pub fn new(observer: &'a dyn RunObserver) -> Self {
        Self { observer }
    }

    /// Execute every operation in order and report each outcome.
    pub async fn run<O, E>(&self, operations: &[O], executor: &E) -> BatchReport
    where
        O: Operation,
        E: OperationExecutor<O> + ?Sized,
    {
        let mut report = BatchReport::new(O::KIND);
        self.observer
            .batch_started(O::KIND, report.run_id, operations.len());

        for op in operations {
            let target_id = op.target_id();
            let span = info_span!("operation", kind = O::KIND, target_id);

            let result = match executor.execute(op).instrument(span).await {
                Ok(()) => {
                    self.observer.item_succeeded(O::KIND, target_id);
                    OperationResult::success(target_id)
                }
                Err(e) => {
                    self.observer.item_failed(O::KIND, target_id, &e);
                    OperationResult::failure(target_id, &e)
                }
            };
            report.record(result);
        }

        report.finish();
        self.observer.batch_finished(&report);
        report
    }
}
