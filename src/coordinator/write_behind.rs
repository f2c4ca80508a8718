//! Write-Behind Tracking
//!
//! Writes and deletes under the write-behind policy are acknowledged before
//! they reach the cache or the backend. This module keeps the detached tasks
//! that finish them and records, per key, how the latest one ended.
//!
//! ## Responsibilities
//! - **Spawning**: tasks run on a `TaskTracker` so shutdown can wait for them.
//! - **Status**: one `WriteRecord` per key (`pending` -> `applied` | `failed`).
//!   A record is only finalized by the operation that created it; a newer
//!   operation on the same key replaces it, and the older one is skipped if
//!   it has not started applying yet.
//! - **Bounding**: finished records are dropped once the table grows past
//!   `MAX_RECORDS`.

use super::types::*;

use dashmap::DashMap;
use std::future::Future;
use std::time::Duration;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

const MAX_RECORDS: usize = 10_000;

pub struct WriteBehindTracker {
    /// `file key -> latest operation`
    records: DashMap<String, WriteRecord>,
    tasks: TaskTracker,
}

impl WriteBehindTracker {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            tasks: TaskTracker::new(),
        }
    }

    /// Records a new pending operation for `key` and returns its id.
    pub fn begin(&self, key: &str, op: WriteOp) -> String {
        if self.records.len() > MAX_RECORDS {
            self.records
                .retain(|_, record| record.status == WriteStatus::Pending);
        }

        let op_id = Uuid::new_v4().to_string();
        self.records.insert(
            key.to_string(),
            WriteRecord {
                op_id: op_id.clone(),
                op,
                status: WriteStatus::Pending,
                submitted_at: now_ms(),
                finished_at: None,
            },
        );
        op_id
    }

    /// Finalizes the record for `key` if `op_id` is still its latest operation.
    pub fn finish(&self, key: &str, op_id: &str, outcome: Result<(), String>) {
        let status = match outcome {
            Ok(()) => WriteStatus::Applied,
            Err(error) => WriteStatus::Failed { error },
        };

        match self.records.get_mut(key) {
            Some(mut record) if record.op_id == op_id => {
                tracing::debug!("Write-behind {} for '{}' -> {:?}", op_id, key, status);
                record.status = status;
                record.finished_at = Some(now_ms());
            }
            _ => {
                tracing::debug!(
                    "Write-behind {} for '{}' superseded, final status {:?} not recorded",
                    op_id,
                    key,
                    status
                );
            }
        }
    }

    /// Whether `op_id` is still the newest operation submitted for `key`.
    pub fn is_latest(&self, key: &str, op_id: &str) -> bool {
        self.records
            .get(key)
            .map(|record| record.op_id == op_id)
            .unwrap_or(false)
    }

    pub fn status(&self, key: &str) -> Option<WriteRecord> {
        self.records.get(key).map(|record| record.value().clone())
    }

    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(task);
    }

    /// Number of detached tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Returns (pending, applied, failed) record counts.
    pub fn status_counts(&self) -> (usize, usize, usize) {
        let mut pending = 0;
        let mut applied = 0;
        let mut failed = 0;

        for record in self.records.iter() {
            match record.status {
                WriteStatus::Pending => pending += 1,
                WriteStatus::Applied => applied += 1,
                WriteStatus::Failed { .. } => failed += 1,
            }
        }

        (pending, applied, failed)
    }

    /// Waits until every task spawned so far has finished.
    pub async fn wait_idle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    /// Waits up to `grace` for running tasks. Returns `false` if some were
    /// still running when the grace period ran out.
    pub async fn drain(&self, grace: Duration) -> bool {
        self.tasks.close();
        let in_flight = self.tasks.len();
        if in_flight > 0 {
            tracing::info!("Waiting for {} write-behind task(s) to finish", in_flight);
        }

        match tokio::time::timeout(grace, self.tasks.wait()).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    "{} write-behind task(s) still running after {:?}",
                    self.tasks.len(),
                    grace
                );
                false
            }
        }
    }
}

impl Default for WriteBehindTracker {
    fn default() -> Self {
        Self::new()
    }
}
