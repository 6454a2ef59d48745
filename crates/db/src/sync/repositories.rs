use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::sync::models::{SyncKind, SyncRun};
use relata_common::error::RelataResult;

/// Lifecycle ledger for sync runs. Status moves strictly forward
/// (queued → running → completed|failed); updates against a terminal
/// run are ignored by implementations.
#[async_trait]
pub trait SyncRunRepository: Send + Sync {
    async fn create_run(&self, run: SyncRun) -> RelataResult<SyncRun>;

    async fn mark_running(&self, id: Uuid) -> RelataResult<()>;

    async fn mark_completed(&self, id: Uuid) -> RelataResult<()>;

    async fn mark_failed(&self, id: Uuid, error_summary: &str) -> RelataResult<()>;

    /// Most recent first, capped at 25 rows.
    async fn list_runs(&self, tenant_id: Uuid) -> RelataResult<Vec<SyncRun>>;
}

/// Resume cursor per (tenant, kind): the end of the last window whose
/// side effects fully committed. Written only after those effects land.
#[async_trait]
pub trait CheckpointRepository: Send + Sync {
    async fn get_checkpoint(
        &self,
        tenant_id: Uuid,
        kind: SyncKind,
    ) -> RelataResult<Option<DateTime<Utc>>>;

    async fn set_checkpoint(
        &self,
        tenant_id: Uuid,
        kind: SyncKind,
        window_end: DateTime<Utc>,
    ) -> RelataResult<()>;
}
