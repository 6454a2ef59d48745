use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use relata_db::crm::models::Coverage;
use relata_db::sync::models::{SyncKind, SyncRun, SyncStatus};

#[derive(Debug, Serialize)]
pub struct StartIngestionResponse {
    pub ok: bool,
    pub run_id: Uuid,
    pub tenant_id: Uuid,
    pub kind: SyncKind,
}

#[derive(Debug, Serialize)]
pub struct SyncRunResponse {
    pub id: Uuid,
    pub kind: SyncKind,
    pub status: SyncStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error_summary: Option<String>,
}

impl From<SyncRun> for SyncRunResponse {
    fn from(run: SyncRun) -> Self {
        Self {
            id: run.id,
            kind: run.kind,
            status: run.status,
            started_at: run.started_at,
            finished_at: run.finished_at,
            error_summary: run.error_summary,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub ok: bool,
    pub runs: Vec<SyncRunResponse>,
}

#[derive(Debug, Serialize)]
pub struct CoverageResponse {
    pub ok: bool,
    pub coverage: Coverage,
}
