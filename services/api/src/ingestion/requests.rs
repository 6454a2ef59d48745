use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use relata_db::sync::models::SyncKind;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StartIngestionRequest {
    pub tenant_id: Option<Uuid>,
    pub mode: Option<SyncKind>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RefreshRequest {
    pub tenant_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TenantQuery {
    pub tenant_id: Option<Uuid>,
}
