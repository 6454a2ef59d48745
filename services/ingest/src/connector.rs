use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::windows::SyncWindow;
use relata_db::crm::models::Source;
use relata_common::error::RelataResult;

/// Normalized provider item, independent of the wire format it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceDocument {
    pub external_id: String,
    pub external_updated_at: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
    pub participant_email: String,
    pub participant_name: String,
    pub subject: String,
    pub snippet: String,
}

/// Capability the sync engine pulls provider data through. Constructed
/// once and injected; any fetch error fails the window it belongs to.
#[async_trait]
pub trait Connector: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_items(
        &self,
        tenant_id: Uuid,
        window: &SyncWindow,
        source: Source,
    ) -> RelataResult<Vec<SourceDocument>>;
}

/// Deterministic connector for development and tests: one email and one
/// meeting per window, with external ids derived from the window start so
/// distinct windows yield distinct items and re-fetching a window yields
/// byte-identical ones.
#[derive(Debug, Clone, Default)]
pub struct MockConnector;

impl MockConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_items(
        &self,
        _tenant_id: Uuid,
        window: &SyncWindow,
        source: Source,
    ) -> RelataResult<Vec<SourceDocument>> {
        let stamp = window.start.format("%Y-%m-%d");
        let occurred_at = (window.start + Duration::hours(12)).min(window.end);

        let doc = match source {
            Source::Gmail => SourceDocument {
                external_id: format!("gmail-{stamp}"),
                external_updated_at: window.start,
                occurred_at,
                participant_email: "alex@example.com".to_string(),
                participant_name: "Alex Example".to_string(),
                subject: "Quarterly check-in".to_string(),
                snippet: "Let's catch up next week".to_string(),
            },
            Source::Calendar => SourceDocument {
                external_id: format!("cal-{stamp}"),
                external_updated_at: window.start,
                occurred_at,
                participant_email: "sam@example.com".to_string(),
                participant_name: "Sam Calendar".to_string(),
                subject: "Project sync".to_string(),
                snippet: String::new(),
            },
        };

        Ok(vec![doc])
    }
}
