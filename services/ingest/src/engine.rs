use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::connector::{Connector, SourceDocument};
use crate::fingerprint::fingerprint;
use crate::metrics::SyncMetrics;
use crate::windows::{plan_windows, SyncWindow};
use relata_common::error::{RelataError, RelataResult};
use relata_db::crm::models::{Interaction, InteractionKind, Source, SourceItem};
use relata_db::crm::repositories::{
    ContactRepository, InteractionRepository, SourceItemRepository,
};
use relata_db::sync::models::{SyncKind, SyncRun, SyncStatus};
use relata_db::sync::repositories::{CheckpointRepository, SyncRunRepository};

/// Invoked after each window's checkpoint write. A failing hook aborts the
/// run between windows, which is exactly where the resume tests need it.
pub type WindowHook = Arc<dyn Fn(&SyncWindow) -> RelataResult<()> + Send + Sync>;

/// Repository bundle the engine writes through. All handles are shared so
/// one store instance can back several engines (API + scheduled syncs).
#[derive(Clone)]
pub struct SyncStores {
    pub runs: Arc<dyn SyncRunRepository>,
    pub checkpoints: Arc<dyn CheckpointRepository>,
    pub items: Arc<dyn SourceItemRepository>,
    pub contacts: Arc<dyn ContactRepository>,
    pub interactions: Arc<dyn InteractionRepository>,
}

impl SyncStores {
    /// Bundle a single store implementing every repository trait.
    pub fn from_store<S>(store: S) -> Self
    where
        S: SyncRunRepository
            + CheckpointRepository
            + SourceItemRepository
            + ContactRepository
            + InteractionRepository
            + Clone
            + 'static,
    {
        Self {
            runs: Arc::new(store.clone()),
            checkpoints: Arc::new(store.clone()),
            items: Arc::new(store.clone()),
            contacts: Arc::new(store.clone()),
            interactions: Arc::new(store),
        }
    }
}

/// Drives one sync run: plans windows, fetches both provider streams per
/// window, applies items through the stores, and advances the checkpoint
/// only after a window's side effects have all landed.
pub struct SyncEngine {
    connector: Arc<dyn Connector>,
    stores: SyncStores,
    metrics: Arc<SyncMetrics>,
    window_hook: Option<WindowHook>,
}

impl SyncEngine {
    pub fn new(connector: Arc<dyn Connector>, stores: SyncStores, metrics: Arc<SyncMetrics>) -> Self {
        Self {
            connector,
            stores,
            metrics,
            window_hook: None,
        }
    }

    pub fn with_window_hook(mut self, hook: WindowHook) -> Self {
        self.window_hook = Some(hook);
        self
    }

    /// Run one sync over `[start, end)` and return the run id.
    ///
    /// Failures are not retried here: the caller re-invokes with the same
    /// range and the checkpoint resumes from the first uncommitted window.
    pub async fn run_sync(
        &self,
        tenant_id: Uuid,
        kind: SyncKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RelataResult<Uuid> {
        let run = self
            .stores
            .runs
            .create_run(SyncRun::queued(tenant_id, kind))
            .await?;
        self.metrics.record_transition(kind, SyncStatus::Queued);

        self.stores.runs.mark_running(run.id).await?;
        self.metrics.record_transition(kind, SyncStatus::Running);

        let windows = self.remaining_windows(tenant_id, kind, start, end).await?;
        tracing::info!(
            tenant = %tenant_id,
            kind = kind.as_str(),
            windows = windows.len(),
            "sync run started"
        );

        match self.apply_windows(tenant_id, kind, &windows).await {
            Ok(()) => {
                self.stores.runs.mark_completed(run.id).await?;
                self.metrics.record_transition(kind, SyncStatus::Completed);
                tracing::info!(run_id = %run.id, kind = kind.as_str(), "sync run completed");
                Ok(run.id)
            }
            Err(e) => {
                let summary = e.to_string();
                self.stores.runs.mark_failed(run.id, &summary).await?;
                self.metrics.record_transition(kind, SyncStatus::Failed);
                tracing::error!(run_id = %run.id, error = %summary, "sync run failed");
                Err(e)
            }
        }
    }

    /// Daily runs treat the whole range as a single window. Backfills plan
    /// monthly windows and drop every window already covered by the
    /// checkpoint; a checkpoint at or past the range end leaves nothing.
    async fn remaining_windows(
        &self,
        tenant_id: Uuid,
        kind: SyncKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RelataResult<Vec<SyncWindow>> {
        match kind {
            SyncKind::Daily => {
                if start >= end {
                    return Ok(Vec::new());
                }
                Ok(vec![SyncWindow { start, end }])
            }
            SyncKind::Backfill => {
                let planned = plan_windows(start, end);
                match self.stores.checkpoints.get_checkpoint(tenant_id, kind).await? {
                    Some(checkpoint) => Ok(planned
                        .into_iter()
                        .filter(|w| w.end > checkpoint)
                        .collect()),
                    None => Ok(planned),
                }
            }
        }
    }

    async fn apply_windows(
        &self,
        tenant_id: Uuid,
        kind: SyncKind,
        windows: &[SyncWindow],
    ) -> RelataResult<()> {
        for window in windows {
            // The two provider streams are independent; fetch them together.
            let (emails, events) = tokio::join!(
                self.connector.fetch_items(tenant_id, window, Source::Gmail),
                self.connector.fetch_items(tenant_id, window, Source::Calendar),
            );

            for doc in emails? {
                self.apply_item(tenant_id, kind, Source::Gmail, doc).await?;
            }
            for doc in events? {
                self.apply_item(tenant_id, kind, Source::Calendar, doc).await?;
            }

            // Checkpoint strictly after the window's side effects. A crash
            // before this line reprocesses the window; it never skips it.
            self.stores
                .checkpoints
                .set_checkpoint(tenant_id, kind, window.end)
                .await?;
            tracing::debug!(
                tenant = %tenant_id,
                window_end = %window.end,
                "window committed"
            );

            if let Some(hook) = &self.window_hook {
                hook(window)?;
            }
        }

        Ok(())
    }

    async fn apply_item(
        &self,
        tenant_id: Uuid,
        kind: SyncKind,
        source: Source,
        doc: SourceDocument,
    ) -> RelataResult<()> {
        let payload = serde_json::to_value(&doc)
            .map_err(|e| RelataError::Internal(format!("encoding source item: {e}")))?;
        let payload_hash = fingerprint(&payload);

        let upsert = self
            .stores
            .items
            .upsert_if_changed(SourceItem {
                tenant_id,
                source,
                external_id: doc.external_id.clone(),
                external_updated_at: doc.external_updated_at,
                payload,
                payload_hash,
            })
            .await?;

        let lag_ms = (Utc::now() - doc.occurred_at).num_milliseconds();
        self.metrics.record_lag(kind, lag_ms);

        if !upsert.changed {
            return Ok(());
        }

        let contact_id = self
            .stores
            .contacts
            .resolve_contact(tenant_id, &doc.participant_email, &doc.participant_name)
            .await?;

        self.stores
            .interactions
            .append_interaction(Interaction {
                id: Uuid::new_v4(),
                tenant_id,
                contact_id,
                kind: match source {
                    Source::Gmail => InteractionKind::Email,
                    Source::Calendar => InteractionKind::Meeting,
                },
                occurred_at: doc.occurred_at,
                subject: doc.subject,
                snippet: doc.snippet,
            })
            .await?;

        Ok(())
    }
}
