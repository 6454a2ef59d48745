//! In-memory store: one struct implementing every repository trait.
//!
//! Used when the process runs without a database (DB_MODE=memory) and as
//! the test double for the sync engine. A single mutex over the whole
//! state serializes writers, which is what gives the natural-key upserts
//! their one-writer-at-a-time behavior here.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::crm::models::{Contact, Coverage, Interaction, ItemUpsert, SourceItem};
use crate::crm::repositories::{
    ContactRepository, CoverageRepository, InteractionRepository, SourceItemRepository,
};
use crate::sync::models::{SyncKind, SyncRun, SyncStatus};
use crate::sync::repositories::{CheckpointRepository, SyncRunRepository};
use relata_common::error::{RelataError, RelataResult};

#[derive(Default)]
struct MemoryInner {
    runs: Vec<SyncRun>,
    items: HashMap<(Uuid, String, String), SourceItem>,
    contacts: HashMap<(Uuid, String), Contact>,
    interactions: Vec<Interaction>,
    checkpoints: HashMap<(Uuid, SyncKind), DateTime<Utc>>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> RelataResult<std::sync::MutexGuard<'_, MemoryInner>> {
        self.inner
            .lock()
            .map_err(|_| RelataError::Internal("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl SyncRunRepository for MemoryStore {
    async fn create_run(&self, run: SyncRun) -> RelataResult<SyncRun> {
        self.lock()?.runs.push(run.clone());
        Ok(run)
    }

    async fn mark_running(&self, id: Uuid) -> RelataResult<()> {
        let mut inner = self.lock()?;
        if let Some(run) = inner.runs.iter_mut().find(|r| r.id == id) {
            if !run.status.is_terminal() {
                run.status = SyncStatus::Running;
            }
        }
        Ok(())
    }

    async fn mark_completed(&self, id: Uuid) -> RelataResult<()> {
        let mut inner = self.lock()?;
        if let Some(run) = inner.runs.iter_mut().find(|r| r.id == id) {
            if !run.status.is_terminal() {
                run.status = SyncStatus::Completed;
                run.finished_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error_summary: &str) -> RelataResult<()> {
        let mut inner = self.lock()?;
        if let Some(run) = inner.runs.iter_mut().find(|r| r.id == id) {
            if !run.status.is_terminal() {
                run.status = SyncStatus::Failed;
                run.finished_at = Some(Utc::now());
                run.error_summary = Some(error_summary.to_string());
            }
        }
        Ok(())
    }

    async fn list_runs(&self, tenant_id: Uuid) -> RelataResult<Vec<SyncRun>> {
        let inner = self.lock()?;
        // Insertion order stands in for started_at; newest first, capped at 25.
        Ok(inner
            .runs
            .iter()
            .rev()
            .filter(|r| r.tenant_id == tenant_id)
            .take(25)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CheckpointRepository for MemoryStore {
    async fn get_checkpoint(
        &self,
        tenant_id: Uuid,
        kind: SyncKind,
    ) -> RelataResult<Option<DateTime<Utc>>> {
        Ok(self.lock()?.checkpoints.get(&(tenant_id, kind)).copied())
    }

    async fn set_checkpoint(
        &self,
        tenant_id: Uuid,
        kind: SyncKind,
        window_end: DateTime<Utc>,
    ) -> RelataResult<()> {
        self.lock()?.checkpoints.insert((tenant_id, kind), window_end);
        Ok(())
    }
}

#[async_trait]
impl SourceItemRepository for MemoryStore {
    async fn upsert_if_changed(&self, item: SourceItem) -> RelataResult<ItemUpsert> {
        let mut inner = self.lock()?;
        let key = (
            item.tenant_id,
            item.source.as_str().to_string(),
            item.external_id.clone(),
        );

        if let Some(existing) = inner.items.get(&key) {
            if existing.payload_hash == item.payload_hash {
                return Ok(ItemUpsert { changed: false });
            }
        }

        inner.items.insert(key, item);
        Ok(ItemUpsert { changed: true })
    }
}

#[async_trait]
impl ContactRepository for MemoryStore {
    async fn resolve_contact(
        &self,
        tenant_id: Uuid,
        email: &str,
        name: &str,
    ) -> RelataResult<Uuid> {
        let mut inner = self.lock()?;
        let key = (tenant_id, email.to_lowercase());

        if let Some(existing) = inner.contacts.get(&key) {
            return Ok(existing.id);
        }

        let contact = Contact {
            id: Uuid::new_v4(),
            tenant_id,
            email: email.to_string(),
            name: name.to_string(),
        };
        let id = contact.id;
        inner.contacts.insert(key, contact);
        Ok(id)
    }
}

#[async_trait]
impl InteractionRepository for MemoryStore {
    async fn append_interaction(&self, interaction: Interaction) -> RelataResult<()> {
        self.lock()?.interactions.push(interaction);
        Ok(())
    }
}

#[async_trait]
impl CoverageRepository for MemoryStore {
    async fn coverage(&self, tenant_id: Uuid) -> RelataResult<Coverage> {
        let inner = self.lock()?;
        Ok(Coverage {
            contacts: inner
                .contacts
                .values()
                .filter(|c| c.tenant_id == tenant_id)
                .count() as i64,
            interactions: inner
                .interactions
                .iter()
                .filter(|i| i.tenant_id == tenant_id)
                .count() as i64,
            source_items: inner
                .items
                .values()
                .filter(|i| i.tenant_id == tenant_id)
                .count() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crm::models::{InteractionKind, Source};

    fn item(tenant: Uuid, external_id: &str, hash: &str) -> SourceItem {
        SourceItem {
            tenant_id: tenant,
            source: Source::Gmail,
            external_id: external_id.to_string(),
            external_updated_at: "2025-01-15T12:00:00Z".parse().unwrap(),
            payload: serde_json::json!({ "id": external_id }),
            payload_hash: hash.to_string(),
        }
    }

    #[tokio::test]
    async fn upsert_gate_matches_hash_semantics() {
        let store = MemoryStore::new();
        let tenant = Uuid::new_v4();

        assert!(store
            .upsert_if_changed(item(tenant, "msg-1", "a"))
            .await
            .unwrap()
            .changed);
        assert!(!store
            .upsert_if_changed(item(tenant, "msg-1", "a"))
            .await
            .unwrap()
            .changed);
        assert!(store
            .upsert_if_changed(item(tenant, "msg-1", "b"))
            .await
            .unwrap()
            .changed);

        let coverage = store.coverage(tenant).await.unwrap();
        assert_eq!(coverage.source_items, 1);
    }

    #[tokio::test]
    async fn contacts_dedupe_on_email_case() {
        let store = MemoryStore::new();
        let tenant = Uuid::new_v4();

        let a = store
            .resolve_contact(tenant, "Alex@Example.com", "Alex")
            .await
            .unwrap();
        let b = store
            .resolve_contact(tenant, "alex@example.com", "Alexander")
            .await
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(store.coverage(tenant).await.unwrap().contacts, 1);
    }

    #[tokio::test]
    async fn runs_list_newest_first_per_tenant() {
        let store = MemoryStore::new();
        let tenant = Uuid::new_v4();
        let other = Uuid::new_v4();

        let first = store
            .create_run(SyncRun::queued(tenant, SyncKind::Backfill))
            .await
            .unwrap();
        store
            .create_run(SyncRun::queued(other, SyncKind::Daily))
            .await
            .unwrap();
        let second = store
            .create_run(SyncRun::queued(tenant, SyncKind::Daily))
            .await
            .unwrap();

        let runs = store.list_runs(tenant).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, second.id);
        assert_eq!(runs[1].id, first.id);
    }

    #[tokio::test]
    async fn terminal_run_ignores_later_transitions() {
        let store = MemoryStore::new();
        let tenant = Uuid::new_v4();
        let run = store
            .create_run(SyncRun::queued(tenant, SyncKind::Backfill))
            .await
            .unwrap();

        store.mark_failed(run.id, "boom").await.unwrap();
        store.mark_completed(run.id).await.unwrap();

        let runs = store.list_runs(tenant).await.unwrap();
        assert_eq!(runs[0].status, SyncStatus::Failed);
        assert_eq!(runs[0].error_summary.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn checkpoints_keyed_by_tenant_and_kind() {
        let store = MemoryStore::new();
        let tenant = Uuid::new_v4();
        let end: DateTime<Utc> = "2025-02-01T00:00:00Z".parse().unwrap();

        store
            .set_checkpoint(tenant, SyncKind::Backfill, end)
            .await
            .unwrap();

        assert_eq!(
            store.get_checkpoint(tenant, SyncKind::Backfill).await.unwrap(),
            Some(end)
        );
        assert_eq!(
            store.get_checkpoint(tenant, SyncKind::Daily).await.unwrap(),
            None
        );
        assert_eq!(
            store
                .get_checkpoint(Uuid::new_v4(), SyncKind::Backfill)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn interactions_append_only() {
        let store = MemoryStore::new();
        let tenant = Uuid::new_v4();
        let contact = store
            .resolve_contact(tenant, "sam@example.com", "Sam")
            .await
            .unwrap();

        for n in 0..3 {
            store
                .append_interaction(Interaction {
                    id: Uuid::new_v4(),
                    tenant_id: tenant,
                    contact_id: contact,
                    kind: InteractionKind::Meeting,
                    occurred_at: "2025-01-16T09:00:00Z".parse().unwrap(),
                    subject: format!("Project sync {n}"),
                    snippet: String::new(),
                })
                .await
                .unwrap();
        }

        assert_eq!(store.coverage(tenant).await.unwrap().interactions, 3);
    }
}
