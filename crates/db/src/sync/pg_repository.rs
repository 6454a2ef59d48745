use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::sync::models::{SyncKind, SyncRun, SyncStatus};
use crate::sync::repositories::{CheckpointRepository, SyncRunRepository};
use relata_common::error::{RelataError, RelataResult};

#[derive(Clone)]
pub struct PgSyncRepository {
    pool: PgPool,
}

impl PgSyncRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_run_row(row: PgRow) -> RelataResult<SyncRun> {
        let kind_raw: String = row.get("kind");
        let status_raw: String = row.get("status");

        Ok(SyncRun {
            id: row.get("id"),
            tenant_id: row.get("tenant_id"),
            kind: SyncKind::from_str(&kind_raw).map_err(RelataError::Internal)?,
            status: SyncStatus::from_str(&status_raw).map_err(RelataError::Internal)?,
            started_at: row.get("started_at"),
            finished_at: row.get("finished_at"),
            error_summary: row.get("error_summary"),
        })
    }
}

#[async_trait]
impl SyncRunRepository for PgSyncRepository {
    async fn create_run(&self, run: SyncRun) -> RelataResult<SyncRun> {
        sqlx::query(
            "insert into sync_runs (id, tenant_id, kind, status, started_at)
             values ($1, $2, $3, $4, $5)",
        )
        .bind(run.id)
        .bind(run.tenant_id)
        .bind(run.kind.as_str())
        .bind(run.status.as_str())
        .bind(run.started_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RelataError::Database(e.to_string()))?;

        Ok(run)
    }

    async fn mark_running(&self, id: Uuid) -> RelataResult<()> {
        sqlx::query(
            "update sync_runs set status = 'running'
             where id = $1 and status not in ('completed', 'failed')",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| RelataError::Database(e.to_string()))?;

        Ok(())
    }

    async fn mark_completed(&self, id: Uuid) -> RelataResult<()> {
        sqlx::query(
            "update sync_runs set status = 'completed', finished_at = $1
             where id = $2 and status not in ('completed', 'failed')",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| RelataError::Database(e.to_string()))?;

        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error_summary: &str) -> RelataResult<()> {
        sqlx::query(
            "update sync_runs set status = 'failed', finished_at = $1, error_summary = $2
             where id = $3 and status not in ('completed', 'failed')",
        )
        .bind(Utc::now())
        .bind(error_summary)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| RelataError::Database(e.to_string()))?;

        Ok(())
    }

    async fn list_runs(&self, tenant_id: Uuid) -> RelataResult<Vec<SyncRun>> {
        let rows = sqlx::query(
            "select id, tenant_id, kind, status, started_at, finished_at, error_summary
             from sync_runs
             where tenant_id = $1
             order by started_at desc
             limit 25",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RelataError::Database(e.to_string()))?;

        rows.into_iter().map(Self::map_run_row).collect()
    }
}

#[async_trait]
impl CheckpointRepository for PgSyncRepository {
    async fn get_checkpoint(
        &self,
        tenant_id: Uuid,
        kind: SyncKind,
    ) -> RelataResult<Option<DateTime<Utc>>> {
        let row = sqlx::query(
            "select last_completed_window_end from sync_checkpoints
             where tenant_id = $1 and kind = $2
             limit 1",
        )
        .bind(tenant_id)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RelataError::Database(e.to_string()))?;

        Ok(row.map(|r| r.get("last_completed_window_end")))
    }

    async fn set_checkpoint(
        &self,
        tenant_id: Uuid,
        kind: SyncKind,
        window_end: DateTime<Utc>,
    ) -> RelataResult<()> {
        sqlx::query(
            "insert into sync_checkpoints (tenant_id, kind, last_completed_window_end, updated_at)
             values ($1, $2, $3, $4)
             on conflict (tenant_id, kind)
             do update set last_completed_window_end = excluded.last_completed_window_end,
                           updated_at = excluded.updated_at",
        )
        .bind(tenant_id)
        .bind(kind.as_str())
        .bind(window_end)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| RelataError::Database(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_pool;

    async fn test_repo() -> Option<(PgSyncRepository, PgPool)> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let pool = create_pool(&url).await.expect("db should connect");

        sqlx::query(
            "create table if not exists sync_runs (
               id uuid primary key,
               tenant_id uuid not null,
               kind text not null,
               status text not null,
               started_at timestamptz not null default now(),
               finished_at timestamptz,
               error_summary text
             )",
        )
        .execute(&pool)
        .await
        .ok()?;

        sqlx::query(
            "create table if not exists sync_checkpoints (
               tenant_id uuid not null,
               kind text not null,
               last_completed_window_end timestamptz not null,
               updated_at timestamptz not null default now()
             )",
        )
        .execute(&pool)
        .await
        .ok()?;

        sqlx::query(
            "create unique index if not exists sync_checkpoints_tenant_kind_uidx
             on sync_checkpoints(tenant_id, kind)",
        )
        .execute(&pool)
        .await
        .ok()?;

        Some((PgSyncRepository::new(pool.clone()), pool))
    }

    #[tokio::test]
    async fn create_and_list_runs_most_recent_first() {
        let (repo, _pool) = match test_repo().await {
            Some(r) => r,
            None => return,
        };
        let tenant = Uuid::new_v4();

        let first = repo
            .create_run(SyncRun::queued(tenant, SyncKind::Backfill))
            .await
            .expect("create first");
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let second = repo
            .create_run(SyncRun::queued(tenant, SyncKind::Daily))
            .await
            .expect("create second");

        let runs = repo.list_runs(tenant).await.expect("list");
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, second.id);
        assert_eq!(runs[1].id, first.id);
    }

    #[tokio::test]
    async fn mark_failed_records_summary_and_finish_time() {
        let (repo, _pool) = match test_repo().await {
            Some(r) => r,
            None => return,
        };
        let tenant = Uuid::new_v4();
        let run = repo
            .create_run(SyncRun::queued(tenant, SyncKind::Backfill))
            .await
            .expect("create");

        repo.mark_running(run.id).await.expect("running");
        repo.mark_failed(run.id, "connector timeout")
            .await
            .expect("failed");

        let runs = repo.list_runs(tenant).await.expect("list");
        assert_eq!(runs[0].status, SyncStatus::Failed);
        assert_eq!(runs[0].error_summary.as_deref(), Some("connector timeout"));
        assert!(runs[0].finished_at.is_some());
    }

    #[tokio::test]
    async fn terminal_runs_are_immutable() {
        let (repo, _pool) = match test_repo().await {
            Some(r) => r,
            None => return,
        };
        let tenant = Uuid::new_v4();
        let run = repo
            .create_run(SyncRun::queued(tenant, SyncKind::Daily))
            .await
            .expect("create");

        repo.mark_completed(run.id).await.expect("complete");
        repo.mark_failed(run.id, "late failure").await.expect("late");

        let runs = repo.list_runs(tenant).await.expect("list");
        assert_eq!(runs[0].status, SyncStatus::Completed);
        assert!(runs[0].error_summary.is_none());
    }

    #[tokio::test]
    async fn checkpoint_upsert_overwrites_previous_value() {
        let (repo, _pool) = match test_repo().await {
            Some(r) => r,
            None => return,
        };
        let tenant = Uuid::new_v4();

        assert!(repo
            .get_checkpoint(tenant, SyncKind::Backfill)
            .await
            .expect("get")
            .is_none());

        let first: DateTime<Utc> = "2025-02-01T00:00:00Z".parse().unwrap();
        let second: DateTime<Utc> = "2025-03-01T00:00:00Z".parse().unwrap();

        repo.set_checkpoint(tenant, SyncKind::Backfill, first)
            .await
            .expect("set first");
        repo.set_checkpoint(tenant, SyncKind::Backfill, second)
            .await
            .expect("set second");

        let stored = repo
            .get_checkpoint(tenant, SyncKind::Backfill)
            .await
            .expect("get")
            .expect("should exist");
        assert_eq!(stored, second);
    }

    #[tokio::test]
    async fn checkpoints_are_scoped_per_kind() {
        let (repo, _pool) = match test_repo().await {
            Some(r) => r,
            None => return,
        };
        let tenant = Uuid::new_v4();
        let end: DateTime<Utc> = "2025-02-01T00:00:00Z".parse().unwrap();

        repo.set_checkpoint(tenant, SyncKind::Backfill, end)
            .await
            .expect("set");

        assert!(repo
            .get_checkpoint(tenant, SyncKind::Daily)
            .await
            .expect("get")
            .is_none());
    }
}
