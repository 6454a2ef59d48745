use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::crm::models::{Coverage, Interaction, ItemUpsert, SourceItem};
use crate::crm::repositories::{
    ContactRepository, CoverageRepository, InteractionRepository, SourceItemRepository,
};
use relata_common::error::{RelataError, RelataResult};

#[derive(Clone)]
pub struct PgCrmRepository {
    pool: PgPool,
}

impl PgCrmRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SourceItemRepository for PgCrmRepository {
    async fn upsert_if_changed(&self, item: SourceItem) -> RelataResult<ItemUpsert> {
        let previous = sqlx::query(
            "select payload_hash from source_items
             where tenant_id = $1 and source = $2 and external_id = $3
             limit 1",
        )
        .bind(item.tenant_id)
        .bind(item.source.as_str())
        .bind(&item.external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RelataError::Database(e.to_string()))?;

        if let Some(row) = previous {
            let stored: String = row.get("payload_hash");
            if stored == item.payload_hash {
                return Ok(ItemUpsert { changed: false });
            }
        }

        sqlx::query(
            "insert into source_items
               (tenant_id, source, external_id, external_updated_at, payload, payload_hash, ingested_at)
             values ($1, $2, $3, $4, $5, $6, $7)
             on conflict (tenant_id, source, external_id)
             do update set external_updated_at = excluded.external_updated_at,
                           payload = excluded.payload,
                           payload_hash = excluded.payload_hash,
                           ingested_at = excluded.ingested_at",
        )
        .bind(item.tenant_id)
        .bind(item.source.as_str())
        .bind(&item.external_id)
        .bind(item.external_updated_at)
        .bind(&item.payload)
        .bind(&item.payload_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| RelataError::Database(e.to_string()))?;

        Ok(ItemUpsert { changed: true })
    }
}

#[async_trait]
impl ContactRepository for PgCrmRepository {
    async fn resolve_contact(
        &self,
        tenant_id: Uuid,
        email: &str,
        name: &str,
    ) -> RelataResult<Uuid> {
        let existing = sqlx::query(
            "select id from contacts
             where tenant_id = $1 and lower(email) = lower($2)
             limit 1",
        )
        .bind(tenant_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RelataError::Database(e.to_string()))?;

        if let Some(row) = existing {
            return Ok(row.get("id"));
        }

        let id = Uuid::new_v4();
        sqlx::query(
            "insert into contacts (id, tenant_id, email, name, created_at)
             values ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(email)
        .bind(name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| RelataError::Database(e.to_string()))?;

        Ok(id)
    }
}

#[async_trait]
impl InteractionRepository for PgCrmRepository {
    async fn append_interaction(&self, interaction: Interaction) -> RelataResult<()> {
        sqlx::query(
            "insert into interactions
               (id, tenant_id, contact_id, kind, occurred_at, subject, snippet)
             values ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(interaction.id)
        .bind(interaction.tenant_id)
        .bind(interaction.contact_id)
        .bind(interaction.kind.as_str())
        .bind(interaction.occurred_at)
        .bind(&interaction.subject)
        .bind(&interaction.snippet)
        .execute(&self.pool)
        .await
        .map_err(|e| RelataError::Database(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl CoverageRepository for PgCrmRepository {
    async fn coverage(&self, tenant_id: Uuid) -> RelataResult<Coverage> {
        let contacts =
            sqlx::query_scalar::<_, i64>("select count(*) from contacts where tenant_id = $1")
                .bind(tenant_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| RelataError::Database(e.to_string()))?;

        let interactions =
            sqlx::query_scalar::<_, i64>("select count(*) from interactions where tenant_id = $1")
                .bind(tenant_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| RelataError::Database(e.to_string()))?;

        let source_items =
            sqlx::query_scalar::<_, i64>("select count(*) from source_items where tenant_id = $1")
                .bind(tenant_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| RelataError::Database(e.to_string()))?;

        Ok(Coverage {
            contacts,
            interactions,
            source_items,
        })
    }
}
