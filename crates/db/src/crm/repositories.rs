use async_trait::async_trait;
use uuid::Uuid;

use crate::crm::models::{Coverage, Interaction, ItemUpsert, SourceItem};
use relata_common::error::RelataResult;

/// Upsert-if-changed store for raw provider items.
#[async_trait]
pub trait SourceItemRepository: Send + Sync {
    /// No row for the key: insert, changed. Row with an equal hash: leave
    /// untouched, not changed. Row with a different hash: overwrite, changed.
    async fn upsert_if_changed(&self, item: SourceItem) -> RelataResult<ItemUpsert>;
}

/// Deduplicates people by case-insensitive email per tenant.
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Returns the stable contact id for the email, creating the contact on
    /// first sight. A later call with a different name does NOT rename the
    /// existing contact (known limitation, kept on purpose).
    async fn resolve_contact(&self, tenant_id: Uuid, email: &str, name: &str)
        -> RelataResult<Uuid>;
}

#[async_trait]
pub trait InteractionRepository: Send + Sync {
    async fn append_interaction(&self, interaction: Interaction) -> RelataResult<()>;
}

#[async_trait]
pub trait CoverageRepository: Send + Sync {
    async fn coverage(&self, tenant_id: Uuid) -> RelataResult<Coverage>;
}
