use async_trait::async_trait;
use uuid::Uuid;

use relata_common::error::{RelataError, RelataResult};

/// Capability that yields a valid Google access credential for a tenant.
/// The OAuth exchange/refresh flow behind it is an external collaborator;
/// the sync core only ever sees the resulting bearer token.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self, tenant_id: Uuid) -> RelataResult<String>;
}

/// Serves one pre-issued token for every tenant. Enough for single-tenant
/// deployments and for tests; a refreshing provider plugs in behind the
/// same trait.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> RelataResult<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(RelataError::Config(
                "access token must not be empty".to_string(),
            ));
        }
        Ok(Self { token })
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self, _tenant_id: Uuid) -> RelataResult<String> {
        Ok(self.token.clone())
    }
}
