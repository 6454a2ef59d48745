use relata_common::error::{RelataError, RelataResult};
use serde::Deserialize;
use std::env;
use uuid::Uuid;

/// Tenant every route and scheduled sync falls back to when none is given.
pub const DEFAULT_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorMode {
    Google,
    Mock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store_mode: StoreMode,
    pub database_url: Option<String>,
    pub connector_mode: ConnectorMode,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub default_tenant_id: Uuid,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Loads `.env` if present, then resolves every mode switch once.
    /// `DB_MODE=postgres` requires `DATABASE_URL`; `GOOGLE_AUTH_MODE`
    /// selects the real or mock connector. Nothing re-reads the
    /// environment after this returns.
    pub fn from_env() -> RelataResult<Self> {
        // Best-effort .env load; ignore if missing
        let _ = dotenvy::dotenv();

        let store_mode = match get_var_or("DB_MODE", "memory").as_str() {
            "postgres" => StoreMode::Postgres,
            "memory" | "mock" => StoreMode::Memory,
            other => {
                return Err(RelataError::Config(format!("invalid DB_MODE: {other}")));
            }
        };

        let database_url = env::var("DATABASE_URL").ok();
        if store_mode == StoreMode::Postgres && database_url.is_none() {
            return Err(RelataError::Config(
                "DATABASE_URL is required when DB_MODE=postgres".to_string(),
            ));
        }

        let connector_mode = match get_var_or("GOOGLE_AUTH_MODE", "mock").as_str() {
            "real" | "google" => ConnectorMode::Google,
            "mock" => ConnectorMode::Mock,
            other => {
                return Err(RelataError::Config(format!(
                    "invalid GOOGLE_AUTH_MODE: {other}"
                )));
            }
        };

        let default_tenant_id = get_var_or("DEFAULT_TENANT_ID", DEFAULT_TENANT_ID)
            .parse()
            .map_err(|e| RelataError::Config(format!("invalid DEFAULT_TENANT_ID: {e}")))?;

        Ok(Self {
            store_mode,
            database_url,
            connector_mode,
            host: get_var_or("HOST", "0.0.0.0"),
            port: get_var_or("PORT", "8080")
                .parse()
                .map_err(|e| RelataError::Config(format!("invalid PORT: {e}")))?,
            log_level: get_var_or("LOG_LEVEL", "info"),
            default_tenant_id,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn get_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}
