use std::sync::Arc;

use chrono::{Duration, Utc};

use relata_config::{init_tracing, AppConfig, ConnectorMode, StoreMode};
use relata_db::crm::pg_repository::PgCrmRepository;
use relata_db::memory::MemoryStore;
use relata_db::sync::models::SyncKind;
use relata_db::sync::pg_repository::PgSyncRepository;
use relata_ingest::connector::{Connector, MockConnector};
use relata_ingest::engine::{SyncEngine, SyncStores};
use relata_ingest::google::client::{GoogleClient, GoogleClientConfig};
use relata_ingest::google::connector::GoogleConnector;
use relata_ingest::google::token::StaticTokenProvider;
use relata_ingest::metrics::SyncMetrics;

#[tokio::main]
async fn main() {
    init_tracing("info");

    let config = AppConfig::from_env().expect("failed to load config");
    tracing::info!(service = "relata-ingest", "starting");

    let stores = match config.store_mode {
        StoreMode::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .expect("DATABASE_URL presence checked at config load");
            let pool = relata_db::create_pool(url)
                .await
                .expect("failed to connect to database");
            let sync_repo = PgSyncRepository::new(pool.clone());
            let crm_repo = PgCrmRepository::new(pool);
            SyncStores {
                runs: Arc::new(sync_repo.clone()),
                checkpoints: Arc::new(sync_repo),
                items: Arc::new(crm_repo.clone()),
                contacts: Arc::new(crm_repo.clone()),
                interactions: Arc::new(crm_repo),
            }
        }
        StoreMode::Memory => {
            tracing::info!("running against the in-memory store");
            SyncStores::from_store(MemoryStore::new())
        }
    };

    let connector: Arc<dyn Connector> = match config.connector_mode {
        ConnectorMode::Mock => {
            tracing::info!("using mock google connector");
            Arc::new(MockConnector::new())
        }
        ConnectorMode::Google => {
            let google_config = GoogleClientConfig::from_env()
                .unwrap_or_else(|e| panic!("google configuration error (fail-fast): {e}"))
                .expect("GOOGLE_AUTH_MODE=real requires GOOGLE_ACCESS_TOKEN");
            let tokens = Arc::new(
                StaticTokenProvider::new(google_config.access_token.clone())
                    .expect("access token validated by config load"),
            );
            let client =
                GoogleClient::new(google_config).expect("failed to create google client");
            Arc::new(GoogleConnector::new(client, tokens))
        }
    };

    let metrics = Arc::new(SyncMetrics::new());
    let engine = SyncEngine::new(connector, stores, metrics);

    let kind = match std::env::args().nth(1).as_deref() {
        Some("daily") => SyncKind::Daily,
        _ => SyncKind::Backfill,
    };
    let end = Utc::now();
    let start = match kind {
        SyncKind::Daily => end - Duration::hours(24),
        SyncKind::Backfill => end - Duration::days(365),
    };

    tracing::info!(
        tenant = %config.default_tenant_id,
        kind = kind.as_str(),
        %start,
        %end,
        "starting sync"
    );

    match engine
        .run_sync(config.default_tenant_id, kind, start, end)
        .await
    {
        Ok(run_id) => {
            tracing::info!(%run_id, kind = kind.as_str(), "sync completed");
        }
        Err(e) => {
            tracing::error!(error = %e, kind = kind.as_str(), "sync failed");
            std::process::exit(1);
        }
    }
}
