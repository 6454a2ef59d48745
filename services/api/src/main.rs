mod error;
mod ingestion;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use relata_common::types::ServiceInfo;
use relata_config::{init_tracing, AppConfig, ConnectorMode, StoreMode};
use relata_db::crm::pg_repository::PgCrmRepository;
use relata_db::crm::repositories::CoverageRepository;
use relata_db::memory::MemoryStore;
use relata_db::sync::pg_repository::PgSyncRepository;
use relata_db::sync::repositories::SyncRunRepository;
use relata_ingest::connector::{Connector, MockConnector};
use relata_ingest::engine::{SyncEngine, SyncStores};
use relata_ingest::google::client::{GoogleClient, GoogleClientConfig};
use relata_ingest::google::connector::GoogleConnector;
use relata_ingest::google::token::StaticTokenProvider;
use relata_ingest::metrics::{MetricsSnapshot, SyncMetrics};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SyncEngine>,
    pub runs: Arc<dyn SyncRunRepository>,
    pub coverage: Arc<dyn CoverageRepository>,
    pub metrics: Arc<SyncMetrics>,
    pub default_tenant_id: Uuid,
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn info() -> Json<ServiceInfo> {
    Json(ServiceInfo::new("relata-api"))
}

fn render_prometheus(snapshot: &MetricsSnapshot) -> String {
    let mut body = String::from(
        "# HELP relata_up Service up indicator\n\
         # TYPE relata_up gauge\n\
         relata_up 1\n\
         # HELP relata_sync_runs_total Run status transitions by kind and status\n\
         # TYPE relata_sync_runs_total counter\n",
    );

    for (key, value) in &snapshot.run_status_counts {
        if let Some((kind, status)) = key.split_once(':') {
            body.push_str(&format!(
                "relata_sync_runs_total{{kind=\"{kind}\",status=\"{status}\"}} {value}\n"
            ));
        }
    }

    body.push_str(
        "# HELP relata_sync_failed_runs_total Failed runs by kind\n\
         # TYPE relata_sync_failed_runs_total counter\n",
    );
    for (kind, value) in &snapshot.failed_runs {
        body.push_str(&format!(
            "relata_sync_failed_runs_total{{kind=\"{kind}\"}} {value}\n"
        ));
    }

    body.push_str(
        "# HELP relata_sync_lag_ms Most recent processing lag by kind\n\
         # TYPE relata_sync_lag_ms gauge\n",
    );
    for (kind, value) in &snapshot.lag_ms {
        body.push_str(&format!("relata_sync_lag_ms{{kind=\"{kind}\"}} {value}\n"));
    }

    body
}

async fn metrics(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl IntoResponse {
    let body = render_prometheus(&state.metrics.snapshot());

    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        body,
    )
}

fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            "http://localhost:3000".parse::<HeaderValue>().unwrap(),
            "http://127.0.0.1:3000".parse::<HeaderValue>().unwrap(),
        ])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
        .route("/metrics", get(metrics))
        .merge(ingestion::router())
        .layer(cors)
        .with_state(state)
}

fn build_state(
    config: &AppConfig,
    stores: SyncStores,
    runs: Arc<dyn SyncRunRepository>,
    coverage: Arc<dyn CoverageRepository>,
    connector: Arc<dyn Connector>,
) -> AppState {
    let metrics = Arc::new(SyncMetrics::new());
    let engine = Arc::new(SyncEngine::new(connector, stores, metrics.clone()));

    AppState {
        engine,
        runs,
        coverage,
        metrics,
        default_tenant_id: config.default_tenant_id,
    }
}

#[tokio::main]
async fn main() {
    init_tracing("info");

    let config = AppConfig::from_env().expect("failed to load config");
    tracing::info!(service = "relata-api", "starting");

    let (stores, runs, coverage): (
        SyncStores,
        Arc<dyn SyncRunRepository>,
        Arc<dyn CoverageRepository>,
    ) = match config.store_mode {
        StoreMode::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .expect("DATABASE_URL presence checked at config load");
            let pool = relata_db::create_pool(url)
                .await
                .expect("failed to create database pool");
            let sync_repo = PgSyncRepository::new(pool.clone());
            let crm_repo = PgCrmRepository::new(pool);
            let stores = SyncStores {
                runs: Arc::new(sync_repo.clone()),
                checkpoints: Arc::new(sync_repo.clone()),
                items: Arc::new(crm_repo.clone()),
                contacts: Arc::new(crm_repo.clone()),
                interactions: Arc::new(crm_repo.clone()),
            };
            (stores, Arc::new(sync_repo), Arc::new(crm_repo))
        }
        StoreMode::Memory => {
            tracing::info!("running against the in-memory store");
            let store = MemoryStore::new();
            (
                SyncStores::from_store(store.clone()),
                Arc::new(store.clone()),
                Arc::new(store),
            )
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

    let state = build_state(&config, stores, runs, coverage, connector);
    let app = build_router(state);
    let addr: SocketAddr = config.bind_addr().parse().expect("invalid bind address");

    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app).await.expect("server error");
}
