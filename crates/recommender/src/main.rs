//! Recommender Service
//!
//! Loads the factor snapshot, keeps it fresh, and exposes health and
//! readiness probes. Recommendation traffic goes through the library API.

use actix_web::{web, App, HttpResponse, HttpServer};
use anyhow::Context;
use movie_recommender::config::{FeedbackBackend, FeedbackConfig};
use movie_recommender::watcher::load_blocking;
use movie_recommender::{
    init_logging, Catalog, FeedbackCollector, FeedbackStore, InMemoryFeedbackStore,
    JsonLinesFeedbackStore, ModelHandle, MovieCatalog, PostgresFeedbackStore,
    RecommendationService, RecommenderConfig, SnapshotLoader, SnapshotWatcher,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

struct AppState {
    service: RecommendationService,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = RecommenderConfig::load()?;
    init_logging(&config.logging.level, config.logging.format)?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Starting Recommender Service on {}", bind_addr);

    let catalog: Arc<dyn Catalog> = match MovieCatalog::load(&config.model.catalog_path) {
        Ok(catalog) => Arc::new(catalog),
        Err(e) => {
            warn!(error = %e, "Catalog unavailable, explanations will use item ids");
            Arc::new(MovieCatalog::default())
        }
    };

    let feedback = FeedbackCollector::new(build_feedback_store(&config.feedback).await?);

    let loader = SnapshotLoader::new(&config.model.factors_path, &config.model.ratings_path);
    let handle = Arc::new(ModelHandle::empty());
    match load_blocking(&loader).await {
        Ok(model) => {
            handle.publish(model);
        }
        Err(e) => warn!(error = %e, "Initial snapshot load failed, serving unready"),
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let watcher_task = config.model.reload_interval().map(|interval| {
        let watcher = SnapshotWatcher::new(loader.clone(), handle.clone(), interval);
        tokio::spawn(watcher.run(shutdown_rx))
    });

    let service = RecommendationService::new(handle, catalog, feedback, config.engine.clone())
        .context("Invalid engine settings")?;
    let state = web::Data::new(AppState { service });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/health", web::get().to(health_check))
            .route("/ready", web::get().to(readiness_check))
    })
    .bind(&bind_addr)?
    .run()
    .await?;

    info!("Shutting down Recommender Service");
    let _ = shutdown_tx.send(true);
    if let Some(task) = watcher_task {
        task.await.context("Snapshot watcher panicked")?;
    }

    Ok(())
}

async fn build_feedback_store(config: &FeedbackConfig) -> anyhow::Result<Arc<dyn FeedbackStore>> {
    let store: Arc<dyn FeedbackStore> = match config.backend {
        FeedbackBackend::Jsonl => {
            if let Some(parent) = config.path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            Arc::new(JsonLinesFeedbackStore::new(&config.path))
        }
        FeedbackBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("feedback.database_url is required for the postgres backend")?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(std::time::Duration::from_secs(5))
                .connect(url)
                .await
                .context("Failed to connect to feedback database")?;
            let store = PostgresFeedbackStore::new(pool);
            store.ensure_schema().await?;
            Arc::new(store)
        }
        FeedbackBackend::Memory => Arc::new(InMemoryFeedbackStore::default()),
    };

    info!(backend = store.name(), "Explanation feedback store ready");
    Ok(store)
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "recommender-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn readiness_check(state: web::Data<AppState>) -> HttpResponse {
    let readiness = state.service.readiness();
    if readiness.ready {
        HttpResponse::Ok().json(readiness)
    } else {
        HttpResponse::ServiceUnavailable().json(readiness)
    }
}
