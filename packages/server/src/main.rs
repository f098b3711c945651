use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::time::MissedTickBehavior;
use tracing::{Level, error, info};

use server::config::AppConfig;
use server::database::init_db;
use server::records::SeaOrmRecordStore;
use server::state::AppState;
use storage::{
    BlobAdapter, FilesystemObjectStore, GarbageCollector, SweepError, UploadPipeline,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = Arc::new(AppConfig::load()?);

    let db = init_db(&config.database.url).await?;

    let store = Arc::new(FilesystemObjectStore::new(PathBuf::from(&config.storage.data_dir)).await?);
    let adapter = BlobAdapter::with_threshold(store.clone(), config.storage.inline_threshold);
    let pipeline = Arc::new(UploadPipeline::with_max_size(
        adapter,
        config.storage.max_upload_size,
    ));
    let gc = Arc::new(GarbageCollector::new(store, config.storage.gc_grace()));
    let records = SeaOrmRecordStore::new(db.clone());

    let state = AppState {
        db,
        config: config.clone(),
        pipeline,
        gc,
        records,
    };

    spawn_sweep_task(state.clone());

    let app = server::build_router(state).layer(server::cors_layer(&config.server.cors));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Run both sweeps on a fixed interval. Manual sweeps through the API share
/// the same lock, so an overlap just skips a pass.
fn spawn_sweep_task(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(state.config.storage.gc_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            match state.gc.sweep_chunked(&state.records).await {
                Ok(report) => info!(
                    removed = report.removed.len(),
                    skipped = report.skipped_recent.len(),
                    failures = report.failures.len(),
                    "scheduled object sweep done"
                ),
                Err(SweepError::InProgress) => {
                    info!("object sweep skipped, another sweep is running")
                }
                Err(err) => error!(error = %err, "scheduled object sweep failed"),
            }

            let legacy_dir = PathBuf::from(&state.config.storage.legacy_uploads_dir);
            match state.gc.sweep_legacy(&state.records, &legacy_dir).await {
                Ok(report) => info!(
                    removed = report.removed.len(),
                    skipped = report.skipped_recent.len(),
                    failures = report.failures.len(),
                    "scheduled legacy sweep done"
                ),
                Err(SweepError::InProgress) => {
                    info!("legacy sweep skipped, another sweep is running")
                }
                Err(err) => error!(error = %err, "scheduled legacy sweep failed"),
            }
        }
    });
}
