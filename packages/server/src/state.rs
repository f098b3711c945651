use std::sync::Arc;

use sea_orm::DatabaseConnection;
use storage::{GarbageCollector, UploadPipeline};

use crate::config::AppConfig;
use crate::records::SeaOrmRecordStore;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub pipeline: Arc<UploadPipeline>,
    pub gc: Arc<GarbageCollector>,
    pub records: SeaOrmRecordStore,
}
