use std::sync::Arc;

use crate::application::ports::{JobRepository, ObjectStoreGateway};
use crate::application::services::UploadOrchestrator;
use crate::presentation::config::Settings;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<UploadOrchestrator>,
    pub job_repository: Arc<dyn JobRepository>,
    pub gateway: Arc<dyn ObjectStoreGateway>,
    pub settings: Settings,
}
