pub mod files;
pub mod generation;
pub mod media;
pub mod profiles;
pub mod quizzes;

use crate::db::DbConnection;
use crate::gateway::GenerationGateway;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: DbConnection,
    pub gateway: Arc<dyn GenerationGateway>,
    pub media_dir: PathBuf,
}
