pub mod aoi;
pub mod auth;
pub mod common;
pub mod dip;
pub mod files;
pub mod production;
pub mod reference;
pub mod statistics;

use crate::{
    config::AppConfig,
    db::DbPool,
    services::{
        aoi::AoiService, auth::AuthService, dip::DipService, model_files::ModelFileService,
        production::ScheduleService, reference::ReferenceService, statistics::StatisticsService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub schedules: Arc<ScheduleService>,
    pub statistics: Arc<StatisticsService>,
    pub dip: Arc<DipService>,
    pub aoi: Arc<AoiService>,
    pub reference: Arc<ReferenceService>,
    pub files: Arc<ModelFileService>,
    pub auth: Arc<AuthService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig) -> Self {
        Self {
            schedules: Arc::new(ScheduleService::new(db_pool.clone())),
            statistics: Arc::new(StatisticsService::new(db_pool.clone())),
            dip: Arc::new(DipService::new(db_pool.clone())),
            aoi: Arc::new(AoiService::new(db_pool.clone())),
            reference: Arc::new(ReferenceService::new(
                db_pool.clone(),
                config.upload_dir.clone(),
            )),
            files: Arc::new(ModelFileService::new(
                db_pool.clone(),
                config.upload_dir.clone(),
            )),
            auth: Arc::new(AuthService::new(
                db_pool,
                config.jwt_secret.clone(),
                config.jwt_expiration,
            )),
        }
    }
}
