use std::sync::Arc;

use crate::config::FactsheetConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<FactsheetConfig>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(config: FactsheetConfig, max_upload_bytes: usize) -> Self {
        Self {
            config: Arc::new(config),
            max_upload_bytes,
        }
    }
}
