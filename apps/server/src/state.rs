use std::sync::Arc;

use recap_core::Pipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(pipeline: Pipeline, max_upload_bytes: usize) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            max_upload_bytes,
        }
    }
}
