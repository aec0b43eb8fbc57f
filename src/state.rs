use std::sync::Arc;

use crate::{db::DBLayer, upstream::UpstreamClient};

/// Shared handles built once in `main` and handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DBLayer>,
    pub upstream: Arc<UpstreamClient>,
}

impl AppState {
    pub fn new(db: DBLayer, upstream: UpstreamClient) -> Self {
        Self {
            db: Arc::new(db),
            upstream: Arc::new(upstream),
        }
    }
}
