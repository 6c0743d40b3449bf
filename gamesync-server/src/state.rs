//! Application State
//!
//! Shared handle over the sync engine for the REST API and background tasks.

use std::sync::Arc;
use std::time::Instant;

use gamesync_core::SyncEngine;

#[derive(Clone)]
pub struct AppState {
    pub(crate) inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub engine: Arc<SyncEngine>,
    pub instance_id: String,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        let instance_id = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string());
        let instance_id = format!("{}-{}", instance_id, std::process::id());

        Self { inner: Arc::new(AppStateInner { engine, instance_id, started_at: Instant::now() }) }
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.inner.engine
    }

    pub fn instance_id(&self) -> &str {
        &self.inner.instance_id
    }

    pub fn uptime_secs(&self) -> u64 {
        self.inner.started_at.elapsed().as_secs()
    }
}
