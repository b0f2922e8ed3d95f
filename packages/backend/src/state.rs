use std::sync::Arc;
use std::time::{Instant, SystemTime};

use sqlx::SqlitePool;

use crate::config::{Config, EngineConfig};
use crate::db::DatabaseProxy;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    db_proxy: Arc<DatabaseProxy>,
    config: Arc<Config>,
}

impl AppState {
    pub fn new(db_proxy: Arc<DatabaseProxy>, config: Config) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            db_proxy,
            config: Arc::new(config),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn db_proxy(&self) -> Arc<DatabaseProxy> {
        Arc::clone(&self.db_proxy)
    }

    pub fn pool(&self) -> &SqlitePool {
        self.db_proxy.pool()
    }

    pub fn engine(&self) -> &EngineConfig {
        &self.config.engine
    }
}
