use crate::config::Config;
use crate::db::DbPool;
use crate::services::CsvCache;
use std::sync::Arc;
use std::time::SystemTime;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: DbPool,
    pub cache: Arc<CsvCache>,
    pub start_time: SystemTime,
}

impl AppState {
    pub fn new(config: Config, db_pool: DbPool) -> Self {
        let cache = Arc::new(CsvCache::new(&config.cache_dir));
        Self {
            config: Arc::new(config),
            db_pool,
            cache,
            start_time: SystemTime::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.start_time)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}
