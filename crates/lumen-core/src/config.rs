use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    pub geoip_path: String,
    pub cors_origins: Vec<String>,
    pub duckdb_memory_limit: String,
    /// Row-buffer flush cadence for the background task.
    pub buffer_flush_interval_ms: u64,
    /// Rows buffered before an immediate background flush is triggered.
    pub buffer_max_size: usize,
    /// Hard cap on buffered rows; rows beyond it are dropped, not queued.
    pub buffer_hard_cap: usize,
    /// Upper bound on one store insert; a slower store counts as failed.
    pub insert_timeout_ms: u64,
    /// Ingestion admissions per site per window.
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
    pub rate_limit_sweep_secs: u64,
    /// Per-topic capacity of the live broadcast bus.
    pub live_channel_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            port: std::env::var("LUMEN_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            data_dir: std::env::var("LUMEN_DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            geoip_path: std::env::var("LUMEN_GEOIP_PATH")
                .unwrap_or_else(|_| "./GeoLite2-City.mmdb".to_string()),
            cors_origins: std::env::var("LUMEN_CORS_ORIGINS")
                .map(|v| v.split(',').map(str::to_string).collect())
                .unwrap_or_default(),
            duckdb_memory_limit: std::env::var("LUMEN_DUCKDB_MEMORY")
                .unwrap_or_else(|_| "1GB".to_string()),
            buffer_flush_interval_ms: env_u64("LUMEN_FLUSH_INTERVAL_MS", 1000),
            buffer_max_size: env_u64("LUMEN_BUFFER_MAX", 1000) as usize,
            buffer_hard_cap: env_u64("LUMEN_BUFFER_HARD_CAP", 50_000) as usize,
            insert_timeout_ms: env_u64("LUMEN_INSERT_TIMEOUT_MS", 5000),
            rate_limit_max: env_u64("LUMEN_RATE_LIMIT_MAX", 200) as u32,
            rate_limit_window_secs: env_u64("LUMEN_RATE_LIMIT_WINDOW_SECS", 60),
            rate_limit_sweep_secs: env_u64("LUMEN_RATE_LIMIT_SWEEP_SECS", 300),
            live_channel_capacity: env_u64("LUMEN_LIVE_CAPACITY", 64) as usize,
        })
    }

    pub fn buffer_flush_interval(&self) -> Duration {
        Duration::from_millis(self.buffer_flush_interval_ms)
    }

    pub fn insert_timeout(&self) -> Duration {
        Duration::from_millis(self.insert_timeout_ms)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn rate_limit_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.rate_limit_sweep_secs)
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
