use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_addr: String,

    // Portal
    pub start_url: String,
    pub portal_username: Option<String>,
    pub portal_password: Option<String>,
    pub storage_state_path: String,
    pub persist_session: bool,

    // Browser
    pub webdriver_url: String,
    pub headless: bool,
    pub proxy_url: Option<String>,
    pub user_agent: String,
    pub accept_language: String,

    // Timeouts
    pub nav_timeout_ms: u64,
    pub idle_wait_ms: u64,
    pub login_timeout_ms: u64,
    pub download_timeout_ms: u64,

    // Storage
    pub download_dir: String,
    pub cache_dir: String,
    pub database_url: String,

    // HTTP surface
    pub allow_origins: Vec<String>,
    pub api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        Ok(Config {
            http_addr: env::var("HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),

            start_url: env::var("EDIS_START_URL").unwrap_or_else(|_| {
                "https://private.e-distribuzione.it/PortaleClienti/s/curvedicarico".to_string()
            }),
            portal_username: env::var("EDIS_USERNAME").ok().filter(|s| !s.is_empty()),
            portal_password: env::var("EDIS_PASSWORD").ok().filter(|s| !s.is_empty()),
            storage_state_path: env::var("STORAGE_STATE")
                .unwrap_or_else(|_| "./storage_state.json".to_string()),
            persist_session: env::var("PERSIST_SESSION")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),

            webdriver_url: env::var("WEBDRIVER_URL")
                .unwrap_or_else(|_| "http://localhost:9515".to_string()),
            headless: env::var("HEADLESS")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            proxy_url: env::var("PROXY_URL").ok().filter(|s| !s.is_empty()),
            user_agent: env::var("USER_AGENT").unwrap_or_else(|_| {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36".to_string()
            }),
            accept_language: env::var("ACCEPT_LANGUAGE")
                .unwrap_or_else(|_| "it-IT,it;q=0.9,en;q=0.5".to_string()),

            nav_timeout_ms: env::var("NAV_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60000),
            idle_wait_ms: env::var("IDLE_WAIT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4000),
            login_timeout_ms: env::var("LOGIN_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(45000),
            download_timeout_ms: env::var("DOWNLOAD_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30000),

            download_dir: env::var("DOWNLOAD_DIR").unwrap_or_else(|_| "./downloads".to_string()),
            cache_dir: env::var("CACHE_DIR").unwrap_or_else(|_| "./cache".to_string()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://data.sqlite?mode=rwc".to_string()),

            allow_origins: env::var("ALLOW_ORIGINS")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            api_key: env::var("API_KEY").ok().filter(|s| !s.is_empty()),
        })
    }
}
