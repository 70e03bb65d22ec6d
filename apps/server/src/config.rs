use std::{net::SocketAddr, time::Duration};

pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub naver_client_id: Option<String>,
    pub naver_client_secret: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let listen_addr: SocketAddr = std::env::var("SS_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .expect("Invalid SS_LISTEN_ADDR");
        let db_path = std::env::var("SS_DB_PATH").unwrap_or_else(|_| "./db/cache.db".into());
        let cors_allow = std::env::var("SS_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let timeout_ms: u64 = std::env::var("SS_REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|_| "30000".into())
            .parse()
            .unwrap_or(30000);
        Self {
            listen_addr,
            db_path,
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
            gemini_api_key: std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
            gemini_model: std::env::var("SS_GEMINI_MODEL").ok(),
            naver_client_id: std::env::var("NAVER_CLIENT_ID").ok().filter(|k| !k.is_empty()),
            naver_client_secret: std::env::var("NAVER_CLIENT_SECRET")
                .ok()
                .filter(|k| !k.is_empty()),
        }
    }
}
