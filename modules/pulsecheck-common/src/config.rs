use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Remote services
    pub nlp_api_key: String,
    pub feed_token: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,

    // Worker
    pub poll_interval_secs: u64,
}

impl Config {
    /// Load the full worker configuration. Panics with a clear message if
    /// required vars are missing.
    pub fn worker_from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            nlp_api_key: required_env("NLP_API_KEY"),
            feed_token: required_env("FEED_API_TOKEN"),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: web_port(),
            poll_interval_secs: env::var("POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .expect("POLL_INTERVAL_SECS must be a number"),
        }
    }

    /// Load a minimal config for the API server (no NLP key needed — the
    /// front end never classifies, it only reads summaries and enqueues).
    pub fn api_from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            nlp_api_key: String::new(),
            feed_token: required_env("FEED_API_TOKEN"),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: web_port(),
            poll_interval_secs: 0,
        }
    }
}

fn web_port() -> u16 {
    env::var("WEB_PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .expect("WEB_PORT must be a number")
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
