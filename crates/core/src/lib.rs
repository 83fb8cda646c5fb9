pub mod basket;
pub mod news;
pub mod quotes;

pub mod config {
    use std::path::PathBuf;

    const DEFAULT_SNAPSHOT_PATH: &str = "data/sp100_live_data.json";
    const DEFAULT_NEWS_DIR: &str = "data/reuters_news";
    const DEFAULT_QUOTE_API_BASE_URL: &str = "https://query2.finance.yahoo.com";
    const DEFAULT_CORS_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

    /// Everything the service is wired with at startup. No module-level
    /// state: the API binary builds its router and CORS policy from this.
    #[derive(Debug, Clone)]
    pub struct Settings {
        pub snapshot_path: PathBuf,
        pub news_dir: PathBuf,
        pub quote_api_base_url: String,
        pub cors_allowed_origins: Vec<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let snapshot_path = std::env::var("SP100_SNAPSHOT_PATH")
                .unwrap_or_else(|_| DEFAULT_SNAPSHOT_PATH.to_string());
            let news_dir =
                std::env::var("NEWS_DIR").unwrap_or_else(|_| DEFAULT_NEWS_DIR.to_string());
            let quote_api_base_url = std::env::var("QUOTE_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_QUOTE_API_BASE_URL.to_string());

            let origins = std::env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| DEFAULT_CORS_ALLOWED_ORIGINS.to_string());
            let cors_allowed_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();

            Ok(Self {
                snapshot_path: PathBuf::from(snapshot_path),
                news_dir: PathBuf::from(news_dir),
                quote_api_base_url,
                cors_allowed_origins,
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }
    }
}
