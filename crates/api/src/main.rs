use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sp100_core::config::Settings;
use sp100_core::news::{NewsError, NewsPage, MAX_PAGE_SIZE};
use sp100_core::quotes::{self, PricePoint, QuoteProvider, YahooChartClient};

const DEFAULT_PAGE: usize = 1;
const DEFAULT_PAGE_SIZE: usize = 20;
const TICKER_LOOKBACK_DAYS: u32 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let quotes: Arc<dyn QuoteProvider> = Arc::new(YahooChartClient::from_settings(&settings)?);
    let cors = cors_layer(&settings);
    let state = AppState { settings, quotes };

    let app = Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/sp100", get(get_sp100))
        .route("/news", get(get_news))
        .route("/ticker/:ticker", get(get_ticker_last_day))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[derive(Clone)]
struct AppState {
    settings: Settings,
    quotes: Arc<dyn QuoteProvider>,
}

/// Allow-list CORS from explicit startup configuration. Methods and headers
/// mirror the request; credentials are allowed, which rules out wildcards.
fn cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({"message": "Hello World"}))
}

async fn healthz() -> &'static str {
    "ok"
}

/// The basket snapshot, read fresh from disk and passed through verbatim.
async fn get_sp100(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let snapshot = sp100_core::basket::load_snapshot(&state.settings.snapshot_path)?;
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
struct NewsQuery {
    ticker: String,
    page: Option<usize>,
    page_size: Option<usize>,
}

async fn get_news(
    State(state): State<AppState>,
    Query(query): Query<NewsQuery>,
) -> Result<Json<NewsPage>, ApiError> {
    let (page, page_size) = validate_news_params(&query)?;

    let page = sp100_core::news::read_news_page(&state.settings.news_dir, &query.ticker, page, page_size)
        .map_err(|err| match err {
            NewsError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            NewsError::Csv { .. } => ApiError::Internal(anyhow::Error::new(err)),
        })?;
    Ok(Json(page))
}

fn validate_news_params(query: &NewsQuery) -> Result<(usize, usize), ApiError> {
    let page = query.page.unwrap_or(DEFAULT_PAGE);
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE);

    if page < 1 {
        return Err(ApiError::BadRequest("page must be >= 1".to_string()));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(ApiError::BadRequest(format!(
            "page_size must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }
    Ok((page, page_size))
}

#[derive(Debug, Serialize)]
struct LastDayResponse {
    ticker: String,
    date: NaiveDate,
    points: Vec<PricePoint>,
}

/// Most recent trading day's 1-minute close trace for one symbol. The
/// ticker keeps the caller's spelling end to end, series lookup included.
async fn get_ticker_last_day(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<LastDayResponse>, ApiError> {
    let symbols = vec![ticker.clone()];
    let series = quotes::download_1m(state.quotes.as_ref(), &symbols, TICKER_LOOKBACK_DAYS)
        .await
        .remove(&ticker)
        .unwrap_or_default();

    // An empty series stays an error rather than an empty success.
    let (date, points) = quotes::last_day(&series).ok_or_else(|| {
        ApiError::Internal(anyhow::anyhow!(
            "no intraday data available for ticker '{ticker}'"
        ))
    })?;

    Ok(Json(LastDayResponse {
        ticker,
        date,
        points,
    }))
}

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, detail),
            ApiError::Internal(err) => {
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
            }
        };
        (status, Json(json!({"detail": detail}))).into_response()
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<usize>, page_size: Option<usize>) -> NewsQuery {
        NewsQuery {
            ticker: "AAPL".to_string(),
            page,
            page_size,
        }
    }

    #[test]
    fn news_params_default_to_page_one_of_twenty() {
        assert_eq!(validate_news_params(&query(None, None)).unwrap(), (1, 20));
    }

    #[test]
    fn news_params_reject_out_of_range_values() {
        assert!(validate_news_params(&query(Some(0), None)).is_err());
        assert!(validate_news_params(&query(None, Some(0))).is_err());
        assert!(validate_news_params(&query(None, Some(101))).is_err());
        assert!(validate_news_params(&query(Some(3), Some(100))).is_ok());
    }
}
