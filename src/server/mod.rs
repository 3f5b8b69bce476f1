//! HTTP API
//!
//! Provides:
//! - Standings ingestion from a results page URL (`POST /scrape-results` with
//!   `url`, `event_name` and `competition_id`, all required)
//! - Competition listing and ranked team summaries
//! - Per-team result tables with points correction
//! - Spreadsheet report download

pub mod routes;

use axum::{
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::data::scrapers::StandingsScraper;
use crate::data::Database;
use crate::{Result, SkatingError};

/// State shared across handlers
pub struct AppState {
    pub db: Mutex<Database>,
    pub scraper: StandingsScraper,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(db: Database, scraper: StandingsScraper) -> SharedState {
        Arc::new(AppState {
            db: Mutex::new(db),
            scraper,
        })
    }
}

/// Create the API router
pub fn create_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/scrape-results", post(routes::scrape_results))
        .route("/competitions", get(routes::list_competitions))
        .route("/competitions/:id/summary", get(routes::competition_summary))
        .route(
            "/competitions/:id/teams/:team_id/results",
            get(routes::team_results),
        )
        .route("/competitions/:id/report", get(routes::download_report))
        .route("/results/:id/points", post(routes::correct_points))
        .route("/health", get(routes::health))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process exits
pub async fn serve(state: SharedState, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    log::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}

impl SkatingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SkatingError::StandingsNotFound
            | SkatingError::MissingField(_)
            | SkatingError::InvalidRequest(_)
            | SkatingError::UnknownEvent(_) => StatusCode::BAD_REQUEST,
            SkatingError::CompetitionNotFound(_)
            | SkatingError::TeamNotFound(_)
            | SkatingError::ResultNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SkatingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Request failed: {}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
