//! HTTP handlers

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::SharedState;
use crate::data::database::ResultRow;
use crate::data::scrapers::{Standings, StandingsEntry};
use crate::report::{to_xlsx_bytes, ReportExporter};
use crate::scoring::{IngestReport, Ingestor, ScoreAggregator, TeamSummary};
use crate::{
    Competition, CompetitionId, EventId, ResultId, ResultRecord, SkaterId, SkatingError, TeamId,
};

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    "OK"
}

// === Ingestion ===

/// POST /scrape-results body
///
/// `url`, `event_name` and `competition_id` are all required; a missing one is a
/// 400 `Missing <field>`. The event must already be in the schedule and the
/// competition must exist, both checked before anything is fetched.
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub url: Option<String>,
    pub event_name: Option<String>,
    pub competition_id: Option<i64>,
    /// Overrides the configured fetch timeout
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub success: bool,
    pub group_size: u32,
    /// Every parsed entry, whether or not it was stored
    pub entries: Vec<StandingsEntry>,
    pub stored: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl IngestResponse {
    fn new(standings: Standings, report: &IngestReport) -> Self {
        IngestResponse {
            success: true,
            group_size: standings.field_size,
            entries: standings.entries,
            stored: report.stored.len(),
            skipped: report.skipped,
            failed: report.failed,
        }
    }
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, SkatingError> {
    value.ok_or(SkatingError::MissingField(field))
}

/// POST /scrape-results
///
/// `{ "url": ..., "event_name": ..., "competition_id": ... }`. A body without
/// `competition_id` is rejected with 400 `Missing competition_id`.
pub async fn scrape_results(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<IngestResponse>, SkatingError> {
    let request: IngestRequest = serde_json::from_slice(&body)
        .map_err(|e| SkatingError::InvalidRequest(e.to_string()))?;

    let url = required(request.url.filter(|u| !u.trim().is_empty()), "url")?;
    let event_name = required(request.event_name, "event_name")?;
    let competition = CompetitionId(required(request.competition_id, "competition_id")?);

    {
        let db = state.db.lock().await;
        Ingestor::new(&db).targets(competition, &event_name)?;
    }

    let standings = state
        .scraper
        .fetch_standings(&url, request.timeout_secs.map(Duration::from_secs))
        .await?;

    let report = {
        let db = state.db.lock().await;
        Ingestor::new(&db).ingest(competition, &event_name, &standings)?
    };

    Ok(Json(IngestResponse::new(standings, &report)))
}

// === Competitions ===

/// GET /competitions
pub async fn list_competitions(
    State(state): State<SharedState>,
) -> Result<Json<Vec<Competition>>, SkatingError> {
    let db = state.db.lock().await;
    Ok(Json(db.list_competitions()?))
}

/// GET /competitions/:id/summary
pub async fn competition_summary(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<TeamSummary>>, SkatingError> {
    let db = state.db.lock().await;
    Ok(Json(ScoreAggregator::new(&db).summarize(CompetitionId(id))?))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    EventOrder,
    Points,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

/// Filters and ordering for a team's results table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultsQuery {
    pub event_id: Option<i64>,
    pub skater_id: Option<i64>,
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub dir: SortDir,
}

/// Apply a results query to a team's rows
pub fn select_rows(mut rows: Vec<ResultRow>, query: &ResultsQuery) -> Vec<ResultRow> {
    if let Some(event) = query.event_id {
        rows.retain(|r| r.result.event == EventId(event));
    }
    if let Some(skater) = query.skater_id {
        rows.retain(|r| r.result.skater == Some(SkaterId(skater)));
    }

    match query.sort {
        SortKey::EventOrder => rows.sort_by_key(|r| r.event_order),
        SortKey::Points => rows.sort_by(|a, b| a.result.points.total_cmp(&b.result.points)),
    }
    if query.dir == SortDir::Desc {
        rows.reverse();
    }
    rows
}

/// GET /competitions/:id/teams/:team_id/results
pub async fn team_results(
    State(state): State<SharedState>,
    Path((id, team_id)): Path<(i64, i64)>,
    Query(query): Query<ResultsQuery>,
) -> Result<Json<Vec<ResultRow>>, SkatingError> {
    let db = state.db.lock().await;
    let competition = db.get_competition(CompetitionId(id))?;
    let team = db.get_team(TeamId(team_id))?;
    let rows = db.get_team_result_rows(competition.id, team.id)?;
    Ok(Json(select_rows(rows, &query)))
}

/// GET /competitions/:id/report
pub async fn download_report(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Response, SkatingError> {
    let report = {
        let db = state.db.lock().await;
        ReportExporter::new(&db).build(CompetitionId(id))?
    };
    let bytes = to_xlsx_bytes(&report)?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        report.filename.replace('"', "'")
    );

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

// === Results ===

/// POST /results/:id/points body
#[derive(Debug, Deserialize)]
pub struct PointsCorrection {
    pub points: f64,
}

/// POST /results/:id/points
pub async fn correct_points(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(correction): Json<PointsCorrection>,
) -> Result<Json<ResultRecord>, SkatingError> {
    let db = state.db.lock().await;
    Ok(Json(db.correct_points(ResultId(id), correction.points)?))
}
