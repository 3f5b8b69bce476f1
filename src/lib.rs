//! Figure skating standings ingestion and team scoring
//!
//! Scrapes "Final Standings" blocks from public results pages, converts placements into
//! points and ranks teams across a whole competition.

pub mod data;
pub mod report;
pub mod scoring;
pub mod server;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Unique identifier for a competition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompetitionId(pub i64);

/// Unique identifier for a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub i64);

/// Unique identifier for a skater
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkaterId(pub i64);

/// Unique identifier for an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub i64);

/// Unique identifier for a stored result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultId(pub i64);

impl fmt::Display for CompetitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Competition({})", self.0)
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Team({})", self.0)
    }
}

impl fmt::Display for SkaterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Skater({})", self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Event({})", self.0)
    }
}

impl fmt::Display for ResultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Result({})", self.0)
    }
}

/// A competition that results are recorded against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competition {
    pub id: CompetitionId,
    pub title: String,
    pub year: i32,
}

/// A tracked team (usually a university club)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
}

impl Team {
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.trim().to_lowercase()
    }
}

/// A skater on a team's roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skater {
    pub id: SkaterId,
    pub name: String,
    pub team: TeamId,
}

/// An event within the competition schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    /// Competition-wide sequence number used for all ordering
    pub event_order: i32,
}

/// One row of the points table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointsEntry {
    pub placement: u32,
    pub field_size: u32,
    pub points: f64,
}

/// A result ready to be stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewResult {
    pub competition: CompetitionId,
    pub event: EventId,
    pub team: TeamId,
    pub skater: Option<SkaterId>,
    pub placement: u32,
    pub field_size: u32,
    pub points: f64,
}

/// A stored result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id: ResultId,
    pub competition: CompetitionId,
    pub event: EventId,
    pub team: TeamId,
    pub skater: Option<SkaterId>,
    pub placement: u32,
    pub field_size: u32,
    pub points: f64,
    pub created_at: DateTime<Utc>,
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum SkatingError {
    #[error("Standings not found")]
    StandingsNotFound,

    #[error("Missing {0}")]
    MissingField(&'static str),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Competition not found with ID: {0}")]
    CompetitionNotFound(CompetitionId),

    #[error("Team not found with ID: {0}")]
    TeamNotFound(TeamId),

    #[error("Result not found with ID: {0}")]
    ResultNotFound(ResultId),

    #[error("Scraper failed for {url}: {message}")]
    Scraper { url: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Report error: {0}")]
    Report(#[from] rust_xlsxwriter::XlsxError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, SkatingError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub scraper: ScraperConfig,
    pub data: DataConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub user_agent: String,
    /// Default fetch timeout; the transport default applies when unset
    pub timeout_secs: Option<u64>,
    /// Directory for saved results pages
    pub cache_dir: Option<String>,
    /// Only read pages from `cache_dir`
    #[serde(default)]
    pub offline: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub output_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                bind: "127.0.0.1:8080".to_string(),
            },
            scraper: ScraperConfig {
                user_agent: "skating-results-bot/1.0".to_string(),
                timeout_secs: Some(30),
                cache_dir: None,
                offline: false,
            },
            data: DataConfig {
                database_path: "data/skating.db".to_string(),
            },
            report: ReportConfig {
                output_dir: "reports".to_string(),
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SkatingError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| SkatingError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SkatingError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
