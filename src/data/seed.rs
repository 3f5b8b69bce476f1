//! Reference data seeding from a TOML file
//!
//! ```toml
//! [[competitions]]
//! title = "Eastern Sectionals"
//! year = 2025
//!
//! [[teams]]
//! name = "State University"
//! skaters = ["Jane Doe", "Alice Moore"]
//!
//! [[events]]
//! name = "Senior Ladies"
//! order = 12
//!
//! [[points]]
//! placement = 1
//! field_size = 6
//! points = 7
//! ```

use super::Database;
use crate::{PointsEntry, Result, SkatingError};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub competitions: Vec<SeedCompetition>,
    #[serde(default)]
    pub teams: Vec<SeedTeam>,
    #[serde(default)]
    pub events: Vec<SeedEvent>,
    #[serde(default)]
    pub points: Vec<PointsEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedCompetition {
    pub title: String,
    pub year: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedTeam {
    pub name: String,
    #[serde(default)]
    pub skaters: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedEvent {
    pub name: String,
    pub order: i32,
}

/// Rows touched by a seed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedCounts {
    pub competitions: usize,
    pub teams: usize,
    pub skaters: usize,
    pub events: usize,
    pub points: usize,
}

impl SeedFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| SkatingError::Parse(format!("Failed to parse seed file: {}", e)))
    }

    /// Apply to the database; existing rows are reused, event orders and points updated
    pub fn apply(&self, db: &Database) -> Result<SeedCounts> {
        let mut counts = SeedCounts::default();

        for competition in &self.competitions {
            db.get_or_create_competition(&competition.title, competition.year)?;
            counts.competitions += 1;
        }

        for team in &self.teams {
            let stored = db.get_or_create_team(&team.name)?;
            counts.teams += 1;
            for skater in &team.skaters {
                db.get_or_create_skater(skater, stored.id)?;
                counts.skaters += 1;
            }
        }

        for event in &self.events {
            db.upsert_event(&event.name, event.order)?;
            counts.events += 1;
        }

        for entry in &self.points {
            db.set_points(entry)?;
            counts.points += 1;
        }

        log::info!(
            "Seeded {} competitions, {} teams, {} skaters, {} events, {} points entries",
            counts.competitions,
            counts.teams,
            counts.skaters,
            counts.events,
            counts.points
        );
        Ok(counts)
    }
}
