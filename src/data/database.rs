//! SQLite database management for competition results

use crate::{
    Competition, CompetitionId, Event, EventId, NewResult, PointsEntry, Result, ResultId,
    ResultRecord, Skater, SkaterId, SkatingError, Team, TeamId,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;

const RESULT_COLUMNS: &str = "r.id, r.competition_id, r.event_id, r.team_id, r.skater_id,
     r.placement, r.field_size, r.points, r.created_at";

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS competitions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                year INTEGER NOT NULL,
                UNIQUE(title, year)
            );

            CREATE TABLE IF NOT EXISTS teams (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS skaters (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                team_id INTEGER NOT NULL REFERENCES teams(id),
                UNIQUE(name, team_id)
            );

            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                event_order INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS points (
                placement INTEGER NOT NULL,
                field_size INTEGER NOT NULL,
                points REAL NOT NULL,
                PRIMARY KEY (placement, field_size)
            );

            CREATE TABLE IF NOT EXISTS results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                competition_id INTEGER NOT NULL REFERENCES competitions(id),
                event_id INTEGER NOT NULL REFERENCES events(id),
                team_id INTEGER NOT NULL REFERENCES teams(id),
                skater_id INTEGER REFERENCES skaters(id),
                placement INTEGER NOT NULL,
                field_size INTEGER NOT NULL,
                points REAL NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_results_competition ON results(competition_id, team_id);
            "#,
        )?;
        Ok(())
    }

    // ==================== Competition Operations ====================

    /// Get or create a competition by title and year
    pub fn get_or_create_competition(&self, title: &str, year: i32) -> Result<Competition> {
        let existing = self
            .conn
            .query_row(
                "SELECT id, title, year FROM competitions WHERE title = ?1 AND year = ?2",
                params![title, year],
                Self::row_to_competition,
            )
            .optional()?;
        if let Some(competition) = existing {
            return Ok(competition);
        }

        self.conn.execute(
            "INSERT INTO competitions (title, year) VALUES (?1, ?2)",
            params![title, year],
        )?;

        Ok(Competition {
            id: CompetitionId(self.conn.last_insert_rowid()),
            title: title.to_string(),
            year,
        })
    }

    pub fn get_competition(&self, id: CompetitionId) -> Result<Competition> {
        self.conn
            .query_row(
                "SELECT id, title, year FROM competitions WHERE id = ?1",
                params![id.0],
                Self::row_to_competition,
            )
            .optional()?
            .ok_or(SkatingError::CompetitionNotFound(id))
    }

    /// All competitions, most recent year first
    pub fn list_competitions(&self) -> Result<Vec<Competition>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title, year FROM competitions ORDER BY year DESC, id DESC")?;
        let competitions = stmt
            .query_map([], Self::row_to_competition)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(competitions)
    }

    fn row_to_competition(row: &rusqlite::Row) -> rusqlite::Result<Competition> {
        Ok(Competition {
            id: CompetitionId(row.get(0)?),
            title: row.get(1)?,
            year: row.get(2)?,
        })
    }

    // ==================== Team Operations ====================

    /// Get or create a team by name
    pub fn get_or_create_team(&self, name: &str) -> Result<Team> {
        if let Some(team) = self.find_team_by_name(name)? {
            return Ok(team);
        }

        self.conn
            .execute("INSERT INTO teams (name) VALUES (?1)", params![name])?;

        Ok(Team {
            id: TeamId(self.conn.last_insert_rowid()),
            name: name.to_string(),
        })
    }

    /// Find a team by exact name
    pub fn find_team_by_name(&self, name: &str) -> Result<Option<Team>> {
        let team = self
            .conn
            .query_row(
                "SELECT id, name FROM teams WHERE name = ?1",
                params![name],
                Self::row_to_team,
            )
            .optional()?;
        Ok(team)
    }

    pub fn get_team(&self, id: TeamId) -> Result<Team> {
        self.conn
            .query_row(
                "SELECT id, name FROM teams WHERE id = ?1",
                params![id.0],
                Self::row_to_team,
            )
            .optional()?
            .ok_or(SkatingError::TeamNotFound(id))
    }

    /// Get all teams in creation order
    pub fn get_all_teams(&self) -> Result<Vec<Team>> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM teams ORDER BY id")?;
        let teams = stmt
            .query_map([], Self::row_to_team)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(teams)
    }

    fn row_to_team(row: &rusqlite::Row) -> rusqlite::Result<Team> {
        Ok(Team {
            id: TeamId(row.get(0)?),
            name: row.get(1)?,
        })
    }

    // ==================== Skater Operations ====================

    /// Get or create a skater on a team's roster
    pub fn get_or_create_skater(&self, name: &str, team: TeamId) -> Result<Skater> {
        let existing = self
            .conn
            .query_row(
                "SELECT id, name, team_id FROM skaters WHERE name = ?1 AND team_id = ?2",
                params![name, team.0],
                Self::row_to_skater,
            )
            .optional()?;
        if let Some(skater) = existing {
            return Ok(skater);
        }

        self.conn.execute(
            "INSERT INTO skaters (name, team_id) VALUES (?1, ?2)",
            params![name, team.0],
        )?;

        Ok(Skater {
            id: SkaterId(self.conn.last_insert_rowid()),
            name: name.to_string(),
            team,
        })
    }

    pub fn get_all_skaters(&self) -> Result<Vec<Skater>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, team_id FROM skaters ORDER BY id")?;
        let skaters = stmt
            .query_map([], Self::row_to_skater)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(skaters)
    }

    fn row_to_skater(row: &rusqlite::Row) -> rusqlite::Result<Skater> {
        Ok(Skater {
            id: SkaterId(row.get(0)?),
            name: row.get(1)?,
            team: TeamId(row.get(2)?),
        })
    }

    // ==================== Event Operations ====================

    /// Insert an event, or move an existing one to a new position
    pub fn upsert_event(&self, name: &str, event_order: i32) -> Result<Event> {
        self.conn.execute(
            "INSERT INTO events (name, event_order) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET event_order = excluded.event_order",
            params![name, event_order],
        )?;
        self.find_event_by_name(name)?
            .ok_or_else(|| SkatingError::UnknownEvent(name.to_string()))
    }

    pub fn find_event_by_name(&self, name: &str) -> Result<Option<Event>> {
        let event = self
            .conn
            .query_row(
                "SELECT id, name, event_order FROM events WHERE name = ?1",
                params![name],
                Self::row_to_event,
            )
            .optional()?;
        Ok(event)
    }

    /// Get all events in competition order
    pub fn get_all_events(&self) -> Result<Vec<Event>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, event_order FROM events ORDER BY event_order, id")?;
        let events = stmt
            .query_map([], Self::row_to_event)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(events)
    }

    fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<Event> {
        Ok(Event {
            id: EventId(row.get(0)?),
            name: row.get(1)?,
            event_order: row.get(2)?,
        })
    }

    // ==================== Points Table ====================

    /// Set the points for a placement in a field of the given size
    pub fn set_points(&self, entry: &PointsEntry) -> Result<()> {
        self.conn.execute(
            "INSERT INTO points (placement, field_size, points) VALUES (?1, ?2, ?3)
             ON CONFLICT(placement, field_size) DO UPDATE SET points = excluded.points",
            params![entry.placement, entry.field_size, entry.points],
        )?;
        Ok(())
    }

    /// The whole points table, ordered by field size then placement
    pub fn get_points_table(&self) -> Result<Vec<PointsEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT placement, field_size, points FROM points ORDER BY field_size, placement",
        )?;
        let entries = stmt
            .query_map([], |row| {
                Ok(PointsEntry {
                    placement: row.get(0)?,
                    field_size: row.get(1)?,
                    points: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ==================== Result Operations ====================

    /// Append a result; repeated ingestion appends again
    pub fn insert_result(&self, result: &NewResult) -> Result<ResultId> {
        self.conn.execute(
            r#"
            INSERT INTO results (competition_id, event_id, team_id, skater_id,
                                 placement, field_size, points, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                result.competition.0,
                result.event.0,
                result.team.0,
                result.skater.map(|s| s.0),
                result.placement,
                result.field_size,
                result.points,
                Utc::now(),
            ],
        )?;
        Ok(ResultId(self.conn.last_insert_rowid()))
    }

    pub fn get_result(&self, id: ResultId) -> Result<ResultRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM results r WHERE r.id = ?1", RESULT_COLUMNS),
                params![id.0],
                Self::row_to_result,
            )
            .optional()?
            .ok_or(SkatingError::ResultNotFound(id))
    }

    /// Explicit points correction; the only mutation a stored result allows
    pub fn correct_points(&self, id: ResultId, points: f64) -> Result<ResultRecord> {
        let updated = self.conn.execute(
            "UPDATE results SET points = ?1 WHERE id = ?2",
            params![points, id.0],
        )?;
        if updated == 0 {
            return Err(SkatingError::ResultNotFound(id));
        }
        log::info!("Corrected {} to {} points", id, points);
        self.get_result(id)
    }

    /// All results of a competition in insertion order
    pub fn get_competition_results(&self, competition: CompetitionId) -> Result<Vec<ResultRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM results r WHERE r.competition_id = ?1 ORDER BY r.id",
            RESULT_COLUMNS
        ))?;
        let results = stmt
            .query_map(params![competition.0], Self::row_to_result)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(results)
    }

    /// A team's results joined with event and skater details, in event order
    pub fn get_team_result_rows(
        &self,
        competition: CompetitionId,
        team: TeamId,
    ) -> Result<Vec<ResultRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {}, e.name, e.event_order, s.name
             FROM results r
             JOIN events e ON e.id = r.event_id
             LEFT JOIN skaters s ON s.id = r.skater_id
             WHERE r.competition_id = ?1 AND r.team_id = ?2
             ORDER BY e.event_order, r.id",
            RESULT_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![competition.0, team.0], |row| {
                Ok(ResultRow {
                    result: Self::row_to_result(row)?,
                    event_name: row.get(9)?,
                    event_order: row.get(10)?,
                    skater_name: row.get(11)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn row_to_result(row: &rusqlite::Row) -> rusqlite::Result<ResultRecord> {
        Ok(ResultRecord {
            id: ResultId(row.get(0)?),
            competition: CompetitionId(row.get(1)?),
            event: EventId(row.get(2)?),
            team: TeamId(row.get(3)?),
            skater: row.get::<_, Option<i64>>(4)?.map(SkaterId),
            placement: row.get(5)?,
            field_size: row.get(6)?,
            points: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    // ==================== Statistics ====================

    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 =
                self.conn
                    .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                        row.get(0)
                    })?;
            Ok(n as usize)
        };

        Ok(DatabaseStats {
            competition_count: count("competitions")?,
            team_count: count("teams")?,
            skater_count: count("skaters")?,
            event_count: count("events")?,
            points_entry_count: count("points")?,
            result_count: count("results")?,
        })
    }
}

/// A stored result joined with its event and skater
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    #[serde(flatten)]
    pub result: ResultRecord,
    pub event_name: String,
    pub event_order: i32,
    pub skater_name: Option<String>,
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub competition_count: usize,
    pub team_count: usize,
    pub skater_count: usize,
    pub event_count: usize,
    pub points_entry_count: usize,
    pub result_count: usize,
}
