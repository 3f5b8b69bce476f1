//! Competition report export
//!
//! One sheet per ranked team listing the team's results in event order. The sheet
//! layout is built here; `xlsx` serializes it.

pub mod xlsx;

use crate::data::database::ResultRow;
use crate::data::Database;
use crate::scoring::{ScoreAggregator, TeamSummary};
use crate::{Competition, CompetitionId, Result, TeamId};
use std::collections::HashSet;

pub use xlsx::{to_xlsx_bytes, write_xlsx};

/// Longest sheet name the spreadsheet format accepts
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Column headings, in order
pub const COLUMNS: [&str; 6] = [
    "Event Order",
    "Event Name",
    "Skater",
    "Placement",
    "Group Size",
    "Points",
];

/// One result line of a team sheet; all `None` for the placeholder row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetRow {
    pub event_order: Option<i32>,
    pub event_name: Option<String>,
    pub skater_name: Option<String>,
    pub placement: Option<u32>,
    pub field_size: Option<u32>,
    pub points: Option<f64>,
}

impl From<&ResultRow> for SheetRow {
    fn from(row: &ResultRow) -> Self {
        SheetRow {
            event_order: Some(row.event_order),
            event_name: Some(row.event_name.clone()),
            skater_name: row.skater_name.clone(),
            placement: Some(row.result.placement),
            field_size: Some(row.result.field_size),
            points: Some(row.result.points),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub team_id: TeamId,
    pub rows: Vec<SheetRow>,
}

/// A competition report ready to serialize
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub filename: String,
    pub sheets: Vec<Sheet>,
}

/// Sheet names may not start or end with an apostrophe
fn trim_sheet_name(name: &str) -> &str {
    name.trim_matches(|c: char| c.is_whitespace() || c == '\'')
}

fn truncate_sheet_name(base: &str, max: usize, team_id: TeamId) -> String {
    let cut: String = base.chars().take(max).collect();
    let trimmed = trim_sheet_name(&cut);
    if trimmed.is_empty() {
        format!("Team {}", team_id.0)
    } else {
        trimmed.to_string()
    }
}

/// Make a valid, unique sheet name for a team
///
/// `used` holds the lowercased names already taken, since sheet names compare
/// case-insensitively.
pub fn sheet_name(team_name: &str, team_id: TeamId, used: &mut HashSet<String>) -> String {
    let cleaned: String = team_name
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            c => c,
        })
        .collect();
    let cleaned = trim_sheet_name(&cleaned);

    let base = if cleaned.is_empty() {
        format!("Team {}", team_id.0)
    } else {
        cleaned.to_string()
    };

    let mut name = truncate_sheet_name(&base, MAX_SHEET_NAME_LEN, team_id);
    let mut n = 2;
    while used.contains(&name.to_lowercase()) {
        let suffix = format!(" ({})", n);
        let keep = MAX_SHEET_NAME_LEN - suffix.chars().count();
        name = truncate_sheet_name(&base, keep, team_id) + &suffix;
        n += 1;
    }

    used.insert(name.to_lowercase());
    name
}

/// Lay out a report from ranked summaries and each team's joined results
pub fn build_report<F>(
    competition: &Competition,
    summaries: &[TeamSummary],
    mut team_rows: F,
) -> Result<Report>
where
    F: FnMut(TeamId) -> Result<Vec<ResultRow>>,
{
    let mut used = HashSet::new();
    let mut sheets = Vec::with_capacity(summaries.len());

    for summary in summaries {
        let mut rows = team_rows(summary.team_id)?;
        rows.sort_by_key(|r| r.event_order);

        let mut sheet_rows: Vec<SheetRow> = rows.iter().map(SheetRow::from).collect();
        if sheet_rows.is_empty() {
            sheet_rows.push(SheetRow::default());
        }

        sheets.push(Sheet {
            name: sheet_name(&summary.name, summary.team_id, &mut used),
            team_id: summary.team_id,
            rows: sheet_rows,
        });
    }

    Ok(Report {
        filename: format!("{} Results.xlsx", competition.title),
        sheets,
    })
}

/// Builds competition reports from the database
pub struct ReportExporter<'a> {
    db: &'a Database,
}

impl<'a> ReportExporter<'a> {
    pub fn new(db: &'a Database) -> Self {
        ReportExporter { db }
    }

    pub fn build(&self, competition: CompetitionId) -> Result<Report> {
        let competition = self.db.get_competition(competition)?;
        let summaries = ScoreAggregator::new(self.db).summarize(competition.id)?;
        build_report(&competition, &summaries, |team| {
            self.db.get_team_result_rows(competition.id, team)
        })
    }
}
