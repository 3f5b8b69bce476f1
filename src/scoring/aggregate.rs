//! Per-team totals across a competition
//!
//! Summaries are recomputed from the stored results on every call; nothing is cached.

use crate::data::Database;
use crate::{CompetitionId, Result, ResultRecord, Team, TeamId};
use serde::Serialize;
use std::collections::HashMap;

/// A team's standing within one competition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    pub team_id: TeamId,
    pub name: String,
    pub total_points: f64,
    pub starts: u32,
    pub points_per_start: f64,
}

/// Average points per start, rounded to three decimals; zero without starts
pub fn points_per_start(total_points: f64, starts: u32) -> f64 {
    if starts == 0 {
        return 0.0;
    }
    (total_points / starts as f64 * 1000.0).round() / 1000.0
}

/// Rank every team by total points
///
/// Each team appears once, including teams without results. The sort is stable, so
/// teams level on points keep the order of `teams`.
pub fn aggregate(teams: &[Team], results: &[ResultRecord]) -> Vec<TeamSummary> {
    let index: HashMap<TeamId, usize> = teams
        .iter()
        .enumerate()
        .map(|(idx, team)| (team.id, idx))
        .collect();

    let mut totals = vec![(0.0_f64, 0_u32); teams.len()];
    for result in results {
        match index.get(&result.team) {
            Some(&idx) => {
                totals[idx].0 += result.points;
                totals[idx].1 += 1;
            }
            None => log::debug!("Ignoring {} for untracked {}", result.id, result.team),
        }
    }

    let mut summaries: Vec<TeamSummary> = teams
        .iter()
        .zip(totals)
        .map(|(team, (total_points, starts))| TeamSummary {
            team_id: team.id,
            name: team.name.clone(),
            total_points,
            starts,
            points_per_start: points_per_start(total_points, starts),
        })
        .collect();

    summaries.sort_by(|a, b| b.total_points.total_cmp(&a.total_points));
    summaries
}

/// Reads a competition's results and ranks its teams
pub struct ScoreAggregator<'a> {
    db: &'a Database,
}

impl<'a> ScoreAggregator<'a> {
    pub fn new(db: &'a Database) -> Self {
        ScoreAggregator { db }
    }

    pub fn summarize(&self, competition: CompetitionId) -> Result<Vec<TeamSummary>> {
        // Fails for an unknown competition rather than ranking an empty result set
        self.db.get_competition(competition)?;
        let teams = self.db.get_all_teams()?;
        let results = self.db.get_competition_results(competition)?;
        Ok(aggregate(&teams, &results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EventId, NewResult, ResultId};
    use chrono::Utc;

    fn team(id: i64, name: &str) -> Team {
        Team {
            id: TeamId(id),
            name: name.to_string(),
        }
    }

    fn result(id: i64, team: i64, points: f64) -> ResultRecord {
        ResultRecord {
            id: ResultId(id),
            competition: CompetitionId(1),
            event: EventId(1),
            team: TeamId(team),
            skater: None,
            placement: 1,
            field_size: 4,
            points,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_totals_starts_and_average() {
        let teams = vec![team(1, "State University")];
        let results = vec![result(1, 1, 5.0), result(2, 1, 3.0), result(3, 1, 2.0)];

        let summaries = aggregate(&teams, &results);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].total_points, 10.0);
        assert_eq!(summaries[0].starts, 3);
        assert_eq!(summaries[0].points_per_start, 3.333);
    }

    #[test]
    fn test_team_without_results_is_listed() {
        let teams = vec![team(1, "State University"), team(2, "Tech Institute")];
        let summaries = aggregate(&teams, &[result(1, 1, 4.0)]);

        let empty = summaries.iter().find(|s| s.team_id == TeamId(2)).unwrap();
        assert_eq!(empty.total_points, 0.0);
        assert_eq!(empty.starts, 0);
        assert_eq!(empty.points_per_start, 0.0);
    }

    #[test]
    fn test_sums_match_results() {
        let teams = vec![team(1, "A"), team(2, "B"), team(3, "C")];
        let results = vec![
            result(1, 1, 5.0),
            result(2, 2, 7.0),
            result(3, 3, 0.0),
            result(4, 2, 1.5),
            result(5, 1, 3.0),
        ];

        let summaries = aggregate(&teams, &results);
        let total: f64 = summaries.iter().map(|s| s.total_points).sum();
        let starts: u32 = summaries.iter().map(|s| s.starts).sum();
        assert_eq!(total, results.iter().map(|r| r.points).sum::<f64>());
        assert_eq!(starts as usize, results.len());
    }

    #[test]
    fn test_ordering_and_ties_keep_team_order() {
        let teams = vec![
            team(1, "Alpha"),
            team(2, "Bravo"),
            team(3, "Charlie"),
            team(4, "Delta"),
        ];
        let results = vec![
            result(1, 3, 4.0),
            result(2, 2, 6.0),
            result(3, 4, 6.0),
            result(4, 1, 4.0),
        ];

        let summaries = aggregate(&teams, &results);
        let names: Vec<&str> = summaries.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Bravo", "Delta", "Alpha", "Charlie"]);
        assert!(summaries
            .windows(2)
            .all(|w| w[0].total_points >= w[1].total_points));
    }

    #[test]
    fn test_untracked_team_results_are_ignored() {
        let summaries = aggregate(&[team(1, "A")], &[result(1, 9, 5.0)]);
        assert_eq!(summaries[0].starts, 0);
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let summaries = aggregate(&[team(1, "A")], &[result(1, 1, 2.0)]);
        let json = serde_json::to_value(&summaries[0]).unwrap();
        assert_eq!(json["teamId"], 1);
        assert_eq!(json["totalPoints"], 2.0);
        assert_eq!(json["pointsPerStart"], 2.0);
    }

    #[test]
    fn test_summarize_reads_latest_results() {
        let db = Database::in_memory().unwrap();
        let competition = db.get_or_create_competition("Sectionals", 2025).unwrap();
        let state = db.get_or_create_team("State University").unwrap();
        let tech = db.get_or_create_team("Tech Institute").unwrap();
        let event = db.upsert_event("Senior Ladies", 1).unwrap();

        let aggregator = ScoreAggregator::new(&db);
        let before = aggregator.summarize(competition.id).unwrap();
        assert!(before.iter().all(|s| s.starts == 0));

        let id = db
            .insert_result(&NewResult {
                competition: competition.id,
                event: event.id,
                team: tech.id,
                skater: None,
                placement: 1,
                field_size: 2,
                points: 3.0,
            })
            .unwrap();

        let after = aggregator.summarize(competition.id).unwrap();
        assert_eq!(after[0].team_id, tech.id);
        assert_eq!(after[0].total_points, 3.0);
        assert_eq!(after[1].team_id, state.id);

        db.correct_points(id, 1.0).unwrap();
        let corrected = aggregator.summarize(competition.id).unwrap();
        assert_eq!(corrected[0].total_points, 1.0);
    }

    #[test]
    fn test_summarize_unknown_competition() {
        let db = Database::in_memory().unwrap();
        assert!(ScoreAggregator::new(&db)
            .summarize(CompetitionId(5))
            .is_err());
    }
}
