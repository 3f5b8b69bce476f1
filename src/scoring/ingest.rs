//! Turning parsed standings into stored results
//!
//! Each resolved entry is written on its own. A failed write is logged and counted,
//! and the remaining entries are still written; there is no batch transaction.

use super::identity::{IdentityResolver, Resolution};
use super::points::{award, PointsAward, PointsLookup, PointsTable};
use crate::data::scrapers::Standings;
use crate::data::Database;
use crate::{Competition, CompetitionId, Event, NewResult, Result, ResultId, SkatingError};
use serde::Serialize;

/// Destination for new results
pub trait ResultStore {
    fn insert_result(&self, result: &NewResult) -> Result<ResultId>;
}

impl ResultStore for Database {
    fn insert_result(&self, result: &NewResult) -> Result<ResultId> {
        Database::insert_result(self, result)
    }
}

/// What happened to each entry of one standings block
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    /// Ids of the results written, in standings order
    pub stored: Vec<ResultId>,
    /// Entries without a tracked team or a competitor name
    pub skipped: usize,
    /// Entries whose lookup or write failed
    pub failed: usize,
    /// Stored entries the points table did not cover
    pub missing_points: usize,
}

/// Resolve, score and store every entry of a standings block
pub fn ingest_standings<S, L>(
    store: &S,
    points: &L,
    resolver: &IdentityResolver,
    competition: CompetitionId,
    event: &Event,
    standings: &Standings,
) -> IngestReport
where
    S: ResultStore + ?Sized,
    L: PointsLookup + ?Sized,
{
    let mut report = IngestReport::default();

    for entry in &standings.entries {
        let resolved = match resolver.resolve(entry, standings.field_size) {
            Resolution::Resolved(resolved) => resolved,
            Resolution::UnknownTeam => {
                log::debug!(
                    "Skipping {:?}: affiliation {:?} is not a tracked team",
                    entry.competitor_name,
                    entry.affiliation
                );
                report.skipped += 1;
                continue;
            }
            Resolution::MissingName => {
                log::debug!("Skipping placement {} without a name", entry.placement);
                report.skipped += 1;
                continue;
            }
        };

        let awarded = match award(points, resolved.placement, resolved.field_size) {
            Ok(awarded) => awarded,
            Err(e) => {
                log::warn!(
                    "Points lookup failed for {} ({} of {}): {}",
                    resolved.competitor_name,
                    resolved.placement,
                    resolved.field_size,
                    e
                );
                report.failed += 1;
                continue;
            }
        };
        if awarded == PointsAward::MissingEntry {
            log::debug!(
                "No points for placement {} of {}; scoring 0",
                resolved.placement,
                resolved.field_size
            );
            report.missing_points += 1;
        }

        let result = NewResult {
            competition,
            event: event.id,
            team: resolved.team,
            skater: resolved.skater,
            placement: resolved.placement,
            field_size: resolved.field_size,
            points: awarded.points(),
        };

        match store.insert_result(&result) {
            Ok(id) => report.stored.push(id),
            Err(e) => {
                log::warn!(
                    "Failed to store result for {} in {}: {}",
                    resolved.competitor_name,
                    event.name,
                    e
                );
                report.failed += 1;
            }
        }
    }

    log::info!(
        "Ingested {}: {} stored, {} skipped, {} failed",
        event.name,
        report.stored.len(),
        report.skipped,
        report.failed
    );
    report
}

/// Runs standings ingestion against the database
pub struct Ingestor<'a> {
    db: &'a Database,
}

impl<'a> Ingestor<'a> {
    pub fn new(db: &'a Database) -> Self {
        Ingestor { db }
    }

    /// Check the request targets before anything is fetched
    pub fn targets(
        &self,
        competition: CompetitionId,
        event_name: &str,
    ) -> Result<(Competition, Event)> {
        let competition = self.db.get_competition(competition)?;
        let event = self
            .db
            .find_event_by_name(event_name)?
            .ok_or_else(|| SkatingError::UnknownEvent(event_name.to_string()))?;
        Ok((competition, event))
    }

    pub fn ingest(
        &self,
        competition: CompetitionId,
        event_name: &str,
        standings: &Standings,
    ) -> Result<IngestReport> {
        let (competition, event) = self.targets(competition, event_name)?;
        let resolver = IdentityResolver::from_database(self.db)?;
        let points: PointsTable = self.db.get_points_table()?.into_iter().collect();
        log::debug!("Scoring against {} points entries", points.len());
        Ok(ingest_standings(
            self.db,
            &points,
            &resolver,
            competition.id,
            &event,
            standings,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::scrapers::standings::parse_standings_text;
    use crate::{EventId, PointsEntry, Skater, SkaterId, Team, TeamId};
    use std::cell::RefCell;

    /// Records writes and fails the placements it is told to
    struct FlakyStore {
        fail_placements: Vec<u32>,
        written: RefCell<Vec<NewResult>>,
    }

    impl ResultStore for FlakyStore {
        fn insert_result(&self, result: &NewResult) -> Result<ResultId> {
            if self.fail_placements.contains(&result.placement) {
                return Err(SkatingError::Parse("disk full".to_string()));
            }
            let mut written = self.written.borrow_mut();
            written.push(result.clone());
            Ok(ResultId(written.len() as i64))
        }
    }

    const BLOCK: &str = "Final Standings
1. Alice Moore, State University
2. Bea Lin, Tech Institute
3. Jane Doe, State University
4. Ana Ruiz, Other College
Panel of Officials";

    fn resolver() -> IdentityResolver {
        IdentityResolver::new(
            vec![
                Team {
                    id: TeamId(1),
                    name: "State University".to_string(),
                },
                Team {
                    id: TeamId(2),
                    name: "Tech Institute".to_string(),
                },
            ],
            vec![Skater {
                id: SkaterId(7),
                name: "Jane Doe".to_string(),
                team: TeamId(1),
            }],
        )
    }

    fn event() -> Event {
        Event {
            id: EventId(3),
            name: "Senior Ladies".to_string(),
            event_order: 3,
        }
    }

    fn points() -> PointsTable {
        let mut table = PointsTable::new();
        table.insert(1, 4, 5.0);
        table.insert(2, 4, 3.0);
        table
    }

    #[test]
    fn test_ingest_scores_and_skips() {
        let store = FlakyStore {
            fail_placements: vec![],
            written: RefCell::new(Vec::new()),
        };
        let standings = parse_standings_text(BLOCK).unwrap();

        let report = ingest_standings(
            &store,
            &points(),
            &resolver(),
            CompetitionId(9),
            &event(),
            &standings,
        );

        assert_eq!(report.stored.len(), 3);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(
            report.stored.len() + report.skipped + report.failed,
            standings.entries.len()
        );
        assert_eq!(report.missing_points, 1);

        let written = store.written.borrow();
        let scored: Vec<(u32, f64)> = written.iter().map(|r| (r.placement, r.points)).collect();
        assert_eq!(scored, vec![(1, 5.0), (2, 3.0), (3, 0.0)]);
        assert!(written.iter().all(|r| r.field_size == 4));
        assert!(written.iter().all(|r| r.competition == CompetitionId(9)));
        assert_eq!(written[2].skater, Some(SkaterId(7)));
        assert_eq!(written[0].skater, None);
    }

    #[test]
    fn test_failed_write_does_not_stop_batch() {
        let store = FlakyStore {
            fail_placements: vec![1],
            written: RefCell::new(Vec::new()),
        };
        let standings = parse_standings_text(BLOCK).unwrap();

        let report = ingest_standings(
            &store,
            &points(),
            &resolver(),
            CompetitionId(9),
            &event(),
            &standings,
        );

        assert_eq!(report.failed, 1);
        assert_eq!(report.stored.len(), 2);
        let placements: Vec<u32> = store.written.borrow().iter().map(|r| r.placement).collect();
        assert_eq!(placements, vec![2, 3]);
    }

    #[test]
    fn test_ingestor_against_database() {
        let db = Database::in_memory().unwrap();
        let competition = db.get_or_create_competition("Sectionals", 2025).unwrap();
        db.get_or_create_team("State University").unwrap();
        db.get_or_create_team("Tech Institute").unwrap();
        db.upsert_event("Senior Ladies", 1).unwrap();
        db.set_points(&PointsEntry {
            placement: 1,
            field_size: 4,
            points: 5.0,
        })
        .unwrap();

        let standings = parse_standings_text(BLOCK).unwrap();
        let ingestor = Ingestor::new(&db);
        let report = ingestor
            .ingest(competition.id, "Senior Ladies", &standings)
            .unwrap();
        assert_eq!(report.stored.len(), 3);

        // Re-running appends rather than deduplicating
        ingestor
            .ingest(competition.id, "Senior Ladies", &standings)
            .unwrap();
        assert_eq!(db.get_competition_results(competition.id).unwrap().len(), 6);
    }

    #[test]
    fn test_ingestor_unknown_targets() {
        let db = Database::in_memory().unwrap();
        let competition = db.get_or_create_competition("Sectionals", 2025).unwrap();
        let standings = parse_standings_text(BLOCK).unwrap();
        let ingestor = Ingestor::new(&db);

        assert!(matches!(
            ingestor.ingest(competition.id, "Pairs", &standings),
            Err(SkatingError::UnknownEvent(_))
        ));
        assert!(matches!(
            ingestor.ingest(CompetitionId(99), "Pairs", &standings),
            Err(SkatingError::CompetitionNotFound(_))
        ));
    }
}
