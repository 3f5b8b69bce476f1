//! Matching parsed competitors to tracked teams and skaters

use crate::data::scrapers::StandingsEntry;
use crate::data::Database;
use crate::{Result, Skater, SkaterId, Team, TeamId};
use std::collections::HashMap;

/// A standings entry tied to a tracked team
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub placement: u32,
    pub field_size: u32,
    pub competitor_name: String,
    pub team: TeamId,
    pub skater: Option<SkaterId>,
}

/// How a single standings entry resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ResolvedEntry),
    /// Affiliation is not a tracked team; the entry is dropped
    UnknownTeam,
    /// The ranked line carried no competitor name
    MissingName,
}

/// Resolves affiliations and competitor names against reference data
pub struct IdentityResolver {
    teams: Vec<Team>,
    by_name: HashMap<String, usize>,
    /// Skater name -> roster entries across all teams
    skaters: HashMap<String, Vec<Skater>>,
}

impl IdentityResolver {
    pub fn new(teams: Vec<Team>, skaters: Vec<Skater>) -> Self {
        let by_name = teams
            .iter()
            .enumerate()
            .map(|(idx, team)| (team.name.clone(), idx))
            .collect();

        let mut by_skater: HashMap<String, Vec<Skater>> = HashMap::new();
        for skater in skaters {
            by_skater
                .entry(skater.name.trim().to_lowercase())
                .or_default()
                .push(skater);
        }

        IdentityResolver {
            teams,
            by_name,
            skaters: by_skater,
        }
    }

    /// Load the current teams and skaters from the database
    pub fn from_database(db: &Database) -> Result<Self> {
        Ok(Self::new(db.get_all_teams()?, db.get_all_skaters()?))
    }

    /// Exact name first, then case-insensitive
    pub fn resolve_team(&self, affiliation: &str) -> Option<&Team> {
        let affiliation = affiliation.trim();
        match self.by_name.get(affiliation) {
            Some(&idx) => Some(&self.teams[idx]),
            None => self.teams.iter().find(|t| t.matches_name(affiliation)),
        }
    }

    /// Only a skater on the resolved team's roster is attributed
    pub fn resolve_skater(&self, name: &str, team: TeamId) -> Option<SkaterId> {
        self.skaters
            .get(&name.trim().to_lowercase())?
            .iter()
            .find(|s| s.team == team)
            .map(|s| s.id)
    }

    pub fn resolve(&self, entry: &StandingsEntry, field_size: u32) -> Resolution {
        if entry.competitor_name.is_empty() {
            return Resolution::MissingName;
        }

        let Some(team) = entry
            .affiliation
            .as_deref()
            .and_then(|a| self.resolve_team(a))
        else {
            return Resolution::UnknownTeam;
        };

        Resolution::Resolved(ResolvedEntry {
            placement: entry.placement,
            field_size,
            competitor_name: entry.competitor_name.clone(),
            team: team.id,
            skater: self.resolve_skater(&entry.competitor_name, team.id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> IdentityResolver {
        let teams = vec![
            Team {
                id: TeamId(1),
                name: "State University".to_string(),
            },
            Team {
                id: TeamId(2),
                name: "Tech Institute".to_string(),
            },
        ];
        let skaters = vec![
            Skater {
                id: SkaterId(10),
                name: "Jane Doe".to_string(),
                team: TeamId(1),
            },
            Skater {
                id: SkaterId(11),
                name: "Sam Lee".to_string(),
                team: TeamId(2),
            },
            Skater {
                id: SkaterId(12),
                name: "Sam Lee".to_string(),
                team: TeamId(1),
            },
        ];
        IdentityResolver::new(teams, skaters)
    }

    fn entry(placement: u32, name: &str, affiliation: Option<&str>) -> StandingsEntry {
        StandingsEntry {
            placement,
            competitor_name: name.to_string(),
            affiliation: affiliation.map(str::to_string),
        }
    }

    #[test]
    fn test_resolves_team_and_skater() {
        let resolution = resolver().resolve(&entry(3, "Jane Doe", Some("State University")), 8);
        assert_eq!(
            resolution,
            Resolution::Resolved(ResolvedEntry {
                placement: 3,
                field_size: 8,
                competitor_name: "Jane Doe".to_string(),
                team: TeamId(1),
                skater: Some(SkaterId(10)),
            })
        );
    }

    #[test]
    fn test_unknown_affiliation_is_dropped() {
        let resolver = resolver();
        assert_eq!(
            resolver.resolve(&entry(1, "Ana Ruiz", Some("Other College")), 4),
            Resolution::UnknownTeam
        );
        assert_eq!(
            resolver.resolve(&entry(1, "Ana Ruiz", None), 4),
            Resolution::UnknownTeam
        );
    }

    #[test]
    fn test_unknown_skater_keeps_result() {
        match resolver().resolve(&entry(2, "New Skater", Some("Tech Institute")), 4) {
            Resolution::Resolved(resolved) => {
                assert_eq!(resolved.team, TeamId(2));
                assert_eq!(resolved.skater, None);
            }
            other => panic!("expected resolved entry, got {:?}", other),
        }
    }

    #[test]
    fn test_shared_skater_name_uses_team_roster() {
        let resolver = resolver();
        assert_eq!(resolver.resolve_skater("Sam Lee", TeamId(1)), Some(SkaterId(12)));
        assert_eq!(resolver.resolve_skater("Sam Lee", TeamId(2)), Some(SkaterId(11)));
        // Jane is on State's roster only
        assert_eq!(resolver.resolve_skater("Jane Doe", TeamId(2)), None);
    }

    #[test]
    fn test_team_match_falls_back_to_case_insensitive() {
        let resolver = resolver();
        assert_eq!(resolver.resolve_team("tech institute").unwrap().id, TeamId(2));
        assert!(resolver.resolve_team("Tech").is_none());
    }

    #[test]
    fn test_missing_name_is_dropped() {
        assert_eq!(
            resolver().resolve(&entry(2, "", Some("State University")), 4),
            Resolution::MissingName
        );
    }
}
