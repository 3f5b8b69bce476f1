//! Web scrapers for published competition results

pub mod standings;

pub use standings::{parse_standings, Standings, StandingsEntry, StandingsScraper};
