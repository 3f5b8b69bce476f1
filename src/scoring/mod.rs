//! Scoring pipeline
//!
//! Identity resolution and points conversion for parsed standings, and per-team
//! aggregation over a competition's stored results.

pub mod aggregate;
pub mod identity;
pub mod ingest;
pub mod points;

pub use aggregate::{aggregate, ScoreAggregator, TeamSummary};
pub use identity::{IdentityResolver, Resolution, ResolvedEntry};
pub use ingest::{ingest_standings, IngestReport, Ingestor, ResultStore};
pub use points::{PointsAward, PointsLookup, PointsTable};
