//! Placement to points conversion
//!
//! The points table is sparse and matched exactly on `(placement, field_size)`.
//! A pair the table does not cover scores zero; neighbouring field sizes or
//! placements are never used to fill the gap.

use crate::{PointsEntry, Result};
use std::collections::HashMap;

/// Exact-match points source
pub trait PointsLookup {
    fn lookup(&self, placement: u32, field_size: u32) -> Result<Option<f64>>;
}

/// In-memory points table, loaded once per ingestion
#[derive(Debug, Clone, Default)]
pub struct PointsTable {
    entries: HashMap<(u32, u32), f64>,
}

impl PointsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, placement: u32, field_size: u32, points: f64) {
        self.entries.insert((placement, field_size), points);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl FromIterator<PointsEntry> for PointsTable {
    fn from_iter<I: IntoIterator<Item = PointsEntry>>(iter: I) -> Self {
        let mut table = PointsTable::new();
        for entry in iter {
            table.insert(entry.placement, entry.field_size, entry.points);
        }
        table
    }
}

impl PointsLookup for PointsTable {
    fn lookup(&self, placement: u32, field_size: u32) -> Result<Option<f64>> {
        Ok(self.entries.get(&(placement, field_size)).copied())
    }
}

/// Outcome of a points lookup for one placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointsAward {
    /// The table has an exact entry
    Table(f64),
    /// No entry for this pair; scores zero
    MissingEntry,
}

impl PointsAward {
    pub fn points(&self) -> f64 {
        match self {
            PointsAward::Table(points) => *points,
            PointsAward::MissingEntry => 0.0,
        }
    }
}

/// Look up the points a placement earns in a field of `field_size`
pub fn award<L: PointsLookup + ?Sized>(
    lookup: &L,
    placement: u32,
    field_size: u32,
) -> Result<PointsAward> {
    Ok(match lookup.lookup(placement, field_size)? {
        Some(points) => PointsAward::Table(points),
        None => PointsAward::MissingEntry,
    })
}
