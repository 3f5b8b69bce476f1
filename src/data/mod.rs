//! Data ingestion and storage
//!
//! Results page scraping, SQLite storage and reference data seeding.

pub mod database;
pub mod scrapers;
pub mod seed;

pub use database::Database;
pub use seed::SeedFile;
