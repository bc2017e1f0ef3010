//! # vidvault_core
//!
//! Core domain logic for vidvault: credentials, video records, media
//! staging and the upload ingestion pipeline.

pub mod auth;
pub mod db;
pub mod ingest;
pub mod media;
pub mod migrate;
pub mod models;
pub mod storage;
pub mod videos;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
