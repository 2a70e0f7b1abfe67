//! Track which episodes of followed TV shows have been watched, with show
//! metadata sourced from TMDB.

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod progress;
pub mod schema;
pub mod sync;
pub mod tracker;
pub mod watch;

pub use catalog::{tmdb::TmdbClient, Catalog};
pub use config::Config;
pub use db::Database;
pub use error::{Result, TrackerError};
pub use tracker::Tracker;
