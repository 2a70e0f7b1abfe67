/// Read-only access to the show catalog:
/// - typed catalog data, validated at the boundary
/// - the `Catalog` trait the tracker consumes
/// - the TMDB implementation
pub mod tmdb;

#[cfg(test)]
pub(crate) mod fake;

use crate::error::{Result, TrackerError};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;

const CATALOG_DATE_FORMAT: &str = "%Y-%m-%d";

/// One search hit. Order of hits is the catalog's relevance order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CatalogShowSummary {
    pub id: i64,
    pub name: String,
    pub first_air_date: Option<NaiveDate>,
    pub overview: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CatalogSeasonSummary {
    pub id: i64,
    pub season_number: i32,
    pub episode_count: i32,
    pub air_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CatalogShow {
    pub id: i64,
    pub name: String,
    pub number_of_seasons: i32,
    pub last_air_date: Option<NaiveDate>,
    pub seasons: Vec<CatalogSeasonSummary>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CatalogEpisode {
    pub id: i64,
    pub episode_number: i32,
    pub air_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CatalogSeason {
    pub id: i64,
    pub season_number: i32,
    pub air_date: Option<NaiveDate>,
    pub episodes: Vec<CatalogEpisode>,
}

impl CatalogSeason {
    pub fn episode_count(&self) -> i32 {
        self.episodes.len() as i32
    }
}

/// The external metadata provider.
///
/// Single-entity lookups answer `Ok(None)` when the provider has no such
/// show or season; search answers an empty list. Only transport failures and
/// malformed payloads are errors.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn search_shows(&self, query: &str) -> Result<Vec<CatalogShowSummary>>;

    async fn get_show(&self, id: i64) -> Result<Option<CatalogShow>>;

    async fn get_season(&self, show_id: i64, season_number: i32) -> Result<Option<CatalogSeason>>;
}

/// Parse a catalog `YYYY-MM-DD` date. Missing and empty dates are unknown,
/// anything else that doesn't parse is invalid data.
pub fn parse_catalog_date(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => NaiveDate::parse_from_str(text, CATALOG_DATE_FORMAT)
            .map(Some)
            .map_err(|err| TrackerError::CatalogDataInvalid(format!("bad date {text:?}: {err}"))),
    }
}
