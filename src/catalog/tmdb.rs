/// Deal with the TMDB API:
/// - build an HTTP client from explicit configuration
/// - query search / show / season endpoints
/// - validate raw payloads into catalog types
use super::{
    parse_catalog_date, Catalog, CatalogEpisode, CatalogSeason, CatalogSeasonSummary, CatalogShow,
    CatalogShowSummary,
};
use crate::config::CatalogConfig;
use crate::error::{Result, TrackerError};

use async_trait::async_trait;
use log::*;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

const APP_USER_AGENT: &str = "Paon TV Tracker";

// search/tv?query=...
#[derive(Deserialize, Debug)]
struct ApiSearchResponse {
    #[serde(default)]
    results: Vec<ApiShowMatch>,
}

#[derive(Deserialize, Debug)]
struct ApiShowMatch {
    id: i64,
    name: String,
    first_air_date: Option<String>,
    overview: Option<String>,
}

// tv/<id>
#[derive(Deserialize, Debug)]
struct ApiShowDetails {
    id: i64,
    name: String,
    number_of_seasons: i32,
    last_air_date: Option<String>,
    #[serde(default)]
    seasons: Vec<ApiSeasonSummary>,
}

#[derive(Deserialize, Debug)]
struct ApiSeasonSummary {
    id: i64,
    season_number: i32,
    #[serde(default)]
    episode_count: i32,
    air_date: Option<String>,
}

// tv/<id>/season/<number>
#[derive(Deserialize, Debug)]
struct ApiSeasonDetails {
    id: i64,
    season_number: i32,
    air_date: Option<String>,
    #[serde(default)]
    episodes: Vec<ApiEpisode>,
}

#[derive(Deserialize, Debug)]
struct ApiEpisode {
    id: i64,
    episode_number: i32,
    air_date: Option<String>,
}

impl TryFrom<ApiShowMatch> for CatalogShowSummary {
    type Error = TrackerError;

    fn try_from(raw: ApiShowMatch) -> Result<Self> {
        Ok(CatalogShowSummary {
            id: raw.id,
            first_air_date: parse_catalog_date(raw.first_air_date.as_deref())?,
            name: raw.name,
            overview: raw.overview.unwrap_or_default(),
        })
    }
}

impl TryFrom<ApiShowDetails> for CatalogShow {
    type Error = TrackerError;

    fn try_from(raw: ApiShowDetails) -> Result<Self> {
        let seasons = raw
            .seasons
            .into_iter()
            .map(|s| {
                Ok(CatalogSeasonSummary {
                    id: s.id,
                    season_number: s.season_number,
                    episode_count: s.episode_count,
                    air_date: parse_catalog_date(s.air_date.as_deref())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CatalogShow {
            id: raw.id,
            name: raw.name,
            number_of_seasons: raw.number_of_seasons,
            last_air_date: parse_catalog_date(raw.last_air_date.as_deref())?,
            seasons,
        })
    }
}

impl TryFrom<ApiSeasonDetails> for CatalogSeason {
    type Error = TrackerError;

    fn try_from(raw: ApiSeasonDetails) -> Result<Self> {
        let episodes = raw
            .episodes
            .into_iter()
            .map(|e| {
                Ok(CatalogEpisode {
                    id: e.id,
                    episode_number: e.episode_number,
                    air_date: parse_catalog_date(e.air_date.as_deref())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CatalogSeason {
            id: raw.id,
            season_number: raw.season_number,
            air_date: parse_catalog_date(raw.air_date.as_deref())?,
            episodes,
        })
    }
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str::<T>(text).map_err(|err| {
        info!("Failed to parse: {}", err);
        TrackerError::CatalogDataInvalid(err.to_string())
    })
}

/// HTTP client for the TMDB v3 API.
#[derive(Debug)]
pub struct TmdbClient {
    client: Client,
    config: CatalogConfig,
}

impl TmdbClient {
    pub fn new(config: CatalogConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "Content-Type",
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(TmdbClient { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// GET a catalog resource. Any non-200 answer is `None`, the caller
    /// decides whether that means "no results" or a failed lookup.
    async fn query<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Option<T>> {
        let response = self
            .client
            .get(self.url(path))
            .query(&[
                ("api_key", self.config.api_key.as_str()),
                ("language", self.config.language.as_str()),
            ])
            .query(params)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let text = response.text().await?;
                decode(&text).map(Some)
            }
            StatusCode::UNAUTHORIZED => {
                warn!("Catalog rejected the API key for {}", path);
                Ok(None)
            }
            other => {
                info!("Catalog request {} answered {}", path, other);
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl Catalog for TmdbClient {
    async fn search_shows(&self, query: &str) -> Result<Vec<CatalogShowSummary>> {
        let found: Option<ApiSearchResponse> = self.query("search/tv", &[("query", query)]).await?;

        match found {
            Some(response) => response
                .results
                .into_iter()
                .map(CatalogShowSummary::try_from)
                .collect(),
            None => Ok(vec![]),
        }
    }

    async fn get_show(&self, id: i64) -> Result<Option<CatalogShow>> {
        let found: Option<ApiShowDetails> = self.query(&format!("tv/{}", id), &[]).await?;
        found.map(CatalogShow::try_from).transpose()
    }

    async fn get_season(&self, show_id: i64, season_number: i32) -> Result<Option<CatalogSeason>> {
        let path = format!("tv/{}/season/{}", show_id, season_number);
        let found: Option<ApiSeasonDetails> = self.query(&path, &[]).await?;
        found.map(CatalogSeason::try_from).transpose()
    }
}
