//! In-memory catalog for exercising add and sync without the network.

use super::{
    Catalog, CatalogEpisode, CatalogSeason, CatalogSeasonSummary, CatalogShow, CatalogShowSummary,
};
use crate::error::Result;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
struct Inner {
    shows: HashMap<i64, CatalogShow>,
    seasons: HashMap<(i64, i32), CatalogSeason>,
    missing_seasons: HashSet<(i64, i32)>,
    requests: usize,
}

#[derive(Default)]
pub struct FakeCatalog {
    inner: Mutex<Inner>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a show, with one season per entry in `seasons`. Season ids are
    /// `show_id * 100 + number`, episode ids `season_id * 100 + number`.
    pub fn put_show(&self, id: i64, name: &str, seasons: &[(i32, Vec<Option<NaiveDate>>)]) {
        let mut inner = self.inner.lock().unwrap();
        let mut summaries = vec![];
        for (number, dates) in seasons {
            let season_id = id * 100 + *number as i64;
            let episodes = dates
                .iter()
                .enumerate()
                .map(|(i, air_date)| CatalogEpisode {
                    id: season_id * 100 + i as i64 + 1,
                    episode_number: i as i32 + 1,
                    air_date: *air_date,
                })
                .collect::<Vec<_>>();
            let air_date = dates.first().copied().flatten();
            summaries.push(CatalogSeasonSummary {
                id: season_id,
                season_number: *number,
                episode_count: episodes.len() as i32,
                air_date,
            });
            inner.seasons.insert(
                (id, *number),
                CatalogSeason {
                    id: season_id,
                    season_number: *number,
                    air_date,
                    episodes,
                },
            );
        }
        let today = Local::now().date_naive();
        let last_air_date = inner
            .seasons
            .iter()
            .filter(|((show, _), _)| *show == id)
            .flat_map(|(_, s)| s.episodes.iter().filter_map(|e| e.air_date))
            .filter(|&date| date <= today)
            .max();
        inner.shows.insert(
            id,
            CatalogShow {
                id,
                name: name.to_string(),
                number_of_seasons: summaries.iter().filter(|s| s.season_number > 0).count() as i32,
                last_air_date,
                seasons: summaries,
            },
        );
    }

    pub fn remove_show(&self, id: i64) {
        let mut inner = self.inner.lock().unwrap();
        inner.shows.remove(&id);
        inner.seasons.retain(|(show, _), _| *show != id);
    }

    /// Make the next lookups of this season answer "not found".
    pub fn fail_season(&self, show_id: i64, number: i32) {
        self.inner
            .lock()
            .unwrap()
            .missing_seasons
            .insert((show_id, number));
    }

    pub fn requests(&self) -> usize {
        self.inner.lock().unwrap().requests
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn search_shows(&self, query: &str) -> Result<Vec<CatalogShowSummary>> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests += 1;
        let mut hits: Vec<CatalogShowSummary> = inner
            .shows
            .values()
            .filter(|s| s.name.to_lowercase().contains(&query.to_lowercase()))
            .map(|s| CatalogShowSummary {
                id: s.id,
                name: s.name.clone(),
                first_air_date: None,
                overview: String::new(),
            })
            .collect();
        hits.sort_by_key(|h| h.id);
        Ok(hits)
    }

    async fn get_show(&self, id: i64) -> Result<Option<CatalogShow>> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests += 1;
        Ok(inner.shows.get(&id).cloned())
    }

    async fn get_season(&self, show_id: i64, season_number: i32) -> Result<Option<CatalogSeason>> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests += 1;
        if inner.missing_seasons.contains(&(show_id, season_number)) {
            return Ok(None);
        }
        Ok(inner.seasons.get(&(show_id, season_number)).cloned())
    }
}
