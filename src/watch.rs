//! Watch-state changes: following a show, marking episodes watched,
//! resetting and removing.
//!
//! Catalog requests always complete before the store transaction opens, so
//! a failed fetch never leaves a partially followed show behind.

use crate::catalog::{Catalog, CatalogEpisode, CatalogSeason, CatalogShow};
use crate::db;
use crate::error::{Result, TrackerError};
use crate::models::{Episode, Season, SeasonTree, Show, ShowTree};
use crate::tracker::Tracker;

use chrono::NaiveDate;
use diesel::SqliteConnection;
use log::*;

pub(crate) fn new_episode(show_id: i64, season_id: i64, raw: &CatalogEpisode) -> Episode {
    Episode {
        id: raw.id,
        show_id,
        season_id,
        number: raw.episode_number,
        air_date: raw.air_date,
        watched: false,
        watch_date: None,
    }
}

pub(crate) fn season_tree(show_id: i64, raw: &CatalogSeason) -> SeasonTree {
    SeasonTree {
        season: Season {
            id: raw.id,
            show_id,
            number: raw.season_number,
            air_date: raw.air_date,
            episode_count: raw.episode_count(),
        },
        episodes: raw
            .episodes
            .iter()
            .map(|e| new_episode(show_id, raw.id, e))
            .collect(),
    }
}

/// Season numbers worth importing: season 0 holds specials and is skipped.
pub(crate) fn regular_seasons(show: &CatalogShow) -> Vec<i32> {
    show.seasons
        .iter()
        .map(|s| s.season_number)
        .filter(|&n| n > 0)
        .collect()
}

pub(crate) fn show_tree(show: &CatalogShow, seasons: &[CatalogSeason]) -> ShowTree {
    let mut seasons: Vec<SeasonTree> = seasons.iter().map(|s| season_tree(show.id, s)).collect();
    seasons.sort_by_key(|s| s.season.number);

    ShowTree {
        show: Show {
            id: show.id,
            name: show.name.clone(),
            season_count: seasons.len() as i32,
        },
        seasons,
    }
}

/// Ids of the episodes "watched through" episode `episode_number` of season
/// `season_number`: all of every earlier season, plus the target season up
/// to and including the target. Air dates play no part.
pub fn episodes_through(show: &ShowTree, season_number: i32, episode_number: i32) -> Vec<i64> {
    show.episodes()
        .filter(|(season, episode)| {
            season.number < season_number
                || (season.number == season_number && episode.number <= episode_number)
        })
        .map(|(_, episode)| episode.id)
        .collect()
}

/// Mark everything up to `episode_id` watched. Returns how many episodes
/// changed; must run inside a transaction.
pub fn mark_watched_through(
    ctx: &mut SqliteConnection,
    show_id: i64,
    episode_id: i64,
    today: NaiveDate,
) -> Result<usize> {
    let show = db::load_show_tree(ctx, show_id)?
        .ok_or_else(|| TrackerError::show_not_found(show_id))?;
    let episode = db::find_episode(ctx, episode_id)?
        .ok_or_else(|| TrackerError::episode_not_found(episode_id))?;

    let (season, _) = show
        .find_episode(episode.id)
        .filter(|_| episode.show_id == show_id)
        .ok_or(TrackerError::EpisodeNotInShow {
            show_id,
            episode_id,
        })?;

    let targets = episodes_through(&show, season.number, episode.number);
    db::set_watched(ctx, &targets, today)
}

pub fn reset_show(ctx: &mut SqliteConnection, show_id: i64) -> Result<usize> {
    if !db::show_exists(ctx, show_id)? {
        return Err(TrackerError::show_not_found(show_id));
    }
    db::clear_watched(ctx, show_id)
}

impl<C: Catalog> Tracker<C> {
    /// Follow a show: fetch it and every regular season from the catalog,
    /// then store the whole subtree at once.
    pub async fn add_show_from_catalog(&self, catalog_id: i64) -> Result<ShowTree> {
        if self
            .db
            .transaction(|ctx| db::show_exists(ctx, catalog_id))
            .await?
        {
            return Err(TrackerError::AlreadyFollowed(catalog_id));
        }

        info!("Getting show {} from the catalog", catalog_id);
        let show = self.fetch_show(catalog_id).await?;
        let seasons = self.fetch_seasons(show.id, &regular_seasons(&show)).await?;

        let tree = show_tree(&show, &seasons);
        self.db.add_show(&tree).await?;

        info!(
            "Added show {} ({}) with {} seasons",
            tree.show.id,
            tree.show.name,
            tree.seasons.len()
        );
        Ok(tree)
    }

    /// Mark `episode_id` and everything before it watched.
    pub async fn mark_watched_through(&self, show_id: i64, episode_id: i64) -> Result<usize> {
        let today = Self::today();
        let changed = self
            .db
            .transaction(|ctx| mark_watched_through(ctx, show_id, episode_id, today))
            .await?;

        info!(
            "Marked {} episodes of show {} watched through episode {}",
            changed, show_id, episode_id
        );
        Ok(changed)
    }

    pub async fn reset_show(&self, show_id: i64) -> Result<usize> {
        let cleared = self
            .db
            .transaction(|ctx| reset_show(ctx, show_id))
            .await?;

        info!("Reset show {} ({} episodes)", show_id, cleared);
        Ok(cleared)
    }

    /// Stop following a show. Returns `false` if it wasn't followed.
    pub async fn remove_show(&self, show_id: i64) -> Result<bool> {
        match self.db.remove_show(show_id).await {
            Ok(()) => {
                info!("Removed show {}", show_id);
                Ok(true)
            }
            Err(TrackerError::NotFound { .. }) => {
                info!("Show {} was not followed, nothing to remove", show_id);
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }
}
