//! Catalog refresh for followed shows.
//!
//! Reconciliation only appends: new episodes at the end of the last stored
//! season, then whole new seasons. Existing rows, and so every watched flag,
//! are never touched.

use crate::catalog::{Catalog, CatalogSeason};
use crate::db;
use crate::error::{Result, TrackerError};
use crate::models::{Episode, SeasonTree, ShowTree};
use crate::progress;
use crate::tracker::Tracker;
use crate::watch::{new_episode, season_tree};

use chrono::NaiveDate;
use diesel::SqliteConnection;
use log::*;
use std::collections::HashSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    UpToDate,
    Updated { episodes: usize, seasons: usize },
}

#[derive(Debug)]
pub struct ShowSync {
    pub show_id: i64,
    pub name: String,
    pub result: Result<SyncOutcome>,
}

/// Per-show results of one batch run, in the order shows were processed.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub shows: Vec<ShowSync>,
}

impl SyncReport {
    pub fn failures(&self) -> impl Iterator<Item = &ShowSync> {
        self.shows.iter().filter(|s| s.result.is_err())
    }

    pub fn updated(&self) -> impl Iterator<Item = &ShowSync> {
        self.shows
            .iter()
            .filter(|s| matches!(s.result, Ok(SyncOutcome::Updated { .. })))
    }
}

/// Rows one reconciliation adds to a show.
#[derive(Debug, Default, PartialEq)]
pub struct SyncPlan {
    pub show_id: i64,
    pub new_episodes: Vec<Episode>,
    pub new_seasons: Vec<SeasonTree>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.new_episodes.is_empty() && self.new_seasons.is_empty()
    }
}

/// Whether the catalog has aired something after our latest stored episode.
pub fn needs_refresh(
    catalog_last_aired: Option<NaiveDate>,
    local_latest: Option<NaiveDate>,
) -> bool {
    match (catalog_last_aired, local_latest) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(catalog), Some(local)) => catalog > local,
    }
}

/// The season sync extends: the one numbered like the show's season count,
/// or failing that the highest stored one.
pub fn local_last_season(show: &ShowTree) -> Option<&SeasonTree> {
    show.season(show.show.season_count)
        .or_else(|| show.seasons.iter().max_by_key(|s| s.season.number))
}

/// Catalog episodes past the stored count of `local`, minus any we already
/// hold under the same id or number.
pub fn missing_episodes(local: &SeasonTree, fresh: &CatalogSeason) -> Vec<Episode> {
    let stored = local.season.episode_count;
    let missing = fresh.episode_count() - stored;
    if missing <= 0 {
        return vec![];
    }

    let known_ids: HashSet<i64> = local.episodes.iter().map(|e| e.id).collect();
    let known_numbers: HashSet<i32> = local.episodes.iter().map(|e| e.number).collect();

    fresh
        .episodes
        .iter()
        .skip(stored.max(0) as usize)
        .take(missing as usize)
        .filter(|e| !known_ids.contains(&e.id) && !known_numbers.contains(&e.episode_number))
        .map(|e| new_episode(local.season.show_id, local.season.id, e))
        .collect()
}

/// Write a plan and bring the stored counts in line; must run inside a
/// transaction.
pub fn apply_plan(ctx: &mut SqliteConnection, plan: &SyncPlan) -> Result<SyncOutcome> {
    if !db::show_exists(ctx, plan.show_id)? {
        return Err(TrackerError::show_not_found(plan.show_id));
    }

    let episodes = db::append_episodes(ctx, &plan.new_episodes)?;
    db::append_seasons(ctx, &plan.new_seasons)?;
    db::refresh_counts(ctx, plan.show_id)?;

    Ok(SyncOutcome::Updated {
        episodes,
        seasons: plan.new_seasons.len(),
    })
}

impl<C: Catalog> Tracker<C> {
    /// Refresh every followed show. One show failing is logged and recorded
    /// in the report; the batch carries on.
    pub async fn sync_all(&self) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        for show in self.db.list_shows().await? {
            let result = self.sync_show(show.id).await;
            match &result {
                Ok(SyncOutcome::UpToDate) => debug!("{} is up to date", show.name),
                Ok(SyncOutcome::Updated { episodes, seasons }) => info!(
                    "{}: appended {} episodes and {} seasons",
                    show.name, episodes, seasons
                ),
                Err(err) => warn!("Failed to sync {} ({}): {}", show.name, show.id, err),
            }
            report.shows.push(ShowSync {
                show_id: show.id,
                name: show.name,
                result,
            });
        }

        info!(
            "Synced {} shows, {} updated, {} failed",
            report.shows.len(),
            report.updated().count(),
            report.failures().count()
        );
        Ok(report)
    }

    /// Refresh one show from the catalog. All fetching happens first; the
    /// additions then commit in a single transaction, or not at all.
    pub async fn sync_show(&self, show_id: i64) -> Result<SyncOutcome> {
        let local = self.get_show(show_id).await?;
        let catalog_show = self.fetch_show(show_id).await?;

        // An announced episode dated past today would hold back every
        // refresh until it airs, so compare against what has aired.
        let today = Self::today();
        let latest_local = match self
            .db
            .latest_local_episode(show_id)
            .await?
            .and_then(|e| e.air_date)
        {
            Some(date) if date > today => {
                progress::last_aired(&local, today).and_then(|e| e.air_date)
            }
            other => other,
        };
        if !needs_refresh(catalog_show.last_air_date, latest_local) {
            return Ok(SyncOutcome::UpToDate);
        }

        let mut plan = SyncPlan {
            show_id,
            ..Default::default()
        };

        let last_season = local_last_season(&local);
        if let Some(last) = last_season {
            let fresh = self.fetch_season(show_id, last.season.number).await?;
            plan.new_episodes = missing_episodes(last, &fresh);
        }

        if catalog_show.number_of_seasons > local.show.season_count {
            let last_number = last_season.map_or(0, |s| s.season.number);
            let numbers: Vec<i32> = catalog_show
                .seasons
                .iter()
                .map(|s| s.season_number)
                .filter(|&n| n > last_number)
                .collect();
            plan.new_seasons = self
                .fetch_seasons(show_id, &numbers)
                .await?
                .iter()
                .map(|s| season_tree(show_id, s))
                .collect();
        }

        if plan.is_empty() {
            return Ok(SyncOutcome::UpToDate);
        }

        self.db.transaction(|ctx| apply_plan(ctx, &plan)).await
    }
}
