//! Read-only watch progress over an already loaded show.
//!
//! Nothing here touches the store or the catalog: every function takes the
//! subtree and `today`, so results are deterministic for a given date.

use crate::models::{Episode, EpisodeLabel, SeasonTree, ShowTree};

use chrono::NaiveDate;
use serde::Serialize;

/// Aired episodes of the season the user hasn't watched yet.
pub fn season_not_seen(season: &SeasonTree, today: NaiveDate) -> Vec<&Episode> {
    season
        .episodes
        .iter()
        .filter(|e| !e.watched && e.has_aired(today))
        .collect()
}

pub fn season_seen(season: &SeasonTree) -> Vec<&Episode> {
    season.episodes.iter().filter(|e| e.watched).collect()
}

/// Not-seen episodes of the whole show, in (season, episode) order.
pub fn not_seen(show: &ShowTree, today: NaiveDate) -> Vec<&Episode> {
    show.seasons
        .iter()
        .flat_map(|s| season_not_seen(s, today))
        .collect()
}

/// Seen episodes of the whole show, in (season, episode) order.
pub fn seen(show: &ShowTree) -> Vec<&Episode> {
    show.seasons.iter().flat_map(season_seen).collect()
}

fn ratio(seen: usize, not_seen: usize) -> f64 {
    if not_seen == 0 {
        return 100.0;
    }
    100.0 * seen as f64 / (seen + not_seen) as f64
}

/// Percentage of aired episodes watched, in `[0, 100]`. A show with nothing
/// left to watch is at 100.
pub fn progression(show: &ShowTree, today: NaiveDate) -> f64 {
    ratio(seen(show).len(), not_seen(show, today).len())
}

pub fn season_progression(season: &SeasonTree, today: NaiveDate) -> f64 {
    ratio(season_seen(season).len(), season_not_seen(season, today).len())
}

/// Most recent aired episode. Same-day episodes resolve to the higher number.
pub fn last_aired(show: &ShowTree, today: NaiveDate) -> Option<&Episode> {
    show.episodes()
        .map(|(_, e)| e)
        .filter(|e| e.has_aired(today))
        .max_by_key(|e| e.recency())
}

/// Most recent watched episode, by air date then number.
pub fn last_seen(show: &ShowTree) -> Option<&Episode> {
    show.episodes()
        .map(|(_, e)| e)
        .filter(|e| e.watched)
        .max_by_key(|e| e.recency())
}

/// What a listing of followed shows displays for one show.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ShowProgress {
    pub show_id: i64,
    pub name: String,
    pub progression: f64,
    pub seen: usize,
    pub not_seen: usize,
    pub last_aired: Option<EpisodeLabel>,
    pub last_seen: Option<EpisodeLabel>,
}

pub fn summarize(show: &ShowTree, today: NaiveDate) -> ShowProgress {
    let label = |episode: &Episode| {
        show.seasons
            .iter()
            .find(|s| s.season.id == episode.season_id)
            .map(|s| EpisodeLabel::new(&s.season, episode))
    };

    ShowProgress {
        show_id: show.show.id,
        name: show.show.name.clone(),
        progression: progression(show, today),
        seen: seen(show).len(),
        not_seen: not_seen(show, today).len(),
        last_aired: last_aired(show, today).and_then(label),
        last_seen: last_seen(show).and_then(label),
    }
}
