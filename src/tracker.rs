use crate::catalog::{Catalog, CatalogSeason, CatalogShow, CatalogShowSummary};
use crate::config::MAX_UPCOMING_DAYS;
use crate::db::{Database, UpcomingEpisode};
use crate::error::{Result, TrackerError};
use crate::models::{Show, ShowTree};
use crate::progress::{self, ShowProgress};

use chrono::{Days, Local, NaiveDate};
use futures::future::try_join_all;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use log::*;
use std::num::NonZeroU32;

/// Everything a front end needs: the store, the catalog, and the rules
/// tying them together.
///
/// Watch-state changes live in [`crate::watch`], catalog refresh in
/// [`crate::sync`].
pub struct Tracker<C> {
    pub(crate) db: Database,
    pub(crate) catalog: C,
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl<C: Catalog> Tracker<C> {
    /// `rate` caps catalog requests per second.
    pub fn new(db: Database, catalog: C, rate: NonZeroU32) -> Self {
        Tracker {
            db,
            catalog,
            limiter: RateLimiter::direct(Quota::per_second(rate)),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    /// Search the catalog by title. Hits come back in the catalog's order.
    pub async fn search_shows(&self, query: &str) -> Result<Vec<CatalogShowSummary>> {
        self.limiter.until_ready().await;
        let hits = self.catalog.search_shows(query).await?;
        info!("Search {:?} returned {} shows", query, hits.len());
        Ok(hits)
    }

    /// Followed shows, by name.
    pub async fn list_shows(&self) -> Result<Vec<Show>> {
        self.db.list_shows().await
    }

    /// Progress of every followed show, by name.
    pub async fn list_summaries(&self) -> Result<Vec<ShowProgress>> {
        let today = Self::today();
        let mut summaries = vec![];
        for show in self.db.list_shows().await? {
            if let Some(tree) = self.db.get_show(show.id).await? {
                summaries.push(progress::summarize(&tree, today));
            }
        }
        Ok(summaries)
    }

    pub async fn get_show(&self, show_id: i64) -> Result<ShowTree> {
        self.db
            .get_show(show_id)
            .await?
            .ok_or_else(|| TrackerError::show_not_found(show_id))
    }

    /// Episodes airing from today through `days` days ahead, capped at
    /// [`MAX_UPCOMING_DAYS`].
    pub async fn upcoming(&self, days: i64) -> Result<Vec<UpcomingEpisode>> {
        let today = Self::today();
        let days = days.clamp(0, MAX_UPCOMING_DAYS) as u64;
        let until = today.checked_add_days(Days::new(days)).unwrap_or(today);
        self.db.upcoming_episodes(today, until).await
    }

    pub(crate) async fn fetch_show(&self, show_id: i64) -> Result<CatalogShow> {
        self.limiter.until_ready().await;
        self.catalog.get_show(show_id).await?.ok_or_else(|| {
            warn!("Got nothing when asking the catalog for show {}", show_id);
            TrackerError::CatalogLookupFailed(format!("show {}", show_id))
        })
    }

    pub(crate) async fn fetch_season(&self, show_id: i64, number: i32) -> Result<CatalogSeason> {
        self.limiter.until_ready().await;
        self.catalog
            .get_season(show_id, number)
            .await?
            .ok_or_else(|| {
                warn!(
                    "Got nothing when asking the catalog for season {} of show {}",
                    number, show_id
                );
                TrackerError::CatalogLookupFailed(format!("season {} of show {}", number, show_id))
            })
    }

    /// Fetch several seasons concurrently; the first failure fails them all.
    pub(crate) async fn fetch_seasons(
        &self,
        show_id: i64,
        numbers: &[i32],
    ) -> Result<Vec<CatalogSeason>> {
        try_join_all(numbers.iter().map(|&n| self.fetch_season(show_id, n))).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::fake::FakeCatalog;
    use chrono::Duration;
    use nonzero_ext::nonzero;

    pub fn tracker(catalog: FakeCatalog) -> Tracker<FakeCatalog> {
        Tracker::new(Database::in_memory().unwrap(), catalog, nonzero!(1000u32))
    }

    pub fn past(day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2010, 1, day)
    }

    pub fn future(day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2999, 1, day)
    }

    #[tokio::test]
    async fn search_passes_catalog_hits_through() {
        let catalog = FakeCatalog::new();
        catalog.put_show(7, "The Wire", &[(1, vec![past(1)])]);
        catalog.put_show(3, "Wired", &[]);
        let tracker = tracker(catalog);

        let hits = tracker.search_shows("wire").await.unwrap();
        assert_eq!(hits.iter().map(|h| h.id).collect::<Vec<_>>(), vec![3, 7]);
        assert!(tracker.search_shows("nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_show_is_not_found() {
        let tracker = tracker(FakeCatalog::new());
        assert!(matches!(
            tracker.get_show(5).await,
            Err(TrackerError::NotFound { kind: "show", id: 5 })
        ));
    }

    #[tokio::test]
    async fn missing_catalog_season_is_a_lookup_failure() {
        let catalog = FakeCatalog::new();
        catalog.put_show(7, "The Wire", &[(1, vec![past(1)]), (2, vec![past(2)])]);
        catalog.fail_season(7, 2);
        let tracker = tracker(catalog);

        assert!(matches!(
            tracker.fetch_seasons(7, &[1, 2]).await,
            Err(TrackerError::CatalogLookupFailed(_))
        ));
    }

    #[tokio::test]
    async fn upcoming_lists_episodes_inside_the_window() {
        let today = Tracker::<FakeCatalog>::today();
        let catalog = FakeCatalog::new();
        catalog.put_show(
            7,
            "The Wire",
            &[(
                1,
                vec![
                    past(1),
                    Some(today),
                    Some(today + Duration::days(7)),
                    Some(today + Duration::days(8)),
                ],
            )],
        );
        let tracker = tracker(catalog);
        tracker.add_show_from_catalog(7).await.unwrap();

        let upcoming = tracker.upcoming(7).await.unwrap();
        let labels: Vec<String> = upcoming.iter().map(|u| u.label().to_string()).collect();
        assert_eq!(labels, vec!["S01E02", "S01E03"]);
    }

    #[tokio::test]
    async fn huge_upcoming_window_is_capped() {
        let catalog = FakeCatalog::new();
        let today = Tracker::<FakeCatalog>::today();
        let later = Some(today + Duration::days(1000));
        catalog.put_show(7, "The Wire", &[(1, vec![past(1), later, future(1)])]);
        let tracker = tracker(catalog);
        tracker.add_show_from_catalog(7).await.unwrap();

        for days in [i64::MAX / 86_400_000, i64::MAX] {
            let upcoming = tracker.upcoming(days).await.unwrap();
            let labels: Vec<String> = upcoming.iter().map(|u| u.label().to_string()).collect();
            assert_eq!(labels, vec!["S01E02"]);
        }
        assert!(tracker.upcoming(-3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn summaries_follow_name_order() {
        let catalog = FakeCatalog::new();
        catalog.put_show(1, "Lost", &[(1, vec![past(1), past(2)])]);
        catalog.put_show(2, "Fargo", &[(1, vec![past(1)])]);
        let tracker = tracker(catalog);
        tracker.add_show_from_catalog(1).await.unwrap();
        tracker.add_show_from_catalog(2).await.unwrap();
        tracker.mark_watched_through(1, 10101).await.unwrap();

        let summaries = tracker.list_summaries().await.unwrap();
        let names: Vec<&str> = summaries.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Fargo", "Lost"]);
        assert_eq!(summaries[0].progression, 0.0);
        assert_eq!(summaries[1].progression, 50.0);
    }
}
