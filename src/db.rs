/// The entity store: owns the Show -> Season -> Episode graph in SQLite.
///
/// Query helpers take a `&mut SqliteConnection` so the mutator and the
/// reconciler can compose them inside a single transaction;
/// `Database` wraps them for one-shot callers.
use crate::error::{Result, TrackerError};
use crate::models::{Episode, EpisodeLabel, Season, SeasonTree, Show, ShowTree};
use crate::schema::{episodes, seasons, shows};

use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::*;
use serde::Serialize;
use tokio::sync::Mutex;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// An episode airing inside an upcoming window, with what a listing shows.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UpcomingEpisode {
    pub show_name: String,
    pub season_number: i32,
    pub episode: Episode,
}

impl UpcomingEpisode {
    pub fn label(&self) -> EpisodeLabel {
        EpisodeLabel {
            season: self.season_number,
            episode: self.episode.number,
        }
    }
}

pub fn show_exists(ctx: &mut SqliteConnection, show_id: i64) -> Result<bool> {
    let count: i64 = shows::table.find(show_id).count().get_result(ctx)?;
    Ok(count > 0)
}

/// Insert a show with its whole subtree. Callers run this in a transaction
/// so a failure part way leaves nothing behind.
pub fn insert_show_tree(ctx: &mut SqliteConnection, tree: &ShowTree) -> Result<()> {
    let show = &tree.show;

    if show_exists(ctx, show.id)? {
        return Err(TrackerError::DuplicateShow(show.id));
    }
    let same_name: i64 = shows::table
        .filter(shows::name.eq(&show.name))
        .count()
        .get_result(ctx)?;
    if same_name > 0 {
        return Err(TrackerError::DuplicateShowName(show.name.clone()));
    }

    diesel::insert_into(shows::table)
        .values(show)
        .execute(ctx)
        .map_err(|err| unique_violation(err, show))?;

    append_seasons(ctx, &tree.seasons)?;

    Ok(())
}

fn unique_violation(err: DieselError, show: &Show) -> TrackerError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
            if info.message().contains("shows.name") =>
        {
            TrackerError::DuplicateShowName(show.name.clone())
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            TrackerError::DuplicateShow(show.id)
        }
        other => other.into(),
    }
}

/// Insert new seasons and their episodes. The owning show must exist.
pub fn append_seasons(ctx: &mut SqliteConnection, trees: &[SeasonTree]) -> Result<()> {
    if trees.is_empty() {
        return Ok(());
    }

    let new_seasons: Vec<&Season> = trees.iter().map(|t| &t.season).collect();
    diesel::insert_into(seasons::table)
        .values(new_seasons)
        .execute(ctx)?;

    for tree in trees {
        append_episodes(ctx, &tree.episodes)?;
    }

    Ok(())
}

pub fn append_episodes(ctx: &mut SqliteConnection, new_episodes: &[Episode]) -> Result<usize> {
    if new_episodes.is_empty() {
        return Ok(0);
    }

    Ok(diesel::insert_into(episodes::table)
        .values(new_episodes)
        .execute(ctx)?)
}

/// Recompute `episode_count` of every season and `season_count` of the show
/// from the rows actually stored.
pub fn refresh_counts(ctx: &mut SqliteConnection, show_id: i64) -> Result<()> {
    let season_ids: Vec<i64> = seasons::table
        .filter(seasons::show_id.eq(show_id))
        .select(seasons::id)
        .load(ctx)?;

    for &season_id in &season_ids {
        let stored: i64 = episodes::table
            .filter(episodes::season_id.eq(season_id))
            .count()
            .get_result(ctx)?;
        diesel::update(seasons::table.find(season_id))
            .set(seasons::episode_count.eq(stored as i32))
            .execute(ctx)?;
    }

    diesel::update(shows::table.find(show_id))
        .set(shows::season_count.eq(season_ids.len() as i32))
        .execute(ctx)?;

    Ok(())
}

pub fn load_show(ctx: &mut SqliteConnection, show_id: i64) -> Result<Option<Show>> {
    Ok(shows::table
        .find(show_id)
        .select(Show::as_select())
        .first(ctx)
        .optional()?)
}

/// Load a show with its seasons (by number) and their episodes (by number).
pub fn load_show_tree(ctx: &mut SqliteConnection, show_id: i64) -> Result<Option<ShowTree>> {
    let Some(show) = load_show(ctx, show_id)? else {
        return Ok(None);
    };

    let show_seasons = Season::belonging_to(&show)
        .order_by(seasons::number)
        .select(Season::as_select())
        .load(ctx)?;

    let season_episodes = Episode::belonging_to(&show_seasons)
        .order_by(episodes::number)
        .select(Episode::as_select())
        .load(ctx)?;

    let seasons = season_episodes
        .grouped_by(&show_seasons)
        .into_iter()
        .zip(show_seasons)
        .map(|(episodes, season)| SeasonTree { season, episodes })
        .collect();

    Ok(Some(ShowTree { show, seasons }))
}

pub fn list_shows(ctx: &mut SqliteConnection) -> Result<Vec<Show>> {
    // sqlite's default BINARY collation: case-sensitive, locale-independent
    Ok(shows::table
        .order_by((shows::name, shows::id))
        .select(Show::as_select())
        .load(ctx)?)
}

/// Delete a show and everything it owns, leaves first.
pub fn delete_show_tree(ctx: &mut SqliteConnection, show_id: i64) -> Result<()> {
    if !show_exists(ctx, show_id)? {
        return Err(TrackerError::show_not_found(show_id));
    }

    let removed_episodes = diesel::delete(episodes::table.filter(episodes::show_id.eq(show_id)))
        .execute(ctx)?;
    let removed_seasons =
        diesel::delete(seasons::table.filter(seasons::show_id.eq(show_id))).execute(ctx)?;
    diesel::delete(shows::table.find(show_id)).execute(ctx)?;

    debug!(
        "Deleted show {} with {} seasons and {} episodes",
        show_id, removed_seasons, removed_episodes
    );
    Ok(())
}

pub fn find_episode(ctx: &mut SqliteConnection, episode_id: i64) -> Result<Option<Episode>> {
    Ok(episodes::table
        .find(episode_id)
        .select(Episode::as_select())
        .first(ctx)
        .optional()?)
}

/// Episodes airing between `from` and `to`, both inclusive, across all shows.
pub fn upcoming_episodes(
    ctx: &mut SqliteConnection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<UpcomingEpisode>> {
    let rows: Vec<(Episode, i32, String)> = episodes::table
        .inner_join(seasons::table)
        .inner_join(shows::table)
        .filter(episodes::air_date.ge(from))
        .filter(episodes::air_date.le(to))
        .order_by((
            episodes::air_date,
            shows::name,
            seasons::number,
            episodes::number,
        ))
        .select((Episode::as_select(), seasons::number, shows::name))
        .load(ctx)?;

    Ok(rows
        .into_iter()
        .map(|(episode, season_number, show_name)| UpcomingEpisode {
            show_name,
            season_number,
            episode,
        })
        .collect())
}

/// The stored episode with the greatest (air date, number) among those with
/// a known air date.
pub fn latest_local_episode(ctx: &mut SqliteConnection, show_id: i64) -> Result<Option<Episode>> {
    Ok(episodes::table
        .filter(episodes::show_id.eq(show_id))
        .filter(episodes::air_date.is_not_null())
        .order_by((episodes::air_date.desc(), episodes::number.desc()))
        .select(Episode::as_select())
        .first(ctx)
        .optional()?)
}

/// Flip the given episodes to watched. Episodes already watched keep their
/// watch date.
pub fn set_watched(
    ctx: &mut SqliteConnection,
    episode_ids: &[i64],
    today: NaiveDate,
) -> Result<usize> {
    Ok(diesel::update(
        episodes::table
            .filter(episodes::id.eq_any(episode_ids))
            .filter(episodes::watched.eq(false)),
    )
    .set((
        episodes::watched.eq(true),
        episodes::watch_date.eq(Some(today)),
    ))
    .execute(ctx)?)
}

pub fn clear_watched(ctx: &mut SqliteConnection, show_id: i64) -> Result<usize> {
    Ok(diesel::update(episodes::table.filter(episodes::show_id.eq(show_id)))
        .set((
            episodes::watched.eq(false),
            episodes::watch_date.eq(None::<NaiveDate>),
        ))
        .execute(ctx)?)
}

/// Handle on the store. A single connection sits behind an async mutex, so
/// every operation is serialized and each multi-row change commits as one
/// transaction.
pub struct Database {
    ctx: Mutex<SqliteConnection>,
}

impl Database {
    /// Open (or create) the database and bring its schema up to date.
    pub fn connect(database_url: &str) -> Result<Database> {
        let mut ctx = SqliteConnection::establish(database_url)?;

        diesel::sql_query("PRAGMA foreign_keys = ON").execute(&mut ctx)?;
        let applied = ctx
            .run_pending_migrations(MIGRATIONS)
            .map_err(|err| TrackerError::Migration(err.to_string()))?;
        info!(
            "Opened database {} ({} migrations applied)",
            database_url,
            applied.len()
        );

        Ok(Database {
            ctx: Mutex::new(ctx),
        })
    }

    pub fn in_memory() -> Result<Database> {
        Database::connect(":memory:")
    }

    /// Run `f` inside one transaction: either everything it wrote commits or
    /// nothing does.
    pub async fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T>,
    {
        let mut ctx = self.ctx.lock().await;
        ctx.transaction(f)
    }

    pub async fn add_show(&self, tree: &ShowTree) -> Result<()> {
        self.transaction(|ctx| insert_show_tree(ctx, tree)).await
    }

    pub async fn get_show(&self, show_id: i64) -> Result<Option<ShowTree>> {
        self.transaction(|ctx| load_show_tree(ctx, show_id)).await
    }

    pub async fn list_shows(&self) -> Result<Vec<Show>> {
        self.transaction(list_shows).await
    }

    pub async fn remove_show(&self, show_id: i64) -> Result<()> {
        self.transaction(|ctx| delete_show_tree(ctx, show_id)).await
    }

    pub async fn find_episode(&self, episode_id: i64) -> Result<Option<Episode>> {
        self.transaction(|ctx| find_episode(ctx, episode_id)).await
    }

    pub async fn upcoming_episodes(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<UpcomingEpisode>> {
        self.transaction(|ctx| upcoming_episodes(ctx, from, to)).await
    }

    pub async fn latest_local_episode(&self, show_id: i64) -> Result<Option<Episode>> {
        self.transaction(|ctx| latest_local_episode(ctx, show_id)).await
    }

    /// Number of shows, seasons and episodes stored.
    pub async fn count_rows(&self) -> Result<(i64, i64, i64)> {
        self.transaction(|ctx| {
            Ok((
                shows::table.count().get_result(ctx)?,
                seasons::table.count().get_result(ctx)?,
                episodes::table.count().get_result(ctx)?,
            ))
        })
        .await
    }
}
