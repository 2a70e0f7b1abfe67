use super::schema::{episodes, seasons, shows};

use chrono::NaiveDate;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A followed show. The id is the one the catalog assigned.
#[derive(
    Clone, Debug, Queryable, Selectable, Insertable, Identifiable, PartialEq, Serialize, Deserialize,
)]
#[diesel(table_name = shows)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Show {
    pub id: i64,
    pub name: String,
    pub season_count: i32,
}

#[derive(
    Clone,
    Debug,
    Queryable,
    Selectable,
    Insertable,
    Identifiable,
    Associations,
    PartialEq,
    Serialize,
    Deserialize,
)]
#[diesel(belongs_to(Show))]
#[diesel(table_name = seasons)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Season {
    pub id: i64,
    pub show_id: i64,
    pub number: i32,
    pub air_date: Option<NaiveDate>,
    pub episode_count: i32,
}

#[derive(
    Clone,
    Debug,
    Queryable,
    Selectable,
    Insertable,
    Identifiable,
    Associations,
    PartialEq,
    Serialize,
    Deserialize,
)]
#[diesel(belongs_to(Season))]
#[diesel(belongs_to(Show))]
#[diesel(table_name = episodes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Episode {
    pub id: i64,
    pub show_id: i64,
    pub season_id: i64,
    pub number: i32,
    pub air_date: Option<NaiveDate>,
    pub watched: bool,
    pub watch_date: Option<NaiveDate>,
}

impl Episode {
    /// An episode without a known air date has not aired.
    pub fn has_aired(&self, today: NaiveDate) -> bool {
        self.air_date.map_or(false, |date| date <= today)
    }

    /// Key used for every "latest episode" comparison: air date, then number.
    pub(crate) fn recency(&self) -> (Option<NaiveDate>, i32) {
        (self.air_date, self.number)
    }
}

/// A season together with its episodes, ordered by episode number.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeasonTree {
    pub season: Season,
    pub episodes: Vec<Episode>,
}

/// A show with its whole owned subtree, seasons ordered by number.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ShowTree {
    pub show: Show,
    pub seasons: Vec<SeasonTree>,
}

impl ShowTree {
    pub fn id(&self) -> i64 {
        self.show.id
    }

    pub fn season(&self, number: i32) -> Option<&SeasonTree> {
        self.seasons.iter().find(|s| s.season.number == number)
    }

    /// Every episode of the show, in (season, episode) order.
    pub fn episodes(&self) -> impl Iterator<Item = (&Season, &Episode)> {
        self.seasons
            .iter()
            .flat_map(|s| s.episodes.iter().map(move |e| (&s.season, e)))
    }

    pub fn find_episode(&self, episode_id: i64) -> Option<(&Season, &Episode)> {
        self.episodes().find(|(_, e)| e.id == episode_id)
    }
}

/// Display label for an episode within its season, e.g. `S01E02`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct EpisodeLabel {
    pub season: i32,
    pub episode: i32,
}

impl EpisodeLabel {
    pub fn new(season: &Season, episode: &Episode) -> Self {
        EpisodeLabel {
            season: season.number,
            episode: episode.number,
        }
    }
}

impl fmt::Display for EpisodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{:02}E{:02}", self.season, self.episode)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn episode(
        show_id: i64,
        season_id: i64,
        id: i64,
        number: i32,
        aired: Option<NaiveDate>,
    ) -> Episode {
        Episode {
            id,
            show_id,
            season_id,
            number,
            air_date: aired,
            watched: false,
            watch_date: None,
        }
    }

    /// Show 1 "X": season 1 has three aired episodes, season 2 one aired and
    /// one unaired episode (relative to `today = 2020-06-01`).
    pub fn show_x() -> ShowTree {
        let show = Show {
            id: 1,
            name: "X".to_string(),
            season_count: 2,
        };
        let s1 = Season {
            id: 10,
            show_id: 1,
            number: 1,
            air_date: Some(date(2019, 1, 1)),
            episode_count: 3,
        };
        let s2 = Season {
            id: 20,
            show_id: 1,
            number: 2,
            air_date: Some(date(2020, 5, 1)),
            episode_count: 2,
        };
        ShowTree {
            show,
            seasons: vec![
                SeasonTree {
                    season: s1,
                    episodes: vec![
                        episode(1, 10, 101, 1, Some(date(2019, 1, 1))),
                        episode(1, 10, 102, 2, Some(date(2019, 1, 8))),
                        episode(1, 10, 103, 3, Some(date(2019, 1, 15))),
                    ],
                },
                SeasonTree {
                    season: s2,
                    episodes: vec![
                        episode(1, 20, 201, 1, Some(date(2020, 5, 1))),
                        episode(1, 20, 202, 2, Some(date(2020, 7, 1))),
                    ],
                },
            ],
        }
    }

    pub fn today() -> NaiveDate {
        date(2020, 6, 1)
    }
}
