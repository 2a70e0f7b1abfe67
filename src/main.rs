use paon::config::MAX_UPCOMING_DAYS;
use paon::models::EpisodeLabel;
use paon::progress;
use paon::sync::SyncOutcome;
use paon::{Config, Database, TmdbClient, Tracker};

use clap::{Parser, Subcommand};
use eyre::WrapErr;
use log::*;
use simplelog::{
    ColorChoice, CombinedLogger, Config as LogConfig, TermLogger, TerminalMode, WriteLogger,
};
use std::fs::OpenOptions;

#[derive(Parser, Debug)]
#[command(name = "paon", about = "Keep track of the TV shows you watch")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search the catalog for shows by title
    Search { query: String },
    /// Follow a show by its catalog id
    Add { id: i64 },
    /// List followed shows with their progress
    List,
    /// Show every season and episode of a followed show
    Show { id: i64 },
    /// Mark an episode and everything before it watched
    Watch { show_id: i64, episode_id: i64 },
    /// Mark every episode of a show unwatched
    Reset { show_id: i64 },
    /// Stop following a show
    Remove { show_id: i64 },
    /// Refresh all followed shows from the catalog
    Sync,
    /// List episodes airing soon
    Upcoming {
        #[arg(long, value_parser = clap::value_parser!(i64).range(0..=MAX_UPCOMING_DAYS))]
        days: Option<i64>,
    },
}

fn init_logging(log_file: &str) -> eyre::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .wrap_err_with(|| format!("could not open log file {}", log_file))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Warn,
            LogConfig::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Debug, LogConfig::default(), file),
    ])?;
    Ok(())
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let config = Config::from_env()?;
    init_logging(&config.log_file)?;

    let db = Database::connect(&config.database_url)
        .wrap_err_with(|| format!("could not open {}", config.database_url))?;
    let catalog = TmdbClient::new(config.catalog.clone())?;
    let tracker = Tracker::new(db, catalog, config.rate_limit);

    let res = run(&tracker, &config, cli.command).await;
    if let Err(e) = &res {
        error!("Command failed: {e:?}");
    }
    res
}

async fn run(
    tracker: &Tracker<TmdbClient>,
    config: &Config,
    command: Command,
) -> eyre::Result<()> {
    match command {
        Command::Search { query } => {
            for hit in tracker.search_shows(&query).await? {
                let year = hit
                    .first_air_date
                    .map(|d| d.format("%Y").to_string())
                    .unwrap_or_else(|| "????".to_string());
                println!("{:>8}  {}  {}", hit.id, year, hit.name);
            }
        }
        Command::Add { id } => {
            let tree = tracker.add_show_from_catalog(id).await?;
            println!("Now following {} ({} seasons)", tree.show.name, tree.seasons.len());
        }
        Command::List => {
            for summary in tracker.list_summaries().await? {
                let last_seen = summary
                    .last_seen
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:>8}  {:5.1}%  last seen {:<7} {}",
                    summary.show_id, summary.progression, last_seen, summary.name
                );
            }
        }
        Command::Show { id } => {
            let tree = tracker.get_show(id).await?;
            let today = Tracker::<TmdbClient>::today();
            println!(
                "{} ({:.1}% watched)",
                tree.show.name,
                progress::progression(&tree, today)
            );
            for season in &tree.seasons {
                println!(
                    "Season {} ({:.1}%)",
                    season.season.number,
                    progress::season_progression(season, today)
                );
                for episode in &season.episodes {
                    let mark = if episode.watched { "x" } else { " " };
                    let aired = episode
                        .air_date
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    println!(
                        "  [{}] {}  {:>8}  {}",
                        mark,
                        EpisodeLabel::new(&season.season, episode),
                        episode.id,
                        aired
                    );
                }
            }
        }
        Command::Watch {
            show_id,
            episode_id,
        } => {
            let changed = tracker.mark_watched_through(show_id, episode_id).await?;
            println!("{} episodes marked watched", changed);
        }
        Command::Reset { show_id } => {
            tracker.reset_show(show_id).await?;
            println!("Show {} reset", show_id);
        }
        Command::Remove { show_id } => {
            if tracker.remove_show(show_id).await? {
                println!("Show {} removed", show_id);
            } else {
                println!("Show {} was not followed", show_id);
            }
        }
        Command::Sync => {
            let report = tracker.sync_all().await?;
            for show in &report.shows {
                match &show.result {
                    Ok(SyncOutcome::UpToDate) => println!("{}: up to date", show.name),
                    Ok(SyncOutcome::Updated { episodes, seasons }) => println!(
                        "{}: {} new episodes, {} new seasons",
                        show.name, episodes, seasons
                    ),
                    Err(err) => println!("{}: an error occurred ({})", show.name, err),
                }
            }
        }
        Command::Upcoming { days } => {
            for upcoming in tracker.upcoming(days.unwrap_or(config.upcoming_days)).await? {
                let aired = upcoming
                    .episode
                    .air_date
                    .map(|d| d.to_string())
                    .unwrap_or_default();
                println!("{}  {} {}", aired, upcoming.show_name, upcoming.label());
            }
        }
    }
    Ok(())
}
