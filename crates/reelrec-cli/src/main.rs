use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::eyre;
use reel_config::{Config, PathManager};
use reel_core::FeedEngine;
use reel_gateway::HttpGateway;
use reel_models::UserRating;
use std::sync::Arc;

mod commands;
mod logging;

use commands::{config, feed, profile, rate, shown, watchlist};

#[derive(Parser)]
#[command(name = "reelrec")]
#[command(about = "Reelrec - a movie feed that stays in sync, even when the network doesn't")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// User id to act as (overrides the configured user)
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hydrate the profile and page through the recommendation feed
    Feed {
        /// Extra window pages to pull from the buffer after the fresh load
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Rate a movie (optimistic; retried in order if the backend is down)
    Rate {
        /// Backend movie id
        movie_id: u32,
        #[arg(value_enum)]
        rating: RatingArg,
        /// Title for log output
        #[arg(long)]
        title: Option<String>,
    },
    /// Manage the watchlist
    Watchlist {
        #[command(subcommand)]
        action: watchlist::WatchlistCommand,
    },
    /// Report movies as displayed; flushed to the backend in batches
    Shown {
        /// Backend movie ids
        #[arg(required = true)]
        movie_ids: Vec<u32>,
    },
    /// List the onboarding personas served by the backend
    Personas,
    /// Bulk-upload the local profile and fetch a fresh feed
    SyncProfile {
        /// Persona titles selected during onboarding
        #[arg(long, value_delimiter = ',')]
        personas: Vec<String>,
    },
    /// Inspect or initialize configuration
    Config {
        #[command(subcommand)]
        action: config::ConfigCommand,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RatingArg {
    Like,
    Neutral,
    Dislike,
}

impl From<RatingArg> for UserRating {
    fn from(arg: RatingArg) -> Self {
        match arg {
            RatingArg::Like => UserRating::Like,
            RatingArg::Neutral => UserRating::Neutral,
            RatingArg::Dislike => UserRating::Dislike,
        }
    }
}

fn build_engine(cfg: &Config, user_override: Option<String>) -> color_eyre::Result<FeedEngine> {
    let user = user_override
        .or_else(|| cfg.user.name.clone())
        .ok_or_else(|| eyre!("No user configured; set [user].name or pass --user"))?;
    let gateway = HttpGateway::new(&cfg.backend.base_url, &cfg.backend.image_cdn);
    Ok(FeedEngine::new(Arc::new(gateway), user, cfg.feed))
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet).map_err(|e| eyre!("{}", e))?;

    let paths = PathManager::new().map_err(|e| eyre!("{}", e))?;
    let cfg = Config::load(&paths.config_file()).map_err(|e| eyre!("{}", e))?;

    match cli.command {
        Commands::Feed { pages } => {
            let engine = build_engine(&cfg, cli.user)?;
            feed::run(&engine, pages).await?;
        }
        Commands::Rate { movie_id, rating, title } => {
            let engine = build_engine(&cfg, cli.user)?;
            rate::run(&engine, movie_id, rating.into(), title).await?;
        }
        Commands::Watchlist { action } => {
            let engine = build_engine(&cfg, cli.user)?;
            watchlist::run(&engine, action).await?;
        }
        Commands::Shown { movie_ids } => {
            let engine = build_engine(&cfg, cli.user)?;
            shown::run(&engine, &movie_ids).await?;
        }
        Commands::Personas => {
            let engine = build_engine(&cfg, cli.user)?;
            profile::personas(&engine).await?;
        }
        Commands::SyncProfile { personas } => {
            let engine = build_engine(&cfg, cli.user)?;
            profile::sync(&engine, &personas).await?;
        }
        Commands::Config { action } => {
            config::run(&cfg, &paths, action)?;
        }
    }

    Ok(())
}
