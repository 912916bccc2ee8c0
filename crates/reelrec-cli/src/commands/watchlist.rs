use clap::Subcommand;
use color_eyre::Result;
use reel_core::FeedEngine;
use reel_models::{ImageRef, Movie};

#[derive(Subcommand)]
pub enum WatchlistCommand {
    /// Save a movie to the watchlist
    Add {
        movie_id: u32,
        #[arg(long)]
        title: Option<String>,
    },
    /// Remove a movie from the watchlist
    Remove {
        movie_id: u32,
        #[arg(long)]
        title: Option<String>,
    },
}

pub async fn run(engine: &FeedEngine, command: WatchlistCommand) -> Result<()> {
    match command {
        WatchlistCommand::Add { movie_id, title } => {
            let movie = placeholder(movie_id, title);
            engine.add_to_watchlist(&movie).await;
            report(engine, &format!("Added '{}' to watchlist", movie.title)).await;
        }
        WatchlistCommand::Remove { movie_id, title } => {
            let movie = placeholder(movie_id, title);
            engine.remove_from_watchlist(&movie).await;
            report(engine, &format!("Removed '{}' from watchlist", movie.title)).await;
        }
    }
    Ok(())
}

fn placeholder(movie_id: u32, title: Option<String>) -> Movie {
    let title = title.unwrap_or_else(|| format!("tmdb:{movie_id}"));
    Movie::new(movie_id, title, "", ImageRef::Asset(String::new()))
}

async fn report(engine: &FeedEngine, message: &str) {
    let pending = engine.pending_actions().await.len();
    if pending > 0 {
        println!("{message}; {pending} action(s) queued for retry");
    } else {
        println!("{message}");
    }
}
