use color_eyre::Result;
use reel_core::FeedEngine;
use reel_models::{ImageRef, Movie};

/// Record displayed movies; a flush to the backend happens once the
/// accumulated set reaches the configured threshold.
pub async fn run(engine: &FeedEngine, movie_ids: &[u32]) -> Result<()> {
    for id in movie_ids {
        let movie = Movie::new(*id, format!("tmdb:{id}"), "", ImageRef::Asset(String::new()));
        engine.mark_as_shown(&movie).await;
    }

    let status = engine.status().await;
    if status.pending_actions > 0 {
        println!(
            "Marked {} movie(s) as shown; {} action(s) queued for retry",
            movie_ids.len(),
            status.pending_actions
        );
    } else {
        println!(
            "Marked {} movie(s) as shown ({} this session)",
            movie_ids.len(),
            status.shown_count
        );
    }
    Ok(())
}
