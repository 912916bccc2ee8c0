use color_eyre::Result;
use reel_core::FeedEngine;
use reel_models::{ImageRef, Movie, UserRating};

pub async fn run(
    engine: &FeedEngine,
    movie_id: u32,
    rating: UserRating,
    title: Option<String>,
) -> Result<()> {
    let title = title.unwrap_or_else(|| format!("tmdb:{movie_id}"));
    let movie = Movie::new(movie_id, title, "", ImageRef::Asset(String::new()));

    engine.rate(&movie, rating).await;

    let pending = engine.pending_actions().await.len();
    if pending > 0 {
        println!("Rated '{}' as {rating}; {pending} action(s) queued for retry", movie.title);
    } else {
        println!("Rated '{}' as {rating}", movie.title);
    }
    Ok(())
}
