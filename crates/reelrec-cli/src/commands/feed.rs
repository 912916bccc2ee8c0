use color_eyre::Result;
use reel_core::FeedEngine;
use reel_models::Movie;
use tracing::warn;

pub async fn run(engine: &FeedEngine, pages: usize) -> Result<()> {
    // A failed profile fetch still falls back to a plain feed fetch.
    if let Err(err) = engine.hydrate_profile().await {
        warn!(error = %err, "Profile hydration failed; showing feed without history");
    }

    let window = engine.recommendations().await;
    if window.is_empty() {
        println!("No recommendations available.");
        return Ok(());
    }
    print_window(&window, 0);

    let mut offset = window.len();
    for _ in 0..pages {
        let outcome = engine.load_more().await;
        if let Some(refill) = outcome.refill {
            refill.await?;
        }
        if outcome.appended == 0 {
            break;
        }
        let window = engine.recommendations().await;
        print_window(&window[offset..], offset);
        offset = window.len();
    }

    let status = engine.status().await;
    println!(
        "\n{} in window, {} buffered, {} shown this session, {} pending action(s)",
        status.window_len, status.buffer_len, status.shown_count, status.pending_actions
    );
    Ok(())
}

fn print_window(movies: &[Movie], offset: usize) {
    for (i, movie) in movies.iter().enumerate() {
        println!("{:3}. {} ({})", offset + i + 1, movie.title, movie.subtitle);
    }
}
