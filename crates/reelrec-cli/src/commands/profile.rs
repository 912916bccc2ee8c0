use color_eyre::Result;
use reel_core::FeedEngine;

pub async fn personas(engine: &FeedEngine) -> Result<()> {
    let personas = engine.load_personas().await?;
    if personas.is_empty() {
        println!("No personas available.");
        return Ok(());
    }
    for persona in personas {
        println!("{} ({})", persona.title, persona.color_name);
        println!("    {}", persona.description);
    }
    Ok(())
}

pub async fn sync(engine: &FeedEngine, personas: &[String]) -> Result<()> {
    // Pull history into local state first so the upload reflects the backend's
    // view plus anything queued locally.
    if let Err(err) = engine.hydrate_profile().await {
        tracing::warn!(error = %err, "Profile hydration failed before sync");
    }
    engine.sync_user_profile(personas).await?;

    let status = engine.status().await;
    println!(
        "Profile synced; fresh feed has {} movie(s) in the window",
        status.window_len
    );
    Ok(())
}
