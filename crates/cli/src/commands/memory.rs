//! `kabot memory`: inspect what each tier holds for a user.

use kabot_config::AppConfig;
use kabot_core::memory::MemoryTier;
use kabot_core::message::{UserKey, render_tagged};
use kabot_memory::Stores;

pub async fn show(user: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let stores = Stores::from_config(&config.memory, config.orchestrator.store_timeout()).await?;
    let user = UserKey::new(user);

    println!("Memory for {user} ({} backend)", config.memory.backend);
    println!();

    let facts = stores.facts.load(&user).await?.unwrap_or_default();
    println!("Facts:");
    if facts.is_empty() {
        println!("   (none)");
    } else {
        for (name, value) in &facts {
            println!("   {name}: {value}");
        }
    }
    println!();

    println!("Summary:");
    match stores.summary.load(&user).await? {
        Some(summary) => println!("   {summary}"),
        None => println!("   (none)"),
    }
    println!();

    let working = stores.working.load(&user).await?.unwrap_or_default();
    println!("Working memory ({} messages):", working.len());
    for line in render_tagged(&working).lines() {
        println!("   {line}");
    }
    println!();

    let episodic = stores.episodic.load(&user).await?.unwrap_or_default();
    println!("Episodic memory: {} messages", episodic.len());

    Ok(())
}
