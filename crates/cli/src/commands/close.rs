//! `kabot close`: migrate an open conversation into long-term memory.

use kabot_agent::{ClosureOutcome, Orchestrator};
use kabot_config::AppConfig;
use kabot_core::message::UserKey;

pub async fn run(user: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let orchestrator = Orchestrator::from_config(&config).await?;
    let user = UserKey::new(user);

    match orchestrator.close(&user).await? {
        ClosureOutcome::NothingToClose => println!("No open conversation for {user}."),
        ClosureOutcome::Cleared => println!("Working memory for {user} had no content; cleared."),
        ClosureOutcome::Consolidated { messages } => {
            println!("Closed conversation for {user}: {messages} messages migrated.")
        }
    }

    Ok(())
}
