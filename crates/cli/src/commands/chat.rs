//! `kabot chat`: interactive or single-message conversation.

use kabot_agent::Orchestrator;
use kabot_config::AppConfig;
use kabot_core::message::UserKey;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

pub async fn run(user: &str, message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Check for API key early and give a clear error
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    KABOT_API_KEY   = 'sk-...'");
        eprintln!("    OPENAI_API_KEY  = 'sk-...'");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let orchestrator = Orchestrator::from_config(&config).await?;
    let user = UserKey::new(user);

    if let Some(msg) = message {
        // Single message mode
        let reply = orchestrator.handle_message(&user, &msg).await?;
        println!("{reply}");
        return Ok(());
    }

    // Interactive mode
    let seeded = orchestrator.start_conversation(&user).await?;
    println!();
    println!("  kabot, interactive mode");
    println!();
    println!("  User:      {user}");
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!("  Memory:    {}", config.memory.backend);
    if !seeded.is_empty() {
        println!("  Context:   resumed with {} remembered messages", seeded.len());
    }
    println!();
    println!("  Type your message and press Enter.");
    println!("  Saying goodbye closes the conversation; /quit or Ctrl+D leaves.");
    println!();

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(b"  You > ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "/quit" {
            break;
        }

        let reply = orchestrator.reply(&user, input).await;
        println!();
        for line in reply.lines() {
            println!("  kabot > {line}");
        }
        println!();
    }

    println!();
    println!("  Bye!");
    println!();

    Ok(())
}
