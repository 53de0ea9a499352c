//! kabot CLI, the main entry point.
//!
//! Commands:
//! - `chat`    Interactive or single-message conversation as one user
//! - `close`   Consolidate a user's open conversation into long-term memory
//! - `memory`  Inspect what each memory tier holds for a user
//! - `serve`   Start the WhatsApp webhook server
//! - `config`  Create or inspect the configuration file

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "kabot",
    about = "kabot: WhatsApp sales assistant with tiered conversational memory",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Talk to the assistant as a given user
    Chat {
        /// User key (e.g. a phone number without `+`)
        #[arg(short, long)]
        user: String,

        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Close a user's conversation and migrate it to long-term memory
    Close {
        #[arg(short, long)]
        user: String,
    },

    /// Inspect stored memory
    Memory {
        #[command(subcommand)]
        command: MemoryCommands,
    },

    /// Start the webhook server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum MemoryCommands {
    /// Show facts, summary, working and episodic memory for a user
    Show {
        #[arg(short, long)]
        user: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Chat { user, message } => commands::chat::run(&user, message).await?,
        Commands::Close { user } => commands::close::run(&user).await?,
        Commands::Memory { command } => match command {
            MemoryCommands::Show { user } => commands::memory::show(&user).await?,
        },
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Config { command } => match command {
            ConfigCommands::Init { force } => commands::config_cmd::init(force).await?,
            ConfigCommands::Show => commands::config_cmd::show().await?,
            ConfigCommands::Path => commands::config_cmd::path().await?,
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_chat_with_single_message() {
        let cli = Cli::try_parse_from(["kabot", "chat", "--user", "521555", "-m", "Hola"]).unwrap();
        match cli.command {
            Commands::Chat { user, message } => {
                assert_eq!(user, "521555");
                assert_eq!(message.as_deref(), Some("Hola"));
            }
            _ => panic!("expected chat"),
        }
    }

    #[test]
    fn parses_nested_memory_show() {
        let cli = Cli::try_parse_from(["kabot", "-v", "memory", "show", "-u", "521555"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Memory {
                command: MemoryCommands::Show { .. }
            }
        ));
    }

    #[test]
    fn close_requires_user() {
        assert!(Cli::try_parse_from(["kabot", "close"]).is_err());
    }
}
