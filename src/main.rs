use anyhow::{Context, Result};
use clap::Parser;
use phoenix_chat::app::AppState;
use phoenix_chat::cli::{self, Cli, Commands};
use phoenix_chat::client::ChatClient;
use phoenix_chat::config::Config;
use phoenix_chat::logging;
use phoenix_chat::storage::{FileStore, KeyValueStore, MemoryStore};
use phoenix_chat::tui;

fn open_store(config: &Config, ephemeral: bool) -> Result<Box<dyn KeyValueStore>> {
    if ephemeral {
        return Ok(Box::new(MemoryStore::new()));
    }
    let store = FileStore::open(&config.data_dir)
        .with_context(|| format!("Failed to open storage at {}", config.data_dir.display()))?;
    Ok(Box::new(store))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    config.apply_backend_override(cli.backend.clone());

    if cli.command.is_none() {
        logging::init_file_logging(&config.log_file)?;
    } else {
        logging::init_stderr_logging()?;
    }
    tracing::debug!(backend = %config.backend_url, ephemeral = cli.ephemeral, "Starting phoenix");

    let store = open_store(&config, cli.ephemeral)?;

    match cli.command {
        None => tui::run(&config, store).await,
        Some(Commands::Ask {
            text,
            file,
            stream,
            no_stream,
        }) => {
            let client = ChatClient::from_config(&config)?;
            let mut app = AppState::load(store);
            cli::ask(
                &mut app,
                &client,
                &text,
                file.as_deref(),
                Commands::ask_mode(stream, no_stream),
            )
            .await
        }
        Some(Commands::History) => {
            cli::print_history(&AppState::load(store));
            Ok(())
        }
        Some(Commands::Clear) => cli::clear(&mut AppState::load(store)),
        Some(Commands::Stream { state }) => {
            cli::set_stream(&mut AppState::load(store), state);
            Ok(())
        }
        Some(Commands::Upload { path }) => {
            let client = ChatClient::from_config(&config)?;
            cli::upload(&client, &path).await
        }
    }
}
