//! Command-line surface: the TUI by default, plus one-shot subcommands.

use crate::app::AppState;
use crate::attachment::{Attachment, format_file_size};
use crate::client::ChatClient;
use crate::conversation::{MODEL_ERROR_TEXT, Role};
use crate::dispatcher::{DispatchMode, spawn_dispatch};
use crate::events::DispatchEvent;
use crate::storage::KeyValueStore;
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

#[derive(Debug, Parser)]
#[command(name = "phoenix")]
#[command(version)]
#[command(about = "Terminal chat client for the Phoenix backend", long_about = None)]
pub struct Cli {
    /// Backend base URL (overrides config and PHOENIX_BACKEND_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub backend: Option<String>,

    /// Keep history and preferences in memory only
    #[arg(long, global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand, PartialEq)]
pub enum Commands {
    /// Send one message and print the reply
    Ask {
        text: String,
        /// Document to send with the message
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
        /// Stream the reply as it is generated
        #[arg(long, conflicts_with = "no_stream")]
        stream: bool,
        /// Wait for the complete reply
        #[arg(long)]
        no_stream: bool,
    },
    /// Print the saved conversation
    History,
    /// Clear the saved conversation
    Clear,
    /// Set the streaming preference
    Stream { state: Toggle },
    /// Upload a document and print what the backend extracted
    Upload { path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Commands {
    /// Mode override for `ask`; `None` means use the saved preference
    pub fn ask_mode(stream: bool, no_stream: bool) -> Option<DispatchMode> {
        match (stream, no_stream) {
            (true, _) => Some(DispatchMode::Streaming),
            (_, true) => Some(DispatchMode::Buffered),
            _ => None,
        }
    }
}

/// Expand a leading `~/` to the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

/// Run one request through the same state machine the TUI uses
pub async fn ask<S: KeyValueStore>(
    app: &mut AppState<S>,
    client: &ChatClient,
    text: &str,
    file: Option<&Path>,
    mode: Option<DispatchMode>,
) -> Result<()> {
    if let Some(path) = file {
        app.attach_path(&expand_home(path))
            .with_context(|| format!("Cannot attach {}", path.display()))?;
    }

    app.input_mut().set_text(text);
    let mode = mode
        .unwrap_or_else(|| DispatchMode::from_streaming(app.preferences().streaming_enabled));
    let submission = app.submit_as(mode).context("Message was not sent")?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _in_flight = spawn_dispatch(client.clone(), submission, tx);

    let mut stdout = std::io::stdout();
    let mut printed_stream = false;
    while let Some(event) = rx.recv().await {
        let finished = matches!(event, DispatchEvent::Finished(_));
        if let DispatchEvent::Chunk(chunk) = &event {
            print!("{}", chunk);
            stdout.flush().context("Failed to flush stdout")?;
            printed_stream = true;
        }
        app.apply(event);
        if finished {
            break;
        }
    }

    let reply = app
        .conversation()
        .last()
        .filter(|turn| turn.role == Role::Model)
        .map(|turn| turn.text.clone())
        .unwrap_or_default();

    if printed_stream {
        println!();
    }
    // A failed stream only printed its partial text, so the error turn still needs showing
    if !printed_stream || reply == MODEL_ERROR_TEXT {
        println!("{}", reply);
    }

    Ok(())
}

pub fn print_history<S: KeyValueStore>(app: &AppState<S>) {
    if app.conversation().is_empty() {
        println!("📭 No saved conversation yet.");
        return;
    }

    for turn in app.conversation().turns() {
        let stamp = turn
            .sent_at
            .map(|at| at.with_timezone(&chrono::Local).format(" (%Y-%m-%d %H:%M)").to_string())
            .unwrap_or_default();
        println!("{} {}{}", turn.role.avatar(), turn.role.display_name(), stamp);
        if let Some(file) = &turn.attached_file {
            println!(
                "   📎 {} ({}, {})",
                file.filename,
                file.kind.label(),
                format_file_size(file.size)
            );
        }
        for line in turn.text.lines() {
            println!("   {}", line);
        }
        println!();
    }
}

pub fn clear<S: KeyValueStore>(app: &mut AppState<S>) -> Result<()> {
    app.clear_history().context("Could not clear history")?;
    println!("🧹 Chat history cleared.");
    Ok(())
}

pub fn set_stream<S: KeyValueStore>(app: &mut AppState<S>, state: Toggle) {
    app.set_streaming(state == Toggle::On);
    println!(
        "Streaming is now {}.",
        if state == Toggle::On { "on" } else { "off" }
    );
}

pub async fn upload(client: &ChatClient, path: &Path) -> Result<()> {
    let attachment = Attachment::from_path(&expand_home(path))
        .with_context(|| format!("Cannot upload {}", path.display()))?;

    let info = match client.upload(&attachment).await {
        Ok(info) => info,
        Err(err) => bail!("Upload failed: {}", err),
    };

    println!("📄 {} ({})", info.filename, format_file_size(info.size));
    if let Some(kind) = &info.kind {
        println!("   type: {}", kind);
    }
    if !info.content.is_empty() {
        println!();
        println!("{}", info.content);
    }
    Ok(())
}
