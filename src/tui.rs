//! Terminal lifecycle and the UI loop.
//!
//! All state changes happen here, on one task: key presses from crossterm and
//! [`DispatchEvent`]s from the running request are applied to [`AppState`] in
//! arrival order, then the screen is redrawn.

use crate::app::{AppState, Notice};
use crate::cli::expand_home;
use crate::client::ChatClient;
use crate::clipboard::ClipboardBridge;
use crate::config::Config;
use crate::dispatcher::{InFlight, spawn_dispatch};
use crate::events::{DispatchEvent, TuiEvent};
use crate::storage::KeyValueStore;
use crate::ui::conversation::{ComposerAction, ParsedCommand, SlashCommand, handle_key};
use crate::ui::{self, ViewOptions};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;

type PhoenixTerminal = Terminal<CrosstermBackend<Stdout>>;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const SCROLL_STEP: usize = 5;

fn setup_terminal() -> Result<PhoenixTerminal> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
        .context("Failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")
}

fn restore_terminal(terminal: &mut PhoenixTerminal) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableBracketedPaste)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

/// Run the chat screen until the user quits
pub async fn run<S: KeyValueStore>(config: &Config, store: S) -> Result<()> {
    let client = ChatClient::from_config(config)?;
    let mut session = Session::new(AppState::load(store), client, config.ui.show_timestamps);

    let mut terminal = setup_terminal()?;
    tracing::info!(backend = %config.backend_url, "Chat screen started");

    let result = session.event_loop(&mut terminal).await;
    session.shutdown().await;

    restore_terminal(&mut terminal)?;
    tracing::info!("Chat screen closed");
    result
}

struct Session<S: KeyValueStore> {
    app: AppState<S>,
    client: ChatClient,
    events_tx: mpsc::UnboundedSender<DispatchEvent>,
    events_rx: mpsc::UnboundedReceiver<DispatchEvent>,
    in_flight: Option<InFlight>,
    clipboard: ClipboardBridge,
    options: ViewOptions,
    should_quit: bool,
}

impl<S: KeyValueStore> Session<S> {
    fn new(app: AppState<S>, client: ChatClient, show_timestamps: bool) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            app,
            client,
            events_tx,
            events_rx,
            in_flight: None,
            clipboard: ClipboardBridge::new(),
            options: ViewOptions {
                show_timestamps,
                show_help: false,
            },
            should_quit: false,
        }
    }

    async fn event_loop(&mut self, terminal: &mut PhoenixTerminal) -> Result<()> {
        while !self.should_quit {
            self.drain_dispatch_events();

            terminal
                .draw(|frame| ui::draw(frame, &self.app, self.options))
                .context("Failed to draw frame")?;

            let event = if event::poll(POLL_INTERVAL).context("Failed to poll terminal")? {
                TuiEvent::from_crossterm(event::read().context("Failed to read terminal event")?)
            } else {
                Some(TuiEvent::Tick)
            };

            match event {
                Some(TuiEvent::Key(key)) => self.handle_key(key),
                Some(TuiEvent::Paste(text)) => self.app.input_mut().insert_str(&text),
                Some(TuiEvent::Resize(..)) | Some(TuiEvent::Tick) | None => {}
            }

            // Let the dispatch task run between frames
            tokio::task::yield_now().await;
        }

        Ok(())
    }

    fn drain_dispatch_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            if matches!(event, DispatchEvent::Finished(_)) {
                self.in_flight = None;
            }
            self.app.apply(event);
        }
    }

    /// Cancel whatever is outstanding so its pair is still committed
    async fn shutdown(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            tracing::info!("Cancelling outstanding request on exit");
            in_flight.shutdown().await;
        }
        self.drain_dispatch_events();
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if self.options.show_help {
            self.options.show_help = false;
            return;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if ctrl => self.should_quit = true,
            KeyCode::Char('s') if ctrl => self.toggle_streaming(None),
            KeyCode::Char('l') if ctrl => self.clear_history(),
            KeyCode::Char('y') if ctrl => self.copy_reply(None),
            KeyCode::PageUp => self.app.scroll_up(SCROLL_STEP),
            KeyCode::PageDown => self.app.scroll_down(SCROLL_STEP),
            _ => match handle_key(self.app.input_mut(), key) {
                ComposerAction::Submit => self.submit(),
                ComposerAction::Command(command) => self.run_command(command),
                ComposerAction::None => {}
            },
        }
    }

    fn submit(&mut self) {
        match self.app.submit() {
            Ok(submission) => {
                self.in_flight = Some(spawn_dispatch(
                    self.client.clone(),
                    submission,
                    self.events_tx.clone(),
                ));
            }
            Err(err) => tracing::debug!(error = %err, "Submission rejected"),
        }
    }

    fn run_command(&mut self, parsed: ParsedCommand) {
        tracing::debug!(command = parsed.command.command(), "Running slash command");

        match parsed.command {
            SlashCommand::Stream => self.toggle_streaming(parsed.streaming_target()),
            SlashCommand::Clear => self.clear_history(),
            SlashCommand::Attach => match parsed.argument() {
                Some(path) => {
                    let path = expand_home(Path::new(path));
                    if let Err(err) = self.app.attach_path(&path) {
                        tracing::warn!(path = %path.display(), error = %err, "Attachment rejected");
                    }
                }
                None => self
                    .app
                    .set_notice(Notice::Validation("Usage: /attach <path>".to_string())),
            },
            SlashCommand::Detach => {
                if self.app.detach().is_none() {
                    self.app
                        .set_notice(Notice::Info("No document attached.".to_string()));
                }
            }
            SlashCommand::Copy => {
                if parsed.argument().is_some() && parsed.copy_index().is_none() {
                    self.app
                        .set_notice(Notice::Validation("Usage: /copy [n]".to_string()));
                } else {
                    self.copy_reply(parsed.copy_index());
                }
            }
            SlashCommand::Help => self.options.show_help = true,
            SlashCommand::Bye => self.should_quit = true,
        }
    }

    fn toggle_streaming(&mut self, target: Option<bool>) {
        let enabled = match target {
            Some(enabled) => {
                self.app.set_streaming(enabled);
                enabled
            }
            None => self.app.toggle_streaming(),
        };
        let state = if enabled { "on" } else { "off" };
        self.app
            .set_notice(Notice::Info(format!("Streaming {}.", state)));
    }

    fn clear_history(&mut self) {
        if let Err(err) = self.app.clear_history() {
            tracing::debug!(error = %err, "Clear refused");
        }
    }

    fn copy_reply(&mut self, index: Option<usize>) {
        let Some(text) = self.app.copy_source(index) else {
            self.app
                .set_notice(Notice::Validation("Nothing to copy yet.".to_string()));
            return;
        };

        match self.clipboard.copy(&text) {
            Ok(method) => {
                tracing::debug!(?method, chars = text.chars().count(), "Copied reply");
                self.app.mark_copied(index);
            }
            Err(err) => {
                tracing::warn!(error = %err, "Copy failed");
                self.app
                    .set_notice(Notice::Error(format!("Copy failed: {}", err)));
            }
        }
    }
}
