//! Conversation UI components for the chat screen

pub mod commands;
pub mod composer;
pub mod header;
pub mod history;
pub mod streaming;

pub use commands::{ParsedCommand, SlashCommand, get_help_text, parse_slash_command};
pub use composer::{Composer, ComposerAction, handle_key};
pub use header::Header;
pub use history::ConversationHistory;
pub use streaming::typing_lines;
