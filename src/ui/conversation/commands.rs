use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Toggle streaming, or set it with `on` / `off`
    Stream,
    /// Clear chat history
    Clear,
    /// Attach a document to the next message
    Attach,
    /// Remove the pending attachment
    Detach,
    /// Copy a model reply to the clipboard
    Copy,
    /// Show help
    Help,
    /// Exit the application
    Bye,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
    pub argument: Option<String>,
}

impl ParsedCommand {
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    /// `Some(true)` / `Some(false)` for an explicit `/stream on|off`, `None` to toggle
    pub fn streaming_target(&self) -> Option<bool> {
        if self.command != SlashCommand::Stream {
            return None;
        }

        match self.argument()?.trim().to_lowercase().as_str() {
            "on" | "true" | "yes" | "1" => Some(true),
            "off" | "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }

    /// Turn index for `/copy <n>`
    pub fn copy_index(&self) -> Option<usize> {
        if self.command != SlashCommand::Copy {
            return None;
        }
        self.argument()?.trim().parse().ok()
    }
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Stream => "toggle streaming replies (or /stream on|off)",
            SlashCommand::Clear => "clear the chat history",
            SlashCommand::Attach => "attach a PDF, DOCX, DOC or TXT file: /attach <path>",
            SlashCommand::Detach => "remove the pending attachment",
            SlashCommand::Copy => "copy the latest reply, or reply n: /copy <n>",
            SlashCommand::Help => "show available commands",
            SlashCommand::Bye => "exit the application",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    let body = input.trim().strip_prefix('/')?;

    let mut parts = body.splitn(2, char::is_whitespace);
    let head = parts.next()?.to_lowercase();
    let rest = parts.next().map(str::trim).filter(|rest| !rest.is_empty());

    let command = SlashCommand::from_str(&head).ok().or_else(|| match head.as_str() {
        "q" | "quit" | "exit" => Some(SlashCommand::Bye),
        "s" | "streaming" => Some(SlashCommand::Stream),
        "file" | "upload" => Some(SlashCommand::Attach),
        "h" | "?" => Some(SlashCommand::Help),
        _ => None,
    })?;

    Some(ParsedCommand {
        command,
        argument: rest.map(str::to_string),
    })
}

/// Get help text for all available commands
pub fn get_help_text() -> String {
    let mut help = String::from("Available commands:\n\n");
    for command in SlashCommand::iter() {
        help.push_str(&format!("- `/{}` {}\n", command.command(), command.description()));
    }

    help.push_str(
        "\nKeys: Enter send · Ctrl+S streaming · Ctrl+L clear · Ctrl+Y copy · PgUp/PgDn scroll · Esc quit",
    );
    help.push_str("\nAliases: /q for /bye, /s for /stream, /file for /attach");

    help
}
