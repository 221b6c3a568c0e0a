//! Clipboard access: the native clipboard when a display server is available,
//! otherwise an OSC 52 escape written to the terminal.

use anyhow::{Context, Result};
use base64::Engine;
use std::io::Write;

/// How a copy reached the clipboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMethod {
    Native,
    Osc52,
}

pub struct ClipboardBridge {
    native: Option<arboard::Clipboard>,
}

impl ClipboardBridge {
    pub fn new() -> Self {
        let native = match arboard::Clipboard::new() {
            Ok(clipboard) => Some(clipboard),
            Err(err) => {
                tracing::debug!(error = %err, "Native clipboard unavailable, using OSC 52");
                None
            }
        };
        Self { native }
    }

    pub fn copy(&mut self, text: &str) -> Result<CopyMethod> {
        if let Some(clipboard) = self.native.as_mut() {
            match clipboard.set_text(text.to_string()) {
                Ok(()) => return Ok(CopyMethod::Native),
                Err(err) => tracing::warn!(error = %err, "Native clipboard copy failed"),
            }
        }

        let mut stdout = std::io::stdout();
        stdout
            .write_all(osc52_sequence(text).as_bytes())
            .context("Failed to write OSC 52 sequence")?;
        stdout.flush().context("Failed to flush terminal")?;
        Ok(CopyMethod::Osc52)
    }
}

impl Default for ClipboardBridge {
    fn default() -> Self {
        Self::new()
    }
}

/// `ESC ] 52 ; c ; <base64> BEL`
pub fn osc52_sequence(text: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(text.as_bytes());
    format!("\x1b]52;c;{}\x07", encoded)
}
