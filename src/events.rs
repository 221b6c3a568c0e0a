use crate::error::DispatchError;

/// Progress reported by an in-flight chat request
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEvent {
    /// Streaming response accepted; the typing bubble may appear
    StreamOpened,

    /// Newly decoded text from the stream
    Chunk(String),

    /// Request resolved: full reply text or why there is none
    Finished(Result<String, DispatchError>),
}

/// Terminal-side events fed to the UI loop
#[derive(Debug, Clone)]
pub enum TuiEvent {
    /// Key press event
    Key(crossterm::event::KeyEvent),

    /// Bracketed paste
    Paste(String),

    /// Terminal resize
    Resize(u16, u16),

    /// Nothing happened within the poll window
    Tick,
}

impl TuiEvent {
    /// Map a raw crossterm event; mouse and focus events are ignored
    pub fn from_crossterm(event: crossterm::event::Event) -> Option<Self> {
        use crossterm::event::{Event, KeyEventKind};

        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => Some(TuiEvent::Key(key)),
            Event::Paste(text) => Some(TuiEvent::Paste(text)),
            Event::Resize(width, height) => Some(TuiEvent::Resize(width, height)),
            _ => None,
        }
    }
}
