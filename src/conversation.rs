//! Conversation data model: turns, attachment metadata and preferences.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString};

/// Text recorded for a user turn that carries a document but no message.
pub const DOCUMENT_ONLY_TEXT: &str = "Document uploaded";

/// Model turn committed whenever a request fails for any reason.
pub const MODEL_ERROR_TEXT: &str = "Error occurred while processing your request.";

/// Author of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn avatar(self) -> &'static str {
        match self {
            Role::User => "👤",
            Role::Model => "🔥",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Model => "Phoenix",
        }
    }
}

/// Document classes the backend knows how to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, EnumIter, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FileKind {
    Pdf,
    Docx,
    Doc,
    Txt,
}

impl FileKind {
    pub fn from_extension(extension: &str) -> Option<Self> {
        extension.trim_start_matches('.').parse().ok()
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "application/pdf" => Some(FileKind::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(FileKind::Docx)
            }
            "application/msword" => Some(FileKind::Doc),
            "text/plain" => Some(FileKind::Txt),
            _ => None,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            FileKind::Pdf => "application/pdf",
            FileKind::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            FileKind::Doc => "application/msword",
            FileKind::Txt => "text/plain",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FileKind::Pdf => "PDF",
            FileKind::Docx => "DOCX",
            FileKind::Doc => "DOC",
            FileKind::Txt => "TXT",
        }
    }
}

/// Descriptive metadata about an attached document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub filename: String,
    pub size: u64,
    pub kind: FileKind,
}

/// One message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredTurn", into = "StoredTurn")]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub attached_file: Option<FileMeta>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl Turn {
    pub fn user(text: impl Into<String>, attached_file: Option<FileMeta>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            attached_file,
            sent_at: Some(Utc::now()),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
            attached_file: None,
            sent_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

/// On-disk shape, compatible with the `{role, parts: [{text}]}` history format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTurn {
    role: Role,
    #[serde(default)]
    parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attached_file: Option<FileMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sent_at: Option<DateTime<Utc>>,
}

impl From<StoredTurn> for Turn {
    fn from(stored: StoredTurn) -> Self {
        let text = stored.parts.into_iter().map(|part| part.text).collect();
        Self {
            role: stored.role,
            text,
            attached_file: stored.attached_file,
            sent_at: stored.sent_at,
        }
    }
}

impl From<Turn> for StoredTurn {
    fn from(turn: Turn) -> Self {
        Self {
            role: turn.role,
            parts: vec![Part { text: turn.text }],
            attached_file: turn.attached_file,
            sent_at: turn.sent_at,
        }
    }
}

/// History entry as the backend expects it: role and text parts only.
#[derive(Debug, Serialize)]
pub struct HistoryEntry<'a> {
    role: Role,
    parts: [HistoryPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct HistoryPart<'a> {
    text: &'a str,
}

pub fn wire_history(turns: &[Turn]) -> Vec<HistoryEntry<'_>> {
    turns
        .iter()
        .map(|turn| HistoryEntry {
            role: turn.role,
            parts: [HistoryPart { text: &turn.text }],
        })
        .collect()
}

/// Ordered, append-only sequence of turns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn get(&self, index: usize) -> Option<&Turn> {
        self.turns.get(index)
    }

    /// Index of the newest model turn
    pub fn last_model_index(&self) -> Option<usize> {
        self.turns.iter().rposition(|turn| turn.role == Role::Model)
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

/// User preferences persisted across sessions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Preferences {
    pub streaming_enabled: bool,
}
