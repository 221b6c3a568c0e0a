//! Application state and the update functions that drive it.
//!
//! [`AppState`] owns the conversation, preferences, input box, and stream buffer.
//! Every mutation goes through a method here so persistence happens in one place,
//! and the UI only ever reads the state back to render it.

use crate::attachment::Attachment;
use crate::client::ChatRequest;
use crate::conversation::{
    Conversation, DOCUMENT_ONLY_TEXT, MODEL_ERROR_TEXT, Preferences, Turn,
};
use crate::dispatcher::{DispatchMode, Submission};
use crate::error::{DispatchError, InputError};
use crate::events::DispatchEvent;
use crate::storage::{self, KeyValueStore};
use crate::streaming::StreamBuffer;
use std::path::Path;

pub const IDLE_PLACEHOLDER: &str = "Ask Phoenix...";
pub const ATTACHMENT_PLACEHOLDER: &str = "Ask something about the document...";
pub const WAITING_PLACEHOLDER: &str = "Waiting for model's response";

/// One-line status shown above the composer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Validation(String),
    Info(String),
    Error(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Validation(message) | Notice::Info(message) | Notice::Error(message) => {
                message
            }
        }
    }
}

/// Text box contents plus the document queued for the next send
#[derive(Debug, Default)]
pub struct InputState {
    text: String,
    /// Cursor position in characters
    cursor: usize,
    disabled: bool,
    attachment: Option<Attachment>,
}

impl InputState {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    pub fn placeholder(&self) -> &'static str {
        if self.disabled {
            WAITING_PLACEHOLDER
        } else if self.attachment.is_some() {
            ATTACHMENT_PLACEHOLDER
        } else {
            IDLE_PLACEHOLDER
        }
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_index)
            .map(|(index, _)| index)
            .unwrap_or(self.text.len())
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn insert_char(&mut self, c: char) {
        if self.disabled {
            return;
        }
        let at = self.byte_index(self.cursor);
        self.text.insert(at, c);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, s: &str) {
        for c in s.chars() {
            self.insert_char(c);
        }
    }

    /// Delete the character before the cursor
    pub fn backspace(&mut self) -> bool {
        if self.disabled || self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.text.remove(at);
        true
    }

    /// Delete the character under the cursor
    pub fn delete(&mut self) -> bool {
        if self.disabled || self.cursor >= self.char_len() {
            return false;
        }
        let at = self.byte_index(self.cursor);
        self.text.remove(at);
        true
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_len());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.char_len();
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        if self.disabled {
            return;
        }
        self.text = text.into();
        self.cursor = self.char_len();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }
}

/// Injectable application state; `S` is where history and preferences persist
pub struct AppState<S: KeyValueStore> {
    store: S,
    conversation: Conversation,
    preferences: Preferences,
    input: InputState,
    stream: StreamBuffer,
    in_flight: Option<DispatchMode>,
    notice: Option<Notice>,
    /// Lines scrolled back from the bottom of the history view
    scroll_back: usize,
    copied_turn: Option<usize>,
}

impl<S: KeyValueStore> AppState<S> {
    /// Restore conversation and preferences from `store`
    pub fn load(store: S) -> Self {
        let conversation = storage::load_conversation(&store);
        let preferences = storage::load_preferences(&store);
        tracing::info!(
            turns = conversation.len(),
            streaming = preferences.streaming_enabled,
            "Restored saved state"
        );

        Self {
            store,
            conversation,
            preferences,
            input: InputState::default(),
            stream: StreamBuffer::new(),
            in_flight: None,
            notice: None,
            scroll_back: 0,
            copied_turn: None,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn preferences(&self) -> Preferences {
        self.preferences
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    pub fn stream(&self) -> &StreamBuffer {
        &self.stream
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn scroll_back(&self) -> usize {
        self.scroll_back
    }

    pub fn copied_turn(&self) -> Option<usize> {
        self.copied_turn
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight_mode(&self) -> Option<DispatchMode> {
        self.in_flight
    }

    pub fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Validate and accept the input using the stored mode preference
    pub fn submit(&mut self) -> Result<Submission, InputError> {
        let mode = DispatchMode::from_streaming(self.preferences.streaming_enabled);
        self.submit_as(mode)
    }

    /// Validate and accept the input, appending the user turn.
    ///
    /// The request carries the history as it was before this turn; the text box
    /// is cleared, the attachment consumed, and input stays disabled until
    /// [`AppState::finish`] runs.
    pub fn submit_as(&mut self, mode: DispatchMode) -> Result<Submission, InputError> {
        if self.is_busy() {
            self.notice = Some(Notice::Validation(InputError::Busy.to_string()));
            return Err(InputError::Busy);
        }

        let text = self.input.text.trim().to_string();
        if text.is_empty() && self.input.attachment.is_none() {
            tracing::debug!("Rejected empty submission");
            self.notice = Some(Notice::Validation(InputError::Empty.to_string()));
            return Err(InputError::Empty);
        }

        let history = self.conversation.turns().to_vec();
        let attachment = self.input.attachment.take();
        let turn_text = if text.is_empty() {
            DOCUMENT_ONLY_TEXT.to_string()
        } else {
            text.clone()
        };

        self.append(Turn::user(
            turn_text,
            attachment.as_ref().map(|attachment| attachment.meta.clone()),
        ));

        self.input.clear();
        self.input.disabled = true;
        self.in_flight = Some(mode);
        self.stream.clear();
        self.notice = None;

        Ok(Submission {
            request: ChatRequest {
                text,
                history,
                attachment,
            },
            mode,
        })
    }

    /// Route a dispatcher event to the matching update
    pub fn apply(&mut self, event: DispatchEvent) {
        match event {
            DispatchEvent::StreamOpened => self.stream_opened(),
            DispatchEvent::Chunk(chunk) => self.push_chunk(&chunk),
            DispatchEvent::Finished(outcome) => {
                self.finish(outcome);
            }
        }
    }

    /// The streaming response was accepted; show the typing bubble
    pub fn stream_opened(&mut self) {
        if self.in_flight == Some(DispatchMode::Streaming) {
            self.stream.start();
        }
    }

    pub fn push_chunk(&mut self, chunk: &str) {
        if self.in_flight != Some(DispatchMode::Streaming) {
            return;
        }
        self.stream.push_chunk(chunk);
        self.follow_bottom();
    }

    /// Commit exactly one model turn for the outstanding request and re-enable input.
    ///
    /// Failures commit [`MODEL_ERROR_TEXT`]; any partial stream text is discarded.
    /// Returns `None` when no request is outstanding.
    pub fn finish(&mut self, outcome: Result<String, DispatchError>) -> Option<&Turn> {
        let mode = self.in_flight.take()?;

        let partial = self.stream.take();
        let text = match outcome {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(
                    ?mode,
                    error = %err,
                    discarded_chars = partial.chars().count(),
                    "Replacing failed reply with error turn"
                );
                MODEL_ERROR_TEXT.to_string()
            }
        };

        self.append(Turn::model(text));
        self.input.disabled = false;
        self.conversation.last()
    }

    fn append(&mut self, turn: Turn) {
        self.conversation.push(turn);
        storage::save_conversation(&mut self.store, &self.conversation);
        self.follow_bottom();
    }

    pub fn set_streaming(&mut self, enabled: bool) {
        self.preferences.streaming_enabled = enabled;
        storage::save_preferences(&mut self.store, &self.preferences);
    }

    /// Flip the streaming preference; affects later submissions only
    pub fn toggle_streaming(&mut self) -> bool {
        let enabled = !self.preferences.streaming_enabled;
        self.set_streaming(enabled);
        enabled
    }

    /// Empty the conversation and drop its persisted copy
    pub fn clear_history(&mut self) -> Result<(), InputError> {
        if self.is_busy() {
            self.notice = Some(Notice::Validation(InputError::Busy.to_string()));
            return Err(InputError::Busy);
        }

        self.conversation.clear();
        storage::clear_conversation(&mut self.store);
        self.copied_turn = None;
        self.scroll_back = 0;
        self.notice = Some(Notice::Info("Chat history cleared.".to_string()));
        Ok(())
    }

    pub fn attach(&mut self, attachment: Attachment) {
        self.notice = Some(Notice::Info(format!(
            "Attached {}",
            attachment.meta.filename
        )));
        self.input.attachment = Some(attachment);
    }

    /// Read a document from disk and queue it; rejects unsupported files with a notice
    pub fn attach_path(&mut self, path: &Path) -> Result<(), InputError> {
        if self.input.disabled {
            return Err(InputError::Busy);
        }

        match Attachment::from_path(path) {
            Ok(attachment) => {
                self.attach(attachment);
                Ok(())
            }
            Err(err) => {
                self.notice = Some(Notice::Validation(err.to_string()));
                Err(err)
            }
        }
    }

    pub fn detach(&mut self) -> Option<Attachment> {
        let removed = self.input.attachment.take();
        if removed.is_some() {
            self.notice = Some(Notice::Info("Attachment removed.".to_string()));
        }
        removed
    }

    /// Text to copy: a model turn by index, the newest model turn, or the live stream
    pub fn copy_source(&self, index: Option<usize>) -> Option<String> {
        match index {
            Some(index) => self
                .conversation
                .get(index)
                .filter(|turn| turn.role == crate::conversation::Role::Model)
                .map(|turn| turn.text.clone()),
            None if self.stream.should_render() => Some(self.stream.text().to_string()),
            None => self
                .conversation
                .last_model_index()
                .and_then(|index| self.conversation.get(index))
                .map(|turn| turn.text.clone()),
        }
    }

    pub fn mark_copied(&mut self, index: Option<usize>) {
        self.copied_turn = index.or_else(|| {
            if self.stream.should_render() {
                None
            } else {
                self.conversation.last_model_index()
            }
        });
        self.notice = Some(Notice::Info("Copied!".to_string()));
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_back = self.scroll_back.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_back = self.scroll_back.saturating_sub(lines);
    }

    /// Snap the history view back to the newest content
    pub fn follow_bottom(&mut self) {
        self.scroll_back = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{FileKind, Role};
    use crate::storage::{FileStore, MemoryStore};

    fn app() -> AppState<MemoryStore> {
        AppState::load(MemoryStore::new())
    }

    /// Reads come back empty; every write fails like a full disk
    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Ok(None)
        }

        fn set(&mut self, key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("no space left on device writing {}", key)
        }

        fn remove(&mut self, key: &str) -> anyhow::Result<()> {
            anyhow::bail!("permission denied removing {}", key)
        }
    }

    fn type_text<S: KeyValueStore>(app: &mut AppState<S>, text: &str) {
        app.input_mut().set_text(text);
    }

    fn txt_attachment() -> Attachment {
        Attachment::from_bytes("notes.txt", None, b"some notes".to_vec()).unwrap()
    }

    #[test]
    fn empty_submission_is_rejected_without_mutation() {
        let mut app = app();
        type_text(&mut app, "   \n\t ");

        assert_eq!(app.submit().unwrap_err(), InputError::Empty);
        assert!(app.conversation().is_empty());
        assert!(!app.is_busy());
        assert!(matches!(app.notice(), Some(Notice::Validation(_))));
        assert_eq!(app.store().get(storage::HISTORY_KEY).unwrap(), None);
    }

    #[test]
    fn file_alone_is_accepted() {
        let mut app = app();
        app.attach(txt_attachment());

        let submission = app.submit().unwrap();

        assert_eq!(submission.request.text, "");
        assert_eq!(
            submission.request.attachment.as_ref().map(|a| a.meta.kind),
            Some(FileKind::Txt)
        );
        let turn = app.conversation().last().unwrap();
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.text, DOCUMENT_ONLY_TEXT);
        assert_eq!(turn.attached_file.as_ref().unwrap().filename, "notes.txt");
        assert!(app.input().attachment().is_none());
    }

    #[test]
    fn accepted_submission_disables_input_until_finished() {
        let mut app = app();
        type_text(&mut app, "  hi there  ");

        let submission = app.submit().unwrap();
        assert_eq!(submission.request.text, "hi there");
        assert!(submission.request.history.is_empty());
        assert_eq!(submission.mode, DispatchMode::Buffered);
        assert!(app.is_busy());
        assert!(app.input().is_disabled());
        assert_eq!(app.input().text(), "");
        assert_eq!(app.input().placeholder(), WAITING_PLACEHOLDER);

        app.input_mut().insert_char('x');
        assert_eq!(app.input().text(), "");
        assert_eq!(app.submit().unwrap_err(), InputError::Busy);
        assert_eq!(app.conversation().len(), 1);

        app.finish(Ok("reply".to_string()));
        assert!(!app.is_busy());
        assert!(!app.input().is_disabled());
        assert_eq!(app.input().placeholder(), IDLE_PLACEHOLDER);
    }

    #[test]
    fn buffered_success_appends_model_turn() {
        let mut app = app();
        type_text(&mut app, "greet me");
        app.submit().unwrap();

        app.apply(DispatchEvent::Finished(Ok("hello".to_string())));

        let turns = app.conversation().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].role, Role::Model);
        assert_eq!(turns[1].text, "hello");
    }

    #[test]
    fn streaming_chunks_fill_buffer_then_commit() {
        let mut app = app();
        app.set_streaming(true);
        type_text(&mut app, "greet me");
        let submission = app.submit().unwrap();
        assert_eq!(submission.mode, DispatchMode::Streaming);

        assert_eq!(app.stream().text(), "");
        app.apply(DispatchEvent::StreamOpened);
        assert!(!app.stream().should_render());

        app.apply(DispatchEvent::Chunk("he".to_string()));
        assert_eq!(app.stream().text(), "he");
        assert!(app.stream().should_render());

        app.apply(DispatchEvent::Chunk("llo".to_string()));
        assert_eq!(app.stream().text(), "hello");

        app.apply(DispatchEvent::Finished(Ok("hello".to_string())));
        let last = app.conversation().last().unwrap();
        assert_eq!(last.role, Role::Model);
        assert_eq!(last.text, "hello");
        assert_eq!(app.stream().text(), "");
        assert!(!app.stream().is_visible());
        assert!(!app.is_busy());
    }

    #[test]
    fn failed_stream_discards_partial_text() {
        let mut app = app();
        app.set_streaming(true);
        type_text(&mut app, "tell me a story");
        app.submit().unwrap();
        app.apply(DispatchEvent::StreamOpened);
        app.apply(DispatchEvent::Chunk("Once upon".to_string()));

        app.apply(DispatchEvent::Finished(Err(DispatchError::Network(
            "reset".to_string(),
        ))));

        let turns = app.conversation().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].text, MODEL_ERROR_TEXT);
        assert!(!app.stream().should_render());
        assert!(!app.input().is_disabled());
    }

    #[test]
    fn every_resolution_appends_exactly_one_model_turn() {
        let outcomes = vec![
            Ok("fine".to_string()),
            Err(DispatchError::Status {
                status: 500,
                body: "boom".to_string(),
            }),
            Err(DispatchError::Cancelled),
        ];

        let mut app = app();
        for (round, outcome) in outcomes.into_iter().enumerate() {
            type_text(&mut app, "question");
            app.submit().unwrap();
            app.finish(outcome);

            assert_eq!(app.conversation().len(), (round + 1) * 2);
            assert_eq!(app.conversation().last().unwrap().role, Role::Model);
            assert!(!app.is_busy());
        }
    }

    #[test]
    fn finish_without_request_is_ignored() {
        let mut app = app();
        assert!(app.finish(Ok("stray".to_string())).is_none());
        assert!(app.conversation().is_empty());
    }

    #[test]
    fn second_request_carries_prior_history() {
        let mut app = app();
        type_text(&mut app, "first");
        app.submit().unwrap();
        app.finish(Ok("one".to_string()));

        type_text(&mut app, "second");
        let submission = app.submit().unwrap();
        let history: Vec<&str> = submission
            .request
            .history
            .iter()
            .map(|turn| turn.text.as_str())
            .collect();
        assert_eq!(history, vec!["first", "one"]);
    }

    #[test]
    fn mode_is_captured_at_submit_time() {
        let mut app = app();
        type_text(&mut app, "hello");
        app.submit().unwrap();
        app.toggle_streaming();

        // Chunks for a buffered request are ignored even after the toggle
        app.apply(DispatchEvent::Chunk("stray".to_string()));
        assert_eq!(app.stream().text(), "");
        assert_eq!(app.in_flight_mode(), Some(DispatchMode::Buffered));
    }

    #[test]
    fn reload_restores_conversation_and_preference() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = AppState::load(FileStore::new(dir.path()));
        for round in 0..3 {
            type_text(&mut app, &format!("question {}", round));
            app.submit().unwrap();
            app.finish(Ok(format!("answer {}", round)));
        }
        app.toggle_streaming();
        let before = app.conversation().clone();
        drop(app);

        let reloaded = AppState::load(FileStore::new(dir.path()));
        assert_eq!(reloaded.conversation(), &before);
        assert_eq!(reloaded.conversation().len(), 6);
        assert!(reloaded.preferences().streaming_enabled);
    }

    #[test]
    fn clearing_history_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = AppState::load(FileStore::new(dir.path()));
        type_text(&mut app, "remember me");
        app.submit().unwrap();
        app.finish(Ok("noted".to_string()));

        app.clear_history().unwrap();
        assert!(app.conversation().is_empty());
        assert!(!dir.path().join("phoenixChatHistory.json").exists());

        let reloaded = AppState::load(FileStore::new(dir.path()));
        assert!(reloaded.conversation().is_empty());
    }

    #[test]
    fn clearing_is_refused_while_waiting() {
        let mut app = app();
        type_text(&mut app, "hello");
        app.submit().unwrap();
        assert_eq!(app.clear_history().unwrap_err(), InputError::Busy);
        assert_eq!(app.conversation().len(), 1);
    }

    #[test]
    fn toggling_streaming_persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = AppState::load(FileStore::new(dir.path()));
        assert!(!app.preferences().streaming_enabled);
        assert!(app.toggle_streaming());
        drop(app);

        let mut reloaded = AppState::load(FileStore::new(dir.path()));
        assert!(reloaded.preferences().streaming_enabled);
        assert!(!reloaded.toggle_streaming());

        let again = AppState::load(FileStore::new(dir.path()));
        assert!(!again.preferences().streaming_enabled);
    }

    #[test]
    fn unsupported_attachment_sets_notice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.png");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let mut app = app();
        assert!(matches!(
            app.attach_path(&path),
            Err(InputError::UnsupportedFile(_))
        ));
        assert!(app.input().attachment().is_none());
        assert!(matches!(app.notice(), Some(Notice::Validation(_))));
    }

    #[test]
    fn placeholder_reflects_attachment() {
        let mut app = app();
        assert_eq!(app.input().placeholder(), IDLE_PLACEHOLDER);
        app.attach(txt_attachment());
        assert_eq!(app.input().placeholder(), ATTACHMENT_PLACEHOLDER);
        assert!(app.detach().is_some());
        assert_eq!(app.input().placeholder(), IDLE_PLACEHOLDER);
    }

    #[test]
    fn editing_is_character_aware() {
        let mut input = InputState::default();
        input.insert_str("héllo");
        input.move_left();
        input.move_left();
        assert!(input.backspace());
        assert_eq!(input.text(), "hélo");
        input.move_home();
        assert!(input.delete());
        assert_eq!(input.text(), "élo");
        input.move_end();
        input.insert_char('!');
        assert_eq!(input.text(), "élo!");
        assert_eq!(input.cursor(), 4);
    }

    #[test]
    fn copy_prefers_live_stream_then_newest_model_turn() {
        let mut app = app();
        assert_eq!(app.copy_source(None), None);

        type_text(&mut app, "q");
        app.submit().unwrap();
        app.finish(Ok("answer".to_string()));
        assert_eq!(app.copy_source(None).as_deref(), Some("answer"));
        assert_eq!(app.copy_source(Some(0)), None);
        assert_eq!(app.copy_source(Some(1)).as_deref(), Some("answer"));

        app.set_streaming(true);
        type_text(&mut app, "q2");
        app.submit().unwrap();
        app.apply(DispatchEvent::StreamOpened);
        app.apply(DispatchEvent::Chunk("live".to_string()));
        assert_eq!(app.copy_source(None).as_deref(), Some("live"));
    }

    #[test]
    fn failing_writes_never_block_the_session() {
        let mut app = AppState::load(ReadOnlyStore);

        type_text(&mut app, "still works?");
        let submission = app.submit().unwrap();
        assert_eq!(submission.request.text, "still works?");
        assert!(app.input().is_disabled());

        app.finish(Ok("yes".to_string()));
        assert_eq!(app.conversation().len(), 2);
        assert_eq!(app.conversation().last().unwrap().text, "yes");
        assert!(!app.is_busy());
        assert!(!app.input().is_disabled());

        assert!(app.toggle_streaming());
        assert!(app.preferences().streaming_enabled);

        app.clear_history().unwrap();
        assert!(app.conversation().is_empty());
        assert!(!app.input().is_disabled());

        type_text(&mut app, "again");
        assert_eq!(app.submit().unwrap().mode, DispatchMode::Streaming);
    }

    #[test]
    fn new_content_snaps_scroll_to_bottom() {
        let mut app = app();
        app.scroll_up(5);
        app.scroll_down(2);
        assert_eq!(app.scroll_back(), 3);

        app.set_streaming(true);
        type_text(&mut app, "q");
        app.submit().unwrap();
        assert_eq!(app.scroll_back(), 0);

        app.scroll_up(4);
        app.apply(DispatchEvent::Chunk("x".to_string()));
        assert_eq!(app.scroll_back(), 0);
    }
}
