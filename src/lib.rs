//! Phoenix: a terminal chat client for a document-aware chat backend.

pub mod app;
pub mod attachment;
pub mod cli;
pub mod client;
pub mod clipboard;
pub mod config;
pub mod conversation;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod logging;
pub mod storage;
pub mod streaming;
pub mod tui;
pub mod ui;
