//! SupportChat storage crate - SQLite persistence for documents and chats.
//!
//! Provides a WAL-mode SQLite database with migrations and the two
//! repositories the chat pipeline reads and writes: the document store
//! and the conversation store.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::{ChatRepository, DocumentRepository};
