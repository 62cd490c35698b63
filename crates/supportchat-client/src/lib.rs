//! Client library for the SupportChat API.
//!
//! `ApiClient` wraps the HTTP endpoints. `ChatStore` and `AdminStore` hold
//! the conversation and document-list state a front-end renders, and are
//! constructed once and passed by reference.

pub mod admin_store;
pub mod api;
pub mod chat_store;
pub mod error;
pub mod session;

pub use admin_store::AdminStore;
pub use api::ApiClient;
pub use chat_store::ChatStore;
pub use error::ClientError;
pub use session::load_or_create_session_id;
