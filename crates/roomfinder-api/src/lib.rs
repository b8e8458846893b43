//! Roomfinder API crate - axum HTTP transport for the chat engine.
//!
//! Exposes conversation events, conversation state and search history
//! over JSON so any chat front end can drive the bot.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
