//! Conversational engine for Roomfinder.
//!
//! Drives the per-user search dialogue: validates answers, dispatches
//! hotel searches, formats results and records them in the search history.

pub mod error;
pub mod event;
pub mod format;
pub mod machine;
pub mod orchestrator;
pub mod query;
pub mod settings;
pub mod step;
pub mod strategy;
pub mod validate;
pub mod voice;

pub use error::ChatError;
pub use event::{
    Button, CalendarAction, CallbackAction, Command, DateField, Inbound, Keyboard, Outbound,
    UserInput,
};
pub use machine::{Conversation, ConversationSnapshot, StepContext};
pub use orchestrator::ChatOrchestrator;
pub use query::QueryState;
pub use settings::ChatSettings;
pub use step::Step;
pub use strategy::SearchDispatcher;
pub use validate::InvalidInput;
pub use voice::VoiceInterface;
