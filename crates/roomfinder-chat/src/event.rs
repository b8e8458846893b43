//! Inbound and outbound conversation events.
//!
//! Buttons carry a typed [`CallbackAction`] that is serialized as tagged
//! JSON, so the transport never has to pack or split strings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use roomfinder_core::types::SearchMode;

// =============================================================================
// Commands
// =============================================================================

/// Slash commands understood in any step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    History,
    Search(SearchMode),
}

impl Command {
    /// Parse a message as a command. Only exact command words match.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "/start" => Some(Command::Start),
            "/help" => Some(Command::Help),
            "/history" => Some(Command::History),
            other => SearchMode::from_command(other).map(Command::Search),
        }
    }

    /// Whether this command abandons whatever the conversation was doing.
    pub fn interrupts(&self) -> bool {
        matches!(self, Command::Start | Command::Search(_))
    }
}

// =============================================================================
// Callbacks
// =============================================================================

/// Which date a calendar keyboard is collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateField {
    CheckIn,
    CheckOut,
}

/// Result of an interaction with the calendar widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalendarAction {
    Day { date: NaiveDate },
    Cancel,
}

/// Payload of a pressed button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallbackAction {
    /// One of the towns offered after a lookup.
    ChooseTown { name: String, location_id: String },
    Calendar {
        field: DateField,
        action: CalendarAction,
    },
    /// Answer to "show photos?".
    Photos { wanted: bool },
    /// Index into the current search results.
    ChooseHotel { index: usize },
    /// Index into the grouped history entries.
    ShowHistory { index: usize },
}

impl CallbackAction {
    /// Whether this callback abandons whatever the conversation was doing.
    pub fn interrupts(&self) -> bool {
        matches!(
            self,
            CallbackAction::Calendar {
                action: CalendarAction::Cancel,
                ..
            }
        )
    }
}

// =============================================================================
// Inputs
// =============================================================================

/// One inbound event as delivered by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Text(String),
    Voice(Vec<u8>),
    Callback(CallbackAction),
}

impl Inbound {
    /// Whether the event should cancel an in-flight step of the same user.
    ///
    /// Voice is decided only once it is transcribed and never interrupts.
    pub fn interrupts(&self) -> bool {
        match self {
            Inbound::Text(text) => Command::parse(text).is_some_and(|c| c.interrupts()),
            Inbound::Callback(action) => action.interrupts(),
            Inbound::Voice(_) => false,
        }
    }
}

/// An event after voice messages have been transcribed.
///
/// Transcription failures stay distinguishable so each can be answered
/// with its own message.
#[derive(Debug, Clone, PartialEq)]
pub enum UserInput {
    Text(String),
    NotUnderstood,
    TranscriptionUnavailable,
    Callback(CallbackAction),
}

// =============================================================================
// Outputs
// =============================================================================

/// A button on an inline keyboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub action: CallbackAction,
}

impl Button {
    pub fn new(label: impl Into<String>, action: CallbackAction) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// Keyboard attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Keyboard {
    /// Inline buttons, one per row.
    Buttons { buttons: Vec<Button> },
    /// Calendar widget opened on the given month.
    Calendar {
        field: DateField,
        year: i32,
        month: u32,
    },
    /// Reply keyboard whose buttons send their label as text.
    Replies { options: Vec<String> },
    /// Remove a previously shown reply keyboard.
    Remove,
}

impl Keyboard {
    pub fn yes_no() -> Self {
        Keyboard::Buttons {
            buttons: vec![
                Button::new("yes", CallbackAction::Photos { wanted: true }),
                Button::new("no", CallbackAction::Photos { wanted: false }),
            ],
        }
    }
}

/// One outgoing message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        keyboard: Option<Keyboard>,
    },
    Photo {
        url: String,
        caption: String,
    },
}

impl Outbound {
    pub fn text(text: impl Into<String>) -> Self {
        Outbound::Text {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Outbound::Text {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }

    /// Message text, or the caption for photos.
    pub fn body(&self) -> &str {
        match self {
            Outbound::Text { text, .. } => text,
            Outbound::Photo { caption, .. } => caption,
        }
    }

    pub fn keyboard(&self) -> Option<&Keyboard> {
        match self {
            Outbound::Text { keyboard, .. } => keyboard.as_ref(),
            Outbound::Photo { .. } => None,
        }
    }
}
