//! Conversation steps and their validated transitions.
//!
//! Idle -> AwaitingTown -> AwaitingCheckIn -> AwaitingCheckOut ->
//! AwaitingResultCount -> AwaitingCurrency -> [AwaitingPriceRange ->
//! AwaitingDistanceRange] -> Searching -> AwaitingPhotoChoice ->
//! AwaitingPhotoCount -> AwaitingHotelChoice -> AwaitingPhotoChoice ...

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// Where a conversation currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    #[default]
    Idle,
    AwaitingTown,
    AwaitingCheckIn,
    AwaitingCheckOut,
    AwaitingResultCount,
    AwaitingCurrency,
    AwaitingPriceRange,
    AwaitingDistanceRange,
    Searching,
    AwaitingPhotoChoice,
    AwaitingPhotoCount,
    AwaitingHotelChoice,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Idle => "idle",
            Step::AwaitingTown => "awaiting_town",
            Step::AwaitingCheckIn => "awaiting_check_in",
            Step::AwaitingCheckOut => "awaiting_check_out",
            Step::AwaitingResultCount => "awaiting_result_count",
            Step::AwaitingCurrency => "awaiting_currency",
            Step::AwaitingPriceRange => "awaiting_price_range",
            Step::AwaitingDistanceRange => "awaiting_distance_range",
            Step::Searching => "searching",
            Step::AwaitingPhotoChoice => "awaiting_photo_choice",
            Step::AwaitingPhotoCount => "awaiting_photo_count",
            Step::AwaitingHotelChoice => "awaiting_hotel_choice",
        }
    }

    /// Steps answered with a button rather than typed text.
    pub fn expects_button(&self) -> bool {
        matches!(
            self,
            Step::AwaitingCheckIn | Step::AwaitingCheckOut | Step::AwaitingHotelChoice
        )
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate that a step transition is allowed.
///
/// Any step may go back to `Idle` (reset) or to `AwaitingTown` (a fresh
/// search command). Everything else follows the search flow.
pub fn validate_transition(from: Step, to: Step) -> Result<(), ChatError> {
    let valid = matches!(to, Step::Idle | Step::AwaitingTown)
        || matches!(
            (from, to),
            (Step::AwaitingTown, Step::AwaitingCheckIn)
                | (Step::AwaitingCheckIn, Step::AwaitingCheckOut)
                | (Step::AwaitingCheckOut, Step::AwaitingResultCount)
                | (Step::AwaitingResultCount, Step::AwaitingCurrency)
                | (Step::AwaitingCurrency, Step::AwaitingPriceRange)
                | (Step::AwaitingCurrency, Step::Searching)
                | (Step::AwaitingPriceRange, Step::AwaitingDistanceRange)
                | (Step::AwaitingDistanceRange, Step::Searching)
                | (Step::Searching, Step::AwaitingPhotoChoice)
                | (Step::AwaitingPhotoChoice, Step::AwaitingPhotoCount)
                | (Step::AwaitingPhotoCount, Step::AwaitingHotelChoice)
                | (Step::AwaitingHotelChoice, Step::AwaitingPhotoChoice)
        );

    if valid {
        Ok(())
    } else {
        Err(ChatError::InvalidTransition(from, to))
    }
}
