//! Pure input validators.
//!
//! Every function returns the parsed value or an [`InvalidInput`] that the
//! state machine answers by re-prompting the same step.

use std::str::FromStr;

use chrono::NaiveDate;

use roomfinder_core::types::{Currency, DistanceRange, PriceRange};

/// Why a piece of user input was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidInput {
    #[error("town name must contain letters")]
    NotATownName,
    #[error("expected a positive whole number")]
    NotPositiveInteger,
    #[error("number is too large")]
    TooLarge,
    #[error("unknown currency: {0}")]
    UnknownCurrency(String),
    #[error("expected exactly two numbers, found {0}")]
    WrongNumberCount(usize),
    #[error("photo count must be between 1 and {0}")]
    PhotoCountOutOfRange(u32),
    #[error("expected yes or no")]
    NotYesNo,
    #[error("check-in date {0} is in the past")]
    ArrivalInPast(NaiveDate),
    #[error("check-out date {departure} must be after check-in {arrival}")]
    DepartureNotAfterArrival {
        arrival: NaiveDate,
        departure: NaiveDate,
    },
}

fn is_digits(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

fn is_decimal(token: &str) -> bool {
    token.bytes().any(|b| b.is_ascii_digit())
        && token.bytes().all(|b| b.is_ascii_digit() || b == b'.')
        && token.bytes().filter(|b| *b == b'.').count() <= 1
}

/// Town name as typed: trimmed, with at least one letter.
///
/// Any alphabet is accepted; the provider decides whether the town exists.
pub fn parse_town(text: &str) -> Result<&str, InvalidInput> {
    let name = text.trim();
    if name.chars().any(char::is_alphabetic) {
        Ok(name)
    } else {
        Err(InvalidInput::NotATownName)
    }
}

/// Number of results to request: a positive integer.
///
/// No upper bound is enforced here; the dispatcher caps the page size.
pub fn parse_result_count(text: &str) -> Result<u32, InvalidInput> {
    let text = text.trim();
    if !is_digits(text) {
        return Err(InvalidInput::NotPositiveInteger);
    }
    match text.parse::<u32>() {
        Ok(0) => Err(InvalidInput::NotPositiveInteger),
        Ok(n) => Ok(n),
        Err(_) => Err(InvalidInput::TooLarge),
    }
}

/// Currency code, matched exactly and case-sensitively.
pub fn parse_currency(text: &str) -> Result<Currency, InvalidInput> {
    Currency::from_str(text).map_err(|_| InvalidInput::UnknownCurrency(text.to_string()))
}

/// Two whitespace-separated whole numbers, returned in ascending order.
///
/// Tokens that are not whole numbers are ignored, so `"from 100 to 200"`
/// is accepted.
pub fn parse_price_range(text: &str) -> Result<PriceRange, InvalidInput> {
    let tokens: Vec<&str> = text.split_whitespace().filter(|t| is_digits(t)).collect();
    if tokens.len() != 2 {
        return Err(InvalidInput::WrongNumberCount(tokens.len()));
    }
    let a = tokens[0].parse::<u32>().map_err(|_| InvalidInput::TooLarge)?;
    let b = tokens[1].parse::<u32>().map_err(|_| InvalidInput::TooLarge)?;
    Ok(PriceRange::new(a, b))
}

/// Two non-negative distances in kilometres, returned in ascending order.
///
/// A decimal comma is accepted: `"0,3 1,5"` parses as `(0.3, 1.5)`.
pub fn parse_distance_range(text: &str) -> Result<DistanceRange, InvalidInput> {
    let normalized = text.replace(',', ".");
    let values: Vec<f64> = normalized
        .split_whitespace()
        .filter(|t| is_decimal(t))
        .filter_map(|t| t.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .collect();
    if values.len() != 2 {
        return Err(InvalidInput::WrongNumberCount(values.len()));
    }
    Ok(DistanceRange::new(values[0], values[1]))
}

/// Number of photos to show: digits only, within `1..=max`.
pub fn parse_photo_count(text: &str, max: u32) -> Result<u32, InvalidInput> {
    if !is_digits(text) {
        return Err(InvalidInput::NotPositiveInteger);
    }
    match text.parse::<u32>() {
        Ok(n) if (1..=max).contains(&n) => Ok(n),
        _ => Err(InvalidInput::PhotoCountOutOfRange(max)),
    }
}

/// A typed yes/no answer, for users who reply instead of pressing a button.
pub fn parse_yes_no(text: &str) -> Result<bool, InvalidInput> {
    match text.trim().to_lowercase().as_str() {
        "yes" | "y" | "да" => Ok(true),
        "no" | "n" | "нет" => Ok(false),
        _ => Err(InvalidInput::NotYesNo),
    }
}

/// Check-in must not be in the past.
pub fn check_arrival(date: NaiveDate, today: NaiveDate) -> Result<NaiveDate, InvalidInput> {
    if date < today {
        return Err(InvalidInput::ArrivalInPast(date));
    }
    Ok(date)
}

/// Check-out must be strictly after check-in.
pub fn check_departure(date: NaiveDate, arrival: NaiveDate) -> Result<NaiveDate, InvalidInput> {
    if date <= arrival {
        return Err(InvalidInput::DepartureNotAfterArrival {
            arrival,
            departure: date,
        });
    }
    Ok(date)
}
