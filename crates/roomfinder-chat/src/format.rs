//! User-facing texts and history lines.

use chrono::NaiveDate;

use roomfinder_core::types::{Currency, HotelRecord};

pub const WELCOME: &str = "Hello! I am the Roomfinder bot and I will help you find a hotel. \
                           Type /help to see what I can do.";

pub const HELP: &str = "Here is what I can do:\n\
                        /lowprice - cheapest hotels in a city;\n\
                        /highprice - most expensive hotels in a city;\n\
                        /bestdeal - hotels matching a price range and a distance from the center;\n\
                        /history - show your search history";

pub const GREETING_REPLY: &str = "Hello, traveller! Type /help to see what I can do.";
pub const NOT_UNDERSTOOD: &str =
    "I don't understand you. Repeat or type /help to see the available commands.";
pub const GENERIC_FAILURE: &str = "An unexpected error occurred. The service may be unavailable \
                                   right now. Please try again a bit later.";
pub const ANYTHING_ELSE: &str = "What else can I help you with? (/help for the list of commands)";
pub const CANCELLED: &str = "The request was cancelled. Type /help to see the available commands.";
pub const USE_BUTTONS: &str = "Please use the buttons above.";
pub const STALE_BUTTON: &str = "This button is no longer active.";

pub const VOICE_NOT_UNDERSTOOD: &str =
    "Sorry, I could not make out your voice message. Please repeat it or type it.";
pub const VOICE_UNAVAILABLE: &str =
    "Voice recognition is unavailable right now. Please type your message.";

pub const ASK_TOWN: &str = "Which city should I search in?";
pub const PLEASE_WAIT: &str = "Processing your request, please wait...";
pub const TOWN_NOT_FOUND: &str = "City not found. Check the name or enter another city:";
pub const CHOOSE_TOWN: &str = "Choose your city from the list:";

pub const ASK_CHECK_IN: &str = "Choose the CHECK-IN date:";
pub const CHECK_IN_IN_PAST: &str =
    "The check-in date cannot be earlier than today. Choose the CHECK-IN date:";

pub const RESULT_COUNT_INVALID: &str = "I don't understand you. Please enter a number:";
pub const ASK_CURRENCY: &str = "Choose the currency:";
pub const CURRENCY_INVALID: &str = "Unknown currency. Please choose a currency from the list below!";
pub const ASK_DISTANCE_RANGE: &str =
    "Enter the range of distance from the center in kilometres, separated by a space:";
pub const DISTANCE_RANGE_INVALID: &str = "I don't understand you. Enter two numbers in kilometres!";

pub const NOTHING_FOUND: &str = "Sorry, nothing was found for these parameters. \
                                 Try again with different search parameters.";
pub const ASK_PHOTOS: &str = "Would you like to see hotel photos?";
pub const YES_NO_INVALID: &str = "Please answer yes or no.";
pub const CHOOSE_HOTEL: &str = "Which hotel's photos should I show?";
pub const LOADING_PHOTOS: &str = "Loading photos, please wait...";
pub const NO_PHOTOS: &str =
    "No photos found for this hotel. Would you like to see photos of another hotel?";
pub const MORE_PHOTOS: &str = "Would you like to see photos of another hotel?";

pub const HISTORY_EMPTY: &str = "You have not searched for anything yet. \
                                 Enter a command, or /help for the list of commands.";
pub const HISTORY_CHOOSE: &str = "Choose a search from the list:";

/// History line written when a search found nothing.
pub const NOTHING_FOUND_LINE: &str = "Nothing found.";

pub fn ask_check_out(arrival: NaiveDate) -> String {
    format!("Check-in date: {}. Choose the CHECK-OUT date:", arrival)
}

pub fn check_out_not_after(arrival: NaiveDate) -> String {
    format!(
        "The check-out date must be later than the check-in date ({}). Choose the CHECK-OUT date:",
        arrival
    )
}

pub fn ask_result_count(arrival: NaiveDate, departure: NaiveDate, max: u32) -> String {
    format!(
        "Check-in date: {}, check-out date: {}.\nHow many hotels should I show? (no more than {})",
        arrival, departure, max
    )
}

pub fn ask_price_range(currency: Currency) -> String {
    format!(
        "Enter the price range in {}, separated by a space:",
        currency.label()
    )
}

pub fn price_range_invalid(currency: Currency) -> String {
    format!(
        "I don't understand you. Enter two amounts in {}:",
        currency.label()
    )
}

pub fn ask_photo_count(max: u32) -> String {
    format!("How many photos should I show? (no more than {})", max)
}

pub fn photo_count_out_of_range(max: u32) -> String {
    format!(
        "I can show you no more than {} photos. Enter a number from 1 to {}.",
        max, max
    )
}

pub fn photo_count_invalid(max: u32) -> String {
    format!("I don't understand you. Enter a number from 1 to {}!", max)
}

/// History line recording the chosen town.
pub fn town_line(town: &str) -> String {
    format!("Town: {}", town)
}

/// Numbered result lines, `"1. <hotel>"`, in presentation order.
pub fn result_lines(records: &[HotelRecord]) -> Vec<String> {
    records
        .iter()
        .enumerate()
        .map(|(i, hotel)| format!("{}. {}", i + 1, hotel))
        .collect()
}

/// Whether free text is a greeting.
pub fn is_greeting(text: &str) -> bool {
    matches!(
        text.trim().to_lowercase().as_str(),
        "hello" | "hi" | "привет"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> HotelRecord {
        HotelRecord {
            name: name.to_string(),
            address: "1 Main St".to_string(),
            price_summary: "$90".to_string(),
            distance_from_center: "0,4 km".to_string(),
            provider_id: "1".to_string(),
            photo_urls: vec![],
        }
    }

    #[test]
    fn test_result_lines_are_numbered() {
        let lines = result_lines(&[record("A"), record("B")]);
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "1. A is located at: 1 Main St, 0,4 km from the center. Total price: $90"
        );
        assert!(lines[1].starts_with("2. B "));
        assert!(result_lines(&[]).is_empty());
    }

    #[test]
    fn test_prompts_mention_values() {
        let d = NaiveDate::from_ymd_opt(2026, 11, 1).unwrap();
        assert!(ask_check_out(d).contains("2026-11-01"));
        assert!(check_out_not_after(d).contains("2026-11-01"));
        assert!(ask_result_count(d, d, 25).contains("no more than 25"));
        assert!(ask_price_range(Currency::Eur).contains("euros"));
        assert!(price_range_invalid(Currency::Rub).contains("roubles"));
        assert!(photo_count_out_of_range(7).contains("from 1 to 7"));
    }

    #[test]
    fn test_town_line() {
        assert_eq!(town_line("Paris"), "Town: Paris");
    }

    #[test]
    fn test_is_greeting() {
        assert!(is_greeting("Hello"));
        assert!(is_greeting(" hi "));
        assert!(is_greeting("Привет"));
        assert!(!is_greeting("hello there"));
    }

    #[test]
    fn test_help_lists_every_command() {
        for cmd in ["/lowprice", "/highprice", "/bestdeal", "/history"] {
            assert!(HELP.contains(cmd));
        }
    }
}
