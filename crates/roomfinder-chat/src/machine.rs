//! The per-user conversation state machine.
//!
//! [`Conversation::handle`] consumes one [`UserInput`], advances at most one
//! step and returns the replies to send. Validation failures re-prompt in
//! place; collaborator failures and invalid transitions reset the
//! conversation and answer with a generic failure.

use std::future::Future;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use roomfinder_core::types::{Currency, SearchMode, UserId};
use roomfinder_history::{header_line, HistoryLog};
use roomfinder_provider::HotelProvider;

use crate::error::ChatError;
use crate::event::{
    Button, CalendarAction, CallbackAction, Command, DateField, Keyboard, Outbound, UserInput,
};
use crate::format;
use crate::query::QueryState;
use crate::settings::ChatSettings;
use crate::step::{validate_transition, Step};
use crate::strategy::SearchDispatcher;
use crate::validate::{self, InvalidInput};

/// Everything a step may use besides the conversation itself.
#[derive(Clone)]
pub struct StepContext {
    pub user: UserId,
    /// Earliest acceptable check-in date.
    pub today: NaiveDate,
    /// Timestamp written into history headers.
    pub now: NaiveDateTime,
    pub provider: Arc<dyn HotelProvider>,
    pub history: Arc<dyn HistoryLog>,
    pub settings: ChatSettings,
    /// Cancelled when the user abandons the current step.
    pub cancel: CancellationToken,
}

/// Race a collaborator call against the conversation's cancellation token.
pub(crate) async fn guarded<F: Future>(cancel: &CancellationToken, fut: F) -> Result<F::Output, ChatError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ChatError::Cancelled),
        out = fut => Ok(out),
    }
}

fn calendar(field: DateField, around: NaiveDate) -> Keyboard {
    Keyboard::Calendar {
        field,
        year: around.year(),
        month: around.month(),
    }
}

fn currency_keyboard() -> Keyboard {
    Keyboard::Replies {
        options: Currency::ALL.iter().map(|c| c.code().to_string()).collect(),
    }
}

/// Serializable view of a conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSnapshot {
    pub step: Step,
    pub query: QueryState,
}

/// One user's conversation: current step plus query state.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    step: Step,
    query: QueryState,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn query(&self) -> &QueryState {
        &self.query
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            step: self.step,
            query: self.query.clone(),
        }
    }

    /// Drop the current search and go back to `Idle`.
    pub fn reset(&mut self) {
        self.step = Step::Idle;
        self.query.reset();
    }

    fn advance(&mut self, to: Step) -> Result<(), ChatError> {
        validate_transition(self.step, to)?;
        tracing::debug!(from = %self.step, to = %to, search_id = ?self.query.search_id, "Step transition");
        self.step = to;
        Ok(())
    }

    /// Process one input and return the replies.
    pub async fn handle(&mut self, input: UserInput, ctx: &StepContext) -> Vec<Outbound> {
        match self.dispatch(input, ctx).await {
            Ok(replies) => replies,
            Err(ChatError::Cancelled) => {
                tracing::debug!(user_id = %ctx.user, step = %self.step, "Step cancelled");
                self.reset();
                Vec::new()
            }
            Err(e) => {
                tracing::error!(
                    user_id = %ctx.user,
                    step = %self.step,
                    search_id = ?self.query.search_id,
                    error = %e,
                    "Conversation step failed"
                );
                self.reset();
                vec![Outbound::text(format::GENERIC_FAILURE)]
            }
        }
    }

    async fn dispatch(
        &mut self,
        input: UserInput,
        ctx: &StepContext,
    ) -> Result<Vec<Outbound>, ChatError> {
        match input {
            UserInput::NotUnderstood => Ok(vec![Outbound::text(format::VOICE_NOT_UNDERSTOOD)]),
            UserInput::TranscriptionUnavailable => {
                Ok(vec![Outbound::text(format::VOICE_UNAVAILABLE)])
            }
            UserInput::Callback(action) => self.on_callback(action, ctx).await,
            UserInput::Text(text) => match Command::parse(&text) {
                Some(command) => self.on_command(command, ctx).await,
                None => self.on_text(&text, ctx).await,
            },
        }
    }

    async fn record(&self, ctx: &StepContext, line: &str) {
        if let Err(e) = ctx.history.append(ctx.user, line).await {
            tracing::warn!(user_id = %ctx.user, error = %e, "Failed to append history line");
        }
    }

    // -------------------------------------------------------------------------
    // Commands
    // -------------------------------------------------------------------------

    async fn on_command(
        &mut self,
        command: Command,
        ctx: &StepContext,
    ) -> Result<Vec<Outbound>, ChatError> {
        match command {
            Command::Start => {
                self.reset();
                Ok(vec![Outbound::text(format::WELCOME)])
            }
            Command::Help => Ok(vec![Outbound::text(format::HELP)]),
            Command::History => self.show_history(ctx).await,
            Command::Search(mode) => self.begin_search(mode, ctx).await,
        }
    }

    async fn begin_search(
        &mut self,
        mode: SearchMode,
        ctx: &StepContext,
    ) -> Result<Vec<Outbound>, ChatError> {
        self.query.begin(mode, ctx.settings.default_result_count);
        self.advance(Step::AwaitingTown)?;
        tracing::info!(
            user_id = %ctx.user,
            search_id = ?self.query.search_id,
            mode = %mode,
            "Search started"
        );
        let header = header_line(ctx.now, mode.command());
        self.record(ctx, &header).await;
        Ok(vec![Outbound::with_keyboard(format::ASK_TOWN, Keyboard::Remove)])
    }

    async fn show_history(&self, ctx: &StepContext) -> Result<Vec<Outbound>, ChatError> {
        let entries = match ctx.history.entries(ctx.user).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(user_id = %ctx.user, error = %e, "Failed to read history");
                return Ok(vec![Outbound::text(format::GENERIC_FAILURE)]);
            }
        };
        let buttons: Vec<Button> = entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.is_empty())
            .map(|(index, entry)| {
                Button::new(entry.header.clone(), CallbackAction::ShowHistory { index })
            })
            .collect();
        if buttons.is_empty() {
            return Ok(vec![Outbound::text(format::HISTORY_EMPTY)]);
        }
        Ok(vec![Outbound::with_keyboard(
            format::HISTORY_CHOOSE,
            Keyboard::Buttons { buttons },
        )])
    }

    // -------------------------------------------------------------------------
    // Free text
    // -------------------------------------------------------------------------

    async fn on_text(&mut self, text: &str, ctx: &StepContext) -> Result<Vec<Outbound>, ChatError> {
        if self.step.expects_button() {
            return Ok(vec![Outbound::text(format::USE_BUTTONS)]);
        }
        match self.step {
            Step::Idle => {
                let reply = if format::is_greeting(text) {
                    format::GREETING_REPLY
                } else {
                    format::NOT_UNDERSTOOD
                };
                Ok(vec![Outbound::text(reply)])
            }
            Step::AwaitingTown => match validate::parse_town(text) {
                Ok(name) => self.lookup_town(name, ctx).await,
                Err(e) => {
                    self.rejected(ctx, text, &e);
                    Ok(vec![Outbound::text(format::TOWN_NOT_FOUND)])
                }
            },
            Step::AwaitingResultCount => Ok(self.on_result_count(text, ctx)),
            Step::AwaitingCurrency => self.on_currency(text, ctx).await,
            Step::AwaitingPriceRange => Ok(self.on_price_range(text, ctx)),
            Step::AwaitingDistanceRange => self.on_distance_range(text, ctx).await,
            Step::Searching => Ok(vec![Outbound::text(format::PLEASE_WAIT)]),
            Step::AwaitingPhotoChoice => match validate::parse_yes_no(text) {
                Ok(wanted) => self.on_photo_choice(wanted, ctx),
                Err(e) => {
                    self.rejected(ctx, text, &e);
                    Ok(vec![Outbound::with_keyboard(
                        format::YES_NO_INVALID,
                        Keyboard::yes_no(),
                    )])
                }
            },
            Step::AwaitingPhotoCount => Ok(self.on_photo_count(text, ctx)),
            Step::AwaitingCheckIn | Step::AwaitingCheckOut | Step::AwaitingHotelChoice => {
                Ok(vec![Outbound::text(format::USE_BUTTONS)])
            }
        }
    }

    fn rejected(&self, ctx: &StepContext, text: &str, reason: &InvalidInput) {
        tracing::debug!(
            user_id = %ctx.user,
            step = %self.step,
            input = %text,
            reason = %reason,
            "Input rejected"
        );
    }

    async fn lookup_town(
        &mut self,
        name: &str,
        ctx: &StepContext,
    ) -> Result<Vec<Outbound>, ChatError> {
        let towns = guarded(&ctx.cancel, ctx.provider.lookup_town(name)).await??;
        tracing::debug!(user_id = %ctx.user, query = %name, found = towns.len(), "Town lookup");

        let mut replies = vec![Outbound::text(format::PLEASE_WAIT)];
        if towns.is_empty() {
            replies.push(Outbound::text(format::TOWN_NOT_FOUND));
            return Ok(replies);
        }
        let buttons = towns
            .into_iter()
            .map(|town| {
                let label = town.label();
                Button::new(
                    label,
                    CallbackAction::ChooseTown {
                        name: town.display_name,
                        location_id: town.location_id,
                    },
                )
            })
            .collect();
        replies.push(Outbound::with_keyboard(
            format::CHOOSE_TOWN,
            Keyboard::Buttons { buttons },
        ));
        Ok(replies)
    }

    fn on_result_count(&mut self, text: &str, ctx: &StepContext) -> Vec<Outbound> {
        match validate::parse_result_count(text) {
            Ok(count) => {
                self.query.result_count = count;
                match self.advance(Step::AwaitingCurrency) {
                    Ok(()) => vec![Outbound::with_keyboard(
                        format::ASK_CURRENCY,
                        currency_keyboard(),
                    )],
                    Err(e) => self.fail(ctx, e),
                }
            }
            Err(e) => {
                self.rejected(ctx, text, &e);
                vec![Outbound::text(format::RESULT_COUNT_INVALID)]
            }
        }
    }

    async fn on_currency(&mut self, text: &str, ctx: &StepContext) -> Result<Vec<Outbound>, ChatError> {
        let currency = match validate::parse_currency(text) {
            Ok(currency) => currency,
            Err(e) => {
                self.rejected(ctx, text, &e);
                return Ok(vec![Outbound::with_keyboard(
                    format::CURRENCY_INVALID,
                    currency_keyboard(),
                )]);
            }
        };
        self.query.currency = currency;

        if self.query.search_mode.needs_ranges() {
            self.advance(Step::AwaitingPriceRange)?;
            return Ok(vec![Outbound::with_keyboard(
                format::ask_price_range(currency),
                Keyboard::Remove,
            )]);
        }

        self.advance(Step::Searching)?;
        let mut replies = vec![Outbound::with_keyboard(format::PLEASE_WAIT, Keyboard::Remove)];
        replies.extend(self.run_search(ctx).await?);
        Ok(replies)
    }

    fn on_price_range(&mut self, text: &str, ctx: &StepContext) -> Vec<Outbound> {
        match validate::parse_price_range(text) {
            Ok(range) => {
                self.query.price_range = Some(range);
                match self.advance(Step::AwaitingDistanceRange) {
                    Ok(()) => vec![Outbound::text(format::ASK_DISTANCE_RANGE)],
                    Err(e) => self.fail(ctx, e),
                }
            }
            Err(e) => {
                self.rejected(ctx, text, &e);
                vec![Outbound::text(format::price_range_invalid(
                    self.query.currency,
                ))]
            }
        }
    }

    async fn on_distance_range(
        &mut self,
        text: &str,
        ctx: &StepContext,
    ) -> Result<Vec<Outbound>, ChatError> {
        let range = match validate::parse_distance_range(text) {
            Ok(range) => range,
            Err(e) => {
                self.rejected(ctx, text, &e);
                return Ok(vec![Outbound::text(format::DISTANCE_RANGE_INVALID)]);
            }
        };
        self.query.distance_range = Some(range);
        self.advance(Step::Searching)?;
        let mut replies = vec![Outbound::text(format::PLEASE_WAIT)];
        replies.extend(self.run_search(ctx).await?);
        Ok(replies)
    }

    fn on_photo_count(&mut self, text: &str, ctx: &StepContext) -> Vec<Outbound> {
        let max = ctx.settings.max_photos;
        match validate::parse_photo_count(text, max) {
            Ok(count) => {
                self.query.photo_count = Some(count);
                if let Err(e) = self.advance(Step::AwaitingHotelChoice) {
                    return self.fail(ctx, e);
                }
                let buttons = self
                    .query
                    .results
                    .iter()
                    .enumerate()
                    .map(|(index, hotel)| {
                        Button::new(hotel.name.clone(), CallbackAction::ChooseHotel { index })
                    })
                    .collect();
                vec![Outbound::with_keyboard(
                    format::CHOOSE_HOTEL,
                    Keyboard::Buttons { buttons },
                )]
            }
            Err(e) => {
                self.rejected(ctx, text, &e);
                let reply = match e {
                    InvalidInput::PhotoCountOutOfRange(_) => format::photo_count_out_of_range(max),
                    _ => format::photo_count_invalid(max),
                };
                vec![Outbound::text(reply)]
            }
        }
    }

    /// Log, reset and answer with the generic failure, for synchronous steps.
    fn fail(&mut self, ctx: &StepContext, err: ChatError) -> Vec<Outbound> {
        tracing::error!(user_id = %ctx.user, step = %self.step, error = %err, "Conversation step failed");
        self.reset();
        vec![Outbound::text(format::GENERIC_FAILURE)]
    }

    // -------------------------------------------------------------------------
    // Search
    // -------------------------------------------------------------------------

    async fn run_search(&mut self, ctx: &StepContext) -> Result<Vec<Outbound>, ChatError> {
        let dispatcher = SearchDispatcher::new(ctx.settings.max_results);
        let records = guarded(
            &ctx.cancel,
            dispatcher.dispatch(ctx.provider.as_ref(), &self.query),
        )
        .await?;

        if records.is_empty() {
            tracing::info!(user_id = %ctx.user, search_id = ?self.query.search_id, "Nothing found");
            self.record(ctx, format::NOTHING_FOUND_LINE).await;
            self.reset();
            return Ok(vec![Outbound::text(format::NOTHING_FOUND)]);
        }

        let lines = format::result_lines(&records);
        for line in &lines {
            self.record(ctx, line).await;
        }
        self.query.results = records;
        self.advance(Step::AwaitingPhotoChoice)?;

        let mut replies: Vec<Outbound> = lines.into_iter().map(Outbound::text).collect();
        replies.push(Outbound::with_keyboard(format::ASK_PHOTOS, Keyboard::yes_no()));
        Ok(replies)
    }

    // -------------------------------------------------------------------------
    // Callbacks
    // -------------------------------------------------------------------------

    async fn on_callback(
        &mut self,
        action: CallbackAction,
        ctx: &StepContext,
    ) -> Result<Vec<Outbound>, ChatError> {
        match action {
            CallbackAction::ChooseTown { name, location_id } if self.step == Step::AwaitingTown => {
                self.advance(Step::AwaitingCheckIn)?;
                let line = format::town_line(&name);
                self.record(ctx, &line).await;
                self.query.town = Some(name);
                self.query.location_id = Some(location_id);
                Ok(vec![
                    Outbound::text(line),
                    Outbound::with_keyboard(
                        format::ASK_CHECK_IN,
                        calendar(DateField::CheckIn, ctx.today),
                    ),
                ])
            }
            CallbackAction::Calendar {
                action: CalendarAction::Cancel,
                ..
            } => {
                tracing::info!(user_id = %ctx.user, search_id = ?self.query.search_id, "Search cancelled");
                self.reset();
                Ok(vec![Outbound::with_keyboard(format::CANCELLED, Keyboard::Remove)])
            }
            CallbackAction::Calendar {
                field: DateField::CheckIn,
                action: CalendarAction::Day { date },
            } if self.step == Step::AwaitingCheckIn => self.on_check_in(date, ctx),
            CallbackAction::Calendar {
                field: DateField::CheckOut,
                action: CalendarAction::Day { date },
            } if self.step == Step::AwaitingCheckOut => self.on_check_out(date, ctx),
            CallbackAction::Photos { wanted } if self.step == Step::AwaitingPhotoChoice => {
                self.on_photo_choice(wanted, ctx)
            }
            CallbackAction::ChooseHotel { index }
                if self.step == Step::AwaitingHotelChoice && index < self.query.results.len() =>
            {
                self.show_photos(index, ctx).await
            }
            CallbackAction::ShowHistory { index } => self.replay_history(index, ctx).await,
            stale => {
                tracing::debug!(
                    user_id = %ctx.user,
                    step = %self.step,
                    action = ?stale,
                    "Ignoring stale callback"
                );
                Ok(vec![Outbound::text(format::STALE_BUTTON)])
            }
        }
    }

    fn on_check_in(&mut self, date: NaiveDate, ctx: &StepContext) -> Result<Vec<Outbound>, ChatError> {
        match validate::check_arrival(date, ctx.today) {
            Ok(arrival) => {
                self.advance(Step::AwaitingCheckOut)?;
                self.query.check_in = Some(arrival);
                Ok(vec![Outbound::with_keyboard(
                    format::ask_check_out(arrival),
                    calendar(DateField::CheckOut, arrival),
                )])
            }
            Err(e) => {
                self.rejected(ctx, &date.to_string(), &e);
                Ok(vec![Outbound::with_keyboard(
                    format::CHECK_IN_IN_PAST,
                    calendar(DateField::CheckIn, ctx.today),
                )])
            }
        }
    }

    fn on_check_out(&mut self, date: NaiveDate, ctx: &StepContext) -> Result<Vec<Outbound>, ChatError> {
        let arrival = self
            .query
            .check_in
            .ok_or(ChatError::InvalidTransition(self.step, Step::AwaitingResultCount))?;
        match validate::check_departure(date, arrival) {
            Ok(departure) => {
                self.advance(Step::AwaitingResultCount)?;
                self.query.check_out = Some(departure);
                Ok(vec![Outbound::with_keyboard(
                    format::ask_result_count(arrival, departure, ctx.settings.max_results),
                    Keyboard::Remove,
                )])
            }
            Err(e) => {
                self.rejected(ctx, &date.to_string(), &e);
                Ok(vec![Outbound::with_keyboard(
                    format::check_out_not_after(arrival),
                    calendar(DateField::CheckOut, arrival),
                )])
            }
        }
    }

    fn on_photo_choice(&mut self, wanted: bool, ctx: &StepContext) -> Result<Vec<Outbound>, ChatError> {
        if wanted {
            self.advance(Step::AwaitingPhotoCount)?;
            Ok(vec![Outbound::text(format::ask_photo_count(
                ctx.settings.max_photos,
            ))])
        } else {
            tracing::info!(user_id = %ctx.user, search_id = ?self.query.search_id, "Search finished by user");
            self.reset();
            Ok(vec![Outbound::text(format::ANYTHING_ELSE)])
        }
    }

    async fn show_photos(&mut self, index: usize, ctx: &StepContext) -> Result<Vec<Outbound>, ChatError> {
        let (name, provider_id) = match self.query.results.get(index) {
            Some(hotel) => (hotel.name.clone(), hotel.provider_id.clone()),
            None => return Ok(vec![Outbound::text(format::STALE_BUTTON)]),
        };
        let count = self.query.photo_count.unwrap_or(1);
        let mut replies = vec![Outbound::text(name.clone()), Outbound::text(format::LOADING_PHOTOS)];

        let fetched = guarded(&ctx.cancel, ctx.provider.fetch_photos(&provider_id, count)).await?;
        self.advance(Step::AwaitingPhotoChoice)?;

        match fetched {
            Ok(urls) if !urls.is_empty() => {
                if let Some(hotel) = self.query.results.get_mut(index) {
                    hotel.photo_urls = urls.clone();
                }
                replies.extend(urls.into_iter().map(|url| Outbound::Photo {
                    url,
                    caption: name.clone(),
                }));
                replies.push(Outbound::with_keyboard(format::MORE_PHOTOS, Keyboard::yes_no()));
            }
            Ok(_) => {
                tracing::info!(user_id = %ctx.user, provider_id = %provider_id, "No photos for hotel");
                replies.push(Outbound::with_keyboard(format::NO_PHOTOS, Keyboard::yes_no()));
            }
            Err(e) => {
                tracing::error!(
                    user_id = %ctx.user,
                    provider_id = %provider_id,
                    error = %e,
                    "Photo fetch failed"
                );
                replies.push(Outbound::with_keyboard(format::NO_PHOTOS, Keyboard::yes_no()));
            }
        }
        Ok(replies)
    }

    async fn replay_history(&self, index: usize, ctx: &StepContext) -> Result<Vec<Outbound>, ChatError> {
        let entries = match ctx.history.entries(ctx.user).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(user_id = %ctx.user, error = %e, "Failed to read history");
                return Ok(vec![Outbound::text(format::GENERIC_FAILURE)]);
            }
        };
        let Some(entry) = entries.into_iter().nth(index).filter(|e| !e.is_empty()) else {
            return Ok(vec![Outbound::text(format::STALE_BUTTON)]);
        };
        let mut replies = vec![Outbound::text(entry.header)];
        replies.extend(entry.lines.into_iter().map(Outbound::text));
        replies.push(Outbound::text(format::ANYTHING_ELSE));
        Ok(replies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use roomfinder_core::types::{DistanceRange, PriceRange, SortOrder};
    use roomfinder_history::MemoryHistory;
    use roomfinder_provider::{MockHotelProvider, RawHotel, TownCandidate};

    const USER: UserId = UserId(1);

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2026, 10, 19)
    }

    fn paris() -> TownCandidate {
        TownCandidate {
            display_name: "Paris".to_string(),
            region: "France".to_string(),
            location_id: "504261".to_string(),
        }
    }

    fn hotel(name: &str, distance: &str) -> RawHotel {
        RawHotel {
            name: name.to_string(),
            address: Some(format!("{} street", name)),
            price_summary: Some("$100".to_string()),
            distance: Some(distance.to_string()),
            provider_id: format!("id-{}", name),
        }
    }

    fn three_hotels() -> Vec<RawHotel> {
        vec![
            hotel("Alpha", "0,5 km"),
            hotel("Bravo", "1,2 km"),
            hotel("Charlie", "0,9 km"),
        ]
    }

    struct Harness {
        conversation: Conversation,
        provider: Arc<MockHotelProvider>,
        history: Arc<MemoryHistory>,
        ctx: StepContext,
    }

    impl Harness {
        fn new(provider: MockHotelProvider) -> Self {
            let provider = Arc::new(provider);
            let history = Arc::new(MemoryHistory::new());
            let ctx = StepContext {
                user: USER,
                today: today(),
                now: today().and_hms_opt(10, 30, 0).unwrap(),
                provider: provider.clone(),
                history: history.clone(),
                settings: ChatSettings::default(),
                cancel: CancellationToken::new(),
            };
            Self {
                conversation: Conversation::new(),
                provider,
                history,
                ctx,
            }
        }

        fn paris() -> Self {
            Self::new(
                MockHotelProvider::new()
                    .with_towns(vec![paris()])
                    .with_hotels(three_hotels())
                    .with_photos(vec![
                        "https://img/1.jpg".to_string(),
                        "https://img/2.jpg".to_string(),
                        "https://img/3.jpg".to_string(),
                    ]),
            )
        }

        async fn say(&mut self, text: &str) -> Vec<Outbound> {
            self.conversation
                .handle(UserInput::Text(text.to_string()), &self.ctx)
                .await
        }

        async fn press(&mut self, action: CallbackAction) -> Vec<Outbound> {
            self.conversation
                .handle(UserInput::Callback(action), &self.ctx)
                .await
        }

        async fn pick_day(&mut self, field: DateField, day: NaiveDate) -> Vec<Outbound> {
            self.press(CallbackAction::Calendar {
                field,
                action: CalendarAction::Day { date: day },
            })
            .await
        }

        fn step(&self) -> Step {
            self.conversation.step()
        }

        /// Drive a conversation up to the currency prompt.
        async fn up_to_currency(&mut self, command: &str) {
            self.say(command).await;
            let replies = self.say("Paris").await;
            let action = first_button(&replies);
            self.press(action).await;
            self.pick_day(DateField::CheckIn, date(2026, 11, 1)).await;
            self.pick_day(DateField::CheckOut, date(2026, 11, 3)).await;
            self.say("10").await;
            assert_eq!(self.step(), Step::AwaitingCurrency);
        }

        /// Drive a cheapest search all the way to the photo question.
        async fn up_to_photo_choice(&mut self) {
            self.up_to_currency("/lowprice").await;
            self.say("USD").await;
            assert_eq!(self.step(), Step::AwaitingPhotoChoice);
        }
    }

    fn first_button(replies: &[Outbound]) -> CallbackAction {
        for reply in replies.iter().rev() {
            if let Some(Keyboard::Buttons { buttons }) = reply.keyboard() {
                return buttons[0].action.clone();
            }
        }
        panic!("no inline keyboard in {:?}", replies);
    }

    fn bodies(replies: &[Outbound]) -> Vec<&str> {
        replies.iter().map(|r| r.body()).collect()
    }

    // ---- Round trip ----

    #[tokio::test]
    async fn test_lowprice_paris_round_trip() {
        let mut h = Harness::paris();

        let replies = h.say("/lowprice").await;
        assert_eq!(h.step(), Step::AwaitingTown);
        assert_eq!(bodies(&replies), vec![format::ASK_TOWN]);

        let replies = h.say("Paris").await;
        assert_eq!(h.step(), Step::AwaitingTown);
        let Some(Keyboard::Buttons { buttons }) = replies.last().and_then(|r| r.keyboard()) else {
            panic!("expected town buttons");
        };
        assert_eq!(buttons.len(), 1);
        assert_eq!(buttons[0].label, "Paris, France");

        h.press(buttons[0].action.clone()).await;
        assert_eq!(h.step(), Step::AwaitingCheckIn);
        assert_eq!(h.conversation.query().location_id.as_deref(), Some("504261"));

        h.pick_day(DateField::CheckIn, date(2026, 11, 1)).await;
        assert_eq!(h.step(), Step::AwaitingCheckOut);
        h.pick_day(DateField::CheckOut, date(2026, 11, 3)).await;
        assert_eq!(h.step(), Step::AwaitingResultCount);

        h.say("10").await;
        assert_eq!(h.step(), Step::AwaitingCurrency);
        let replies = h.say("USD").await;
        assert_eq!(h.step(), Step::AwaitingPhotoChoice);

        let requests = h.provider.search_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].sort_order, SortOrder::Price);
        assert_eq!(requests[0].page_size, 10);
        assert_eq!(requests[0].currency, Currency::Usd);
        assert_eq!(requests[0].location_id, "504261");
        assert_eq!(requests[0].check_in, date(2026, 11, 1));
        assert_eq!(requests[0].check_out, date(2026, 11, 3));

        let names: Vec<&str> = h
            .conversation
            .query()
            .results
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["Alpha", "Bravo", "Charlie"]);

        let texts = bodies(&replies);
        assert!(texts[1].starts_with("1. Alpha"));
        assert!(texts[2].starts_with("2. Bravo"));
        assert!(texts[3].starts_with("3. Charlie"));
        assert_eq!(*texts.last().unwrap(), format::ASK_PHOTOS);

        let lines = h.history.read_lines(USER).await.unwrap();
        assert_eq!(lines[0], "2026-10-19 10:30 - /lowprice");
        assert_eq!(lines[1], "Town: Paris");
        assert_eq!(lines.len(), 5);
    }

    #[tokio::test]
    async fn test_highprice_uses_descending_sort() {
        let mut h = Harness::paris();
        h.up_to_currency("/highprice").await;
        h.say("EUR").await;
        let requests = h.provider.search_requests();
        assert_eq!(requests[0].sort_order, SortOrder::PriceHighestFirst);
        assert_eq!(requests[0].currency, Currency::Eur);
    }

    // ---- Best deal ----

    #[tokio::test]
    async fn test_bestdeal_reversed_price_range_is_ordered() {
        let mut h = Harness::paris();
        h.up_to_currency("/bestdeal").await;

        h.say("RUB").await;
        assert_eq!(h.step(), Step::AwaitingPriceRange);
        h.say("100 50").await;
        assert_eq!(h.step(), Step::AwaitingDistanceRange);
        assert_eq!(
            h.conversation.query().price_range,
            Some(PriceRange { min: 50, max: 100 })
        );
    }

    #[tokio::test]
    async fn test_bestdeal_filters_by_distance() {
        let mut h = Harness::paris();
        h.up_to_currency("/bestdeal").await;
        h.say("USD").await;
        h.say("50 100").await;
        h.say("0,3 0,8").await;

        assert_eq!(h.step(), Step::AwaitingPhotoChoice);
        assert_eq!(
            h.conversation.query().distance_range,
            Some(DistanceRange::new(0.3, 0.8))
        );
        let names: Vec<&str> = h
            .conversation
            .query()
            .results
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["Alpha"]);

        let request = &h.provider.search_requests()[0];
        assert_eq!(request.price_min, Some(50));
        assert_eq!(request.price_max, Some(100));
    }

    #[tokio::test]
    async fn test_bestdeal_invalid_ranges_reprompt() {
        let mut h = Harness::paris();
        h.up_to_currency("/bestdeal").await;
        h.say("EUR").await;

        let replies = h.say("cheap").await;
        assert_eq!(h.step(), Step::AwaitingPriceRange);
        assert_eq!(bodies(&replies), vec![format::price_range_invalid(Currency::Eur)]);

        h.say("10 20").await;
        let replies = h.say("close").await;
        assert_eq!(h.step(), Step::AwaitingDistanceRange);
        assert_eq!(bodies(&replies), vec![format::DISTANCE_RANGE_INVALID]);
        assert!(h.provider.search_requests().is_empty());
    }

    #[tokio::test]
    async fn test_bestdeal_nothing_in_range_resets() {
        let mut h = Harness::paris();
        h.up_to_currency("/bestdeal").await;
        h.say("USD").await;
        h.say("50 100").await;
        let replies = h.say("5 9").await;

        assert_eq!(h.step(), Step::Idle);
        assert_eq!(*bodies(&replies).last().unwrap(), format::NOTHING_FOUND);
        let lines = h.history.read_lines(USER).await.unwrap();
        assert_eq!(lines.last().unwrap(), format::NOTHING_FOUND_LINE);
    }

    // ---- Dates ----

    #[tokio::test]
    async fn test_invalid_checkout_keeps_step_and_date() {
        let mut h = Harness::paris();
        h.say("/lowprice").await;
        let replies = h.say("Paris").await;
        h.press(first_button(&replies)).await;
        h.pick_day(DateField::CheckIn, date(2026, 11, 5)).await;

        let replies = h.pick_day(DateField::CheckOut, date(2026, 11, 4)).await;
        assert_eq!(h.step(), Step::AwaitingCheckOut);
        assert_eq!(h.conversation.query().check_out, None);
        assert_eq!(
            replies[0].keyboard(),
            Some(&Keyboard::Calendar {
                field: DateField::CheckOut,
                year: 2026,
                month: 11
            })
        );

        h.pick_day(DateField::CheckOut, date(2026, 11, 5)).await;
        assert_eq!(h.step(), Step::AwaitingCheckOut);
        assert_eq!(h.conversation.query().check_out, None);

        h.pick_day(DateField::CheckOut, date(2026, 11, 6)).await;
        assert_eq!(h.step(), Step::AwaitingResultCount);
        assert_eq!(h.conversation.query().check_out, Some(date(2026, 11, 6)));
    }

    #[tokio::test]
    async fn test_check_in_in_past_reprompts() {
        let mut h = Harness::paris();
        h.say("/lowprice").await;
        let replies = h.say("Paris").await;
        h.press(first_button(&replies)).await;

        let replies = h.pick_day(DateField::CheckIn, date(2026, 10, 18)).await;
        assert_eq!(h.step(), Step::AwaitingCheckIn);
        assert_eq!(bodies(&replies), vec![format::CHECK_IN_IN_PAST]);
        assert!(h.conversation.query().check_in.is_none());

        h.pick_day(DateField::CheckIn, today()).await;
        assert_eq!(h.step(), Step::AwaitingCheckOut);
    }

    #[tokio::test]
    async fn test_calendar_cancel_resets() {
        let mut h = Harness::paris();
        h.say("/highprice").await;
        let replies = h.say("Paris").await;
        h.press(first_button(&replies)).await;

        let replies = h
            .press(CallbackAction::Calendar {
                field: DateField::CheckIn,
                action: CalendarAction::Cancel,
            })
            .await;
        assert_eq!(h.step(), Step::Idle);
        assert_eq!(bodies(&replies), vec![format::CANCELLED]);
        assert_eq!(h.conversation.query(), &QueryState::default());
    }

    #[tokio::test]
    async fn test_text_during_calendar_asks_for_buttons() {
        let mut h = Harness::paris();
        h.say("/lowprice").await;
        let replies = h.say("Paris").await;
        h.press(first_button(&replies)).await;

        let replies = h.say("tomorrow").await;
        assert_eq!(h.step(), Step::AwaitingCheckIn);
        assert_eq!(bodies(&replies), vec![format::USE_BUTTONS]);
    }

    // ---- Town ----

    #[tokio::test]
    async fn test_unknown_town_reprompts_in_place() {
        let mut h = Harness::paris();
        h.say("/lowprice").await;
        let replies = h.say("Atlantis").await;
        assert_eq!(h.step(), Step::AwaitingTown);
        assert_eq!(*bodies(&replies).last().unwrap(), format::TOWN_NOT_FOUND);

        h.say("paris").await;
        assert_eq!(h.step(), Step::AwaitingTown);
        assert_eq!(h.provider.lookup_count(), 2);
    }

    #[tokio::test]
    async fn test_numeric_town_is_rejected_without_lookup() {
        let mut h = Harness::paris();
        h.say("/lowprice").await;
        let replies = h.say("12345").await;
        assert_eq!(bodies(&replies), vec![format::TOWN_NOT_FOUND]);
        assert_eq!(h.step(), Step::AwaitingTown);
        assert_eq!(h.provider.lookup_count(), 0);
    }

    #[tokio::test]
    async fn test_town_lookup_failure_resets() {
        let mut h = Harness::new(MockHotelProvider::new().failing_lookup());
        h.say("/lowprice").await;
        let replies = h.say("Paris").await;
        assert_eq!(h.step(), Step::Idle);
        assert_eq!(bodies(&replies), vec![format::GENERIC_FAILURE]);
        assert_eq!(h.conversation.query(), &QueryState::default());
    }

    // ---- Count and currency ----

    #[tokio::test]
    async fn test_result_count_and_currency_reprompt() {
        let mut h = Harness::paris();
        h.say("/lowprice").await;
        let replies = h.say("Paris").await;
        h.press(first_button(&replies)).await;
        h.pick_day(DateField::CheckIn, date(2026, 11, 1)).await;
        h.pick_day(DateField::CheckOut, date(2026, 11, 2)).await;

        let replies = h.say("ten").await;
        assert_eq!(h.step(), Step::AwaitingResultCount);
        assert_eq!(bodies(&replies), vec![format::RESULT_COUNT_INVALID]);

        h.say("40").await;
        assert_eq!(h.conversation.query().result_count, 40);

        let replies = h.say("usd").await;
        assert_eq!(h.step(), Step::AwaitingCurrency);
        assert_eq!(bodies(&replies), vec![format::CURRENCY_INVALID]);

        h.say("USD").await;
        assert_eq!(h.provider.search_requests()[0].page_size, 25);
    }

    // ---- Results and photos ----

    #[tokio::test]
    async fn test_search_failure_is_nothing_found() {
        let mut h = Harness::new(
            MockHotelProvider::new()
                .with_towns(vec![paris()])
                .failing_search(),
        );
        h.up_to_currency("/lowprice").await;
        let replies = h.say("USD").await;
        assert_eq!(h.step(), Step::Idle);
        assert_eq!(*bodies(&replies).last().unwrap(), format::NOTHING_FOUND);
    }

    #[tokio::test]
    async fn test_photo_loop() {
        let mut h = Harness::paris();
        h.up_to_photo_choice().await;

        h.press(CallbackAction::Photos { wanted: true }).await;
        assert_eq!(h.step(), Step::AwaitingPhotoCount);

        let replies = h.say("9").await;
        assert_eq!(h.step(), Step::AwaitingPhotoCount);
        assert_eq!(bodies(&replies), vec![format::photo_count_out_of_range(7)]);

        let replies = h.say("2").await;
        assert_eq!(h.step(), Step::AwaitingHotelChoice);
        let Some(Keyboard::Buttons { buttons }) = replies[0].keyboard() else {
            panic!("expected hotel buttons");
        };
        assert_eq!(buttons.len(), 3);

        let replies = h.press(CallbackAction::ChooseHotel { index: 1 }).await;
        assert_eq!(h.step(), Step::AwaitingPhotoChoice);
        let photos: Vec<&Outbound> = replies
            .iter()
            .filter(|r| matches!(r, Outbound::Photo { .. }))
            .collect();
        assert_eq!(photos.len(), 2);
        assert_eq!(photos[0].body(), "Bravo");
        assert_eq!(h.conversation.query().results[1].photo_urls.len(), 2);
        assert_eq!(*bodies(&replies).last().unwrap(), format::MORE_PHOTOS);

        let replies = h.say("no").await;
        assert_eq!(h.step(), Step::Idle);
        assert_eq!(bodies(&replies), vec![format::ANYTHING_ELSE]);
        assert!(h.conversation.query().results.is_empty());
    }

    #[tokio::test]
    async fn test_photo_failure_loops_back() {
        let mut h = Harness::new(
            MockHotelProvider::new()
                .with_towns(vec![paris()])
                .with_hotels(three_hotels())
                .failing_photos(),
        );
        h.up_to_photo_choice().await;
        h.say("yes").await;
        h.say("3").await;
        let replies = h.press(CallbackAction::ChooseHotel { index: 0 }).await;
        assert_eq!(h.step(), Step::AwaitingPhotoChoice);
        assert_eq!(*bodies(&replies).last().unwrap(), format::NO_PHOTOS);
        assert_eq!(h.conversation.query().results.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_photo_list_loops_back() {
        let mut h = Harness::new(
            MockHotelProvider::new()
                .with_towns(vec![paris()])
                .with_hotels(three_hotels()),
        );
        h.up_to_photo_choice().await;
        h.say("yes").await;
        h.say("1").await;
        let replies = h.press(CallbackAction::ChooseHotel { index: 2 }).await;
        assert_eq!(h.step(), Step::AwaitingPhotoChoice);
        assert_eq!(*bodies(&replies).last().unwrap(), format::NO_PHOTOS);
    }

    #[tokio::test]
    async fn test_stale_callbacks_are_ignored() {
        let mut h = Harness::paris();
        let replies = h.press(CallbackAction::Photos { wanted: true }).await;
        assert_eq!(bodies(&replies), vec![format::STALE_BUTTON]);
        assert_eq!(h.step(), Step::Idle);

        h.up_to_photo_choice().await;
        h.say("yes").await;
        h.say("1").await;
        let replies = h.press(CallbackAction::ChooseHotel { index: 99 }).await;
        assert_eq!(bodies(&replies), vec![format::STALE_BUTTON]);
        assert_eq!(h.step(), Step::AwaitingHotelChoice);
    }

    // ---- Commands ----

    #[tokio::test]
    async fn test_new_search_command_resets_mid_flow() {
        let mut h = Harness::paris();
        h.up_to_currency("/lowprice").await;
        let old_search = h.conversation.query().search_id;

        h.say("/bestdeal").await;
        assert_eq!(h.step(), Step::AwaitingTown);
        let q = h.conversation.query();
        assert_eq!(q.search_mode, SearchMode::BestDeal);
        assert!(q.town.is_none());
        assert!(q.check_in.is_none());
        assert_ne!(q.search_id, old_search);
    }

    #[tokio::test]
    async fn test_start_help_and_greeting() {
        let mut h = Harness::paris();
        assert_eq!(bodies(&h.say("/start").await), vec![format::WELCOME]);
        assert_eq!(bodies(&h.say("/help").await), vec![format::HELP]);
        assert_eq!(bodies(&h.say("Привет").await), vec![format::GREETING_REPLY]);
        assert_eq!(bodies(&h.say("book me a room").await), vec![format::NOT_UNDERSTOOD]);

        h.say("/lowprice").await;
        h.say("/help").await;
        assert_eq!(h.step(), Step::AwaitingTown);
        h.say("/start").await;
        assert_eq!(h.step(), Step::Idle);
    }

    #[tokio::test]
    async fn test_voice_failures_keep_step() {
        let mut h = Harness::paris();
        h.say("/lowprice").await;
        let replies = h.conversation.handle(UserInput::NotUnderstood, &h.ctx).await;
        assert_eq!(bodies(&replies), vec![format::VOICE_NOT_UNDERSTOOD]);
        let replies = h
            .conversation
            .handle(UserInput::TranscriptionUnavailable, &h.ctx)
            .await;
        assert_eq!(bodies(&replies), vec![format::VOICE_UNAVAILABLE]);
        assert_eq!(h.step(), Step::AwaitingTown);
    }

    // ---- History ----

    #[tokio::test]
    async fn test_history_listing_and_replay() {
        let mut h = Harness::paris();
        assert_eq!(bodies(&h.say("/history").await), vec![format::HISTORY_EMPTY]);

        h.up_to_photo_choice().await;
        h.say("no").await;
        // An abandoned search leaves a header without lines.
        h.say("/highprice").await;

        let replies = h.say("/history").await;
        let Some(Keyboard::Buttons { buttons }) = replies[0].keyboard() else {
            panic!("expected history buttons");
        };
        assert_eq!(buttons.len(), 1);
        assert_eq!(buttons[0].label, "2026-10-19 10:30 - /lowprice");
        assert_eq!(h.step(), Step::AwaitingTown);

        let replies = h.press(buttons[0].action.clone()).await;
        let texts = bodies(&replies);
        assert_eq!(texts[0], "2026-10-19 10:30 - /lowprice");
        assert_eq!(texts[1], "Town: Paris");
        assert!(texts[2].starts_with("1. Alpha"));
        assert_eq!(*texts.last().unwrap(), format::ANYTHING_ELSE);
        assert_eq!(h.step(), Step::AwaitingTown);

        let replies = h.press(CallbackAction::ShowHistory { index: 1 }).await;
        assert_eq!(bodies(&replies), vec![format::STALE_BUTTON]);
    }

    // ---- Cancellation ----

    #[tokio::test]
    async fn test_cancelled_call_resets_silently() {
        let mut h = Harness::new(
            MockHotelProvider::new()
                .with_towns(vec![paris()])
                .with_delay(Duration::from_secs(30)),
        );
        h.say("/lowprice").await;
        h.ctx.cancel.cancel();

        let replies = h.say("Paris").await;
        assert!(replies.is_empty());
        assert_eq!(h.step(), Step::Idle);
    }

    #[tokio::test]
    async fn test_snapshot_serializes() {
        let mut h = Harness::paris();
        h.say("/bestdeal").await;
        let value = serde_json::to_value(h.conversation.snapshot()).unwrap();
        assert_eq!(value["step"], "awaiting_town");
        assert_eq!(value["query"]["search_mode"], "best_deal");
        assert_eq!(value["query"]["currency"], "USD");
    }
}
