//! Chat orchestrator: routes inbound events to per-user conversations.
//!
//! Each user owns one [`Conversation`] behind an async mutex, so events of
//! one user are processed in arrival order while different users proceed
//! concurrently. Interrupting inputs cancel whatever the user's previous
//! event is still waiting on. Conversations idle for longer than the
//! session timeout are dropped.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Local;
use futures::FutureExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use roomfinder_core::types::UserId;
use roomfinder_history::{HistoryEntry, HistoryLog};
use roomfinder_provider::{HotelProvider, Transcriber};

use crate::error::ChatError;
use crate::event::{Inbound, Outbound};
use crate::format;
use crate::machine::{guarded, Conversation, ConversationSnapshot, StepContext};
use crate::settings::ChatSettings;
use crate::voice::VoiceInterface;

/// One user's conversation, the token of its current step and the time
/// of its last event.
struct Slot {
    conversation: Arc<tokio::sync::Mutex<Conversation>>,
    cancel: Mutex<CancellationToken>,
    last_active: Mutex<Instant>,
}

impl Slot {
    fn new(now: Instant) -> Self {
        Self {
            conversation: Arc::new(tokio::sync::Mutex::new(Conversation::new())),
            cancel: Mutex::new(CancellationToken::new()),
            last_active: Mutex::new(now),
        }
    }

    fn token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Cancel the current token and install a fresh one.
    fn interrupt(&self) -> CancellationToken {
        let mut cancel = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        cancel.cancel();
        *cancel = CancellationToken::new();
        cancel.clone()
    }

    fn touch(&self, now: Instant) {
        *self.last_active.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    fn last_active(&self) -> Instant {
        *self.last_active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Central coordinator for all conversations.
pub struct ChatOrchestrator {
    slots: Mutex<HashMap<UserId, Arc<Slot>>>,
    provider: Arc<dyn HotelProvider>,
    history: Arc<dyn HistoryLog>,
    transcriber: Arc<dyn Transcriber>,
    settings: ChatSettings,
}

impl ChatOrchestrator {
    pub fn new(
        provider: Arc<dyn HotelProvider>,
        history: Arc<dyn HistoryLog>,
        transcriber: Arc<dyn Transcriber>,
        settings: ChatSettings,
    ) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            provider,
            history,
            transcriber,
            settings,
        }
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    /// Number of users with a conversation.
    pub fn conversation_count(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Handle one inbound event and return the replies to send.
    ///
    /// Errors are only returned for events rejected before they reach the
    /// conversation. Failures inside a step, including panics, are answered
    /// with a generic failure reply and reset the conversation.
    pub async fn handle_event(
        &self,
        user: UserId,
        inbound: Inbound,
    ) -> Result<Vec<Outbound>, ChatError> {
        self.validate(&inbound)?;
        match &inbound {
            Inbound::Text(text) => tracing::info!(user_id = %user, text = %text, "Incoming message"),
            Inbound::Voice(audio) => {
                tracing::info!(user_id = %user, bytes = audio.len(), "Incoming voice message")
            }
            Inbound::Callback(action) => {
                tracing::info!(user_id = %user, action = ?action, "Incoming button press")
            }
        }

        let slot = self.slot(user);
        let cancel = if inbound.interrupts() {
            slot.interrupt()
        } else {
            slot.token()
        };

        // The mutex is fair: events queue here in arrival order, before
        // voice is transcribed.
        let mut conversation = Arc::clone(&slot.conversation).lock_owned().await;

        let now = Local::now().naive_local();
        let ctx = StepContext {
            user,
            today: now.date(),
            now,
            provider: Arc::clone(&self.provider),
            history: Arc::clone(&self.history),
            settings: self.settings.clone(),
            cancel,
        };
        let transcriber = Arc::clone(&self.transcriber);

        let step = tokio::spawn(async move {
            let outcome = AssertUnwindSafe(run_step(
                &mut conversation,
                inbound,
                transcriber.as_ref(),
                &ctx,
            ))
            .catch_unwind()
            .await;
            let replies = match outcome {
                Ok(replies) => replies,
                Err(payload) => {
                    let err = ChatError::StepPanicked(panic_message(payload));
                    tracing::error!(user_id = %ctx.user, error = %err, "Conversation step panicked");
                    conversation.reset();
                    vec![Outbound::text(format::GENERIC_FAILURE)]
                }
            };
            slot.touch(Instant::now());
            replies
        });

        match step.await {
            Ok(replies) => Ok(replies),
            Err(e) => {
                tracing::warn!(user_id = %user, error = %e, "Conversation step aborted");
                Err(ChatError::Cancelled)
            }
        }
    }

    /// Current state of a user's conversation, if one exists.
    pub async fn snapshot(&self, user: UserId) -> Option<ConversationSnapshot> {
        let slot = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user)
            .cloned()?;
        let conversation = slot.conversation.lock().await;
        Some(conversation.snapshot())
    }

    /// A user's search history, grouped by search.
    pub async fn history_entries(&self, user: UserId) -> Result<Vec<HistoryEntry>, ChatError> {
        Ok(self.history.entries(user).await?)
    }

    // -- Private helpers --

    fn validate(&self, inbound: &Inbound) -> Result<(), ChatError> {
        match inbound {
            Inbound::Text(text) => {
                if text.trim().is_empty() {
                    return Err(ChatError::EmptyMessage);
                }
                let max = self.settings.max_message_length;
                if text.chars().count() > max {
                    return Err(ChatError::MessageTooLong(max));
                }
                Ok(())
            }
            Inbound::Voice(audio) if audio.is_empty() => Err(ChatError::EmptyMessage),
            _ => Ok(()),
        }
    }

    /// Get or create the user's slot, dropping expired ones on the way.
    fn slot(&self, user: UserId) -> Arc<Slot> {
        let now = Instant::now();
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        self.expire(&mut slots, now);
        let slot = Arc::clone(
            slots
                .entry(user)
                .or_insert_with(|| Arc::new(Slot::new(now))),
        );
        slot.touch(now);
        slot
    }

    /// Remove slots idle past the session timeout. A slot still referenced
    /// outside the map has an event in flight and is kept.
    fn expire(&self, slots: &mut HashMap<UserId, Arc<Slot>>, now: Instant) {
        let timeout = self.settings.session_timeout;
        let before = slots.len();
        slots.retain(|_, slot| {
            Arc::strong_count(slot) > 1 || now.duration_since(slot.last_active()) < timeout
        });
        let expired = before - slots.len();
        if expired > 0 {
            tracing::debug!(expired, remaining = slots.len(), "Expired idle conversations");
        }
    }
}

/// Transcribe voice, then run the step. Transcription is abandoned like any
/// other collaborator call when the user interrupts.
async fn run_step(
    conversation: &mut Conversation,
    inbound: Inbound,
    transcriber: &dyn Transcriber,
    ctx: &StepContext,
) -> Vec<Outbound> {
    let voice = VoiceInterface::new(transcriber);
    match guarded(&ctx.cancel, voice.resolve(inbound)).await {
        Ok(input) => conversation.handle(input, ctx).await,
        Err(_) => {
            tracing::debug!(user_id = %ctx.user, "Transcription cancelled");
            conversation.reset();
            Vec::new()
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// =============================================================================
// Tests
// =============================================================================
