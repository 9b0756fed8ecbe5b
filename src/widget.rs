//! Chat widget — input → store → assistant → store.
//!
//! DESIGN
//! ======
//! One widget owns one conversation. A submission moves the widget from
//! Idle to AwaitingReply under a single lock acquisition, and any further
//! submission is turned away until the reply lands. That gate is the only
//! concurrency control: at most one assistant call is in flight. If the
//! submit future is dropped before the reply lands, the generic fallback is
//! appended and the gate reopens.
//!
//! Every state change is published on a `watch` channel so a front-end can
//! redraw the transcript and typing indicator.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::assistant::{AssistantClient, GENERIC_FALLBACK, GREETING};
use crate::conversation::{ConversationState, ConversationStore, Message};

// =============================================================================
// TYPES
// =============================================================================

/// What happened to a submitted line of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The text was accepted and the assistant answered (possibly with a fallback).
    Replied { user: Message, reply: Message },
    /// Empty or whitespace-only input.
    Ignored,
    /// A reply is still pending; input is disabled.
    Busy,
    /// The widget is closed; there is no input control.
    Closed,
}

struct Inner {
    store: ConversationStore,
    open: bool,
}

// =============================================================================
// WIDGET
// =============================================================================

pub struct ChatWidget {
    session_id: Uuid,
    inner: Mutex<Inner>,
    assistant: AssistantClient,
    changes: watch::Sender<ConversationState>,
}

impl ChatWidget {
    /// Mount a closed widget with the default greeting.
    pub fn new(assistant: AssistantClient) -> Self {
        Self::with_greeting(assistant, GREETING)
    }

    pub fn with_greeting(assistant: AssistantClient, greeting: &str) -> Self {
        let store = ConversationStore::with_greeting(greeting);
        let (changes, _) = watch::channel(store.snapshot());
        let session_id = Uuid::new_v4();
        info!(%session_id, "widget: mounted");
        Self { session_id, inner: Mutex::new(Inner { store, open: false }), assistant, changes }
    }

    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Receive a snapshot after every change to the conversation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.changes.subscribe()
    }

    #[must_use]
    pub fn state(&self) -> ConversationState {
        self.lock().store.snapshot()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    /// Whether the text input accepts submissions right now.
    #[must_use]
    pub fn input_enabled(&self) -> bool {
        let inner = self.lock();
        inner.open && !inner.store.is_typing()
    }

    pub fn open(&self) {
        self.set_open(true);
    }

    pub fn close(&self) {
        self.set_open(false);
    }

    /// Flip the open state and return the new value.
    pub fn toggle(&self) -> bool {
        let mut inner = self.lock();
        inner.open = !inner.open;
        debug!(session_id = %self.session_id, open = inner.open, "widget: toggled");
        inner.open
    }

    /// Submit one line of user text and wait for the assistant to settle.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let user = {
            let mut inner = self.lock();
            if !inner.open {
                return SubmitOutcome::Closed;
            }
            if inner.store.is_typing() {
                debug!(session_id = %self.session_id, "widget: submission while awaiting reply");
                return SubmitOutcome::Busy;
            }
            let Some(user) = inner.store.append_user_message(text) else {
                return SubmitOutcome::Ignored;
            };
            inner.store.set_typing(true);
            self.publish(&inner);
            user
        };

        info!(session_id = %self.session_id, message_id = user.id, prompt_len = user.text.len(), "widget: awaiting reply");
        let pending = PendingReply { widget: self, settled: false };
        let reply_text = self.assistant.get_reply(&user.text).await;
        let reply = pending.settle(&reply_text);
        info!(session_id = %self.session_id, message_id = reply.id, "widget: reply settled");

        SubmitOutcome::Replied { user, reply }
    }

    fn append_reply(&self, text: &str) -> Message {
        let mut inner = self.lock();
        let reply = inner.store.append_assistant_message(text);
        inner.store.set_typing(false);
        self.publish(&inner);
        reply
    }

    fn set_open(&self, open: bool) {
        self.lock().open = open;
    }

    fn publish(&self, inner: &Inner) {
        self.changes.send_replace(inner.store.snapshot());
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// PENDING REPLY
// =============================================================================

/// Returns the widget to Idle if a submission is dropped mid-reply.
struct PendingReply<'a> {
    widget: &'a ChatWidget,
    settled: bool,
}

impl PendingReply<'_> {
    fn settle(mut self, text: &str) -> Message {
        self.settled = true;
        self.widget.append_reply(text)
    }
}

impl Drop for PendingReply<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!(session_id = %self.widget.session_id, "widget: submission dropped before reply");
            self.widget.append_reply(GENERIC_FALLBACK);
        }
    }
}

#[cfg(test)]
#[path = "widget_test.rs"]
mod tests;
