//! Bee — the Webie Event chat assistant.
//!
//! A [`widget::ChatWidget`] owns one [`conversation::ConversationStore`] and
//! forwards each accepted line to an [`assistant::AssistantClient`], which
//! talks to the generative-text service through [`llm`].

pub mod assistant;
pub mod conversation;
pub mod llm;
pub mod widget;
