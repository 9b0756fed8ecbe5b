//! Assistant client — one user utterance in, one displayable reply out.
//!
//! DESIGN
//! ======
//! The transport returns `Result<GenerateResponse, LlmError>`. Failures are
//! classified here into a small [`FailureKind`] taxonomy and collapsed to an
//! in-persona fallback line, so [`AssistantClient::get_reply`] never fails.
//!
//! Classification combines the structured error with ordered substring
//! checks on its diagnostic text. The substring tier depends on the
//! upstream wording staying stable.

use std::sync::Arc;

use tracing::{info, warn};

use crate::llm::LlmGenerate;
use crate::llm::types::{GenerateRequest, LlmError, permissive_safety_settings};

/// Instructions prepended to every request.
pub const PERSONA_PROMPT: &str = "You are Bee, the cheerful assistant of Webie Event, a platform for \
discovering, organizing and managing events. Speak in a friendly, upbeat tone and sprinkle in the \
occasional bee pun. Keep answers short: at most three sentences. If you do not know the answer or \
the question is unrelated to events, say so politely and suggest contacting the Webie Event team.";

const PROMPT_SEPARATOR: &str = "\n\n";

pub const GREETING: &str = "Hi there! I'm Bee 🐝, your Webie Event assistant. How can I help you today?";

pub const CREDENTIAL_FALLBACK: &str = "Bee can't reach the hive right now. Please check your API key! 🐝";
pub const MODERATION_FALLBACK: &str = "Bzzz... that question is too sensitive to answer. Let's talk about something else! 🐝";
pub const NETWORK_FALLBACK: &str = "The network is too weak for Bee to fly right now. Try again soon! 🐝";
pub const GENERIC_FALLBACK: &str = "Oops, something went wrong. Please try again! 🐝";

// =============================================================================
// FAILURE CLASSIFICATION
// =============================================================================

/// Failure classes, declared in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FailureKind {
    Credential,
    ContentModeration,
    Network,
    Unknown,
}

/// Diagnostic substrings checked in priority order.
const DIAGNOSTIC_PATTERNS: &[(&str, FailureKind)] = &[
    ("400", FailureKind::Credential),
    ("Candidate was blocked", FailureKind::ContentModeration),
    ("fetch failed", FailureKind::Network),
];

impl FailureKind {
    /// Status 400, a blocked candidate and a transport failure map directly;
    /// the diagnostic text is matched as well and the higher-priority class wins.
    #[must_use]
    pub fn classify(err: &LlmError) -> Self {
        let structured = match err {
            LlmError::ApiResponse { status: 400, .. } => Self::Credential,
            LlmError::CandidateBlocked { .. } => Self::ContentModeration,
            LlmError::ApiRequest(_) => Self::Network,
            _ => Self::Unknown,
        };
        structured.min(Self::from_diagnostic(&err.to_string()))
    }

    /// First matching pattern wins; anything else is `Unknown`.
    #[must_use]
    pub fn from_diagnostic(message: &str) -> Self {
        DIAGNOSTIC_PATTERNS
            .iter()
            .find(|(pattern, _)| message.contains(pattern))
            .map_or(Self::Unknown, |(_, kind)| *kind)
    }

    #[must_use]
    pub fn fallback(self) -> &'static str {
        match self {
            Self::Credential => CREDENTIAL_FALLBACK,
            Self::ContentModeration => MODERATION_FALLBACK,
            Self::Network => NETWORK_FALLBACK,
            Self::Unknown => GENERIC_FALLBACK,
        }
    }
}

// =============================================================================
// CLIENT
// =============================================================================

#[must_use]
pub fn build_prompt(user_text: &str) -> String {
    format!("{PERSONA_PROMPT}{PROMPT_SEPARATOR}User: {user_text}\nBee:")
}

#[derive(Clone)]
pub struct AssistantClient {
    llm: Arc<dyn LlmGenerate>,
    max_output_tokens: Option<u32>,
}

impl AssistantClient {
    pub fn new(llm: Arc<dyn LlmGenerate>) -> Self {
        Self { llm, max_output_tokens: None }
    }

    #[must_use]
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    /// Ask the model for a reply. Failures resolve to a fallback line.
    pub async fn get_reply(&self, user_text: &str) -> String {
        let request = GenerateRequest {
            prompt: build_prompt(user_text),
            safety: permissive_safety_settings(),
            max_output_tokens: self.max_output_tokens,
        };

        match self.llm.generate(&request).await {
            Ok(response) => {
                info!(
                    model = %response.model,
                    input_tokens = response.input_tokens,
                    output_tokens = response.output_tokens,
                    "assistant: reply received"
                );
                response.text
            }
            Err(e) => {
                let kind = FailureKind::classify(&e);
                warn!(
                    error_code = e.error_code(),
                    retryable = e.retryable(),
                    ?kind,
                    "assistant: generation failed: {e}"
                );
                kind.fallback().to_string()
            }
        }
    }
}

#[cfg(test)]
#[path = "assistant_test.rs"]
mod tests;
