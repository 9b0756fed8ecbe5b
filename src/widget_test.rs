use super::*;
use crate::conversation::Sender;
use crate::llm::LlmGenerate;
use crate::llm::types::{GenerateRequest, GenerateResponse, LlmError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

// =========================================================================
// Mocks
// =========================================================================

/// Answers immediately with a fixed result and counts calls.
struct EchoLlm {
    calls: AtomicUsize,
    fail_with: Option<fn() -> LlmError>,
}

impl EchoLlm {
    fn new() -> Self {
        Self { calls: AtomicUsize::new(0), fail_with: None }
    }

    fn failing(f: fn() -> LlmError) -> Self {
        Self { calls: AtomicUsize::new(0), fail_with: Some(f) }
    }
}

#[async_trait::async_trait]
impl LlmGenerate for EchoLlm {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(f) = self.fail_with {
            return Err(f());
        }
        let user_line = request
            .prompt
            .lines()
            .rev()
            .find(|l| l.starts_with("User: "))
            .unwrap_or_default();
        Ok(GenerateResponse {
            text: format!("echo {user_line}"),
            model: "mock".into(),
            finish_reason: Some("STOP".into()),
            input_tokens: 0,
            output_tokens: 0,
        })
    }
}

/// Holds every call until `release` is notified.
struct GatedLlm {
    calls: AtomicUsize,
    release: Notify,
}

#[async_trait::async_trait]
impl LlmGenerate for GatedLlm {
    async fn generate(&self, _request: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        Ok(GenerateResponse {
            text: "Bzz, here you go!".into(),
            model: "mock".into(),
            finish_reason: Some("STOP".into()),
            input_tokens: 0,
            output_tokens: 0,
        })
    }
}

fn open_widget(llm: Arc<dyn LlmGenerate>) -> ChatWidget {
    let widget = ChatWidget::new(AssistantClient::new(llm));
    widget.open();
    widget
}

// =========================================================================
// Mount state
// =========================================================================

#[test]
fn mounts_with_single_greeting_and_idle() {
    let widget = ChatWidget::new(AssistantClient::new(Arc::new(EchoLlm::new())));
    let state = widget.state();
    assert_eq!(state.messages.len(), 1);
    assert_eq!(state.messages[0].sender, Sender::Assistant);
    assert_eq!(state.messages[0].text, GREETING);
    assert!(!state.is_typing);
    assert!(!widget.is_open());
}

#[test]
fn toggle_flips_open_state() {
    let widget = ChatWidget::new(AssistantClient::new(Arc::new(EchoLlm::new())));
    assert!(widget.toggle());
    assert!(widget.input_enabled());
    assert!(!widget.toggle());
    assert!(!widget.input_enabled());
    widget.open();
    assert!(widget.is_open());
    widget.close();
    assert!(!widget.is_open());
}

// =========================================================================
// submit — end to end
// =========================================================================

#[tokio::test]
async fn hello_yields_three_messages() {
    let llm = Arc::new(EchoLlm::new());
    let widget = open_widget(llm.clone());

    let (user, reply) = match widget.submit("Hello").await {
        SubmitOutcome::Replied { user, reply } => (user, reply),
        other => panic!("expected reply, got {other:?}"),
    };
    assert_eq!(user.text, "Hello");
    assert_eq!(reply.text, "echo User: Hello");

    let state = widget.state();
    let summary: Vec<(Sender, &str)> = state
        .messages
        .iter()
        .map(|m| (m.sender, m.text.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![(Sender::Assistant, GREETING), (Sender::User, "Hello"), (Sender::Assistant, "echo User: Hello")]
    );
    assert!(!state.is_typing);
    assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failure_still_appends_in_persona_reply() {
    let llm = Arc::new(EchoLlm::failing(|| LlmError::ApiRequest("fetch failed".into())));
    let widget = open_widget(llm);

    let outcome = widget.submit("Are tickets refundable?").await;
    assert!(matches!(outcome, SubmitOutcome::Replied { ref reply, .. } if reply.text == crate::assistant::NETWORK_FALLBACK));
    let state = widget.state();
    assert_eq!(state.messages.len(), 3);
    assert!(!state.is_typing);
}

#[tokio::test]
async fn blank_input_is_ignored_without_calling_assistant() {
    let llm = Arc::new(EchoLlm::new());
    let widget = open_widget(llm.clone());

    assert_eq!(widget.submit("").await, SubmitOutcome::Ignored);
    assert_eq!(widget.submit("   ").await, SubmitOutcome::Ignored);
    assert_eq!(widget.state().messages.len(), 1);
    assert!(!widget.state().is_typing);
    assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn closed_widget_rejects_input() {
    let llm = Arc::new(EchoLlm::new());
    let widget = ChatWidget::new(AssistantClient::new(llm.clone()));

    assert_eq!(widget.submit("Hello").await, SubmitOutcome::Closed);
    assert_eq!(widget.state().messages.len(), 1);
    assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn sequential_submissions_keep_order() {
    let widget = open_widget(Arc::new(EchoLlm::new()));
    for text in ["one", "two", "three"] {
        widget.submit(text).await;
    }
    let texts: Vec<String> = widget.state().messages.into_iter().map(|m| m.text).collect();
    assert_eq!(
        texts,
        vec![
            GREETING.to_string(),
            "one".into(),
            "echo User: one".into(),
            "two".into(),
            "echo User: two".into(),
            "three".into(),
            "echo User: three".into(),
        ]
    );
}

// =========================================================================
// single-flight gate
// =========================================================================

#[tokio::test]
async fn submission_while_awaiting_reply_is_rejected() {
    let llm = Arc::new(GatedLlm { calls: AtomicUsize::new(0), release: Notify::new() });
    let widget = Arc::new(open_widget(llm.clone()));
    let mut changes = widget.subscribe();
    assert!(!changes.borrow().is_typing);

    let pending = {
        let widget = widget.clone();
        tokio::spawn(async move { widget.submit("Hello").await })
    };

    changes.wait_for(|s| s.is_typing).await.unwrap();
    assert!(!widget.input_enabled());
    assert_eq!(widget.submit("Hello again").await, SubmitOutcome::Busy);
    assert_eq!(widget.state().messages.len(), 2);

    llm.release.notify_one();
    let outcome = pending.await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Replied { .. }));

    let state = widget.state();
    assert_eq!(state.messages.len(), 3);
    assert!(!state.is_typing);
    assert!(widget.input_enabled());
    assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn subscribers_see_settled_state() {
    let widget = open_widget(Arc::new(EchoLlm::new()));
    let changes = widget.subscribe();
    widget.submit("Hello").await;
    let latest = changes.borrow().clone();
    assert_eq!(latest, widget.state());
    assert!(!latest.is_typing);
}

#[tokio::test]
async fn typing_alternates_across_submissions() {
    let llm = Arc::new(GatedLlm { calls: AtomicUsize::new(0), release: Notify::new() });
    let widget = Arc::new(open_widget(llm.clone()));
    let mut changes = widget.subscribe();
    let mut typing = vec![changes.borrow_and_update().is_typing];

    for text in ["first", "second"] {
        let pending = {
            let widget = widget.clone();
            let text = text.to_string();
            tokio::spawn(async move { widget.submit(&text).await })
        };
        changes.changed().await.unwrap();
        typing.push(changes.borrow_and_update().is_typing);

        llm.release.notify_one();
        pending.await.unwrap();
        changes.changed().await.unwrap();
        typing.push(changes.borrow_and_update().is_typing);
    }

    assert_eq!(typing, vec![false, true, false, true, false]);
    assert_eq!(widget.state().messages.len(), 5);
    assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
}

// =========================================================================
// cancellation
// =========================================================================

#[tokio::test]
async fn timed_out_submission_reopens_input() {
    let llm = Arc::new(GatedLlm { calls: AtomicUsize::new(0), release: Notify::new() });
    let widget = open_widget(llm.clone());

    let timed_out = tokio::time::timeout(Duration::from_millis(50), widget.submit("Hello")).await;
    assert!(timed_out.is_err());

    let state = widget.state();
    assert!(!state.is_typing);
    assert!(widget.input_enabled());
    assert_eq!(state.messages.len(), 3);
    assert_eq!(state.messages[2].sender, Sender::Assistant);
    assert_eq!(state.messages[2].text, crate::assistant::GENERIC_FALLBACK);

    llm.release.notify_one();
    let outcome = widget.submit("Hello again").await;
    assert!(matches!(outcome, SubmitOutcome::Replied { ref reply, .. } if reply.text == "Bzz, here you go!"));
    assert_eq!(widget.state().messages.len(), 5);
    assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
}
