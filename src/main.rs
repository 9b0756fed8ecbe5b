use std::io::Write;
use std::sync::Arc;

use bee_chat::assistant::AssistantClient;
use bee_chat::conversation::{ConversationState, Sender};
use bee_chat::llm::LlmClient;
use bee_chat::llm::config::LlmConfig;
use bee_chat::widget::{ChatWidget, SubmitOutcome};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "bee", about = "Chat with Bee, the Webie Event assistant")]
struct Cli {
    /// Override the model from `GEMINI_MODEL`.
    #[arg(long)]
    model: Option<String>,

    /// Start with the chat window closed.
    #[arg(long)]
    closed: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let mut config = LlmConfig::from_env()?;
    if let Some(model) = cli.model {
        config.model = model;
    }
    let max_output_tokens = config.max_output_tokens;
    let llm = LlmClient::from_config(config)?;
    tracing::info!(model = %llm.model(), "bee starting");

    let assistant = AssistantClient::new(Arc::new(llm)).with_max_output_tokens(max_output_tokens);
    let widget = ChatWidget::new(assistant);
    tracing::info!(session_id = %widget.session_id(), "chat session started");
    if !cli.closed {
        widget.open();
    }

    // Typing indicator.
    let mut changes = widget.subscribe();
    let indicator = tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            if changes.borrow_and_update().is_typing {
                println!("  Bee is typing...");
            }
        }
    });

    print_transcript(&widget.state());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "/quit" => break,
            "/toggle" => {
                let state = if widget.toggle() { "open" } else { "closed" };
                println!("(chat {state})");
            }
            "/history" => print_transcript(&widget.state()),
            _ => match widget.submit(&line).await {
                SubmitOutcome::Replied { reply, .. } => println!("bee> {}", reply.text.trim()),
                SubmitOutcome::Ignored => {}
                SubmitOutcome::Busy => println!("(Bee is still answering)"),
                SubmitOutcome::Closed => println!("(chat is closed, type /toggle to open it)"),
            },
        }
    }

    drop(widget);
    indicator.await?;
    Ok(())
}

fn print_transcript(state: &ConversationState) {
    for message in &state.messages {
        let who = match message.sender {
            Sender::User => "you",
            Sender::Assistant => "bee",
        };
        println!("{who}> {}", message.text.trim());
    }
}
