//! World Chat CLI
//!
//! Terminal front end over a chat session with a character or the world
//! design assistant. Plain lines are chat turns; commands start with `/`.

use anyhow::Context;
use std::env;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;
use world_chat_client::chat::{ActionDescriptor, ActionKind, SessionContext};
use world_chat_client::orchestrator::TurnOutcome;
use world_chat_client::state::{LoggingReconciler, StepUpdate};
use world_chat_client::{
    CharacterChatCalls, ChatCalls, ChatSession, ClientConfig, DesignChatCalls, HttpTransport,
    SessionError,
};

const HELP: &str =
    "Commands: /select <item>, /use [item], /drop <item>, /clear, /history, /exit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env();
    config.validate().context("Invalid configuration")?;
    info!("Configuration loaded: {:?}", config);

    let transport = HttpTransport::new(&config).context("Failed to build HTTP client")?;
    let design = env::var("WORLDAI_DESIGN")
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);

    let (calls, context): (Arc<dyn ChatCalls>, SessionContext) = if design {
        (
            Arc::new(DesignChatCalls::new(transport)),
            SessionContext::new("", ""),
        )
    } else {
        let world_id = env::var("WORLDAI_WORLD_ID")
            .context("WORLDAI_WORLD_ID must be set for character chat")?;
        let character_id = env::var("WORLDAI_CHARACTER_ID")
            .context("WORLDAI_CHARACTER_ID must be set for character chat")?;
        (
            Arc::new(CharacterChatCalls::new(transport)),
            SessionContext::new(world_id, character_id),
        )
    };

    let session = ChatSession::new(calls, context, &config.turn)
        .with_reconciler(Arc::new(LoggingReconciler));
    let printer = tokio::spawn(print_updates(session.subscribe()));

    match session.load_history().await {
        Ok(greeting) => {
            // A completed greeting is already in history
            print_history(&session).await;
            if let Some(TurnOutcome::Failed(turn)) = greeting {
                println!("{}", turn.message());
            }
        }
        Err(e) => eprintln!("Could not load history: {}", e),
    }
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let result = match line.split_once(' ').unwrap_or((line, "")) {
            ("/exit", _) => break,
            ("/history", _) => {
                print_history(&session).await;
                continue;
            }
            ("/clear", _) => {
                match session.clear().await {
                    Ok(()) => println!("History cleared."),
                    Err(e) => println!("{}", e),
                }
                continue;
            }
            ("/select", item) => {
                let item = item.trim();
                let selection = (!item.is_empty()).then(|| item.to_string());
                match session.select_item(selection).await {
                    Ok(()) if item.is_empty() => println!("Selection cleared."),
                    Ok(()) => println!("Selected {}.", item),
                    Err(e) => println!("{}", e),
                }
                continue;
            }
            ("/use", item) if item.trim().is_empty() => session.use_selected_item().await,
            (command @ ("/use" | "/drop"), item) if !item.trim().is_empty() => {
                let action: ActionKind = match command[1..].parse() {
                    Ok(action) => action,
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                };
                session
                    .submit_action(ActionDescriptor {
                        action,
                        item_id: item.trim().to_string(),
                    })
                    .await
            }
            (command, _) if command.starts_with('/') => {
                println!("{}", HELP);
                continue;
            }
            _ => session.submit(line).await,
        };

        match result {
            Ok(outcome) => print_outcome(&outcome),
            Err(SessionError::Disabled) => println!("The conversation has ended."),
            Err(e) => println!("{}", e),
        }
    }

    printer.abort();
    info!("Session closed");
    Ok(())
}

async fn print_updates(mut updates: tokio::sync::broadcast::Receiver<StepUpdate>) {
    loop {
        match updates.recv().await {
            Ok(update) => {
                if let Some(tool) = update.tool_calls.last() {
                    println!("  [tool] {}", tool);
                }
                if !update.live.updates.is_empty() {
                    println!("  ... {}", update.live.updates);
                }
            }
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }
}

async fn print_history<C: ChatCalls + ?Sized>(session: &ChatSession<C>) {
    let state = session.snapshot().await;
    for entry in state.history() {
        if !entry.user.is_empty() {
            println!("> {}", entry.user);
        }
        if !entry.event.is_empty() {
            println!("  * {}", entry.event);
        }
        if !entry.reply.is_empty() {
            println!("{}", entry.reply);
        }
    }
}

fn print_outcome(outcome: &TurnOutcome) {
    match outcome {
        TurnOutcome::Completed(turn) => {
            if !turn.result.event.is_empty() {
                println!("  * {}", turn.result.event);
            }
            println!("{}", turn.result.reply);
            if let Some(status) = &turn.result.world_status {
                if !status.response_message.is_empty() {
                    println!("  ({})", status.response_message);
                }
            }
            if !turn.result.enabled {
                println!("The conversation has ended.");
            }
        }
        TurnOutcome::Failed(turn) => println!("{}", turn.message()),
    }
}
