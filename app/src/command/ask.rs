//! Terminal conversation over a throwaway in-memory session.

use medrag_config::Config;
use medrag_session::InMemorySessionStore;
use std::io::Write;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::build_orchestrator;

#[derive(Debug, Clone)]
pub struct AskInput {
    /// Single question (non-interactive mode)
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct AskStrategy;

impl super::CommandStrategy for AskStrategy {
    type Input = AskInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let orchestrator = build_orchestrator(&config, Arc::new(InMemorySessionStore::new()))?;
        let session_id = Uuid::now_v7();

        if let Some(question) = input.message {
            let outcome = match orchestrator.ask(&session_id, &question).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    eprintln!("Error: {}", e.user_message());
                    return Err(e.into());
                }
            };
            println!("{}", outcome.answer);
            print_sources(outcome.sources.as_deref());
            return Ok(());
        }

        println!("=== Medical AI Assistant (session {session_id}) ===");
        println!("Type 'exit', 'quit', or Ctrl+C to end the session.\n");

        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let mut line = String::new();
            if std::io::stdin().read_line(&mut line)? == 0 {
                break;
            }
            let line = line.trim();

            if matches!(line, "exit" | "quit" | "q") {
                break;
            }
            if line.is_empty() {
                continue;
            }

            match orchestrator.ask(&session_id, line).await {
                Ok(outcome) => {
                    debug!(
                        "Turn {} answered with {} memory",
                        outcome.turn_number, outcome.memory_kind
                    );
                    println!("\n{}\n", outcome.answer);
                    print_sources(outcome.sources.as_deref());
                }
                Err(e) => {
                    debug!("Ask failed: {e}");
                    eprintln!("Error: {}", e.user_message());
                }
            }
        }

        let turns = orchestrator.history(&session_id).await?.len() / 2;
        println!("\nSession ended. Total turns: {turns}");
        Ok(())
    }
}

fn print_sources(sources: Option<&[medrag_core::Passage]>) {
    let Some(passages) = sources.filter(|p| !p.is_empty()) else {
        return;
    };
    println!("Sources:");
    for passage in passages {
        println!("  - {}", passage.source_label());
    }
    println!();
}
