//! Conversational CLI commands: `ops ask`, `ops chat`, `ops history`,
//! `ops reset`.
//!
//! `history` and `reset` work directly against the transcript store so
//! they stay usable without generation credentials.

use anyhow::{bail, Result};
use std::io::{BufRead, Write};

use crate::assistant::{Assistant, HISTORY_CLEARED};
use crate::config::Config;
use crate::models::{ConversationMessage, Role};
use crate::transcript::{JsonTranscriptStore, TranscriptStore};

/// One-shot question: print the reply, its sources, and the web marker.
pub async fn run_ask(config: &Config, question: &str) -> Result<()> {
    if question.trim().is_empty() {
        bail!("question must not be empty");
    }

    let mut assistant = Assistant::open(config)?;
    let reply = assistant.ask(question).await?;
    print_message(reply);
    Ok(())
}

/// Interactive loop. `/reset` clears history, `/quit` leaves.
pub async fn run_chat(config: &Config) -> Result<()> {
    let mut assistant = Assistant::open(config)?;

    for message in assistant.messages() {
        print_message(message);
    }

    let interactive = atty::is(atty::Stream::Stdin);
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        if interactive {
            print!("> ");
            std::io::stdout().flush()?;
        }
        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        let input = line.trim();

        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                assistant.reset()?;
                println!("History cleared.");
            }
            question => {
                let reply = assistant.ask(question).await?;
                print_message(reply);
            }
        }
    }

    Ok(())
}

/// Print the stored transcript without touching it.
pub fn run_history(config: &Config) -> Result<()> {
    let store = JsonTranscriptStore::new(config.store.transcript_path());
    match store.load()? {
        Some(messages) => {
            for message in &messages {
                print_message(message);
            }
        }
        None => println!("No history."),
    }
    Ok(())
}

/// Clear the stored transcript, leaving only the fixed acknowledgement.
pub fn run_reset(config: &Config) -> Result<()> {
    let store = JsonTranscriptStore::new(config.store.transcript_path());
    store.clear()?;
    store.save(&[ConversationMessage::notice(HISTORY_CLEARED)])?;
    println!("History cleared.");
    Ok(())
}

fn print_message(message: &ConversationMessage) {
    match message.role {
        Role::User => println!("you: {}", message.text),
        Role::Assistant => {
            println!("assistant: {}", message.text);
            if !message.source_titles.is_empty() {
                println!("  sources: {}", message.source_titles.join(", "));
            }
            if message.web_grounded {
                println!("  (grounded with live web search)");
            }
        }
    }
}
