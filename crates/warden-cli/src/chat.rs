//! Interactive terminal chat loop.
//!
//! Reads user messages through the input coordinator (sharing the exclusive
//! terminal lock with the intervention watcher) and dispatches them to the
//! agent. Prompt sentinels: `'e'` exits, `'w'` waits past a configured
//! auto-timeout, anything else is dispatched as a message.

use anyhow::Result;
use std::time::Duration;
use tracing::info;
use warden_core::{Agent, DispatchError, InputCoordinator, ReadOutcome, SupervisorContext, dispatch};

/// Message substituted when the auto-timeout prompt gets no input. The
/// stream treats it like a typed user message.
pub const TIMEOUT_FALLBACK_MESSAGE: &str =
    "No response from the user. Continue with the task as you see fit.";

/// Runs the chat loop until the user exits.
pub fn run(
    ctx: &SupervisorContext,
    agent: &dyn Agent,
    input: &InputCoordinator,
    timeout: Option<Duration>,
) -> Result<()> {
    info!("terminal chat ready");
    loop {
        let mut line = match timeout {
            None => input.read_line("User message ('e' to exit):\n> ")?,
            Some(t) => {
                let prompt =
                    format!("User message ({}s timeout, 'w' to wait, 'e' to exit):\n> ", t.as_secs());
                match input.read_line_with_timeout(&prompt, t)? {
                    ReadOutcome::Line(line) => line,
                    ReadOutcome::TimedOut => {
                        println!("\n{TIMEOUT_FALLBACK_MESSAGE}");
                        TIMEOUT_FALLBACK_MESSAGE.to_string()
                    }
                }
            }
        };
        line = line.trim().to_string();

        if line.eq_ignore_ascii_case("e") {
            info!("exiting chat");
            break;
        }
        if line.eq_ignore_ascii_case("w") {
            // Operator asked to wait: re-prompt without a deadline.
            line = input.read_line("> ")?.trim().to_string();
        }
        if line.is_empty() {
            continue;
        }

        match dispatch(ctx, agent, &line) {
            Ok(response) => println!("agent: {response}"),
            Err(DispatchError::Busy) => {
                println!("A stream is already active; wait for it to finish.");
            }
            Err(e) => {
                tracing::error!(error = %e, "message dispatch failed");
                println!("error: {e}");
            }
        }
    }
    Ok(())
}
