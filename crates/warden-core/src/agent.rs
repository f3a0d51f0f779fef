//! Agent boundary and the single message dispatch path.
//!
//! The agent's reasoning lives out of tree; this module fixes its contract:
//! emit to the event log incrementally, and call
//! [`SupervisorContext::checkpoint`] at every safe suspension point so pause
//! and intervention can take effect.

use crate::log::{EntryKind, EventLog};
use crate::state::StreamState;
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Shared supervision context: the event log plus the streaming state.
///
/// One instance per process, explicitly constructed and handed to every
/// component that needs it.
#[derive(Debug, Default)]
pub struct SupervisorContext {
    pub log: EventLog,
    pub state: StreamState,
}

impl SupervisorContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspension point for producers.
    ///
    /// Blocks while the stream is paused, then returns the pending
    /// intervention message, if any, exactly once. Agents must call this
    /// between emitted tokens and between tool invocations.
    pub fn checkpoint(&self) -> Option<String> {
        self.state.wait_if_paused()
    }
}

/// A message-processing agent supervised by Warden.
///
/// `respond` runs one full stream for `message`: it appends output to
/// `ctx.log` as it is produced and calls `ctx.checkpoint()` at its
/// suspension points. It runs on a dedicated thread of control, so blocking
/// is fine.
pub trait Agent: Send + Sync {
    fn respond(&self, ctx: &SupervisorContext, message: &str) -> anyhow::Result<String>;
}

/// Errors from [`dispatch`].
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A stream is already active. New messages are rejected, not queued,
    /// until the current stream returns to idle.
    #[error("a stream is already active; retry when it completes")]
    Busy,
    #[error(transparent)]
    Agent(#[from] anyhow::Error),
}

/// Clears the stream slot when dispatch unwinds, normally or otherwise.
struct StreamGuard<'a> {
    state: &'a StreamState,
}

impl Drop for StreamGuard<'_> {
    fn drop(&mut self) {
        self.state.end_stream();
    }
}

/// Runs one message through the agent. The single entry point shared by the
/// terminal prompt loop and both web message endpoints.
///
/// Claims the stream slot (rejecting with [`DispatchError::Busy`] if taken),
/// logs the user message, and releases the slot on every exit path.
pub fn dispatch(
    ctx: &SupervisorContext,
    agent: &dyn Agent,
    message: &str,
) -> Result<String, DispatchError> {
    if !ctx.state.begin_stream() {
        return Err(DispatchError::Busy);
    }
    let _stream = StreamGuard { state: &ctx.state };

    ctx.log.append(EntryKind::User, "User message", message);
    debug!(chars = message.len(), "dispatching user message");

    match agent.respond(ctx, message) {
        Ok(response) => Ok(response),
        Err(e) => {
            ctx.log.append(EntryKind::Error, "Agent error", e.to_string());
            Err(e.into())
        }
    }
}

/// Built-in token-echo agent.
///
/// Streams the user's message back one whitespace token at a time,
/// accumulating into a single log entry via `mutate_last` and checkpointing
/// between tokens. Used by the binary as a placeholder and by tests as a
/// well-behaved producer.
#[derive(Debug, Default)]
pub struct LoopbackAgent {
    /// Artificial delay between tokens, to make streaming observable from a
    /// polling client. Zero in tests.
    pub token_delay: Duration,
}

impl LoopbackAgent {
    pub fn with_token_delay(token_delay: Duration) -> Self {
        Self { token_delay }
    }
}

impl Agent for LoopbackAgent {
    fn respond(&self, ctx: &SupervisorContext, message: &str) -> anyhow::Result<String> {
        ctx.log.append(EntryKind::Agent, "Agent response", "");

        let mut response = String::new();
        for token in message.split_whitespace() {
            if let Some(note) = ctx.checkpoint() {
                if !response.is_empty() {
                    response.push(' ');
                }
                response.push_str(&format!("[intervention: {note}]"));
            }
            if !response.is_empty() {
                response.push(' ');
            }
            response.push_str(token);

            let snapshot = response.clone();
            ctx.log.mutate_last(move |entry| entry.content = snapshot);

            if !self.token_delay.is_zero() {
                thread::sleep(self.token_delay);
            }
        }

        // Final suspension point: honor a pause that landed after the last
        // token, and pick up any trailing intervention message.
        if let Some(note) = ctx.checkpoint() {
            if !response.is_empty() {
                response.push(' ');
            }
            response.push_str(&format!("[intervention: {note}]"));
            let snapshot = response.clone();
            ctx.log.mutate_last(move |entry| entry.content = snapshot);
        }

        Ok(response)
    }
}
