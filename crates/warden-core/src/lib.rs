//! # warden-core
//!
//! Concurrency and synchronization layer for supervising a token-by-token
//! streaming agent from multiple front ends.
//!
//! This crate provides:
//! - An append-only, in-memory event log with a monotonic version counter
//! - The streaming/pause state machine with cooperative interruption
//! - The exclusive terminal input coordinator
//! - The background key-capture watcher that triggers interventions
//! - The `Agent` trait and the single message dispatch path

pub mod agent;
pub mod input;
pub mod log;
pub mod state;
pub mod testing;
pub mod watcher;

pub use agent::{Agent, DispatchError, LoopbackAgent, SupervisorContext, dispatch};
pub use input::{InputCoordinator, LineReader, ReadOutcome, TerminalReader};
pub use log::{EntryKind, EventLog, LogEntry, LogSlice};
pub use state::{StreamPhase, StreamState};
pub use watcher::{InterventionWatcher, is_interrupt_key};
