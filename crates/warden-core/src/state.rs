//! Streaming state machine and cooperative pause protocol.
//!
//! Exactly one stream can be active at a time. Pausing is cooperative: the
//! watcher flips the `paused` flag, and the producer blocks at its next
//! suspension point ([`StreamState::wait_if_paused`]) until resumed. The
//! producer is never preempted, so partially written log entries stay
//! consistent.
//!
//! Suspension points are the only places pause and intervention take effect.
//! A producer that never calls [`StreamState::wait_if_paused`] will keep
//! running while the operator waits at the intervention prompt; implementors
//! of [`crate::Agent`] must call it between emitted tokens and between tool
//! invocations.

use std::sync::{Condvar, Mutex};
use tracing::debug;

/// Observable phase of the stream lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Idle,
    Streaming,
    Paused,
}

#[derive(Debug, Default)]
struct StateInner {
    streaming: bool,
    paused: bool,
    intervention: Option<String>,
}

/// Process-wide streaming state, shared across the producer, the watcher,
/// and the web front end.
///
/// Construct one per process and inject it (via
/// [`crate::SupervisorContext`]) into every component that needs it; there
/// is deliberately no global instance.
#[derive(Debug, Default)]
pub struct StreamState {
    inner: Mutex<StateInner>,
    resumed: Condvar,
}

impl StreamState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> StreamPhase {
        let inner = self.inner.lock().unwrap();
        match (inner.streaming, inner.paused) {
            (false, _) => StreamPhase::Idle,
            (true, false) => StreamPhase::Streaming,
            (true, true) => StreamPhase::Paused,
        }
    }

    /// True while a stream is active, whether or not it is paused.
    pub fn is_streaming(&self) -> bool {
        self.inner.lock().unwrap().streaming
    }

    pub fn is_paused(&self) -> bool {
        self.inner.lock().unwrap().paused
    }

    /// Claims the stream slot. Returns `false` if a stream is already
    /// active; the caller should reject the new message as busy.
    pub fn begin_stream(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.streaming {
            return false;
        }
        inner.streaming = true;
        debug!("stream started");
        true
    }

    /// Releases the stream slot and clears pause state.
    ///
    /// An unconsumed intervention message is dropped here: it was aimed at
    /// the stream that just ended and must not leak into the next one. Any
    /// producer still blocked in [`Self::wait_if_paused`] is woken.
    pub fn end_stream(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.streaming = false;
        inner.paused = false;
        if inner.intervention.take().is_some() {
            debug!("dropping unconsumed intervention message");
        }
        drop(inner);
        self.resumed.notify_all();
        debug!("stream ended");
    }

    /// Commits the `streaming -> paused` transition.
    ///
    /// Returns `false` when no stream is active or the stream is already
    /// paused; the watcher aborts its intervention attempt in that case.
    /// This is the second half of the watcher's double check: the stream may
    /// have finished between the raw-key sample and this call.
    pub fn try_pause(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if !inner.streaming || inner.paused {
            return false;
        }
        inner.paused = true;
        debug!("stream paused");
        true
    }

    /// Clears the pause flag and wakes the producer.
    pub fn resume(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.paused = false;
        drop(inner);
        self.resumed.notify_all();
        debug!("stream resumed");
    }

    /// Stores a message to be consumed by the stream at its next suspension
    /// point. A later message replaces an unconsumed earlier one.
    pub fn set_intervention(&self, message: impl Into<String>) {
        self.inner.lock().unwrap().intervention = Some(message.into());
    }

    /// Producer-side suspension point.
    ///
    /// Blocks while paused (condvar wait, no busy polling), then takes and
    /// clears the pending intervention message if one was supplied.
    pub fn wait_if_paused(&self) -> Option<String> {
        let mut inner = self.inner.lock().unwrap();
        while inner.paused {
            inner = self.resumed.wait(inner).unwrap();
        }
        inner.intervention.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn stream_slot_is_exclusive() {
        let state = StreamState::new();
        assert!(state.begin_stream());
        assert!(!state.begin_stream());
        state.end_stream();
        assert!(state.begin_stream());
    }

    #[test]
    fn phase_tracks_transitions() {
        let state = StreamState::new();
        assert_eq!(state.phase(), StreamPhase::Idle);

        state.begin_stream();
        assert_eq!(state.phase(), StreamPhase::Streaming);

        assert!(state.try_pause());
        assert_eq!(state.phase(), StreamPhase::Paused);

        state.resume();
        assert_eq!(state.phase(), StreamPhase::Streaming);

        state.end_stream();
        assert_eq!(state.phase(), StreamPhase::Idle);
    }

    #[test]
    fn cannot_pause_without_active_stream() {
        let state = StreamState::new();
        assert!(!state.try_pause());
        assert!(!state.is_paused());
    }

    #[test]
    fn ending_a_stream_clears_pause() {
        // paused must never be observable without an active stream
        let state = StreamState::new();
        state.begin_stream();
        state.try_pause();
        state.end_stream();
        assert!(!state.is_paused());
        assert!(!state.is_streaming());
    }

    #[test]
    fn double_pause_is_rejected() {
        let state = StreamState::new();
        state.begin_stream();
        assert!(state.try_pause());
        assert!(!state.try_pause());
    }

    #[test]
    fn intervention_is_consumed_once() {
        let state = Arc::new(StreamState::new());
        state.begin_stream();
        assert!(state.try_pause());
        state.set_intervention("stop and summarize");

        let producer = {
            let state = Arc::clone(&state);
            thread::spawn(move || state.wait_if_paused())
        };

        // Give the producer time to block on the condvar before resuming.
        thread::sleep(Duration::from_millis(50));
        state.resume();

        let message = producer.join().unwrap();
        assert_eq!(message.as_deref(), Some("stop and summarize"));

        // Consumed: the next suspension point sees nothing.
        assert_eq!(state.wait_if_paused(), None);
        assert!(!state.is_paused());
    }

    #[test]
    fn wait_if_paused_passes_straight_through_when_not_paused() {
        let state = StreamState::new();
        state.begin_stream();
        state.set_intervention("note");
        // Message set without a pause (stream resumed before the producer
        // reached a suspension point) is still delivered.
        assert_eq!(state.wait_if_paused().as_deref(), Some("note"));
    }

    #[test]
    fn end_stream_wakes_blocked_producer() {
        let state = Arc::new(StreamState::new());
        state.begin_stream();
        state.try_pause();

        let producer = {
            let state = Arc::clone(&state);
            thread::spawn(move || state.wait_if_paused())
        };

        thread::sleep(Duration::from_millis(50));
        state.end_stream();

        assert_eq!(producer.join().unwrap(), None);
    }
}
