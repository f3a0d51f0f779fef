//! Background key-capture watcher.
//!
//! While a stream is active, the watcher samples raw keyboard events in
//! short windows. An alphabetic or whitespace keypress is an interrupt
//! request: the watcher pauses the stream, runs the intervention prompt, and
//! resumes. While no stream is active it only sleeps, leaving the terminal
//! to the normal prompt loop.

use crate::agent::SupervisorContext;
use crate::input::InputCoordinator;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// Keys that count as an interrupt request during streaming. Mirrors the
/// "alphabetic or whitespace" rule so accidental modifier noise is ignored.
pub fn is_interrupt_key(key: char) -> bool {
    key.is_alphabetic() || key.is_whitespace()
}

/// Samples the keyboard during streaming and runs the intervention prompt.
pub struct InterventionWatcher {
    ctx: Arc<SupervisorContext>,
    input: Arc<InputCoordinator>,
    interval: Duration,
}

impl InterventionWatcher {
    pub fn new(ctx: Arc<SupervisorContext>, input: Arc<InputCoordinator>) -> Self {
        Self {
            ctx,
            input,
            interval: Duration::from_millis(100),
        }
    }

    /// Overrides the sampling interval. The interval bounds both CPU usage
    /// and worst-case interrupt-detection latency.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawns the watcher loop on a background thread. The thread runs for
    /// the life of the process.
    pub fn spawn(self) -> io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("intervention-watcher".to_string())
            .spawn(move || self.run())
    }

    fn run(self) {
        info!("key-capture watcher running");
        loop {
            thread::sleep(self.interval);
            self.tick();
        }
    }

    /// One sampling iteration. Returns `true` if an intervention ran.
    fn tick(&self) -> bool {
        if !self.ctx.state.is_streaming() {
            // Normal prompts own the terminal; don't touch the input lock.
            return false;
        }
        match self.input.poll_key(self.interval) {
            Ok(Some(key)) if is_interrupt_key(key) => self.intervene(),
            Ok(_) => false,
            Err(e) => {
                warn!(error = %e, "raw key sample failed");
                false
            }
        }
    }

    /// Pauses the stream and prompts the operator for an optional message.
    ///
    /// Returns `false` without pausing if the stream finished between the
    /// key sample and the commit. `'e'` at the prompt terminates the whole
    /// process immediately; this is the operator's kill switch and
    /// intentionally skips any graceful drain.
    fn intervene(&self) -> bool {
        if !self.ctx.state.try_pause() {
            return false;
        }

        let answer = self
            .input
            .read_line("\nUser intervention ('e' to exit, empty to continue):\n> ");
        let answer = match answer {
            Ok(line) => line.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "intervention prompt failed; resuming stream");
                String::new()
            }
        };

        if answer.eq_ignore_ascii_case("e") {
            info!("operator requested exit during intervention");
            std::process::exit(0);
        }
        if !answer.is_empty() {
            info!("intervention message queued");
            self.ctx.state.set_intervention(answer);
        }
        self.ctx.state.resume();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedReader;

    fn watcher(ctx: &Arc<SupervisorContext>, reader: ScriptedReader) -> InterventionWatcher {
        let input = Arc::new(InputCoordinator::new(Box::new(reader)));
        InterventionWatcher::new(Arc::clone(ctx), input).with_interval(Duration::from_millis(1))
    }

    #[test]
    fn classifies_interrupt_keys() {
        assert!(is_interrupt_key('a'));
        assert!(is_interrupt_key('Z'));
        assert!(is_interrupt_key(' '));
        assert!(is_interrupt_key('\n'));
        assert!(!is_interrupt_key('1'));
        assert!(!is_interrupt_key('/'));
    }

    #[test]
    fn idle_stream_skips_sampling() {
        let ctx = Arc::new(SupervisorContext::new());
        let w = watcher(&ctx, ScriptedReader::default().with_keys(['x']));

        assert!(!w.tick());
        assert!(!ctx.state.is_paused());
    }

    #[test]
    fn interrupt_key_triggers_intervention() {
        let ctx = Arc::new(SupervisorContext::new());
        ctx.state.begin_stream();

        let w = watcher(
            &ctx,
            ScriptedReader::default()
                .with_keys(['x'])
                .with_lines(["steer left"]),
        );

        assert!(w.tick());
        // Prompt completed: resumed, message queued for the next checkpoint.
        assert!(!ctx.state.is_paused());
        assert_eq!(ctx.state.wait_if_paused().as_deref(), Some("steer left"));
    }

    #[test]
    fn empty_answer_resumes_without_message() {
        let ctx = Arc::new(SupervisorContext::new());
        ctx.state.begin_stream();

        let w = watcher(&ctx, ScriptedReader::default().with_keys(['q']).with_lines([""]));

        assert!(w.tick());
        assert!(!ctx.state.is_paused());
        assert_eq!(ctx.state.wait_if_paused(), None);
    }

    #[test]
    fn non_interrupt_key_is_ignored() {
        let ctx = Arc::new(SupervisorContext::new());
        ctx.state.begin_stream();

        let w = watcher(&ctx, ScriptedReader::default().with_keys(['3']));

        assert!(!w.tick());
        assert!(!ctx.state.is_paused());
    }

    #[test]
    fn pause_aborts_if_stream_already_finished() {
        // The stream ends between the key sample and the pause commit; the
        // watcher must not leave an idle state paused.
        let ctx = Arc::new(SupervisorContext::new());
        let w = watcher(&ctx, ScriptedReader::default().with_lines(["too late"]));

        assert!(!w.intervene());
        assert!(!ctx.state.is_paused());
        assert_eq!(ctx.state.wait_if_paused(), None);
    }
}
