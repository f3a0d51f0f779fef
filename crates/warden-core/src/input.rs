//! Exclusive terminal input coordination.
//!
//! The terminal is a single contended resource: the foreground prompt and
//! the background intervention prompt must never interleave their
//! characters. [`InputCoordinator`] serializes every read behind one mutex;
//! the lock guard is scoped to a single read cycle, so the resource is
//! released on every exit path including panics in the reader.
//!
//! The actual byte source sits behind [`LineReader`] so tests can script
//! input instead of owning a real terminal (the production implementation is
//! [`TerminalReader`]).

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Result of a bounded-wait line read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A full line arrived before the deadline.
    Line(String),
    /// The deadline passed with no complete line. Not an error; callers
    /// substitute a default continuation message.
    TimedOut,
}

/// Source of terminal input.
///
/// Implementations are not required to be thread-safe; the coordinator's
/// mutex guarantees one reader at a time.
pub trait LineReader: Send {
    /// Displays `prompt` and blocks until a full line is typed.
    fn read_line(&mut self, prompt: &str) -> io::Result<String>;

    /// Displays `prompt` and waits up to `timeout` for a full line.
    fn read_line_timeout(&mut self, prompt: &str, timeout: Duration) -> io::Result<ReadOutcome>;

    /// Samples a single raw keypress without consuming line input.
    ///
    /// Returns `None` when no key arrives within `timeout` or the key has no
    /// character representation. `Enter` and `Tab` map to their whitespace
    /// characters so interrupt classification can treat them uniformly.
    fn poll_key(&mut self, timeout: Duration) -> io::Result<Option<char>>;
}

/// Serializes all blocking terminal reads behind one exclusive lock.
pub struct InputCoordinator {
    reader: Mutex<Box<dyn LineReader>>,
}

impl InputCoordinator {
    pub fn new(reader: Box<dyn LineReader>) -> Self {
        Self {
            reader: Mutex::new(reader),
        }
    }

    /// Coordinator over the process's real terminal.
    pub fn terminal() -> Self {
        Self::new(Box::new(TerminalReader))
    }

    /// Unbounded-wait read. Holds the input lock for the full prompt-read
    /// cycle.
    pub fn read_line(&self, prompt: &str) -> io::Result<String> {
        let mut reader = self.reader.lock().unwrap();
        reader.read_line(prompt)
    }

    /// Bounded-wait read; returns [`ReadOutcome::TimedOut`] if no line
    /// arrives in time.
    pub fn read_line_with_timeout(
        &self,
        prompt: &str,
        timeout: Duration,
    ) -> io::Result<ReadOutcome> {
        let mut reader = self.reader.lock().unwrap();
        reader.read_line_timeout(prompt, timeout)
    }

    /// Short raw-key sample used by the key-capture watcher. Takes the same
    /// lock as the line reads, so a sample never runs mid-prompt.
    pub fn poll_key(&self, timeout: Duration) -> io::Result<Option<char>> {
        let mut reader = self.reader.lock().unwrap();
        reader.poll_key(timeout)
    }
}

/// Production reader over stdin/stdout.
///
/// The bounded-wait read assembles the line from raw key events under a poll
/// deadline instead of parking a thread on `stdin` (which would leak a
/// blocked reader on every timeout). Raw mode is scoped to each call and
/// restored on all exits.
pub struct TerminalReader;

impl TerminalReader {
    fn echo(c: char) -> io::Result<()> {
        let mut buf = [0u8; 4];
        let mut stdout = io::stdout();
        stdout.write_all(c.encode_utf8(&mut buf).as_bytes())?;
        stdout.flush()
    }

    fn show_prompt(prompt: &str) -> io::Result<()> {
        let mut stdout = io::stdout();
        stdout.write_all(prompt.as_bytes())?;
        stdout.flush()
    }
}

impl LineReader for TerminalReader {
    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        Self::show_prompt(prompt)?;
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn read_line_timeout(&mut self, prompt: &str, timeout: Duration) -> io::Result<ReadOutcome> {
        Self::show_prompt(prompt)?;

        enable_raw_mode()?;
        let _restore = scopeguard::guard((), |()| {
            let _ = disable_raw_mode();
        });

        let deadline = Instant::now() + timeout;
        let mut line = String::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || !event::poll(remaining)? {
                return Ok(ReadOutcome::TimedOut);
            }
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Enter => {
                        Self::echo('\r')?;
                        Self::echo('\n')?;
                        return Ok(ReadOutcome::Line(line));
                    }
                    KeyCode::Backspace => {
                        if line.pop().is_some() {
                            // erase the echoed character
                            Self::show_prompt("\u{8} \u{8}")?;
                        }
                    }
                    KeyCode::Char(c) => {
                        line.push(c);
                        Self::echo(c)?;
                    }
                    _ => {}
                }
            }
        }
    }

    fn poll_key(&mut self, timeout: Duration) -> io::Result<Option<char>> {
        enable_raw_mode()?;
        let _restore = scopeguard::guard((), |()| {
            let _ = disable_raw_mode();
        });

        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => Ok(match key.code {
                KeyCode::Char(c) => Some(c),
                KeyCode::Enter => Some('\n'),
                KeyCode::Tab => Some('\t'),
                _ => None,
            }),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedReader;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    #[test]
    fn read_line_returns_scripted_input() {
        let input = InputCoordinator::new(Box::new(ScriptedReader::default().with_lines(["hello"])));
        assert_eq!(input.read_line("> ").unwrap(), "hello");
    }

    #[test]
    fn timeout_read_returns_sentinel_not_error() {
        // Scenario: no input arrives within the window.
        let input = InputCoordinator::new(Box::new(ScriptedReader::default()));
        let outcome = input
            .read_line_with_timeout("> ", Duration::from_secs(1))
            .unwrap();
        assert_eq!(outcome, ReadOutcome::TimedOut);
    }

    #[test]
    fn timeout_read_returns_line_when_available() {
        let input = InputCoordinator::new(Box::new(ScriptedReader::default().with_lines(["w"])));
        let outcome = input
            .read_line_with_timeout("> ", Duration::from_secs(1))
            .unwrap();
        assert_eq!(outcome, ReadOutcome::Line("w".to_string()));
    }

    /// Reader that trips an assertion if two readers ever overlap.
    struct GateProbe {
        in_use: Arc<AtomicBool>,
    }

    impl LineReader for GateProbe {
        fn read_line(&mut self, _prompt: &str) -> io::Result<String> {
            assert!(
                !self.in_use.swap(true, Ordering::SeqCst),
                "two readers held the input resource at once"
            );
            thread::sleep(Duration::from_millis(2));
            self.in_use.store(false, Ordering::SeqCst);
            Ok(String::new())
        }

        fn read_line_timeout(
            &mut self,
            prompt: &str,
            _timeout: Duration,
        ) -> io::Result<ReadOutcome> {
            self.read_line(prompt).map(ReadOutcome::Line)
        }

        fn poll_key(&mut self, _timeout: Duration) -> io::Result<Option<char>> {
            assert!(
                !self.in_use.swap(true, Ordering::SeqCst),
                "raw sample overlapped a line read"
            );
            self.in_use.store(false, Ordering::SeqCst);
            Ok(None)
        }
    }

    #[test]
    fn contending_readers_are_serialized() {
        let in_use = Arc::new(AtomicBool::new(false));
        let input = Arc::new(InputCoordinator::new(Box::new(GateProbe {
            in_use: Arc::clone(&in_use),
        })));

        let mut handles = Vec::new();
        for i in 0..8 {
            let input = Arc::clone(&input);
            handles.push(thread::spawn(move || {
                for _ in 0..10 {
                    if i % 2 == 0 {
                        input.read_line("> ").unwrap();
                    } else {
                        input.poll_key(Duration::from_millis(1)).unwrap();
                    }
                }
            }));
        }
        // Every reader finishing proves the resource was always released.
        for h in handles {
            h.join().unwrap();
        }
        assert!(!in_use.load(Ordering::SeqCst));
    }
}
