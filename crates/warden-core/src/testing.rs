//! Test doubles shared across crates.

use crate::input::{LineReader, ReadOutcome};
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

#[derive(Debug)]
enum ScriptStep {
    Line(String),
    Timeout,
}

/// Scripted stand-in for the terminal.
///
/// Line reads pop scripted steps in order; [`Self::with_timeout`] inserts an
/// explicit timed-out read. An exhausted script yields an empty line for
/// unbounded reads and a timeout for bounded ones. Key samples pop from the
/// key script and never block.
#[derive(Debug, Default)]
pub struct ScriptedReader {
    steps: VecDeque<ScriptStep>,
    keys: VecDeque<char>,
}

impl ScriptedReader {
    pub fn with_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps
            .extend(lines.into_iter().map(|l| ScriptStep::Line(l.into())));
        self
    }

    /// Scripts one bounded read that times out before the next line.
    pub fn with_timeout(mut self) -> Self {
        self.steps.push_back(ScriptStep::Timeout);
        self
    }

    pub fn with_keys<I: IntoIterator<Item = char>>(mut self, keys: I) -> Self {
        self.keys.extend(keys);
        self
    }
}

impl LineReader for ScriptedReader {
    fn read_line(&mut self, _prompt: &str) -> io::Result<String> {
        Ok(match self.steps.pop_front() {
            Some(ScriptStep::Line(line)) => line,
            // An unbounded read cannot time out; treat it as "just enter".
            Some(ScriptStep::Timeout) | None => String::new(),
        })
    }

    fn read_line_timeout(&mut self, _prompt: &str, _timeout: Duration) -> io::Result<ReadOutcome> {
        Ok(match self.steps.pop_front() {
            Some(ScriptStep::Line(line)) => ReadOutcome::Line(line),
            Some(ScriptStep::Timeout) | None => ReadOutcome::TimedOut,
        })
    }

    fn poll_key(&mut self, _timeout: Duration) -> io::Result<Option<char>> {
        Ok(self.keys.pop_front())
    }
}
