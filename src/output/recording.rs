use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use parking_lot::Mutex;

use super::KeyOutputSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkCall {
    Char(char),
    Backspace,
}

/// What a [`RecordingSink`] has seen so far.
#[derive(Debug, Clone, Default)]
pub struct Recording {
    pub calls: Vec<SinkCall>,
    pub failed: usize,
    buf: Vec<char>,
}

impl Recording {
    pub fn text(&self) -> String {
        self.buf.iter().collect()
    }
}

/// In-memory sink. Clones share the same recording, so one clone can be handed
/// to a supervisor while another inspects the result.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    inner: Arc<Mutex<Recording>>,
    failing_chars: Arc<HashSet<char>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects every attempt to emit one of `chars`.
    pub fn failing_on(chars: impl IntoIterator<Item = char>) -> Self {
        Self {
            failing_chars: Arc::new(chars.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> Recording {
        self.inner.lock().clone()
    }

    pub fn text(&self) -> String {
        self.inner.lock().text()
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.inner.lock().calls.clone()
    }
}

impl KeyOutputSink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn emit_char(&mut self, c: char) -> Result<()> {
        let mut rec = self.inner.lock();
        rec.calls.push(SinkCall::Char(c));
        if self.failing_chars.contains(&c) {
            rec.failed += 1;
            return Err(anyhow!("cannot emit {c:?}"));
        }
        rec.buf.push(c);
        Ok(())
    }

    fn emit_backspace(&mut self) -> Result<()> {
        let mut rec = self.inner.lock();
        rec.calls.push(SinkCall::Backspace);
        rec.buf.pop();
        Ok(())
    }
}
