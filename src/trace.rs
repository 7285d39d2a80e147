use crate::model::{Action, ActionKind};

#[derive(Debug, Default, Clone)]
struct Correction {
    deleted: Vec<char>,
    inserted: String,
}

impl Correction {
    fn wrong(&self) -> String {
        self.deleted.iter().rev().collect()
    }

    fn is_complete(&self) -> bool {
        !self.deleted.is_empty() && self.inserted.chars().count() >= self.deleted.len()
    }
}

/// Turns a stream of actions into short console lines such as
/// `Typing "hello"...` and `Replace "hlel" with "hell"...`.
///
/// Typing runs are reported when a correction starts, at sentence and line
/// boundaries, and on [`PlaybackTracer::finish`]. Corrections that restore the
/// same text (an accidental double keystroke) are not reported.
#[derive(Debug, Default, Clone)]
pub struct PlaybackTracer {
    buf: Vec<char>,
    typing_run: String,
    correction: Option<Correction>,
    pending_lines: Vec<String>,
}

impl PlaybackTracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_action(&mut self, action: &Action) {
        match action.kind {
            ActionKind::Char { ch } => self.handle_char(ch),
            ActionKind::Backspace => self.handle_backspace(),
            ActionKind::Pause => {}
        }
    }

    pub fn drain_lines(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending_lines)
    }

    pub fn finish(&mut self) -> Vec<String> {
        self.finish_correction();
        self.flush_typing_run();
        self.drain_lines()
    }

    fn handle_char(&mut self, c: char) {
        self.buf.push(c);

        if let Some(correction) = &mut self.correction {
            correction.inserted.push(c);
            if correction.is_complete() {
                self.finish_correction();
            }
            return;
        }

        self.typing_run.push(c);
        if matches!(c, '.' | '!' | '?' | '\n') {
            self.flush_typing_run();
        }
    }

    fn handle_backspace(&mut self) {
        let Some(removed) = self.buf.pop() else {
            return;
        };

        if let Some(correction) = &mut self.correction {
            // Slip while retyping: undo it without widening the corrected span.
            if correction.inserted.pop().is_none() {
                correction.deleted.push(removed);
            }
            return;
        }

        self.flush_typing_run();
        self.correction = Some(Correction {
            deleted: vec![removed],
            ..Default::default()
        });
    }

    fn flush_typing_run(&mut self) {
        if self.typing_run.is_empty() {
            return;
        }
        let line = format!("Typing \"{}\"...", escape_for_log(&self.typing_run));
        self.pending_lines.push(line);
        self.typing_run.clear();
    }

    fn finish_correction(&mut self) {
        let Some(correction) = self.correction.take() else {
            return;
        };
        let wrong = correction.wrong();
        if correction.inserted.is_empty() || wrong == correction.inserted {
            return;
        }
        self.pending_lines.push(format!(
            "Replace \"{}\" with \"{}\"...",
            escape_for_log(&wrong),
            escape_for_log(&correction.inserted)
        ));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub action_index: usize,
    pub line: String,
}

/// Trace lines for a whole plan, tagged with the index of the action that
/// completed them.
pub fn plan_console_trace(actions: &[Action]) -> Vec<TraceEvent> {
    let mut tracer = PlaybackTracer::new();
    let mut events = Vec::new();

    for (action_index, action) in actions.iter().enumerate() {
        tracer.observe_action(action);
        events.extend(
            tracer
                .drain_lines()
                .into_iter()
                .map(|line| TraceEvent { action_index, line }),
        );
    }

    let last = actions.len().saturating_sub(1);
    events.extend(
        tracer
            .finish()
            .into_iter()
            .map(|line| TraceEvent {
                action_index: last,
                line,
            }),
    );

    events
}

fn escape_for_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}
