use crate::model::{Action, ActionKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanStats {
    pub actions: usize,
    pub keystrokes: usize,
    pub backspaces: usize,
    pub pauses: usize,
    pub total_wait_ms: u64,
}

impl PlanStats {
    /// Characters of final text per minute of simulated time.
    pub fn effective_cpm(&self, text_len: usize) -> f64 {
        if self.total_wait_ms == 0 {
            return 0.0;
        }
        text_len as f64 / (self.total_wait_ms as f64 / 60_000.0)
    }
}

pub fn stats(actions: &[Action]) -> PlanStats {
    let mut out = PlanStats {
        actions: actions.len(),
        ..Default::default()
    };

    for a in actions {
        out.total_wait_ms = out.total_wait_ms.saturating_add(a.delay_ms);
        match a.kind {
            ActionKind::Char { .. } => out.keystrokes += 1,
            ActionKind::Backspace => {
                out.keystrokes += 1;
                out.backspaces += 1;
            }
            ActionKind::Pause => out.pauses += 1,
        }
    }

    out
}

/// Text left behind by replaying `actions` into an empty buffer.
///
/// Characters are appended at the end and a backspace removes the last one;
/// a backspace on an empty buffer does nothing.
pub fn net_text<'a>(actions: impl IntoIterator<Item = &'a Action>) -> String {
    let mut buf: Vec<char> = Vec::new();
    for action in actions {
        match action.kind {
            ActionKind::Char { ch } => buf.push(ch),
            ActionKind::Backspace => {
                buf.pop();
            }
            ActionKind::Pause => {}
        }
    }
    buf.into_iter().collect()
}
