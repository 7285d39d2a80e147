use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub version: u32,
    pub text_len: usize,
    pub actions: Vec<Action>,
}

/// One step of a typing run: wait `delay_ms`, then perform `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub delay_ms: u64,
    #[serde(flatten)]
    pub kind: ActionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    Char { ch: char },
    Backspace,
    /// Pure delay; nothing is emitted.
    Pause,
}

impl Action {
    pub fn char(ch: char, delay_ms: u64) -> Self {
        Self {
            delay_ms,
            kind: ActionKind::Char { ch },
        }
    }

    pub fn backspace(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            kind: ActionKind::Backspace,
        }
    }

    pub fn pause(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            kind: ActionKind::Pause,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Actions for one source unit: a single space, or a run of non-space characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub target_len: usize,
    pub actions: Vec<Action>,
}
