use anyhow::{anyhow, Result};
use rand::Rng;

use crate::config::TypingConfig;
use crate::delay::{secs_to_ms, DelayModel};
use crate::mistakes::ErrorModel;
use crate::model::{Action, ActionKind, Plan, Unit};

pub const PLAN_VERSION: u32 = 1;

// Fractions of a standard keystroke delay used while correcting.
const DOUBLE_CHAR_RECOVERY: f64 = 0.5;
const TYPO_HESITATION: f64 = 0.3;
const TYPO_RECOVERY: f64 = 0.5;
const SWAP_PROMPT_BACKSPACE: f64 = 0.3;
const SWAP_HESITANT_BACKSPACE: f64 = 0.2;
const SWAP_RETYPE_PAUSE: f64 = 2.0;

/// Collects actions while folding waits into the next action's pre-delay.
#[derive(Debug, Clone, Default)]
struct ActionBuilder {
    actions: Vec<Action>,
    pending_secs: f64,
}

impl ActionBuilder {
    fn wait(&mut self, secs: f64) {
        self.pending_secs += secs;
    }

    fn push(&mut self, kind: ActionKind) {
        self.actions.push(Action {
            delay_ms: secs_to_ms(self.pending_secs),
            kind,
        });
        self.pending_secs = 0.0;
    }

    fn emit_char(&mut self, ch: char) {
        self.push(ActionKind::Char { ch });
    }

    fn backspace(&mut self) {
        self.push(ActionKind::Backspace);
    }

    fn pause(&mut self, secs: f64) {
        self.wait(secs);
        self.push(ActionKind::Pause);
    }

    /// Actions gathered so far. Any pending wait carries over to the next action.
    fn take_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.actions)
    }
}

/// Turns text into humanlike keystrokes whose net effect is exactly that text.
#[derive(Debug, Clone)]
pub struct Sequencer {
    delay: DelayModel,
    errors: ErrorModel,
}

impl Sequencer {
    pub fn new(cfg: &TypingConfig) -> Self {
        Self {
            delay: DelayModel::new(cfg),
            errors: ErrorModel::new(cfg),
        }
    }

    pub fn delay_model(&self) -> &DelayModel {
        &self.delay
    }

    pub fn error_model(&self) -> &ErrorModel {
        &self.errors
    }

    /// Lazily sequence `text` one source unit (space or word) at a time.
    pub fn units<R: Rng>(&self, text: &str, rng: R) -> Units<R> {
        Units {
            sequencer: self.clone(),
            chars: text.chars().collect(),
            pos: 0,
            rng,
            builder: ActionBuilder::default(),
        }
    }

    /// Lazily sequence `text` as a flat stream of actions.
    pub fn sequence<R: Rng>(&self, text: &str, rng: R) -> impl Iterator<Item = Action> {
        self.units(text, rng).flat_map(|unit| unit.actions)
    }

    fn std_delay(&self, rng: &mut impl Rng) -> f64 {
        self.delay.next_delay_secs(rng)
    }

    fn type_character(&self, b: &mut ActionBuilder, target: char, rng: &mut impl Rng) {
        if self.errors.maybe_double_char(target, rng) {
            b.emit_char(target);
            b.wait(self.std_delay(rng));
            b.backspace();
            b.wait(self.std_delay(rng) * DOUBLE_CHAR_RECOVERY);
        }

        if let Some(wrong) = self.errors.maybe_typo(target, rng) {
            b.emit_char(wrong);
            b.wait(self.std_delay(rng));
            if !self.errors.corrects_promptly(rng) {
                b.wait(self.std_delay(rng) * TYPO_HESITATION);
            }
            b.backspace();
            b.wait(self.std_delay(rng) * TYPO_RECOVERY);
        }

        b.emit_char(target);
        b.wait(self.std_delay(rng));
    }

    fn type_word(&self, b: &mut ActionBuilder, word: &[char], rng: &mut impl Rng) {
        let Some(swap) = self.errors.maybe_swap_adjacent(word, rng) else {
            for &c in word {
                self.type_character(b, c, rng);
            }
            return;
        };

        for &c in &word[..swap] {
            self.type_character(b, c, rng);
        }

        self.type_character(b, word[swap + 1], rng);
        b.wait(self.std_delay(rng));
        self.type_character(b, word[swap], rng);
        b.wait(self.std_delay(rng));

        for &c in &word[swap + 2..] {
            self.type_character(b, c, rng);
        }

        let prompt = self.errors.corrects_promptly(rng);
        let backspace_factor = if prompt {
            SWAP_PROMPT_BACKSPACE
        } else {
            SWAP_HESITANT_BACKSPACE
        };
        for _ in swap..word.len() {
            b.backspace();
            b.wait(self.std_delay(rng) * backspace_factor);
        }
        if prompt {
            b.wait(self.std_delay(rng) * SWAP_RETYPE_PAUSE);
        }

        for &c in &word[swap..] {
            self.type_character(b, c, rng);
        }
    }
}

/// Iterator over the [`Unit`]s of one text. Each call to [`Sequencer::units`]
/// starts a fresh, independently randomized sequence.
#[derive(Debug)]
pub struct Units<R> {
    sequencer: Sequencer,
    chars: Vec<char>,
    pos: usize,
    rng: R,
    builder: ActionBuilder,
}

impl<R> Units<R> {
    pub fn total_target_chars(&self) -> usize {
        self.chars.len()
    }
}

impl<R: Rng> Iterator for Units<R> {
    type Item = Unit;

    fn next(&mut self) -> Option<Unit> {
        if self.pos >= self.chars.len() {
            return None;
        }

        let seq = &self.sequencer;
        let rng = &mut self.rng;
        let builder = &mut self.builder;

        let pause = seq.delay.maybe_thinking_pause_secs(rng);
        if pause > 0.0 {
            builder.pause(pause);
        }

        let start = self.pos;
        if self.chars[start] == ' ' {
            builder.emit_char(' ');
            builder.wait(seq.std_delay(rng));
            self.pos += 1;
        } else {
            let end = self.chars[start..]
                .iter()
                .position(|&c| c == ' ')
                .map_or(self.chars.len(), |offset| start + offset);
            seq.type_word(builder, &self.chars[start..end], rng);
            self.pos = end;
        }

        Some(Unit {
            target_len: self.pos - start,
            actions: builder.take_actions(),
        })
    }
}

/// Sequence all of `text` up front and check that it types back to `text`.
pub fn generate_plan(text: &str, cfg: &TypingConfig, rng: &mut impl Rng) -> Result<Plan> {
    let sequencer = Sequencer::new(cfg);
    let actions: Vec<Action> = sequencer.sequence(text, rng).collect();

    let typed = crate::sim::net_text(&actions);
    if typed != text {
        return Err(anyhow!(
            "sequencer bug: simulated text does not match target ({} vs {} chars)",
            typed.chars().count(),
            text.chars().count()
        ));
    }

    Ok(Plan {
        version: PLAN_VERSION,
        text_len: text.chars().count(),
        actions,
    })
}
