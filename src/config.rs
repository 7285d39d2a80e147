use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const MIN_SPEED_CPM: u32 = 50;
pub const MAX_SPEED_CPM: u32 = 500;

/// Knobs for the typing model.
///
/// Every field is kept in range by the setters: speed in 50..=500 CPM, variance
/// non-negative, probabilities in 0.0..=1.0. Out-of-range input is clamped, never
/// rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingConfig {
    base_speed_cpm: u32,
    speed_variance_cpm: u32,
    pause_probability: f64,
    typo_probability: f64,
    correction_probability: f64,
    double_char_probability: f64,
    char_swap_probability: f64,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            base_speed_cpm: 200,
            speed_variance_cpm: 50,
            pause_probability: 0.05,
            typo_probability: 0.08,
            correction_probability: 0.85,
            double_char_probability: 0.03,
            char_swap_probability: 0.02,
        }
    }
}

fn clamp_speed(cpm: i64) -> u32 {
    cpm.clamp(MIN_SPEED_CPM as i64, MAX_SPEED_CPM as i64) as u32
}

fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        return 0.0;
    }
    p.clamp(0.0, 1.0)
}

impl TypingConfig {
    /// A configuration that types straight through: no pauses and no mistakes.
    pub fn flawless() -> Self {
        Self {
            pause_probability: 0.0,
            typo_probability: 0.0,
            double_char_probability: 0.0,
            char_swap_probability: 0.0,
            ..Self::default()
        }
    }

    pub fn base_speed_cpm(&self) -> u32 {
        self.base_speed_cpm
    }

    pub fn speed_variance_cpm(&self) -> u32 {
        self.speed_variance_cpm
    }

    pub fn pause_probability(&self) -> f64 {
        self.pause_probability
    }

    pub fn typo_probability(&self) -> f64 {
        self.typo_probability
    }

    pub fn correction_probability(&self) -> f64 {
        self.correction_probability
    }

    pub fn double_char_probability(&self) -> f64 {
        self.double_char_probability
    }

    pub fn char_swap_probability(&self) -> f64 {
        self.char_swap_probability
    }

    pub fn set_speed(&mut self, cpm: i64) {
        self.base_speed_cpm = clamp_speed(cpm);
    }

    pub fn set_speed_variance(&mut self, cpm: i64) {
        self.speed_variance_cpm = cpm.clamp(0, u32::MAX as i64) as u32;
    }

    pub fn set_pause_probability(&mut self, p: f64) {
        self.pause_probability = clamp_probability(p);
    }

    /// Typo probability per character.
    pub fn set_error_rate(&mut self, p: f64) {
        self.typo_probability = clamp_probability(p);
    }

    /// Share of corrections made promptly rather than after a hesitation.
    ///
    /// This only changes pacing; every typo and swap is always corrected.
    pub fn set_correction_rate(&mut self, p: f64) {
        self.correction_probability = clamp_probability(p);
    }

    pub fn set_double_char_rate(&mut self, p: f64) {
        self.double_char_probability = clamp_probability(p);
    }

    pub fn set_swap_rate(&mut self, p: f64) {
        self.char_swap_probability = clamp_probability(p);
    }

    pub fn with_speed(mut self, cpm: i64) -> Self {
        self.set_speed(cpm);
        self
    }

    pub fn with_speed_variance(mut self, cpm: i64) -> Self {
        self.set_speed_variance(cpm);
        self
    }

    pub fn with_pause_probability(mut self, p: f64) -> Self {
        self.set_pause_probability(p);
        self
    }

    pub fn with_error_rate(mut self, p: f64) -> Self {
        self.set_error_rate(p);
        self
    }

    pub fn with_correction_rate(mut self, p: f64) -> Self {
        self.set_correction_rate(p);
        self
    }

    pub fn with_double_char_rate(mut self, p: f64) -> Self {
        self.set_double_char_rate(p);
        self
    }

    pub fn with_swap_rate(mut self, p: f64) -> Self {
        self.set_swap_rate(p);
        self
    }

    /// Re-apply every clamp. Used after deserialization, which bypasses the setters.
    pub fn normalized(self) -> Self {
        Self {
            base_speed_cpm: clamp_speed(self.base_speed_cpm as i64),
            speed_variance_cpm: self.speed_variance_cpm,
            pause_probability: clamp_probability(self.pause_probability),
            typo_probability: clamp_probability(self.typo_probability),
            correction_probability: clamp_probability(self.correction_probability),
            double_char_probability: clamp_probability(self.double_char_probability),
            char_swap_probability: clamp_probability(self.char_swap_probability),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: TypingConfig =
            serde_json::from_str(json).context("failed to parse typing config JSON")?;
        Ok(cfg.normalized())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_is_clamped_to_supported_range() {
        let mut cfg = TypingConfig::default();
        cfg.set_speed(-5);
        assert_eq!(cfg.base_speed_cpm(), 50);
        cfg.set_speed(9999);
        assert_eq!(cfg.base_speed_cpm(), 500);
        cfg.set_speed(180);
        assert_eq!(cfg.base_speed_cpm(), 180);
    }

    #[test]
    fn probabilities_are_clamped() {
        let mut cfg = TypingConfig::default();
        cfg.set_error_rate(1.5);
        assert_eq!(cfg.typo_probability(), 1.0);
        cfg.set_error_rate(-1.0);
        assert_eq!(cfg.typo_probability(), 0.0);
        cfg.set_swap_rate(f64::NAN);
        assert_eq!(cfg.char_swap_probability(), 0.0);
    }

    #[test]
    fn negative_variance_becomes_zero() {
        let cfg = TypingConfig::default().with_speed_variance(-20);
        assert_eq!(cfg.speed_variance_cpm(), 0);
    }

    #[test]
    fn json_values_are_clamped_on_load() {
        let cfg = TypingConfig::from_json(
            r#"{ "base_speed_cpm": 20, "typo_probability": 3.0, "pause_probability": -0.5 }"#,
        )
        .expect("config should parse");

        assert_eq!(cfg.base_speed_cpm(), 50);
        assert_eq!(cfg.typo_probability(), 1.0);
        assert_eq!(cfg.pause_probability(), 0.0);
        assert_eq!(
            cfg.correction_probability(),
            TypingConfig::default().correction_probability()
        );
    }
}
