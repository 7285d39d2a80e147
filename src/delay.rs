use rand::Rng;

use crate::config::TypingConfig;

pub const MIN_DELAY_SECS: f64 = 0.05;
pub const THINKING_PAUSE_SECS_MIN: f64 = 0.5;
pub const THINKING_PAUSE_SECS_MAX: f64 = 2.0;

#[derive(Debug, Clone, Copy)]
pub struct DelayModel {
    base_speed_cpm: u32,
    speed_variance_cpm: u32,
    pause_probability: f64,
}

impl DelayModel {
    pub fn new(cfg: &TypingConfig) -> Self {
        Self {
            base_speed_cpm: cfg.base_speed_cpm(),
            speed_variance_cpm: cfg.speed_variance_cpm(),
            pause_probability: cfg.pause_probability(),
        }
    }

    /// Seconds before the next keystroke: `60 / cpm` plus uniform jitter of
    /// `±variance / cpm`, never below 50 ms.
    pub fn next_delay_secs(&self, rng: &mut impl Rng) -> f64 {
        let cpm = self.base_speed_cpm.max(1) as f64;
        let base = 60.0 / cpm;
        let spread = self.speed_variance_cpm as f64 / cpm;
        let jitter = if spread > 0.0 {
            rng.gen_range(-spread..=spread)
        } else {
            0.0
        };
        (base + jitter).max(MIN_DELAY_SECS)
    }

    /// Extra pause before a word or space, or 0.0 when the typist keeps going.
    pub fn maybe_thinking_pause_secs(&self, rng: &mut impl Rng) -> f64 {
        if rng.gen_bool(self.pause_probability) {
            rng.gen_range(THINKING_PAUSE_SECS_MIN..=THINKING_PAUSE_SECS_MAX)
        } else {
            0.0
        }
    }
}

pub fn secs_to_ms(secs: f64) -> u64 {
    (secs * 1000.0).round().max(0.0) as u64
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn delay_never_drops_below_floor() {
        let cfg = TypingConfig::default()
            .with_speed(500)
            .with_speed_variance(10_000);
        let model = DelayModel::new(&cfg);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..5_000 {
            assert!(model.next_delay_secs(&mut rng) >= MIN_DELAY_SECS);
        }
    }

    #[test]
    fn zero_variance_gives_exact_base_delay() {
        let cfg = TypingConfig::default().with_speed(120).with_speed_variance(0);
        let model = DelayModel::new(&cfg);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(model.next_delay_secs(&mut rng), 0.5);
    }

    #[test]
    fn thinking_pause_respects_probability_and_range() {
        let mut rng = StdRng::seed_from_u64(3);

        let never = DelayModel::new(&TypingConfig::default().with_pause_probability(0.0));
        assert!((0..1_000).all(|_| never.maybe_thinking_pause_secs(&mut rng) == 0.0));

        let always = DelayModel::new(&TypingConfig::default().with_pause_probability(1.0));
        for _ in 0..1_000 {
            let pause = always.maybe_thinking_pause_secs(&mut rng);
            assert!((THINKING_PAUSE_SECS_MIN..=THINKING_PAUSE_SECS_MAX).contains(&pause));
        }
    }
}
