use rand::Rng;

use crate::config::TypingConfig;
use crate::keyboard::KeyAdjacencyMap;

/// Decides where the simulated typist slips and what the slip looks like.
///
/// Every mistake produced here is later undone by the sequencer;
/// `correction_probability` only selects how quickly that happens.
#[derive(Debug, Clone)]
pub struct ErrorModel {
    adjacency: KeyAdjacencyMap,
    typo_probability: f64,
    correction_probability: f64,
    double_char_probability: f64,
    char_swap_probability: f64,
}

impl ErrorModel {
    pub fn new(cfg: &TypingConfig) -> Self {
        Self {
            adjacency: KeyAdjacencyMap::qwerty(),
            typo_probability: cfg.typo_probability(),
            correction_probability: cfg.correction_probability(),
            double_char_probability: cfg.double_char_probability(),
            char_swap_probability: cfg.char_swap_probability(),
        }
    }

    /// A neighbouring key hit instead of `target`, keeping its case.
    ///
    /// Characters without neighbours (punctuation, digits, non-ASCII) never
    /// produce a typo.
    pub fn maybe_typo(&self, target: char, rng: &mut impl Rng) -> Option<char> {
        if !rng.gen_bool(self.typo_probability) {
            return None;
        }
        let neighbors = self.adjacency.neighbors(target)?;
        let wrong = neighbors[rng.gen_range(0..neighbors.len())];
        if target.is_uppercase() {
            wrong.to_uppercase().next()
        } else {
            Some(wrong)
        }
    }

    pub fn maybe_double_char(&self, _c: char, rng: &mut impl Rng) -> bool {
        rng.gen_bool(self.double_char_probability)
    }

    /// Index `i` such that `word[i]` and `word[i + 1]` get typed in swapped order.
    pub fn maybe_swap_adjacent(&self, word: &[char], rng: &mut impl Rng) -> Option<usize> {
        if word.len() < 2 || !rng.gen_bool(self.char_swap_probability) {
            return None;
        }
        Some(rng.gen_range(0..=word.len() - 2))
    }

    /// Whether the next correction is made right away rather than after a beat.
    pub fn corrects_promptly(&self, rng: &mut impl Rng) -> bool {
        rng.gen_bool(self.correction_probability)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn always_wrong() -> ErrorModel {
        ErrorModel::new(
            &TypingConfig::default()
                .with_error_rate(1.0)
                .with_double_char_rate(1.0)
                .with_swap_rate(1.0),
        )
    }

    #[test]
    fn typo_is_an_adjacent_key_with_matching_case() {
        let model = always_wrong();
        let mut rng = StdRng::seed_from_u64(11);
        let adjacency = KeyAdjacencyMap::qwerty();

        for _ in 0..200 {
            let lower = model.maybe_typo('f', &mut rng).expect("f has neighbours");
            assert!(adjacency.neighbors('f').unwrap_or(&[]).contains(&lower));

            let upper = model.maybe_typo('F', &mut rng).expect("F has neighbours");
            assert!(upper.is_uppercase());
            assert!(adjacency
                .neighbors('f')
                .unwrap_or(&[])
                .contains(&upper.to_ascii_lowercase()));
        }
    }

    #[test]
    fn punctuation_never_gets_a_typo() {
        let model = always_wrong();
        let mut rng = StdRng::seed_from_u64(5);
        assert!((0..100).all(|_| model.maybe_typo('!', &mut rng).is_none()));
    }

    #[test]
    fn swap_index_stays_inside_the_word() {
        let model = always_wrong();
        let mut rng = StdRng::seed_from_u64(9);
        let word: Vec<char> = "hello".chars().collect();

        for _ in 0..500 {
            let idx = model
                .maybe_swap_adjacent(&word, &mut rng)
                .expect("swap probability is 1");
            assert!(idx <= word.len() - 2);
        }
        assert_eq!(model.maybe_swap_adjacent(&['a'], &mut rng), None);
    }

    #[test]
    fn zero_probabilities_never_inject_mistakes() {
        let model = ErrorModel::new(&TypingConfig::flawless());
        let mut rng = StdRng::seed_from_u64(2);
        let word: Vec<char> = "typing".chars().collect();

        for _ in 0..500 {
            assert_eq!(model.maybe_typo('a', &mut rng), None);
            assert!(!model.maybe_double_char('a', &mut rng));
            assert_eq!(model.maybe_swap_adjacent(&word, &mut rng), None);
        }
    }
}
