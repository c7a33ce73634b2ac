//! Emotion normalization
//!
//! Resolves contradictions inside a single frame of raw scores:
//! - Opposite emotions that are both strongly active: the weaker one is attenuated
//! - Similar emotions: members are pulled toward their group mean
//! - Runaway total activation: everything is scaled back toward a target total
//!
//! The normalizer holds no cross-frame state.

use crate::config::NormalizerConfig;
use crate::types::EmotionScores;

/// Per-frame contradiction resolver
#[derive(Debug, Clone, Default)]
pub struct EmotionNormalizer {
    config: NormalizerConfig,
}

impl EmotionNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize one frame. The output has exactly the input's emotions.
    pub fn normalize(&self, raw: &EmotionScores) -> EmotionScores {
        let mut scores = raw.clone();

        self.suppress_opposites(&mut scores);
        self.reinforce_similar(&mut scores);
        self.redistribute_mass(&mut scores);

        for value in scores.values_mut() {
            *value = if value.is_finite() { value.clamp(0.0, 100.0) } else { 0.0 };
        }
        scores
    }

    /// Attenuate the weaker member of every strongly co-active opposite pair.
    ///
    /// Pairs are applied in configuration order on the running values. On an
    /// exact tie the second emotion of the pair is attenuated.
    pub(crate) fn suppress_opposites(&self, scores: &mut EmotionScores) {
        let threshold = self.config.coactivation_threshold;

        for &(first, second) in &self.config.opposite_pairs {
            if !scores.contains(first) || !scores.contains(second) {
                continue;
            }
            let a = scores.get(first);
            let b = scores.get(second);
            if a <= threshold || b <= threshold {
                continue;
            }

            let penalty = a.min(b) / 100.0 * self.config.suppression_factor;
            let weaker = if a >= b { second } else { first };
            scores.insert(weaker, scores.get(weaker) * (1.0 - penalty));
        }
    }

    /// Pull members of an active similar group toward the group mean.
    ///
    /// Missing members count as 0.0 in the mean and are never inserted.
    fn reinforce_similar(&self, scores: &mut EmotionScores) {
        for group in &self.config.similar_groups {
            if group.is_empty() {
                continue;
            }
            let values: Vec<f64> = group.iter().map(|e| scores.get(*e)).collect();
            let peak = values.iter().copied().fold(f64::MIN, f64::max);
            if peak <= self.config.reinforcement_trigger {
                continue;
            }

            let mean = values.iter().sum::<f64>() / values.len() as f64;
            for &emotion in group {
                let current = scores.get(emotion);
                if scores.contains(emotion) && current > self.config.reinforcement_floor {
                    scores.insert(emotion, current + (mean - current) * self.config.reinforcement_pull);
                }
            }
        }
    }

    fn redistribute_mass(&self, scores: &mut EmotionScores) {
        let total = scores.total();
        let ceiling = self.config.target_total * self.config.overload_factor;
        if total > ceiling {
            let factor = self.config.target_total / total;
            tracing::trace!(total, factor, "scaling over-activated frame");
            for value in scores.values_mut() {
                *value *= factor;
            }
        }
    }
}

/// Dominant emotion label and score, or `("neutral", 0.0)` for an empty frame
pub fn dominant_label(scores: &EmotionScores) -> (&'static str, f64) {
    scores
        .dominant()
        .map(|(emotion, score)| (emotion.as_str(), score))
        .unwrap_or(("neutral", 0.0))
}

/// Frame with every emotion present, zero unless listed
#[cfg(test)]
pub(crate) fn full_frame(values: &[(crate::types::Emotion, f64)]) -> EmotionScores {
    let mut scores: EmotionScores = crate::types::Emotion::ALL.into_iter().map(|e| (e, 0.0)).collect();
    for &(emotion, value) in values {
        scores.insert(emotion, value);
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Emotion;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_opposite_pair_attenuates_weaker() {
        let normalizer = EmotionNormalizer::default();
        let raw = full_frame(&[(Emotion::Happy, 80.0), (Emotion::Sad, 40.0)]);
        let out = normalizer.normalize(&raw);
        // penalty = 40/100 * 0.7 = 0.28; sad/anxiety group stays inactive
        assert!(approx(out.get(Emotion::Sad), 40.0 * 0.72));
        assert_eq!(out.get(Emotion::Happy), 80.0);
    }

    #[test]
    fn test_below_coactivation_threshold_untouched() {
        let normalizer = EmotionNormalizer::default();
        let raw = full_frame(&[(Emotion::Happy, 80.0), (Emotion::Sad, 30.0)]);
        assert_eq!(normalizer.normalize(&raw), raw);
    }

    #[test]
    fn test_exact_tie_attenuates_second_of_pair() {
        let normalizer = EmotionNormalizer::new(NormalizerConfig {
            similar_groups: Vec::new(),
            ..NormalizerConfig::default()
        });
        let raw = full_frame(&[(Emotion::Surprise, 40.0), (Emotion::Disgust, 40.0)]);
        let out = normalizer.normalize(&raw);
        assert_eq!(out.get(Emotion::Surprise), 40.0);
        assert!(approx(out.get(Emotion::Disgust), 40.0 * (1.0 - 0.28)));
    }

    #[test]
    fn test_similar_group_pulls_toward_mean() {
        let normalizer = EmotionNormalizer::default();
        let raw = full_frame(&[(Emotion::Angry, 70.0), (Emotion::Disgust, 30.0)]);
        let out = normalizer.normalize(&raw);
        // mean 50: angry 70 -> 66, disgust 30 -> 34
        assert!(approx(out.get(Emotion::Angry), 66.0));
        assert!(approx(out.get(Emotion::Disgust), 34.0));
    }

    #[test]
    fn test_missing_group_member_counts_as_zero_and_stays_missing() {
        let normalizer = EmotionNormalizer::default();
        let raw: EmotionScores = [(Emotion::Angry, 60.0)].into_iter().collect();
        let out = normalizer.normalize(&raw);
        // mean (60 + 0) / 2 = 30 -> 60 + (30 - 60) * 0.2 = 54
        assert!(approx(out.get(Emotion::Angry), 54.0));
        assert!(!out.contains(Emotion::Disgust));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_overactivation_is_scaled_to_target() {
        let normalizer = EmotionNormalizer::new(NormalizerConfig {
            opposite_pairs: Vec::new(),
            similar_groups: Vec::new(),
            ..NormalizerConfig::default()
        });
        let raw = full_frame(&[
            (Emotion::Angry, 50.0),
            (Emotion::Fear, 50.0),
            (Emotion::Sad, 50.0),
            (Emotion::Surprise, 50.0),
        ]);
        let out = normalizer.normalize(&raw);
        assert!(approx(out.total(), 120.0));
        assert!(approx(out.get(Emotion::Fear), 30.0));
    }

    #[test]
    fn test_keys_preserved() {
        let normalizer = EmotionNormalizer::default();
        let raw: EmotionScores = [(Emotion::Happy, 90.0), (Emotion::Fear, 45.0)].into_iter().collect();
        let out = normalizer.normalize(&raw);
        let keys: Vec<Emotion> = out.emotions().collect();
        assert_eq!(keys, vec![Emotion::Fear, Emotion::Happy]);
    }

    #[test]
    fn test_dominant_label_empty_is_neutral() {
        assert_eq!(dominant_label(&EmotionScores::new()), ("neutral", 0.0));
        let scores = full_frame(&[(Emotion::Sad, 12.0)]);
        assert_eq!(dominant_label(&scores), ("sad", 12.0));
    }

    fn arb_pair() -> impl Strategy<Value = (Emotion, Emotion)> {
        prop::sample::select(NormalizerConfig::default().opposite_pairs)
    }

    proptest! {
        #[test]
        fn prop_weaker_of_coactive_pair_strictly_decreases(
            (first, second) in arb_pair(),
            a in 30.01f64..100.0,
            b in 30.01f64..100.0,
        ) {
            let normalizer = EmotionNormalizer::default();
            let raw = full_frame(&[(first, a), (second, b)]);
            let out = normalizer.normalize(&raw);
            let (weaker, before) = if a >= b { (second, b) } else { (first, a) };
            prop_assert!(out.get(weaker) < before);
        }

        #[test]
        fn prop_output_in_range_and_bounded(values in prop::array::uniform7(0.0f64..100.0)) {
            let normalizer = EmotionNormalizer::default();
            let raw: EmotionScores = Emotion::ALL.into_iter().zip(values).collect();
            let out = normalizer.normalize(&raw);
            let input_peak = values.iter().copied().fold(0.0, f64::max);
            for (_, v) in out.iter() {
                prop_assert!((0.0..=100.0).contains(&v));
                // reinforcement closes at most 20% of the gap to a mean below the peak
                prop_assert!(v <= input_peak + 1e-9);
            }
        }
    }
}
