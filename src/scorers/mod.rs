//! Per-emotion facial scorers
//!
//! Each emotion owns four pure region functions (eyebrows, eyes, nose, mouth)
//! and a weight vector. A frame's score for that emotion is
//! `Σ weight × region_score`, clamped to [0, 100]. Which region dominates an
//! emotion is expressed only through its weights.
//!
//! Scorers are composed into a table (`ScoreAggregator`) built from an explicit
//! [`ScorerConfig`]; there is no shared mutable state between frames.

pub mod angry;
pub mod anxiety;
pub mod disgust;
pub mod fear;
pub mod happy;
pub mod sad;
pub mod surprise;

use crate::error::ComputeError;
use crate::types::{Emotion, EmotionScores, RegionFeatures};
use serde::{Deserialize, Serialize};

/// Largest accepted sum of a weight vector (four regions at full weight)
pub const MAX_WEIGHT_TOTAL: f64 = 4.0;

/// Ratio names produced by the feature extractor
pub mod keys {
    // eyebrows
    pub const TOGETHER: &str = "together";
    pub const RIGHT_RAISED: &str = "right_raised";
    pub const LEFT_RAISED: &str = "left_raised";
    pub const LOWERED: &str = "lowered";
    // eyes
    pub const OPENNESS: &str = "openness";
    pub const TENSION: &str = "tension";
    pub const TIGHTNESS: &str = "tightness";
    // nose
    pub const FLARED: &str = "flared";
    pub const WRINKLE: &str = "wrinkle";
    pub const FLARE: &str = "flare";
    // mouth (TENSION and OPENNESS are shared with eyes)
    pub const NO_SMILE: &str = "no_smile";
    pub const PRESS: &str = "press";
    pub const TIGHTEN: &str = "tighten";
    pub const CHIN_RAISE: &str = "chin_raise";
}

/// Region weight vector for one emotion.
///
/// Every region is required when deserializing; weights need not sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionWeights {
    pub eyebrows: f64,
    pub eyes: f64,
    pub nose: f64,
    pub mouth: f64,
}

impl RegionWeights {
    pub const fn new(eyebrows: f64, eyes: f64, nose: f64, mouth: f64) -> Self {
        Self {
            eyebrows,
            eyes,
            nose,
            mouth,
        }
    }

    pub fn total(&self) -> f64 {
        self.eyebrows + self.eyes + self.nose + self.mouth
    }

    /// Reject non-finite, negative, all-zero or oversized weight vectors
    pub fn validate(&self, emotion: Emotion) -> Result<(), ComputeError> {
        let invalid = |reason: String| ComputeError::InvalidWeights {
            emotion: emotion.to_string(),
            reason,
        };

        for (region, w) in [
            ("eyebrows", self.eyebrows),
            ("eyes", self.eyes),
            ("nose", self.nose),
            ("mouth", self.mouth),
        ] {
            if !w.is_finite() || w < 0.0 {
                return Err(invalid(format!("{region} weight must be finite and >= 0, got {w}")));
            }
        }

        let total = self.total();
        if total <= 0.0 {
            return Err(invalid("weights sum to zero".to_string()));
        }
        if total > MAX_WEIGHT_TOTAL {
            return Err(invalid(format!(
                "weights sum to {total}, above the maximum of {MAX_WEIGHT_TOTAL}"
            )));
        }
        Ok(())
    }
}

/// Region sub-scores for one emotion, each clamped to [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RegionScores {
    pub eyebrows: f64,
    pub eyes: f64,
    pub nose: f64,
    pub mouth: f64,
}

impl RegionScores {
    pub fn new(eyebrows: f64, eyes: f64, nose: f64, mouth: f64) -> Self {
        Self {
            eyebrows: clamp_score(eyebrows),
            eyes: clamp_score(eyes),
            nose: clamp_score(nose),
            mouth: clamp_score(mouth),
        }
    }

    /// Weighted combination, clamped to [0, 100]
    pub fn combine(&self, weights: &RegionWeights) -> f64 {
        clamp_score(
            weights.eyebrows * self.eyebrows
                + weights.eyes * self.eyes
                + weights.nose * self.nose
                + weights.mouth * self.mouth,
        )
    }
}

/// Weights plus emotion-specific thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionProfile<T> {
    pub weights: RegionWeights,
    #[serde(default)]
    pub thresholds: T,
}

/// Scorer configuration for every emotion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    pub angry: EmotionProfile<angry::AngryThresholds>,
    pub fear: EmotionProfile<fear::FearThresholds>,
    pub sad: EmotionProfile<sad::SadThresholds>,
    pub happy: EmotionProfile<happy::HappyThresholds>,
    pub surprise: EmotionProfile<surprise::SurpriseThresholds>,
    pub disgust: EmotionProfile<disgust::DisgustThresholds>,
    pub anxiety: EmotionProfile<anxiety::AnxietyThresholds>,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            angry: angry::default_profile(),
            fear: fear::default_profile(),
            sad: sad::default_profile(),
            happy: happy::default_profile(),
            surprise: surprise::default_profile(),
            disgust: disgust::default_profile(),
            anxiety: anxiety::default_profile(),
        }
    }
}

impl ScorerConfig {
    /// Fail fast on malformed weights or thresholds
    pub fn validate(&self) -> Result<(), ComputeError> {
        self.angry.weights.validate(Emotion::Angry)?;
        self.fear.weights.validate(Emotion::Fear)?;
        self.sad.weights.validate(Emotion::Sad)?;
        self.happy.weights.validate(Emotion::Happy)?;
        self.surprise.weights.validate(Emotion::Surprise)?;
        self.disgust.weights.validate(Emotion::Disgust)?;
        self.anxiety.weights.validate(Emotion::Anxiety)?;

        self.angry.thresholds.validate()?;
        self.fear.thresholds.validate()?;
        self.sad.thresholds.validate()?;
        self.happy.thresholds.validate()?;
        self.surprise.thresholds.validate()?;
        self.disgust.thresholds.validate()?;
        self.anxiety.thresholds.validate()
    }
}

type RegionFn = Box<dyn Fn(&RegionFeatures) -> RegionScores + Send + Sync>;

/// One entry of the scorer table: an emotion, its weights and its region functions
pub struct EmotionScorer {
    emotion: Emotion,
    weights: RegionWeights,
    regions: RegionFn,
}

impl EmotionScorer {
    fn new<T>(
        emotion: Emotion,
        profile: &EmotionProfile<T>,
        region_fn: fn(&RegionFeatures, &T) -> RegionScores,
    ) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        let thresholds = profile.thresholds.clone();
        Self {
            emotion,
            weights: profile.weights,
            regions: Box::new(move |features| region_fn(features, &thresholds)),
        }
    }

    pub fn emotion(&self) -> Emotion {
        self.emotion
    }

    pub fn weights(&self) -> &RegionWeights {
        &self.weights
    }

    pub fn region_scores(&self, features: &RegionFeatures) -> RegionScores {
        (self.regions)(features)
    }

    /// Confidence (0-100) that the frame expresses this emotion
    pub fn score(&self, features: &RegionFeatures) -> f64 {
        self.region_scores(features).combine(&self.weights)
    }
}

impl std::fmt::Debug for EmotionScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmotionScorer")
            .field("emotion", &self.emotion)
            .field("weights", &self.weights)
            .finish()
    }
}

/// Runs every configured scorer against the same frame
#[derive(Debug)]
pub struct ScoreAggregator {
    scorers: Vec<EmotionScorer>,
}

impl Default for ScoreAggregator {
    fn default() -> Self {
        Self::build(&ScorerConfig::default())
    }
}

impl ScoreAggregator {
    /// Validate the configuration and build the scorer table
    pub fn from_config(config: &ScorerConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: &ScorerConfig) -> Self {
        let scorers = vec![
            EmotionScorer::new(Emotion::Angry, &config.angry, angry::region_scores),
            EmotionScorer::new(Emotion::Fear, &config.fear, fear::region_scores),
            EmotionScorer::new(Emotion::Sad, &config.sad, sad::region_scores),
            EmotionScorer::new(Emotion::Happy, &config.happy, happy::region_scores),
            EmotionScorer::new(Emotion::Surprise, &config.surprise, surprise::region_scores),
            EmotionScorer::new(Emotion::Disgust, &config.disgust, disgust::region_scores),
            EmotionScorer::new(Emotion::Anxiety, &config.anxiety, anxiety::region_scores),
        ];
        Self { scorers }
    }

    pub fn scorers(&self) -> &[EmotionScorer] {
        &self.scorers
    }

    /// Raw emotion scores for one frame
    pub fn aggregate(&self, features: &RegionFeatures) -> EmotionScores {
        self.scorers
            .iter()
            .map(|scorer| (scorer.emotion(), scorer.score(features)))
            .collect()
    }
}

/// Clamp into [0, 100]; NaN becomes 0
pub(crate) fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

/// Linear rise from 0 at `threshold` to 1 at `full`; 0 at or below `threshold`
pub(crate) fn rise(value: f64, threshold: f64, full: f64) -> f64 {
    if value <= threshold {
        return 0.0;
    }
    let span = full - threshold;
    if span <= 0.0 {
        return 1.0;
    }
    ((value - threshold) / span).min(1.0)
}

/// Linear rise from 0 at `threshold` to 1 at `full` as the value falls below `threshold`
pub(crate) fn fall(value: f64, threshold: f64, full: f64) -> f64 {
    if value >= threshold {
        return 0.0;
    }
    let span = threshold - full;
    if span <= 0.0 {
        return 1.0;
    }
    ((threshold - value) / span).min(1.0)
}

/// Reject non-finite thresholds
pub(crate) fn check_thresholds(emotion: Emotion, values: &[(&str, f64)]) -> Result<(), ComputeError> {
    for (name, value) in values {
        if !value.is_finite() {
            return Err(ComputeError::InvalidConfig(format!(
                "{emotion} threshold {name} must be finite, got {value}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Region;
    use proptest::prelude::*;

    fn neutral_face() -> RegionFeatures {
        RegionFeatures::new()
            .with(Region::Eyes, keys::OPENNESS, 0.5)
            .with(Region::Mouth, keys::NO_SMILE, 1.0)
    }

    #[test]
    fn test_aggregate_covers_every_emotion() {
        let scores = ScoreAggregator::default().aggregate(&neutral_face());
        assert_eq!(scores.len(), Emotion::ALL.len());
        for emotion in Emotion::ALL {
            assert!(scores.contains(emotion));
        }
    }

    #[test]
    fn test_empty_frame_does_not_fail() {
        let scores = ScoreAggregator::default().aggregate(&RegionFeatures::new());
        for (_, score) in scores.iter() {
            assert!((0.0..=100.0).contains(&score));
        }
    }

    #[test]
    fn test_combine_clamps_to_hundred() {
        let regions = RegionScores::new(100.0, 100.0, 100.0, 100.0);
        let weights = RegionWeights::new(0.8, 0.75, 0.0, 0.75);
        assert_eq!(regions.combine(&weights), 100.0);
    }

    #[test]
    fn test_region_scores_clamp_negative_inputs() {
        let regions = RegionScores::new(-20.0, 150.0, f64::NAN, 50.0);
        assert_eq!(regions, RegionScores::new(0.0, 100.0, 0.0, 50.0));
    }

    #[test]
    fn test_weights_validation_rejects_bad_vectors() {
        assert!(RegionWeights::new(0.2, 0.2, 0.2, 0.2).validate(Emotion::Sad).is_ok());
        assert!(RegionWeights::new(0.0, 0.0, 0.0, 0.0).validate(Emotion::Sad).is_err());
        assert!(RegionWeights::new(-0.1, 0.5, 0.5, 0.5).validate(Emotion::Sad).is_err());
        assert!(RegionWeights::new(f64::NAN, 0.5, 0.5, 0.5).validate(Emotion::Sad).is_err());
        assert!(RegionWeights::new(2.0, 2.0, 1.0, 0.0).validate(Emotion::Sad).is_err());
    }

    #[test]
    fn test_missing_region_weight_rejected_at_load() {
        let result: Result<ScorerConfig, _> = serde_json::from_str(
            r#"{"happy": {"weights": {"eyebrows": 0.1, "eyes": 0.3, "mouth": 0.6}}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_partial_config_keeps_other_defaults() {
        let config: ScorerConfig = serde_json::from_str(
            r#"{"happy": {"weights": {"eyebrows": 0.1, "eyes": 0.3, "nose": 0.0, "mouth": 0.6}}}"#,
        )
        .unwrap();
        assert_eq!(config.happy.weights.mouth, 0.6);
        assert_eq!(config.happy.thresholds, happy::HappyThresholds::default());
        assert_eq!(config.sad, sad::default_profile());
    }

    #[test]
    fn test_rise_and_fall() {
        assert_eq!(rise(0.5, 0.5, 1.0), 0.0);
        assert!((rise(0.75, 0.5, 1.0) - 0.5).abs() < 1e-9);
        assert_eq!(rise(2.0, 0.5, 1.0), 1.0);
        assert_eq!(fall(0.4, 0.4, 0.0), 0.0);
        assert!((fall(0.1, 0.4, 0.0) - 0.75).abs() < 1e-9);
    }

    fn arb_features() -> impl Strategy<Value = RegionFeatures> {
        let ratio = -0.5f64..1.5;
        (
            prop::array::uniform3(ratio.clone()),
            prop::array::uniform3(ratio.clone()),
            prop::array::uniform3(ratio.clone()),
            prop::array::uniform3(ratio.clone()),
            prop::array::uniform4(ratio),
        )
            .prop_map(|(brows, eyes, nose, mouth, extra)| {
                RegionFeatures::new()
                    .with(Region::Eyebrows, keys::TOGETHER, brows[0])
                    .with(Region::Eyebrows, keys::RIGHT_RAISED, brows[1])
                    .with(Region::Eyebrows, keys::LEFT_RAISED, brows[2])
                    .with(Region::Eyebrows, keys::LOWERED, extra[0])
                    .with(Region::Eyes, keys::OPENNESS, eyes[0])
                    .with(Region::Eyes, keys::TENSION, eyes[1])
                    .with(Region::Eyes, keys::TIGHTNESS, eyes[2])
                    .with(Region::Nose, keys::FLARED, nose[0])
                    .with(Region::Nose, keys::WRINKLE, nose[1])
                    .with(Region::Nose, keys::FLARE, nose[2])
                    .with(Region::Mouth, keys::TENSION, mouth[0])
                    .with(Region::Mouth, keys::NO_SMILE, mouth[1])
                    .with(Region::Mouth, keys::OPENNESS, mouth[2])
                    .with(Region::Mouth, keys::PRESS, extra[1])
                    .with(Region::Mouth, keys::TIGHTEN, extra[2])
                    .with(Region::Mouth, keys::CHIN_RAISE, extra[3])
            })
    }

    proptest! {
        #[test]
        fn prop_every_scorer_stays_in_range(features in arb_features()) {
            let aggregator = ScoreAggregator::default();
            for scorer in aggregator.scorers() {
                let regions = scorer.region_scores(&features);
                for sub in [regions.eyebrows, regions.eyes, regions.nose, regions.mouth] {
                    prop_assert!((0.0..=100.0).contains(&sub));
                }
                let score = scorer.score(&features);
                prop_assert!((0.0..=100.0).contains(&score), "{:?} scored {}", scorer.emotion(), score);
            }
        }
    }
}
