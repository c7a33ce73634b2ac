//! Anxiety scorer
//!
//! Reads tension across the face: knitted and raised brows, wide eyes, flared
//! nostrils and a tight unsmiling mouth.

use super::{check_thresholds, keys, rise, EmotionProfile, RegionScores, RegionWeights};
use crate::error::ComputeError;
use crate::types::{Emotion, Region, RegionFeatures};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WEIGHTS: RegionWeights = RegionWeights::new(0.35, 0.35, 0.10, 0.20);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnxietyThresholds {
    pub wide_openness_min: f64,
    /// Nostril flare above which the nose starts to score
    pub flare_min: f64,
    /// Flare at which the nose score saturates
    pub flare_full: f64,
}

impl Default for AnxietyThresholds {
    fn default() -> Self {
        Self {
            wide_openness_min: 0.6,
            flare_min: 0.1,
            flare_full: 0.3,
        }
    }
}

impl AnxietyThresholds {
    pub(crate) fn validate(&self) -> Result<(), ComputeError> {
        check_thresholds(
            Emotion::Anxiety,
            &[
                ("wide_openness_min", self.wide_openness_min),
                ("flare_min", self.flare_min),
                ("flare_full", self.flare_full),
            ],
        )?;
        if self.flare_full <= 0.0 {
            return Err(ComputeError::InvalidConfig(
                "anxiety flare_full must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn default_profile() -> EmotionProfile<AnxietyThresholds> {
    EmotionProfile {
        weights: DEFAULT_WEIGHTS,
        thresholds: AnxietyThresholds::default(),
    }
}

pub fn region_scores(f: &RegionFeatures, t: &AnxietyThresholds) -> RegionScores {
    let eyebrows = 50.0 * f.get(Region::Eyebrows, keys::TOGETHER)
        + 25.0 * f.get(Region::Eyebrows, keys::RIGHT_RAISED)
        + 25.0 * f.get(Region::Eyebrows, keys::LEFT_RAISED);

    let openness = f.get(Region::Eyes, keys::OPENNESS);
    let eyes = if openness > t.wide_openness_min {
        70.0 + 30.0 * rise(openness, t.wide_openness_min, 1.0)
    } else {
        0.0
    };

    let flared = f.get(Region::Nose, keys::FLARED);
    let nose = if flared > t.flare_min {
        100.0 * (flared / t.flare_full).min(1.0)
    } else {
        0.0
    };

    let mouth = 50.0 * f.get(Region::Mouth, keys::TENSION) + 50.0 * f.get(Region::Mouth, keys::NO_SMILE);

    RegionScores::new(eyebrows, eyes, nose, mouth)
}
