//! Sadness scorer

use super::{check_thresholds, fall, keys, EmotionProfile, RegionScores, RegionWeights};
use crate::error::ComputeError;
use crate::types::{Emotion, Region, RegionFeatures};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WEIGHTS: RegionWeights = RegionWeights::new(0.30, 0.30, 0.10, 0.30);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SadThresholds {
    /// Eye openness below which drooping lids start to score
    pub droop_openness_max: f64,
    /// Nostril flare below which the nose reads as neutral
    pub neutral_flare_max: f64,
}

impl Default for SadThresholds {
    fn default() -> Self {
        Self {
            droop_openness_max: 0.4,
            neutral_flare_max: 0.1,
        }
    }
}

impl SadThresholds {
    pub(crate) fn validate(&self) -> Result<(), ComputeError> {
        check_thresholds(
            Emotion::Sad,
            &[
                ("droop_openness_max", self.droop_openness_max),
                ("neutral_flare_max", self.neutral_flare_max),
            ],
        )
    }
}

pub fn default_profile() -> EmotionProfile<SadThresholds> {
    EmotionProfile {
        weights: DEFAULT_WEIGHTS,
        thresholds: SadThresholds::default(),
    }
}

pub fn region_scores(f: &RegionFeatures, t: &SadThresholds) -> RegionScores {
    let together = f.get(Region::Eyebrows, keys::TOGETHER);
    let right = f.get(Region::Eyebrows, keys::RIGHT_RAISED);
    let left = f.get(Region::Eyebrows, keys::LEFT_RAISED);
    let eyebrows = 60.0 * together + 20.0 * (1.0 - right) + 20.0 * (1.0 - left);

    let openness = f.get(Region::Eyes, keys::OPENNESS);
    let eyes = 100.0 * fall(openness, t.droop_openness_max, 0.0);

    let flared = f.get(Region::Nose, keys::FLARED);
    let nose = if flared < t.neutral_flare_max {
        100.0 * (1.0 - flared)
    } else {
        0.0
    };

    let mouth = 30.0 * f.get(Region::Mouth, keys::TENSION) + 70.0 * f.get(Region::Mouth, keys::NO_SMILE);

    RegionScores::new(eyebrows, eyes, nose, mouth)
}
