//! Anger scorer
//!
//! Uses its own measurement vocabulary (lowered brows, lid tightness, nose
//! wrinkle, lip press). Feeds that do not provide those keys still score
//! through brow knitting and narrowed eyes.

use super::{check_thresholds, fall, keys, EmotionProfile, RegionScores, RegionWeights};
use crate::error::ComputeError;
use crate::types::{Emotion, Region, RegionFeatures};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WEIGHTS: RegionWeights = RegionWeights::new(0.70, 0.85, 0.65, 0.25);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AngryThresholds {
    /// Eye openness below which narrowed eyes add to the eye score
    pub narrow_openness_max: f64,
}

impl Default for AngryThresholds {
    fn default() -> Self {
        Self {
            narrow_openness_max: 0.45,
        }
    }
}

impl AngryThresholds {
    pub(crate) fn validate(&self) -> Result<(), ComputeError> {
        check_thresholds(Emotion::Angry, &[("narrow_openness_max", self.narrow_openness_max)])
    }
}

pub fn default_profile() -> EmotionProfile<AngryThresholds> {
    EmotionProfile {
        weights: DEFAULT_WEIGHTS,
        thresholds: AngryThresholds::default(),
    }
}

pub fn region_scores(f: &RegionFeatures, t: &AngryThresholds) -> RegionScores {
    let eyebrows = (0.65 * f.get(Region::Eyebrows, keys::LOWERED)
        + 0.35 * f.get(Region::Eyebrows, keys::TOGETHER))
        * 100.0;

    let eyes = 70.0 * f.get(Region::Eyes, keys::TIGHTNESS)
        + 30.0 * fall(f.get(Region::Eyes, keys::OPENNESS), t.narrow_openness_max, 0.0);

    let nose = 80.0 * f.get(Region::Nose, keys::WRINKLE) + 20.0 * f.get(Region::Nose, keys::FLARE);

    let mouth = (0.5 * f.get(Region::Mouth, keys::PRESS)
        + 0.35 * f.get(Region::Mouth, keys::TIGHTEN)
        + 0.15 * f.get(Region::Mouth, keys::CHIN_RAISE))
        * 100.0;

    RegionScores::new(eyebrows, eyes, nose, mouth)
}
