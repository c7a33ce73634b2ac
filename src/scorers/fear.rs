//! Fear scorer

use super::{check_thresholds, keys, rise, EmotionProfile, RegionScores, RegionWeights};
use crate::error::ComputeError;
use crate::types::{Emotion, Region, RegionFeatures};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WEIGHTS: RegionWeights = RegionWeights::new(0.25, 0.25, 0.10, 0.40);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FearThresholds {
    /// Eye openness above which wide eyes start to score
    pub wide_openness_min: f64,
    pub neutral_flare_max: f64,
}

impl Default for FearThresholds {
    fn default() -> Self {
        Self {
            wide_openness_min: 0.6,
            neutral_flare_max: 0.1,
        }
    }
}

impl FearThresholds {
    pub(crate) fn validate(&self) -> Result<(), ComputeError> {
        check_thresholds(
            Emotion::Fear,
            &[
                ("wide_openness_min", self.wide_openness_min),
                ("neutral_flare_max", self.neutral_flare_max),
            ],
        )
    }
}

pub fn default_profile() -> EmotionProfile<FearThresholds> {
    EmotionProfile {
        weights: DEFAULT_WEIGHTS,
        thresholds: FearThresholds::default(),
    }
}

pub fn region_scores(f: &RegionFeatures, t: &FearThresholds) -> RegionScores {
    let eyebrows = 20.0 * f.get(Region::Eyebrows, keys::TOGETHER)
        + 40.0 * f.get(Region::Eyebrows, keys::RIGHT_RAISED)
        + 40.0 * f.get(Region::Eyebrows, keys::LEFT_RAISED);

    let openness = f.get(Region::Eyes, keys::OPENNESS);
    let mut eyes = 30.0 * f.get(Region::Eyes, keys::TENSION);
    if openness > t.wide_openness_min {
        eyes += 70.0 + 30.0 * rise(openness, t.wide_openness_min, 1.0);
    }

    let flared = f.get(Region::Nose, keys::FLARED);
    let nose = if flared < t.neutral_flare_max {
        100.0 * (1.0 - flared)
    } else {
        0.0
    };

    let mouth = 50.0 * (1.0 - f.get(Region::Mouth, keys::TENSION))
        + 50.0 * f.get(Region::Mouth, keys::NO_SMILE);

    RegionScores::new(eyebrows, eyes, nose, mouth)
}
