//! Disgust scorer
//!
//! Strict: every region only scores past a high threshold, and the nose
//! (flared nostrils) carries the largest weight.

use super::{check_thresholds, fall, keys, rise, EmotionProfile, RegionScores, RegionWeights};
use crate::error::ComputeError;
use crate::types::{Emotion, Region, RegionFeatures};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WEIGHTS: RegionWeights = RegionWeights::new(0.05, 0.20, 0.40, 0.10);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisgustThresholds {
    pub brow_together_min: f64,
    /// Both brows must stay below this raise for the lowered-brow term
    pub brow_raised_max: f64,
    pub squint_openness_max: f64,
    pub eye_tension_min: f64,
    pub flare_min: f64,
    pub flare_exponent: f64,
    pub mouth_tension_min: f64,
    pub no_smile_min: f64,
}

impl Default for DisgustThresholds {
    fn default() -> Self {
        Self {
            brow_together_min: 0.7,
            brow_raised_max: 0.2,
            squint_openness_max: 0.15,
            eye_tension_min: 0.7,
            flare_min: 0.5,
            flare_exponent: 0.7,
            mouth_tension_min: 0.8,
            no_smile_min: 0.9,
        }
    }
}

impl DisgustThresholds {
    pub(crate) fn validate(&self) -> Result<(), ComputeError> {
        check_thresholds(
            Emotion::Disgust,
            &[
                ("brow_together_min", self.brow_together_min),
                ("brow_raised_max", self.brow_raised_max),
                ("squint_openness_max", self.squint_openness_max),
                ("eye_tension_min", self.eye_tension_min),
                ("flare_min", self.flare_min),
                ("flare_exponent", self.flare_exponent),
                ("mouth_tension_min", self.mouth_tension_min),
                ("no_smile_min", self.no_smile_min),
            ],
        )
    }
}

pub fn default_profile() -> EmotionProfile<DisgustThresholds> {
    EmotionProfile {
        weights: DEFAULT_WEIGHTS,
        thresholds: DisgustThresholds::default(),
    }
}

pub fn region_scores(f: &RegionFeatures, t: &DisgustThresholds) -> RegionScores {
    let together = f.get(Region::Eyebrows, keys::TOGETHER);
    let right = f.get(Region::Eyebrows, keys::RIGHT_RAISED);
    let left = f.get(Region::Eyebrows, keys::LEFT_RAISED);
    let mut eyebrows = 50.0 * rise(together, t.brow_together_min, 1.0);
    if right < t.brow_raised_max && left < t.brow_raised_max {
        eyebrows += 25.0 * (1.0 - right) + 25.0 * (1.0 - left);
    }

    let eyes = 60.0 * fall(f.get(Region::Eyes, keys::OPENNESS), t.squint_openness_max, 0.0)
        + 40.0 * rise(f.get(Region::Eyes, keys::TENSION), t.eye_tension_min, 1.0);

    let nose = 100.0 * rise(f.get(Region::Nose, keys::FLARED), t.flare_min, 1.0).powf(t.flare_exponent);

    let mouth = 60.0 * rise(f.get(Region::Mouth, keys::TENSION), t.mouth_tension_min, 1.0)
        + 40.0 * rise(f.get(Region::Mouth, keys::NO_SMILE), t.no_smile_min, 1.0);

    RegionScores::new(eyebrows, eyes, nose, mouth)
}
