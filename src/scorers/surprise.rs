//! Surprise scorer
//!
//! Raised brows, open eyes and an open mouth. The nose carries no weight.

use super::{check_thresholds, keys, EmotionProfile, RegionScores, RegionWeights};
use crate::error::ComputeError;
use crate::types::{Emotion, Region, RegionFeatures};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WEIGHTS: RegionWeights = RegionWeights::new(0.80, 0.75, 0.00, 0.75);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurpriseThresholds {
    /// Eye openness below which the eyes contribute nothing
    pub eye_openness_min: f64,
    /// Mouth openness below which the mouth contributes nothing
    pub mouth_openness_min: f64,
}

impl Default for SurpriseThresholds {
    fn default() -> Self {
        Self {
            eye_openness_min: 0.3,
            mouth_openness_min: 0.2,
        }
    }
}

impl SurpriseThresholds {
    pub(crate) fn validate(&self) -> Result<(), ComputeError> {
        check_thresholds(
            Emotion::Surprise,
            &[
                ("eye_openness_min", self.eye_openness_min),
                ("mouth_openness_min", self.mouth_openness_min),
            ],
        )
    }
}

pub fn default_profile() -> EmotionProfile<SurpriseThresholds> {
    EmotionProfile {
        weights: DEFAULT_WEIGHTS,
        thresholds: SurpriseThresholds::default(),
    }
}

pub fn region_scores(f: &RegionFeatures, t: &SurpriseThresholds) -> RegionScores {
    let raised = (f.get(Region::Eyebrows, keys::LEFT_RAISED) + f.get(Region::Eyebrows, keys::RIGHT_RAISED)) / 2.0;

    let eye_openness = f.get(Region::Eyes, keys::OPENNESS);
    let eyes = if eye_openness < t.eye_openness_min {
        0.0
    } else {
        eye_openness * 100.0
    };

    let mouth_openness = f.get(Region::Mouth, keys::OPENNESS);
    let mouth = if mouth_openness < t.mouth_openness_min {
        0.0
    } else {
        mouth_openness * 100.0
    };

    RegionScores::new(raised * 100.0, eyes, 0.0, mouth)
}
