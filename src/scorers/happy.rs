//! Happiness scorer
//!
//! Mouth-driven (smile amount and relaxed lips), with a bell-shaped eye curve
//! around a moderate openness and a bonus for relaxed, unfurrowed brows.

use super::{check_thresholds, keys, EmotionProfile, RegionScores, RegionWeights};
use crate::error::ComputeError;
use crate::types::{Emotion, Region, RegionFeatures};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WEIGHTS: RegionWeights = RegionWeights::new(0.08, 0.27, 0.05, 0.60);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HappyThresholds {
    /// Brows closer together than this earn the relaxed-brow bonus
    pub brow_together_max: f64,
    /// Both brows below this raise earn the unraised bonus
    pub brow_raised_max: f64,
    /// Eye openness at which the eye score peaks
    pub eye_optimum: f64,
    /// Distance from the optimum at which the bell reaches zero
    pub eye_tolerance: f64,
    pub eye_exponent: f64,
    /// Openness band that receives the boost factor
    pub eye_boost_low: f64,
    pub eye_boost_high: f64,
    pub eye_boost: f64,
    /// Nearly closed eyes just below the bell (laughing squint)
    pub eye_squint_min: f64,
    pub eye_squint_score: f64,
    /// Wide eyes just above the bell
    pub eye_wide_max: f64,
    pub eye_wide_score: f64,
    /// Nostril flare above which the nose contributes nothing
    pub nose_flare_max: f64,
    /// Mouth tension below which relaxed lips score
    pub mouth_relaxed_max: f64,
    /// Mouth tension below which the extra relaxed bonus applies
    pub mouth_very_relaxed_max: f64,
    /// Smile amount (1 - no_smile) needed before the smile curve starts
    pub smile_min: f64,
    pub smile_exponent: f64,
    /// Each smile level crossed adds a fixed bonus
    pub smile_bonus_levels: [f64; 3],
}

impl Default for HappyThresholds {
    fn default() -> Self {
        Self {
            brow_together_max: 0.3,
            brow_raised_max: 0.4,
            eye_optimum: 0.5,
            eye_tolerance: 0.35,
            eye_exponent: 0.5,
            eye_boost_low: 0.3,
            eye_boost_high: 0.7,
            eye_boost: 1.2,
            eye_squint_min: 0.1,
            eye_squint_score: 40.0,
            eye_wide_max: 0.95,
            eye_wide_score: 50.0,
            nose_flare_max: 0.2,
            mouth_relaxed_max: 0.7,
            mouth_very_relaxed_max: 0.4,
            smile_min: 0.2,
            smile_exponent: 0.7,
            smile_bonus_levels: [0.4, 0.6, 0.8],
        }
    }
}

impl HappyThresholds {
    pub(crate) fn validate(&self) -> Result<(), ComputeError> {
        check_thresholds(
            Emotion::Happy,
            &[
                ("brow_together_max", self.brow_together_max),
                ("brow_raised_max", self.brow_raised_max),
                ("eye_optimum", self.eye_optimum),
                ("eye_tolerance", self.eye_tolerance),
                ("eye_exponent", self.eye_exponent),
                ("eye_boost_low", self.eye_boost_low),
                ("eye_boost_high", self.eye_boost_high),
                ("eye_boost", self.eye_boost),
                ("eye_squint_min", self.eye_squint_min),
                ("eye_squint_score", self.eye_squint_score),
                ("eye_wide_max", self.eye_wide_max),
                ("eye_wide_score", self.eye_wide_score),
                ("nose_flare_max", self.nose_flare_max),
                ("mouth_relaxed_max", self.mouth_relaxed_max),
                ("mouth_very_relaxed_max", self.mouth_very_relaxed_max),
                ("smile_min", self.smile_min),
                ("smile_exponent", self.smile_exponent),
                ("smile_bonus_levels[0]", self.smile_bonus_levels[0]),
                ("smile_bonus_levels[1]", self.smile_bonus_levels[1]),
                ("smile_bonus_levels[2]", self.smile_bonus_levels[2]),
            ],
        )?;
        if self.eye_tolerance <= 0.0 || self.nose_flare_max <= 0.0 {
            return Err(ComputeError::InvalidConfig(
                "happy eye_tolerance and nose_flare_max must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn default_profile() -> EmotionProfile<HappyThresholds> {
    EmotionProfile {
        weights: DEFAULT_WEIGHTS,
        thresholds: HappyThresholds::default(),
    }
}

pub fn region_scores(f: &RegionFeatures, t: &HappyThresholds) -> RegionScores {
    RegionScores::new(eyebrows(f, t), eyes(f, t), nose(f, t), mouth(f, t))
}

fn eyebrows(f: &RegionFeatures, t: &HappyThresholds) -> f64 {
    let together = f.get(Region::Eyebrows, keys::TOGETHER);
    let right = f.get(Region::Eyebrows, keys::RIGHT_RAISED);
    let left = f.get(Region::Eyebrows, keys::LEFT_RAISED);

    let mut score = 0.0;
    if together < t.brow_together_max {
        score += 60.0 * (1.0 - together);
    }
    if right < t.brow_raised_max && left < t.brow_raised_max {
        score += 20.0 * (1.0 - right) + 20.0 * (1.0 - left);
    }
    score.min(100.0)
}

fn eyes(f: &RegionFeatures, t: &HappyThresholds) -> f64 {
    let openness = f.get(Region::Eyes, keys::OPENNESS);
    let distance = (openness - t.eye_optimum).abs();

    if distance <= t.eye_tolerance {
        let mut score = 100.0 * (1.0 - (distance / t.eye_tolerance).powf(t.eye_exponent));
        if (t.eye_boost_low..=t.eye_boost_high).contains(&openness) {
            score = (score * t.eye_boost).min(100.0);
        }
        score
    } else if openness >= t.eye_squint_min && openness < t.eye_optimum {
        t.eye_squint_score
    } else if openness > t.eye_optimum && openness <= t.eye_wide_max {
        t.eye_wide_score
    } else {
        0.0
    }
}

fn nose(f: &RegionFeatures, t: &HappyThresholds) -> f64 {
    let flared = f.get(Region::Nose, keys::FLARED);
    if flared < t.nose_flare_max {
        100.0 * (1.0 - flared / t.nose_flare_max)
    } else {
        0.0
    }
}

fn mouth(f: &RegionFeatures, t: &HappyThresholds) -> f64 {
    let tension = f.get(Region::Mouth, keys::TENSION);
    let smile = 1.0 - f.get(Region::Mouth, keys::NO_SMILE);

    let mut score = 0.0;
    if tension < t.mouth_relaxed_max {
        score += 40.0 * (1.0 - tension);
        if tension < t.mouth_very_relaxed_max {
            score += 10.0;
        }
    }
    if smile > t.smile_min {
        score += 70.0 * smile.powf(t.smile_exponent);
        score += t
            .smile_bonus_levels
            .iter()
            .filter(|level| smile > **level)
            .count() as f64
            * 10.0;
    }
    score.min(100.0)
}
