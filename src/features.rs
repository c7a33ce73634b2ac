//! Feature extraction
//!
//! This module turns raw landmark distances into the per-region ratios the
//! scorers consume:
//! - Distances are divided by the face width so ratios are scale-invariant
//! - Each ratio is mapped onto [0, 1] through a fixed ramp
//!
//! Callers whose landmark module already emits normalized ratios can skip this
//! stage and build [`RegionFeatures`] directly.

use crate::scorers::{keys, rise};
use crate::types::{Region, RegionFeatures};
use serde::{Deserialize, Serialize};

/// Reference face width used when none (or a non-positive one) is supplied
pub const DEFAULT_FACE_WIDTH: f64 = 100.0;

/// Nostril width used when the landmark module does not measure it
pub const DEFAULT_NOSE_WIDTH: f64 = 50.0;

/// Raw eyebrow distances
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEyebrows {
    pub eye_right_distance: f64,
    pub forehead_right_distance: f64,
    pub eye_left_distance: f64,
    pub forehead_left_distance: f64,
    /// Gap between the inner brow ends
    pub eyebrows_distance: f64,
}

/// Raw eyelid distances and brow arches
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEyes {
    pub right_upper_eyelid_distance: f64,
    pub right_lower_eyelid_distance: f64,
    pub left_upper_eyelid_distance: f64,
    pub left_lower_eyelid_distance: f64,
    pub arch_right: f64,
    pub arch_left: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawNose {
    pub mouth_upper_distance: f64,
    pub nose_lower_distance: f64,
    pub nose_width: f64,
}

impl Default for RawNose {
    fn default() -> Self {
        Self {
            mouth_upper_distance: 0.0,
            nose_lower_distance: 0.0,
            nose_width: DEFAULT_NOSE_WIDTH,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMouth {
    pub mouth_upper_distance: f64,
    pub mouth_lower_distance: f64,
    pub right_smile_distance: f64,
    pub right_lip_distance: f64,
    pub left_smile_distance: f64,
    pub left_lip_distance: f64,
}

/// Raw landmark distances for one frame, all in the same pixel unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawFaceGeometry {
    pub face_width: f64,
    pub eyebrows: RawEyebrows,
    pub eyes: RawEyes,
    pub nose: RawNose,
    pub mouth: RawMouth,
}

impl Default for RawFaceGeometry {
    fn default() -> Self {
        Self {
            face_width: DEFAULT_FACE_WIDTH,
            eyebrows: RawEyebrows::default(),
            eyes: RawEyes::default(),
            nose: RawNose::default(),
            mouth: RawMouth::default(),
        }
    }
}

/// Extractor for region ratios
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Extract per-region ratios from raw distances
    pub fn extract(geometry: &RawFaceGeometry) -> RegionFeatures {
        let width = if geometry.face_width.is_finite() && geometry.face_width > 0.0 {
            geometry.face_width
        } else {
            DEFAULT_FACE_WIDTH
        };

        let mut features = RegionFeatures::new();
        extract_eyebrows(&geometry.eyebrows, width, &mut features);
        extract_eyes(&geometry.eyes, width, &mut features);
        extract_nose(&geometry.nose, width, &mut features);
        extract_mouth(&geometry.mouth, width, &mut features);
        features
    }
}

fn extract_eyebrows(raw: &RawEyebrows, width: f64, out: &mut RegionFeatures) {
    let gap = raw.eyebrows_distance / width;
    let together = if gap < 0.2 { (1.0 - gap / 0.2).max(0.0) } else { 0.0 };

    let raised = |eye: f64, forehead: f64| {
        let (eye, forehead) = (eye / width, forehead / width);
        if eye > forehead {
            ((eye - forehead) / 0.1).min(1.0)
        } else {
            0.0
        }
    };

    out.set(Region::Eyebrows, keys::TOGETHER, together);
    out.set(
        Region::Eyebrows,
        keys::RIGHT_RAISED,
        raised(raw.eye_right_distance, raw.forehead_right_distance),
    );
    out.set(
        Region::Eyebrows,
        keys::LEFT_RAISED,
        raised(raw.eye_left_distance, raw.forehead_left_distance),
    );
}

fn extract_eyes(raw: &RawEyes, width: f64, out: &mut RegionFeatures) {
    // EAR-like average of the four lid distances
    let lids = (raw.right_upper_eyelid_distance
        + raw.right_lower_eyelid_distance
        + raw.left_upper_eyelid_distance
        + raw.left_lower_eyelid_distance)
        / width
        / 4.0;
    let openness = rise(lids, 0.15, 0.3);

    let asymmetry = (raw.arch_right - raw.arch_left).abs() / raw.arch_right.abs().max(raw.arch_left.abs()).max(1e-6);
    let tension = if asymmetry > 0.05 { (asymmetry / 0.1).min(1.0) } else { 0.0 };

    out.set(Region::Eyes, keys::OPENNESS, openness);
    out.set(Region::Eyes, keys::TENSION, tension);
}

fn extract_nose(raw: &RawNose, width: f64, out: &mut RegionFeatures) {
    let nostrils = rise(raw.nose_width / width, 0.15, 0.25);
    // upper lip pulled above the nose base reads as a wrinkle
    let wrinkled = if raw.mouth_upper_distance > raw.nose_lower_distance { 1.0 } else { 0.0 };

    out.set(Region::Nose, keys::FLARED, nostrils.max(wrinkled));
}

fn extract_mouth(raw: &RawMouth, width: f64, out: &mut RegionFeatures) {
    let open = (raw.mouth_upper_distance + raw.mouth_lower_distance) / width / 2.0;
    let tension = if open > 0.01 && open < 0.1 { 1.0 - open / 0.1 } else { 0.0 };

    let side = |lip: f64, smile: f64| if lip <= smile { 1.0 } else { 0.0 };
    let no_smile = (side(raw.right_lip_distance, raw.right_smile_distance)
        + side(raw.left_lip_distance, raw.left_smile_distance))
        / 2.0;

    out.set(Region::Mouth, keys::TENSION, tension);
    out.set(Region::Mouth, keys::NO_SMILE, no_smile);
    out.set(Region::Mouth, keys::OPENNESS, (open / 0.1).clamp(0.0, 1.0));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_geometry() -> RawFaceGeometry {
        RawFaceGeometry {
            face_width: 200.0,
            eyebrows: RawEyebrows {
                eye_right_distance: 30.0,
                forehead_right_distance: 20.0,
                eye_left_distance: 20.0,
                forehead_left_distance: 40.0,
                eyebrows_distance: 20.0,
            },
            eyes: RawEyes {
                right_upper_eyelid_distance: 45.0,
                right_lower_eyelid_distance: 45.0,
                left_upper_eyelid_distance: 45.0,
                left_lower_eyelid_distance: 45.0,
                arch_right: 10.0,
                arch_left: 10.0,
            },
            nose: RawNose {
                mouth_upper_distance: 5.0,
                nose_lower_distance: 10.0,
                nose_width: 40.0,
            },
            mouth: RawMouth {
                mouth_upper_distance: 6.0,
                mouth_lower_distance: 6.0,
                right_smile_distance: 10.0,
                right_lip_distance: 12.0,
                left_smile_distance: 10.0,
                left_lip_distance: 8.0,
            },
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_eyebrow_ratios() {
        let features = FeatureExtractor::extract(&make_geometry());
        // gap 0.1 -> together 0.5; right raised (0.15 - 0.1) / 0.1 = 0.5
        assert!(approx(features.get(Region::Eyebrows, keys::TOGETHER), 0.5));
        assert!(approx(features.get(Region::Eyebrows, keys::RIGHT_RAISED), 0.5));
        assert_eq!(features.get(Region::Eyebrows, keys::LEFT_RAISED), 0.0);
    }

    #[test]
    fn test_eye_ratios() {
        let features = FeatureExtractor::extract(&make_geometry());
        // mean lid ratio 0.225 sits halfway between 0.15 and 0.3
        assert!(approx(features.get(Region::Eyes, keys::OPENNESS), 0.5));
        assert_eq!(features.get(Region::Eyes, keys::TENSION), 0.0);
    }

    #[test]
    fn test_nose_and_mouth_ratios() {
        let features = FeatureExtractor::extract(&make_geometry());
        // nostril ratio 0.2 -> 0.5, no wrinkle
        assert!(approx(features.get(Region::Nose, keys::FLARED), 0.5));
        // open 0.03 -> tension 0.7, openness 0.3; only the left corner is lifted
        assert!(approx(features.get(Region::Mouth, keys::TENSION), 0.7));
        assert!(approx(features.get(Region::Mouth, keys::OPENNESS), 0.3));
        assert_eq!(features.get(Region::Mouth, keys::NO_SMILE), 0.5);
    }

    #[test]
    fn test_wrinkle_forces_flare() {
        let mut geometry = make_geometry();
        geometry.nose.mouth_upper_distance = 12.0;
        let features = FeatureExtractor::extract(&geometry);
        assert_eq!(features.get(Region::Nose, keys::FLARED), 1.0);
    }

    #[test]
    fn test_arch_asymmetry_is_tension() {
        let mut geometry = make_geometry();
        geometry.eyes.arch_left = 9.2;
        let features = FeatureExtractor::extract(&geometry);
        assert!(approx(features.get(Region::Eyes, keys::TENSION), 0.8));
    }

    #[test]
    fn test_non_positive_face_width_uses_default() {
        let geometry = RawFaceGeometry {
            face_width: 0.0,
            ..RawFaceGeometry::default()
        };
        let features = FeatureExtractor::extract(&geometry);
        // default nose width 50 over width 100 saturates the nostril ramp
        assert_eq!(features.get(Region::Nose, keys::FLARED), 1.0);
        assert_eq!(features.get(Region::Eyes, keys::OPENNESS), 0.0);
    }

    #[test]
    fn test_partial_json_geometry() {
        let geometry: RawFaceGeometry = serde_json::from_str(r#"{"mouth": {"mouth_upper_distance": 3.0}}"#).unwrap();
        assert_eq!(geometry.face_width, DEFAULT_FACE_WIDTH);
        assert_eq!(geometry.nose.nose_width, DEFAULT_NOSE_WIDTH);
        assert_eq!(geometry.mouth.mouth_upper_distance, 3.0);
    }
}
