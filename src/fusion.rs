//! Multimodal fusion
//!
//! Combines a text-modality label distribution with the face-modality scores
//! into one weighted distribution and flags when the two modalities disagree
//! on their primary emotion.

use crate::config::FusionConfig;
use crate::types::{EmotionScores, LabelScores};
use serde::{Deserialize, Serialize};

/// Primary label used when the fused distribution is empty
pub const NEUTRAL_LABEL: &str = "neutral";

/// Primary label of an empty modality
pub const NONE_LABEL: &str = "none";

/// Modality weights applied to a fusion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub text: f64,
    pub face: f64,
}

/// Outcome of one fusion call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionResult {
    pub fused_emotions: LabelScores,
    pub primary_emotion: String,
    pub confidence: f64,
    pub text_primary: String,
    pub face_primary: String,
    pub has_conflict: bool,
    /// Text distribution after lexical mapping
    pub text_emotions: LabelScores,
    pub face_emotions: LabelScores,
    pub weights: FusionWeights,
}

/// Weighted text and face fusion
#[derive(Debug, Clone, Default)]
pub struct FusionEngine {
    config: FusionConfig,
}

impl FusionEngine {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn weights(&self) -> FusionWeights {
        FusionWeights {
            text: self.config.text_weight,
            face: self.config.face_weight,
        }
    }

    /// Map a text label onto the canonical vocabulary; unknown labels pass
    /// through lowercased and trimmed
    pub fn normalize_label(&self, label: &str) -> String {
        let label = label.trim().to_lowercase();
        match self.config.lexicon.get(&label) {
            Some(mapped) => mapped.clone(),
            None => label,
        }
    }

    /// Fuse a text distribution with a face distribution (both on a 0-100 scale).
    ///
    /// Fused labels keep text labels first in input order, then face-only
    /// labels; the primary emotion is the first label holding the maximum.
    /// Two text labels mapping to the same emotion keep the later value.
    pub fn fuse(&self, text: &LabelScores, face: &LabelScores) -> FusionResult {
        let text_emotions: LabelScores = text
            .iter()
            .map(|(label, value)| (self.normalize_label(label), value))
            .collect();
        let face_emotions = face.clone();

        let FusionWeights { text: tw, face: fw } = self.weights();
        let fused_emotions: LabelScores = text_emotions
            .labels()
            .chain(face_emotions.labels().filter(|l| text_emotions.get(l).is_none()))
            .map(|label| {
                let t = text_emotions.get(label).unwrap_or(0.0);
                let f = face_emotions.get(label).unwrap_or(0.0);
                (label.to_string(), tw * t + fw * f)
            })
            .collect();

        let (primary_emotion, confidence) = fused_emotions
            .argmax()
            .map(|(label, value)| (label.to_string(), value))
            .unwrap_or_else(|| (NEUTRAL_LABEL.to_string(), 0.0));

        let primary_of = |scores: &LabelScores| {
            scores
                .argmax()
                .map(|(label, _)| label.to_string())
                .unwrap_or_else(|| NONE_LABEL.to_string())
        };
        let text_primary = primary_of(&text_emotions);
        let face_primary = primary_of(&face_emotions);
        let has_conflict = text_primary != face_primary;

        tracing::debug!(
            primary = %primary_emotion,
            confidence,
            text_primary = %text_primary,
            face_primary = %face_primary,
            has_conflict,
            "fused text and face emotions"
        );

        FusionResult {
            fused_emotions,
            primary_emotion,
            confidence: crate::types::round_to(confidence, 4),
            text_primary,
            face_primary,
            has_conflict,
            text_emotions,
            face_emotions,
            weights: self.weights(),
        }
    }

    /// Fuse against a face frame from the scoring pipeline
    pub fn fuse_with_face(&self, text: &LabelScores, face: &EmotionScores) -> FusionResult {
        self.fuse(text, &LabelScores::from(face))
    }
}

/// Rescale a 0-1 probability distribution onto the 0-100 scale fusion expects
pub fn rescale_probabilities(probabilities: &LabelScores) -> LabelScores {
    probabilities.iter().map(|(label, p)| (label, p * 100.0)).collect()
}
