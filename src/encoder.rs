//! Dialogue payload encoding
//!
//! This module encodes fusion results into the fixed JSON payload consumed by
//! the dialogue agent. Field names inside `emotional_analysis` are part of the
//! agent's contract and stay in its language.

use crate::error::ComputeError;
use crate::fusion::FusionResult;
use crate::types::{round_to, LabelScores};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix of generated session identifiers
pub const SESSION_PREFIX: &str = "facesense";

/// Payload handed to the dialogue agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialoguePayload {
    pub session_id: String,
    pub user_message: String,
    pub emotional_analysis: EmotionalAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalAnalysis {
    #[serde(rename = "emocion_principal")]
    pub primary_emotion: String,
    #[serde(rename = "confianza_principal")]
    pub primary_confidence: f64,
    #[serde(rename = "emociones_texto")]
    pub text_emotions: LabelScores,
    #[serde(rename = "emociones_rostro")]
    pub face_emotions: LabelScores,
    #[serde(rename = "emocion_texto_dominante")]
    pub text_dominant: String,
    #[serde(rename = "emocion_rostro_dominante")]
    pub face_dominant: String,
    #[serde(rename = "hay_conflicto")]
    pub has_conflict: bool,
    /// Present only when the modalities disagree
    #[serde(
        rename = "interpretacion_conflicto",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub conflict_interpretation: Option<String>,
}

/// Encoder for dialogue payloads
pub struct DialogueEncoder {
    session_id: String,
}

impl Default for DialogueEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl DialogueEncoder {
    /// Create an encoder with a freshly generated session ID
    pub fn new() -> Self {
        Self {
            session_id: Self::generate_session_id(),
        }
    }

    pub fn with_session_id(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }

    /// `facesense_<uuid v4>`
    pub fn generate_session_id() -> String {
        format!("{SESSION_PREFIX}_{}", Uuid::new_v4())
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Build the payload for one fusion result and the transcribed utterance
    pub fn encode(&self, result: &FusionResult, user_message: &str) -> DialoguePayload {
        let conflict_interpretation = result.has_conflict.then(|| {
            format!(
                "El usuario dice sentir '{}' pero su rostro muestra '{}'. Esto puede indicar enmascaramiento emocional o disonancia entre lo que siente y expresa.",
                result.text_primary, result.face_primary
            )
        });

        DialoguePayload {
            session_id: self.session_id.clone(),
            user_message: user_message.to_string(),
            emotional_analysis: EmotionalAnalysis {
                primary_emotion: result.primary_emotion.clone(),
                primary_confidence: round_to(result.confidence, 2),
                text_emotions: result.text_emotions.rounded(2),
                face_emotions: result.face_emotions.rounded(2),
                text_dominant: result.text_primary.clone(),
                face_dominant: result.face_primary.clone(),
                has_conflict: result.has_conflict,
                conflict_interpretation,
            },
        }
    }

    /// Encode to a pretty JSON string
    pub fn encode_to_json(&self, result: &FusionResult, user_message: &str) -> Result<String, ComputeError> {
        let payload = self.encode(result, user_message);
        serde_json::to_string_pretty(&payload).map_err(ComputeError::JsonError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::FusionEngine;
    use pretty_assertions::assert_eq;

    fn make_result(text: &[(&str, f64)], face: &[(&str, f64)]) -> FusionResult {
        let text: LabelScores = text.iter().map(|(l, v)| (*l, *v)).collect();
        let face: LabelScores = face.iter().map(|(l, v)| (*l, *v)).collect();
        FusionEngine::default().fuse(&text, &face)
    }

    #[test]
    fn test_generated_session_id_prefix() {
        let encoder = DialogueEncoder::new();
        assert!(encoder.session_id().starts_with("facesense_"));
        assert_ne!(encoder.session_id(), DialogueEncoder::new().session_id());
    }

    #[test]
    fn test_payload_without_conflict_omits_interpretation() {
        let encoder = DialogueEncoder::with_session_id("s-1");
        let result = make_result(&[("sad", 80.0)], &[("sad", 80.0)]);
        let json = serde_json::to_value(encoder.encode(&result, "me siento mal")).unwrap();

        assert_eq!(json["session_id"], "s-1");
        assert_eq!(json["user_message"], "me siento mal");
        let analysis = &json["emotional_analysis"];
        assert_eq!(analysis["emocion_principal"], "sad");
        assert_eq!(analysis["confianza_principal"], 80.0);
        assert_eq!(analysis["hay_conflicto"], false);
        assert!(analysis.get("interpretacion_conflicto").is_none());
    }

    #[test]
    fn test_conflict_interpretation_names_both_modalities() {
        let encoder = DialogueEncoder::with_session_id("s-2");
        let result = make_result(&[("alegre", 90.0)], &[("sad", 90.0)]);
        let payload = encoder.encode(&result, "todo bien");
        let interpretation = payload.emotional_analysis.conflict_interpretation.unwrap();
        assert!(interpretation.starts_with("El usuario dice sentir 'happy' pero su rostro muestra 'sad'."));
    }

    #[test]
    fn test_distributions_rounded_to_two_decimals() {
        let encoder = DialogueEncoder::with_session_id("s-3");
        let result = make_result(&[("fear", 33.33333)], &[("fear", 12.3456)]);
        let payload = encoder.encode(&result, "");
        assert_eq!(payload.emotional_analysis.text_emotions.get("fear"), Some(33.33));
        assert_eq!(payload.emotional_analysis.face_emotions.get("fear"), Some(12.35));
    }

    #[test]
    fn test_encode_to_json_parses_back() {
        let encoder = DialogueEncoder::with_session_id("s-4");
        let result = make_result(&[("ira", 70.0)], &[("happy", 60.0)]);
        let json = encoder.encode_to_json(&result, "estoy furioso").unwrap();
        let parsed: DialoguePayload = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, encoder.encode(&result, "estoy furioso"));
    }
}
