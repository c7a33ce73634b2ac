//! Engine configuration
//!
//! Every tunable of the pipeline lives in an explicit configuration value that
//! is passed into constructors. Partial JSON files override only the fields
//! they name; everything else keeps its default.

use crate::error::ComputeError;
use crate::scorers::ScorerConfig;
use crate::types::Emotion;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default number of timeline segments in a session summary
pub const DEFAULT_TIMELINE_SEGMENTS: usize = 10;

/// Default history cap: twenty minutes at 30 fps
pub const DEFAULT_MAX_FRAMES: usize = 36_000;

/// Default anxiety ring buffer capacity
pub const DEFAULT_ANXIETY_CAPACITY: usize = 30;

pub const DEFAULT_TEXT_WEIGHT: f64 = 0.65;
pub const DEFAULT_FACE_WEIGHT: f64 = 0.35;

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scorers: ScorerConfig,
    pub normalizer: NormalizerConfig,
    pub history: HistoryConfig,
    pub anxiety: AnxietyConfig,
    pub fusion: FusionConfig,
}

impl EngineConfig {
    /// Parse and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ComputeError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn to_json(&self) -> Result<String, ComputeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every section, failing on the first problem
    pub fn validate(&self) -> Result<(), ComputeError> {
        self.scorers.validate()?;
        self.normalizer.validate()?;
        self.history.validate()?;
        self.anxiety.validate()?;
        self.fusion.validate()
    }
}

/// Contradiction rules applied to every frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Pairs that should not be strongly active together
    pub opposite_pairs: Vec<(Emotion, Emotion)>,
    /// Groups whose members reinforce each other
    pub similar_groups: Vec<Vec<Emotion>>,
    /// Both members of an opposite pair must exceed this to trigger suppression
    pub coactivation_threshold: f64,
    /// Attenuation strength: weaker *= 1 - min/100 * factor
    pub suppression_factor: f64,
    /// A group member above this triggers reinforcement
    pub reinforcement_trigger: f64,
    /// Only members above this are pulled toward the group mean
    pub reinforcement_floor: f64,
    /// Fraction of the gap to the group mean closed per frame
    pub reinforcement_pull: f64,
    pub target_total: f64,
    /// Rescaling starts once the total exceeds `target_total * overload_factor`
    pub overload_factor: f64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            opposite_pairs: vec![
                (Emotion::Happy, Emotion::Sad),
                (Emotion::Happy, Emotion::Angry),
                (Emotion::Happy, Emotion::Anxiety),
                (Emotion::Happy, Emotion::Fear),
                (Emotion::Surprise, Emotion::Disgust),
            ],
            similar_groups: vec![
                vec![Emotion::Fear, Emotion::Anxiety],
                vec![Emotion::Sad, Emotion::Anxiety],
                vec![Emotion::Angry, Emotion::Disgust],
            ],
            coactivation_threshold: 30.0,
            suppression_factor: 0.7,
            reinforcement_trigger: 50.0,
            reinforcement_floor: 20.0,
            reinforcement_pull: 0.2,
            target_total: 120.0,
            overload_factor: 1.5,
        }
    }
}

impl NormalizerConfig {
    pub fn validate(&self) -> Result<(), ComputeError> {
        require_finite(
            "normalizer",
            &[
                ("coactivation_threshold", self.coactivation_threshold),
                ("suppression_factor", self.suppression_factor),
                ("reinforcement_trigger", self.reinforcement_trigger),
                ("reinforcement_floor", self.reinforcement_floor),
                ("reinforcement_pull", self.reinforcement_pull),
                ("target_total", self.target_total),
                ("overload_factor", self.overload_factor),
            ],
        )?;
        if !(0.0..=1.0).contains(&self.suppression_factor) {
            return Err(ComputeError::InvalidConfig(
                "normalizer.suppression_factor must be within [0, 1]".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.reinforcement_pull) {
            return Err(ComputeError::InvalidConfig(
                "normalizer.reinforcement_pull must be within [0, 1]".to_string(),
            ));
        }
        if self.target_total <= 0.0 || self.overload_factor < 1.0 {
            return Err(ComputeError::InvalidConfig(
                "normalizer.target_total must be > 0 and overload_factor >= 1".to_string(),
            ));
        }
        if let Some((a, _)) = self.opposite_pairs.iter().find(|(a, b)| a == b) {
            return Err(ComputeError::InvalidConfig(format!(
                "normalizer opposite pair pairs {a} with itself"
            )));
        }
        if self.similar_groups.iter().any(|group| group.len() < 2) {
            return Err(ComputeError::InvalidConfig(
                "normalizer similar groups need at least two members".to_string(),
            ));
        }
        Ok(())
    }
}

/// Session recording settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Number of timeline segments requested per summary
    pub segments: usize,
    /// New dominant emotion must exceed this score to count as a transition
    pub transition_threshold: f64,
    /// Oldest frames are evicted beyond this many
    pub max_frames: usize,
    /// Transitions listed in the prose digest
    pub digest_transitions: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            segments: DEFAULT_TIMELINE_SEGMENTS,
            transition_threshold: 20.0,
            max_frames: DEFAULT_MAX_FRAMES,
            digest_transitions: 5,
        }
    }
}

impl HistoryConfig {
    pub fn validate(&self) -> Result<(), ComputeError> {
        require_finite("history", &[("transition_threshold", self.transition_threshold)])?;
        if self.segments == 0 {
            return Err(ComputeError::InvalidConfig("history.segments must be > 0".to_string()));
        }
        if self.max_frames == 0 {
            return Err(ComputeError::InvalidConfig("history.max_frames must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Weights of the composite anxiety score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeWeights {
    pub anxiety: f64,
    pub fear: f64,
    pub sad: f64,
    pub angry: f64,
    pub happy: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            anxiety: 0.50,
            fear: 0.30,
            sad: 0.15,
            angry: 0.10,
            happy: -0.05,
        }
    }
}

impl CompositeWeights {
    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f64)> {
        [
            (Emotion::Anxiety, self.anxiety),
            (Emotion::Fear, self.fear),
            (Emotion::Sad, self.sad),
            (Emotion::Angry, self.angry),
            (Emotion::Happy, self.happy),
        ]
        .into_iter()
    }
}

/// Anxiety trend analyzer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnxietyConfig {
    pub capacity: usize,
    pub weights: CompositeWeights,
    /// Samples needed before a trend or spread-based confidence is computed
    pub trend_min_samples: usize,
    /// Size of each of the two windows compared for the trend
    pub trend_span: usize,
    pub trend_delta: f64,
    pub increasing_multiplier: f64,
    pub decreasing_multiplier: f64,
    /// Upper bounds of the low, medium and high levels
    pub level_breakpoints: [f64; 3],
    pub confidence_floor: f64,
    /// Emotions with a positive composite weight above this are reported as contributors
    pub contributor_threshold: f64,
}

impl Default for AnxietyConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_ANXIETY_CAPACITY,
            weights: CompositeWeights::default(),
            trend_min_samples: 10,
            trend_span: 5,
            trend_delta: 10.0,
            increasing_multiplier: 1.1,
            decreasing_multiplier: 0.9,
            level_breakpoints: [25.0, 45.0, 70.0],
            confidence_floor: 50.0,
            contributor_threshold: 30.0,
        }
    }
}

impl AnxietyConfig {
    pub fn validate(&self) -> Result<(), ComputeError> {
        let w = &self.weights;
        require_finite(
            "anxiety",
            &[
                ("weights.anxiety", w.anxiety),
                ("weights.fear", w.fear),
                ("weights.sad", w.sad),
                ("weights.angry", w.angry),
                ("weights.happy", w.happy),
                ("trend_delta", self.trend_delta),
                ("increasing_multiplier", self.increasing_multiplier),
                ("decreasing_multiplier", self.decreasing_multiplier),
                ("confidence_floor", self.confidence_floor),
                ("contributor_threshold", self.contributor_threshold),
            ],
        )?;
        if !(0.0..=100.0).contains(&self.confidence_floor) {
            return Err(ComputeError::InvalidConfig(
                "anxiety.confidence_floor must be within [0, 100]".to_string(),
            ));
        }
        if self.capacity == 0 || self.trend_span == 0 {
            return Err(ComputeError::InvalidConfig(
                "anxiety.capacity and anxiety.trend_span must be > 0".to_string(),
            ));
        }
        if self.trend_min_samples < self.trend_span * 2 {
            return Err(ComputeError::InvalidConfig(
                "anxiety.trend_min_samples must cover two trend spans".to_string(),
            ));
        }
        if self.capacity < self.trend_min_samples {
            return Err(ComputeError::InvalidConfig(
                "anxiety.capacity must hold at least trend_min_samples".to_string(),
            ));
        }
        let [low, medium, high] = self.level_breakpoints;
        if !(low.is_finite() && medium.is_finite() && high.is_finite()) || !(low < medium && medium < high) {
            return Err(ComputeError::InvalidConfig(
                "anxiety.level_breakpoints must be finite and strictly increasing".to_string(),
            ));
        }
        Ok(())
    }
}

/// Text and face fusion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub text_weight: f64,
    pub face_weight: f64,
    /// Lowercase text label to canonical emotion label
    pub lexicon: BTreeMap<String, String>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        let lexicon = [
            ("alegre", "happy"),
            ("triste", "sad"),
            ("enojado", "angry"),
            ("miedo", "fear"),
            ("sorprendido", "surprise"),
            ("repugnante", "disgust"),
            ("ansiedad", "anxiety"),
            ("aterrado", "fear"),
            ("furioso", "angry"),
            ("feliz", "happy"),
            ("felicidad", "happy"),
            ("tristeza", "sad"),
            ("ira", "angry"),
            ("temor", "fear"),
            ("sorpresa", "surprise"),
            ("disgusto", "disgust"),
        ]
        .into_iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect();

        Self {
            text_weight: DEFAULT_TEXT_WEIGHT,
            face_weight: DEFAULT_FACE_WEIGHT,
            lexicon,
        }
    }
}

impl FusionConfig {
    pub fn validate(&self) -> Result<(), ComputeError> {
        require_finite(
            "fusion",
            &[("text_weight", self.text_weight), ("face_weight", self.face_weight)],
        )?;
        if self.text_weight < 0.0 || self.face_weight < 0.0 {
            return Err(ComputeError::InvalidConfig(
                "fusion weights must be >= 0".to_string(),
            ));
        }
        if self.text_weight + self.face_weight <= 0.0 {
            return Err(ComputeError::InvalidConfig(
                "fusion weights must not both be zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn require_finite(section: &str, values: &[(&str, f64)]) -> Result<(), ComputeError> {
    match values.iter().find(|(_, v)| !v.is_finite()) {
        Some((name, v)) => Err(ComputeError::InvalidConfig(format!(
            "{section}.{name} must be finite, got {v}"
        ))),
        None => Ok(()),
    }
}
