//! Pipeline orchestration
//!
//! This module provides the public API for FaceSense. It wires the stages
//! together: scoring → normalization → anxiety tracking → session history,
//! plus text/face fusion against the latest processed frame.

use crate::anxiety::{AnxietyAnalysis, AnxietyAnalyzer, AnxietySummary};
use crate::config::EngineConfig;
use crate::encoder::DialogueEncoder;
use crate::error::ComputeError;
use crate::features::{FeatureExtractor, RawFaceGeometry};
use crate::fusion::{FusionEngine, FusionResult, NONE_LABEL};
use crate::history::{HistoryWindow, SessionSummary};
use crate::normalizer::EmotionNormalizer;
use crate::scorers::ScoreAggregator;
use crate::types::{round_to, Emotion, EmotionScores, LabelScores, RegionFeatures};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Fuse a text distribution with a face distribution and encode the dialogue payload.
///
/// # Arguments
/// * `text_json` - JSON object of text label → score (0-100)
/// * `face_json` - JSON object of face emotion → score (0-100)
/// * `user_message` - Transcribed utterance
///
/// # Example
/// ```ignore
/// let payload = fuse_to_dialogue_json(
///     r#"{"tristeza": 70}"#.to_string(),
///     r#"{"sad": 55, "happy": 10}"#.to_string(),
///     "no he dormido bien".to_string(),
/// )?;
/// ```
pub fn fuse_to_dialogue_json(
    text_json: String,
    face_json: String,
    user_message: String,
) -> Result<String, ComputeError> {
    let text: LabelScores = serde_json::from_str(&text_json)?;
    let face: LabelScores = serde_json::from_str(&face_json)?;
    let result = FusionEngine::default().fuse(&text, &face);
    DialogueEncoder::new().encode_to_json(&result, &user_message)
}

/// Record a newline-delimited stream of region features as one session and
/// return its summary as JSON. Blank lines are skipped.
pub fn summarize_session_ndjson(ndjson: &str) -> Result<String, ComputeError> {
    let engine = EmotionEngine::new();
    engine.start_recording();
    for (index, line) in ndjson.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let features: RegionFeatures = serde_json::from_str(line)
            .map_err(|e| ComputeError::ParseError(format!("line {}: {e}", index + 1)))?;
        engine.process_frame(&features);
    }
    engine.stop_recording().to_json_pretty()
}

/// Everything the engine derived from one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameAnalysis {
    pub frame_number: u64,
    pub raw: EmotionScores,
    pub normalized: EmotionScores,
    pub anxiety: AnxietyAnalysis,
    /// Whether the frame was appended to the session history
    pub recorded: bool,
}

/// Average face state over every frame processed so far
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceSnapshot {
    pub dominant_emotion: String,
    pub confidence: f64,
    pub top_emotions: Vec<(Emotion, f64)>,
    pub frames: u64,
}

#[derive(Debug, Default)]
struct FaceAccumulator {
    sums: EmotionScores,
    frames: u64,
    latest: Option<EmotionScores>,
}

impl FaceAccumulator {
    fn push(&mut self, frame: &EmotionScores) {
        for (emotion, score) in frame.iter() {
            self.sums.insert(emotion, self.sums.get(emotion) + score);
        }
        self.frames += 1;
        self.latest = Some(frame.clone());
    }

    fn snapshot(&self) -> FaceSnapshot {
        if self.frames == 0 {
            return FaceSnapshot {
                dominant_emotion: NONE_LABEL.to_string(),
                confidence: 0.0,
                top_emotions: Vec::new(),
                frames: 0,
            };
        }
        let n = self.frames as f64;
        let averages: EmotionScores = self.sums.iter().map(|(e, s)| (e, s / n)).collect();
        let (dominant_emotion, confidence) = averages
            .dominant()
            .map(|(e, s)| (e.as_str().to_string(), round_to(s, 2)))
            .unwrap_or_else(|| (NONE_LABEL.to_string(), 0.0));

        FaceSnapshot {
            dominant_emotion,
            confidence,
            top_emotions: averages
                .ranked()
                .into_iter()
                .take(2)
                .map(|(e, s)| (e, round_to(s, 2)))
                .collect(),
            frames: self.frames,
        }
    }
}

/// Stateful engine for live processing.
///
/// All methods take `&self`; the session history sits behind a read/write
/// lock and the anxiety window behind a mutex, so one producer can feed
/// frames while another thread reads summaries.
pub struct EmotionEngine {
    aggregator: ScoreAggregator,
    normalizer: EmotionNormalizer,
    fusion: FusionEngine,
    history: RwLock<HistoryWindow>,
    anxiety: Mutex<AnxietyAnalyzer>,
    face: Mutex<FaceAccumulator>,
    frame_counter: AtomicU64,
}

impl Default for EmotionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EmotionEngine {
    /// Create an engine with the default configuration
    pub fn new() -> Self {
        Self::build(EngineConfig::default(), ScoreAggregator::default())
    }

    /// Validate a configuration and build the engine from it
    pub fn with_config(config: EngineConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        let aggregator = ScoreAggregator::from_config(&config.scorers)?;
        Ok(Self::build(config, aggregator))
    }

    fn build(config: EngineConfig, aggregator: ScoreAggregator) -> Self {
        tracing::info!(
            segments = config.history.segments,
            anxiety_capacity = config.anxiety.capacity,
            text_weight = config.fusion.text_weight,
            face_weight = config.fusion.face_weight,
            "emotion engine ready"
        );
        Self {
            aggregator,
            normalizer: EmotionNormalizer::new(config.normalizer),
            fusion: FusionEngine::new(config.fusion),
            history: RwLock::new(HistoryWindow::new(config.history)),
            anxiety: Mutex::new(AnxietyAnalyzer::new(config.anxiety)),
            face: Mutex::new(FaceAccumulator::default()),
            frame_counter: AtomicU64::new(0),
        }
    }

    /// Score, normalize and track one frame of region features
    pub fn process_frame(&self, features: &RegionFeatures) -> FrameAnalysis {
        let frame_number = self.frame_counter.fetch_add(1, Ordering::Relaxed) + 1;

        let raw = self.aggregator.aggregate(features);
        let normalized = self.normalizer.normalize(&raw);
        let anxiety = self.anxiety.lock().analyze(&normalized);
        self.face.lock().push(&normalized);

        let recorded = {
            let mut history = self.history.write();
            history.is_recording() && history.add_frame(&normalized, frame_number)
        };

        tracing::debug!(
            frame = frame_number,
            dominant = ?normalized.dominant().map(|(e, _)| e),
            anxiety = anxiety.anxiety_score,
            recorded,
            "processed frame"
        );

        FrameAnalysis {
            frame_number,
            raw,
            normalized,
            anxiety,
            recorded,
        }
    }

    /// Extract region features from raw distances, then process them
    pub fn process_geometry(&self, geometry: &RawFaceGeometry) -> FrameAnalysis {
        self.process_frame(&FeatureExtractor::extract(geometry))
    }

    pub fn start_recording(&self) {
        self.history.write().start_recording();
    }

    /// Stop recording and summarize the session
    pub fn stop_recording(&self) -> SessionSummary {
        let snapshot = {
            let mut history = self.history.write();
            history.end_recording_at(Utc::now());
            history.snapshot()
        };
        snapshot.summary()
    }

    pub fn is_recording(&self) -> bool {
        self.history.read().is_recording()
    }

    /// Summary of the session so far, from a copy of the window
    pub fn current_summary(&self) -> SessionSummary {
        let snapshot = self.history.read().snapshot();
        snapshot.summary()
    }

    pub fn recorded_frames(&self) -> usize {
        self.history.read().len()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frame_counter.load(Ordering::Relaxed)
    }

    pub fn latest_frame(&self) -> Option<EmotionScores> {
        self.face.lock().latest.clone()
    }

    pub fn face_snapshot(&self) -> FaceSnapshot {
        self.face.lock().snapshot()
    }

    pub fn anxiety_summary(&self) -> AnxietySummary {
        self.anxiety.lock().summary()
    }

    /// Fuse a text distribution against the latest face frame
    pub fn fuse_text(&self, text: &LabelScores) -> FusionResult {
        let face = self.latest_frame().unwrap_or_default();
        self.fusion.fuse_with_face(text, &face)
    }

    pub fn fusion(&self) -> &FusionEngine {
        &self.fusion
    }
}
