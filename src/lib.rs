//! FaceSense - facial and text emotion engine
//!
//! FaceSense turns per-frame facial geometry and short text utterances into a
//! single emotional snapshot for a dialogue agent, through a deterministic
//! pipeline: region features → per-emotion scoring → normalization →
//! session history and anxiety tracking → text/face fusion → dialogue payload.
//!
//! ## Modules
//!
//! - **Scoring**: independent per-emotion scorers combined by a weight table
//! - **Session**: a recording window with statistics, transitions and a timeline
//! - **Fusion**: weighted text/face fusion with conflict detection

pub mod anxiety;
pub mod config;
pub mod encoder;
pub mod error;
pub mod features;
pub mod fusion;
pub mod history;
pub mod normalizer;
pub mod pipeline;
pub mod scorers;
pub mod types;

pub use anxiety::{AnxietyAnalysis, AnxietyAnalyzer, AnxietyLevel, AnxietyTrend};
pub use config::EngineConfig;
pub use encoder::{DialogueEncoder, DialoguePayload};
pub use error::ComputeError;
pub use features::{FeatureExtractor, RawFaceGeometry};
pub use fusion::{rescale_probabilities, FusionEngine, FusionResult};
pub use history::{HistoryWindow, SessionSummary};
pub use normalizer::EmotionNormalizer;
pub use pipeline::{fuse_to_dialogue_json, summarize_session_ndjson, EmotionEngine, FrameAnalysis};
pub use scorers::{ScoreAggregator, ScorerConfig};
pub use types::{Emotion, EmotionScores, LabelScores, Region, RegionFeatures};

/// Crate version, reported by the CLI
pub const FACESENSE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const PRODUCER_NAME: &str = "facesense";
