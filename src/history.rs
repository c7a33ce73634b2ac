//! Session history
//!
//! Records normalized frames between `start_recording` and `stop_recording`
//! and summarizes them: per-emotion statistics, dominant-emotion transitions,
//! a segmented timeline and a prose digest for the dialogue agent.
//!
//! Summaries are computed from a cloned [`HistorySnapshot`], so a reader never
//! holds the window while the statistics are being computed.

use crate::config::HistoryConfig;
use crate::error::ComputeError;
use crate::types::{round_to, Emotion, EmotionScores};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt::Write as _;
use std::path::Path;

/// One recorded frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryFrame {
    pub frame: u64,
    pub timestamp: DateTime<Utc>,
    /// Seconds since recording started, rounded to 2 decimals
    pub elapsed_seconds: f64,
    pub emotions: EmotionScores,
}

/// Recording window: idle until started, frozen again on stop
#[derive(Debug, Clone, Default)]
pub struct HistoryWindow {
    config: HistoryConfig,
    recording: bool,
    frames: VecDeque<HistoryFrame>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
}

impl HistoryWindow {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> impl Iterator<Item = &HistoryFrame> + '_ {
        self.frames.iter()
    }

    /// Clear the buffer and start a new session
    pub fn start_recording(&mut self) {
        self.start_recording_at(Utc::now());
    }

    pub fn start_recording_at(&mut self, now: DateTime<Utc>) {
        self.frames.clear();
        self.recording = true;
        self.start_time = Some(now);
        self.end_time = None;
        tracing::info!(start = %now, "recording started");
    }

    /// Stop recording and summarize the frozen session
    pub fn stop_recording(&mut self) -> SessionSummary {
        self.stop_recording_at(Utc::now())
    }

    pub fn stop_recording_at(&mut self, now: DateTime<Utc>) -> SessionSummary {
        self.end_recording_at(now);
        self.summary()
    }

    /// Leave the recording state without summarizing; a no-op when idle
    pub fn end_recording_at(&mut self, now: DateTime<Utc>) {
        if self.recording {
            self.recording = false;
            self.end_time = Some(now);
            tracing::info!(end = %now, frames = self.frames.len(), "recording stopped");
        }
    }

    /// Append a frame. Returns `false` (and records nothing) when idle.
    #[must_use]
    pub fn add_frame(&mut self, emotions: &EmotionScores, frame_number: u64) -> bool {
        self.add_frame_at(emotions, frame_number, Utc::now())
    }

    #[must_use]
    pub fn add_frame_at(&mut self, emotions: &EmotionScores, frame_number: u64, now: DateTime<Utc>) -> bool {
        let start = match (self.recording, self.start_time) {
            (true, Some(start)) => start,
            _ => {
                tracing::warn!(frame = frame_number, "frame offered while not recording");
                return false;
            }
        };

        let elapsed = (now - start).num_milliseconds().max(0) as f64 / 1000.0;
        self.frames.push_back(HistoryFrame {
            frame: frame_number,
            timestamp: now,
            elapsed_seconds: round_to(elapsed, 2),
            emotions: emotions.clone(),
        });
        while self.frames.len() > self.config.max_frames.max(1) {
            self.frames.pop_front();
        }
        true
    }

    /// Consistent copy of the window for summarizing outside any lock
    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            config: self.config.clone(),
            frames: self.frames.iter().cloned().collect(),
            start_time: self.start_time,
            end_time: self.end_time,
            recording: self.recording,
        }
    }

    /// Summary of the current buffer; callable while recording or idle
    pub fn summary(&self) -> SessionSummary {
        self.snapshot().summary()
    }
}

/// Immutable copy of a history window
#[derive(Debug, Clone)]
pub struct HistorySnapshot {
    config: HistoryConfig,
    frames: Vec<HistoryFrame>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    recording: bool,
}

impl HistorySnapshot {
    pub fn frames(&self) -> &[HistoryFrame] {
        &self.frames
    }

    pub fn summary(&self) -> SessionSummary {
        if self.frames.is_empty() {
            return SessionSummary::NoData {
                message: NO_DATA_MESSAGE.to_string(),
            };
        }

        let emotion_statistics = self.statistics();
        let emotion_transitions = self.transitions();
        let timeline = self.timeline();
        let recording_info = RecordingInfo {
            start_time: self.start_time,
            end_time: self.end_time,
            duration_seconds: round_to(self.duration_seconds(), 2),
            total_frames: self.frames.len(),
        };
        let llm_summary = digest(
            &recording_info,
            &emotion_statistics,
            &emotion_transitions,
            &timeline,
            self.config.digest_transitions,
        );

        SessionSummary::Ok(HistoryReport {
            recording_info,
            emotion_statistics,
            emotion_transitions,
            timeline,
            llm_summary,
        })
    }

    /// Stopped sessions use wall-clock duration; live ones the newest frame's offset
    fn duration_seconds(&self) -> f64 {
        match (self.recording, self.start_time, self.end_time) {
            (false, Some(start), Some(end)) => (end - start).num_milliseconds().max(0) as f64 / 1000.0,
            _ => self.frames.last().map(|f| f.elapsed_seconds).unwrap_or(0.0),
        }
    }

    /// Per-emotion statistics over every frame, keyed by the first frame's emotions
    pub fn statistics(&self) -> BTreeMap<Emotion, EmotionStatistics> {
        let Some(first) = self.frames.first() else {
            return BTreeMap::new();
        };
        let dominants: Vec<Option<Emotion>> = self
            .frames
            .iter()
            .map(|f| f.emotions.dominant().map(|(e, _)| e))
            .collect();
        let n = self.frames.len() as f64;

        first
            .emotions
            .emotions()
            .map(|emotion| {
                let values: Vec<f64> = self.frames.iter().map(|f| f.emotions.get(emotion)).collect();
                let mean = values.iter().sum::<f64>() / n;
                let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                let max = values.iter().copied().fold(f64::MIN, f64::max);
                let min = values.iter().copied().fold(f64::MAX, f64::min);
                let dominant_frames = dominants.iter().filter(|d| **d == Some(emotion)).count();

                let stats = EmotionStatistics {
                    mean: round_to(mean, 2),
                    max: round_to(max, 2),
                    min: round_to(min, 2),
                    std: round_to(variance.sqrt(), 2),
                    dominant_percentage: round_to(dominant_frames as f64 / n * 100.0, 2),
                };
                (emotion, stats)
            })
            .collect()
    }

    /// Changes of dominant emotion where the new dominant clears the threshold.
    ///
    /// The reference dominant only moves to frames that clear the threshold, so
    /// low-confidence noise frames neither create nor absorb transitions.
    pub fn transitions(&self) -> Vec<Transition> {
        if self.frames.len() < 2 {
            return Vec::new();
        }
        let threshold = self.config.transition_threshold;
        let mut previous: Option<Emotion> = None;
        let mut transitions = Vec::new();

        for frame in &self.frames {
            let Some((current, score)) = frame.emotions.dominant() else {
                continue;
            };
            if score <= threshold {
                continue;
            }
            if let Some(from) = previous {
                if from != current {
                    transitions.push(Transition {
                        frame: frame.frame,
                        time: frame.elapsed_seconds,
                        from,
                        to: current,
                        confidence: round_to(score, 2),
                    });
                }
            }
            previous = Some(current);
        }
        transitions
    }

    /// Equal-size chunks with their dominant emotion by summed score.
    ///
    /// Chunk size is `max(1, frames / segments)`, so a remainder yields one
    /// extra, shorter trailing segment.
    pub fn timeline(&self) -> Vec<TimelineSegment> {
        let size = (self.frames.len() / self.config.segments.max(1)).max(1);

        self.frames
            .chunks(size)
            .enumerate()
            .filter_map(|(index, chunk)| {
                let mut sums = EmotionScores::new();
                for frame in chunk {
                    for (emotion, score) in frame.emotions.iter() {
                        sums.insert(emotion, sums.get(emotion) + score);
                    }
                }
                let (dominant, total) = sums.dominant()?;
                let first = chunk.first()?;
                let last = chunk.last()?;
                Some(TimelineSegment {
                    segment: index + 1,
                    start_time: first.elapsed_seconds,
                    end_time: last.elapsed_seconds,
                    dominant_emotion: dominant,
                    confidence: round_to(total / chunk.len() as f64, 2),
                })
            })
            .collect()
    }
}

const NO_DATA_MESSAGE: &str = "No hay datos de emociones registrados";

/// Session summary, tagged by `status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionSummary {
    NoData { message: String },
    Ok(HistoryReport),
}

impl SessionSummary {
    pub fn is_empty(&self) -> bool {
        matches!(self, SessionSummary::NoData { .. })
    }

    pub fn report(&self) -> Option<&HistoryReport> {
        match self {
            SessionSummary::Ok(report) => Some(report),
            SessionSummary::NoData { .. } => None,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, ComputeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Persist the summary as pretty JSON
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), ComputeError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json_pretty()?)?;
        tracing::info!(path = %path.display(), "session summary saved");
        Ok(())
    }
}

/// Default file name for a persisted summary, e.g. `emotion_history_20240131_142500.json`
pub fn default_file_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("emotion_history_{}.json", now.format("%Y%m%d_%H%M%S"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryReport {
    pub recording_info: RecordingInfo,
    pub emotion_statistics: BTreeMap<Emotion, EmotionStatistics>,
    pub emotion_transitions: Vec<Transition>,
    pub timeline: Vec<TimelineSegment>,
    /// Prose digest for a language model
    pub llm_summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingInfo {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_seconds: f64,
    pub total_frames: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionStatistics {
    pub mean: f64,
    pub max: f64,
    pub min: f64,
    /// Population standard deviation
    pub std: f64,
    /// Share of frames (0-100) where this emotion was the frame's argmax
    pub dominant_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub frame: u64,
    pub time: f64,
    pub from: Emotion,
    pub to: Emotion,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineSegment {
    pub segment: usize,
    pub start_time: f64,
    pub end_time: f64,
    pub dominant_emotion: Emotion,
    pub confidence: f64,
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn digest(
    info: &RecordingInfo,
    stats: &BTreeMap<Emotion, EmotionStatistics>,
    transitions: &[Transition],
    timeline: &[TimelineSegment],
    max_transitions: usize,
) -> String {
    let mut ranked: Vec<(&Emotion, &EmotionStatistics)> = stats.iter().collect();
    ranked.sort_by(|a, b| b.1.mean.partial_cmp(&a.1.mean).unwrap_or(std::cmp::Ordering::Equal));

    let mut out = String::new();
    // writing into a String cannot fail
    let _ = writeln!(out, "Análisis de Emociones Faciales:\n");
    let _ = writeln!(out, "Duración: {:.1} segundos", info.duration_seconds);
    let _ = writeln!(out, "Frames analizados: {}\n", info.total_frames);

    if let Some((emotion, top)) = ranked.first() {
        let _ = writeln!(
            out,
            "EMOCIÓN DOMINANTE: {} ({:.1}% promedio)\n",
            emotion.as_str().to_uppercase(),
            top.mean
        );
    }

    let _ = writeln!(out, "ESTADÍSTICAS POR EMOCIÓN:");
    for (emotion, s) in &ranked {
        let _ = writeln!(
            out,
            "- {}: Promedio {:.1}%, Máximo {:.1}%, Dominancia {:.1}%",
            capitalize(emotion.as_str()),
            s.mean,
            s.max,
            s.dominant_percentage
        );
    }

    if !transitions.is_empty() {
        let _ = writeln!(out, "\nTRANSICIONES DETECTADAS ({}):", transitions.len());
        for t in transitions.iter().take(max_transitions) {
            let _ = writeln!(
                out,
                "- Segundo {:.1}s: {} → {} (confianza {:.1}%)",
                t.time, t.from, t.to, t.confidence
            );
        }
    }

    let _ = writeln!(out, "\nLÍNEA DE TIEMPO:");
    for seg in timeline {
        let _ = writeln!(
            out,
            "- Seg {} ({:.1}s-{:.1}s): {} ({:.1}%)",
            seg.segment, seg.start_time, seg.end_time, seg.dominant_emotion, seg.confidence
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::full_frame;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 31, 14, 25, 0).unwrap()
    }

    /// Record frames at 100 ms intervals and stop one second after the last
    fn make_session(frames: &[EmotionScores]) -> HistoryWindow {
        let mut window = HistoryWindow::default();
        window.start_recording_at(t0());
        for (i, frame) in frames.iter().enumerate() {
            let at = t0() + Duration::milliseconds(100 * i as i64);
            assert!(window.add_frame_at(frame, i as u64, at));
        }
        window
    }

    fn report(summary: &SessionSummary) -> &HistoryReport {
        summary.report().expect("summary should have data")
    }

    #[test]
    fn test_empty_window_reports_no_data() {
        let window = HistoryWindow::default();
        let summary = window.summary();
        assert!(summary.is_empty());
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["status"], "no_data");
        assert_eq!(json["message"], NO_DATA_MESSAGE);
    }

    #[test]
    fn test_idle_window_rejects_frames() {
        let mut window = HistoryWindow::default();
        assert!(!window.add_frame(&full_frame(&[(Emotion::Sad, 50.0)]), 1));
        assert!(window.is_empty());
    }

    #[test]
    fn test_single_emotion_stream_is_fully_dominant() {
        let frames: Vec<EmotionScores> = (0..20).map(|_| full_frame(&[(Emotion::Sad, 60.0)])).collect();
        let window = make_session(&frames);
        let summary = window.summary();
        let stats = &report(&summary).emotion_statistics;
        assert_eq!(stats[&Emotion::Sad].dominant_percentage, 100.0);
        assert_eq!(stats[&Emotion::Sad].std, 0.0);
        assert_eq!(stats[&Emotion::Happy].dominant_percentage, 0.0);
        let total: f64 = stats.values().map(|s| s.dominant_percentage).sum();
        assert!(total <= 100.0 + 1e-9);
    }

    #[test]
    fn test_statistics_values() {
        let frames = vec![
            full_frame(&[(Emotion::Happy, 20.0)]),
            full_frame(&[(Emotion::Happy, 40.0)]),
            full_frame(&[(Emotion::Happy, 60.0)]),
        ];
        let summary = make_session(&frames).summary();
        let happy = report(&summary).emotion_statistics[&Emotion::Happy];
        assert_eq!(happy.mean, 40.0);
        assert_eq!(happy.max, 60.0);
        assert_eq!(happy.min, 20.0);
        assert_eq!(happy.std, 16.33);
    }

    #[test]
    fn test_transitions_skip_low_confidence_frames() {
        let frames = vec![
            full_frame(&[(Emotion::Happy, 60.0)]),
            full_frame(&[(Emotion::Sad, 15.0)]),
            full_frame(&[(Emotion::Happy, 55.0)]),
            full_frame(&[(Emotion::Sad, 45.0)]),
            full_frame(&[(Emotion::Sad, 50.0)]),
        ];
        let summary = make_session(&frames).summary();
        let transitions = &report(&summary).emotion_transitions;
        assert_eq!(
            transitions,
            &vec![Transition {
                frame: 3,
                time: 0.3,
                from: Emotion::Happy,
                to: Emotion::Sad,
                confidence: 45.0,
            }]
        );
    }

    #[test]
    fn test_timeline_chunks() {
        let mut frames: Vec<EmotionScores> = (0..10).map(|_| full_frame(&[(Emotion::Happy, 70.0)])).collect();
        frames.extend((0..10).map(|_| full_frame(&[(Emotion::Fear, 30.0)])));
        let mut window = HistoryWindow::new(HistoryConfig {
            segments: 2,
            ..HistoryConfig::default()
        });
        window.start_recording_at(t0());
        for (i, frame) in frames.iter().enumerate() {
            assert!(window.add_frame_at(frame, i as u64, t0() + Duration::milliseconds(100 * i as i64)));
        }
        let timeline = window.snapshot().timeline();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].dominant_emotion, Emotion::Happy);
        assert_eq!(timeline[0].confidence, 70.0);
        assert_eq!(timeline[0].start_time, 0.0);
        assert_eq!(timeline[0].end_time, 0.9);
        assert_eq!(timeline[1].segment, 2);
        assert_eq!(timeline[1].dominant_emotion, Emotion::Fear);
        assert_eq!(timeline[1].confidence, 30.0);
    }

    fn mixed_stream(n: usize) -> Vec<EmotionScores> {
        (0..n)
            .map(|i| match i % 5 {
                0 | 1 => full_frame(&[(Emotion::Happy, 50.0)]),
                2 => full_frame(&[(Emotion::Sad, 40.0)]),
                _ => full_frame(&[(Emotion::Fear, 30.0)]),
            })
            .collect()
    }

    #[test]
    fn test_mixed_stream_dominance_shares() {
        let summary = make_session(&mixed_stream(25)).summary();
        let stats = &report(&summary).emotion_statistics;
        assert_eq!(stats[&Emotion::Happy].dominant_percentage, 40.0);
        assert_eq!(stats[&Emotion::Sad].dominant_percentage, 20.0);
        assert_eq!(stats[&Emotion::Fear].dominant_percentage, 40.0);
        let total: f64 = stats.values().map(|s| s.dominant_percentage).sum();
        assert!(total <= 100.0 + 1e-9, "dominance shares summed to {total}");
    }

    #[test]
    fn test_timeline_remainder_forms_short_trailing_segment() {
        // 25 frames over 10 segments: chunks of 2, plus one trailing frame
        let timeline = make_session(&mixed_stream(25)).snapshot().timeline();
        assert_eq!(timeline.len(), 13);

        assert_eq!(timeline[0].dominant_emotion, Emotion::Happy);
        assert_eq!(timeline[0].confidence, 50.0);
        assert_eq!(timeline[0].end_time, 0.1);

        let last = &timeline[12];
        assert_eq!(last.segment, 13);
        assert_eq!(last.start_time, 2.4);
        assert_eq!(last.end_time, 2.4);
        assert_eq!(last.dominant_emotion, Emotion::Fear);
        assert_eq!(last.confidence, 30.0);
    }

    #[test]
    fn test_short_history_has_one_frame_segments() {
        let frames: Vec<EmotionScores> = (0..3).map(|_| full_frame(&[(Emotion::Angry, 40.0)])).collect();
        let timeline = make_session(&frames).snapshot().timeline();
        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline[2].segment, 3);
    }

    #[test]
    fn test_stop_freezes_duration_and_digest() {
        let frames: Vec<EmotionScores> = (0..5).map(|_| full_frame(&[(Emotion::Surprise, 80.0)])).collect();
        let mut window = make_session(&frames);
        let summary = window.stop_recording_at(t0() + Duration::seconds(12));
        let report = report(&summary);
        assert_eq!(report.recording_info.duration_seconds, 12.0);
        assert_eq!(report.recording_info.total_frames, 5);
        assert!(report.llm_summary.contains("EMOCIÓN DOMINANTE: SURPRISE"));
        assert!(!window.is_recording());
        // frames offered after stop are refused
        assert!(!window.add_frame_at(&frames[0], 99, t0() + Duration::seconds(13)));
    }

    #[test]
    fn test_live_summary_uses_latest_offset() {
        let frames: Vec<EmotionScores> = (0..4).map(|_| full_frame(&[(Emotion::Sad, 30.0)])).collect();
        let window = make_session(&frames);
        let summary = window.summary();
        assert_eq!(report(&summary).recording_info.duration_seconds, 0.3);
    }

    #[test]
    fn test_max_frames_evicts_oldest() {
        let mut window = HistoryWindow::new(HistoryConfig {
            max_frames: 3,
            ..HistoryConfig::default()
        });
        window.start_recording_at(t0());
        for i in 0..5u64 {
            assert!(window.add_frame_at(&full_frame(&[(Emotion::Fear, 50.0)]), i, t0()));
        }
        let kept: Vec<u64> = window.frames().map(|f| f.frame).collect();
        assert_eq!(kept, vec![2, 3, 4]);
    }

    #[test]
    fn test_restart_clears_previous_session() {
        let frames: Vec<EmotionScores> = (0..4).map(|_| full_frame(&[(Emotion::Sad, 30.0)])).collect();
        let mut window = make_session(&frames);
        let _ = window.stop_recording_at(t0() + Duration::seconds(1));
        window.start_recording_at(t0() + Duration::seconds(5));
        assert!(window.is_empty());
        assert!(window.summary().is_empty());
    }

    #[test]
    fn test_digest_lists_first_five_transitions() {
        let frames: Vec<EmotionScores> = (0..8)
            .map(|i| {
                let emotion = if i % 2 == 0 { Emotion::Happy } else { Emotion::Sad };
                full_frame(&[(emotion, 50.0)])
            })
            .collect();
        let summary = make_session(&frames).summary();
        let report = report(&summary);
        assert_eq!(report.emotion_transitions.len(), 7);
        assert!(report.llm_summary.contains("TRANSICIONES DETECTADAS (7):"));
        assert_eq!(report.llm_summary.matches("Segundo").count(), 5);
    }

    #[test]
    fn test_summary_json_shape() {
        let frames = vec![full_frame(&[(Emotion::Happy, 50.0)])];
        let json = serde_json::to_value(make_session(&frames).summary()).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["recording_info"]["total_frames"], 1);
        assert!(json["emotion_statistics"]["happy"]["dominant_percentage"].is_number());
        assert!(json["llm_summary"].is_string());
    }

    #[test]
    fn test_summary_roundtrips_through_json() {
        let frames = vec![full_frame(&[(Emotion::Happy, 50.0)]), full_frame(&[(Emotion::Sad, 40.0)])];
        let summary = make_session(&frames).summary();
        let json = summary.to_json_pretty().unwrap();
        let parsed: SessionSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, summary);
    }

    #[test]
    fn test_default_file_name() {
        assert_eq!(default_file_name(&t0()), "emotion_history_20240131_142500.json");
    }
}
