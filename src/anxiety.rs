//! Anxiety trend analysis
//!
//! Keeps a short rolling window of composite anxiety scores, fed every frame
//! whether or not a session is being recorded. The window is independent of
//! the session history and only smooths the trend and confidence estimates.

use crate::config::{AnxietyConfig, DEFAULT_ANXIETY_CAPACITY};
use crate::types::{round_to, Emotion, EmotionScores};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Bucketed anxiety level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnxietyLevel {
    #[serde(rename = "baja")]
    Low,
    #[serde(rename = "media")]
    Medium,
    #[serde(rename = "alta")]
    High,
    #[serde(rename = "muy_alta")]
    VeryHigh,
}

impl AnxietyLevel {
    /// Advice sentence handed to the dialogue agent
    pub fn recommendation(&self) -> &'static str {
        match self {
            AnxietyLevel::Low => "Estado emocional estable. Continúa con actividades normales.",
            AnxietyLevel::Medium => {
                "Ansiedad leve detectada. Considera técnicas de respiración o pausas breves."
            }
            AnxietyLevel::High => {
                "Ansiedad significativa detectada. Recomendado: ejercicios de relajación, respiración profunda, o hablar con alguien."
            }
            AnxietyLevel::VeryHigh => {
                "Ansiedad muy alta detectada. Recomendado: buscar apoyo inmediato, técnicas de grounding, o contactar con profesional de salud mental."
            }
        }
    }
}

/// Direction of the composite score over the last samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnxietyTrend {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

/// Result of analyzing one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnxietyAnalysis {
    pub anxiety_score: f64,
    pub anxiety_level: AnxietyLevel,
    pub confidence: f64,
    pub trend: AnxietyTrend,
    pub contributing_emotions: Vec<Emotion>,
    pub recommendation: String,
}

/// Statistics over the rolling window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnxietySummary {
    pub mean: f64,
    pub max: f64,
    pub min: f64,
    pub current: f64,
}

/// Rolling composite-anxiety analyzer
#[derive(Debug, Clone)]
pub struct AnxietyAnalyzer {
    history: VecDeque<f64>,
    config: AnxietyConfig,
}

impl Default for AnxietyAnalyzer {
    fn default() -> Self {
        Self::new(AnxietyConfig::default())
    }
}

impl AnxietyAnalyzer {
    pub fn new(config: AnxietyConfig) -> Self {
        let capacity = if config.capacity == 0 {
            DEFAULT_ANXIETY_CAPACITY
        } else {
            config.capacity
        };
        Self {
            history: VecDeque::with_capacity(capacity),
            config: AnxietyConfig { capacity, ..config },
        }
    }

    /// Composite score for one frame, clamped to [0, 100]
    pub fn composite(&self, emotions: &EmotionScores) -> f64 {
        let score: f64 = self
            .config
            .weights
            .iter()
            .map(|(emotion, weight)| weight * emotions.get(emotion))
            .sum();
        if score.is_finite() {
            score.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }

    /// Score a frame, push it into the window and classify the result
    pub fn analyze(&mut self, emotions: &EmotionScores) -> AnxietyAnalysis {
        let score = self.composite(emotions);

        self.history.push_back(score);
        while self.history.len() > self.config.capacity {
            self.history.pop_front();
        }

        let trend = self.trend();
        let level = self.level(self.adjust_for_trend(score, trend));
        let confidence = self.confidence();

        AnxietyAnalysis {
            anxiety_score: round_to(score, 2),
            anxiety_level: level,
            confidence: round_to(confidence, 2),
            trend,
            contributing_emotions: self.contributors(emotions),
            recommendation: level.recommendation().to_string(),
        }
    }

    /// Compare the mean of the newest span against the span before it
    pub fn trend(&self) -> AnxietyTrend {
        let span = self.config.trend_span;
        let len = self.history.len();
        if len < self.config.trend_min_samples || len < span * 2 {
            return AnxietyTrend::InsufficientData;
        }

        let recent = mean(self.history.range(len - span..));
        let older = mean(self.history.range(len - span * 2..len - span));
        let diff = recent - older;

        if diff > self.config.trend_delta {
            AnxietyTrend::Increasing
        } else if diff < -self.config.trend_delta {
            AnxietyTrend::Decreasing
        } else {
            AnxietyTrend::Stable
        }
    }

    fn adjust_for_trend(&self, score: f64, trend: AnxietyTrend) -> f64 {
        match trend {
            AnxietyTrend::Increasing => score * self.config.increasing_multiplier,
            AnxietyTrend::Decreasing => score * self.config.decreasing_multiplier,
            AnxietyTrend::Stable | AnxietyTrend::InsufficientData => score,
        }
    }

    pub fn level(&self, score: f64) -> AnxietyLevel {
        let [low, medium, high] = self.config.level_breakpoints;
        if score < low {
            AnxietyLevel::Low
        } else if score < medium {
            AnxietyLevel::Medium
        } else if score < high {
            AnxietyLevel::High
        } else {
            AnxietyLevel::VeryHigh
        }
    }

    /// Lower spread over the last samples means higher confidence
    pub fn confidence(&self) -> f64 {
        let window = self.config.trend_min_samples;
        let len = self.history.len();
        if len < window || window == 0 {
            return self.config.confidence_floor;
        }
        let std = population_std(self.history.range(len - window..));
        (100.0 - std).max(self.config.confidence_floor).min(100.0)
    }

    /// Emotions with a positive composite weight above the contributor threshold
    pub fn contributors(&self, emotions: &EmotionScores) -> Vec<Emotion> {
        self.config
            .weights
            .iter()
            .filter(|(_, weight)| *weight > 0.0)
            .map(|(emotion, _)| emotion)
            .filter(|emotion| emotions.get(*emotion) > self.config.contributor_threshold)
            .collect()
    }

    pub fn summary(&self) -> AnxietySummary {
        let Some(&current) = self.history.back() else {
            return AnxietySummary::default();
        };
        let max = self.history.iter().copied().fold(f64::MIN, f64::max);
        let min = self.history.iter().copied().fold(f64::MAX, f64::min);

        AnxietySummary {
            mean: round_to(mean(self.history.iter()), 2),
            max: round_to(max, 2),
            min: round_to(min, 2),
            current: round_to(current, 2),
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}

fn mean<'a>(values: impl Iterator<Item = &'a f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn population_std<'a>(values: impl Iterator<Item = &'a f64> + Clone) -> f64 {
    let avg = mean(values.clone());
    let (sum_sq, count) = values.fold((0.0, 0usize), |(s, c), v| (s + (v - avg).powi(2), c + 1));
    if count == 0 {
        0.0
    } else {
        (sum_sq / count as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::full_frame;
    use pretty_assertions::assert_eq;

    fn anxious(anxiety: f64) -> EmotionScores {
        full_frame(&[(Emotion::Anxiety, anxiety)])
    }

    #[test]
    fn test_composite_scenario() {
        let mut analyzer = AnxietyAnalyzer::default();
        let frame = full_frame(&[(Emotion::Anxiety, 60.0), (Emotion::Fear, 40.0)]);
        let result = analyzer.analyze(&frame);
        assert_eq!(result.anxiety_score, 42.0);
        assert_eq!(result.anxiety_level, AnxietyLevel::Medium);
        assert_eq!(result.trend, AnxietyTrend::InsufficientData);
        assert_eq!(result.confidence, 50.0);
        assert_eq!(result.contributing_emotions, vec![Emotion::Anxiety, Emotion::Fear]);
    }

    #[test]
    fn test_happiness_lowers_composite_but_not_below_zero() {
        let analyzer = AnxietyAnalyzer::default();
        let frame = full_frame(&[(Emotion::Happy, 100.0)]);
        assert_eq!(analyzer.composite(&frame), 0.0);
    }

    #[test]
    fn test_identical_scores_are_stable_with_full_confidence() {
        let mut analyzer = AnxietyAnalyzer::default();
        let mut last = None;
        for _ in 0..30 {
            last = Some(analyzer.analyze(&anxious(50.0)));
        }
        let result = last.unwrap();
        assert_eq!(result.trend, AnxietyTrend::Stable);
        assert_eq!(result.confidence, 100.0);
        assert_eq!(analyzer.len(), 30);
    }

    #[test]
    fn test_rising_scores_are_increasing() {
        let mut analyzer = AnxietyAnalyzer::default();
        for _ in 0..5 {
            analyzer.analyze(&anxious(20.0));
        }
        let mut last = None;
        for _ in 0..5 {
            last = Some(analyzer.analyze(&anxious(80.0)));
        }
        let result = last.unwrap();
        assert_eq!(result.trend, AnxietyTrend::Increasing);
        // composite 40 * 1.1 = 44 stays medium
        assert_eq!(result.anxiety_score, 40.0);
        assert_eq!(result.anxiety_level, AnxietyLevel::Medium);
    }

    #[test]
    fn test_increasing_trend_can_raise_level() {
        let mut analyzer = AnxietyAnalyzer::default();
        for _ in 0..5 {
            analyzer.analyze(&anxious(0.0));
        }
        let mut last = None;
        for _ in 0..5 {
            last = Some(analyzer.analyze(&anxious(84.0)));
        }
        // composite 42 * 1.1 = 46.2 crosses into high
        assert_eq!(last.unwrap().anxiety_level, AnxietyLevel::High);
    }

    #[test]
    fn test_falling_scores_are_decreasing() {
        let mut analyzer = AnxietyAnalyzer::default();
        for _ in 0..5 {
            analyzer.analyze(&anxious(90.0));
        }
        for _ in 0..5 {
            analyzer.analyze(&anxious(10.0));
        }
        assert_eq!(analyzer.trend(), AnxietyTrend::Decreasing);
    }

    #[test]
    fn test_ring_buffer_is_capped() {
        let mut analyzer = AnxietyAnalyzer::default();
        for i in 0..100 {
            analyzer.analyze(&anxious(i as f64));
        }
        assert_eq!(analyzer.len(), 30);
        // window holds inputs 70..=99 -> composites 35.0..=49.5
        let summary = analyzer.summary();
        assert_eq!(summary.min, 35.0);
        assert_eq!(summary.max, 49.5);
        assert_eq!(summary.current, 49.5);
    }

    #[test]
    fn test_unvalidated_high_floor_caps_confidence() {
        let mut analyzer = AnxietyAnalyzer::new(AnxietyConfig {
            confidence_floor: 150.0,
            ..AnxietyConfig::default()
        });
        let mut last = None;
        for i in 0..12 {
            last = Some(analyzer.analyze(&anxious(10.0 * (i % 3) as f64)));
        }
        assert_eq!(last.unwrap().confidence, 100.0);
    }

    #[test]
    fn test_empty_summary_is_zero() {
        assert_eq!(AnxietyAnalyzer::default().summary(), AnxietySummary::default());
    }

    #[test]
    fn test_reset_clears_window() {
        let mut analyzer = AnxietyAnalyzer::default();
        analyzer.analyze(&anxious(50.0));
        analyzer.reset();
        assert!(analyzer.is_empty());
        assert_eq!(analyzer.trend(), AnxietyTrend::InsufficientData);
    }

    #[test]
    fn test_no_contributors_is_empty() {
        let analyzer = AnxietyAnalyzer::default();
        let frame = full_frame(&[(Emotion::Happy, 90.0), (Emotion::Surprise, 60.0)]);
        assert!(analyzer.contributors(&frame).is_empty());
    }

    #[test]
    fn test_levels_serialize_in_dialogue_language() {
        let json = serde_json::to_string(&AnxietyLevel::VeryHigh).unwrap();
        assert_eq!(json, r#""muy_alta""#);
        let json = serde_json::to_string(&AnxietyTrend::InsufficientData).unwrap();
        assert_eq!(json, r#""insufficient_data""#);
    }
}
