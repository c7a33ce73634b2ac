//! Core types for the FaceSense pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: per-region facial ratios, per-emotion scores, and the ordered
//! label distributions consumed by multimodal fusion.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Emotions scored from facial geometry.
///
/// Declaration order is significant: every argmax in the crate breaks exact
/// ties in favour of the emotion declared first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Angry,
    Fear,
    Sad,
    Happy,
    Surprise,
    Disgust,
    Anxiety,
}

impl Emotion {
    /// All emotions in declaration order
    pub const ALL: [Emotion; 7] = [
        Emotion::Angry,
        Emotion::Fear,
        Emotion::Sad,
        Emotion::Happy,
        Emotion::Surprise,
        Emotion::Disgust,
        Emotion::Anxiety,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Fear => "fear",
            Emotion::Sad => "sad",
            Emotion::Happy => "happy",
            Emotion::Surprise => "surprise",
            Emotion::Disgust => "disgust",
            Emotion::Anxiety => "anxiety",
        }
    }

    /// Parse a canonical (English, lowercase) emotion label
    pub fn from_label(label: &str) -> Option<Emotion> {
        let label = label.trim().to_lowercase();
        Emotion::ALL.into_iter().find(|e| e.as_str() == label)
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Facial region measured by the feature extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Eyebrows,
    Eyes,
    Nose,
    Mouth,
}

/// Per-frame facial measurements, one map of named ratios per region.
///
/// Values are expected in [0, 1], pre-normalized by a face-width reference.
/// Reads through [`RegionFeatures::get`] never fail: absent keys (occluded
/// regions) read as 0.0 and out-of-range values are clamped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionFeatures {
    pub eyebrows: BTreeMap<String, f64>,
    pub eyes: BTreeMap<String, f64>,
    pub nose: BTreeMap<String, f64>,
    pub mouth: BTreeMap<String, f64>,
}

impl RegionFeatures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, region: Region, key: &str, value: f64) -> Self {
        self.set(region, key, value);
        self
    }

    pub fn set(&mut self, region: Region, key: &str, value: f64) {
        self.region_mut(region).insert(key.to_string(), value);
    }

    pub fn region(&self, region: Region) -> &BTreeMap<String, f64> {
        match region {
            Region::Eyebrows => &self.eyebrows,
            Region::Eyes => &self.eyes,
            Region::Nose => &self.nose,
            Region::Mouth => &self.mouth,
        }
    }

    fn region_mut(&mut self, region: Region) -> &mut BTreeMap<String, f64> {
        match region {
            Region::Eyebrows => &mut self.eyebrows,
            Region::Eyes => &mut self.eyes,
            Region::Nose => &mut self.nose,
            Region::Mouth => &mut self.mouth,
        }
    }

    /// Read a ratio, defaulting to 0.0 and clamping into [0, 1]
    pub fn get(&self, region: Region, key: &str) -> f64 {
        match self.region(region).get(key) {
            Some(v) if v.is_finite() => v.clamp(0.0, 1.0),
            Some(v) => {
                tracing::warn!(?region, key, value = %v, "non-finite feature value, using 0.0");
                0.0
            }
            None => 0.0,
        }
    }
}

/// Per-emotion scores (0-100) for a single frame or aggregate.
///
/// Iteration follows [`Emotion`] declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmotionScores(BTreeMap<Emotion, f64>);

impl EmotionScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score for an emotion, 0.0 when absent
    pub fn get(&self, emotion: Emotion) -> f64 {
        self.0.get(&emotion).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, emotion: Emotion) -> bool {
        self.0.contains_key(&emotion)
    }

    pub fn insert(&mut self, emotion: Emotion, score: f64) {
        self.0.insert(emotion, score);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f64)> + '_ {
        self.0.iter().map(|(e, s)| (*e, *s))
    }

    pub fn emotions(&self) -> impl Iterator<Item = Emotion> + '_ {
        self.0.keys().copied()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut f64> {
        self.0.values_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    /// Argmax emotion and its score; the first declared emotion wins ties
    pub fn dominant(&self) -> Option<(Emotion, f64)> {
        let mut best: Option<(Emotion, f64)> = None;
        for (emotion, score) in self.iter() {
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((emotion, score)),
            }
        }
        best
    }

    /// Emotions sorted by descending score (stable for ties)
    pub fn ranked(&self) -> Vec<(Emotion, f64)> {
        let mut ranked: Vec<(Emotion, f64)> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }
}

impl FromIterator<(Emotion, f64)> for EmotionScores {
    fn from_iter<I: IntoIterator<Item = (Emotion, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Open-vocabulary label distribution that remembers insertion order.
///
/// Used for the text modality, whose labels may come from another vocabulary,
/// and for fused results. Inserting an existing label replaces its value in
/// place. Serializes as a JSON object in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelScores {
    entries: Vec<(String, f64)>,
}

impl LabelScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, value: f64) {
        let label = label.into();
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((label, value)),
        }
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.entries.iter().map(|(l, v)| (l.as_str(), *v))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Argmax label and value; the first-inserted label wins ties
    pub fn argmax(&self) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for (label, value) in self.iter() {
            match best {
                Some((_, top)) if value <= top => {}
                _ => best = Some((label, value)),
            }
        }
        best
    }

    /// Copy with every value rounded to `decimals` places
    pub fn rounded(&self, decimals: i32) -> LabelScores {
        self.iter()
            .map(|(l, v)| (l.to_string(), round_to(v, decimals)))
            .collect()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for LabelScores {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut scores = LabelScores::new();
        for (label, value) in iter {
            scores.insert(label, value);
        }
        scores
    }
}

impl From<&EmotionScores> for LabelScores {
    fn from(scores: &EmotionScores) -> Self {
        scores.iter().map(|(e, s)| (e.as_str(), s)).collect()
    }
}

impl Serialize for LabelScores {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, value) in &self.entries {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LabelScores {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LabelScoresVisitor;

        impl<'de> Visitor<'de> for LabelScoresVisitor {
            type Value = LabelScores;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of label to numeric score")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut scores = LabelScores::new();
                while let Some((label, value)) = access.next_entry::<String, f64>()? {
                    scores.insert(label, value);
                }
                Ok(scores)
            }
        }

        deserializer.deserialize_map(LabelScoresVisitor)
    }
}

/// Round to a fixed number of decimal places
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
