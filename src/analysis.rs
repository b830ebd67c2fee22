use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest article excerpt kept with a stored analysis, in characters.
pub const EXCERPT_CHARS: usize = 500;

/// Shortest article text the service accepts for scoring, in characters.
pub const MIN_ARTICLE_CHARS: usize = 50;

// ==========================================
// 1. Verdicts
// ==========================================

/// Final binary classification of an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Real,
    Fake,
}

/// A single pseudo-model's opinion. Serialized capitalized (`"Real"` / `"Fake"`),
/// unlike [`Verdict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Prediction {
    Real,
    Fake,
}

impl Verdict {
    pub fn from_fake(is_fake: bool) -> Self {
        if is_fake {
            Verdict::Fake
        } else {
            Verdict::Real
        }
    }

    pub fn prediction(self) -> Prediction {
        match self {
            Verdict::Real => Prediction::Real,
            Verdict::Fake => Prediction::Fake,
        }
    }
}

impl Prediction {
    pub fn verdict(self) -> Verdict {
        match self {
            Prediction::Real => Verdict::Real,
            Prediction::Fake => Verdict::Fake,
        }
    }
}

// ==========================================
// 2. Pseudo-models
// ==========================================

/// The four named rows of the ensemble view.
///
/// They are not independent classifiers: every row repeats the consensus score with
/// its own noise band. Declaration order is the output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelName {
    #[serde(rename = "Logistic Regression")]
    LogisticRegression,
    #[serde(rename = "Decision Tree")]
    DecisionTree,
    #[serde(rename = "Gradient Boosting")]
    GradientBoosting,
    #[serde(rename = "Random Forest")]
    RandomForest,
}

impl ModelName {
    pub const ALL: [ModelName; 4] = [
        ModelName::LogisticRegression,
        ModelName::DecisionTree,
        ModelName::GradientBoosting,
        ModelName::RandomForest,
    ];

    /// Half-width of the uniform noise added to the consensus confidence.
    pub fn jitter_half_width(self) -> f64 {
        match self {
            ModelName::LogisticRegression => 3.0,
            ModelName::DecisionTree => 5.0,
            ModelName::GradientBoosting => 2.0,
            ModelName::RandomForest => 2.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelResult {
    pub name: ModelName,
    pub prediction: Prediction,
    /// Always within `[75, 99]`.
    pub confidence: u8,
}

/// What a scoring pass hands back to the caller (and what `/api/analyze` returns).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub verdict: Verdict,
    pub confidence: u8,
    pub models: [ModelResult; 4],
}

// ==========================================
// 3. Stored records
// ==========================================

/// One completed scoring event. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: Uuid,
    /// First [`EXCERPT_CHARS`] characters of the submitted text.
    pub article_text: String,
    pub verdict: Verdict,
    pub confidence: u8,
    pub model_predictions: [ModelResult; 4],
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a store; id and timestamp are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnalysis {
    pub article_text: String,
    pub verdict: Verdict,
    pub confidence: u8,
    pub model_predictions: [ModelResult; 4],
}

impl NewAnalysis {
    /// Builds the insert payload for a scored article, truncating the text.
    pub fn from_score(text: &str, result: &ScoreResult) -> Self {
        Self {
            article_text: excerpt(text).to_string(),
            verdict: result.verdict,
            confidence: result.confidence,
            model_predictions: result.models,
        }
    }

    pub(crate) fn into_record(self, created_at: DateTime<Utc>) -> AnalysisRecord {
        AnalysisRecord {
            id: Uuid::new_v4(),
            article_text: excerpt(&self.article_text).to_string(),
            verdict: self.verdict,
            confidence: self.confidence,
            model_predictions: self.model_predictions,
            created_at,
        }
    }
}

/// Returns at most the first [`EXCERPT_CHARS`] characters of `text`.
pub fn excerpt(text: &str) -> &str {
    match text.char_indices().nth(EXCERPT_CHARS) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

// ==========================================
// 4. Aggregates
// ==========================================

/// Raw counters as kept by a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisCounts {
    pub total_scans: u64,
    pub fake_count: u64,
    pub real_count: u64,
}

impl AnalysisCounts {
    pub fn tally(&mut self, verdict: Verdict) {
        self.total_scans += 1;
        match verdict {
            Verdict::Fake => self.fake_count += 1,
            Verdict::Real => self.real_count += 1,
        }
    }
}

/// Counters plus the derived percentages served by `/api/stats`.
///
/// Each percentage is rounded on its own, so the pair may sum to 99 or 101.
/// An empty store reports 0 / 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub total_scans: u64,
    pub fake_count: u64,
    pub real_count: u64,
    pub fake_percentage: u8,
    pub real_percentage: u8,
}

impl AggregateStats {
    pub fn from_counts(counts: AnalysisCounts) -> Self {
        let total = counts.total_scans.max(1);
        Self {
            total_scans: counts.total_scans,
            fake_count: counts.fake_count,
            real_count: counts.real_count,
            fake_percentage: percentage(counts.fake_count, total),
            real_percentage: percentage(counts.real_count, total),
        }
    }
}

fn percentage(part: u64, total: u64) -> u8 {
    let pct = (part as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}
