use rand::Rng;
use regex::Regex;

use crate::analysis::{ModelName, ModelResult, ScoreResult, Verdict};

/// Phrases that push an article towards "fake". Matched as lower-case substrings.
pub const FAKE_INDICATORS: [&str; 14] = [
    "shocking",
    "unbelievable",
    "you won't believe",
    "breaking",
    "exclusive",
    "they don't want you to know",
    "must see",
    "viral",
    "exposed",
    "secret",
    "hidden truth",
    "mainstream media",
    "wake up",
    "share before removed",
];

/// Phrases that push an article towards "real". Matched as lower-case substrings.
pub const REAL_INDICATORS: [&str; 14] = [
    "according to",
    "reported",
    "study shows",
    "research",
    "officials",
    "statement",
    "investigation",
    "analysis",
    "data",
    "evidence",
    "expert",
    "published",
    "confirmed",
    "announced",
];

const BASE_SCORE: f64 = 50.0;
const INDICATOR_WEIGHT: f64 = 8.0;
const MAX_SCORE: f64 = 100.0;

/// Width of the noise applied to the consensus before clamping.
const CONSENSUS_JITTER: f64 = 5.0;
const MIN_CONFIDENCE: f64 = 75.0;
const MAX_CONFIDENCE: f64 = 99.0;

const QUOTE_CHARS: [char; 6] = ['"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}'];

/// Whole words of four or more capital letters ("SHOCKING", "EXPOSED").
const SHOUTING_PATTERN: &str = r"\b[A-Z]{4,}\b";

/// Source of the uniform noise the analyzer mixes into its confidences.
///
/// Every `rand::Rng` is a `Jitter`; tests substitute a scripted one to pin the
/// sequence.
pub trait Jitter {
    /// A value in `[-half_width, +half_width]`.
    fn uniform(&mut self, half_width: f64) -> f64;
}

impl<R: Rng + ?Sized> Jitter for R {
    fn uniform(&mut self, half_width: f64) -> f64 {
        if half_width <= 0.0 {
            return 0.0;
        }
        self.gen_range(-half_width..=half_width)
    }
}

/// Deterministic half of the heuristic: the two competing scores, each in `[50, 100]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawScores {
    pub fake: f64,
    pub real: f64,
}

impl RawScores {
    /// Strictly greater; a tie reads as real.
    pub fn is_fake(&self) -> bool {
        self.fake > self.real
    }

    pub fn verdict(&self) -> Verdict {
        Verdict::from_fake(self.is_fake())
    }

    pub fn margin(&self) -> f64 {
        (self.fake - self.real).abs()
    }
}

/// Keyword / punctuation heuristic behind the "ensemble" verdict.
///
/// Holds no mutable state; share it behind an `Arc` and call it from any thread.
#[derive(Debug, Clone)]
pub struct Analyzer {
    shouting: Regex,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    pub fn new() -> Self {
        Self {
            shouting: Regex::new(SHOUTING_PATTERN).expect("shouting pattern is a valid regex"),
        }
    }

    /// Scores `text` with thread-local randomness.
    pub fn analyze(&self, text: &str) -> ScoreResult {
        self.analyze_with(text, &mut rand::thread_rng())
    }

    /// Scores `text`, drawing the consensus noise first and then one draw per model
    /// in output order.
    pub fn analyze_with<J: Jitter + ?Sized>(&self, text: &str, jitter: &mut J) -> ScoreResult {
        let scores = self.raw_scores(text);
        let verdict = scores.verdict();

        let variance = jitter.uniform(CONSENSUS_JITTER);
        let overall = clamp_confidence(scores.margin() + variance);

        let prediction = verdict.prediction();
        let models = ModelName::ALL.map(|name| {
            let noisy = (overall + jitter.uniform(name.jitter_half_width())).round();
            ModelResult {
                name,
                prediction,
                confidence: clamp_confidence(noisy) as u8,
            }
        });

        tracing::debug!(
            fake = scores.fake,
            real = scores.real,
            ?verdict,
            overall,
            "scored article"
        );

        ScoreResult {
            verdict,
            confidence: overall.round() as u8,
            models,
        }
    }

    pub fn raw_scores(&self, text: &str) -> RawScores {
        let lower = text.to_lowercase();
        let length = text.chars().count();
        RawScores {
            fake: self.fake_score(text, &lower, length),
            real: real_score(&lower, length),
        }
    }

    fn fake_score(&self, text: &str, lower: &str, length: usize) -> f64 {
        let mut score = BASE_SCORE;

        score += indicator_hits(lower, &FAKE_INDICATORS) as f64 * INDICATOR_WEIGHT;

        let marks = lower.chars().filter(|c| matches!(c, '!' | '?')).count();
        score += (marks as f64 * 0.5).min(15.0);

        // Casing is only visible on the text as submitted.
        let shouting = self.shouting.find_iter(text).count();
        score += (shouting as f64 * 2.0).min(10.0);

        if length < 300 {
            score += 10.0;
        }

        score.min(MAX_SCORE)
    }
}

fn real_score(lower: &str, length: usize) -> f64 {
    let mut score = BASE_SCORE;

    score += indicator_hits(lower, &REAL_INDICATORS) as f64 * INDICATOR_WEIGHT;

    if length > 500 {
        score += 10.0;
    }
    if length > 1000 {
        score += 10.0;
    }

    // N periods make N + 1 segments, so text without any period still earns 0.3.
    let segments = lower.split('.').count();
    score += (segments as f64 * 0.3).min(15.0);

    let quotes = lower.chars().filter(|c| QUOTE_CHARS.contains(c)).count();
    score += (quotes as f64 * 0.5).min(10.0);

    score.min(MAX_SCORE)
}

/// Distinct phrases present; repeats of one phrase count once.
fn indicator_hits(lower: &str, phrases: &[&str]) -> usize {
    phrases.iter().filter(|phrase| lower.contains(*phrase)).count()
}

fn clamp_confidence(value: f64) -> f64 {
    value.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}
