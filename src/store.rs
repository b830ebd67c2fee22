use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::analysis::{AnalysisCounts, AnalysisRecord, NewAnalysis, ScoreResult};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(#[from] sled::Error),

    #[error("record encoding error: {0}")]
    Encoding(#[from] bcs::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Append-only record keeper for completed analyses.
///
/// Implementations serialize `create_analysis` calls against each other and answer reads
/// from a consistent snapshot. Records are never altered or removed.
pub trait AnalysisStore: Send + Sync {
    /// Stamps `analysis` with a fresh id and the current time, then appends it.
    fn create_analysis(&self, analysis: NewAnalysis) -> StoreResult<AnalysisRecord>;

    /// Up to `limit` records, most recent first.
    fn recent_analyses(&self, limit: usize) -> StoreResult<Vec<AnalysisRecord>>;

    fn analysis_stats(&self) -> StoreResult<AnalysisCounts>;

    /// Records a scored article; the text is cut to the excerpt length first.
    fn record(&self, text: &str, result: &ScoreResult) -> StoreResult<AnalysisRecord> {
        self.create_analysis(NewAnalysis::from_score(text, result))
    }
}

/// Never earlier than `previous`, so a clock step backwards cannot reorder the history.
pub(crate) fn next_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if prev > now => prev,
        _ => now,
    }
}

/// Process-lifetime store. Records live in insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<AnalysisRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AnalysisStore for MemoryStore {
    fn create_analysis(&self, analysis: NewAnalysis) -> StoreResult<AnalysisRecord> {
        let mut records = self.records.write();
        let created_at = next_timestamp(records.last().map(|r| r.created_at));
        let record = analysis.into_record(created_at);
        records.push(record.clone());
        tracing::debug!(id = %record.id, verdict = ?record.verdict, "analysis stored in memory");
        Ok(record)
    }

    fn recent_analyses(&self, limit: usize) -> StoreResult<Vec<AnalysisRecord>> {
        let records = self.records.read();
        // Timestamps never decrease, so reverse insertion order is newest first.
        Ok(records.iter().rev().take(limit).cloned().collect())
    }

    fn analysis_stats(&self) -> StoreResult<AnalysisCounts> {
        let records = self.records.read();
        let mut counts = AnalysisCounts::default();
        for record in records.iter() {
            counts.tally(record.verdict);
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ModelName, ModelResult, Verdict, EXCERPT_CHARS};
    use std::sync::Arc;
    use std::thread;

    fn scored(verdict: Verdict) -> ScoreResult {
        let prediction = verdict.prediction();
        ScoreResult {
            verdict,
            confidence: 80,
            models: ModelName::ALL.map(|name| ModelResult {
                name,
                prediction,
                confidence: 80,
            }),
        }
    }

    #[test]
    fn counts_follow_inserts() {
        let store = MemoryStore::new();
        for i in 0..7 {
            let verdict = if i % 3 == 0 { Verdict::Fake } else { Verdict::Real };
            store.record("some article text", &scored(verdict)).unwrap();
        }
        let counts = store.analysis_stats().unwrap();
        assert_eq!(counts.total_scans, 7);
        assert_eq!(counts.fake_count, 3);
        assert_eq!(counts.real_count, 4);
        assert_eq!(counts.fake_count + counts.real_count, counts.total_scans);
    }

    #[test]
    fn recent_is_newest_first_and_bounded() {
        let store = MemoryStore::new();
        let mut ids = Vec::new();
        for i in 0..5 {
            let record = store.record(&format!("article {i}"), &scored(Verdict::Real)).unwrap();
            ids.push(record.id);
        }

        let recent = store.recent_analyses(3).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].id, ids[4]);
        assert_eq!(recent[2].id, ids[2]);
        assert!(recent.windows(2).all(|w| w[0].created_at >= w[1].created_at));

        assert_eq!(store.recent_analyses(50).unwrap().len(), 5);
        assert!(store.recent_analyses(0).unwrap().is_empty());
    }

    #[test]
    fn empty_store_answers_reads() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert!(store.recent_analyses(10).unwrap().is_empty());
        assert_eq!(store.analysis_stats().unwrap(), AnalysisCounts::default());
    }

    #[test]
    fn record_truncates_text() {
        let store = MemoryStore::new();
        let text = "a".repeat(EXCERPT_CHARS * 2);
        let record = store.record(&text, &scored(Verdict::Fake)).unwrap();
        assert_eq!(record.article_text.chars().count(), EXCERPT_CHARS);
        assert_eq!(record.model_predictions[0].name, ModelName::LogisticRegression);
    }

    #[test]
    fn concurrent_creates_lose_nothing() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..50 {
                        let verdict = if t % 2 == 0 { Verdict::Fake } else { Verdict::Real };
                        store.record("threaded article", &scored(verdict)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let counts = store.analysis_stats().unwrap();
        assert_eq!(counts.total_scans, 400);
        assert_eq!(counts.fake_count, 200);
        assert_eq!(store.len(), 400);

        let all = store.recent_analyses(400).unwrap();
        assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[test]
    fn timestamps_never_step_back() {
        let future = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(next_timestamp(Some(future)), future);
        assert!(next_timestamp(None) <= Utc::now());
    }
}
