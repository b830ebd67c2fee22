use std::path::Path;

use parking_lot::Mutex;

use crate::analysis::{AnalysisCounts, AnalysisRecord, NewAnalysis};
use crate::store::{next_timestamp, AnalysisStore, StoreResult};

const TREE_NAME: &str = "analyses";

/// Durable analysis store on top of sled.
///
/// **Layout**: one tree, `analyses`. Keys are big-endian ids from
/// `Db::generate_id`, which only grow, so key order is insertion order and a reverse
/// scan yields the newest records first. Values are `bcs`-encoded [`AnalysisRecord`]s.
///
/// **Writes**: `writer` serializes appends so two requests cannot interleave the
/// "read last timestamp, insert" pair. Reads go straight to the tree; sled gives each
/// iterator a consistent view of every completed insert.
pub struct SledStore {
    db: sled::Db,
    tree: sled::Tree,
    writer: Mutex<()>,
}

impl SledStore {
    /// Opens (or creates) the database directory at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = sled::open(path.as_ref())?;
        Self::from_db(db)
    }

    /// Database that is removed when dropped. Used by tests and benches.
    pub fn temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> StoreResult<Self> {
        let tree = db.open_tree(TREE_NAME)?;
        tracing::info!(records = tree.len(), "analysis database opened");
        Ok(Self {
            db,
            tree,
            writer: Mutex::new(()),
        })
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Blocks until every write so far is on disk.
    pub fn flush(&self) -> StoreResult<()> {
        self.tree.flush()?;
        Ok(())
    }

    fn last_record(&self) -> StoreResult<Option<AnalysisRecord>> {
        match self.tree.last()? {
            Some((_, value)) => Ok(Some(bcs::from_bytes(&value)?)),
            None => Ok(None),
        }
    }
}

impl AnalysisStore for SledStore {
    fn create_analysis(&self, analysis: NewAnalysis) -> StoreResult<AnalysisRecord> {
        let _guard = self.writer.lock();

        let previous = self.last_record()?.map(|r| r.created_at);
        let record = analysis.into_record(next_timestamp(previous));

        let key = self.db.generate_id()?.to_be_bytes();
        let value = bcs::to_bytes(&record)?;
        self.tree.insert(key, value)?;

        tracing::debug!(id = %record.id, verdict = ?record.verdict, "analysis persisted");
        Ok(record)
    }

    fn recent_analyses(&self, limit: usize) -> StoreResult<Vec<AnalysisRecord>> {
        let mut out = Vec::new();
        for entry in self.tree.iter().rev().take(limit) {
            let (_, value) = entry?;
            out.push(bcs::from_bytes(&value)?);
        }
        Ok(out)
    }

    fn analysis_stats(&self) -> StoreResult<AnalysisCounts> {
        let mut counts = AnalysisCounts::default();
        for entry in self.tree.iter() {
            let (_, value) = entry?;
            let record: AnalysisRecord = bcs::from_bytes(&value)?;
            counts.tally(record.verdict);
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ModelName, ModelResult, ScoreResult, Verdict};
    use std::sync::Arc;

    fn scored(verdict: Verdict, confidence: u8) -> ScoreResult {
        let prediction = verdict.prediction();
        ScoreResult {
            verdict,
            confidence,
            models: ModelName::ALL.map(|name| ModelResult {
                name,
                prediction,
                confidence,
            }),
        }
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analyses");

        let first = {
            let store = SledStore::open(&path).unwrap();
            let first = store.record("first article", &scored(Verdict::Fake, 81)).unwrap();
            store.record("second article", &scored(Verdict::Real, 90)).unwrap();
            store.flush().unwrap();
            first
        };

        let store = SledStore::open(&path).unwrap();
        assert_eq!(store.len(), 2);

        let counts = store.analysis_stats().unwrap();
        assert_eq!(counts.total_scans, 2);
        assert_eq!(counts.fake_count, 1);
        assert_eq!(counts.real_count, 1);

        let recent = store.recent_analyses(10).unwrap();
        assert_eq!(recent[1], first);
        assert_eq!(recent[0].article_text, "second article");
        assert_eq!(recent[0].model_predictions[3].name, ModelName::RandomForest);
    }

    #[test]
    fn recent_respects_limit_and_order() {
        let store = SledStore::temporary().unwrap();
        assert!(store.recent_analyses(5).unwrap().is_empty());

        for i in 0..6u8 {
            store.record(&format!("article {i}"), &scored(Verdict::Real, 75 + i)).unwrap();
        }

        let recent = store.recent_analyses(4).unwrap();
        let confidences: Vec<u8> = recent.iter().map(|r| r.confidence).collect();
        assert_eq!(confidences, vec![80, 79, 78, 77]);
        assert!(recent.windows(2).all(|w| w[0].created_at >= w[1].created_at));
        assert!(store.recent_analyses(0).unwrap().is_empty());
    }

    #[test]
    fn concurrent_appends_are_all_kept() {
        let store = Arc::new(SledStore::temporary().unwrap());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        store.record("parallel", &scored(Verdict::Fake, 88)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.analysis_stats().unwrap().total_scans, 100);
    }
}
