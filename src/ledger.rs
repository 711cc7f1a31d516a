//! Per-item progress records and their whole-blob persistence.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::MAX_MASTERY_LEVEL;
use crate::error::PersistenceError;
use crate::store::{keys, KeyValueStore};

const LEDGER_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    /// Bounded proxy for how well the learner knows the item,
    /// clamped to `0..=MAX_MASTERY_LEVEL` on every update.
    pub mastery_level: u8,
    pub total_attempts: u32,
    pub correct_attempts: u32,
    /// Epoch millis of the last review; `None` until first answered.
    pub last_reviewed_at: Option<i64>,
}

impl ProgressRecord {
    pub fn incorrect_attempts(&self) -> u32 {
        self.total_attempts.saturating_sub(self.correct_attempts)
    }

    pub fn accuracy(&self) -> f64 {
        if self.total_attempts == 0 {
            0.0
        } else {
            self.correct_attempts as f64 / self.total_attempts as f64
        }
    }
}

/// Aggregate view over all progress records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStats {
    pub tracked_words: usize,
    pub total_attempts: u64,
    pub total_correct: u64,
    pub accuracy: f64,
    pub mastered_words: usize,
    pub avg_mastery_level: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedLedger {
    version: u32,
    records: HashMap<String, ProgressRecord>,
}

/// Exclusive owner of all progress records. Lookups never fail: an unseen
/// key reads as a zero-valued record, created lazily on first answer.
pub struct ProgressLedger {
    store: Arc<dyn KeyValueStore>,
    records: HashMap<String, ProgressRecord>,
}

impl ProgressLedger {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let mut ledger = Self {
            store,
            records: HashMap::new(),
        };
        ledger.load_all();
        ledger
    }

    /// Bulk-load from the durable store. A missing blob starts empty; a
    /// corrupt or foreign-version blob logs and starts empty rather than
    /// failing the caller.
    pub fn load_all(&mut self) {
        let raw = match self.store.get(keys::PROGRESS) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read progress ledger, starting empty");
                return;
            }
        };

        match serde_json::from_str::<PersistedLedger>(&raw) {
            Ok(persisted) if persisted.version == LEDGER_SCHEMA_VERSION => {
                self.records = sanitize(persisted.records);
            }
            Ok(persisted) => {
                tracing::warn!(
                    version = persisted.version,
                    "unknown progress ledger version, starting empty"
                );
            }
            Err(err) => {
                tracing::warn!(error = %err, "corrupt progress ledger, starting empty");
            }
        }
    }

    /// Serializes the whole ledger and replaces the stored blob. Atomic
    /// w.r.t. the caller: on failure the previous blob stays intact.
    pub fn persist_all(&self) -> Result<(), PersistenceError> {
        let persisted = PersistedLedger {
            version: LEDGER_SCHEMA_VERSION,
            records: self.records.clone(),
        };
        let raw = serde_json::to_string(&persisted)
            .map_err(|e| PersistenceError::Write(e.to_string()))?;
        self.store.set(keys::PROGRESS, &raw)
    }

    /// Never fails: returns a zero-valued record when the key is unseen.
    pub fn get(&self, key: &str) -> ProgressRecord {
        self.records.get(key).cloned().unwrap_or_default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ProgressRecord)> {
        self.records.iter()
    }

    /// Applies one answer outcome: counters, ±1 mastery (clamped), last-seen
    /// timestamp, then persists. A persistence failure is logged and the
    /// updated in-memory record is still returned; the previously persisted
    /// blob is retained whole.
    pub fn apply(&mut self, key: &str, is_correct: bool, now_ms: i64) -> ProgressRecord {
        let record = self.records.entry(key.to_string()).or_default();
        record.total_attempts += 1;
        if is_correct {
            record.correct_attempts += 1;
            record.mastery_level = (record.mastery_level + 1).min(MAX_MASTERY_LEVEL);
        } else {
            record.mastery_level = record.mastery_level.saturating_sub(1);
        }
        record.last_reviewed_at = Some(now_ms);
        let updated = record.clone();

        if let Err(err) = self.persist_all() {
            tracing::warn!(error = %err, word = key, "failed to persist progress ledger");
        }
        updated
    }

    /// Explicit reset of one record.
    pub fn reset(&mut self, key: &str) {
        if self.records.remove(key).is_some() {
            if let Err(err) = self.persist_all() {
                tracing::warn!(error = %err, word = key, "failed to persist ledger reset");
            }
        }
    }

    /// Explicit reset of the whole ledger.
    pub fn reset_all(&mut self) {
        self.records.clear();
        if let Err(err) = self.store.remove(keys::PROGRESS) {
            tracing::warn!(error = %err, "failed to clear persisted progress ledger");
        }
    }

    pub fn stats(&self, mastered_threshold: u8) -> LedgerStats {
        let tracked_words = self.records.len();
        let total_attempts: u64 = self.records.values().map(|r| r.total_attempts as u64).sum();
        let total_correct: u64 = self
            .records
            .values()
            .map(|r| r.correct_attempts as u64)
            .sum();
        let mastered_words = self
            .records
            .values()
            .filter(|r| r.mastery_level >= mastered_threshold)
            .count();
        let mastery_sum: u64 = self.records.values().map(|r| r.mastery_level as u64).sum();

        LedgerStats {
            tracked_words,
            total_attempts,
            total_correct,
            accuracy: if total_attempts == 0 {
                0.0
            } else {
                total_correct as f64 / total_attempts as f64
            },
            mastered_words,
            avg_mastery_level: if tracked_words == 0 {
                0.0
            } else {
                mastery_sum as f64 / tracked_words as f64
            },
        }
    }
}

/// Persisted data is untrusted: a record violating the counter or mastery
/// bounds is clamped rather than letting it poison downstream math.
fn sanitize(records: HashMap<String, ProgressRecord>) -> HashMap<String, ProgressRecord> {
    records
        .into_iter()
        .map(|(key, mut record)| {
            if record.correct_attempts > record.total_attempts
                || record.mastery_level > MAX_MASTERY_LEVEL
            {
                tracing::warn!(word = %key, "clamping out-of-bounds progress record");
                record.correct_attempts = record.correct_attempts.min(record.total_attempts);
                record.mastery_level = record.mastery_level.min(MAX_MASTERY_LEVEL);
            }
            (key, record)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const NOW_MS: i64 = 1_700_000_000_000;

    fn ledger() -> ProgressLedger {
        ProgressLedger::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn unseen_key_reads_as_zero_record() {
        let ledger = ledger();
        let record = ledger.get("cat");
        assert_eq!(record, ProgressRecord::default());
        assert!(!ledger.contains("cat"));
    }

    #[test]
    fn correct_answer_advances_mastery() {
        let mut ledger = ledger();
        let record = ledger.apply("cat", true, NOW_MS);
        assert_eq!(record.mastery_level, 1);
        assert_eq!(record.total_attempts, 1);
        assert_eq!(record.correct_attempts, 1);
        assert_eq!(record.last_reviewed_at, Some(NOW_MS));
    }

    #[test]
    fn mastery_is_clamped_at_cap() {
        let mut ledger = ledger();
        for _ in 0..20 {
            ledger.apply("cat", true, NOW_MS);
        }
        assert_eq!(ledger.get("cat").mastery_level, MAX_MASTERY_LEVEL);
    }

    #[test]
    fn three_incorrect_from_level_two_floors_at_zero() {
        let mut ledger = ledger();
        ledger.apply("cat", true, NOW_MS);
        ledger.apply("cat", true, NOW_MS);
        assert_eq!(ledger.get("cat").mastery_level, 2);

        for _ in 0..3 {
            ledger.apply("cat", false, NOW_MS);
        }
        let record = ledger.get("cat");
        assert_eq!(record.mastery_level, 0);
        assert_eq!(record.total_attempts, 5);
        assert_eq!(record.correct_attempts, 2);
    }

    #[test]
    fn persist_then_load_round_trips() {
        let store = Arc::new(MemoryStore::new());
        {
            let mut ledger = ProgressLedger::new(Arc::clone(&store) as Arc<dyn KeyValueStore>);
            ledger.apply("cat", true, NOW_MS);
            ledger.apply("dog", false, NOW_MS + 1);
        }

        let reloaded = ProgressLedger::new(store);
        assert_eq!(reloaded.get("cat").mastery_level, 1);
        assert_eq!(reloaded.get("dog").total_attempts, 1);
        assert_eq!(reloaded.get("dog").last_reviewed_at, Some(NOW_MS + 1));
    }

    #[test]
    fn corrupt_blob_starts_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(keys::PROGRESS, "not json").unwrap();

        let ledger = ProgressLedger::new(store);
        assert_eq!(ledger.iter().count(), 0);
    }

    #[test]
    fn out_of_bounds_persisted_record_is_clamped() {
        let store = Arc::new(MemoryStore::new());
        let raw = r#"{"version":1,"records":{"cat":{"masteryLevel":9,"totalAttempts":2,"correctAttempts":5,"lastReviewedAt":null}}}"#;
        store.set(keys::PROGRESS, raw).unwrap();

        let ledger = ProgressLedger::new(store);
        let record = ledger.get("cat");
        assert_eq!(record.correct_attempts, 2);
        assert_eq!(record.total_attempts, 2);
        assert_eq!(record.mastery_level, MAX_MASTERY_LEVEL);
        assert_eq!(record.incorrect_attempts(), 0);
    }

    #[test]
    fn incorrect_attempts_never_underflow() {
        let record = ProgressRecord {
            mastery_level: 1,
            total_attempts: 2,
            correct_attempts: 5,
            last_reviewed_at: None,
        };
        assert_eq!(record.incorrect_attempts(), 0);
    }

    #[test]
    fn stats_counts_mastered_words() {
        let mut ledger = ledger();
        for _ in 0..5 {
            ledger.apply("cat", true, NOW_MS);
        }
        ledger.apply("dog", true, NOW_MS);

        let stats = ledger.stats(5);
        assert_eq!(stats.tracked_words, 2);
        assert_eq!(stats.mastered_words, 1);
        assert_eq!(stats.total_attempts, 6);
        assert!((stats.accuracy - 1.0).abs() < f64::EPSILON);
    }
}
