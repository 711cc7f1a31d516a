//! Spaced-repetition core: which items are due at a point in time, and in
//! what order to present them.

use std::cmp::Ordering;

use crate::config::{SchedulerConfig, MILLIS_PER_DAY};
use crate::ledger::{ProgressLedger, ProgressRecord};
use crate::vocabulary::{VocabularyStore, WordFilter, WordRecord};

/// Pluggable ranking policy. The exact weighting is swappable; the ordering
/// contract (more overdue and less mastered sorts first) must hold.
pub trait PriorityPolicy: Send + Sync {
    fn score(&self, word: &WordRecord, record: &ProgressRecord, now_ms: i64) -> f64;
}

/// Default weighted-sum policy with named, tunable weights.
pub struct WeightedPriority {
    config: SchedulerConfig,
}

impl WeightedPriority {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }
}

impl PriorityPolicy for WeightedPriority {
    fn score(&self, word: &WordRecord, record: &ProgressRecord, now_ms: i64) -> f64 {
        let w = &self.config.priority;
        let mut score = 0.0;

        if record.last_reviewed_at.is_none() {
            score += w.never_reviewed_bonus;
        }
        let remaining = crate::config::MAX_MASTERY_LEVEL.saturating_sub(record.mastery_level);
        score += remaining as f64 * w.mastery_weight;
        score += record.incorrect_attempts() as f64 * w.incorrect_weight;
        // Signed overdue margin in days: positive past due, negative before.
        // Keeps not-yet-due items ranked by how soon they come due.
        score += overdue_days(&self.config, record, now_ms) * w.overdue_weight;
        score += word.frequency * w.frequency_weight;
        score
    }
}

/// Required gap for a mastery level, clamped to the table end.
pub fn required_gap_days(config: &SchedulerConfig, mastery_level: u8) -> u32 {
    let idx = (mastery_level as usize).min(config.gap_days.len().saturating_sub(1));
    config.gap_days.get(idx).copied().unwrap_or(1)
}

fn overdue_days(config: &SchedulerConfig, record: &ProgressRecord, now_ms: i64) -> f64 {
    match record.last_reviewed_at {
        Some(last) => {
            let gap_ms = required_gap_days(config, record.mastery_level) as i64 * MILLIS_PER_DAY;
            (now_ms - (last + gap_ms)) as f64 / MILLIS_PER_DAY as f64
        }
        None => 0.0,
    }
}

/// Due when never reviewed, at the mastery floor, or past the required gap.
pub fn is_due(config: &SchedulerConfig, record: &ProgressRecord, now_ms: i64) -> bool {
    match record.last_reviewed_at {
        None => true,
        Some(last) => {
            if record.mastery_level == 0 {
                return true;
            }
            let gap_ms = required_gap_days(config, record.mastery_level) as i64 * MILLIS_PER_DAY;
            now_ms - last >= gap_ms
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DueCounts {
    pub due: usize,
    /// Due items whose gap elapsed more than one full day ago.
    pub overdue: usize,
}

pub struct ReviewScheduler {
    config: SchedulerConfig,
    policy: Box<dyn PriorityPolicy>,
}

impl ReviewScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let policy = Box::new(WeightedPriority::new(config.clone()));
        Self { config, policy }
    }

    pub fn with_policy(config: SchedulerConfig, policy: Box<dyn PriorityPolicy>) -> Self {
        Self { config, policy }
    }

    /// Due items by descending priority, padded with the highest-priority
    /// not-yet-due items up to `min(n, catalog)`. When nothing is due the
    /// whole catalog is eligible again, so selection never stalls.
    pub fn select_for_session(
        &self,
        vocabulary: &VocabularyStore,
        ledger: &ProgressLedger,
        n: usize,
        filter: Option<&WordFilter>,
        now_ms: i64,
    ) -> Vec<String> {
        let mut due: Vec<(f64, &WordRecord)> = Vec::new();
        let mut backlog: Vec<(f64, &WordRecord)> = Vec::new();

        for word in vocabulary.iter() {
            if let Some(f) = filter {
                if !f.matches(word) {
                    continue;
                }
            }
            let record = ledger.get(&word.key);
            let score = self.policy.score(word, &record, now_ms);
            if is_due(&self.config, &record, now_ms) {
                due.push((score, word));
            } else {
                backlog.push((score, word));
            }
        }

        sort_by_priority(&mut due);
        sort_by_priority(&mut backlog);

        due.into_iter()
            .chain(backlog)
            .take(n)
            .map(|(_, word)| word.key.clone())
            .collect()
    }

    pub fn due_counts(&self, ledger: &ProgressLedger, now_ms: i64) -> DueCounts {
        let mut counts = DueCounts::default();
        for (_, record) in ledger.iter() {
            if is_due(&self.config, record, now_ms) {
                counts.due += 1;
                if overdue_days(&self.config, record, now_ms) > 1.0 {
                    counts.overdue += 1;
                }
            }
        }
        counts
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }
}

/// Descending score, ties broken by key so repeated calls with unchanged
/// state yield the same ordering.
fn sort_by_priority(items: &mut [(f64, &WordRecord)]) {
    items.sort_by(|(score_a, word_a), (score_b, word_b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(Ordering::Equal)
            .then_with(|| word_a.key.cmp(&word_b.key))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    const NOW_MS: i64 = 1_700_000_000_000;

    fn seeded_vocabulary() -> VocabularyStore {
        let mut store = VocabularyStore::new();
        store.load(&(|| Err::<String, _>(LoadError::Unavailable("test".to_string()))));
        store
    }

    fn empty_ledger() -> ProgressLedger {
        ProgressLedger::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn never_reviewed_item_is_selected() {
        let vocabulary = seeded_vocabulary();
        let ledger = empty_ledger();
        let scheduler = ReviewScheduler::new(SchedulerConfig::default());

        let selected = scheduler.select_for_session(&vocabulary, &ledger, 1, None, NOW_MS);
        assert_eq!(selected.len(), 1);

        // Every seed word is unreviewed; the chosen one must be due.
        let record = ledger.get(&selected[0]);
        assert!(is_due(scheduler.config(), &record, NOW_MS));
    }

    #[test]
    fn mastery_zero_is_always_due() {
        let config = SchedulerConfig::default();
        let record = ProgressRecord {
            mastery_level: 0,
            total_attempts: 3,
            correct_attempts: 1,
            last_reviewed_at: Some(NOW_MS),
        };
        assert!(is_due(&config, &record, NOW_MS));
    }

    #[test]
    fn gap_table_is_clamped_past_the_end() {
        let config = SchedulerConfig::default();
        assert_eq!(required_gap_days(&config, 0), 1);
        assert_eq!(required_gap_days(&config, 6), 120);
        assert_eq!(required_gap_days(&config, 20), 120);
    }

    #[test]
    fn item_becomes_due_after_gap_elapses() {
        let config = SchedulerConfig::default();
        let record = ProgressRecord {
            mastery_level: 2,
            total_attempts: 2,
            correct_attempts: 2,
            last_reviewed_at: Some(NOW_MS),
        };
        // Gap for level 2 is 7 days.
        assert!(!is_due(&config, &record, NOW_MS + 6 * MILLIS_PER_DAY));
        assert!(is_due(&config, &record, NOW_MS + 7 * MILLIS_PER_DAY));
    }

    #[test]
    fn selection_pads_with_not_due_items() {
        let vocabulary = seeded_vocabulary();
        let mut ledger = empty_ledger();
        let scheduler = ReviewScheduler::new(SchedulerConfig::default());

        // Review everything except "cat" just now, pushing them out of the
        // due window; "cat" stays unreviewed.
        for key in vocabulary.keys() {
            if key != "cat" {
                ledger.apply(key, true, NOW_MS);
            }
        }

        let n = vocabulary.len();
        let selected = scheduler.select_for_session(&vocabulary, &ledger, n, None, NOW_MS);
        assert_eq!(selected.len(), n);
        assert_eq!(selected[0], "cat");
    }

    #[test]
    fn selection_is_idempotent_without_updates() {
        let vocabulary = seeded_vocabulary();
        let mut ledger = empty_ledger();
        ledger.apply("cat", false, NOW_MS - 3 * MILLIS_PER_DAY);
        ledger.apply("run", true, NOW_MS - 10 * MILLIS_PER_DAY);
        let scheduler = ReviewScheduler::new(SchedulerConfig::default());

        let first = scheduler.select_for_session(&vocabulary, &ledger, 5, None, NOW_MS);
        let second = scheduler.select_for_session(&vocabulary, &ledger, 5, None, NOW_MS);
        assert_eq!(first, second);
    }

    #[test]
    fn lower_mastery_sorts_first_among_equally_overdue() {
        let vocabulary = seeded_vocabulary();
        let mut ledger = empty_ledger();
        let scheduler = ReviewScheduler::new(SchedulerConfig::default());

        let long_ago = NOW_MS - 400 * MILLIS_PER_DAY;
        for key in vocabulary.keys() {
            // Same last-seen time for all; "cat" ends lower-mastery than "run".
            let correct = key == "run";
            ledger.apply(key, correct, long_ago);
            ledger.apply(key, correct, long_ago);
        }

        let selected = scheduler.select_for_session(&vocabulary, &ledger, vocabulary.len(), None, NOW_MS);
        let cat_pos = selected.iter().position(|k| k == "cat").unwrap();
        let run_pos = selected.iter().position(|k| k == "run").unwrap();
        assert!(cat_pos < run_pos);
    }

    #[test]
    fn due_counts_tracks_overdue_margin() {
        let mut ledger = empty_ledger();
        // Level 1 gap is 3 days; 10 days ago is overdue by a wide margin.
        ledger.apply("cat", true, NOW_MS - 10 * MILLIS_PER_DAY);
        let scheduler = ReviewScheduler::new(SchedulerConfig::default());

        let counts = scheduler.due_counts(&ledger, NOW_MS);
        assert_eq!(counts.due, 1);
        assert_eq!(counts.overdue, 1);
    }
}
