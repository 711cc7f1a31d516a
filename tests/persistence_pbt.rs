//! Property-based tests for the engine's core invariants:
//!
//! - Mastery bounds and counter consistency after any answer sequence
//! - Ledger round-trip: persist_all -> load_all preserves every record
//! - Scheduler idempotence with no intervening updates
//! - Achievement unlock monotonicity

use std::sync::Arc;

use proptest::prelude::*;

use vocab_engine::achievements::{AchievementEvaluator, AggregateStats};
use vocab_engine::config::{SchedulerConfig, MAX_MASTERY_LEVEL};
use vocab_engine::ledger::ProgressLedger;
use vocab_engine::scheduler::ReviewScheduler;
use vocab_engine::store::{KeyValueStore, MemoryStore};
use vocab_engine::vocabulary::VocabularyStore;
use vocab_engine::LoadError;

const BASE_TS: i64 = 1_700_000_000_000;

// ============================================================================
// Arbitrary generators
// ============================================================================

fn arb_word_key() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["cat", "dog", "run", "house", "water"])
        .prop_map(|s| s.to_string())
}

/// A sequence of (key, is_correct, minute-offset) answer outcomes.
fn arb_answer_seq() -> impl Strategy<Value = Vec<(String, bool, i64)>> {
    prop::collection::vec(
        (arb_word_key(), any::<bool>(), 0i64..10_000),
        0..60,
    )
}

fn seeded_vocabulary() -> VocabularyStore {
    let mut store = VocabularyStore::new();
    store.load(&(|| Err::<String, _>(LoadError::Unavailable("pbt".to_string()))));
    store
}

proptest! {
    #[test]
    fn mastery_stays_bounded_and_counters_consistent(seq in arb_answer_seq()) {
        let mut ledger = ProgressLedger::new(Arc::new(MemoryStore::new()));

        for (key, is_correct, offset_min) in &seq {
            ledger.apply(key, *is_correct, BASE_TS + offset_min * 60_000);
        }

        for (_, record) in ledger.iter() {
            prop_assert!(record.mastery_level <= MAX_MASTERY_LEVEL);
            prop_assert!(record.correct_attempts <= record.total_attempts);
        }

        let correct_total: u32 = ledger.iter().map(|(_, r)| r.correct_attempts).sum();
        let expected: u32 = seq.iter().filter(|(_, c, _)| *c).count() as u32;
        prop_assert_eq!(correct_total, expected);
    }

    #[test]
    fn ledger_round_trips_through_the_store(seq in arb_answer_seq()) {
        let store = Arc::new(MemoryStore::new());
        let before = {
            let mut ledger =
                ProgressLedger::new(Arc::clone(&store) as Arc<dyn KeyValueStore>);
            for (key, is_correct, offset_min) in &seq {
                ledger.apply(key, *is_correct, BASE_TS + offset_min * 60_000);
            }
            ledger.persist_all().unwrap();
            ledger.iter().map(|(k, r)| (k.clone(), r.clone())).collect::<Vec<_>>()
        };

        let reloaded = ProgressLedger::new(store);
        prop_assert_eq!(reloaded.iter().count(), before.len());
        for (key, record) in before {
            prop_assert_eq!(reloaded.get(&key), record);
        }
    }

    #[test]
    fn selection_is_idempotent(seq in arb_answer_seq(), n in 1usize..10) {
        let vocabulary = seeded_vocabulary();
        let mut ledger = ProgressLedger::new(Arc::new(MemoryStore::new()));
        for (key, is_correct, offset_min) in &seq {
            ledger.apply(key, *is_correct, BASE_TS + offset_min * 60_000);
        }
        let scheduler = ReviewScheduler::new(SchedulerConfig::default());

        let now = BASE_TS + 30 * 24 * 60 * 60 * 1000;
        let first = scheduler.select_for_session(&vocabulary, &ledger, n, None, now);
        let second = scheduler.select_for_session(&vocabulary, &ledger, n, None, now);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn unlocks_never_revert(counts in prop::collection::vec(0u32..80, 1..20)) {
        let mut evaluator = AchievementEvaluator::new(Arc::new(MemoryStore::new()));
        let mut ever_unlocked: Vec<String> = Vec::new();

        for (i, words_mastered) in counts.iter().enumerate() {
            let stats = AggregateStats {
                words_mastered: *words_mastered,
                ..Default::default()
            };
            evaluator.evaluate(None, &stats, BASE_TS + i as i64);

            for id in &ever_unlocked {
                prop_assert!(evaluator.is_unlocked(id), "unlock {} was revoked", id);
            }
            for unlock in evaluator.unlocked() {
                if !ever_unlocked.contains(&unlock.id) {
                    ever_unlocked.push(unlock.id);
                }
            }
        }
    }
}
