//! Top-level application context: owns every component, wires the answer
//! write path, and exposes the caller-facing API consumed by the
//! presentation layer.

use std::sync::Arc;

use chrono::Utc;

use crate::achievements::{AchievementEvaluator, AchievementUnlock, AggregateStats};
use crate::config::EngineConfig;
use crate::difficulty::DifficultyAdapter;
use crate::ledger::{LedgerStats, ProgressLedger, ProgressRecord};
use crate::scheduler::{DueCounts, ReviewScheduler};
use crate::session::SessionRecorder;
use crate::store::KeyValueStore;
use crate::types::{
    AnswerEvent, DifficultyTier, EngineEvent, GameMode, PresentationParams, SessionSummary,
};
use crate::vocabulary::{ContentSource, LoadOutcome, VocabularyStore, WordFilter};

/// Result of one `record_answer` call: the updated progress record and the
/// events the call produced, each fired once.
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub record: ProgressRecord,
    pub events: Vec<EngineEvent>,
}

/// Result of completing a session.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub summary: SessionSummary,
    pub events: Vec<EngineEvent>,
}

/// One shared instance per application, constructed explicitly and passed
/// by reference to its consumers; no ambient global state.
pub struct LearningEngine {
    config: EngineConfig,
    vocabulary: VocabularyStore,
    ledger: ProgressLedger,
    scheduler: ReviewScheduler,
    difficulty: DifficultyAdapter,
    achievements: AchievementEvaluator,
    sessions: SessionRecorder,
}

impl LearningEngine {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: Arc<dyn KeyValueStore>, config: EngineConfig) -> Self {
        Self {
            vocabulary: VocabularyStore::new(),
            ledger: ProgressLedger::new(Arc::clone(&store)),
            scheduler: ReviewScheduler::new(config.scheduler.clone()),
            difficulty: DifficultyAdapter::new(Arc::clone(&store), config.difficulty.clone()),
            achievements: AchievementEvaluator::new(Arc::clone(&store)),
            sessions: SessionRecorder::new(store, config.session.clone()),
            config,
        }
    }

    /// One-time catalog load; the only operation that touches the content
    /// source. Falls back to the seed catalog rather than failing.
    pub fn load_vocabulary(&mut self, source: &dyn ContentSource) -> LoadOutcome {
        self.vocabulary.load(source)
    }

    pub fn vocabulary(&self) -> &VocabularyStore {
        &self.vocabulary
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ---- caller-facing API -------------------------------------------------

    pub fn start_session(&mut self) {
        self.start_session_at(now_ms());
    }

    pub fn start_session_at(&mut self, now_ms: i64) {
        self.sessions.start(now_ms);
    }

    pub fn select_for_session(&self, n: usize) -> Vec<String> {
        self.select_for_session_at(n, None, now_ms())
    }

    pub fn select_for_session_at(
        &self,
        n: usize,
        filter: Option<WordFilter>,
        now_ms: i64,
    ) -> Vec<String> {
        self.scheduler
            .select_for_session(&self.vocabulary, &self.ledger, n, filter.as_ref(), now_ms)
    }

    /// The single write path for an answer outcome: applies the ledger
    /// update, fans the event out to the session recorder and the
    /// difficulty adapter, then re-checks aggregate achievements.
    pub fn record_answer(
        &mut self,
        word_key: &str,
        is_correct: bool,
        response_time_ms: i64,
        mode: GameMode,
    ) -> RecordOutcome {
        self.record_answer_at(word_key, is_correct, response_time_ms, mode, now_ms())
    }

    pub fn record_answer_at(
        &mut self,
        word_key: &str,
        is_correct: bool,
        response_time_ms: i64,
        mode: GameMode,
        now_ms: i64,
    ) -> RecordOutcome {
        let word_key = word_key.to_lowercase();
        if self.vocabulary.get(&word_key).is_none() {
            tracing::debug!(word = %word_key, "answer for a word not in the catalog");
        }

        let record = self.ledger.apply(&word_key, is_correct, now_ms);

        self.sessions.record_event(AnswerEvent {
            word_key: word_key.clone(),
            is_correct,
            response_time_ms,
            mode,
            timestamp_ms: now_ms,
        });

        let mut events = Vec::new();
        if let Some(change) = self.difficulty.record_sample(mode, is_correct, response_time_ms) {
            events.push(EngineEvent::DifficultyChanged {
                mode: change.mode,
                from: change.from,
                to: change.to,
            });
        }

        // Aggregate conditions can cross a threshold on any answer;
        // session-scoped conditions wait for completion.
        let stats = self.aggregate_stats_at(now_ms);
        for def in self.achievements.evaluate(None, &stats, now_ms) {
            events.push(EngineEvent::AchievementUnlocked {
                id: def.id,
                title: def.title,
                unlocked_at: now_ms,
            });
        }

        RecordOutcome { record, events }
    }

    pub fn get_difficulty(&self, mode: GameMode) -> DifficultyTier {
        self.difficulty.get(mode)
    }

    pub fn presentation(&self, mode: GameMode) -> PresentationParams {
        self.difficulty.presentation(mode)
    }

    pub fn get_unlocked_achievements(&self) -> Vec<AchievementUnlock> {
        self.achievements.unlocked()
    }

    pub fn achievement_progress(&self, id: &str) -> Option<f64> {
        self.achievements.progress(id, &self.aggregate_stats_at(now_ms()))
    }

    pub fn complete_session(&mut self) -> Option<SessionOutcome> {
        self.complete_session_at(now_ms())
    }

    pub fn complete_session_at(&mut self, now_ms: i64) -> Option<SessionOutcome> {
        let summary = self.sessions.complete(now_ms)?;
        let mut events = vec![EngineEvent::SessionCompleted {
            summary: summary.clone(),
        }];

        let stats = self.aggregate_stats_at(now_ms);
        let completed = self.sessions.history().last().cloned();
        for def in self
            .achievements
            .evaluate(completed.as_ref(), &stats, now_ms)
        {
            events.push(EngineEvent::AchievementUnlocked {
                id: def.id,
                title: def.title,
                unlocked_at: now_ms,
            });
        }

        Some(SessionOutcome { summary, events })
    }

    // ---- aggregates --------------------------------------------------------

    pub fn aggregate_stats(&self) -> AggregateStats {
        self.aggregate_stats_at(now_ms())
    }

    pub fn aggregate_stats_at(&self, now_ms: i64) -> AggregateStats {
        let mastered_threshold = self.config.achievements.mastered_threshold;
        AggregateStats {
            words_mastered: self.ledger.stats(mastered_threshold).mastered_words as u32,
            sessions_completed: self.sessions.completed_count() as u32,
            consecutive_days: self.sessions.consecutive_days(now_ms),
            mode_totals: self.sessions.mode_totals(),
        }
    }

    pub fn ledger_stats(&self) -> LedgerStats {
        self.ledger
            .stats(self.config.achievements.mastered_threshold)
    }

    pub fn due_counts_at(&self, now_ms: i64) -> DueCounts {
        self.scheduler.due_counts(&self.ledger, now_ms)
    }

    pub fn progress(&self, word_key: &str) -> ProgressRecord {
        self.ledger.get(&word_key.to_lowercase())
    }

    /// Explicit reset of all learning progress.
    pub fn reset_progress(&mut self) {
        self.ledger.reset_all();
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
