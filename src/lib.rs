//! # vocab-engine - adaptive mastery and scheduling engine
//!
//! Core learning logic for a vocabulary trainer, free of any UI concern:
//!
//! - **Spaced repetition** - per-word review gaps derived from mastery level
//! - **Mastery tracking** - bounded progress records updated per answer
//! - **Difficulty adaptation** - per-mode tiers from rolling performance
//! - **Achievements** - typed unlock conditions over aggregated statistics
//! - **Sessions** - bounded answer sequences with pruned history
//!
//! The engine is single-threaded and synchronous. Its two external
//! boundaries are traits: [`vocabulary::ContentSource`] for the one-time
//! catalog load and [`store::KeyValueStore`] for durable persistence. Every
//! failure at those boundaries is absorbed: the catalog falls back to a
//! built-in seed set and persistence errors degrade to in-memory state, so
//! the engine stays operable rather than surfacing faults to the caller.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use vocab_engine::{GameMode, LearningEngine, MemoryStore};
//!
//! let mut engine = LearningEngine::new(Arc::new(MemoryStore::new()));
//! let offline = || Err::<String, _>(vocab_engine::LoadError::Unavailable("offline".into()));
//! engine.load_vocabulary(&offline);
//!
//! engine.start_session();
//! let words = engine.select_for_session(5);
//! let outcome = engine.record_answer(&words[0], true, 1800, GameMode::Quiz);
//! assert_eq!(outcome.record.total_attempts, 1);
//! let completed = engine.complete_session().unwrap();
//! assert_eq!(completed.summary.item_count, 1);
//! ```

pub mod achievements;
pub mod config;
pub mod difficulty;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod types;
pub mod vocabulary;

pub use achievements::{
    AchievementDefinition, AchievementEvaluator, AchievementUnlock, AggregateStats, Requirement,
};
pub use config::{EngineConfig, MAX_MASTERY_LEVEL};
pub use difficulty::{DifficultyAdapter, DifficultyState, TierChange};
pub use engine::{LearningEngine, RecordOutcome, SessionOutcome};
pub use error::{EngineError, EngineResult, LoadError, PersistenceError};
pub use ledger::{LedgerStats, ProgressLedger, ProgressRecord};
pub use scheduler::{DueCounts, PriorityPolicy, ReviewScheduler, WeightedPriority};
pub use session::{ModeTotals, SessionRecord, SessionRecorder};
pub use store::{KeyValueStore, MemoryStore};
pub use types::{
    AnswerEvent, CefrLevel, DifficultyTier, EngineEvent, GameMode, PresentationParams,
    SessionSummary,
};
pub use vocabulary::{ContentSource, LoadOutcome, VocabularyStore, WordFilter, WordRecord};
