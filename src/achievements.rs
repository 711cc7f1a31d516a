//! Achievement rule engine: a fixed catalog of typed unlock conditions
//! checked against aggregated statistics, with a monotonic unlocked set.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::session::{ModeTotals, SessionRecord};
use crate::store::{keys, KeyValueStore};
use crate::types::GameMode;

const ACHIEVEMENTS_SCHEMA_VERSION: u32 = 1;

/// Typed unlock condition. Session-scoped kinds (`FastAnswersInSession`,
/// `PerfectSession`) evaluate to false when no completed session is given;
/// missing data is never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Requirement {
    SessionsCompleted { count: u32 },
    WordsMastered { count: u32 },
    FastAnswersInSession { count: u32, max_ms: i64 },
    PerfectSession { min_items: u32 },
    DailyStreak { days: u32 },
    ModeAccuracy { mode: GameMode, min_accuracy: f64, min_answers: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementDefinition {
    pub id: String,
    pub title: String,
    pub description: String,
    pub requirement: Requirement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementUnlock {
    pub id: String,
    pub unlocked_at: i64,
}

/// Statistics the requirement predicates are tested against.
#[derive(Debug, Clone, Default)]
pub struct AggregateStats {
    pub words_mastered: u32,
    pub sessions_completed: u32,
    pub consecutive_days: u32,
    pub mode_totals: HashMap<GameMode, ModeTotals>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedUnlocks {
    version: u32,
    unlocked: HashMap<String, i64>,
}

fn definition(id: &str, title: &str, description: &str, requirement: Requirement) -> AchievementDefinition {
    AchievementDefinition {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        requirement,
    }
}

/// Built-in catalog. Thresholds are empirically chosen and kept as data,
/// not re-derived.
pub fn default_catalog() -> Vec<AchievementDefinition> {
    vec![
        definition(
            "first-steps",
            "First Steps",
            "Complete your first session",
            Requirement::SessionsCompleted { count: 1 },
        ),
        definition(
            "regular",
            "Regular",
            "Complete 10 sessions",
            Requirement::SessionsCompleted { count: 10 },
        ),
        definition(
            "marathoner",
            "Marathoner",
            "Complete 100 sessions",
            Requirement::SessionsCompleted { count: 100 },
        ),
        definition(
            "word-collector",
            "Word Collector",
            "Master 10 words",
            Requirement::WordsMastered { count: 10 },
        ),
        definition(
            "lexicon-builder",
            "Lexicon Builder",
            "Master 50 words",
            Requirement::WordsMastered { count: 50 },
        ),
        definition(
            "quick-thinker",
            "Quick Thinker",
            "Answer 10 items correctly under 2 seconds in one session",
            Requirement::FastAnswersInSession { count: 10, max_ms: 2000 },
        ),
        definition(
            "flawless",
            "Flawless",
            "Finish a session of at least 10 items with no mistakes",
            Requirement::PerfectSession { min_items: 10 },
        ),
        definition(
            "week-streak",
            "Week Streak",
            "Practice on 7 consecutive days",
            Requirement::DailyStreak { days: 7 },
        ),
        definition(
            "quiz-master",
            "Quiz Master",
            "Reach 90% accuracy in quiz mode over at least 50 answers",
            Requirement::ModeAccuracy {
                mode: GameMode::Quiz,
                min_accuracy: 0.9,
                min_answers: 50,
            },
        ),
    ]
}

/// Exclusive owner of the unlocked-id set. Unlocking is monotonic: once an
/// id is in the set no later evaluation removes it.
pub struct AchievementEvaluator {
    store: Arc<dyn KeyValueStore>,
    catalog: Vec<AchievementDefinition>,
    unlocked: HashMap<String, i64>,
}

impl AchievementEvaluator {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_catalog(store, default_catalog())
    }

    pub fn with_catalog(store: Arc<dyn KeyValueStore>, catalog: Vec<AchievementDefinition>) -> Self {
        let mut evaluator = Self {
            store,
            catalog,
            unlocked: HashMap::new(),
        };
        evaluator.load_all();
        evaluator
    }

    fn load_all(&mut self) {
        let raw = match self.store.get(keys::ACHIEVEMENTS) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read unlocked achievements, starting empty");
                return;
            }
        };

        match serde_json::from_str::<PersistedUnlocks>(&raw) {
            Ok(persisted) if persisted.version == ACHIEVEMENTS_SCHEMA_VERSION => {
                self.unlocked = persisted.unlocked;
            }
            Ok(persisted) => {
                tracing::warn!(
                    version = persisted.version,
                    "unknown achievements version, starting empty"
                );
            }
            Err(err) => {
                tracing::warn!(error = %err, "corrupt achievements record, starting empty");
            }
        }
    }

    fn persist_all(&self) {
        let persisted = PersistedUnlocks {
            version: ACHIEVEMENTS_SCHEMA_VERSION,
            unlocked: self.unlocked.clone(),
        };
        match serde_json::to_string(&persisted) {
            Ok(raw) => {
                if let Err(err) = self.store.set(keys::ACHIEVEMENTS, &raw) {
                    tracing::warn!(error = %err, "failed to persist unlocked achievements");
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize unlocked achievements");
            }
        }
    }

    pub fn catalog(&self) -> &[AchievementDefinition] {
        &self.catalog
    }

    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked.contains_key(id)
    }

    pub fn unlocked(&self) -> Vec<AchievementUnlock> {
        let mut unlocks: Vec<AchievementUnlock> = self
            .unlocked
            .iter()
            .map(|(id, &unlocked_at)| AchievementUnlock {
                id: id.clone(),
                unlocked_at,
            })
            .collect();
        unlocks.sort_by(|a, b| a.unlocked_at.cmp(&b.unlocked_at).then_with(|| a.id.cmp(&b.id)));
        unlocks
    }

    /// Tests every not-yet-unlocked definition and returns the newly
    /// unlocked ones. Idempotent: re-evaluating an unlocked id is a no-op.
    pub fn evaluate(
        &mut self,
        session: Option<&SessionRecord>,
        stats: &AggregateStats,
        now_ms: i64,
    ) -> Vec<AchievementDefinition> {
        let mut newly_unlocked = Vec::new();

        for def in &self.catalog {
            if self.unlocked.contains_key(&def.id) {
                continue;
            }
            if requirement_satisfied(&def.requirement, session, stats) {
                self.unlocked.insert(def.id.clone(), now_ms);
                tracing::info!(id = %def.id, "achievement unlocked");
                newly_unlocked.push(def.clone());
            }
        }

        if !newly_unlocked.is_empty() {
            self.persist_all();
        }
        newly_unlocked
    }

    /// Completion fraction in `0.0..=1.0` toward an achievement; 1.0 once
    /// unlocked. `None` for an unknown id.
    pub fn progress(&self, id: &str, stats: &AggregateStats) -> Option<f64> {
        let def = self.catalog.iter().find(|d| d.id == id)?;
        if self.unlocked.contains_key(id) {
            return Some(1.0);
        }
        let fraction = match &def.requirement {
            Requirement::SessionsCompleted { count } => {
                stats.sessions_completed as f64 / (*count).max(1) as f64
            }
            Requirement::WordsMastered { count } => {
                stats.words_mastered as f64 / (*count).max(1) as f64
            }
            Requirement::DailyStreak { days } => {
                stats.consecutive_days as f64 / (*days).max(1) as f64
            }
            Requirement::ModeAccuracy { mode, min_accuracy, .. } => {
                let totals = stats.mode_totals.get(mode).copied().unwrap_or_default();
                if *min_accuracy <= 0.0 {
                    1.0
                } else {
                    totals.accuracy() / min_accuracy
                }
            }
            // Session-scoped conditions have no cross-session progress.
            Requirement::FastAnswersInSession { .. } | Requirement::PerfectSession { .. } => 0.0,
        };
        Some(fraction.min(1.0))
    }
}

fn requirement_satisfied(
    requirement: &Requirement,
    session: Option<&SessionRecord>,
    stats: &AggregateStats,
) -> bool {
    match requirement {
        Requirement::SessionsCompleted { count } => stats.sessions_completed >= *count,
        Requirement::WordsMastered { count } => stats.words_mastered >= *count,
        Requirement::DailyStreak { days } => stats.consecutive_days >= *days,
        Requirement::ModeAccuracy {
            mode,
            min_accuracy,
            min_answers,
        } => {
            let Some(totals) = stats.mode_totals.get(mode) else {
                return false;
            };
            totals.total >= *min_answers && totals.accuracy() >= *min_accuracy
        }
        Requirement::FastAnswersInSession { count, max_ms } => {
            let Some(session) = session else {
                return false;
            };
            let fast = session
                .events
                .iter()
                .filter(|e| e.is_correct && e.response_time_ms < *max_ms)
                .count();
            fast as u32 >= *count
        }
        Requirement::PerfectSession { min_items } => {
            let Some(session) = session else {
                return false;
            };
            session.events.len() as u32 >= *min_items
                && session.events.iter().all(|e| e.is_correct)
        }
    }
}
