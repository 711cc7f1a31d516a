use serde::{Deserialize, Serialize};

/// Mastery level is clamped to `0..=MAX_MASTERY_LEVEL` on every update.
pub const MAX_MASTERY_LEVEL: u8 = 6;

pub const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Required review gap in days, indexed by mastery level and clamped to
    /// the last entry for levels past the table end.
    pub gap_days: Vec<u32>,
    pub priority: PriorityWeights,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            gap_days: vec![1, 3, 7, 14, 30, 60, 120],
            priority: PriorityWeights::default(),
        }
    }
}

/// Weights of the default priority score. Empirically chosen; tunable policy,
/// not a correctness invariant. The ordering contract (more overdue and less
/// mastered sorts first) holds for any non-negative weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityWeights {
    pub never_reviewed_bonus: f64,
    pub mastery_weight: f64,
    pub incorrect_weight: f64,
    pub overdue_weight: f64,
    pub frequency_weight: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            never_reviewed_bonus: 1000.0,
            mastery_weight: 10.0,
            incorrect_weight: 2.0,
            overdue_weight: 1.0,
            frequency_weight: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifficultyConfig {
    /// Ring-buffer capacity of the per-mode performance window. The
    /// transition rule is evaluated only on a full window.
    pub window_capacity: usize,
    pub promote_accuracy: f64,
    pub promote_max_avg_rt_ms: f64,
    pub demote_accuracy: f64,
    pub demote_min_avg_rt_ms: f64,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            window_capacity: 20,
            promote_accuracy: 0.85,
            promote_max_avg_rt_ms: 3000.0,
            demote_accuracy: 0.6,
            demote_min_avg_rt_ms: 8000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Completed sessions retained in history; oldest entries are pruned.
    pub history_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { history_limit: 100 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementConfig {
    /// Mastery level at or above which a word counts as mastered.
    pub mastered_threshold: u8,
}

impl Default for AchievementConfig {
    fn default() -> Self {
        Self {
            mastered_threshold: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub scheduler: SchedulerConfig,
    pub difficulty: DifficultyConfig,
    pub session: SessionConfig,
    pub achievements: AchievementConfig,
}
