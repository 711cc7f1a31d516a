//! Per-mode difficulty adaptation from a rolling performance window.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::DifficultyConfig;
use crate::store::{keys, KeyValueStore};
use crate::types::{DifficultyTier, GameMode, PresentationParams};

const DIFFICULTY_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSample {
    pub is_correct: bool,
    pub response_time_ms: i64,
}

/// Tier plus the bounded window backing transitions. O(1) memory per mode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyState {
    pub tier: DifficultyTier,
    pub window: VecDeque<WindowSample>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedDifficulty {
    version: u32,
    modes: HashMap<String, DifficultyState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierChange {
    pub mode: GameMode,
    pub from: DifficultyTier,
    pub to: DifficultyTier,
}

/// State machine over `easy → normal → hard → expert`, at most one tier per
/// filled window. Exclusive owner of per-mode difficulty state.
pub struct DifficultyAdapter {
    store: Arc<dyn KeyValueStore>,
    config: DifficultyConfig,
    modes: HashMap<GameMode, DifficultyState>,
}

impl DifficultyAdapter {
    pub fn new(store: Arc<dyn KeyValueStore>, config: DifficultyConfig) -> Self {
        let mut adapter = Self {
            store,
            config,
            modes: HashMap::new(),
        };
        adapter.load_all();
        adapter
    }

    fn load_all(&mut self) {
        let raw = match self.store.get(keys::DIFFICULTY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read difficulty state, starting fresh");
                return;
            }
        };

        match serde_json::from_str::<PersistedDifficulty>(&raw) {
            Ok(persisted) if persisted.version == DIFFICULTY_SCHEMA_VERSION => {
                self.modes = persisted
                    .modes
                    .into_iter()
                    .map(|(mode, state)| (GameMode::parse(&mode), state))
                    .collect();
            }
            Ok(persisted) => {
                tracing::warn!(
                    version = persisted.version,
                    "unknown difficulty state version, starting fresh"
                );
            }
            Err(err) => {
                tracing::warn!(error = %err, "corrupt difficulty state, starting fresh");
            }
        }
    }

    fn persist_all(&self) {
        let persisted = PersistedDifficulty {
            version: DIFFICULTY_SCHEMA_VERSION,
            modes: self
                .modes
                .iter()
                .map(|(mode, state)| (mode.as_str().to_string(), state.clone()))
                .collect(),
        };
        match serde_json::to_string(&persisted) {
            Ok(raw) => {
                if let Err(err) = self.store.set(keys::DIFFICULTY, &raw) {
                    tracing::warn!(error = %err, "failed to persist difficulty state");
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize difficulty state");
            }
        }
    }

    /// Current tier for a mode; `Normal` for a mode with no history yet.
    pub fn get(&self, mode: GameMode) -> DifficultyTier {
        self.modes.get(&mode).map(|s| s.tier).unwrap_or_default()
    }

    pub fn presentation(&self, mode: GameMode) -> PresentationParams {
        self.get(mode).into()
    }

    /// Pushes one sample into the mode's window. The transition rule is
    /// evaluated only on a full window, and the window clears on a
    /// transition, so a sustained streak moves exactly one tier per
    /// `window_capacity` answers.
    pub fn record_sample(
        &mut self,
        mode: GameMode,
        is_correct: bool,
        response_time_ms: i64,
    ) -> Option<TierChange> {
        let capacity = self.config.window_capacity;
        let state = self.modes.entry(mode).or_default();

        // A persisted window can exceed the configured capacity (for
        // instance after the capacity was lowered); trim however much it
        // takes, not just one sample.
        while state.window.len() >= capacity {
            state.window.pop_front();
        }
        state.window.push_back(WindowSample {
            is_correct,
            response_time_ms,
        });

        let change = if state.window.len() >= capacity {
            evaluate_transition(&self.config, mode, state)
        } else {
            None
        };

        if let Some(change) = change {
            tracing::info!(
                mode = mode.as_str(),
                from = change.from.as_str(),
                to = change.to.as_str(),
                "difficulty tier changed"
            );
        }
        self.persist_all();
        change
    }

    pub fn reset(&mut self, mode: GameMode) {
        if self.modes.remove(&mode).is_some() {
            self.persist_all();
        }
    }
}

fn evaluate_transition(
    config: &DifficultyConfig,
    mode: GameMode,
    state: &mut DifficultyState,
) -> Option<TierChange> {
    let total = state.window.len() as f64;
    let correct = state.window.iter().filter(|s| s.is_correct).count() as f64;
    let accuracy = correct / total;
    let avg_rt: f64 = state
        .window
        .iter()
        .map(|s| s.response_time_ms as f64)
        .sum::<f64>()
        / total;

    let from = state.tier;
    let to = if accuracy > config.promote_accuracy && avg_rt < config.promote_max_avg_rt_ms {
        from.harder()
    } else if accuracy < config.demote_accuracy || avg_rt > config.demote_min_avg_rt_ms {
        from.easier()
    } else {
        from
    };

    if to == from {
        return None;
    }

    state.tier = to;
    state.window.clear();
    Some(TierChange { mode, from, to })
}
