//! Session recording: the current bounded answer sequence and an
//! append-only, pruned history of completed sessions.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::store::{keys, KeyValueStore};
use crate::types::{AnswerEvent, GameMode, SessionSummary};

const SESSIONS_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub started_at: i64,
    pub events: Vec<AnswerEvent>,
    pub ended_at: Option<i64>,
}

impl SessionRecord {
    fn new(started_at: i64) -> Self {
        Self {
            started_at,
            events: Vec::new(),
            ended_at: None,
        }
    }

    pub fn correct_count(&self) -> u32 {
        self.events.iter().filter(|e| e.is_correct).count() as u32
    }

    pub fn summary(&self, ended_at: i64) -> SessionSummary {
        let item_count = self.events.len() as u32;
        let correct_count = self.correct_count();
        SessionSummary {
            started_at: self.started_at,
            ended_at,
            item_count,
            correct_count,
            accuracy: if item_count == 0 {
                0.0
            } else {
                correct_count as f64 / item_count as f64
            },
            total_time_ms: ended_at - self.started_at,
        }
    }
}

/// Per-mode answer totals aggregated over recorded sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeTotals {
    pub correct: u32,
    pub total: u32,
}

impl ModeTotals {
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedSessions {
    version: u32,
    history: VecDeque<SessionRecord>,
    /// Lifetime completed-session count; outlives history pruning. Absent
    /// in older blobs, where the history length is the best lower bound.
    #[serde(default)]
    completed_total: u64,
}

/// Owner of the current session and the session history.
pub struct SessionRecorder {
    store: Arc<dyn KeyValueStore>,
    config: SessionConfig,
    current: Option<SessionRecord>,
    history: VecDeque<SessionRecord>,
    completed_total: u64,
}

impl SessionRecorder {
    pub fn new(store: Arc<dyn KeyValueStore>, config: SessionConfig) -> Self {
        let mut recorder = Self {
            store,
            config,
            current: None,
            history: VecDeque::new(),
            completed_total: 0,
        };
        recorder.load_all();
        recorder
    }

    fn load_all(&mut self) {
        let raw = match self.store.get(keys::SESSIONS) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read session history, starting empty");
                return;
            }
        };

        match serde_json::from_str::<PersistedSessions>(&raw) {
            Ok(persisted) if persisted.version == SESSIONS_SCHEMA_VERSION => {
                self.completed_total = persisted
                    .completed_total
                    .max(persisted.history.len() as u64);
                self.history = persisted.history;
            }
            Ok(persisted) => {
                tracing::warn!(
                    version = persisted.version,
                    "unknown session history version, starting empty"
                );
            }
            Err(err) => {
                tracing::warn!(error = %err, "corrupt session history, starting empty");
            }
        }
    }

    fn persist_all(&self) {
        let persisted = PersistedSessions {
            version: SESSIONS_SCHEMA_VERSION,
            history: self.history.clone(),
            completed_total: self.completed_total,
        };
        match serde_json::to_string(&persisted) {
            Ok(raw) => {
                if let Err(err) = self.store.set(keys::SESSIONS, &raw) {
                    tracing::warn!(error = %err, "failed to persist session history");
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize session history");
            }
        }
    }

    /// Opens a new session, discarding any unfinished one.
    pub fn start(&mut self, now_ms: i64) {
        if self.current.is_some() {
            tracing::warn!("starting a session while another is open, discarding the open one");
        }
        self.current = Some(SessionRecord::new(now_ms));
    }

    /// Appends to the current session. Without an open session this is a
    /// logged no-op, not an error.
    pub fn record_event(&mut self, event: AnswerEvent) {
        match self.current.as_mut() {
            Some(session) => session.events.push(event),
            None => {
                tracing::warn!(word = %event.word_key, "answer event with no open session, ignoring");
            }
        }
    }

    /// Closes the current session, appends it to history (pruning past the
    /// retention limit) and returns the computed summary. May be called
    /// without a pending event; returns `None` when no session is open.
    pub fn complete(&mut self, now_ms: i64) -> Option<SessionSummary> {
        let mut session = self.current.take()?;
        session.ended_at = Some(now_ms);
        let summary = session.summary(now_ms);

        self.history.push_back(session);
        self.completed_total += 1;
        while self.history.len() > self.config.history_limit {
            self.history.pop_front();
        }
        self.persist_all();
        Some(summary)
    }

    pub fn current(&self) -> Option<&SessionRecord> {
        self.current.as_ref()
    }

    pub fn history(&self) -> impl Iterator<Item = &SessionRecord> {
        self.history.iter()
    }

    /// Lifetime completed-session count, independent of history pruning.
    pub fn completed_count(&self) -> u64 {
        self.completed_total
    }

    /// Per-mode totals over completed sessions plus the open one.
    pub fn mode_totals(&self) -> HashMap<GameMode, ModeTotals> {
        let mut totals: HashMap<GameMode, ModeTotals> = HashMap::new();
        let events = self
            .history
            .iter()
            .flat_map(|s| s.events.iter())
            .chain(self.current.iter().flat_map(|s| s.events.iter()));
        for event in events {
            let entry = totals.entry(event.mode).or_default();
            entry.total += 1;
            if event.is_correct {
                entry.correct += 1;
            }
        }
        totals
    }

    /// Consecutive distinct days with a completed session, counted back from
    /// today (or yesterday, so an unfinished day does not break the streak).
    pub fn consecutive_days(&self, now_ms: i64) -> u32 {
        let mut dates: Vec<NaiveDate> = self
            .history
            .iter()
            .filter_map(|s| day_of(s.ended_at.unwrap_or(s.started_at)))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        dates.sort_unstable_by(|a, b| b.cmp(a));

        let Some(today) = day_of(now_ms) else {
            return 0;
        };
        let Some(&latest) = dates.first() else {
            return 0;
        };
        if latest != today && latest != today - Duration::days(1) {
            return 0;
        }

        let mut streak = 1u32;
        for pair in dates.windows(2) {
            if (pair[0] - pair[1]).num_days() == 1 {
                streak += 1;
            } else {
                break;
            }
        }
        streak
    }
}

fn day_of(timestamp_ms: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(timestamp_ms).map(|dt| dt.date_naive())
}
