use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum GameMode {
    #[default]
    Quiz,
    Matching,
    Listening,
    Spelling,
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quiz => "quiz",
            Self::Matching => "matching",
            Self::Listening => "listening",
            Self::Spelling => "spelling",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "matching" => Self::Matching,
            "listening" => Self::Listening,
            "spelling" => Self::Spelling,
            _ => Self::Quiz,
        }
    }

    pub const ALL: [GameMode; 4] = [
        Self::Quiz,
        Self::Matching,
        Self::Listening,
        Self::Spelling,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum DifficultyTier {
    Easy,
    #[default]
    Normal,
    Hard,
    Expert,
}

impl DifficultyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Normal => "normal",
            Self::Hard => "hard",
            Self::Expert => "expert",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "easy" => Self::Easy,
            "hard" => Self::Hard,
            "expert" => Self::Expert,
            _ => Self::Normal,
        }
    }

    /// One tier up, capped at `Expert`. Adaptation never skips tiers.
    pub fn harder(&self) -> Self {
        match self {
            Self::Easy => Self::Normal,
            Self::Normal => Self::Hard,
            Self::Hard | Self::Expert => Self::Expert,
        }
    }

    /// One tier down, floored at `Easy`.
    pub fn easier(&self) -> Self {
        match self {
            Self::Expert => Self::Hard,
            Self::Hard => Self::Normal,
            Self::Normal | Self::Easy => Self::Easy,
        }
    }
}

/// CEFR proficiency tag carried by each catalog word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
}

impl CefrLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A1 => "A1",
            Self::A2 => "A2",
            Self::B1 => "B1",
            Self::B2 => "B2",
            Self::C1 => "C1",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "A1" => Some(Self::A1),
            "A2" => Some(Self::A2),
            "B1" => Some(Self::B1),
            "B2" => Some(Self::B2),
            "C1" => Some(Self::C1),
            _ => None,
        }
    }
}

/// One answered item, as fanned out to the session recorder and the
/// difficulty adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEvent {
    pub word_key: String,
    pub is_correct: bool,
    pub response_time_ms: i64,
    pub mode: GameMode,
    pub timestamp_ms: i64,
}

/// Presentation parameters derived from the current difficulty tier.
/// Consumed by the UI layer; the engine only selects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationParams {
    pub choice_count: u8,
    pub hints_enabled: bool,
    pub time_bonus: bool,
}

impl From<DifficultyTier> for PresentationParams {
    fn from(tier: DifficultyTier) -> Self {
        match tier {
            DifficultyTier::Easy => Self {
                choice_count: 3,
                hints_enabled: true,
                time_bonus: false,
            },
            DifficultyTier::Normal => Self {
                choice_count: 4,
                hints_enabled: true,
                time_bonus: false,
            },
            DifficultyTier::Hard => Self {
                choice_count: 5,
                hints_enabled: false,
                time_bonus: true,
            },
            DifficultyTier::Expert => Self {
                choice_count: 6,
                hints_enabled: false,
                time_bonus: true,
            },
        }
    }
}

/// Aggregates computed at session completion. Derived, never stored
/// redundantly alongside the event list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub started_at: i64,
    pub ended_at: i64,
    pub item_count: u32,
    pub correct_count: u32,
    pub accuracy: f64,
    pub total_time_ms: i64,
}

/// Events emitted back to the presentation/analytics layer. Plain data,
/// fired once per occurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    AchievementUnlocked {
        id: String,
        title: String,
        unlocked_at: i64,
    },
    DifficultyChanged {
        mode: GameMode,
        from: DifficultyTier,
        to: DifficultyTier,
    },
    SessionCompleted {
        summary: SessionSummary,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_stepping_is_bounded() {
        assert_eq!(DifficultyTier::Expert.harder(), DifficultyTier::Expert);
        assert_eq!(DifficultyTier::Easy.easier(), DifficultyTier::Easy);
        assert_eq!(DifficultyTier::Normal.harder(), DifficultyTier::Hard);
        assert_eq!(DifficultyTier::Hard.easier(), DifficultyTier::Normal);
    }

    #[test]
    fn mode_parse_round_trip() {
        for mode in GameMode::ALL {
            assert_eq!(GameMode::parse(mode.as_str()), mode);
        }
    }

    #[test]
    fn cefr_parse_rejects_unknown() {
        assert_eq!(CefrLevel::parse("b2"), Some(CefrLevel::B2));
        assert_eq!(CefrLevel::parse("D1"), None);
    }
}
