use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Difficulty tier of a puzzle, totally ordered `Easy < Medium < Hard`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyTier {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl DifficultyTier {
    pub const ALL: [DifficultyTier; 3] = [
        DifficultyTier::Easy,
        DifficultyTier::Medium,
        DifficultyTier::Hard,
    ];

    /// Ordinal code used as the `level_code` model feature.
    pub fn code(self) -> u8 {
        match self {
            DifficultyTier::Easy => 0,
            DifficultyTier::Medium => 1,
            DifficultyTier::Hard => 2,
        }
    }

    /// Code for a raw tier label. Unknown labels map to 0.
    pub fn code_for_label(label: &str) -> u8 {
        label.parse::<Self>().map(Self::code).unwrap_or(0)
    }

    /// One tier harder, clamped at `Hard`.
    pub fn increase(self) -> Self {
        match self {
            DifficultyTier::Easy => DifficultyTier::Medium,
            DifficultyTier::Medium | DifficultyTier::Hard => DifficultyTier::Hard,
        }
    }

    /// One tier easier, clamped at `Easy`.
    pub fn decrease(self) -> Self {
        match self {
            DifficultyTier::Hard => DifficultyTier::Medium,
            DifficultyTier::Medium | DifficultyTier::Easy => DifficultyTier::Easy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DifficultyTier::Easy => "easy",
            DifficultyTier::Medium => "medium",
            DifficultyTier::Hard => "hard",
        }
    }
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DifficultyTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(DifficultyTier::Easy),
            "medium" => Ok(DifficultyTier::Medium),
            "hard" => Ok(DifficultyTier::Hard),
            other => Err(format!("Unknown difficulty tier: {}", other)),
        }
    }
}
