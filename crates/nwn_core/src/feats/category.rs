use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Toolset category of a feat, as stored in the `TOOLSCATEGORIES` column of
/// the feat table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeatCategory {
    Combat,
    ActiveCombat,
    Defensive,
    Magical,
    ClassRacial,
    Other,
}

impl FeatCategory {
    pub const ALL: [FeatCategory; 6] = [
        Self::Combat,
        Self::ActiveCombat,
        Self::Defensive,
        Self::Magical,
        Self::ClassRacial,
        Self::Other,
    ];

    pub const COMBAT_RAW: u8 = 1;
    pub const ACTIVE_COMBAT_RAW: u8 = 2;
    pub const DEFENSIVE_RAW: u8 = 3;
    pub const MAGICAL_RAW: u8 = 4;
    pub const CLASS_RACIAL_RAW: u8 = 5;
    pub const OTHER_RAW: u8 = 6;

    /// Maps a raw table value. Anything outside the known range lands in
    /// `Other`, the same bucket the toolset uses.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            Self::COMBAT_RAW => Self::Combat,
            Self::ACTIVE_COMBAT_RAW => Self::ActiveCombat,
            Self::DEFENSIVE_RAW => Self::Defensive,
            Self::MAGICAL_RAW => Self::Magical,
            Self::CLASS_RACIAL_RAW => Self::ClassRacial,
            _ => Self::Other,
        }
    }

    pub fn raw(&self) -> u8 {
        match *self {
            Self::Combat => Self::COMBAT_RAW,
            Self::ActiveCombat => Self::ACTIVE_COMBAT_RAW,
            Self::Defensive => Self::DEFENSIVE_RAW,
            Self::Magical => Self::MAGICAL_RAW,
            Self::ClassRacial => Self::CLASS_RACIAL_RAW,
            Self::Other => Self::OTHER_RAW,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Combat => "Combat",
            Self::ActiveCombat => "Active Combat",
            Self::Defensive => "Defensive",
            Self::Magical => "Magical",
            Self::ClassRacial => "Class/Racial",
            Self::Other => "Other",
        }
    }

    /// Short lowercase name used on the command line and in JSON output.
    pub fn key(&self) -> &'static str {
        match *self {
            Self::Combat => "combat",
            Self::ActiveCombat => "active-combat",
            Self::Defensive => "defensive",
            Self::Magical => "magical",
            Self::ClassRacial => "class-racial",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for FeatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if let Ok(raw) = normalized.parse::<u8>() {
            return Ok(Self::from_raw(raw));
        }
        Self::ALL
            .into_iter()
            .find(|category| {
                category
                    .key()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .eq(normalized.chars())
            })
            .ok_or_else(|| format!("unknown feat category '{s}'"))
    }
}

/// Category selector of the filter bar. `All` is the pass-through sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(FeatCategory),
}

impl CategoryFilter {
    pub fn matches(&self, category: FeatCategory) -> bool {
        match *self {
            Self::All => true,
            Self::Only(wanted) => wanted == category,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse().map(Self::Only)
    }
}
