use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::feats::FeatId;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RaceId(pub u16);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ClassId(pub u16);

impl fmt::Display for RaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ability {
    Str,
    Dex,
    Con,
    Int,
    Wis,
    Cha,
}

impl Ability {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Str => "STR",
            Self::Dex => "DEX",
            Self::Con => "CON",
            Self::Int => "INT",
            Self::Wis => "WIS",
            Self::Cha => "CHA",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    pub str: u8,
    pub dex: u8,
    pub con: u8,
    pub int: u8,
    pub wis: u8,
    pub cha: u8,
}

impl AbilityScores {
    pub fn get(&self, ability: Ability) -> u8 {
        match ability {
            Ability::Str => self.str,
            Ability::Dex => self.dex,
            Ability::Con => self.con,
            Ability::Int => self.int,
            Ability::Wis => self.wis,
            Ability::Cha => self.cha,
        }
    }
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self {
            str: 10,
            dex: 10,
            con: 10,
            int: 10,
            wis: 10,
            cha: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassLevel {
    pub class: ClassId,
    pub level: u8,
}

/// Ordered, duplicate-free list of feats on a creature.
///
/// Duplicates in loaded data are dropped, keeping the first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<FeatId>", into = "Vec<FeatId>")]
pub struct FeatList {
    ids: Vec<FeatId>,
}

impl FeatList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: FeatId) -> bool {
        self.ids.contains(&id)
    }

    /// Appends `id`; `false` when it was already present.
    pub fn insert(&mut self, id: FeatId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Removes `id` keeping the order of the rest; `false` when absent.
    pub fn remove(&mut self, id: FeatId) -> bool {
        let Some(position) = self.ids.iter().position(|&existing| existing == id) else {
            return false;
        };
        self.ids.remove(position);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = FeatId> + '_ {
        self.ids.iter().copied()
    }

    pub fn as_slice(&self) -> &[FeatId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl From<Vec<FeatId>> for FeatList {
    fn from(ids: Vec<FeatId>) -> Self {
        ids.into_iter().collect()
    }
}

impl From<FeatList> for Vec<FeatId> {
    fn from(list: FeatList) -> Self {
        list.ids
    }
}

impl FromIterator<FeatId> for FeatList {
    fn from_iter<I: IntoIterator<Item = FeatId>>(iter: I) -> Self {
        let mut list = Self::new();
        for id in iter {
            list.insert(id);
        }
        list
    }
}

/// Creature record as exported from a character file.
///
/// Fields the editor does not understand are carried in `extra` so writing
/// the record back does not lose them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creature {
    pub name: String,
    pub race: RaceId,
    pub classes: Vec<ClassLevel>,
    #[serde(default)]
    pub abilities: AbilityScores,
    #[serde(default)]
    pub feats: FeatList,
    #[serde(flatten)]
    pub extra: JsonMap<String, JsonValue>,
}

impl Creature {
    pub fn new(name: impl Into<String>, race: RaceId) -> Self {
        Self {
            name: name.into(),
            race,
            classes: Vec::new(),
            abilities: AbilityScores::default(),
            feats: FeatList::new(),
            extra: JsonMap::new(),
        }
    }

    pub fn with_class(mut self, class: ClassId, level: u8) -> Self {
        self.classes.push(ClassLevel { class, level });
        self
    }

    pub fn with_feats<I: IntoIterator<Item = FeatId>>(mut self, feats: I) -> Self {
        for id in feats {
            self.feats.insert(id);
        }
        self
    }

    pub fn total_level(&self) -> u32 {
        self.classes.iter().map(|c| u32::from(c.level)).sum()
    }

    /// Level in `class`, zero when the creature has no levels in it.
    /// Repeated rows for one class add up, capped at `u8::MAX`.
    pub fn class_level(&self, class: ClassId) -> u8 {
        self.classes
            .iter()
            .filter(|c| c.class == class)
            .fold(0u8, |total, c| total.saturating_add(c.level))
    }
}
