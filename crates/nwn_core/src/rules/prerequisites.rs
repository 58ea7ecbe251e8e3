use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::creature::{Ability, Creature};
use crate::feats::FeatId;

/// Base attack bonus growth of a class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BabProgression {
    #[default]
    Full,
    ThreeQuarters,
    Half,
}

impl BabProgression {
    pub fn at_level(&self, level: u8) -> u32 {
        let level = u32::from(level);
        match *self {
            Self::Full => level,
            Self::ThreeQuarters => level * 3 / 4,
            Self::Half => level / 2,
        }
    }
}

/// Conditions a feat requires before it can be chosen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Prerequisites {
    #[serde(default)]
    pub min_abilities: BTreeMap<Ability, u8>,
    #[serde(default)]
    pub min_level: u8,
    #[serde(default)]
    pub min_base_attack: u8,
    /// Every one of these feats must be on the creature.
    #[serde(default)]
    pub required_feats: Vec<FeatId>,
    /// At least one of these feats must be on the creature, when non-empty.
    #[serde(default)]
    pub any_of_feats: Vec<FeatId>,
}

impl Prerequisites {
    pub fn is_empty(&self) -> bool {
        self.min_abilities.is_empty()
            && self.min_level == 0
            && self.min_base_attack == 0
            && self.required_feats.is_empty()
            && self.any_of_feats.is_empty()
    }

    pub fn is_met(&self, creature: &Creature, base_attack: u32) -> bool {
        let abilities_ok = self
            .min_abilities
            .iter()
            .all(|(&ability, &min)| creature.abilities.get(ability) >= min);
        let level_ok = creature.total_level() >= u32::from(self.min_level);
        let bab_ok = base_attack >= u32::from(self.min_base_attack);
        let required_ok = self
            .required_feats
            .iter()
            .all(|&feat| creature.feats.contains(feat));
        let any_of_ok = self.any_of_feats.is_empty()
            || self
                .any_of_feats
                .iter()
                .any(|&feat| creature.feats.contains(feat));

        abilities_ok && level_ok && bab_ok && required_ok && any_of_ok
    }

    /// Feat ids referenced by these prerequisites.
    pub fn referenced_feats(&self) -> impl Iterator<Item = FeatId> + '_ {
        self.required_feats
            .iter()
            .chain(self.any_of_feats.iter())
            .copied()
    }
}
