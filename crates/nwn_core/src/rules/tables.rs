use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use super::prerequisites::{BabProgression, Prerequisites};
use super::{ExpectedFeatCount, RulesLookup};
use crate::core_api::{CoreError, CoreErrorCode};
use crate::creature::{ClassId, Creature, RaceId};
use crate::feats::{Feat, FeatCategory, FeatId, FeatTable};
use crate::reader::inflate_if_gzip;

/// Character levels at which a general feat slot opens, after the first.
const GENERAL_FEAT_LEVEL_STEP: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatRule {
    pub id: FeatId,
    pub name: String,
    #[serde(deserialize_with = "deserialize_category")]
    pub category: FeatCategory,
    #[serde(default)]
    pub all_classes_can_use: bool,
    #[serde(default)]
    pub removed: bool,
    #[serde(default)]
    pub prerequisites: Prerequisites,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RaceRule {
    pub id: RaceId,
    pub name: String,
    #[serde(default)]
    pub granted_feats: Vec<FeatId>,
    /// Extra feat slots the race gets at first level.
    #[serde(default)]
    pub bonus_feats: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassFeatGrant {
    pub feat: FeatId,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassRule {
    pub id: ClassId,
    pub name: String,
    #[serde(default)]
    pub granted_feats: Vec<ClassFeatGrant>,
    /// Feats this class may pick even when they are not usable by all
    /// classes.
    #[serde(default)]
    pub selectable_feats: Vec<FeatId>,
    /// Class levels that award a bonus feat slot.
    #[serde(default)]
    pub bonus_feat_levels: Vec<u8>,
    #[serde(default)]
    pub bab: BabProgression,
}

impl ClassRule {
    /// Whether this class grants `feat` to a member of the given level.
    pub fn grants_at(&self, feat: FeatId, level: u8) -> bool {
        self.granted_feats
            .iter()
            .any(|grant| grant.feat == feat && grant.level <= level)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleFile {
    feats: Vec<FeatRule>,
    #[serde(default)]
    races: Vec<RaceRule>,
    #[serde(default)]
    classes: Vec<ClassRule>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCategory {
    Raw(u8),
    Name(String),
}

fn deserialize_category<'de, D>(deserializer: D) -> Result<FeatCategory, D::Error>
where
    D: Deserializer<'de>,
{
    match RawCategory::deserialize(deserializer)? {
        RawCategory::Raw(raw) => Ok(FeatCategory::from_raw(raw)),
        RawCategory::Name(name) => name.parse().map_err(serde::de::Error::custom),
    }
}

/// In-memory race, class and feat tables answering [`RulesLookup`] queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTables {
    feats: FeatTable,
    feat_rules: HashMap<FeatId, FeatRule>,
    races: BTreeMap<RaceId, RaceRule>,
    classes: BTreeMap<ClassId, ClassRule>,
}

impl RuleTables {
    pub fn new(
        feats: Vec<FeatRule>,
        races: Vec<RaceRule>,
        classes: Vec<ClassRule>,
    ) -> Result<Self, CoreError> {
        let mut tables = Self::default();

        for rule in feats {
            let inserted = tables.feats.insert(Feat {
                id: rule.id,
                name: rule.name.clone(),
                category: rule.category,
            });
            if !inserted {
                return Err(CoreError::new(
                    CoreErrorCode::InvalidRules,
                    format!("duplicate feat id {}", rule.id),
                ));
            }
            tables.feat_rules.insert(rule.id, rule);
        }
        for race in races {
            let id = race.id;
            if tables.races.insert(id, race).is_some() {
                return Err(CoreError::new(
                    CoreErrorCode::InvalidRules,
                    format!("duplicate race id {id}"),
                ));
            }
        }
        for class in classes {
            let id = class.id;
            if tables.classes.insert(id, class).is_some() {
                return Err(CoreError::new(
                    CoreErrorCode::InvalidRules,
                    format!("duplicate class id {id}"),
                ));
            }
        }

        tables.warn_on_dangling_references();
        debug!(
            feats = tables.feats.len(),
            races = tables.races.len(),
            classes = tables.classes.len(),
            "rule tables loaded"
        );
        Ok(tables)
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let bytes = fs::read(path).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Io,
                format!("failed to read {}: {e}", path.display()),
            )
        })?;
        Self::from_bytes(bytes).map_err(|e| {
            CoreError::new(e.code, format!("{}: {}", path.display(), e.message))
        })
    }

    /// Parses a JSON rules document, gzip-compressed or plain.
    pub fn from_bytes<B: AsRef<[u8]>>(bytes: B) -> Result<Self, CoreError> {
        let json = inflate_if_gzip(bytes.as_ref()).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Io,
                format!("failed to decompress rules: {e}"),
            )
        })?;
        let file: RuleFile = serde_json::from_slice(&json).map_err(|e| {
            CoreError::new(CoreErrorCode::Parse, format!("invalid rules JSON: {e}"))
        })?;
        Self::new(file.feats, file.races, file.classes)
    }

    pub fn feats(&self) -> &FeatTable {
        &self.feats
    }

    pub fn feat_rule(&self, id: FeatId) -> Option<&FeatRule> {
        self.feat_rules.get(&id)
    }

    pub fn race(&self, id: RaceId) -> Option<&RaceRule> {
        self.races.get(&id)
    }

    pub fn class(&self, id: ClassId) -> Option<&ClassRule> {
        self.classes.get(&id)
    }

    pub fn race_name(&self, id: RaceId) -> Option<&str> {
        self.race(id).map(|race| race.name.as_str())
    }

    pub fn class_name(&self, id: ClassId) -> Option<&str> {
        self.class(id).map(|class| class.name.as_str())
    }

    pub fn base_attack(&self, creature: &Creature) -> u32 {
        creature
            .classes
            .iter()
            .filter_map(|entry| {
                self.class(entry.class)
                    .map(|class| class.bab.at_level(entry.level))
            })
            .sum()
    }

    fn warn_on_dangling_references(&self) {
        for race in self.races.values() {
            for &feat in &race.granted_feats {
                if !self.feats.contains(feat) {
                    warn!(race = %race.id, feat = %feat, "race grants a feat missing from the feat table");
                }
            }
        }
        for class in self.classes.values() {
            let referenced = class
                .granted_feats
                .iter()
                .map(|grant| grant.feat)
                .chain(class.selectable_feats.iter().copied());
            for feat in referenced {
                if !self.feats.contains(feat) {
                    warn!(class = %class.id, feat = %feat, "class references a feat missing from the feat table");
                }
            }
        }
        for rule in self.feat_rules.values() {
            for feat in rule.prerequisites.referenced_feats() {
                if !self.feats.contains(feat) {
                    warn!(feat = %rule.id, prerequisite = %feat, "prerequisite names a feat missing from the feat table");
                }
            }
        }
    }
}

impl RulesLookup for RuleTables {
    fn is_granted_by_race(&self, creature: &Creature, feat: FeatId) -> bool {
        self.race(creature.race)
            .is_some_and(|race| race.granted_feats.contains(&feat))
    }

    fn granting_class(&self, creature: &Creature, feat: FeatId) -> Option<ClassId> {
        creature
            .classes
            .iter()
            .find(|entry| {
                self.class(entry.class)
                    .is_some_and(|class| class.grants_at(feat, entry.level))
            })
            .map(|entry| entry.class)
    }

    fn prerequisites_met(&self, creature: &Creature, feat: FeatId) -> bool {
        match self.feat_rule(feat) {
            Some(rule) => rule.prerequisites.is_met(creature, self.base_attack(creature)),
            None => true,
        }
    }

    fn expected_feat_count(&self, creature: &Creature) -> ExpectedFeatCount {
        let total_level = creature.total_level();
        if total_level == 0 {
            return ExpectedFeatCount::default();
        }

        let general = 1 + total_level / GENERAL_FEAT_LEVEL_STEP;
        let racial = self
            .race(creature.race)
            .map(|race| u32::from(race.bonus_feats))
            .unwrap_or(0);
        let class_bonus = creature
            .classes
            .iter()
            .filter_map(|entry| {
                self.class(entry.class).map(|class| {
                    class
                        .bonus_feat_levels
                        .iter()
                        .filter(|&&level| level <= entry.level)
                        .count() as u32
                })
            })
            .sum();

        ExpectedFeatCount::new(general, racial, class_bonus)
    }

    fn feat_is_applicable(&self, creature: &Creature, feat: FeatId) -> bool {
        let Some(rule) = self.feat_rule(feat) else {
            return false;
        };
        if rule.removed {
            return false;
        }
        rule.all_classes_can_use
            || creature.classes.iter().any(|entry| {
                self.class(entry.class)
                    .is_some_and(|class| class.selectable_feats.contains(&feat))
            })
    }
}
