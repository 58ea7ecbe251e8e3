//! Rule queries consumed by the feat engine.
//!
//! The engine never reads rule tables directly. Everything it needs to know
//! about grants, prerequisites and feat counts goes through [`RulesLookup`],
//! so tests and alternative rule sets can plug in their own answers.

mod prerequisites;
mod tables;

use serde::{Deserialize, Serialize};

use crate::creature::{ClassId, Creature};
use crate::feats::FeatId;

pub use prerequisites::{BabProgression, Prerequisites};
pub use tables::{ClassFeatGrant, ClassRule, FeatRule, RaceRule, RuleTables};

/// Read-only oracle over the game's feat rules.
///
/// Implementations must be deterministic for a given creature. A feat the
/// rules know nothing about should answer "not granted" and "not
/// applicable".
pub trait RulesLookup {
    fn is_granted_by_race(&self, creature: &Creature, feat: FeatId) -> bool;

    /// First of the creature's classes that grants `feat` at its current
    /// level in that class.
    fn granting_class(&self, creature: &Creature, feat: FeatId) -> Option<ClassId>;

    fn prerequisites_met(&self, creature: &Creature, feat: FeatId) -> bool;

    fn expected_feat_count(&self, creature: &Creature) -> ExpectedFeatCount;

    /// Whether the feat can ever be chosen by this creature, independent of
    /// prerequisites.
    fn feat_is_applicable(&self, creature: &Creature, feat: FeatId) -> bool;
}

/// Number of manually chosen feats a creature should have.
///
/// Only `total_expected` is consumed by the summary; the breakdown is
/// reported for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectedFeatCount {
    pub general: u32,
    pub racial: u32,
    pub class_bonus: u32,
    pub total_expected: u32,
}

impl ExpectedFeatCount {
    pub fn new(general: u32, racial: u32, class_bonus: u32) -> Self {
        Self {
            general,
            racial,
            class_bonus,
            total_expected: general + racial + class_bonus,
        }
    }

    /// An aggregate with no breakdown, for rule sources that only know the
    /// total.
    pub fn total(total_expected: u32) -> Self {
        Self {
            total_expected,
            ..Self::default()
        }
    }
}
