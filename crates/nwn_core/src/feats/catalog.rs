use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::status::{GrantSource, Resolution, Status, resolve};
use super::{Feat, FeatId, FeatTable};
use crate::creature::{ClassId, Creature};
use crate::rules::{ExpectedFeatCount, RulesLookup};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatCatalogEntry {
    pub feat: Feat,
    pub status: Status,
    pub granted_by: Option<GrantSource>,
}

impl FeatCatalogEntry {
    pub fn id(&self) -> FeatId {
        self.feat.id
    }

    pub fn name(&self) -> &str {
        &self.feat.name
    }

    pub fn granting_class(&self) -> Option<ClassId> {
        match self.granted_by {
            Some(GrantSource::Class(class)) => Some(class),
            _ => None,
        }
    }

    fn apply(&mut self, resolution: Resolution) {
        self.status = resolution.status;
        self.granted_by = resolution.granted_by;
    }
}

/// Status of every feat in the master table for one creature, plus the
/// index sets derived from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatCatalog {
    entries: Vec<FeatCatalogEntry>,
    positions: HashMap<FeatId, usize>,
    assigned: BTreeSet<FeatId>,
    granted: BTreeSet<FeatId>,
    unavailable: BTreeSet<FeatId>,
    expected: ExpectedFeatCount,
}

impl FeatCatalog {
    /// Resolves every feat in `table` order. Building twice against an
    /// unchanged creature yields an identical catalog.
    pub fn build<R: RulesLookup + ?Sized>(
        rules: &R,
        table: &FeatTable,
        creature: &Creature,
    ) -> Self {
        let no_prior_grants = BTreeSet::new();
        let mut catalog = Self {
            entries: Vec::with_capacity(table.len()),
            positions: HashMap::with_capacity(table.len()),
            assigned: creature.feats.iter().collect(),
            granted: BTreeSet::new(),
            unavailable: BTreeSet::new(),
            expected: rules.expected_feat_count(creature),
        };

        for feat in table {
            let is_assigned = creature.feats.contains(feat.id);
            let resolution = resolve(rules, creature, feat.id, is_assigned, &no_prior_grants);
            catalog.positions.insert(feat.id, catalog.entries.len());
            catalog.entries.push(FeatCatalogEntry {
                feat: feat.clone(),
                status: resolution.status,
                granted_by: resolution.granted_by,
            });
            catalog.index_status(feat.id, resolution.status);
        }

        for orphan in catalog.orphans() {
            warn!(feat = %orphan, creature = %creature.name, "assigned feat is missing from the feat table");
        }
        debug!(
            entries = catalog.entries.len(),
            assigned = catalog.assigned.len(),
            granted = catalog.granted.len(),
            unavailable = catalog.unavailable.len(),
            expected = catalog.expected.total_expected,
            "feat catalog built"
        );
        catalog
    }

    /// Re-resolves a single feat after its assignment changed, using the
    /// current granted set as the known-granted snapshot, then re-resolves
    /// every unassigned feat since their prerequisites may name it. Returns
    /// the new status, or `None` for feats outside the table (their
    /// assignment is still tracked).
    pub fn refresh<R: RulesLookup + ?Sized>(
        &mut self,
        rules: &R,
        creature: &Creature,
        feat: FeatId,
    ) -> Option<Status> {
        let is_assigned = creature.feats.contains(feat);
        if is_assigned {
            self.assigned.insert(feat);
        } else {
            self.assigned.remove(&feat);
        }

        let status = match self.positions.get(&feat).copied() {
            Some(position) => {
                let resolution = resolve(rules, creature, feat, is_assigned, &self.granted);
                self.entries[position].apply(resolution);
                self.index_status(feat, resolution.status);
                Some(resolution.status)
            }
            None => {
                self.granted.remove(&feat);
                self.unavailable.remove(&feat);
                None
            }
        };
        self.refresh_unassigned(rules, creature, feat);
        status
    }

    fn refresh_unassigned<R: RulesLookup + ?Sized>(
        &mut self,
        rules: &R,
        creature: &Creature,
        changed: FeatId,
    ) {
        let no_prior_grants = BTreeSet::new();
        let mut moved = 0usize;
        for position in 0..self.entries.len() {
            let id = self.entries[position].id();
            if id == changed || creature.feats.contains(id) {
                continue;
            }
            let resolution = resolve(rules, creature, id, false, &no_prior_grants);
            if resolution.status != self.entries[position].status {
                moved += 1;
            }
            self.entries[position].apply(resolution);
            self.index_status(id, resolution.status);
        }
        if moved > 0 {
            debug!(feat = %changed, dependents = moved, "dependent feat statuses refreshed");
        }
    }

    fn index_status(&mut self, feat: FeatId, status: Status) {
        if status == Status::Granted {
            self.granted.insert(feat);
        } else {
            self.granted.remove(&feat);
        }
        if status == Status::Unavailable {
            self.unavailable.insert(feat);
        } else {
            self.unavailable.remove(&feat);
        }
    }

    pub fn entries(&self) -> &[FeatCatalogEntry] {
        &self.entries
    }

    pub fn entry(&self, feat: FeatId) -> Option<&FeatCatalogEntry> {
        self.positions.get(&feat).map(|&position| &self.entries[position])
    }

    pub fn status(&self, feat: FeatId) -> Option<Status> {
        self.entry(feat).map(|entry| entry.status)
    }

    pub fn assigned_feat_ids(&self) -> &BTreeSet<FeatId> {
        &self.assigned
    }

    pub fn granted_feat_ids(&self) -> &BTreeSet<FeatId> {
        &self.granted
    }

    pub fn unavailable_feat_ids(&self) -> &BTreeSet<FeatId> {
        &self.unavailable
    }

    pub fn expected(&self) -> ExpectedFeatCount {
        self.expected
    }

    /// Manually chosen feats: assigned minus granted.
    pub fn selected_count(&self) -> usize {
        self.assigned.len().saturating_sub(self.granted.len())
    }

    /// Assigned feats the master table does not know about.
    pub fn orphans(&self) -> impl Iterator<Item = FeatId> + '_ {
        self.assigned
            .iter()
            .copied()
            .filter(|feat| !self.positions.contains_key(feat))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::FeatCatalog;
    use crate::creature::{ClassId, Creature, RaceId};
    use crate::feats::{Feat, FeatCategory, FeatId, FeatTable, GrantSource, Status};
    use crate::rules::{ExpectedFeatCount, RulesLookup};

    const RACE_FEAT: FeatId = FeatId(10);
    const CLASS_FEAT: FeatId = FeatId(20);
    const MANUAL_FEAT: FeatId = FeatId(30);
    const GATED_FEAT: FeatId = FeatId(40);
    const CLASS_ONLY_FEAT: FeatId = FeatId(50);
    const OPEN_FEAT: FeatId = FeatId(60);

    struct ScenarioRules;

    impl RulesLookup for ScenarioRules {
        fn is_granted_by_race(&self, _: &Creature, feat: FeatId) -> bool {
            feat == RACE_FEAT
        }

        fn granting_class(&self, creature: &Creature, feat: FeatId) -> Option<ClassId> {
            (feat == CLASS_FEAT && creature.class_level(ClassId(4)) >= 4).then_some(ClassId(4))
        }

        fn prerequisites_met(&self, _: &Creature, feat: FeatId) -> bool {
            feat != GATED_FEAT
        }

        fn expected_feat_count(&self, _: &Creature) -> ExpectedFeatCount {
            ExpectedFeatCount::total(2)
        }

        fn feat_is_applicable(&self, _: &Creature, feat: FeatId) -> bool {
            feat != CLASS_ONLY_FEAT
        }
    }

    fn table() -> FeatTable {
        [
            (OPEN_FEAT, "Toughness"),
            (RACE_FEAT, "Darkvision"),
            (CLASS_FEAT, "Armor Proficiency"),
            (MANUAL_FEAT, "Dodge"),
            (GATED_FEAT, "Mobility"),
            (CLASS_ONLY_FEAT, "Sneak Attack"),
        ]
        .into_iter()
        .map(|(id, name)| Feat {
            id,
            name: name.to_string(),
            category: FeatCategory::Other,
        })
        .collect()
    }

    fn creature() -> Creature {
        Creature::new("Scenario", RaceId(1))
            .with_class(ClassId(4), 4)
            .with_feats([RACE_FEAT, CLASS_FEAT, MANUAL_FEAT])
    }

    #[test]
    fn classifies_race_class_and_manual_feats() {
        let catalog = FeatCatalog::build(&ScenarioRules, &table(), &creature());

        let race = catalog.entry(RACE_FEAT).expect("race feat entry");
        assert_eq!(race.status, Status::Granted);
        assert_eq!(race.granted_by, Some(GrantSource::Race));

        let class = catalog.entry(CLASS_FEAT).expect("class feat entry");
        assert_eq!(class.status, Status::Granted);
        assert_eq!(class.granting_class(), Some(ClassId(4)));

        assert_eq!(catalog.status(MANUAL_FEAT), Some(Status::Assigned));
        assert_eq!(catalog.status(GATED_FEAT), Some(Status::PrereqsUnmet));
        assert_eq!(catalog.status(CLASS_ONLY_FEAT), Some(Status::Unavailable));
        assert_eq!(catalog.status(OPEN_FEAT), Some(Status::Available));

        let granted: BTreeSet<FeatId> = [RACE_FEAT, CLASS_FEAT].into_iter().collect();
        assert_eq!(catalog.granted_feat_ids(), &granted);
        assert_eq!(catalog.assigned_feat_ids().len(), 3);
        assert_eq!(catalog.selected_count(), 1);
        assert_eq!(
            catalog.unavailable_feat_ids().iter().copied().collect::<Vec<_>>(),
            vec![CLASS_ONLY_FEAT]
        );
        assert_eq!(catalog.expected().total_expected, 2);
    }

    #[test]
    fn keeps_table_order_and_is_idempotent() {
        let table = table();
        let creature = creature();
        let first = FeatCatalog::build(&ScenarioRules, &table, &creature);
        let second = FeatCatalog::build(&ScenarioRules, &table, &creature);
        assert_eq!(first, second);

        let order: Vec<FeatId> = first.entries().iter().map(|e| e.id()).collect();
        let table_order: Vec<FeatId> = table.iter().map(|f| f.id).collect();
        assert_eq!(order, table_order);
    }

    #[test]
    fn refresh_updates_one_entry_and_index_sets() {
        let mut creature = creature();
        let mut catalog = FeatCatalog::build(&ScenarioRules, &table(), &creature);

        creature.feats.insert(GATED_FEAT);
        assert_eq!(
            catalog.refresh(&ScenarioRules, &creature, GATED_FEAT),
            Some(Status::Assigned)
        );
        assert!(catalog.assigned_feat_ids().contains(&GATED_FEAT));
        assert_eq!(catalog.selected_count(), 2);

        creature.feats.remove(MANUAL_FEAT);
        assert_eq!(
            catalog.refresh(&ScenarioRules, &creature, MANUAL_FEAT),
            Some(Status::Available)
        );
        assert!(!catalog.assigned_feat_ids().contains(&MANUAL_FEAT));
    }

    /// `GATED_FEAT` needs `MANUAL_FEAT` on the creature.
    struct ChainRules;

    impl RulesLookup for ChainRules {
        fn is_granted_by_race(&self, _: &Creature, _: FeatId) -> bool {
            false
        }

        fn granting_class(&self, _: &Creature, _: FeatId) -> Option<ClassId> {
            None
        }

        fn prerequisites_met(&self, creature: &Creature, feat: FeatId) -> bool {
            feat != GATED_FEAT || creature.feats.contains(MANUAL_FEAT)
        }

        fn expected_feat_count(&self, _: &Creature) -> ExpectedFeatCount {
            ExpectedFeatCount::default()
        }

        fn feat_is_applicable(&self, _: &Creature, _: FeatId) -> bool {
            true
        }
    }

    #[test]
    fn refresh_re_resolves_feats_that_depend_on_the_change() {
        let mut creature = Creature::new("Chain", RaceId(1)).with_feats([MANUAL_FEAT]);
        let mut catalog = FeatCatalog::build(&ChainRules, &table(), &creature);
        assert_eq!(catalog.status(GATED_FEAT), Some(Status::Available));

        creature.feats.remove(MANUAL_FEAT);
        catalog.refresh(&ChainRules, &creature, MANUAL_FEAT);
        assert_eq!(catalog.status(GATED_FEAT), Some(Status::PrereqsUnmet));
        assert_eq!(catalog, FeatCatalog::build(&ChainRules, &table(), &creature));

        creature.feats.insert(MANUAL_FEAT);
        catalog.refresh(&ChainRules, &creature, MANUAL_FEAT);
        assert_eq!(catalog.status(GATED_FEAT), Some(Status::Available));
        assert_eq!(catalog, FeatCatalog::build(&ChainRules, &table(), &creature));
    }

    #[test]
    fn refresh_keeps_previously_granted_feat_without_source() {
        let mut creature = creature();
        let mut catalog = FeatCatalog::build(&ScenarioRules, &table(), &creature);

        // Class level drops below the grant level after the build.
        creature.classes[0].level = 2;
        assert_eq!(
            catalog.refresh(&ScenarioRules, &creature, CLASS_FEAT),
            Some(Status::Granted)
        );
        assert_eq!(catalog.entry(CLASS_FEAT).and_then(|e| e.granted_by), None);

        // A wholesale rebuild drops the stale grant.
        let rebuilt = FeatCatalog::build(&ScenarioRules, &table(), &creature);
        assert_eq!(rebuilt.status(CLASS_FEAT), Some(Status::Assigned));
    }

    #[test]
    fn tracks_assigned_feats_missing_from_the_table() {
        let mut creature = creature().with_feats([FeatId(999)]);
        let mut catalog = FeatCatalog::build(&ScenarioRules, &table(), &creature);
        assert_eq!(catalog.orphans().collect::<Vec<_>>(), vec![FeatId(999)]);
        assert_eq!(catalog.assigned_feat_ids().len(), 4);
        assert_eq!(catalog.len(), 6);

        creature.feats.remove(FeatId(999));
        assert_eq!(catalog.refresh(&ScenarioRules, &creature, FeatId(999)), None);
        assert_eq!(catalog.orphans().count(), 0);
    }
}
