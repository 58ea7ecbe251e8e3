use serde::Serialize;

use super::catalog::FeatCatalogEntry;
use super::status::GrantSource;
use crate::creature::{ClassId, Creature};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GroupKind {
    Race,
    Class(ClassId),
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatGroup<'a> {
    pub kind: GroupKind,
    pub entries: Vec<&'a FeatCatalogEntry>,
}

/// Groups the creature's feats for display: race grants, then grants of
/// each class in the creature's class order, then everything else on the
/// creature. Entries are name-sorted within a group; empty groups are
/// dropped. Feats not on the creature are ignored.
pub fn group_entries<'a, I>(entries: I, creature: &Creature) -> Vec<FeatGroup<'a>>
where
    I: IntoIterator<Item = &'a FeatCatalogEntry>,
{
    let mut kinds = vec![GroupKind::Race];
    for class in &creature.classes {
        let kind = GroupKind::Class(class.class);
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    kinds.push(GroupKind::Manual);

    let mut groups: Vec<FeatGroup<'a>> = kinds
        .into_iter()
        .map(|kind| FeatGroup {
            kind,
            entries: Vec::new(),
        })
        .collect();

    for entry in entries {
        if !entry.status.is_on_creature() {
            continue;
        }
        let kind = match entry.granted_by {
            Some(GrantSource::Race) => GroupKind::Race,
            Some(GrantSource::Class(class)) => GroupKind::Class(class),
            None => GroupKind::Manual,
        };
        let slot = groups
            .iter()
            .position(|group| group.kind == kind)
            .unwrap_or(groups.len() - 1);
        groups[slot].entries.push(entry);
    }

    groups.retain(|group| !group.entries.is_empty());
    for group in &mut groups {
        group
            .entries
            .sort_by_cached_key(|entry| entry.feat.name.to_lowercase());
    }
    groups
}
