mod catalog;
mod category;
mod editor;
mod filter;
mod grouping;
mod notify;
mod status;
mod summary;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use catalog::{FeatCatalog, FeatCatalogEntry};
pub use category::{CategoryFilter, FeatCategory};
pub use editor::FeatEditor;
pub use filter::{FeatFilter, StatusToggles};
pub use grouping::{FeatGroup, GroupKind, group_entries};
pub use notify::{ChangeNotifier, ListenerId};
pub use status::{GrantSource, Resolution, Status, resolve};
pub use summary::{ChoiceBalance, FeatSummary, ShownCount};

/// Row index of a feat in the feat table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FeatId(pub u16);

impl fmt::Display for FeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feat {
    pub id: FeatId,
    pub name: String,
    pub category: FeatCategory,
}

/// Master feat reference table. Iteration follows insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatTable {
    feats: Vec<Feat>,
    index: HashMap<FeatId, usize>,
}

impl FeatTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a feat. Returns `false` and leaves the table untouched when
    /// the id is already present.
    pub fn insert(&mut self, feat: Feat) -> bool {
        if self.index.contains_key(&feat.id) {
            return false;
        }
        self.index.insert(feat.id, self.feats.len());
        self.feats.push(feat);
        true
    }

    pub fn get(&self, id: FeatId) -> Option<&Feat> {
        self.index.get(&id).map(|&slot| &self.feats[slot])
    }

    pub fn contains(&self, id: FeatId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feat> {
        self.feats.iter()
    }

    pub fn len(&self) -> usize {
        self.feats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feats.is_empty()
    }
}

impl FromIterator<Feat> for FeatTable {
    fn from_iter<I: IntoIterator<Item = Feat>>(iter: I) -> Self {
        let mut table = Self::new();
        for feat in iter {
            table.insert(feat);
        }
        table
    }
}

impl<'a> IntoIterator for &'a FeatTable {
    type Item = &'a Feat;
    type IntoIter = std::slice::Iter<'a, Feat>;

    fn into_iter(self) -> Self::IntoIter {
        self.feats.iter()
    }
}
