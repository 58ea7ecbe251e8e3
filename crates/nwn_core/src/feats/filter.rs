use serde::{Deserialize, Serialize};

use super::catalog::{FeatCatalog, FeatCatalogEntry};
use super::category::CategoryFilter;
use super::status::Status;

/// Independent visibility toggle per status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusToggles {
    pub granted: bool,
    pub assigned: bool,
    pub available: bool,
    pub prereqs_unmet: bool,
    pub unavailable: bool,
}

impl StatusToggles {
    pub fn all() -> Self {
        Self {
            granted: true,
            assigned: true,
            available: true,
            prereqs_unmet: true,
            unavailable: true,
        }
    }

    pub fn none() -> Self {
        Self {
            granted: false,
            assigned: false,
            available: false,
            prereqs_unmet: false,
            unavailable: false,
        }
    }

    pub fn allows(&self, status: Status) -> bool {
        match status {
            Status::Granted => self.granted,
            Status::Assigned => self.assigned,
            Status::Available => self.available,
            Status::PrereqsUnmet => self.prereqs_unmet,
            Status::Unavailable => self.unavailable,
        }
    }

    pub fn set(&mut self, status: Status, visible: bool) {
        let slot = match status {
            Status::Granted => &mut self.granted,
            Status::Assigned => &mut self.assigned,
            Status::Available => &mut self.available,
            Status::PrereqsUnmet => &mut self.prereqs_unmet,
            Status::Unavailable => &mut self.unavailable,
        };
        *slot = visible;
    }

    pub fn with(mut self, status: Status, visible: bool) -> Self {
        self.set(status, visible);
        self
    }
}

impl Default for StatusToggles {
    /// Everything except `Unavailable`.
    fn default() -> Self {
        Self::all().with(Status::Unavailable, false)
    }
}

/// Search text, category and status toggles applied to a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatFilter {
    pub search: String,
    pub category: CategoryFilter,
    pub statuses: StatusToggles,
}

impl FeatFilter {
    /// A filter that lets every entry through.
    pub fn show_all() -> Self {
        Self {
            search: String::new(),
            category: CategoryFilter::All,
            statuses: StatusToggles::all(),
        }
    }

    pub fn matches(&self, entry: &FeatCatalogEntry, needle: &str) -> bool {
        let name_ok = needle.is_empty() || entry.feat.name.to_lowercase().contains(needle);
        name_ok && self.category.matches(entry.feat.category) && self.statuses.allows(entry.status)
    }

    /// Surviving entries in catalog order.
    pub fn apply<'a>(&self, catalog: &'a FeatCatalog) -> Vec<&'a FeatCatalogEntry> {
        let needle = self.needle();
        catalog
            .entries()
            .iter()
            .filter(|entry| self.matches(entry, &needle))
            .collect()
    }

    /// Catalog positions of the surviving entries.
    pub fn positions(&self, catalog: &FeatCatalog) -> Vec<usize> {
        let needle = self.needle();
        catalog
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, entry)| self.matches(entry, &needle))
            .map(|(position, _)| position)
            .collect()
    }

    pub fn is_pass_through(&self) -> bool {
        self.search.is_empty()
            && self.category == CategoryFilter::All
            && self.statuses == StatusToggles::all()
    }

    /// Only empty text disables the search stage; whitespace is matched
    /// literally.
    fn needle(&self) -> String {
        self.search.to_lowercase()
    }
}
