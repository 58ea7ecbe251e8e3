use tracing::debug;

use super::catalog::{FeatCatalog, FeatCatalogEntry};
use super::category::CategoryFilter;
use super::filter::FeatFilter;
use super::notify::{ChangeNotifier, ListenerId};
use super::status::Status;
use super::summary::FeatSummary;
use super::{FeatId, FeatTable};
use crate::creature::Creature;
use crate::rules::RulesLookup;

/// Catalog, displayed subset and summary for one creature, kept consistent
/// across feat assignments.
///
/// The creature itself is borrowed per call; callers must route every feat
/// list change through [`FeatEditor::add`] and [`FeatEditor::remove`], and
/// call [`FeatEditor::reload`] after editing anything else the rules look at
/// (race, classes, abilities).
#[derive(Debug)]
pub struct FeatEditor<'r, R: RulesLookup + ?Sized> {
    rules: &'r R,
    table: &'r FeatTable,
    catalog: FeatCatalog,
    filter: FeatFilter,
    displayed: Vec<usize>,
    summary: FeatSummary,
    notifier: ChangeNotifier,
}

impl<'r, R: RulesLookup + ?Sized> FeatEditor<'r, R> {
    pub fn new(rules: &'r R, table: &'r FeatTable, creature: &Creature) -> Self {
        Self::with_filter(rules, table, creature, FeatFilter::default())
    }

    pub fn with_filter(
        rules: &'r R,
        table: &'r FeatTable,
        creature: &Creature,
        filter: FeatFilter,
    ) -> Self {
        let catalog = FeatCatalog::build(rules, table, creature);
        let displayed = filter.positions(&catalog);
        let summary = FeatSummary::from_catalog(&catalog, displayed.len());
        Self {
            rules,
            table,
            catalog,
            filter,
            displayed,
            summary,
            notifier: ChangeNotifier::new(),
        }
    }

    /// Rebuilds the whole catalog. Listeners are not notified.
    pub fn reload(&mut self, creature: &Creature) {
        self.catalog = FeatCatalog::build(self.rules, self.table, creature);
        self.refilter();
    }

    pub fn catalog(&self) -> &FeatCatalog {
        &self.catalog
    }

    pub fn displayed(&self) -> impl Iterator<Item = &FeatCatalogEntry> + '_ {
        let entries = self.catalog.entries();
        self.displayed.iter().map(move |&position| &entries[position])
    }

    pub fn displayed_len(&self) -> usize {
        self.displayed.len()
    }

    pub fn summary(&self) -> &FeatSummary {
        &self.summary
    }

    pub fn filter(&self) -> &FeatFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: FeatFilter) {
        self.filter = filter;
        self.refilter();
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.filter.search = search.into();
        self.refilter();
    }

    pub fn set_category(&mut self, category: CategoryFilter) {
        self.filter.category = category;
        self.refilter();
    }

    pub fn set_status_visible(&mut self, status: Status, visible: bool) {
        self.filter.statuses.set(status, visible);
        self.refilter();
    }

    /// Assigns `feat`. Refused (returning `false`, nothing changed, nobody
    /// notified) when the creature already has it.
    pub fn add(&mut self, creature: &mut Creature, feat: FeatId) -> bool {
        if !creature.feats.insert(feat) {
            debug!(feat = %feat, "add refused: feat already assigned");
            return false;
        }
        let status = self.catalog.refresh(self.rules, creature, feat);
        self.after_mutation();
        debug!(feat = %feat, status = ?status, "feat added");
        true
    }

    /// Unassigns `feat`. Refused when the creature lacks it or when it is
    /// currently granted; granted feats only go away when their source does.
    pub fn remove(&mut self, creature: &mut Creature, feat: FeatId) -> bool {
        if !creature.feats.contains(feat) {
            debug!(feat = %feat, "remove refused: feat not assigned");
            return false;
        }
        if self.catalog.granted_feat_ids().contains(&feat) {
            debug!(feat = %feat, "remove refused: feat is granted");
            return false;
        }

        creature.feats.remove(feat);
        let status = self.catalog.refresh(self.rules, creature, feat);
        self.after_mutation();
        debug!(feat = %feat, status = ?status, "feat removed");
        true
    }

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut() + 'static,
    {
        self.notifier.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.notifier.unsubscribe(id)
    }

    fn after_mutation(&mut self) {
        self.refilter();
        self.notifier.notify();
    }

    fn refilter(&mut self) {
        self.displayed = self.filter.positions(&self.catalog);
        self.summary = FeatSummary::from_catalog(&self.catalog, self.displayed.len());
    }
}
