use std::path::Path;

use tracing::info;

use crate::creature::{ClassId, ClassLevel, Creature};
use crate::feats::{
    CategoryFilter, FeatCatalog, FeatCatalogEntry, FeatEditor, FeatFilter, FeatGroup, FeatId,
    FeatSummary, ListenerId, Status, group_entries,
};
use crate::reader::inflate_if_gzip;
use crate::rules::RuleTables;

use super::error::{CoreError, CoreErrorCode};
use super::types::{ClassEntry, Snapshot};

#[derive(Debug, Clone)]
pub struct Engine {
    rules: RuleTables,
}

/// One opened creature together with its feat editor.
#[derive(Debug)]
pub struct Session<'e> {
    rules: &'e RuleTables,
    creature: Creature,
    editor: FeatEditor<'e, RuleTables>,
    modified: bool,
}

impl Engine {
    pub fn new(rules: RuleTables) -> Self {
        Self { rules }
    }

    pub fn load_rules(path: &Path) -> Result<Self, CoreError> {
        RuleTables::load(path).map(Self::new)
    }

    pub fn rules(&self) -> &RuleTables {
        &self.rules
    }

    /// Opens a creature JSON export, plain or gzip-compressed.
    pub fn open_bytes<B: AsRef<[u8]>>(&self, bytes: B) -> Result<Session<'_>, CoreError> {
        let json = inflate_if_gzip(bytes.as_ref()).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Io,
                format!("failed to decompress creature: {e}"),
            )
        })?;
        let creature: Creature = serde_json::from_slice(&json).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Parse,
                format!("failed to parse creature: {e}"),
            )
        })?;
        Ok(self.open_creature(creature))
    }

    pub fn open_creature(&self, creature: Creature) -> Session<'_> {
        let editor = FeatEditor::new(&self.rules, self.rules.feats(), &creature);
        info!(
            creature = %creature.name,
            feats = creature.feats.len(),
            "creature opened"
        );
        Session {
            rules: &self.rules,
            creature,
            editor,
            modified: false,
        }
    }
}

impl<'e> Session<'e> {
    pub fn creature(&self) -> &Creature {
        &self.creature
    }

    pub fn rules(&self) -> &'e RuleTables {
        self.rules
    }

    pub fn snapshot(&self) -> Snapshot {
        let creature = &self.creature;
        Snapshot {
            name: creature.name.clone(),
            race: creature.race,
            race_name: self.rules.race_name(creature.race).map(str::to_string),
            classes: creature
                .classes
                .iter()
                .map(|entry| ClassEntry {
                    class: entry.class,
                    name: self.rules.class_name(entry.class).map(str::to_string),
                    level: entry.level,
                })
                .collect(),
            total_level: creature.total_level(),
            base_attack: self.rules.base_attack(creature),
            feat_count: creature.feats.len(),
        }
    }

    pub fn catalog(&self) -> &FeatCatalog {
        self.editor.catalog()
    }

    pub fn displayed(&self) -> impl Iterator<Item = &FeatCatalogEntry> + '_ {
        self.editor.displayed()
    }

    pub fn summary(&self) -> &FeatSummary {
        self.editor.summary()
    }

    pub fn filter(&self) -> &FeatFilter {
        self.editor.filter()
    }

    pub fn set_filter(&mut self, filter: FeatFilter) {
        self.editor.set_filter(filter);
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.editor.set_search(search);
    }

    pub fn set_category(&mut self, category: CategoryFilter) {
        self.editor.set_category(category);
    }

    pub fn set_status_visible(&mut self, status: Status, visible: bool) {
        self.editor.set_status_visible(status, visible);
    }

    /// Displayed feats on the creature grouped by race, class and manual
    /// choice. Follows the active filter like [`Session::displayed`].
    pub fn grouped(&self) -> Vec<FeatGroup<'_>> {
        group_entries(self.editor.displayed(), &self.creature)
    }

    pub fn add_feat(&mut self, feat: FeatId) -> bool {
        let added = self.editor.add(&mut self.creature, feat);
        self.modified |= added;
        added
    }

    pub fn remove_feat(&mut self, feat: FeatId) -> bool {
        let removed = self.editor.remove(&mut self.creature, feat);
        self.modified |= removed;
        removed
    }

    /// Sets the creature's level in `class`, adding the class when it is
    /// new, and rebuilds the catalog since grants may have changed.
    pub fn set_class_level(&mut self, class: ClassId, level: u8) -> Result<(), CoreError> {
        if level == 0 {
            return Err(CoreError::new(
                CoreErrorCode::UnsupportedOperation,
                format!("class {class} level must be at least 1"),
            ));
        }
        if self.rules.class(class).is_none() {
            return Err(CoreError::new(
                CoreErrorCode::UnsupportedOperation,
                format!("class {class} is not in the rule tables"),
            ));
        }

        match self
            .creature
            .classes
            .iter_mut()
            .find(|entry| entry.class == class)
        {
            Some(entry) => entry.level = level,
            None => self.creature.classes.push(ClassLevel { class, level }),
        }
        self.editor.reload(&self.creature);
        self.modified = true;
        Ok(())
    }

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut() + 'static,
    {
        self.editor.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.editor.unsubscribe(id)
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>, CoreError> {
        let mut bytes = serde_json::to_vec_pretty(&self.creature).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Io,
                format!("failed to serialize creature: {e}"),
            )
        })?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}
