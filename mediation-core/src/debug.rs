//! Debug-menu hook
//!
//! Hosts with an in-app debug menu can expose the SDK's mediation debugger
//! through [`register_mediation_debugger`].

use crate::sdk::AdProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Title of the entry added by [`register_mediation_debugger`]
pub const MEDIATION_DEBUGGER_TITLE: &str = "Open Mediation Debugger";

/// Section of a debug menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugSection {
    /// General tools
    General,

    /// Miscellaneous tools
    Others,
}

/// Titled action in a debug menu
pub struct DebugEntry {
    title: String,
    action: Box<dyn Fn() + Send + Sync>,
}

impl DebugEntry {
    /// Create new entry
    pub fn new(title: impl Into<String>, action: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            title: title.into(),
            action: Box::new(action),
        }
    }

    /// Entry title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Run the entry's action
    pub fn trigger(&self) {
        (self.action)();
    }
}

impl std::fmt::Debug for DebugEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugEntry")
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

/// Host debug menu
pub trait DebugMenu {
    /// Add an entry to a section
    fn add_entry(&mut self, section: DebugSection, entry: DebugEntry);
}

/// Debug menu that just keeps its entries
#[derive(Debug, Default)]
pub struct DebugEntries {
    entries: Vec<(DebugSection, DebugEntry)>,
}

impl DebugEntries {
    /// Create new empty menu
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries of one section, in insertion order
    pub fn section(&self, section: DebugSection) -> impl Iterator<Item = &DebugEntry> {
        self.entries
            .iter()
            .filter(move |(s, _)| *s == section)
            .map(|(_, entry)| entry)
    }

    /// First entry with the given title
    pub fn find(&self, title: &str) -> Option<&DebugEntry> {
        self.entries
            .iter()
            .map(|(_, entry)| entry)
            .find(|entry| entry.title() == title)
    }
}

impl DebugMenu for DebugEntries {
    fn add_entry(&mut self, section: DebugSection, entry: DebugEntry) {
        self.entries.push((section, entry));
    }
}

/// Add an "Open Mediation Debugger" entry under [`DebugSection::Others`]
pub fn register_mediation_debugger(menu: &mut dyn DebugMenu, provider: Arc<dyn AdProvider>) {
    menu.add_entry(
        DebugSection::Others,
        DebugEntry::new(MEDIATION_DEBUGGER_TITLE, move || {
            tracing::info!("Opening mediation debugger");
            provider.show_mediation_debugger();
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingProvider;

    #[test]
    fn test_entry_opens_debugger() {
        let provider = RecordingProvider::new();
        let mut menu = DebugEntries::new();
        register_mediation_debugger(&mut menu, Arc::new(provider.clone()));

        assert_eq!(menu.section(DebugSection::General).count(), 0);
        let entry = menu.section(DebugSection::Others).next().unwrap();
        assert_eq!(entry.title(), MEDIATION_DEBUGGER_TITLE);

        entry.trigger();
        entry.trigger();
        assert_eq!(provider.debugger_opened(), 2);
    }
}
