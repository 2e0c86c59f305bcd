use std::sync::Arc;

use crate::region::{RegionKey, RegionRef};

/// Maximum number of regions held for side-by-side comparison.
pub const MAX_COMPARE: usize = 2;

/// Page-level selection and comparison state.
///
/// Held by the page shell and handed to child components explicitly. Identity
/// checks go through [`crate::Region::key`]; a region without a resolvable key
/// only ever matches the very same shared handle, never another region.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    selected: Option<RegionRef>,
    compare: Vec<RegionRef>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&RegionRef> {
        self.selected.as_ref()
    }

    pub fn selected_key(&self) -> Option<RegionKey> {
        self.selected.as_ref().and_then(|region| region.key())
    }

    /// Replace the current selection. `None` closes the detail panel.
    pub fn select(&mut self, region: Option<RegionRef>) {
        self.selected = region;
    }

    pub fn is_selected(&self, region: &RegionRef) -> bool {
        self.selected
            .as_ref()
            .is_some_and(|selected| selected.same_identity(region))
    }

    /// Comparison entries, oldest first.
    pub fn compared(&self) -> &[RegionRef] {
        &self.compare
    }

    pub fn is_compared(&self, region: &RegionRef) -> bool {
        self.compare.iter().any(|entry| same_entry(entry, region))
    }

    /// Remove `region` if it is being compared, otherwise add it. Adding to a full
    /// set evicts the oldest entry first.
    pub fn toggle_compare(&mut self, region: RegionRef) {
        if let Some(pos) = self
            .compare
            .iter()
            .position(|entry| same_entry(entry, &region))
        {
            self.compare.remove(pos);
            return;
        }
        if self.compare.len() >= MAX_COMPARE {
            self.compare.remove(0);
        }
        self.compare.push(region);
    }

    /// Remove the entry with identity `key`; no-op if absent.
    pub fn remove_from_compare(&mut self, key: &RegionKey) {
        self.compare
            .retain(|entry| entry.key().as_ref() != Some(key));
    }

    /// Remove one comparison entry, whether or not it has a key.
    pub fn remove_compared(&mut self, region: &RegionRef) {
        self.compare.retain(|entry| !same_entry(entry, region));
    }

    pub fn clear_compare(&mut self) {
        self.compare.clear();
    }
}

fn same_entry(entry: &RegionRef, region: &RegionRef) -> bool {
    Arc::ptr_eq(entry, region) || entry.same_identity(region)
}
