//! Set of row ids the user has checked in the table

use crate::dataset::{Dataset, Row};
use crate::error::DashboardError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    ids: BTreeSet<usize>,
}

/// Rows a selection resolves to, plus ids that no longer exist
#[derive(Debug, Clone)]
pub struct Resolved<'a> {
    pub rows: Vec<&'a Row>,
    pub stale: Vec<usize>,
}

impl<'a> Resolved<'a> {
    /// `StaleSelection` notice if any ids were dropped
    pub fn notice(&self) -> Option<DashboardError> {
        if self.stale.is_empty() {
            None
        } else {
            Some(DashboardError::StaleSelection(self.stale.clone()))
        }
    }
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn contains(&self, id: usize) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.ids.iter().copied()
    }

    /// Returns true if the id was not already selected
    #[cfg(test)]
    pub fn select(&mut self, id: usize) -> bool {
        self.ids.insert(id)
    }

    /// Returns true if the id was selected
    pub fn deselect(&mut self, id: usize) -> bool {
        self.ids.remove(&id)
    }

    /// Flip membership; returns the new membership
    pub fn toggle(&mut self, id: usize) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Keep only ids for which `keep` returns true
    pub fn restricted_to(&self, keep: impl Fn(usize) -> bool) -> SelectionState {
        SelectionState {
            ids: self.ids.iter().copied().filter(|&id| keep(id)).collect(),
        }
    }

    /// Rows for the selected ids in dataset order; unknown ids are reported, not fatal
    pub fn resolve<'a>(&self, dataset: &'a Dataset) -> Resolved<'a> {
        let mut rows = Vec::with_capacity(self.ids.len());
        let mut stale = Vec::new();
        for id in self.ids() {
            match dataset.row(id) {
                Some(row) => rows.push(row),
                None => stale.push(id),
            }
        }
        // Ids equal positions, so ascending id order is dataset order
        Resolved { rows, stale }
    }
}

impl FromIterator<usize> for SelectionState {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
