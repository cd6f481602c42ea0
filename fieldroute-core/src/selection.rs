//! The operator's in-progress choice of candidates.

use std::collections::HashSet;

/// Ephemeral set of candidate ids the operator has picked for the next
/// route request.
///
/// The set lives only as long as the planning session, is never
/// persisted, and carries no ordering. No size limit applies here; the
/// cap on request size is enforced when a request is built, so an
/// operator can select freely and trim afterwards.
///
/// # Examples
/// ```
/// use fieldroute_core::SelectionSet;
///
/// let mut selection = SelectionSet::new();
/// assert!(selection.toggle(4));
/// assert!(selection.toggle(9));
/// assert!(!selection.toggle(4));
/// assert_eq!(selection.len(), 1);
/// assert!(selection.contains(9));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: HashSet<u64>,
}

impl SelectionSet {
    /// Create an empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership for `id`, returning the new state.
    ///
    /// Selecting an id that is already present deselects it, which is
    /// what a second tap on a map marker means.
    pub fn toggle(&mut self, id: u64) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    /// Replace the whole selection with `ids`.
    ///
    /// Used by area selection, where the drawn region's matches become
    /// the selection rather than joining it. When `preserve_depot` names
    /// a candidate, that id survives the replacement even if the region
    /// did not cover it, so choosing a start point is never undone by a
    /// later area draw.
    pub fn replace_with_bulk<I>(&mut self, ids: I, preserve_depot: Option<u64>)
    where
        I: IntoIterator<Item = u64>,
    {
        let depot = preserve_depot.filter(|id| self.ids.contains(id));
        self.ids.clear();
        self.ids.extend(ids);
        self.ids.extend(depot);
    }

    /// Empty the selection.
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Whether `id` is currently selected.
    #[must_use]
    pub fn contains(&self, id: u64) -> bool {
        self.ids.contains(&id)
    }

    /// Number of selected ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterate over the selected ids in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.ids.iter().copied()
    }
}

impl FromIterator<u64> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
