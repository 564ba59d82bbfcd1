//! Storage-free reorder algorithm for one scope.
//!
//! # Responsibility
//! - Represent a scope's members in position order.
//! - Apply remove/insert splices and derive dense position assignments.
//!
//! # Invariants
//! - A `ScopeSequence` never holds the same id twice.
//! - Assignments are always `0..len-1` in sequence order.
//! - Failed operations leave the sequence unchanged.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Identifier of an ordered item (column or task).
pub type ItemId = Uuid;

/// Identifier of a parent scope (board or column).
pub type ScopeId = Uuid;

/// Kind of ordered collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderedKind {
    /// Columns ordered within a board.
    Column,
    /// Tasks ordered within a column.
    Task,
}

impl OrderedKind {
    /// Stable lowercase name used in logs and errors.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Column => "column",
            Self::Task => "task",
        }
    }

    /// Name of the parent scope kind.
    pub fn scope_name(self) -> &'static str {
        match self {
            Self::Column => "board",
            Self::Task => "column",
        }
    }

    /// Whether items of this kind may change parent scope.
    ///
    /// Columns stay with the board that created them.
    pub fn allows_reparent(self) -> bool {
        matches!(self, Self::Task)
    }
}

impl Display for OrderedKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position record of one item within its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedItem {
    pub uuid: ItemId,
    pub scope_uuid: ScopeId,
    pub position: i64,
}

/// Rejected splice on a `ScopeSequence`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    /// Caller passed a negative index.
    NegativeIndex(i64),
    /// Source index is past the end of the sequence.
    IndexOutOfRange { index: i64, len: usize },
    /// Item is not a member of the sequence.
    ItemMissing(ItemId),
    /// Item is a member, but not at the index the caller observed.
    ItemMoved {
        item: ItemId,
        expected_index: usize,
        actual_index: usize,
    },
}

impl Display for SequenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NegativeIndex(index) => write!(f, "index must be >= 0, got {index}"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} is outside sequence of length {len}")
            }
            Self::ItemMissing(item) => write!(f, "item {item} is not in sequence"),
            Self::ItemMoved {
                item,
                expected_index,
                actual_index,
            } => write!(
                f,
                "item {item} expected at index {expected_index}, found at {actual_index}"
            ),
        }
    }
}

impl Error for SequenceError {}

/// Ordered members of one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeSequence {
    ids: Vec<ItemId>,
}

impl ScopeSequence {
    /// Wraps ids that are already in position order.
    pub fn new(ids: Vec<ItemId>) -> Self {
        Self { ids }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }

    pub fn index_of(&self, item: ItemId) -> Option<usize> {
        self.ids.iter().position(|id| *id == item)
    }

    /// Removes `item`, which the caller saw at `source_index`.
    ///
    /// Returns the removed index.
    pub fn remove(&mut self, item: ItemId, source_index: i64) -> Result<usize, SequenceError> {
        let source = self.locate(item, source_index)?;
        self.ids.remove(source);
        Ok(source)
    }

    /// Inserts `item` at `destination_index`, clamping past-the-end indexes
    /// to an append.
    ///
    /// Returns the index the item landed on.
    pub fn insert(
        &mut self,
        item: ItemId,
        destination_index: i64,
    ) -> Result<usize, SequenceError> {
        let destination = clamp_insert_index(destination_index, self.ids.len())?;
        self.ids.insert(destination, item);
        Ok(destination)
    }

    /// Moves `item` from `source_index` to `destination_index`.
    ///
    /// `destination_index` addresses the sequence with the item already
    /// removed. Returns `(source, destination)`; equal values mean the
    /// sequence did not change.
    pub fn move_item(
        &mut self,
        item: ItemId,
        source_index: i64,
        destination_index: i64,
    ) -> Result<(usize, usize), SequenceError> {
        let source = self.locate(item, source_index)?;
        let destination = clamp_insert_index(destination_index, self.ids.len() - 1)?;
        if source != destination {
            self.ids.remove(source);
            self.ids.insert(destination, item);
        }
        Ok((source, destination))
    }

    /// Dense `(item, position)` pairs in sequence order.
    pub fn assignments(&self) -> impl Iterator<Item = (ItemId, i64)> + '_ {
        self.ids
            .iter()
            .enumerate()
            .map(|(index, id)| (*id, index as i64))
    }

    fn locate(&self, item: ItemId, source_index: i64) -> Result<usize, SequenceError> {
        if source_index < 0 {
            return Err(SequenceError::NegativeIndex(source_index));
        }
        let actual_index = self
            .index_of(item)
            .ok_or(SequenceError::ItemMissing(item))?;
        let expected_index = match usize::try_from(source_index) {
            Ok(index) if index < self.ids.len() => index,
            _ => {
                return Err(SequenceError::IndexOutOfRange {
                    index: source_index,
                    len: self.ids.len(),
                })
            }
        };
        if expected_index != actual_index {
            return Err(SequenceError::ItemMoved {
                item,
                expected_index,
                actual_index,
            });
        }
        Ok(actual_index)
    }
}

/// Returns whether `positions` is exactly `{0, .., N-1}`.
pub fn is_dense(positions: impl IntoIterator<Item = i64>) -> bool {
    let mut positions = positions.into_iter().collect::<Vec<_>>();
    positions.sort_unstable();
    positions
        .iter()
        .enumerate()
        .all(|(index, position)| *position == index as i64)
}

fn clamp_insert_index(index: i64, len: usize) -> Result<usize, SequenceError> {
    if index < 0 {
        return Err(SequenceError::NegativeIndex(index));
    }
    Ok(usize::try_from(index).map_or(len, |index| index.min(len)))
}

#[cfg(test)]
mod tests {
    use super::{is_dense, ScopeSequence, SequenceError};
    use uuid::Uuid;

    fn ids(count: usize) -> Vec<Uuid> {
        (0..count).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn move_to_front_shifts_intervening_items() {
        let items = ids(4);
        let (a, b, c, d) = (items[0], items[1], items[2], items[3]);
        let mut sequence = ScopeSequence::new(items);

        assert_eq!(sequence.move_item(c, 2, 0).unwrap(), (2, 0));
        assert_eq!(sequence.ids(), &[c, a, b, d]);
        assert_eq!(
            sequence.assignments().collect::<Vec<_>>(),
            vec![(c, 0), (a, 1), (b, 2), (d, 3)]
        );
    }

    #[test]
    fn move_and_back_restores_order() {
        let items = ids(6);
        let mut sequence = ScopeSequence::new(items.clone());
        sequence.move_item(items[1], 1, 4).unwrap();
        assert_eq!(sequence.index_of(items[1]), Some(4));
        sequence.move_item(items[1], 4, 1).unwrap();
        assert_eq!(sequence.ids(), items.as_slice());
    }

    #[test]
    fn same_index_move_changes_nothing() {
        let items = ids(3);
        let mut sequence = ScopeSequence::new(items.clone());
        assert_eq!(sequence.move_item(items[1], 1, 1).unwrap(), (1, 1));
        assert_eq!(sequence.ids(), items.as_slice());
    }

    #[test]
    fn destination_past_end_clamps_to_last_slot() {
        let items = ids(3);
        let mut sequence = ScopeSequence::new(items.clone());
        assert_eq!(sequence.move_item(items[0], 0, 99).unwrap(), (0, 2));
        assert_eq!(sequence.ids(), &[items[1], items[2], items[0]]);

        let newcomer = Uuid::new_v4();
        assert_eq!(sequence.insert(newcomer, i64::MAX).unwrap(), 3);
        assert_eq!(sequence.ids().last(), Some(&newcomer));
    }

    #[test]
    fn rejected_moves_leave_sequence_untouched() {
        let items = ids(3);
        let mut sequence = ScopeSequence::new(items.clone());
        let stranger = Uuid::new_v4();

        assert_eq!(
            sequence.move_item(items[0], -1, 1).unwrap_err(),
            SequenceError::NegativeIndex(-1)
        );
        assert_eq!(
            sequence.move_item(items[0], 0, -2).unwrap_err(),
            SequenceError::NegativeIndex(-2)
        );
        assert_eq!(
            sequence.move_item(stranger, 0, 1).unwrap_err(),
            SequenceError::ItemMissing(stranger)
        );
        assert_eq!(
            sequence.move_item(items[0], 3, 1).unwrap_err(),
            SequenceError::IndexOutOfRange { index: 3, len: 3 }
        );
        assert_eq!(
            sequence.move_item(items[2], 1, 0).unwrap_err(),
            SequenceError::ItemMoved {
                item: items[2],
                expected_index: 1,
                actual_index: 2,
            }
        );
        assert_eq!(sequence.ids(), items.as_slice());
    }

    #[test]
    fn remove_then_insert_matches_cross_scope_move() {
        let source_items = ids(3);
        let target_items = ids(1);
        let mut source = ScopeSequence::new(source_items.clone());
        let mut target = ScopeSequence::new(target_items.clone());

        assert_eq!(source.remove(source_items[1], 1).unwrap(), 1);
        assert_eq!(target.insert(source_items[1], 5).unwrap(), 1);
        assert_eq!(source.ids(), &[source_items[0], source_items[2]]);
        assert_eq!(target.ids(), &[target_items[0], source_items[1]]);
    }

    #[test]
    fn density_check_rejects_gaps_and_duplicates() {
        assert!(is_dense(Vec::<i64>::new()));
        assert!(is_dense([2, 0, 1]));
        assert!(!is_dense([0, 2]));
        assert!(!is_dense([0, 1, 1]));
        assert!(!is_dense([1, 2]));
    }
}
