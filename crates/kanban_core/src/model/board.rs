//! Board and column domain model.
//!
//! # Invariants
//! - A board belongs to exactly one owner.
//! - A column belongs to exactly one board for its whole lifetime.
//! - Column `position` is assigned by storage on append; values set on a
//!   freshly constructed `Column` are ignored.

use crate::model::validation::{normalize_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type BoardId = Uuid;
pub type ColumnId = Uuid;

/// Opaque id of the authenticated user that owns boards and writes comments.
pub type UserId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub uuid: BoardId,
    pub owner_uuid: UserId,
    pub name: String,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

impl Board {
    /// Creates an unsaved board with a generated id and normalized name.
    pub fn new(owner_uuid: UserId, name: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            uuid: Uuid::new_v4(),
            owner_uuid,
            name: normalize_text(name, "board name")?,
            created_at: 0,
            updated_at: 0,
        })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        normalize_text(&self.name, "board name").map(|_| ())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub uuid: ColumnId,
    pub board_uuid: BoardId,
    pub name: String,
    /// Dense zero-based index among the board's columns.
    pub position: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Column {
    /// Creates an unsaved column with a generated id and normalized name.
    pub fn new(board_uuid: BoardId, name: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            uuid: Uuid::new_v4(),
            board_uuid,
            name: normalize_text(name, "column name")?,
            position: 0,
            created_at: 0,
            updated_at: 0,
        })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        normalize_text(&self.name, "column name").map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::{Board, Column};
    use crate::model::validation::ValidationError;
    use uuid::Uuid;

    #[test]
    fn board_name_is_trimmed() {
        let board = Board::new(Uuid::new_v4(), "  Roadmap  ").unwrap();
        assert_eq!(board.name, "Roadmap");
        assert!(board.validate().is_ok());
    }

    #[test]
    fn blank_column_name_is_rejected() {
        let err = Column::new(Uuid::new_v4(), "   ").unwrap_err();
        assert_eq!(err, ValidationError::BlankField("column name"));
    }
}
