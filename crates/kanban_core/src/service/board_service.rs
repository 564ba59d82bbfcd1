//! Board use-case service.
//!
//! # Responsibility
//! - Provide owner-scoped board and column entry points.
//! - Translate repository failures into use-case errors.
//!
//! # Invariants
//! - A board owned by another user is reported as not found.
//! - Column placement always goes through the ordered collection manager.

use crate::model::board::{Board, BoardId, Column, ColumnId, UserId};
use crate::model::task::{AttachmentId, TaskId};
use crate::model::validation::ValidationError;
use crate::repo::board_repo::{BoardDetail, BoardRepository, RepoError};
use crate::repo::order_repo::{OrderError, OrderErrorKind, ReorderOutcome};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for board and task use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Input failed model validation.
    Validation(ValidationError),
    BoardNotFound(BoardId),
    ColumnNotFound(ColumnId),
    TaskNotFound(TaskId),
    AttachmentNotFound(AttachmentId),
    /// Reorder was rejected or could not be persisted.
    Order(OrderError),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl ServiceError {
    /// Coarse failure class, when the error came from a reorder.
    pub fn order_kind(&self) -> Option<OrderErrorKind> {
        match self {
            Self::Order(err) => Some(err.kind()),
            _ => None,
        }
    }

    /// Whether the same call may succeed if retried unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Order(err) => err.is_retryable(),
            Self::Repo(err) => err.is_retryable(),
            _ => false,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::BoardNotFound(uuid) => write!(f, "board not found: {uuid}"),
            Self::ColumnNotFound(uuid) => write!(f, "column not found: {uuid}"),
            Self::TaskNotFound(uuid) => write!(f, "task not found: {uuid}"),
            Self::AttachmentNotFound(uuid) => write!(f, "attachment not found: {uuid}"),
            Self::Order(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Order(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound { entity, uuid } => match entity {
                "board" => Self::BoardNotFound(uuid),
                "column" => Self::ColumnNotFound(uuid),
                "task" => Self::TaskNotFound(uuid),
                "attachment" => Self::AttachmentNotFound(uuid),
                _ => Self::Repo(RepoError::NotFound { entity, uuid }),
            },
            RepoError::Order(err) => Self::Order(err),
            other => Self::Repo(other),
        }
    }
}

impl From<OrderError> for ServiceError {
    fn from(value: OrderError) -> Self {
        Self::Order(value)
    }
}

/// Owner-scoped use-case service for boards and columns.
pub struct BoardService<R: BoardRepository> {
    repo: R,
}

impl<R: BoardRepository> BoardService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_board(&self, owner: UserId, name: &str) -> ServiceResult<Board> {
        let board = Board::new(owner, name)?;
        Ok(self.repo.create_board(&board)?)
    }

    /// Lists the owner's boards sorted by name.
    pub fn list_boards(&self, owner: UserId) -> ServiceResult<Vec<Board>> {
        Ok(self.repo.list_boards(owner)?)
    }

    /// Loads a board with its columns and tasks, all in position order.
    pub fn get_board_detail(&self, owner: UserId, board_uuid: BoardId) -> ServiceResult<BoardDetail> {
        self.owned_board(owner, board_uuid)?;
        self.repo
            .board_detail(board_uuid)?
            .ok_or(ServiceError::BoardNotFound(board_uuid))
    }

    pub fn rename_board(&self, owner: UserId, board_uuid: BoardId, name: &str) -> ServiceResult<()> {
        self.owned_board(owner, board_uuid)?;
        Ok(self.repo.rename_board(board_uuid, name)?)
    }

    /// Deletes a board together with its columns and tasks.
    pub fn delete_board(&self, owner: UserId, board_uuid: BoardId) -> ServiceResult<()> {
        self.owned_board(owner, board_uuid)?;
        Ok(self.repo.delete_board(board_uuid)?)
    }

    /// Appends a column at the end of the board.
    pub fn create_column(
        &self,
        owner: UserId,
        board_uuid: BoardId,
        name: &str,
    ) -> ServiceResult<Column> {
        self.owned_board(owner, board_uuid)?;
        let column = Column::new(board_uuid, name)?;
        Ok(self.repo.create_column(&column)?)
    }

    pub fn list_columns(&self, owner: UserId, board_uuid: BoardId) -> ServiceResult<Vec<Column>> {
        self.owned_board(owner, board_uuid)?;
        Ok(self.repo.list_columns(board_uuid)?)
    }

    pub fn rename_column(
        &self,
        owner: UserId,
        column_uuid: ColumnId,
        name: &str,
    ) -> ServiceResult<()> {
        self.owned_column(owner, column_uuid)?;
        Ok(self.repo.rename_column(column_uuid, name)?)
    }

    /// Deletes a column and its tasks; later columns shift down by one.
    pub fn delete_column(&self, owner: UserId, column_uuid: ColumnId) -> ServiceResult<()> {
        self.owned_column(owner, column_uuid)?;
        Ok(self.repo.delete_column(column_uuid)?)
    }

    /// Moves a column to another index of its board.
    pub fn reorder_columns(
        &self,
        owner: UserId,
        board_uuid: BoardId,
        column_uuid: ColumnId,
        source_index: i64,
        destination_index: i64,
    ) -> ServiceResult<ReorderOutcome> {
        self.owned_board(owner, board_uuid)?;
        Ok(self
            .repo
            .move_column(board_uuid, column_uuid, source_index, destination_index)?)
    }

    fn owned_board(&self, owner: UserId, board_uuid: BoardId) -> ServiceResult<Board> {
        match self.repo.get_board(board_uuid)? {
            Some(board) if board.owner_uuid == owner => Ok(board),
            _ => Err(ServiceError::BoardNotFound(board_uuid)),
        }
    }

    fn owned_column(&self, owner: UserId, column_uuid: ColumnId) -> ServiceResult<Column> {
        let column = self
            .repo
            .get_column(column_uuid)?
            .ok_or(ServiceError::ColumnNotFound(column_uuid))?;
        match self.repo.get_board(column.board_uuid)? {
            Some(board) if board.owner_uuid == owner => Ok(column),
            _ => Err(ServiceError::ColumnNotFound(column_uuid)),
        }
    }
}
