//! Board and column repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over `boards` and `board_columns`.
//! - Route every column position change through the ordered collection
//!   manager (`order_repo`).
//!
//! # Invariants
//! - Column listing is deterministic: `position ASC, uuid ASC`.
//! - Column creation appends in the same IMMEDIATE transaction as the insert.
//! - Deleting a board or column cascades to its children.

use crate::db::{ensure_schema_ready, DbError};
use crate::model::board::{Board, BoardId, Column, ColumnId, UserId};
use crate::model::sequence::OrderedKind;
use crate::model::task::Task;
use crate::model::validation::{normalize_text, ValidationError};
use crate::repo::order_repo::{
    append_position, OrderError, OrderRepository, ReorderOutcome, SqliteOrderRepository,
};
use crate::repo::task_repo::load_column_tasks;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const BOARD_SELECT_SQL: &str = "SELECT
    uuid,
    owner_uuid,
    name,
    created_at,
    updated_at
FROM boards";

const COLUMN_SELECT_SQL: &str = "SELECT
    uuid,
    board_uuid,
    name,
    position,
    created_at,
    updated_at
FROM board_columns";

const BOARD_FIELDS: &[&str] = &["uuid", "owner_uuid", "name", "created_at", "updated_at"];
const COLUMN_FIELDS: &[&str] = &[
    "uuid",
    "board_uuid",
    "name",
    "position",
    "created_at",
    "updated_at",
];
const TASK_SCOPE_FIELDS: &[&str] = &["uuid", "column_uuid", "position"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for board, column and task persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    /// Row is absent; `entity` names the table's domain type.
    NotFound { entity: &'static str, uuid: Uuid },
    /// Ordered collection operation failed.
    Order(OrderError),
    InvalidData(String),
}

impl RepoError {
    /// Whether the same call may succeed if retried unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Db(err) => err.is_busy(),
            Self::Order(err) => err.is_retryable(),
            _ => false,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, uuid } => write!(f, "{entity} not found: {uuid}"),
            Self::Order(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::Order(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<OrderError> for RepoError {
    fn from(value: OrderError) -> Self {
        Self::Order(value)
    }
}

/// Column with its tasks in position order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnWithTasks {
    pub column: Column,
    pub tasks: Vec<Task>,
}

/// Full board read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardDetail {
    pub board: Board,
    pub columns: Vec<ColumnWithTasks>,
}

/// Repository interface for boards and their columns.
pub trait BoardRepository {
    fn create_board(&self, board: &Board) -> RepoResult<Board>;
    fn get_board(&self, board_uuid: BoardId) -> RepoResult<Option<Board>>;
    /// Lists an owner's boards sorted by name.
    fn list_boards(&self, owner_uuid: UserId) -> RepoResult<Vec<Board>>;
    fn rename_board(&self, board_uuid: BoardId, name: &str) -> RepoResult<()>;
    /// Deletes a board with all columns, tasks and task details.
    fn delete_board(&self, board_uuid: BoardId) -> RepoResult<()>;
    /// Loads a board with ordered columns and ordered tasks.
    fn board_detail(&self, board_uuid: BoardId) -> RepoResult<Option<BoardDetail>>;
    /// Appends a column at the end of its board.
    fn create_column(&self, column: &Column) -> RepoResult<Column>;
    fn get_column(&self, column_uuid: ColumnId) -> RepoResult<Option<Column>>;
    fn list_columns(&self, board_uuid: BoardId) -> RepoResult<Vec<Column>>;
    fn rename_column(&self, column_uuid: ColumnId, name: &str) -> RepoResult<()>;
    /// Deletes a column and closes the gap among its siblings.
    fn delete_column(&self, column_uuid: ColumnId) -> RepoResult<()>;
    /// Moves a column within its board.
    fn move_column(
        &self,
        board_uuid: BoardId,
        column_uuid: ColumnId,
        source_index: i64,
        destination_index: i64,
    ) -> RepoResult<ReorderOutcome>;
}

/// SQLite-backed board repository.
pub struct SqliteBoardRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBoardRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(
            conn,
            &[
                ("boards", BOARD_FIELDS),
                ("board_columns", COLUMN_FIELDS),
                ("tasks", TASK_SCOPE_FIELDS),
            ],
        )?;
        Ok(Self { conn })
    }

    fn order(&self) -> SqliteOrderRepository<'conn> {
        SqliteOrderRepository::from_checked(self.conn)
    }
}

impl BoardRepository for SqliteBoardRepository<'_> {
    fn create_board(&self, board: &Board) -> RepoResult<Board> {
        board.validate()?;
        self.conn.execute(
            "INSERT INTO boards (uuid, owner_uuid, name) VALUES (?1, ?2, ?3);",
            params![
                board.uuid.to_string(),
                board.owner_uuid.to_string(),
                board.name.trim(),
            ],
        )?;
        self.get_board(board.uuid)?.ok_or(RepoError::NotFound {
            entity: "board",
            uuid: board.uuid,
        })
    }

    fn get_board(&self, board_uuid: BoardId) -> RepoResult<Option<Board>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{BOARD_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([board_uuid.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_board_row(row)?));
        }
        Ok(None)
    }

    fn list_boards(&self, owner_uuid: UserId) -> RepoResult<Vec<Board>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BOARD_SELECT_SQL}
             WHERE owner_uuid = ?1
             ORDER BY name ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([owner_uuid.to_string()])?;
        let mut boards = Vec::new();
        while let Some(row) = rows.next()? {
            boards.push(parse_board_row(row)?);
        }
        Ok(boards)
    }

    fn rename_board(&self, board_uuid: BoardId, name: &str) -> RepoResult<()> {
        let name = normalize_text(name, "board name")?;
        let changed = self.conn.execute(
            "UPDATE boards
             SET name = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![board_uuid.to_string(), name],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "board",
                uuid: board_uuid,
            });
        }
        Ok(())
    }

    fn delete_board(&self, board_uuid: BoardId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM boards WHERE uuid = ?1;", [board_uuid.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "board",
                uuid: board_uuid,
            });
        }
        Ok(())
    }

    fn board_detail(&self, board_uuid: BoardId) -> RepoResult<Option<BoardDetail>> {
        // One read transaction so columns and tasks come from the same snapshot.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        let board = {
            let mut stmt = tx.prepare(&format!("{BOARD_SELECT_SQL} WHERE uuid = ?1;"))?;
            let mut rows = stmt.query([board_uuid.to_string()])?;
            match rows.next()? {
                Some(row) => parse_board_row(row)?,
                None => return Ok(None),
            }
        };

        let mut columns = Vec::new();
        for column in load_board_columns(&tx, board_uuid)? {
            let tasks = load_column_tasks(&tx, column.uuid)?;
            columns.push(ColumnWithTasks { column, tasks });
        }
        tx.commit()?;

        Ok(Some(BoardDetail { board, columns }))
    }

    fn create_column(&self, column: &Column) -> RepoResult<Column> {
        column.validate()?;
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let position = append_position(&tx, OrderedKind::Column, column.board_uuid)?;
        tx.execute(
            "INSERT INTO board_columns (uuid, board_uuid, name, position)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                column.uuid.to_string(),
                column.board_uuid.to_string(),
                column.name.trim(),
                position,
            ],
        )?;
        let created = load_required_column(&tx, column.uuid)?;
        tx.commit()?;
        Ok(created)
    }

    fn get_column(&self, column_uuid: ColumnId) -> RepoResult<Option<Column>> {
        load_column(self.conn, column_uuid)
    }

    fn list_columns(&self, board_uuid: BoardId) -> RepoResult<Vec<Column>> {
        load_board_columns(self.conn, board_uuid)
    }

    fn rename_column(&self, column_uuid: ColumnId, name: &str) -> RepoResult<()> {
        let name = normalize_text(name, "column name")?;
        let changed = self.conn.execute(
            "UPDATE board_columns
             SET name = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![column_uuid.to_string(), name],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "column",
                uuid: column_uuid,
            });
        }
        Ok(())
    }

    fn delete_column(&self, column_uuid: ColumnId) -> RepoResult<()> {
        self.order()
            .remove_item(OrderedKind::Column, column_uuid)
            .map_err(not_found_as_entity)?;
        Ok(())
    }

    fn move_column(
        &self,
        board_uuid: BoardId,
        column_uuid: ColumnId,
        source_index: i64,
        destination_index: i64,
    ) -> RepoResult<ReorderOutcome> {
        self.order()
            .move_within_scope(
                OrderedKind::Column,
                board_uuid,
                column_uuid,
                source_index,
                destination_index,
            )
            .map_err(Into::into)
    }
}

/// Maps a missing item on delete to the repository's plain not-found.
pub(crate) fn not_found_as_entity(err: OrderError) -> RepoError {
    match err {
        OrderError::NotFound { kind, item_uuid } => RepoError::NotFound {
            entity: kind.as_str(),
            uuid: item_uuid,
        },
        other => RepoError::Order(other),
    }
}

pub(crate) fn load_column(conn: &Connection, column_uuid: ColumnId) -> RepoResult<Option<Column>> {
    let mut stmt = conn.prepare(&format!("{COLUMN_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([column_uuid.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_column_row(row)?));
    }
    Ok(None)
}

fn load_required_column(conn: &Connection, column_uuid: ColumnId) -> RepoResult<Column> {
    load_column(conn, column_uuid)?.ok_or(RepoError::NotFound {
        entity: "column",
        uuid: column_uuid,
    })
}

fn load_board_columns(conn: &Connection, board_uuid: BoardId) -> RepoResult<Vec<Column>> {
    let mut stmt = conn.prepare(&format!(
        "{COLUMN_SELECT_SQL}
         WHERE board_uuid = ?1
         ORDER BY position ASC, uuid ASC;"
    ))?;
    let mut rows = stmt.query([board_uuid.to_string()])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(parse_column_row(row)?);
    }
    Ok(columns)
}

fn parse_board_row(row: &Row<'_>) -> RepoResult<Board> {
    let uuid_text: String = row.get("uuid")?;
    let owner_text: String = row.get("owner_uuid")?;
    let board = Board {
        uuid: parse_uuid(&uuid_text, "boards.uuid")?,
        owner_uuid: parse_uuid(&owner_text, "boards.owner_uuid")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    board.validate()?;
    Ok(board)
}

fn parse_column_row(row: &Row<'_>) -> RepoResult<Column> {
    let uuid_text: String = row.get("uuid")?;
    let board_text: String = row.get("board_uuid")?;
    let position: i64 = row.get("position")?;
    if position < 0 {
        return Err(RepoError::InvalidData(format!(
            "negative position `{position}` in board_columns.position"
        )));
    }
    let column = Column {
        uuid: parse_uuid(&uuid_text, "board_columns.uuid")?,
        board_uuid: parse_uuid(&board_text, "board_columns.board_uuid")?,
        name: row.get("name")?,
        position,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    column.validate()?;
    Ok(column)
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}
