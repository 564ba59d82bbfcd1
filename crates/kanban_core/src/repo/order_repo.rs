//! Ordered collection manager: dense positions for columns and tasks.
//!
//! # Responsibility
//! - Assign append positions and apply move/remove reorders for one scope
//!   (board -> columns, column -> tasks).
//! - Own every SQL write to the `position` columns.
//!
//! # Invariants
//! - Between operations each scope's positions are exactly `0..N-1`.
//! - Every read-recompute-write cycle runs in one `BEGIN IMMEDIATE`
//!   transaction: the write lock is held before the sequence is read, so
//!   concurrent reorders serialize and always see a fresh sequence.
//! - A failed cycle rolls back; no partially rewritten scope is observable.
//! - Rewrites park the scope at negative positions first so the
//!   `UNIQUE(scope, position)` index holds after every statement.
//! - Inconsistent requests are rejected, never silently repaired.

use crate::db::{ensure_schema_ready, DbError};
use crate::model::sequence::{
    ItemId, OrderedItem, OrderedKind, ScopeId, ScopeSequence, SequenceError,
};
use log::{debug, error, info, warn};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

const COLUMN_FIELDS: &[&str] = &["uuid", "board_uuid", "position"];
const TASK_FIELDS: &[&str] = &["uuid", "column_uuid", "position"];

/// Result type used by ordered collection operations.
pub type OrderResult<T> = Result<T, OrderError>;

/// Coarse failure class reported to request handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderErrorKind {
    /// Item or scope is absent.
    NotFound,
    /// Index is negative or past the end.
    OutOfRange,
    /// Caller's view of the scope is stale.
    CrossScopeConflict,
    /// Store could not complete the atomic rewrite.
    PersistenceFailure,
}

/// Errors from ordered collection operations.
#[derive(Debug)]
pub enum OrderError {
    /// Item does not exist, or is not in the scope named by the caller.
    NotFound { kind: OrderedKind, item_uuid: ItemId },
    /// Parent scope does not exist.
    ScopeNotFound { kind: OrderedKind, scope_uuid: ScopeId },
    /// Index is negative, or a source index is `>= len`.
    OutOfRange { index: i64, len: usize },
    /// Item's recorded scope is not the caller's source scope.
    CrossScopeConflict {
        item_uuid: ItemId,
        expected_scope: ScopeId,
        actual_scope: ScopeId,
    },
    /// Item is in the expected scope but at another index.
    StalePosition {
        item_uuid: ItemId,
        expected_index: usize,
        actual_index: usize,
    },
    /// Items of this kind cannot change parent scope.
    ReparentNotSupported(OrderedKind),
    /// Underlying SQLite/bootstrap error; nothing was written.
    Persistence(DbError),
    /// Persisted rows cannot be decoded.
    InvalidData(String),
}

impl OrderError {
    /// Maps this error onto the four kinds handlers translate for clients.
    pub fn kind(&self) -> OrderErrorKind {
        match self {
            Self::NotFound { .. } | Self::ScopeNotFound { .. } => OrderErrorKind::NotFound,
            Self::OutOfRange { .. } => OrderErrorKind::OutOfRange,
            Self::CrossScopeConflict { .. }
            | Self::StalePosition { .. }
            | Self::ReparentNotSupported(_) => OrderErrorKind::CrossScopeConflict,
            Self::Persistence(_) | Self::InvalidData(_) => OrderErrorKind::PersistenceFailure,
        }
    }

    /// Whether a caller may retry the same request unchanged.
    ///
    /// Only store failures qualify; every other error means the caller's
    /// view is wrong and must be refreshed first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }

    /// Stable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::ScopeNotFound { .. } => "scope_not_found",
            Self::OutOfRange { .. } => "out_of_range",
            Self::CrossScopeConflict { .. } => "cross_scope_conflict",
            Self::StalePosition { .. } => "stale_position",
            Self::ReparentNotSupported(_) => "reparent_not_supported",
            Self::Persistence(err) if err.is_busy() => "persistence_busy",
            Self::Persistence(_) => "persistence_failure",
            Self::InvalidData(_) => "invalid_data",
        }
    }

    fn from_sequence(err: SequenceError, kind: OrderedKind, len: usize) -> Self {
        match err {
            SequenceError::NegativeIndex(index) => Self::OutOfRange { index, len },
            SequenceError::IndexOutOfRange { index, len } => Self::OutOfRange { index, len },
            SequenceError::ItemMissing(item_uuid) => Self::NotFound { kind, item_uuid },
            SequenceError::ItemMoved {
                item,
                expected_index,
                actual_index,
            } => Self::StalePosition {
                item_uuid: item,
                expected_index,
                actual_index,
            },
        }
    }
}

impl Display for OrderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { kind, item_uuid } => write!(f, "{kind} not found: {item_uuid}"),
            Self::ScopeNotFound { kind, scope_uuid } => {
                write!(f, "{} not found: {scope_uuid}", kind.scope_name())
            }
            Self::OutOfRange { index, len } => {
                write!(f, "index {index} is out of range for {len} items")
            }
            Self::CrossScopeConflict {
                item_uuid,
                expected_scope,
                actual_scope,
            } => write!(
                f,
                "item {item_uuid} is in scope {actual_scope}, not {expected_scope}"
            ),
            Self::StalePosition {
                item_uuid,
                expected_index,
                actual_index,
            } => write!(
                f,
                "item {item_uuid} is at index {actual_index}, not {expected_index}"
            ),
            Self::ReparentNotSupported(kind) => {
                write!(f, "{kind} items cannot move to another {}", kind.scope_name())
            }
            Self::Persistence(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid ordering data: {message}"),
        }
    }
}

impl Error for OrderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for OrderError {
    fn from(value: DbError) -> Self {
        Self::Persistence(value)
    }
}

impl From<rusqlite::Error> for OrderError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Persistence(DbError::Sqlite(value))
    }
}

/// Result of a reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReorderOutcome {
    /// Scope the item ends up in (its former scope for removals).
    pub scope_uuid: ScopeId,
    /// Final index of the moved item, or former index of a removed one.
    pub position: i64,
    /// Position rows rewritten; `0` for a no-op.
    pub rows_written: usize,
}

/// Ordered collection operations shared by columns and tasks.
pub trait OrderRepository {
    /// Lists one scope's items in position order.
    fn scope_items(&self, kind: OrderedKind, scope_uuid: ScopeId)
        -> OrderResult<Vec<OrderedItem>>;
    /// Returns the position the next append into `scope_uuid` receives.
    fn next_position(&self, kind: OrderedKind, scope_uuid: ScopeId) -> OrderResult<i64>;
    /// Moves an item to another index of the same scope.
    ///
    /// `destination_index` addresses the sequence with the item removed and
    /// clamps to the last slot.
    fn move_within_scope(
        &self,
        kind: OrderedKind,
        scope_uuid: ScopeId,
        item_uuid: ItemId,
        source_index: i64,
        destination_index: i64,
    ) -> OrderResult<ReorderOutcome>;
    /// Moves an item into another scope. Same-scope calls are routed to
    /// `move_within_scope`.
    fn move_across_scopes(
        &self,
        kind: OrderedKind,
        item_uuid: ItemId,
        source_scope_uuid: ScopeId,
        destination_scope_uuid: ScopeId,
        source_index: i64,
        destination_index: i64,
    ) -> OrderResult<ReorderOutcome>;
    /// Deletes an item and compacts its former siblings.
    fn remove_item(&self, kind: OrderedKind, item_uuid: ItemId) -> OrderResult<ReorderOutcome>;
}

/// SQLite-backed ordered collection manager.
pub struct SqliteOrderRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOrderRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> OrderResult<Self> {
        ensure_schema_ready(
            conn,
            &[("board_columns", COLUMN_FIELDS), ("tasks", TASK_FIELDS)],
        )?;
        Ok(Self { conn })
    }

    /// Wraps a connection already checked by another repository.
    pub(crate) fn from_checked(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn move_within_scope_tx(
        &self,
        kind: OrderedKind,
        scope_uuid: ScopeId,
        item_uuid: ItemId,
        source_index: i64,
        destination_index: i64,
    ) -> OrderResult<ReorderOutcome> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut sequence = load_sequence(&tx, kind, scope_uuid)?;
        let len = sequence.len();
        reject_negative(source_index, len)?;
        reject_negative(destination_index, len)?;
        if sequence.index_of(item_uuid).is_none() {
            return Err(OrderError::NotFound { kind, item_uuid });
        }

        let (source, destination) = sequence
            .move_item(item_uuid, source_index, destination_index)
            .map_err(|err| OrderError::from_sequence(err, kind, len))?;
        if source == destination {
            // Dropping the transaction releases the lock without writes.
            return Ok(ReorderOutcome {
                scope_uuid,
                position: destination as i64,
                rows_written: 0,
            });
        }

        park_scope(&tx, kind, scope_uuid)?;
        let rows_written = write_sequence(&tx, kind, scope_uuid, &sequence)?;
        tx.commit()?;

        Ok(ReorderOutcome {
            scope_uuid,
            position: destination as i64,
            rows_written,
        })
    }

    fn move_across_scopes_tx(
        &self,
        kind: OrderedKind,
        item_uuid: ItemId,
        source_scope_uuid: ScopeId,
        destination_scope_uuid: ScopeId,
        source_index: i64,
        destination_index: i64,
    ) -> OrderResult<ReorderOutcome> {
        if !kind.allows_reparent() {
            return Err(OrderError::ReparentNotSupported(kind));
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let current =
            load_item(&tx, kind, item_uuid)?.ok_or(OrderError::NotFound { kind, item_uuid })?;
        if current.scope_uuid != source_scope_uuid {
            return Err(OrderError::CrossScopeConflict {
                item_uuid,
                expected_scope: source_scope_uuid,
                actual_scope: current.scope_uuid,
            });
        }
        if !scope_exists(&tx, kind, destination_scope_uuid)? {
            return Err(OrderError::ScopeNotFound {
                kind,
                scope_uuid: destination_scope_uuid,
            });
        }

        let mut source = load_sequence(&tx, kind, source_scope_uuid)?;
        let source_len = source.len();
        reject_negative(destination_index, source_len)?;
        source
            .remove(item_uuid, source_index)
            .map_err(|err| OrderError::from_sequence(err, kind, source_len))?;

        let mut destination = load_sequence(&tx, kind, destination_scope_uuid)?;
        let destination_len = destination.len();
        let position = destination
            .insert(item_uuid, destination_index)
            .map_err(|err| OrderError::from_sequence(err, kind, destination_len))?;

        park_scope(&tx, kind, source_scope_uuid)?;
        park_scope(&tx, kind, destination_scope_uuid)?;
        // Destination first: it re-parents the moved row out of the parked
        // source scope before the source is rewritten.
        let mut rows_written = write_sequence(&tx, kind, destination_scope_uuid, &destination)?;
        rows_written += write_sequence(&tx, kind, source_scope_uuid, &source)?;
        tx.commit()?;

        Ok(ReorderOutcome {
            scope_uuid: destination_scope_uuid,
            position: position as i64,
            rows_written,
        })
    }

    fn remove_item_tx(&self, kind: OrderedKind, item_uuid: ItemId) -> OrderResult<ReorderOutcome> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let current =
            load_item(&tx, kind, item_uuid)?.ok_or(OrderError::NotFound { kind, item_uuid })?;

        let table = ScopeTable::of(kind);
        tx.execute(
            &format!("DELETE FROM {} WHERE uuid = ?1;", table.items),
            [item_uuid.to_string()],
        )?;

        let remaining = load_sequence(&tx, kind, current.scope_uuid)?;
        park_scope(&tx, kind, current.scope_uuid)?;
        let rows_written = write_sequence(&tx, kind, current.scope_uuid, &remaining)?;
        tx.commit()?;

        Ok(ReorderOutcome {
            scope_uuid: current.scope_uuid,
            position: current.position,
            rows_written,
        })
    }
}

impl OrderRepository for SqliteOrderRepository<'_> {
    fn scope_items(
        &self,
        kind: OrderedKind,
        scope_uuid: ScopeId,
    ) -> OrderResult<Vec<OrderedItem>> {
        if !scope_exists(self.conn, kind, scope_uuid)? {
            return Err(OrderError::ScopeNotFound { kind, scope_uuid });
        }
        load_scope_items(self.conn, kind, scope_uuid)
    }

    fn next_position(&self, kind: OrderedKind, scope_uuid: ScopeId) -> OrderResult<i64> {
        if !scope_exists(self.conn, kind, scope_uuid)? {
            return Err(OrderError::ScopeNotFound { kind, scope_uuid });
        }
        max_position_plus_one(self.conn, kind, scope_uuid)
    }

    fn move_within_scope(
        &self,
        kind: OrderedKind,
        scope_uuid: ScopeId,
        item_uuid: ItemId,
        source_index: i64,
        destination_index: i64,
    ) -> OrderResult<ReorderOutcome> {
        let started_at = Instant::now();
        let result = self.move_within_scope_tx(
            kind,
            scope_uuid,
            item_uuid,
            source_index,
            destination_index,
        );
        log_reorder("move_within", kind, ("scope", scope_uuid), &result, started_at);
        result
    }

    fn move_across_scopes(
        &self,
        kind: OrderedKind,
        item_uuid: ItemId,
        source_scope_uuid: ScopeId,
        destination_scope_uuid: ScopeId,
        source_index: i64,
        destination_index: i64,
    ) -> OrderResult<ReorderOutcome> {
        if source_scope_uuid == destination_scope_uuid {
            return self.move_within_scope(
                kind,
                source_scope_uuid,
                item_uuid,
                source_index,
                destination_index,
            );
        }

        let started_at = Instant::now();
        let result = self.move_across_scopes_tx(
            kind,
            item_uuid,
            source_scope_uuid,
            destination_scope_uuid,
            source_index,
            destination_index,
        );
        log_reorder(
            "move_across",
            kind,
            ("scope", source_scope_uuid),
            &result,
            started_at,
        );
        result
    }

    fn remove_item(&self, kind: OrderedKind, item_uuid: ItemId) -> OrderResult<ReorderOutcome> {
        let started_at = Instant::now();
        let result = self.remove_item_tx(kind, item_uuid);
        log_reorder("compact", kind, ("item", item_uuid), &result, started_at);
        result
    }
}

/// Returns the append position for a new item in `scope_uuid`.
///
/// Must run inside the caller's IMMEDIATE transaction together with the
/// insert, so two appends cannot claim the same slot.
pub(crate) fn append_position(
    conn: &Connection,
    kind: OrderedKind,
    scope_uuid: ScopeId,
) -> OrderResult<i64> {
    if !scope_exists(conn, kind, scope_uuid)? {
        warn!(
            "event=item_append module=order status=error kind={} error_code=scope_not_found",
            kind
        );
        return Err(OrderError::ScopeNotFound { kind, scope_uuid });
    }
    let position = max_position_plus_one(conn, kind, scope_uuid)?;
    debug!(
        "event=item_append module=order status=ok kind={} scope={} position={}",
        kind, scope_uuid, position
    );
    Ok(position)
}

/// Loads one scope's items in position order without an existence check.
pub(crate) fn load_scope_items(
    conn: &Connection,
    kind: OrderedKind,
    scope_uuid: ScopeId,
) -> OrderResult<Vec<OrderedItem>> {
    let table = ScopeTable::of(kind);
    let mut stmt = conn.prepare(&format!(
        "SELECT uuid, position
         FROM {items}
         WHERE {scope} = ?1
         ORDER BY position ASC, uuid ASC;",
        items = table.items,
        scope = table.scope_column,
    ))?;
    let mut rows = stmt.query([scope_uuid.to_string()])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        let uuid_text: String = row.get(0)?;
        items.push(OrderedItem {
            uuid: parse_uuid(&uuid_text, table.items)?,
            scope_uuid,
            position: row.get(1)?,
        });
    }
    Ok(items)
}

/// Table naming for one ordered kind.
struct ScopeTable {
    items: &'static str,
    scope_column: &'static str,
    scopes: &'static str,
}

impl ScopeTable {
    fn of(kind: OrderedKind) -> Self {
        match kind {
            OrderedKind::Column => Self {
                items: "board_columns",
                scope_column: "board_uuid",
                scopes: "boards",
            },
            OrderedKind::Task => Self {
                items: "tasks",
                scope_column: "column_uuid",
                scopes: "board_columns",
            },
        }
    }
}

fn load_sequence(
    conn: &Connection,
    kind: OrderedKind,
    scope_uuid: ScopeId,
) -> OrderResult<ScopeSequence> {
    let items = load_scope_items(conn, kind, scope_uuid)?;
    Ok(ScopeSequence::new(
        items.into_iter().map(|item| item.uuid).collect(),
    ))
}

fn load_item(
    conn: &Connection,
    kind: OrderedKind,
    item_uuid: ItemId,
) -> OrderResult<Option<OrderedItem>> {
    let table = ScopeTable::of(kind);
    let row: Option<(String, i64)> = conn
        .query_row(
            &format!(
                "SELECT {scope}, position FROM {items} WHERE uuid = ?1;",
                scope = table.scope_column,
                items = table.items,
            ),
            [item_uuid.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    row.map(|(scope_text, position)| -> OrderResult<OrderedItem> {
        Ok(OrderedItem {
            uuid: item_uuid,
            scope_uuid: parse_uuid(&scope_text, table.scope_column)?,
            position,
        })
    })
    .transpose()
}

fn scope_exists(conn: &Connection, kind: OrderedKind, scope_uuid: ScopeId) -> OrderResult<bool> {
    let table = ScopeTable::of(kind);
    let exists: i64 = conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE uuid = ?1);",
            table.scopes
        ),
        [scope_uuid.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn max_position_plus_one(
    conn: &Connection,
    kind: OrderedKind,
    scope_uuid: ScopeId,
) -> OrderResult<i64> {
    let table = ScopeTable::of(kind);
    let next = conn.query_row(
        &format!(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM {} WHERE {} = ?1;",
            table.items, table.scope_column
        ),
        [scope_uuid.to_string()],
        |row| row.get(0),
    )?;
    Ok(next)
}

/// Moves every position in the scope to `-1 - position`.
fn park_scope(conn: &Connection, kind: OrderedKind, scope_uuid: ScopeId) -> OrderResult<()> {
    let table = ScopeTable::of(kind);
    conn.execute(
        &format!(
            "UPDATE {} SET position = -1 - position WHERE {} = ?1;",
            table.items, table.scope_column
        ),
        [scope_uuid.to_string()],
    )?;
    Ok(())
}

/// Writes dense positions (and the scope, for re-parented rows).
fn write_sequence(
    conn: &Connection,
    kind: OrderedKind,
    scope_uuid: ScopeId,
    sequence: &ScopeSequence,
) -> OrderResult<usize> {
    let table = ScopeTable::of(kind);
    let sql = format!(
        "UPDATE {}
         SET {} = ?2,
             position = ?3,
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE uuid = ?1;",
        table.items, table.scope_column
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows_written = 0;
    for (item_uuid, position) in sequence.assignments() {
        let changed = stmt.execute(params![
            item_uuid.to_string(),
            scope_uuid.to_string(),
            position
        ])?;
        if changed != 1 {
            return Err(OrderError::NotFound { kind, item_uuid });
        }
        rows_written += 1;
    }
    Ok(rows_written)
}

fn reject_negative(index: i64, len: usize) -> OrderResult<()> {
    if index < 0 {
        return Err(OrderError::OutOfRange { index, len });
    }
    Ok(())
}

fn parse_uuid(value: &str, column: &'static str) -> OrderResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| OrderError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn log_reorder(
    operation: &'static str,
    kind: OrderedKind,
    (subject, subject_uuid): (&'static str, Uuid),
    result: &OrderResult<ReorderOutcome>,
    started_at: Instant,
) {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(outcome) if outcome.rows_written == 0 && operation != "compact" => debug!(
            "event=scope_reorder module=order status=noop op={} kind={} {}={} duration_ms={}",
            operation, kind, subject, subject_uuid, duration_ms
        ),
        Ok(outcome) => info!(
            "event=scope_reorder module=order status=ok op={} kind={} scope={} rows_written={} duration_ms={}",
            operation, kind, outcome.scope_uuid, outcome.rows_written, duration_ms
        ),
        Err(err) if err.kind() == OrderErrorKind::PersistenceFailure => error!(
            "event=scope_reorder module=order status=error op={} kind={} {}={} duration_ms={} error_code={} retryable={} error={}",
            operation,
            kind,
            subject,
            subject_uuid,
            duration_ms,
            err.code(),
            err.is_retryable(),
            err
        ),
        Err(err) => warn!(
            "event=scope_reorder module=order status=rejected op={} kind={} {}={} duration_ms={} error_code={}",
            operation,
            kind,
            subject,
            subject_uuid,
            duration_ms,
            err.code()
        ),
    }
}
