//! Task repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over `tasks` plus attachment metadata and comments.
//! - Route task placement (append, move, delete) through the ordered
//!   collection manager.
//!
//! # Invariants
//! - Task listing is deterministic: `position ASC, uuid ASC`.
//! - `update_task` never writes `position` or `column_uuid`.
//! - Comments list newest first.

use crate::db::ensure_schema_ready;
use crate::model::board::{ColumnId, UserId};
use crate::model::sequence::OrderedKind;
use crate::model::task::{
    Attachment, AttachmentId, Comment, Task, TaskId, TaskPriority,
};
use crate::repo::board_repo::{not_found_as_entity, parse_uuid, RepoError, RepoResult};
use crate::repo::order_repo::{
    append_position, OrderRepository, ReorderOutcome, SqliteOrderRepository,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

const TASK_SELECT_SQL: &str = "SELECT
    uuid,
    column_uuid,
    title,
    description,
    priority,
    due_at,
    position,
    created_at,
    updated_at
FROM tasks";

const TASK_FIELDS: &[&str] = &[
    "uuid",
    "column_uuid",
    "title",
    "description",
    "priority",
    "due_at",
    "position",
];
const ATTACHMENT_FIELDS: &[&str] = &[
    "uuid",
    "task_uuid",
    "filename",
    "file_url",
    "file_type",
    "file_size",
];
const COMMENT_FIELDS: &[&str] = &["uuid", "task_uuid", "author_uuid", "content"];

/// Reorder request as sent by a drag-and-drop client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMove {
    pub task_uuid: TaskId,
    pub source_column_uuid: ColumnId,
    pub destination_column_uuid: ColumnId,
    pub source_index: i64,
    pub destination_index: i64,
}

/// Task with its attachments and comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDetail {
    pub task: Task,
    pub attachments: Vec<Attachment>,
    /// Newest first.
    pub comments: Vec<Comment>,
}

/// Repository interface for tasks and task details.
pub trait TaskRepository {
    /// Appends a task at the end of its column.
    fn create_task(&self, task: &Task) -> RepoResult<Task>;
    fn get_task(&self, task_uuid: TaskId) -> RepoResult<Option<Task>>;
    fn list_tasks(&self, column_uuid: ColumnId) -> RepoResult<Vec<Task>>;
    /// Persists title, description, priority and due date.
    fn update_task(&self, task: &Task) -> RepoResult<()>;
    /// Deletes a task and closes the gap in its column.
    fn delete_task(&self, task_uuid: TaskId) -> RepoResult<()>;
    /// Moves a task within its column or into another column.
    fn move_task(&self, request: &TaskMove) -> RepoResult<ReorderOutcome>;
    fn task_detail(&self, task_uuid: TaskId) -> RepoResult<Option<TaskDetail>>;
    fn add_attachment(&self, attachment: &Attachment) -> RepoResult<Attachment>;
    fn delete_attachment(&self, attachment_uuid: AttachmentId) -> RepoResult<()>;
    fn add_comment(&self, comment: &Comment) -> RepoResult<Comment>;
    fn list_comments(&self, task_uuid: TaskId) -> RepoResult<Vec<Comment>>;
    /// Owner of the board a column belongs to.
    fn column_owner(&self, column_uuid: ColumnId) -> RepoResult<Option<UserId>>;
    /// Owner of the board a task belongs to.
    fn task_owner(&self, task_uuid: TaskId) -> RepoResult<Option<UserId>>;
    /// Owner of the board an attachment belongs to.
    fn attachment_owner(&self, attachment_uuid: AttachmentId) -> RepoResult<Option<UserId>>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(
            conn,
            &[
                ("tasks", TASK_FIELDS),
                ("task_attachments", ATTACHMENT_FIELDS),
                ("task_comments", COMMENT_FIELDS),
            ],
        )?;
        Ok(Self { conn })
    }

    fn order(&self) -> SqliteOrderRepository<'conn> {
        SqliteOrderRepository::from_checked(self.conn)
    }

    fn lookup_owner(&self, sql: &str, uuid: uuid::Uuid) -> RepoResult<Option<UserId>> {
        let owner: Option<String> = self
            .conn
            .query_row(sql, [uuid.to_string()], |row| row.get(0))
            .optional()?;
        owner
            .map(|value| parse_uuid(&value, "boards.owner_uuid"))
            .transpose()
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create_task(&self, task: &Task) -> RepoResult<Task> {
        task.validate()?;
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let position = append_position(&tx, OrderedKind::Task, task.column_uuid)?;
        tx.execute(
            "INSERT INTO tasks (
                uuid,
                column_uuid,
                title,
                description,
                priority,
                due_at,
                position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                task.uuid.to_string(),
                task.column_uuid.to_string(),
                task.title.trim(),
                task.description.as_deref(),
                task.priority.as_str(),
                task.due_at,
                position,
            ],
        )?;
        let created = load_task(&tx, task.uuid)?.ok_or(RepoError::NotFound {
            entity: "task",
            uuid: task.uuid,
        })?;
        tx.commit()?;
        Ok(created)
    }

    fn get_task(&self, task_uuid: TaskId) -> RepoResult<Option<Task>> {
        load_task(self.conn, task_uuid)
    }

    fn list_tasks(&self, column_uuid: ColumnId) -> RepoResult<Vec<Task>> {
        load_column_tasks(self.conn, column_uuid)
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        task.validate()?;
        let changed = self.conn.execute(
            "UPDATE tasks
             SET title = ?2,
                 description = ?3,
                 priority = ?4,
                 due_at = ?5,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![
                task.uuid.to_string(),
                task.title.trim(),
                task.description.as_deref(),
                task.priority.as_str(),
                task.due_at,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "task",
                uuid: task.uuid,
            });
        }
        Ok(())
    }

    fn delete_task(&self, task_uuid: TaskId) -> RepoResult<()> {
        self.order()
            .remove_item(OrderedKind::Task, task_uuid)
            .map_err(not_found_as_entity)?;
        Ok(())
    }

    fn move_task(&self, request: &TaskMove) -> RepoResult<ReorderOutcome> {
        self.order()
            .move_across_scopes(
                OrderedKind::Task,
                request.task_uuid,
                request.source_column_uuid,
                request.destination_column_uuid,
                request.source_index,
                request.destination_index,
            )
            .map_err(Into::into)
    }

    fn task_detail(&self, task_uuid: TaskId) -> RepoResult<Option<TaskDetail>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        let Some(task) = load_task(&tx, task_uuid)? else {
            return Ok(None);
        };

        let mut attachments = Vec::new();
        {
            let mut stmt = tx.prepare(
                "SELECT uuid, task_uuid, filename, file_url, file_type, file_size, created_at
                 FROM task_attachments
                 WHERE task_uuid = ?1
                 ORDER BY created_at ASC, uuid ASC;",
            )?;
            let mut rows = stmt.query([task_uuid.to_string()])?;
            while let Some(row) = rows.next()? {
                attachments.push(parse_attachment_row(row)?);
            }
        }
        let comments = load_comments(&tx, task_uuid)?;
        tx.commit()?;

        Ok(Some(TaskDetail {
            task,
            attachments,
            comments,
        }))
    }

    fn add_attachment(&self, attachment: &Attachment) -> RepoResult<Attachment> {
        attachment.validate()?;
        if load_task(self.conn, attachment.task_uuid)?.is_none() {
            return Err(RepoError::NotFound {
                entity: "task",
                uuid: attachment.task_uuid,
            });
        }
        self.conn.execute(
            "INSERT INTO task_attachments (
                uuid,
                task_uuid,
                filename,
                file_url,
                file_type,
                file_size
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                attachment.uuid.to_string(),
                attachment.task_uuid.to_string(),
                attachment.filename.as_str(),
                attachment.file_url.as_str(),
                attachment.file_type.as_str(),
                attachment.file_size,
            ],
        )?;
        let mut stmt = self.conn.prepare(
            "SELECT uuid, task_uuid, filename, file_url, file_type, file_size, created_at
             FROM task_attachments
             WHERE uuid = ?1;",
        )?;
        let mut rows = stmt.query([attachment.uuid.to_string()])?;
        match rows.next()? {
            Some(row) => parse_attachment_row(row),
            None => Err(RepoError::NotFound {
                entity: "attachment",
                uuid: attachment.uuid,
            }),
        }
    }

    fn delete_attachment(&self, attachment_uuid: AttachmentId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM task_attachments WHERE uuid = ?1;",
            [attachment_uuid.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "attachment",
                uuid: attachment_uuid,
            });
        }
        Ok(())
    }

    fn add_comment(&self, comment: &Comment) -> RepoResult<Comment> {
        if load_task(self.conn, comment.task_uuid)?.is_none() {
            return Err(RepoError::NotFound {
                entity: "task",
                uuid: comment.task_uuid,
            });
        }
        self.conn.execute(
            "INSERT INTO task_comments (uuid, task_uuid, author_uuid, content)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                comment.uuid.to_string(),
                comment.task_uuid.to_string(),
                comment.author_uuid.to_string(),
                comment.content.as_str(),
            ],
        )?;
        load_comments(self.conn, comment.task_uuid)?
            .into_iter()
            .find(|stored| stored.uuid == comment.uuid)
            .ok_or(RepoError::NotFound {
                entity: "comment",
                uuid: comment.uuid,
            })
    }

    fn list_comments(&self, task_uuid: TaskId) -> RepoResult<Vec<Comment>> {
        load_comments(self.conn, task_uuid)
    }

    fn column_owner(&self, column_uuid: ColumnId) -> RepoResult<Option<UserId>> {
        self.lookup_owner(
            "SELECT b.owner_uuid
             FROM board_columns c
             INNER JOIN boards b ON b.uuid = c.board_uuid
             WHERE c.uuid = ?1;",
            column_uuid,
        )
    }

    fn task_owner(&self, task_uuid: TaskId) -> RepoResult<Option<UserId>> {
        self.lookup_owner(
            "SELECT b.owner_uuid
             FROM tasks t
             INNER JOIN board_columns c ON c.uuid = t.column_uuid
             INNER JOIN boards b ON b.uuid = c.board_uuid
             WHERE t.uuid = ?1;",
            task_uuid,
        )
    }

    fn attachment_owner(&self, attachment_uuid: AttachmentId) -> RepoResult<Option<UserId>> {
        self.lookup_owner(
            "SELECT b.owner_uuid
             FROM task_attachments a
             INNER JOIN tasks t ON t.uuid = a.task_uuid
             INNER JOIN board_columns c ON c.uuid = t.column_uuid
             INNER JOIN boards b ON b.uuid = c.board_uuid
             WHERE a.uuid = ?1;",
            attachment_uuid,
        )
    }
}

/// Loads a column's tasks in position order.
pub(crate) fn load_column_tasks(conn: &Connection, column_uuid: ColumnId) -> RepoResult<Vec<Task>> {
    let mut stmt = conn.prepare(&format!(
        "{TASK_SELECT_SQL}
         WHERE column_uuid = ?1
         ORDER BY position ASC, uuid ASC;"
    ))?;
    let mut rows = stmt.query([column_uuid.to_string()])?;
    let mut tasks = Vec::new();
    while let Some(row) = rows.next()? {
        tasks.push(parse_task_row(row)?);
    }
    Ok(tasks)
}

fn load_task(conn: &Connection, task_uuid: TaskId) -> RepoResult<Option<Task>> {
    let mut stmt = conn.prepare(&format!("{TASK_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([task_uuid.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_task_row(row)?));
    }
    Ok(None)
}

fn load_comments(conn: &Connection, task_uuid: TaskId) -> RepoResult<Vec<Comment>> {
    let mut stmt = conn.prepare(
        "SELECT uuid, task_uuid, author_uuid, content, created_at
         FROM task_comments
         WHERE task_uuid = ?1
         ORDER BY created_at DESC, rowid DESC;",
    )?;
    let mut rows = stmt.query([task_uuid.to_string()])?;
    let mut comments = Vec::new();
    while let Some(row) = rows.next()? {
        let uuid_text: String = row.get("uuid")?;
        let task_text: String = row.get("task_uuid")?;
        let author_text: String = row.get("author_uuid")?;
        comments.push(Comment {
            uuid: parse_uuid(&uuid_text, "task_comments.uuid")?,
            task_uuid: parse_uuid(&task_text, "task_comments.task_uuid")?,
            author_uuid: parse_uuid(&author_text, "task_comments.author_uuid")?,
            content: row.get("content")?,
            created_at: row.get("created_at")?,
        });
    }
    Ok(comments)
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let uuid_text: String = row.get("uuid")?;
    let column_text: String = row.get("column_uuid")?;
    let priority_text: String = row.get("priority")?;
    let priority = TaskPriority::parse(&priority_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid task priority `{priority_text}` in tasks.priority"
        ))
    })?;
    let position: i64 = row.get("position")?;
    if position < 0 {
        return Err(RepoError::InvalidData(format!(
            "negative position `{position}` in tasks.position"
        )));
    }

    let task = Task {
        uuid: parse_uuid(&uuid_text, "tasks.uuid")?,
        column_uuid: parse_uuid(&column_text, "tasks.column_uuid")?,
        title: row.get("title")?,
        description: row.get("description")?,
        priority,
        due_at: row.get("due_at")?,
        position,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    task.validate()?;
    Ok(task)
}

fn parse_attachment_row(row: &Row<'_>) -> RepoResult<Attachment> {
    let uuid_text: String = row.get("uuid")?;
    let task_text: String = row.get("task_uuid")?;
    let attachment = Attachment {
        uuid: parse_uuid(&uuid_text, "task_attachments.uuid")?,
        task_uuid: parse_uuid(&task_text, "task_attachments.task_uuid")?,
        filename: row.get("filename")?,
        file_url: row.get("file_url")?,
        file_type: row.get("file_type")?,
        file_size: row.get("file_size")?,
        created_at: row.get("created_at")?,
    };
    attachment.validate()?;
    Ok(attachment)
}
