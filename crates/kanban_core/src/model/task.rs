//! Task domain model with attachment and comment records.
//!
//! # Invariants
//! - A task belongs to exactly one column at a time; reorders may move it.
//! - `position` is assigned by storage on append and by reorders only.
//! - Attachments hold metadata only; the bytes live elsewhere.

use crate::model::board::{ColumnId, UserId};
use crate::model::validation::{normalize_file_type, normalize_text, ValidationError};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

pub type TaskId = Uuid;
pub type AttachmentId = Uuid;
pub type CommentId = Uuid;

/// Task urgency. Defaults to `Medium`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parses the stored or wire value; accepts any letter case.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub uuid: TaskId,
    pub column_uuid: ColumnId,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    /// Epoch ms due date.
    pub due_at: Option<i64>,
    /// Dense zero-based index among the column's tasks.
    pub position: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Task {
    /// Creates an unsaved task with default priority and no due date.
    pub fn new(column_uuid: ColumnId, title: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            uuid: Uuid::new_v4(),
            column_uuid,
            title: normalize_text(title, "task title")?,
            description: None,
            priority: TaskPriority::default(),
            due_at: None,
            position: 0,
            created_at: 0,
            updated_at: 0,
        })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        normalize_text(&self.title, "task title").map(|_| ())
    }

    /// Applies a partial update. Fields left `None` in `patch` are kept.
    pub fn apply(&mut self, patch: &TaskPatch) -> Result<(), ValidationError> {
        if let Some(title) = &patch.title {
            self.title = normalize_text(title, "task title")?;
        }
        if let Some(description) = &patch.description {
            self.description = description
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string);
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_at) = patch.due_at {
            self.due_at = due_at;
        }
        Ok(())
    }
}

/// Partial task update. The outer `Option` marks a field as present;
/// `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "present_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    pub priority: Option<TaskPriority>,
    #[serde(
        default,
        deserialize_with = "present_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_at: Option<Option<i64>>,
}

/// Maps a present field, `null` included, to `Some`. Absent fields fall back
/// to `#[serde(default)]`.
fn present_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub uuid: AttachmentId,
    pub task_uuid: TaskId,
    pub filename: String,
    /// Location in the external file store.
    pub file_url: String,
    /// Lowercase MIME type.
    pub file_type: String,
    /// Size in bytes.
    pub file_size: i64,
    pub created_at: i64,
}

impl Attachment {
    pub fn new(
        task_uuid: TaskId,
        filename: &str,
        file_url: &str,
        file_type: &str,
        file_size: i64,
    ) -> Result<Self, ValidationError> {
        let attachment = Self {
            uuid: Uuid::new_v4(),
            task_uuid,
            filename: normalize_text(filename, "attachment filename")?,
            file_url: normalize_text(file_url, "attachment url")?,
            file_type: normalize_file_type(file_type)?,
            file_size,
            created_at: 0,
        };
        attachment.validate()?;
        Ok(attachment)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        normalize_text(&self.filename, "attachment filename")?;
        normalize_text(&self.file_url, "attachment url")?;
        normalize_file_type(&self.file_type)?;
        if self.file_size < 0 {
            return Err(ValidationError::NegativeFileSize(self.file_size));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub uuid: CommentId,
    pub task_uuid: TaskId,
    pub author_uuid: UserId,
    pub content: String,
    pub created_at: i64,
}

impl Comment {
    pub fn new(
        task_uuid: TaskId,
        author_uuid: UserId,
        content: &str,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            uuid: Uuid::new_v4(),
            task_uuid,
            author_uuid,
            content: normalize_text(content, "comment")?,
            created_at: 0,
        })
    }
}
