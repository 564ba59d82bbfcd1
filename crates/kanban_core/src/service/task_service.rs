//! Task use-case service.
//!
//! # Responsibility
//! - Provide owner-scoped task, attachment and comment entry points.
//! - Route drag-and-drop reorders to the ordered collection manager.
//!
//! # Invariants
//! - Resources on another user's board are reported as not found.
//! - `update_task` never changes a task's column or position.

use crate::model::board::{ColumnId, UserId};
use crate::model::task::{
    Attachment, AttachmentId, Comment, Task, TaskId, TaskPatch, TaskPriority,
};
use crate::repo::order_repo::ReorderOutcome;
use crate::repo::task_repo::{TaskDetail, TaskMove, TaskRepository};
use crate::service::board_service::{ServiceError, ServiceResult};

/// Request model for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    /// Falls back to `TaskPriority::Medium`.
    pub priority: Option<TaskPriority>,
    /// Epoch ms due date.
    pub due_at: Option<i64>,
}

/// Request model for attaching uploaded file metadata to a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRequest {
    pub filename: String,
    pub file_url: String,
    pub file_type: String,
    pub file_size: i64,
}

/// Owner-scoped use-case service for tasks.
pub struct TaskService<R: TaskRepository> {
    repo: R,
}

impl<R: TaskRepository> TaskService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Appends a task at the end of the column.
    pub fn create_task(
        &self,
        owner: UserId,
        column_uuid: ColumnId,
        request: &CreateTaskRequest,
    ) -> ServiceResult<Task> {
        self.ensure_column(owner, column_uuid)?;
        let mut task = Task::new(column_uuid, &request.title)?;
        task.apply(&TaskPatch {
            description: Some(request.description.clone()),
            priority: Some(request.priority.unwrap_or_default()),
            due_at: Some(request.due_at),
            ..TaskPatch::default()
        })?;
        Ok(self.repo.create_task(&task)?)
    }

    pub fn list_tasks(&self, owner: UserId, column_uuid: ColumnId) -> ServiceResult<Vec<Task>> {
        self.ensure_column(owner, column_uuid)?;
        Ok(self.repo.list_tasks(column_uuid)?)
    }

    /// Loads a task with attachments and comments.
    pub fn get_task(&self, owner: UserId, task_uuid: TaskId) -> ServiceResult<TaskDetail> {
        self.ensure_task(owner, task_uuid)?;
        self.repo
            .task_detail(task_uuid)?
            .ok_or(ServiceError::TaskNotFound(task_uuid))
    }

    /// Applies a partial update to title, description, priority or due date.
    pub fn update_task(
        &self,
        owner: UserId,
        task_uuid: TaskId,
        patch: &TaskPatch,
    ) -> ServiceResult<Task> {
        self.ensure_task(owner, task_uuid)?;
        let mut task = self
            .repo
            .get_task(task_uuid)?
            .ok_or(ServiceError::TaskNotFound(task_uuid))?;
        task.apply(patch)?;
        self.repo.update_task(&task)?;
        self.repo
            .get_task(task_uuid)?
            .ok_or(ServiceError::TaskNotFound(task_uuid))
    }

    /// Deletes a task; later tasks in its column shift down by one.
    pub fn delete_task(&self, owner: UserId, task_uuid: TaskId) -> ServiceResult<()> {
        self.ensure_task(owner, task_uuid)?;
        Ok(self.repo.delete_task(task_uuid)?)
    }

    /// Applies a drag-and-drop move, within one column or across two.
    pub fn reorder_task(&self, owner: UserId, request: &TaskMove) -> ServiceResult<ReorderOutcome> {
        self.ensure_task(owner, request.task_uuid)?;
        self.ensure_column(owner, request.destination_column_uuid)?;
        Ok(self.repo.move_task(request)?)
    }

    pub fn add_attachment(
        &self,
        owner: UserId,
        task_uuid: TaskId,
        request: &AttachmentRequest,
    ) -> ServiceResult<Attachment> {
        self.ensure_task(owner, task_uuid)?;
        let attachment = Attachment::new(
            task_uuid,
            &request.filename,
            &request.file_url,
            &request.file_type,
            request.file_size,
        )?;
        Ok(self.repo.add_attachment(&attachment)?)
    }

    pub fn delete_attachment(
        &self,
        owner: UserId,
        attachment_uuid: AttachmentId,
    ) -> ServiceResult<()> {
        if self.repo.attachment_owner(attachment_uuid)? != Some(owner) {
            return Err(ServiceError::AttachmentNotFound(attachment_uuid));
        }
        Ok(self.repo.delete_attachment(attachment_uuid)?)
    }

    /// Adds a comment authored by `owner`.
    pub fn add_comment(
        &self,
        owner: UserId,
        task_uuid: TaskId,
        content: &str,
    ) -> ServiceResult<Comment> {
        self.ensure_task(owner, task_uuid)?;
        let comment = Comment::new(task_uuid, owner, content)?;
        Ok(self.repo.add_comment(&comment)?)
    }

    /// Lists comments newest first.
    pub fn list_comments(&self, owner: UserId, task_uuid: TaskId) -> ServiceResult<Vec<Comment>> {
        self.ensure_task(owner, task_uuid)?;
        Ok(self.repo.list_comments(task_uuid)?)
    }

    fn ensure_column(&self, owner: UserId, column_uuid: ColumnId) -> ServiceResult<()> {
        if self.repo.column_owner(column_uuid)? != Some(owner) {
            return Err(ServiceError::ColumnNotFound(column_uuid));
        }
        Ok(())
    }

    fn ensure_task(&self, owner: UserId, task_uuid: TaskId) -> ServiceResult<()> {
        if self.repo.task_owner(task_uuid)? != Some(owner) {
            return Err(ServiceError::TaskNotFound(task_uuid));
        }
        Ok(())
    }
}
