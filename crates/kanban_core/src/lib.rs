//! Core domain logic for the kanban board backend.
//! This crate is the single source of truth for ordering invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, open_db_with_config, DbConfig, DbError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::board::{Board, BoardId, Column, ColumnId, UserId};
pub use model::sequence::{ItemId, OrderedItem, OrderedKind, ScopeId, ScopeSequence};
pub use model::task::{Attachment, Comment, Task, TaskId, TaskPatch, TaskPriority};
pub use model::validation::ValidationError;
pub use repo::board_repo::{
    BoardDetail, BoardRepository, ColumnWithTasks, RepoError, RepoResult, SqliteBoardRepository,
};
pub use repo::order_repo::{
    OrderError, OrderErrorKind, OrderRepository, OrderResult, ReorderOutcome,
    SqliteOrderRepository,
};
pub use repo::task_repo::{SqliteTaskRepository, TaskDetail, TaskMove, TaskRepository};
pub use service::board_service::{BoardService, ServiceError, ServiceResult};
pub use service::task_service::{AttachmentRequest, CreateTaskRequest, TaskService};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
