//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `kanban_core` linkage.
//! - Run one append/reorder cycle against an in-memory board.
//! - Keep output deterministic for quick local sanity checks.

use kanban_core::db::migrations::latest_version;
use kanban_core::{
    open_db_in_memory, BoardService, CreateTaskRequest, SqliteBoardRepository,
    SqliteTaskRepository, TaskMove, TaskService,
};
use log::{error, info};
use std::process::ExitCode;
use uuid::Uuid;

fn main() -> ExitCode {
    if let Err(err) = kanban_core::logging::init_logging_from_env() {
        eprintln!("kanban_cli logging disabled: {err}");
    }

    println!("kanban_core ping={}", kanban_core::ping());
    println!("kanban_core version={}", kanban_core::core_version());
    println!("kanban_core schema_version={}", latest_version());

    match reorder_probe() {
        Ok(titles) => {
            info!("event=cli_probe module=cli status=ok");
            println!("kanban_core reorder_probe={}", titles.join(","));
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("event=cli_probe module=cli status=error error={}", err);
            eprintln!("kanban_core reorder_probe failed: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Appends A..D to a column, drags C to the top and returns the final order.
fn reorder_probe() -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let conn = open_db_in_memory()?;
    let owner = Uuid::new_v4();

    let boards = BoardService::new(SqliteBoardRepository::try_new(&conn)?);
    let tasks = TaskService::new(SqliteTaskRepository::try_new(&conn)?);

    let board = boards.create_board(owner, "Probe")?;
    let column = boards.create_column(owner, board.uuid, "Todo")?;

    let mut created = Vec::new();
    for title in ["A", "B", "C", "D"] {
        let request = CreateTaskRequest {
            title: title.to_string(),
            ..CreateTaskRequest::default()
        };
        created.push(tasks.create_task(owner, column.uuid, &request)?);
    }

    tasks.reorder_task(
        owner,
        &TaskMove {
            task_uuid: created[2].uuid,
            source_column_uuid: column.uuid,
            destination_column_uuid: column.uuid,
            source_index: 2,
            destination_index: 0,
        },
    )?;

    let ordered = tasks.list_tasks(owner, column.uuid)?;
    if ordered
        .iter()
        .enumerate()
        .any(|(index, task)| task.position != index as i64)
    {
        return Err("task positions are not dense".into());
    }
    Ok(ordered.into_iter().map(|task| task.title).collect())
}
