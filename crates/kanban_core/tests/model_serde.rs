use kanban_core::{OrderedKind, Task, TaskMove, TaskPatch, TaskPriority};
use serde_json::json;
use uuid::Uuid;

#[test]
fn task_serializes_priority_as_lowercase_string() {
    let task = Task::new(Uuid::new_v4(), "Serialize me").unwrap();

    let value = serde_json::to_value(&task).unwrap();

    assert_eq!(value["priority"], "medium");
    assert_eq!(value["title"], "Serialize me");
    assert_eq!(value["due_at"], serde_json::Value::Null);
}

#[test]
fn task_move_parses_drag_and_drop_payload() {
    let task = Uuid::new_v4();
    let source = Uuid::new_v4();
    let destination = Uuid::new_v4();

    let request: TaskMove = serde_json::from_value(json!({
        "task_uuid": task,
        "source_column_uuid": source,
        "destination_column_uuid": destination,
        "source_index": 2,
        "destination_index": 0,
    }))
    .unwrap();

    assert_eq!(request.task_uuid, task);
    assert_eq!(request.source_column_uuid, source);
    assert_eq!(request.destination_column_uuid, destination);
    assert_eq!((request.source_index, request.destination_index), (2, 0));
}

#[test]
fn task_patch_distinguishes_clear_from_absent() {
    let patch: TaskPatch = serde_json::from_value(json!({
        "priority": "high",
        "due_at": 1_700_000_000_000i64,
    }))
    .unwrap();

    assert_eq!(patch.priority, Some(TaskPriority::High));
    assert_eq!(patch.due_at, Some(Some(1_700_000_000_000)));
    assert_eq!(patch.title, None);
    assert_eq!(patch.description, None);

    let cleared: TaskPatch = serde_json::from_value(json!({
        "description": null,
        "due_at": null,
    }))
    .unwrap();

    assert_eq!(cleared.description, Some(None));
    assert_eq!(cleared.due_at, Some(None));
    assert_eq!(cleared.title, None);
    assert_eq!(cleared.priority, None);
}

#[test]
fn null_due_date_in_patch_clears_the_task_deadline() {
    let mut task = Task::new(Uuid::new_v4(), "Ship it").unwrap();
    task.due_at = Some(1_700_000_000_000);
    task.description = Some("before the freeze".to_string());

    let patch: TaskPatch = serde_json::from_value(json!({ "due_at": null })).unwrap();
    task.apply(&patch).unwrap();

    assert_eq!(task.due_at, None);
    assert_eq!(task.description.as_deref(), Some("before the freeze"));
    assert_eq!(serde_json::to_value(&patch).unwrap(), json!({
        "title": null,
        "priority": null,
        "due_at": null,
    }));
}

#[test]
fn unknown_priority_is_rejected() {
    let result = serde_json::from_value::<TaskPriority>(json!("urgent"));
    assert!(result.is_err());
    assert_eq!(serde_json::to_value(OrderedKind::Task).unwrap(), "task");
}
