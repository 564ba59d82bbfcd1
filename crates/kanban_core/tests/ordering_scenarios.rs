use kanban_core::model::sequence::is_dense;
use kanban_core::{
    open_db_in_memory, Board, BoardRepository, Column, ColumnId, OrderError, OrderErrorKind,
    OrderRepository, OrderedKind, SqliteBoardRepository, SqliteOrderRepository,
    SqliteTaskRepository, Task, TaskId, TaskMove, TaskRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

struct Fixture {
    conn: Connection,
    board: Board,
}

impl Fixture {
    fn new() -> Self {
        let conn = open_db_in_memory().unwrap();
        let board = Board::new(Uuid::new_v4(), "Sprint").unwrap();
        SqliteBoardRepository::try_new(&conn)
            .unwrap()
            .create_board(&board)
            .unwrap();
        Self { conn, board }
    }

    fn boards(&self) -> SqliteBoardRepository<'_> {
        SqliteBoardRepository::try_new(&self.conn).unwrap()
    }

    fn tasks(&self) -> SqliteTaskRepository<'_> {
        SqliteTaskRepository::try_new(&self.conn).unwrap()
    }

    fn order(&self) -> SqliteOrderRepository<'_> {
        SqliteOrderRepository::try_new(&self.conn).unwrap()
    }

    fn column(&self, name: &str) -> Column {
        let column = Column::new(self.board.uuid, name).unwrap();
        self.boards().create_column(&column).unwrap()
    }

    fn task(&self, column_uuid: ColumnId, title: &str) -> Task {
        let task = Task::new(column_uuid, title).unwrap();
        self.tasks().create_task(&task).unwrap()
    }

    fn titles(&self, column_uuid: ColumnId) -> Vec<String> {
        self.tasks()
            .list_tasks(column_uuid)
            .unwrap()
            .into_iter()
            .map(|task| task.title)
            .collect()
    }

    fn positions(&self, kind: OrderedKind, scope_uuid: Uuid) -> Vec<i64> {
        self.order()
            .scope_items(kind, scope_uuid)
            .unwrap()
            .into_iter()
            .map(|item| item.position)
            .collect()
    }

    fn move_task(
        &self,
        task_uuid: TaskId,
        source: ColumnId,
        destination: ColumnId,
        source_index: i64,
        destination_index: i64,
    ) -> Result<kanban_core::ReorderOutcome, OrderError> {
        self.order().move_across_scopes(
            OrderedKind::Task,
            task_uuid,
            source,
            destination,
            source_index,
            destination_index,
        )
    }
}

fn filled_column(fixture: &Fixture, name: &str, titles: &[&str]) -> (Column, Vec<Task>) {
    let column = fixture.column(name);
    let tasks = titles
        .iter()
        .map(|title| fixture.task(column.uuid, title))
        .collect();
    (column, tasks)
}

#[test]
fn appends_receive_consecutive_positions_from_zero() {
    let fixture = Fixture::new();
    let todo = fixture.column("Todo");
    let done = fixture.column("Done");
    assert_eq!((todo.position, done.position), (0, 1));

    assert_eq!(
        fixture.order().next_position(OrderedKind::Task, todo.uuid).unwrap(),
        0
    );
    let first = fixture.task(todo.uuid, "first");
    let second = fixture.task(todo.uuid, "second");
    assert_eq!((first.position, second.position), (0, 1));
    assert_eq!(
        fixture.order().next_position(OrderedKind::Task, todo.uuid).unwrap(),
        2
    );
}

#[test]
fn append_into_missing_scope_is_not_found() {
    let fixture = Fixture::new();
    let orphan = Task::new(Uuid::new_v4(), "orphan").unwrap();

    let err = fixture.tasks().create_task(&orphan).unwrap_err();
    match err {
        kanban_core::RepoError::Order(order) => {
            assert_eq!(order.kind(), OrderErrorKind::NotFound);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn moving_third_task_to_front_shifts_the_others_down() {
    let fixture = Fixture::new();
    let (column, tasks) = filled_column(&fixture, "Todo", &["A", "B", "C", "D"]);

    let outcome = fixture
        .move_task(tasks[2].uuid, column.uuid, column.uuid, 2, 0)
        .unwrap();

    assert_eq!(outcome.position, 0);
    assert_eq!(outcome.scope_uuid, column.uuid);
    assert_eq!(fixture.titles(column.uuid), ["C", "A", "B", "D"]);
    assert_eq!(
        fixture.positions(OrderedKind::Task, column.uuid),
        [0, 1, 2, 3]
    );
}

#[test]
fn moving_down_lands_on_destination_index() {
    let fixture = Fixture::new();
    let (column, tasks) = filled_column(&fixture, "Todo", &["A", "B", "C", "D"]);

    fixture
        .move_task(tasks[0].uuid, column.uuid, column.uuid, 0, 2)
        .unwrap();

    assert_eq!(fixture.titles(column.uuid), ["B", "C", "A", "D"]);
}

#[test]
fn move_and_move_back_restores_original_order() {
    let fixture = Fixture::new();
    let (column, tasks) = filled_column(&fixture, "Todo", &["A", "B", "C", "D", "E"]);

    fixture
        .move_task(tasks[1].uuid, column.uuid, column.uuid, 1, 3)
        .unwrap();
    fixture
        .move_task(tasks[1].uuid, column.uuid, column.uuid, 3, 1)
        .unwrap();

    assert_eq!(fixture.titles(column.uuid), ["A", "B", "C", "D", "E"]);
}

#[test]
fn same_index_move_writes_nothing() {
    let fixture = Fixture::new();
    let (column, tasks) = filled_column(&fixture, "Todo", &["A", "B", "C"]);
    let before = fixture.tasks().list_tasks(column.uuid).unwrap();

    let outcome = fixture
        .move_task(tasks[1].uuid, column.uuid, column.uuid, 1, 1)
        .unwrap();

    assert_eq!(outcome.rows_written, 0);
    assert_eq!(outcome.position, 1);
    assert_eq!(fixture.tasks().list_tasks(column.uuid).unwrap(), before);
}

#[test]
fn destination_past_the_end_clamps_within_scope() {
    let fixture = Fixture::new();
    let (column, tasks) = filled_column(&fixture, "Todo", &["A", "B", "C"]);

    let outcome = fixture
        .move_task(tasks[0].uuid, column.uuid, column.uuid, 0, 42)
        .unwrap();

    assert_eq!(outcome.position, 2);
    assert_eq!(fixture.titles(column.uuid), ["B", "C", "A"]);
}

#[test]
fn cross_scope_move_clamps_to_append_and_compacts_source() {
    let fixture = Fixture::new();
    let (source, source_tasks) = filled_column(&fixture, "Source", &["X1", "X2", "X3"]);
    let (destination, _) = filled_column(&fixture, "Destination", &["Y1"]);

    let outcome = fixture
        .move_task(source_tasks[1].uuid, source.uuid, destination.uuid, 1, 5)
        .unwrap();

    assert_eq!(outcome.scope_uuid, destination.uuid);
    assert_eq!(outcome.position, 1);
    assert_eq!(fixture.titles(source.uuid), ["X1", "X3"]);
    assert_eq!(fixture.titles(destination.uuid), ["Y1", "X2"]);
    assert_eq!(fixture.positions(OrderedKind::Task, source.uuid), [0, 1]);
    assert_eq!(fixture.positions(OrderedKind::Task, destination.uuid), [0, 1]);

    let moved = fixture
        .tasks()
        .get_task(source_tasks[1].uuid)
        .unwrap()
        .unwrap();
    assert_eq!(moved.column_uuid, destination.uuid);
    assert_eq!(moved.position, 1);
}

#[test]
fn cross_scope_move_into_middle_shifts_destination() {
    let fixture = Fixture::new();
    let (source, source_tasks) = filled_column(&fixture, "Source", &["X1"]);
    let (destination, _) = filled_column(&fixture, "Destination", &["Y1", "Y2", "Y3"]);

    fixture
        .move_task(source_tasks[0].uuid, source.uuid, destination.uuid, 0, 1)
        .unwrap();

    assert!(fixture.titles(source.uuid).is_empty());
    assert_eq!(fixture.titles(destination.uuid), ["Y1", "X1", "Y2", "Y3"]);
}

#[test]
fn cross_scope_move_conserves_item_count() {
    let fixture = Fixture::new();
    let (left, left_tasks) = filled_column(&fixture, "Left", &["L1", "L2", "L3", "L4"]);
    let (right, _) = filled_column(&fixture, "Right", &["R1", "R2"]);

    fixture
        .move_task(left_tasks[3].uuid, left.uuid, right.uuid, 3, 0)
        .unwrap();
    fixture
        .move_task(left_tasks[0].uuid, left.uuid, right.uuid, 0, 2)
        .unwrap();

    let left_len = fixture.titles(left.uuid).len();
    let right_len = fixture.titles(right.uuid).len();
    assert_eq!(left_len + right_len, 6);
    assert_eq!(fixture.titles(right.uuid), ["L4", "R1", "L1", "R2"]);
}

#[test]
fn task_move_request_routes_through_task_repository() {
    let fixture = Fixture::new();
    let (source, tasks) = filled_column(&fixture, "Source", &["A", "B"]);
    let destination = fixture.column("Destination");

    let outcome = fixture
        .tasks()
        .move_task(&TaskMove {
            task_uuid: tasks[0].uuid,
            source_column_uuid: source.uuid,
            destination_column_uuid: destination.uuid,
            source_index: 0,
            destination_index: 0,
        })
        .unwrap();

    assert_eq!(outcome.rows_written, 2);
    assert_eq!(fixture.titles(source.uuid), ["B"]);
    assert_eq!(fixture.titles(destination.uuid), ["A"]);
}

#[test]
fn rejected_moves_report_their_kind_and_change_nothing() {
    let fixture = Fixture::new();
    let (column, tasks) = filled_column(&fixture, "Todo", &["A", "B", "C"]);
    let (other, _) = filled_column(&fixture, "Other", &["Z"]);

    let cases = [
        (
            fixture.move_task(tasks[0].uuid, column.uuid, column.uuid, -1, 1),
            OrderErrorKind::OutOfRange,
        ),
        (
            fixture.move_task(tasks[0].uuid, column.uuid, column.uuid, 0, -1),
            OrderErrorKind::OutOfRange,
        ),
        (
            fixture.move_task(tasks[0].uuid, column.uuid, column.uuid, 3, 1),
            OrderErrorKind::OutOfRange,
        ),
        (
            fixture.move_task(Uuid::new_v4(), column.uuid, column.uuid, 0, 1),
            OrderErrorKind::NotFound,
        ),
        (
            fixture.move_task(tasks[2].uuid, column.uuid, column.uuid, 1, 0),
            OrderErrorKind::CrossScopeConflict,
        ),
        (
            fixture.move_task(tasks[0].uuid, other.uuid, column.uuid, 0, 0),
            OrderErrorKind::CrossScopeConflict,
        ),
        (
            fixture.move_task(tasks[0].uuid, column.uuid, Uuid::new_v4(), 0, 0),
            OrderErrorKind::NotFound,
        ),
        (
            fixture.move_task(tasks[0].uuid, column.uuid, other.uuid, 0, -3),
            OrderErrorKind::OutOfRange,
        ),
    ];

    for (result, expected) in cases {
        let err = result.unwrap_err();
        assert_eq!(err.kind(), expected, "unexpected kind for {err}");
        assert!(!err.is_retryable());
    }
    assert_eq!(fixture.titles(column.uuid), ["A", "B", "C"]);
    assert_eq!(fixture.titles(other.uuid), ["Z"]);
}

#[test]
fn stale_source_index_is_a_conflict_not_a_repair() {
    let fixture = Fixture::new();
    let (column, tasks) = filled_column(&fixture, "Todo", &["A", "B", "C"]);

    let err = fixture
        .move_task(tasks[0].uuid, column.uuid, column.uuid, 2, 0)
        .unwrap_err();

    assert!(matches!(
        err,
        OrderError::StalePosition {
            expected_index: 2,
            actual_index: 0,
            ..
        }
    ));
    assert_eq!(err.code(), "stale_position");
}

#[test]
fn columns_reorder_within_board_but_never_change_board() {
    let fixture = Fixture::new();
    let todo = fixture.column("Todo");
    fixture.column("Doing");
    let done = fixture.column("Done");

    fixture
        .boards()
        .move_column(fixture.board.uuid, done.uuid, 2, 0)
        .unwrap();
    let names = fixture
        .boards()
        .list_columns(fixture.board.uuid)
        .unwrap()
        .into_iter()
        .map(|column| column.name)
        .collect::<Vec<_>>();
    assert_eq!(names, ["Done", "Todo", "Doing"]);

    let other_board = Board::new(fixture.board.owner_uuid, "Other").unwrap();
    fixture.boards().create_board(&other_board).unwrap();
    let err = fixture
        .order()
        .move_across_scopes(
            OrderedKind::Column,
            todo.uuid,
            fixture.board.uuid,
            other_board.uuid,
            1,
            0,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::ReparentNotSupported(OrderedKind::Column)
    ));
    assert_eq!(err.kind(), OrderErrorKind::CrossScopeConflict);
    assert_eq!(
        fixture.positions(OrderedKind::Column, fixture.board.uuid),
        [0, 1, 2]
    );
}

#[test]
fn deleting_compacts_later_siblings() {
    let fixture = Fixture::new();
    let (column, tasks) = filled_column(&fixture, "Todo", &["A", "B", "C", "D"]);

    let outcome = fixture
        .order()
        .remove_item(OrderedKind::Task, tasks[1].uuid)
        .unwrap();

    assert_eq!(outcome.scope_uuid, column.uuid);
    assert_eq!(outcome.position, 1);
    assert_eq!(fixture.titles(column.uuid), ["A", "C", "D"]);
    assert_eq!(fixture.positions(OrderedKind::Task, column.uuid), [0, 1, 2]);
}

#[test]
fn deleting_twice_reports_not_found() {
    let fixture = Fixture::new();
    let (_, tasks) = filled_column(&fixture, "Todo", &["A"]);

    fixture
        .order()
        .remove_item(OrderedKind::Task, tasks[0].uuid)
        .unwrap();
    let err = fixture
        .order()
        .remove_item(OrderedKind::Task, tasks[0].uuid)
        .unwrap_err();

    assert_eq!(err.kind(), OrderErrorKind::NotFound);
}

#[test]
fn deleting_column_compacts_board_and_drops_its_tasks() {
    let fixture = Fixture::new();
    let first = fixture.column("First");
    let (middle, middle_tasks) = filled_column(&fixture, "Middle", &["M1", "M2"]);
    let last = fixture.column("Last");

    fixture.boards().delete_column(middle.uuid).unwrap();

    let columns = fixture.boards().list_columns(fixture.board.uuid).unwrap();
    assert_eq!(
        columns.iter().map(|column| column.uuid).collect::<Vec<_>>(),
        [first.uuid, last.uuid]
    );
    assert!(is_dense(columns.iter().map(|column| column.position)));
    assert!(fixture
        .tasks()
        .get_task(middle_tasks[0].uuid)
        .unwrap()
        .is_none());
}

#[test]
fn scope_items_of_missing_scope_is_not_found() {
    let fixture = Fixture::new();

    let err = fixture
        .order()
        .scope_items(OrderedKind::Task, Uuid::new_v4())
        .unwrap_err();

    assert!(matches!(err, OrderError::ScopeNotFound { .. }));
    assert_eq!(err.kind(), OrderErrorKind::NotFound);
}
