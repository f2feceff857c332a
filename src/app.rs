use chrono::NaiveDate;

use crate::auth::{AuthEvent, Session};
use crate::entities::{goal, task};
use crate::error::AppError;
use crate::model::{
    GoalChanges, GoalKind, GoalStatus, NewGoal, NewTask, Priority, SyncStatus, TaskChanges,
};
use crate::order::{next_order, reorder, OrderChange, Ordered};
use crate::store::Store;
use crate::util::{day_start_timestamp, now_timestamp, timestamp_day};
use crate::view::{self, GoalView};

/// Event handlers over the store plus the in-memory view state they keep
/// in step with it. The view is a cache; `reload` rebuilds it.
pub struct App {
    store: Store,
    session: Option<Session>,
    tasks: Vec<task::Model>,
    goals: Vec<goal::Model>,
}

/// Result of a drag/drop. `applied` orders were written and merged into
/// the view, `failed` ones were logged and left as they were.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveOutcome {
    pub sequence: Vec<i64>,
    pub applied: Vec<OrderChange>,
    pub failed: Vec<OrderChange>,
}

impl MoveOutcome {
    pub fn is_noop(&self) -> bool {
        self.sequence.is_empty()
    }
}

impl App {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            session: None,
            tasks: Vec::new(),
            goals: Vec::new(),
        }
    }

    pub fn tasks(&self) -> &[task::Model] {
        &self.tasks
    }

    pub async fn apply_auth(&mut self, event: AuthEvent) -> Result<(), AppError> {
        match event {
            AuthEvent::SignedIn(session) => {
                tracing::debug!(user_id = %session.user_id, "signed in");
                self.session = Some(session);
                self.tasks.clear();
                self.goals.clear();
                self.reload().await
            }
            AuthEvent::SignedOut => {
                tracing::debug!("signed out");
                self.session = None;
                self.tasks.clear();
                self.goals.clear();
                Ok(())
            }
        }
    }

    pub async fn reload(&mut self) -> Result<(), AppError> {
        let snapshot = self.store.list_tasks().await?;
        self.tasks = view::reconcile(&self.tasks, snapshot);
        self.goals = self.store.list_goals().await?;
        Ok(())
    }

    pub fn day_view(&self, day: NaiveDate) -> Vec<task::Model> {
        view::tasks_for_day(&self.tasks, day)
    }

    pub fn goal_view(&self, kind: GoalKind) -> Result<GoalView, AppError> {
        let owner = self.require_user()?;
        Ok(view::goals_for(&self.goals, kind, &owner.user_id))
    }

    pub async fn add_task(&mut self, text: &str, day: NaiveDate) -> Result<task::Model, AppError> {
        let text = ensure_non_empty("task text", text)?;
        let user_id = self.require_user()?.user_id.clone();
        let partition = view::day_partition(&self.tasks, day);
        let input = NewTask {
            text,
            is_complete: false,
            inserted_at: day_start_timestamp(day),
            user_id,
            status: SyncStatus::Pending,
            priority: Priority::Medium,
            sort_order: next_order(&partition),
        };
        let id = self.store.insert_task(input).await.map_err(|err| {
            tracing::warn!(error = %err, "task insert failed");
            err
        })?;
        let created = self.store.get_task(id).await?;
        self.tasks.push(created.clone());
        Ok(created)
    }

    /// Flips completion. The returned record carries `status = failed`
    /// when the write did not reach the store.
    pub async fn toggle_task(&mut self, id: i64) -> Result<task::Model, AppError> {
        self.require_user()?;
        let previous = self.task_in_view(id)?;
        let mut next = previous.clone();
        next.is_complete = !previous.is_complete;
        next.status = Some(SyncStatus::Synced.as_str().to_string());
        let changes = TaskChanges {
            is_complete: Some(next.is_complete),
            status: Some(SyncStatus::Synced),
            ..Default::default()
        };
        self.write_task(previous, next, changes).await
    }

    pub async fn edit_task(&mut self, id: i64, text: &str) -> Result<task::Model, AppError> {
        let text = ensure_non_empty("task text", text)?;
        self.require_user()?;
        let previous = self.task_in_view(id)?;
        let mut next = previous.clone();
        next.text = text.clone();
        next.status = Some(SyncStatus::Synced.as_str().to_string());
        let changes = TaskChanges {
            text: Some(text),
            status: Some(SyncStatus::Synced),
            ..Default::default()
        };
        self.write_task(previous, next, changes).await
    }

    pub async fn set_priority(
        &mut self,
        id: i64,
        priority: Priority,
    ) -> Result<task::Model, AppError> {
        self.require_user()?;
        let previous = self.task_in_view(id)?;
        let mut next = previous.clone();
        next.priority = Some(priority.as_str().to_string());
        next.status = Some(SyncStatus::Synced.as_str().to_string());
        let changes = TaskChanges {
            priority: Some(priority),
            status: Some(SyncStatus::Synced),
            ..Default::default()
        };
        self.write_task(previous, next, changes).await
    }

    /// `Ok(false)` when the delete failed to persist and the record was
    /// marked failed instead.
    pub async fn delete_task(&mut self, id: i64) -> Result<bool, AppError> {
        self.require_user()?;
        let previous = self.task_in_view(id)?;
        match self.store.delete_task(id).await {
            Ok(()) => {
                self.tasks.retain(|task| task.id != id);
                Ok(true)
            }
            Err(AppError::NotFound(message)) => {
                self.tasks.retain(|task| task.id != id);
                Err(AppError::NotFound(message))
            }
            Err(err) => {
                tracing::warn!(task_id = id, error = %err, "task delete failed");
                let mut failed = previous;
                failed.status = Some(SyncStatus::Failed.as_str().to_string());
                self.replace_task(failed);
                Ok(false)
            }
        }
    }

    pub async fn move_task(&mut self, dragged: i64, target: i64) -> Result<MoveOutcome, AppError> {
        self.require_user()?;
        let source = self.task_in_view(dragged)?;
        let Some(day) = timestamp_day(&source.inserted_at) else {
            return Err(AppError::Validation(format!(
                "task {dragged} has an unreadable creation date"
            )));
        };
        let partition = view::day_partition(&self.tasks, day);
        let Some(plan) = reorder(&partition, dragged, target) else {
            return Ok(MoveOutcome::default());
        };

        let mut outcome = MoveOutcome {
            sequence: plan.sequence,
            ..Default::default()
        };
        for change in plan.changes {
            let write = TaskChanges {
                sort_order: Some(change.order),
                ..Default::default()
            };
            match self.store.update_task(change.id, write).await {
                Ok(()) => outcome.applied.push(change),
                Err(err) => {
                    tracing::warn!(task_id = change.id, order = change.order, error = %err, "order write failed");
                    outcome.failed.push(change);
                }
            }
        }
        merge_orders(&mut self.tasks, &outcome.applied);
        Ok(outcome)
    }

    pub async fn add_goal(&mut self, title: &str, kind: GoalKind) -> Result<goal::Model, AppError> {
        let title = ensure_non_empty("goal title", title)?;
        let user_id = self.require_user()?.user_id.clone();
        let partition = view::goal_partition(&self.goals, kind, &user_id);
        let input = NewGoal {
            title,
            kind,
            created_at: now_timestamp(),
            user_id,
            status: GoalStatus::Active,
            sort_order: next_order(&partition),
        };
        let id = self.store.insert_goal(input).await?;
        let created = self.store.get_goal(id).await?;
        self.goals.push(created.clone());
        Ok(created)
    }

    /// Completed goals become active again; every other status completes.
    pub async fn toggle_goal(&mut self, id: i64) -> Result<goal::Model, AppError> {
        self.require_user()?;
        let previous = self.goal_in_view(id)?;
        let status = match previous.status.as_deref().and_then(GoalStatus::parse) {
            Some(GoalStatus::Completed) => GoalStatus::Active,
            _ => GoalStatus::Completed,
        };
        let mut next = previous.clone();
        next.status = Some(status.as_str().to_string());
        let changes = GoalChanges {
            status: Some(status),
            ..Default::default()
        };
        self.write_goal(previous, next, changes).await
    }

    pub async fn edit_goal(&mut self, id: i64, title: &str) -> Result<goal::Model, AppError> {
        let title = ensure_non_empty("goal title", title)?;
        self.require_user()?;
        let previous = self.goal_in_view(id)?;
        let mut next = previous.clone();
        next.title = title.clone();
        let changes = GoalChanges {
            title: Some(title),
            ..Default::default()
        };
        self.write_goal(previous, next, changes).await
    }

    pub async fn delete_goal(&mut self, id: i64) -> Result<(), AppError> {
        self.require_user()?;
        self.goal_in_view(id)?;
        let result = self.store.delete_goal(id).await;
        if matches!(result, Ok(()) | Err(AppError::NotFound(_))) {
            self.goals.retain(|goal| goal.id != id);
        }
        result
    }

    pub async fn move_goal(&mut self, dragged: i64, target: i64) -> Result<MoveOutcome, AppError> {
        let owner = self.require_user()?.user_id.clone();
        let source = self.goal_in_view(dragged)?;
        let Some(kind) = GoalKind::parse(&source.kind) else {
            return Err(AppError::Validation(format!(
                "goal {dragged} has unknown type '{}'",
                source.kind
            )));
        };
        let partition = view::goal_partition(&self.goals, kind, &owner);
        let Some(plan) = reorder(&partition, dragged, target) else {
            return Ok(MoveOutcome::default());
        };

        let mut outcome = MoveOutcome {
            sequence: plan.sequence,
            ..Default::default()
        };
        for change in plan.changes {
            let write = GoalChanges {
                sort_order: Some(change.order),
                ..Default::default()
            };
            match self.store.update_goal(change.id, write).await {
                Ok(()) => outcome.applied.push(change),
                Err(err) => {
                    tracing::warn!(goal_id = change.id, order = change.order, error = %err, "order write failed");
                    outcome.failed.push(change);
                }
            }
        }
        merge_orders(&mut self.goals, &outcome.applied);
        Ok(outcome)
    }

    fn require_user(&self) -> Result<&Session, AppError> {
        self.session.as_ref().ok_or(AppError::Unauthenticated)
    }

    fn task_in_view(&self, id: i64) -> Result<task::Model, AppError> {
        self.tasks
            .iter()
            .find(|task| task.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("task id {id}")))
    }

    fn goal_in_view(&self, id: i64) -> Result<goal::Model, AppError> {
        self.goals
            .iter()
            .find(|goal| goal.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("goal id {id}")))
    }

    fn replace_task(&mut self, updated: task::Model) {
        if let Some(slot) = self.tasks.iter_mut().find(|task| task.id == updated.id) {
            *slot = updated;
        }
    }

    fn replace_goal(&mut self, updated: goal::Model) {
        if let Some(slot) = self.goals.iter_mut().find(|goal| goal.id == updated.id) {
            *slot = updated;
        }
    }

    /// Shows `next` right away, then writes. A store miss drops the record
    /// from the view; any other failure restores `previous` marked failed.
    async fn write_task(
        &mut self,
        previous: task::Model,
        next: task::Model,
        changes: TaskChanges,
    ) -> Result<task::Model, AppError> {
        let id = previous.id;
        self.replace_task(next.clone());
        match self.store.update_task(id, changes).await {
            Ok(()) => Ok(next),
            Err(AppError::NotFound(message)) => {
                self.tasks.retain(|task| task.id != id);
                Err(AppError::NotFound(message))
            }
            Err(err) => {
                tracing::warn!(task_id = id, error = %err, "task write failed");
                let mut failed = previous;
                failed.status = Some(SyncStatus::Failed.as_str().to_string());
                self.replace_task(failed.clone());
                Ok(failed)
            }
        }
    }

    // Goals have no sync marker, so a failed write rolls back and surfaces the error.
    async fn write_goal(
        &mut self,
        previous: goal::Model,
        next: goal::Model,
        changes: GoalChanges,
    ) -> Result<goal::Model, AppError> {
        let id = previous.id;
        self.replace_goal(next.clone());
        match self.store.update_goal(id, changes).await {
            Ok(()) => Ok(next),
            Err(AppError::NotFound(message)) => {
                self.goals.retain(|goal| goal.id != id);
                Err(AppError::NotFound(message))
            }
            Err(err) => {
                tracing::warn!(goal_id = id, error = %err, "goal write failed");
                self.replace_goal(previous);
                Err(err)
            }
        }
    }
}

fn merge_orders<T>(items: &mut [T], applied: &[OrderChange])
where
    T: Ordered + SetOrder,
{
    for change in applied {
        if let Some(item) = items.iter_mut().find(|item| item.id() == change.id) {
            item.set_sort_order(change.order);
        }
    }
}

trait SetOrder {
    fn set_sort_order(&mut self, order: i64);
}

impl SetOrder for task::Model {
    fn set_sort_order(&mut self, order: i64) {
        self.sort_order = Some(order);
    }
}

impl SetOrder for goal::Model {
    fn set_sort_order(&mut self, order: i64) {
        self.sort_order = Some(order);
    }
}

fn ensure_non_empty(label: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{label} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use sea_orm::ConnectionTrait;
    use tempfile::TempDir;

    fn session(user_id: &str) -> Session {
        Session {
            user_id: user_id.to_string(),
            email: None,
            created_at: None,
            last_sign_in_at: None,
            provider: None,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    async fn setup_app() -> (TempDir, App) {
        let dir = TempDir::new().expect("temp dir");
        let db_path = db::resolve_db_path(dir.path());
        db::ensure_parent_dir(&db_path).expect("ensure parent");
        let (conn, _) = db::open(&db_path).await.expect("open db");
        let mut app = App::new(Store::new(conn));
        app.apply_auth(AuthEvent::SignedIn(session("u1")))
            .await
            .expect("sign in");
        (dir, app)
    }

    fn ids(tasks: &[task::Model]) -> Vec<i64> {
        tasks.iter().map(|task| task.id).collect()
    }

    #[tokio::test]
    async fn first_task_of_a_day_gets_order_one() {
        let (_dir, mut app) = setup_app().await;
        let task = app
            .add_task("Buy milk", day(2024, 3, 10))
            .await
            .expect("add task");
        assert_eq!(task.text, "Buy milk");
        assert_eq!(task.sort_order, Some(1));
        assert_eq!(task.priority.as_deref(), Some("medium"));
        assert_eq!(task.status.as_deref(), Some("pending"));
        assert!(!task.is_complete);
        assert_eq!(task.user_id.as_deref(), Some("u1"));

        let second = app
            .add_task("Walk dog", day(2024, 3, 10))
            .await
            .expect("add task");
        let other_day = app
            .add_task("Pay rent", day(2024, 3, 11))
            .await
            .expect("add task");
        assert_eq!(second.sort_order, Some(2));
        assert_eq!(other_day.sort_order, Some(1));
    }

    #[tokio::test]
    async fn add_rejects_blank_text_and_missing_session() {
        let (_dir, mut app) = setup_app().await;
        let err = app.add_task("   ", day(2024, 3, 10)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        app.apply_auth(AuthEvent::SignedOut).await.expect("sign out");
        let err = app.add_task("Buy milk", day(2024, 3, 10)).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
        assert!(app.store.list_tasks().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn toggled_task_sinks_without_reload() {
        let (_dir, mut app) = setup_app().await;
        let d = day(2024, 3, 10);
        let first = app.add_task("a", d).await.expect("add");
        let second = app.add_task("b", d).await.expect("add");

        let toggled = app.toggle_task(first.id).await.expect("toggle");
        assert!(toggled.is_complete);
        assert_eq!(toggled.status.as_deref(), Some("synced"));
        assert_eq!(ids(&app.day_view(d)), vec![second.id, first.id]);

        let stored = app.store.get_task(first.id).await.expect("get");
        assert!(stored.is_complete);
        assert_eq!(stored.status.as_deref(), Some("synced"));
    }

    #[tokio::test]
    async fn priority_and_edit_are_written_through() {
        let (_dir, mut app) = setup_app().await;
        let d = day(2024, 3, 10);
        let low = app.add_task("low", d).await.expect("add");
        let high = app.add_task("high", d).await.expect("add");
        app.set_priority(high.id, Priority::High)
            .await
            .expect("priority");
        app.set_priority(low.id, Priority::Low)
            .await
            .expect("priority");
        app.edit_task(low.id, "  renamed  ").await.expect("edit");

        assert_eq!(ids(&app.day_view(d)), vec![high.id, low.id]);
        let stored = app.store.get_task(low.id).await.expect("get");
        assert_eq!(stored.text, "renamed");
        assert_eq!(stored.priority.as_deref(), Some("low"));
    }

    #[tokio::test]
    async fn drag_third_task_onto_first() {
        let (_dir, mut app) = setup_app().await;
        let d = day(2024, 3, 10);
        let a = app.add_task("A", d).await.expect("add").id;
        let b = app.add_task("B", d).await.expect("add").id;
        let c = app.add_task("C", d).await.expect("add").id;
        let e = app.add_task("D", d).await.expect("add").id;
        app.add_task("elsewhere", day(2024, 3, 11))
            .await
            .expect("add");

        let outcome = app.move_task(c, a).await.expect("move");
        assert_eq!(outcome.sequence, vec![c, a, b, e]);
        assert_eq!(
            outcome.applied,
            vec![
                OrderChange { id: c, order: 0 },
                OrderChange { id: e, order: 3 },
            ]
        );
        assert!(outcome.failed.is_empty());
        assert_eq!(ids(&app.day_view(d)), vec![c, a, b, e]);

        let stored: Vec<_> = app
            .store
            .list_tasks()
            .await
            .expect("list")
            .into_iter()
            .filter(|task| task.text != "elsewhere")
            .map(|task| (task.id, task.sort_order))
            .collect();
        assert_eq!(
            stored,
            vec![(a, Some(1)), (b, Some(2)), (c, Some(0)), (e, Some(3))]
        );
    }

    #[tokio::test]
    async fn move_across_days_is_a_no_op() {
        let (_dir, mut app) = setup_app().await;
        let a = app.add_task("A", day(2024, 3, 10)).await.expect("add").id;
        let b = app.add_task("B", day(2024, 3, 11)).await.expect("add").id;
        let outcome = app.move_task(a, b).await.expect("move");
        assert!(outcome.is_noop());
        let err = app.move_task(99, a).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn failed_write_marks_record_and_survives_reload() {
        let (_dir, mut app) = setup_app().await;
        let d = day(2024, 3, 10);
        let task = app.add_task("a", d).await.expect("add");

        app.store
            .connection()
            .execute_unprepared("ALTER TABLE tasks RENAME TO tasks_offline")
            .await
            .expect("take table offline");
        let failed = app.toggle_task(task.id).await.expect("toggle");
        assert!(!failed.is_complete);
        assert_eq!(failed.status.as_deref(), Some("failed"));

        app.store
            .connection()
            .execute_unprepared("ALTER TABLE tasks_offline RENAME TO tasks")
            .await
            .expect("bring table back");
        app.reload().await.expect("reload");
        assert_eq!(app.tasks()[0].status.as_deref(), Some("failed"));

        let retried = app.toggle_task(task.id).await.expect("retry");
        assert!(retried.is_complete);
        assert_eq!(retried.status.as_deref(), Some("synced"));
    }

    async fn exec(app: &App, sql: &str) {
        app.store
            .connection()
            .execute_unprepared(sql)
            .await
            .expect("execute sql");
    }

    #[tokio::test]
    async fn retried_edit_and_priority_clear_failed_marker() {
        let (_dir, mut app) = setup_app().await;
        let d = day(2024, 3, 10);
        let task = app.add_task("a", d).await.expect("add");

        exec(&app, "ALTER TABLE tasks RENAME TO tasks_offline").await;
        let failed = app.edit_task(task.id, "b").await.expect("edit");
        assert_eq!(failed.text, "a");
        assert_eq!(failed.status.as_deref(), Some("failed"));
        exec(&app, "ALTER TABLE tasks_offline RENAME TO tasks").await;

        let retried = app.edit_task(task.id, "b").await.expect("retry edit");
        assert_eq!(retried.text, "b");
        assert_eq!(retried.status.as_deref(), Some("synced"));
        let stored = app.store.get_task(task.id).await.expect("get");
        assert_eq!(stored.status.as_deref(), Some("synced"));

        exec(&app, "ALTER TABLE tasks RENAME TO tasks_offline").await;
        let failed = app
            .set_priority(task.id, Priority::High)
            .await
            .expect("priority");
        assert_eq!(failed.status.as_deref(), Some("failed"));
        exec(&app, "ALTER TABLE tasks_offline RENAME TO tasks").await;

        let retried = app
            .set_priority(task.id, Priority::High)
            .await
            .expect("retry priority");
        assert_eq!(retried.status.as_deref(), Some("synced"));
        app.reload().await.expect("reload");
        assert_eq!(app.tasks()[0].status.as_deref(), Some("synced"));
        assert_eq!(app.tasks()[0].priority.as_deref(), Some("high"));
    }

    #[tokio::test]
    async fn partially_failed_move_merges_only_written_orders() {
        let (_dir, mut app) = setup_app().await;
        let d = day(2024, 3, 10);
        let a = app.add_task("A", d).await.expect("add").id;
        let b = app.add_task("B", d).await.expect("add").id;
        let c = app.add_task("C", d).await.expect("add").id;
        let e = app.add_task("D", d).await.expect("add").id;

        exec(
            &app,
            &format!(
                "CREATE TRIGGER lock_order BEFORE UPDATE OF sort_order ON tasks \
                 WHEN NEW.id = {e} BEGIN SELECT RAISE(ABORT, 'locked'); END"
            ),
        )
        .await;
        let outcome = app.move_task(c, a).await.expect("move");
        assert_eq!(outcome.applied, vec![OrderChange { id: c, order: 0 }]);
        assert_eq!(outcome.failed, vec![OrderChange { id: e, order: 3 }]);

        let orders = |tasks: &[task::Model]| -> Vec<(i64, Option<i64>)> {
            tasks.iter().map(|task| (task.id, task.sort_order)).collect()
        };
        let expected = vec![(a, Some(1)), (b, Some(2)), (c, Some(0)), (e, Some(4))];
        assert_eq!(orders(app.tasks()), expected);

        app.reload().await.expect("reload");
        assert_eq!(orders(app.tasks()), expected);
        let stored = app.store.list_tasks().await.expect("list");
        assert_eq!(orders(&stored), expected);
    }

    #[tokio::test]
    async fn failed_delete_keeps_record_marked() {
        let (_dir, mut app) = setup_app().await;
        let d = day(2024, 3, 10);
        let task = app.add_task("a", d).await.expect("add");

        exec(
            &app,
            "CREATE TRIGGER keep_tasks BEFORE DELETE ON tasks \
             BEGIN SELECT RAISE(ABORT, 'locked'); END",
        )
        .await;
        assert!(!app.delete_task(task.id).await.expect("delete"));
        let view = app.day_view(d);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].status.as_deref(), Some("failed"));

        exec(&app, "DROP TRIGGER keep_tasks").await;
        assert!(app.delete_task(task.id).await.expect("retry delete"));
        assert!(app.day_view(d).is_empty());
        assert!(app.store.list_tasks().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn failed_goal_write_rolls_back() {
        let (_dir, mut app) = setup_app().await;
        let goal = app.add_goal("Run 5k", GoalKind::Short).await.expect("add");

        exec(
            &app,
            "CREATE TRIGGER lock_goals BEFORE UPDATE ON goals \
             BEGIN SELECT RAISE(ABORT, 'locked'); END",
        )
        .await;
        let err = app.edit_goal(goal.id, "Run 10k").await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
        let err = app.toggle_goal(goal.id).await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));

        let view = app.goal_view(GoalKind::Short).expect("view");
        assert_eq!(view.active.len(), 1);
        assert_eq!(view.active[0].title, "Run 5k");
        let stored = app.store.get_goal(goal.id).await.expect("get");
        assert_eq!(stored.title, "Run 5k");
        assert_eq!(stored.status.as_deref(), Some("active"));
    }

    #[tokio::test]
    async fn delete_removes_from_view_and_store() {
        let (_dir, mut app) = setup_app().await;
        let d = day(2024, 3, 10);
        let task = app.add_task("a", d).await.expect("add");
        assert!(app.delete_task(task.id).await.expect("delete"));
        assert!(app.day_view(d).is_empty());
        let err = app.delete_task(task.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn goals_split_toggle_and_reorder() {
        let (_dir, mut app) = setup_app().await;
        let run = app.add_goal("Run 5k", GoalKind::Short).await.expect("add");
        let read = app.add_goal("Read", GoalKind::Short).await.expect("add");
        let swim = app.add_goal("Swim", GoalKind::Short).await.expect("add");
        let career = app.add_goal("Career", GoalKind::Long).await.expect("add");
        assert_eq!(run.sort_order, Some(1));
        assert_eq!(career.sort_order, Some(1));

        app.toggle_goal(read.id).await.expect("toggle");
        let view = app.goal_view(GoalKind::Short).expect("view");
        let active: Vec<_> = view.active.iter().map(|goal| goal.id).collect();
        assert_eq!(active, vec![run.id, swim.id]);
        assert_eq!(view.completed[0].id, read.id);

        let outcome = app.move_goal(swim.id, run.id).await.expect("move");
        assert_eq!(outcome.sequence, vec![swim.id, run.id, read.id]);
        let view = app.goal_view(GoalKind::Short).expect("view");
        let active: Vec<_> = view.active.iter().map(|goal| goal.id).collect();
        assert_eq!(active, vec![swim.id, run.id]);

        app.toggle_goal(read.id).await.expect("toggle back");
        let stored = app.store.get_goal(read.id).await.expect("get");
        assert_eq!(stored.status.as_deref(), Some("active"));
    }

    #[tokio::test]
    async fn goals_are_scoped_to_the_signed_in_user() {
        let (_dir, mut app) = setup_app().await;
        app.add_goal("Mine", GoalKind::Long).await.expect("add");
        app.apply_auth(AuthEvent::SignedIn(session("u2")))
            .await
            .expect("switch user");
        assert!(app.goal_view(GoalKind::Long).expect("view").active.is_empty());

        let edited = app.add_goal("Theirs", GoalKind::Long).await.expect("add");
        assert_eq!(edited.sort_order, Some(1));
        let renamed = app.edit_goal(edited.id, "Renamed").await.expect("edit");
        assert_eq!(renamed.title, "Renamed");
        app.delete_goal(edited.id).await.expect("delete");
        assert!(app.goal_view(GoalKind::Long).expect("view").active.is_empty());
    }

    #[tokio::test]
    async fn sign_out_clears_view_state() {
        let (_dir, mut app) = setup_app().await;
        let d = day(2024, 3, 10);
        app.add_task("a", d).await.expect("add");
        app.apply_auth(AuthEvent::SignedOut).await.expect("sign out");
        assert!(app.day_view(d).is_empty());
        assert!(matches!(
            app.goal_view(GoalKind::Short).unwrap_err(),
            AppError::Unauthenticated
        ));

        app.apply_auth(AuthEvent::SignedIn(session("u1")))
            .await
            .expect("sign in");
        assert_eq!(app.day_view(d).len(), 1);
    }
}
