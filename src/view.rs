//! Display order derivation and view/store reconciliation.
//!
//! Everything here is pure: the store keeps only the raw `sort_order`
//! field, and these functions decide what is shown and in which order.

use std::collections::{BTreeSet, HashSet};

use chrono::{Datelike, NaiveDate};

use crate::entities::{goal, task};
use crate::model::{GoalKind, GoalStatus, Priority, SyncStatus};
use crate::util::timestamp_day;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GoalView {
    pub active: Vec<goal::Model>,
    pub completed: Vec<goal::Model>,
}

pub fn task_on_day(task: &task::Model, day: NaiveDate) -> bool {
    timestamp_day(&task.inserted_at) == Some(day)
}

/// Tasks created on `day`: incomplete first, then by priority, then by order.
/// Full ties keep their input order.
pub fn tasks_for_day(tasks: &[task::Model], day: NaiveDate) -> Vec<task::Model> {
    let mut items: Vec<task::Model> = tasks
        .iter()
        .filter(|task| task_on_day(task, day))
        .cloned()
        .collect();
    items.sort_by(|a, b| {
        a.is_complete
            .cmp(&b.is_complete)
            .then_with(|| {
                Priority::rank_of(a.priority.as_deref())
                    .cmp(&Priority::rank_of(b.priority.as_deref()))
            })
            .then_with(|| a.sort_order.unwrap_or(0).cmp(&b.sort_order.unwrap_or(0)))
    });
    items
}

/// Members of the reorder partition for `day`, in no particular order.
pub fn day_partition(tasks: &[task::Model], day: NaiveDate) -> Vec<task::Model> {
    tasks
        .iter()
        .filter(|task| task_on_day(task, day))
        .cloned()
        .collect()
}

pub fn goal_partition(goals: &[goal::Model], kind: GoalKind, owner: &str) -> Vec<goal::Model> {
    goals
        .iter()
        .filter(|goal| goal.kind == kind.as_str() && goal.user_id.as_deref() == Some(owner))
        .cloned()
        .collect()
}

/// Goals of one kind and owner, split into active and completed lists.
pub fn goals_for(goals: &[goal::Model], kind: GoalKind, owner: &str) -> GoalView {
    let (mut completed, mut active): (Vec<_>, Vec<_>) = goal_partition(goals, kind, owner)
        .into_iter()
        .partition(|goal| goal.status.as_deref() == Some(GoalStatus::Completed.as_str()));
    active.sort_by_key(|goal| goal.sort_order.unwrap_or(0));
    completed.sort_by_key(|goal| goal.sort_order.unwrap_or(0));
    GoalView { active, completed }
}

/// Days of `year`/`month` that hold at least one task.
pub fn days_with_tasks(tasks: &[task::Model], year: i32, month: u32) -> BTreeSet<u32> {
    tasks
        .iter()
        .filter_map(|task| timestamp_day(&task.inserted_at))
        .filter(|day| day.year() == year && day.month() == month)
        .map(|day| day.day())
        .collect()
}

/// Rebuilds task view state from a store snapshot. The snapshot decides
/// membership and field values; a `failed` marker held by the view
/// survives so the record still shows as needing a retry.
pub fn reconcile(view: &[task::Model], snapshot: Vec<task::Model>) -> Vec<task::Model> {
    let failed: HashSet<i64> = view
        .iter()
        .filter(|task| task.status.as_deref() == Some(SyncStatus::Failed.as_str()))
        .map(|task| task.id)
        .collect();
    snapshot
        .into_iter()
        .map(|mut task| {
            if failed.contains(&task.id) {
                task.status = Some(SyncStatus::Failed.as_str().to_string());
            }
            task
        })
        .collect()
}
