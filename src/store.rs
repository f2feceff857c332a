use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};

use crate::entities::{goal, task};
use crate::error::AppError;
use crate::model::{GoalChanges, NewGoal, NewTask, TaskChanges};

/// Persistent task and goal collections. Writes go straight through; the
/// store never renumbers or resorts records on its own.
pub struct Store {
    db: DatabaseConnection,
}

impl Store {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[cfg(test)]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn insert_task(&self, input: NewTask) -> Result<i64, AppError> {
        let active = task::ActiveModel {
            text: Set(input.text),
            is_complete: Set(input.is_complete),
            inserted_at: Set(input.inserted_at),
            user_id: Set(Some(input.user_id)),
            status: Set(Some(input.status.as_str().to_string())),
            priority: Set(Some(input.priority.as_str().to_string())),
            sort_order: Set(Some(input.sort_order)),
            ..Default::default()
        };
        let insert = task::Entity::insert(active).exec(&self.db).await?;
        Ok(insert.last_insert_id)
    }

    pub async fn get_task(&self, id: i64) -> Result<task::Model, AppError> {
        task::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("task id {id}")))
    }

    pub async fn update_task(&self, id: i64, changes: TaskChanges) -> Result<(), AppError> {
        let existing = self.get_task(id).await?;
        let mut active: task::ActiveModel = existing.into();
        if let Some(text) = changes.text {
            active.text = Set(text);
        }
        if let Some(is_complete) = changes.is_complete {
            active.is_complete = Set(is_complete);
        }
        if let Some(status) = changes.status {
            active.status = Set(Some(status.as_str().to_string()));
        }
        if let Some(priority) = changes.priority {
            active.priority = Set(Some(priority.as_str().to_string()));
        }
        if let Some(order) = changes.sort_order {
            active.sort_order = Set(Some(order));
        }
        if active.is_changed() {
            active.update(&self.db).await?;
        }
        Ok(())
    }

    pub async fn delete_task(&self, id: i64) -> Result<(), AppError> {
        let result = task::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("task id {id}")));
        }
        Ok(())
    }

    pub async fn list_tasks(&self) -> Result<Vec<task::Model>, AppError> {
        Ok(task::Entity::find()
            .order_by_asc(task::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn insert_goal(&self, input: NewGoal) -> Result<i64, AppError> {
        let active = goal::ActiveModel {
            title: Set(input.title),
            kind: Set(input.kind.as_str().to_string()),
            created_at: Set(input.created_at),
            user_id: Set(Some(input.user_id)),
            status: Set(Some(input.status.as_str().to_string())),
            sort_order: Set(Some(input.sort_order)),
            ..Default::default()
        };
        let insert = goal::Entity::insert(active).exec(&self.db).await?;
        Ok(insert.last_insert_id)
    }

    pub async fn get_goal(&self, id: i64) -> Result<goal::Model, AppError> {
        goal::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("goal id {id}")))
    }

    pub async fn update_goal(&self, id: i64, changes: GoalChanges) -> Result<(), AppError> {
        let existing = self.get_goal(id).await?;
        let mut active: goal::ActiveModel = existing.into();
        if let Some(title) = changes.title {
            active.title = Set(title);
        }
        if let Some(status) = changes.status {
            active.status = Set(Some(status.as_str().to_string()));
        }
        if let Some(order) = changes.sort_order {
            active.sort_order = Set(Some(order));
        }
        if active.is_changed() {
            active.update(&self.db).await?;
        }
        Ok(())
    }

    pub async fn delete_goal(&self, id: i64) -> Result<(), AppError> {
        let result = goal::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("goal id {id}")));
        }
        Ok(())
    }

    pub async fn list_goals(&self) -> Result<Vec<goal::Model>, AppError> {
        Ok(goal::Entity::find()
            .order_by_asc(goal::Column::Id)
            .all(&self.db)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::model::{GoalKind, GoalStatus, Priority, SyncStatus};
    use tempfile::TempDir;

    async fn setup_store() -> (TempDir, Store) {
        let dir = TempDir::new().expect("temp dir");
        let db_path = db::resolve_db_path(dir.path());
        db::ensure_parent_dir(&db_path).expect("ensure parent");
        let (conn, _) = db::open(&db_path).await.expect("open db");
        (dir, Store::new(conn))
    }

    fn new_task(text: &str, order: i64) -> NewTask {
        NewTask {
            text: text.to_string(),
            is_complete: false,
            inserted_at: "2024-03-10T00:00:00.000Z".to_string(),
            user_id: "u1".to_string(),
            status: SyncStatus::Pending,
            priority: Priority::Medium,
            sort_order: order,
        }
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_lists_in_insert_order() {
        let (_dir, store) = setup_store().await;
        let first = store.insert_task(new_task("a", 1)).await.expect("insert");
        let second = store.insert_task(new_task("b", 2)).await.expect("insert");
        assert!(second > first);

        let tasks = store.list_tasks().await.expect("list");
        let texts: Vec<_> = tasks.iter().map(|task| task.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);
        assert_eq!(tasks[0].status.as_deref(), Some("pending"));
        assert_eq!(tasks[0].user_id.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn update_touches_only_given_fields() {
        let (_dir, store) = setup_store().await;
        let id = store.insert_task(new_task("a", 1)).await.expect("insert");
        store
            .update_task(
                id,
                TaskChanges {
                    priority: Some(Priority::High),
                    ..Default::default()
                },
            )
            .await
            .expect("update");
        let task = store.get_task(id).await.expect("get");
        assert_eq!(task.priority.as_deref(), Some("high"));
        assert_eq!(task.text, "a");
        assert_eq!(task.sort_order, Some(1));

        store
            .update_task(id, TaskChanges::default())
            .await
            .expect("empty update");
    }

    #[tokio::test]
    async fn update_and_delete_missing_ids_fail() {
        let (_dir, store) = setup_store().await;
        let err = store
            .update_task(42, TaskChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = store.delete_task(42).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = store.delete_goal(7).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_leaves_other_orders_alone() {
        let (_dir, store) = setup_store().await;
        let a = store.insert_task(new_task("a", 1)).await.expect("insert");
        store.insert_task(new_task("b", 2)).await.expect("insert");
        store.insert_task(new_task("c", 3)).await.expect("insert");
        store.delete_task(a).await.expect("delete");

        let orders: Vec<_> = store
            .list_tasks()
            .await
            .expect("list")
            .iter()
            .map(|task| task.sort_order)
            .collect();
        assert_eq!(orders, vec![Some(2), Some(3)]);
    }

    #[tokio::test]
    async fn goals_round_trip_through_store() {
        let (_dir, store) = setup_store().await;
        let id = store
            .insert_goal(NewGoal {
                title: "Run 5k".to_string(),
                kind: GoalKind::Short,
                created_at: "2024-03-10T00:00:00.000Z".to_string(),
                user_id: "u1".to_string(),
                status: GoalStatus::Active,
                sort_order: 1,
            })
            .await
            .expect("insert goal");
        store
            .update_goal(
                id,
                GoalChanges {
                    status: Some(GoalStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .expect("update goal");
        let goal = store.get_goal(id).await.expect("get goal");
        assert_eq!(goal.kind, "short");
        assert_eq!(goal.status.as_deref(), Some("completed"));
    }
}
