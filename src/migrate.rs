//! Versioned schema migrations for the local task/goal database.
//!
//! Each step declares the fields it introduces and optionally backfills
//! existing rows. Steps run in ascending order, once each, and every step
//! commits its DDL, backfill and version marker in a single transaction.

use chrono::Utc;
use sea_orm::sea_query::{Alias, ColumnDef, Table};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Schema, Set, TransactionTrait,
};

use crate::entities::{goal, schema_version, task};
use crate::error::AppError;
use crate::model::Priority;
use crate::util::timestamp_millis;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldKind {
    Key,
    Text,
    Integer,
    Boolean,
}

#[derive(Clone, Copy, Debug)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
}

impl Field {
    const fn key(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Key,
            nullable: false,
        }
    }

    const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
        }
    }

    const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: true,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum SchemaChange {
    CreateTable {
        table: &'static str,
        fields: &'static [Field],
    },
    AddColumn {
        table: &'static str,
        field: Field,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Backfill {
    /// Missing priority becomes `medium`, missing order becomes the creation time in ms.
    TaskPriorityAndOrder,
    /// Missing order becomes the creation time in ms.
    GoalOrder,
}

#[derive(Clone, Copy, Debug)]
pub struct MigrationStep {
    pub version: i32,
    pub description: &'static str,
    pub changes: &'static [SchemaChange],
    pub backfill: Option<Backfill>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MigrationReport {
    pub from: i32,
    pub to: i32,
    pub applied: Vec<i32>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MigrationStatus {
    pub current: i32,
    pub latest: i32,
}

pub const STEPS: &[MigrationStep] = &[
    MigrationStep {
        version: 1,
        description: "create tasks",
        changes: &[SchemaChange::CreateTable {
            table: "tasks",
            fields: &[
                Field::key("id"),
                Field::required("text", FieldKind::Text),
                Field::required("is_complete", FieldKind::Boolean),
                Field::required("inserted_at", FieldKind::Text),
            ],
        }],
        backfill: None,
    },
    MigrationStep {
        version: 2,
        description: "add task owner and sync status",
        changes: &[
            SchemaChange::AddColumn {
                table: "tasks",
                field: Field::optional("user_id", FieldKind::Text),
            },
            SchemaChange::AddColumn {
                table: "tasks",
                field: Field::optional("status", FieldKind::Text),
            },
        ],
        backfill: None,
    },
    MigrationStep {
        version: 3,
        description: "add task priority and order",
        changes: &[
            SchemaChange::AddColumn {
                table: "tasks",
                field: Field::optional("priority", FieldKind::Text),
            },
            SchemaChange::AddColumn {
                table: "tasks",
                field: Field::optional("sort_order", FieldKind::Integer),
            },
        ],
        backfill: Some(Backfill::TaskPriorityAndOrder),
    },
    MigrationStep {
        version: 4,
        description: "create goals",
        changes: &[SchemaChange::CreateTable {
            table: "goals",
            fields: &[
                Field::key("id"),
                Field::required("title", FieldKind::Text),
                Field::required("kind", FieldKind::Text),
                Field::required("created_at", FieldKind::Text),
                Field::optional("user_id", FieldKind::Text),
                Field::optional("status", FieldKind::Text),
            ],
        }],
        backfill: None,
    },
    MigrationStep {
        version: 5,
        description: "add goal order",
        changes: &[SchemaChange::AddColumn {
            table: "goals",
            field: Field::optional("sort_order", FieldKind::Integer),
        }],
        backfill: Some(Backfill::GoalOrder),
    },
];

pub fn latest_version() -> i32 {
    STEPS.last().map(|step| step.version).unwrap_or(0)
}

pub async fn migrate(db: &DatabaseConnection) -> Result<MigrationReport, AppError> {
    migrate_with(db, STEPS).await
}

pub async fn migrate_with(
    db: &DatabaseConnection,
    steps: &[MigrationStep],
) -> Result<MigrationReport, AppError> {
    validate_steps(steps)?;
    ensure_version_table(db).await?;

    let from = current_version(db).await?;
    let latest = steps.last().map(|step| step.version).unwrap_or(0);
    if from > latest {
        return Err(AppError::Migration {
            version: from,
            message: format!("database schema {from} is newer than supported schema {latest}"),
        });
    }

    let mut report = MigrationReport {
        from,
        to: from,
        applied: Vec::new(),
    };
    for step in steps.iter().filter(|step| step.version > from) {
        apply_step(db, step).await.map_err(|err| match err {
            AppError::Migration { .. } => err,
            other => AppError::Migration {
                version: step.version,
                message: other.to_string(),
            },
        })?;
        tracing::info!(
            version = step.version,
            description = step.description,
            "applied schema migration"
        );
        report.to = step.version;
        report.applied.push(step.version);
    }
    Ok(report)
}

pub async fn status(db: &DatabaseConnection) -> Result<MigrationStatus, AppError> {
    ensure_version_table(db).await?;
    Ok(MigrationStatus {
        current: current_version(db).await?,
        latest: latest_version(),
    })
}

pub async fn current_version<C: ConnectionTrait>(db: &C) -> Result<i32, AppError> {
    let latest = schema_version::Entity::find()
        .order_by_desc(schema_version::Column::Version)
        .one(db)
        .await?;
    Ok(latest.map(|row| row.version).unwrap_or(0))
}

fn validate_steps(steps: &[MigrationStep]) -> Result<(), AppError> {
    for (idx, step) in steps.iter().enumerate() {
        let expected = idx as i32 + 1;
        if step.version != expected {
            return Err(AppError::Migration {
                version: step.version,
                message: format!("expected version {expected}; steps must ascend from 1 without gaps"),
            });
        }
    }
    Ok(())
}

async fn ensure_version_table(db: &DatabaseConnection) -> Result<(), AppError> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);
    let mut stmt = schema.create_table_from_entity(schema_version::Entity);
    stmt.if_not_exists();
    db.execute(builder.build(&stmt)).await?;
    Ok(())
}

async fn apply_step(db: &DatabaseConnection, step: &MigrationStep) -> Result<(), AppError> {
    let txn = db.begin().await?;
    let result: Result<(), AppError> = async {
        let builder = txn.get_database_backend();
        for change in step.changes {
            match change {
                SchemaChange::CreateTable { table, fields } => {
                    let mut stmt = Table::create();
                    stmt.table(Alias::new(*table));
                    for field in *fields {
                        stmt.col(column_def(field));
                    }
                    txn.execute(builder.build(&stmt)).await?;
                }
                SchemaChange::AddColumn { table, field } => {
                    let mut stmt = Table::alter();
                    stmt.table(Alias::new(*table)).add_column(column_def(field));
                    txn.execute(builder.build(&stmt)).await?;
                }
            }
        }

        if let Some(backfill) = step.backfill {
            let touched = backfill.run(&txn).await?;
            tracing::debug!(version = step.version, touched, "backfilled rows");
        }

        let marker = schema_version::ActiveModel {
            version: Set(step.version),
            description: Set(step.description.to_string()),
            applied_at: Set(Utc::now()),
            ..Default::default()
        };
        schema_version::Entity::insert(marker).exec(&txn).await?;
        Ok(())
    }
    .await;

    match result {
        Ok(()) => {
            txn.commit().await?;
            Ok(())
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::error!(version = step.version, error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

fn column_def(field: &Field) -> ColumnDef {
    let mut def = ColumnDef::new(Alias::new(field.name));
    match field.kind {
        FieldKind::Key => {
            def.integer().not_null().auto_increment().primary_key();
            return def;
        }
        FieldKind::Text => {
            def.text();
        }
        FieldKind::Integer => {
            def.big_integer();
        }
        FieldKind::Boolean => {
            def.boolean();
        }
    }
    if field.nullable {
        def.null();
    } else {
        def.not_null();
    }
    def
}

impl Backfill {
    /// Fills only NULL columns, so running it again over migrated rows is a no-op.
    /// Reads through the entities: the table must already carry every entity column.
    pub async fn run<C: ConnectionTrait>(&self, db: &C) -> Result<u64, AppError> {
        let now = Utc::now().timestamp_millis();
        let mut touched = 0u64;
        match self {
            Self::TaskPriorityAndOrder => {
                let rows = task::Entity::find()
                    .filter(
                        Condition::any()
                            .add(task::Column::Priority.is_null())
                            .add(task::Column::SortOrder.is_null()),
                    )
                    .order_by_asc(task::Column::Id)
                    .all(db)
                    .await?;
                for row in rows {
                    let mut active: task::ActiveModel = row.clone().into();
                    if row.priority.is_none() {
                        active.priority = Set(Some(Priority::Medium.as_str().to_string()));
                    }
                    if row.sort_order.is_none() {
                        active.sort_order =
                            Set(Some(timestamp_millis(&row.inserted_at).unwrap_or(now)));
                    }
                    active.update(db).await?;
                    touched += 1;
                }
            }
            Self::GoalOrder => {
                let rows = goal::Entity::find()
                    .filter(goal::Column::SortOrder.is_null())
                    .order_by_asc(goal::Column::Id)
                    .all(db)
                    .await?;
                for row in rows {
                    let order = timestamp_millis(&row.created_at).unwrap_or(now);
                    let mut active: goal::ActiveModel = row.into();
                    active.sort_order = Set(Some(order));
                    active.update(db).await?;
                    touched += 1;
                }
            }
        }
        Ok(touched)
    }
}
