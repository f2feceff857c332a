use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    /// Sort rank used by the day view: high first, unknown values count as medium.
    pub fn rank_of(value: Option<&str>) -> u8 {
        match value.and_then(Self::parse).unwrap_or(Self::Medium) {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum SyncStatus {
    Pending,
    Synced,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Failed => "failed",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum GoalKind {
    Short,
    Long,
}

impl GoalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Long => "long",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "short" => Some(Self::Short),
            "long" => Some(Self::Long),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum GoalStatus {
    Active,
    Completed,
    Archived,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewTask {
    pub text: String,
    pub is_complete: bool,
    pub inserted_at: String,
    pub user_id: String,
    pub status: SyncStatus,
    pub priority: Priority,
    pub sort_order: i64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TaskChanges {
    pub text: Option<String>,
    pub is_complete: Option<bool>,
    pub status: Option<SyncStatus>,
    pub priority: Option<Priority>,
    pub sort_order: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewGoal {
    pub title: String,
    pub kind: GoalKind,
    pub created_at: String,
    pub user_id: String,
    pub status: GoalStatus,
    pub sort_order: i64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GoalChanges {
    pub title: Option<String>,
    pub status: Option<GoalStatus>,
    pub sort_order: Option<i64>,
}
