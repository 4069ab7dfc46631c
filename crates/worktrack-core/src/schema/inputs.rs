//! Input types for mutating operations.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::*;
use super::models::UserProfile;

/// Input for creating a project.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Users who join as managers when the project is created.
    #[serde(default)]
    pub manager_ids: Vec<Uuid>,
}

/// Input for editing a project. The project code is not editable.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectUpdate {
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Input for creating a task.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub project_id: Uuid,
    pub assigned_to: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub deadline: NaiveDate,
    #[serde(default)]
    pub priority: TaskPriority,
}

/// Manager/admin edit of a task. The owning project cannot change.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskEdit {
    pub assigned_to: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub deadline: NaiveDate,
    pub priority: TaskPriority,
}

/// A file handed in by a caller, before it reaches the Object Store.
#[derive(Clone, Deserialize)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Lower-cased extension without the dot.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for Upload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upload")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Status/progress update by the assignee, a manager or an admin.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: TaskStatus,
    pub progress: i32,
    pub notes: Option<String>,
    #[serde(skip)]
    pub attachment: Option<Upload>,
}

/// Content of a notification to deliver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub kind: NotificationKind,
    pub related_url: Option<String>,
}

/// Input for creating or editing a work schedule.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSchedule {
    /// The scheduled person.
    pub user_id: Uuid,
    pub project_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub is_all_day: bool,
    pub color: Option<String>,
    #[serde(default)]
    pub schedule_type: ScheduleType,
    pub location: Option<String>,
}

/// Input for an admin-created account.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub employee_code: String,
    #[serde(default)]
    pub profile: UserProfile,
    #[serde(default)]
    pub roles: Vec<GlobalRole>,
}

/// Input for a task report.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReport {
    pub task_id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(skip)]
    pub attachment: Option<Upload>,
}

/// Inclusive calendar window for schedule queries.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Whether `[start, end]` lies entirely inside the window.
    pub fn contains(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start >= self.start && end <= self.end
    }
}
