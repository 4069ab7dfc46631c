//! Persisted entities.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::code::ProjectCode;
use super::enums::*;
use crate::error::{Result, WorktrackError};

/// Optional personal fields of a user, editable by the user themself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
}

/// A user account as exposed by the Account Directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// Unique once set, never changed afterwards. `None` only for accounts
    /// created before codes were mandatory.
    pub employee_code: Option<String>,
    #[serde(flatten)]
    pub profile: UserProfile,
    pub avatar_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// Name shown to other users.
    pub fn display_name(&self) -> &str {
        self.profile.full_name.as_deref().unwrap_or(&self.email)
    }
}

/// A project with a closed date range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub code: ProjectCode,
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Project {
    /// Whether `date` lies within `[start_date, end_date]`.
    pub fn spans(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}

/// Membership of a user in a project. Unique per (project, user).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMember {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: ProjectRole,
    pub joined_at: DateTime<Utc>,
}

impl ProjectMember {
    pub fn new(project_id: Uuid, user_id: Uuid, role: ProjectRole, joined_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            user_id,
            role,
            joined_at,
        }
    }

    pub fn is_manager(&self) -> bool {
        self.role == ProjectRole::Manager
    }
}

/// Completion percentage, always within `0..=100`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Progress(u8);

impl Progress {
    pub const NONE: Progress = Progress(0);
    pub const DONE: Progress = Progress(100);

    pub fn new(value: i32) -> Result<Self> {
        if !(0..=100).contains(&value) {
            return Err(WorktrackError::invalid(
                "progress",
                format!("{} is outside 0..=100", value),
            ));
        }
        Ok(Self(value as u8))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i32> for Progress {
    type Error = WorktrackError;

    fn try_from(value: i32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Progress> for i32 {
    fn from(p: Progress) -> Self {
        p.0 as i32
    }
}

/// A unit of work in one project, assigned to one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub id: Uuid,
    pub project_id: Uuid,
    pub assigned_to: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub deadline: NaiveDate,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub progress: Progress,
    pub attachment_path: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TaskAssignment {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.deadline < today && self.status != TaskStatus::Completed
    }
}

/// What a comment is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum CommentParent {
    Project(Uuid),
    Task(Uuid),
}

impl std::fmt::Display for CommentParent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommentParent::Project(id) => write!(f, "project {}", id),
            CommentParent::Task(id) => write!(f, "task {}", id),
        }
    }
}

/// A project-level or task-level comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub parent: CommentParent,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A message addressed to exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub kind: NotificationKind,
    pub related_url: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// A calendar entry placed on a user's schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkSchedule {
    pub id: Uuid,
    /// The scheduled person.
    pub user_id: Uuid,
    pub project_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_all_day: bool,
    pub color: String,
    pub schedule_type: ScheduleType,
    pub location: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Progress report sent by an assignee to the project's managers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReport {
    pub id: Uuid,
    pub task_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub attachment_path: Option<String>,
    /// Task progress at the time of submission.
    pub progress: Progress,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(start: &str, end: &str) -> Project {
        Project {
            id: Uuid::new_v4(),
            code: ProjectCode::FIRST,
            name: "Alpha".into(),
            description: None,
            start_date: start.parse().unwrap(),
            end_date: end.parse().unwrap(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_project_spans_is_inclusive() {
        let p = project("2025-01-01", "2025-06-01");
        assert!(p.spans("2025-01-01".parse().unwrap()));
        assert!(p.spans("2025-06-01".parse().unwrap()));
        assert!(!p.spans("2025-06-02".parse().unwrap()));
        assert!(!p.spans("2024-12-31".parse().unwrap()));
    }

    #[test]
    fn test_progress_bounds() {
        assert_eq!(Progress::new(0).unwrap(), Progress::NONE);
        assert_eq!(Progress::new(100).unwrap(), Progress::DONE);
        assert!(Progress::new(101).is_err());
        assert!(Progress::new(-1).is_err());
        assert!(serde_json::from_str::<Progress>("150").is_err());
    }

    #[test]
    fn test_comment_parent_serde() {
        let id = Uuid::nil();
        let json = serde_json::to_value(CommentParent::Task(id)).unwrap();
        assert_eq!(json["type"], "task");
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@example.com".into(),
            employee_code: Some("E1".into()),
            profile: UserProfile::default(),
            avatar_path: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        assert_eq!(user.display_name(), "a@example.com");
    }
}
