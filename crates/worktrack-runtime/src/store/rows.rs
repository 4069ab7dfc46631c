//! Database rows and their conversion into domain entities.
//!
//! Enum columns hold the snake_case text from `as_str()`; a value that no
//! longer parses is reported as a storage error naming the column.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;
use worktrack_core::error::Result;
use worktrack_core::schema::*;

use crate::db::corrupt;

fn parse<T>(column: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| corrupt(column, e))
}

fn progress(column: &str, value: i32) -> Result<Progress> {
    Progress::new(value).map_err(|e| corrupt(column, e))
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProjectRow {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<ProjectRow> for Project {
    type Error = worktrack_core::WorktrackError;

    fn try_from(row: ProjectRow) -> Result<Self> {
        Ok(Project {
            id: row.id,
            code: parse("projects.code", &row.code)?,
            name: row.name,
            description: row.description,
            start_date: row.start_date,
            end_date: row.end_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct MemberRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

impl TryFrom<MemberRow> for ProjectMember {
    type Error = worktrack_core::WorktrackError;

    fn try_from(row: MemberRow) -> Result<Self> {
        Ok(ProjectMember {
            id: row.id,
            project_id: row.project_id,
            user_id: row.user_id,
            role: parse("project_members.role", &row.role)?,
            joined_at: row.joined_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TaskRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub assigned_to: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub deadline: NaiveDate,
    pub priority: String,
    pub status: String,
    pub progress: i32,
    pub attachment_path: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<TaskRow> for TaskAssignment {
    type Error = worktrack_core::WorktrackError;

    fn try_from(row: TaskRow) -> Result<Self> {
        Ok(TaskAssignment {
            id: row.id,
            project_id: row.project_id,
            assigned_to: row.assigned_to,
            name: row.name,
            description: row.description,
            deadline: row.deadline,
            priority: parse("tasks.priority", &row.priority)?,
            status: parse("tasks.status", &row.status)?,
            progress: progress("tasks.progress", row.progress)?,
            attachment_path: row.attachment_path,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CommentRow {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<CommentRow> for Comment {
    type Error = worktrack_core::WorktrackError;

    fn try_from(row: CommentRow) -> Result<Self> {
        let parent = match (row.project_id, row.task_id) {
            (Some(project_id), None) => CommentParent::Project(project_id),
            (None, Some(task_id)) => CommentParent::Task(task_id),
            _ => {
                return Err(corrupt(
                    "comments.parent",
                    format!("comment {} must have exactly one parent", row.id),
                ))
            }
        };

        Ok(Comment {
            id: row.id,
            parent,
            author_id: row.author_id,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Split a comment parent into the `(project_id, task_id)` column pair.
pub(crate) fn parent_columns(parent: CommentParent) -> (Option<Uuid>, Option<Uuid>) {
    match parent {
        CommentParent::Project(id) => (Some(id), None),
        CommentParent::Task(id) => (None, Some(id)),
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub kind: String,
    pub related_url: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = worktrack_core::WorktrackError;

    fn try_from(row: NotificationRow) -> Result<Self> {
        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            content: row.content,
            kind: parse("notifications.kind", &row.kind)?,
            related_url: row.related_url,
            is_read: row.is_read,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ScheduleRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub is_all_day: bool,
    pub color: String,
    pub schedule_type: String,
    pub location: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<ScheduleRow> for WorkSchedule {
    type Error = worktrack_core::WorktrackError;

    fn try_from(row: ScheduleRow) -> Result<Self> {
        Ok(WorkSchedule {
            id: row.id,
            user_id: row.user_id,
            project_id: row.project_id,
            title: row.title,
            description: row.description,
            start: row.start_at,
            end: row.end_at,
            is_all_day: row.is_all_day,
            color: row.color,
            schedule_type: parse("schedules.schedule_type", &row.schedule_type)?,
            location: row.location,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ReportRow {
    pub id: Uuid,
    pub task_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub attachment_path: Option<String>,
    pub progress: i32,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ReportRow> for TaskReport {
    type Error = worktrack_core::WorktrackError;

    fn try_from(row: ReportRow) -> Result<Self> {
        Ok(TaskReport {
            id: row.id,
            task_id: row.task_id,
            author_id: row.author_id,
            title: row.title,
            content: row.content,
            attachment_path: row.attachment_path,
            progress: progress("reports.progress", row.progress)?,
            is_read: row.is_read,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub employee_code: Option<String>,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub avatar_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            employee_code: row.employee_code.filter(|c| !c.trim().is_empty()),
            profile: UserProfile {
                full_name: row.full_name,
                phone_number: row.phone_number,
                address: row.address,
                date_of_birth: row.date_of_birth,
                gender: row.gender,
                department: row.department,
                position: row.position,
            },
            avatar_path: row.avatar_path,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Convert a batch of rows, failing on the first unreadable one.
pub(crate) fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = worktrack_core::WorktrackError>,
{
    rows.into_iter().map(T::try_from).collect()
}
