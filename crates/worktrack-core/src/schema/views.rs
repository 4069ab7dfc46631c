//! Read models returned by listing and detail queries.

use serde::Serialize;
use uuid::Uuid;

use super::enums::ProjectRole;
use super::models::*;

/// A project row in a listing.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub project: Project,
    pub manager_count: usize,
    pub member_count: usize,
    /// The viewer's role, if they belong to the project.
    pub role: Option<ProjectRole>,
}

/// A project with its members and the viewer's capabilities.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetail {
    pub project: Project,
    pub members: Vec<ProjectMember>,
    pub can_manage: bool,
    pub can_comment: bool,
}

/// A task row in a listing.
#[derive(Debug, Clone, Serialize)]
pub struct TaskListItem {
    pub task: TaskAssignment,
    pub overdue: bool,
}

/// A comment with the viewer's capabilities on it.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub comment: Comment,
    pub can_edit: bool,
    pub can_delete: bool,
}

/// A task with its discussion and the viewer's capabilities.
#[derive(Debug, Clone, Serialize)]
pub struct TaskDetail {
    pub task: TaskAssignment,
    pub overdue: bool,
    pub can_edit: bool,
    pub can_update_status: bool,
    pub comments: Vec<CommentView>,
}

/// Outcome of a best-effort notification fan-out.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// Users whose row could not be written.
    pub failed: Vec<Uuid>,
}
