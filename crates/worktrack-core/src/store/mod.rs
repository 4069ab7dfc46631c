//! Entity Store contracts.
//!
//! The rule services talk to persistence only through these traits. Each
//! method is one logical write or query; methods documented as atomic must
//! commit every row or none. Implementations report uniqueness and
//! restrict-blocked deletes as [`WorktrackError::Conflict`].
//!
//! [`WorktrackError::Conflict`]: crate::error::WorktrackError::Conflict

use std::future::Future;
use std::pin::Pin;

use uuid::Uuid;

use crate::error::Result;
use crate::schema::*;

/// Boxed future returned by collaborator traits so they stay object safe.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Projects and their codes.
pub trait ProjectStore: Send + Sync {
    fn find_project(&self, id: Uuid) -> StoreFuture<'_, Option<Project>>;

    /// Whether another project already uses `name`, ignoring `exclude`.
    fn project_name_taken<'a>(
        &'a self,
        name: &'a str,
        exclude: Option<Uuid>,
    ) -> StoreFuture<'a, bool>;

    /// Reserve the next project code.
    ///
    /// Allocation is serialized and never hands out a code twice, even after
    /// the project holding it is deleted.
    fn allocate_project_code(&self) -> StoreFuture<'_, ProjectCode>;

    /// Insert a project together with its initial memberships. Atomic.
    fn insert_project<'a>(
        &'a self,
        project: &'a Project,
        members: &'a [ProjectMember],
    ) -> StoreFuture<'a, ()>;

    fn update_project<'a>(&'a self, project: &'a Project) -> StoreFuture<'a, ()>;

    /// Delete a project with its memberships, comments, tasks and their
    /// comments and reports. Schedules referencing it lose the reference.
    /// Atomic. Returns object paths that are no longer referenced.
    fn delete_project(&self, id: Uuid) -> StoreFuture<'_, Vec<String>>;

    /// All projects ordered by code.
    fn list_projects(&self) -> StoreFuture<'_, Vec<Project>>;
}

/// Project membership rows.
pub trait MemberStore: Send + Sync {
    fn find_member(&self, project_id: Uuid, user_id: Uuid)
        -> StoreFuture<'_, Option<ProjectMember>>;

    /// Members of one project, oldest first.
    fn members_of(&self, project_id: Uuid) -> StoreFuture<'_, Vec<ProjectMember>>;

    /// Every membership held by one user.
    fn memberships_of(&self, user_id: Uuid) -> StoreFuture<'_, Vec<ProjectMember>>;

    /// Insert memberships. Atomic; a duplicate (project, user) pair is a conflict.
    fn insert_members<'a>(&'a self, members: &'a [ProjectMember]) -> StoreFuture<'a, ()>;

    /// Returns whether a row was removed.
    fn delete_member(&self, project_id: Uuid, user_id: Uuid) -> StoreFuture<'_, bool>;
}

/// Task assignments.
pub trait TaskStore: Send + Sync {
    fn find_task(&self, id: Uuid) -> StoreFuture<'_, Option<TaskAssignment>>;

    fn insert_task<'a>(&'a self, task: &'a TaskAssignment) -> StoreFuture<'a, ()>;

    fn update_task<'a>(&'a self, task: &'a TaskAssignment) -> StoreFuture<'a, ()>;

    /// Delete a task with its comments and reports. Atomic. Returns object
    /// paths that are no longer referenced.
    fn delete_task(&self, id: Uuid) -> StoreFuture<'_, Vec<String>>;

    fn tasks_in_project(&self, project_id: Uuid) -> StoreFuture<'_, Vec<TaskAssignment>>;

    fn tasks_assigned_to(&self, user_id: Uuid) -> StoreFuture<'_, Vec<TaskAssignment>>;

    fn count_tasks_assigned_to(&self, user_id: Uuid) -> StoreFuture<'_, u64>;
}

/// Project and task comments.
pub trait CommentStore: Send + Sync {
    fn find_comment(&self, id: Uuid) -> StoreFuture<'_, Option<Comment>>;

    fn insert_comment<'a>(&'a self, comment: &'a Comment) -> StoreFuture<'a, ()>;

    fn update_comment<'a>(&'a self, comment: &'a Comment) -> StoreFuture<'a, ()>;

    fn delete_comment(&self, id: Uuid) -> StoreFuture<'_, bool>;

    /// Comments on one parent, oldest first.
    fn comments_for(&self, parent: CommentParent) -> StoreFuture<'_, Vec<Comment>>;
}

/// Per-user notifications.
pub trait NotificationStore: Send + Sync {
    fn insert_notification<'a>(&'a self, notification: &'a Notification) -> StoreFuture<'a, ()>;

    fn find_notification(&self, id: Uuid) -> StoreFuture<'_, Option<Notification>>;

    fn mark_notification_read(&self, id: Uuid) -> StoreFuture<'_, bool>;

    /// Returns how many notifications changed state.
    fn mark_all_notifications_read(&self, user_id: Uuid) -> StoreFuture<'_, u64>;

    fn delete_notification(&self, id: Uuid) -> StoreFuture<'_, bool>;

    /// Notifications of one user, newest first.
    fn notifications_for(&self, user_id: Uuid) -> StoreFuture<'_, Vec<Notification>>;

    fn unread_count(&self, user_id: Uuid) -> StoreFuture<'_, u64>;
}

/// Work schedules.
pub trait ScheduleStore: Send + Sync {
    /// Insert a schedule and, when given, the notification announcing it. Atomic.
    fn insert_schedule<'a>(
        &'a self,
        schedule: &'a WorkSchedule,
        notification: Option<&'a Notification>,
    ) -> StoreFuture<'a, ()>;

    fn find_schedule(&self, id: Uuid) -> StoreFuture<'_, Option<WorkSchedule>>;

    fn update_schedule<'a>(&'a self, schedule: &'a WorkSchedule) -> StoreFuture<'a, ()>;

    fn delete_schedule(&self, id: Uuid) -> StoreFuture<'_, bool>;

    /// Schedules lying entirely inside `window`, optionally for one user,
    /// ordered by start.
    fn schedules_in_window(
        &self,
        user_id: Option<Uuid>,
        window: DateWindow,
    ) -> StoreFuture<'_, Vec<WorkSchedule>>;
}

/// Task reports.
pub trait ReportStore: Send + Sync {
    fn insert_report<'a>(&'a self, report: &'a TaskReport) -> StoreFuture<'a, ()>;

    fn find_report(&self, id: Uuid) -> StoreFuture<'_, Option<TaskReport>>;

    /// Reports on one task, newest first.
    fn reports_for_task(&self, task_id: Uuid) -> StoreFuture<'_, Vec<TaskReport>>;

    fn mark_report_read(&self, id: Uuid) -> StoreFuture<'_, bool>;
}

/// Account removal together with the rows that reference the account.
pub trait UserDataStore: Send + Sync {
    /// Remove the user's comments, memberships, reports, notifications, the
    /// schedules they created or are scheduled on, and finally the account
    /// itself, in one transaction. A user who still has assigned tasks is a
    /// conflict and nothing changes. Returns object paths that are no
    /// longer referenced.
    fn delete_account(&self, user_id: Uuid) -> StoreFuture<'_, Vec<String>>;
}

/// Everything the rule services need from persistence.
pub trait EntityStore:
    ProjectStore
    + MemberStore
    + TaskStore
    + CommentStore
    + NotificationStore
    + ScheduleStore
    + ReportStore
    + UserDataStore
{
}

impl<T> EntityStore for T where
    T: ProjectStore
        + MemberStore
        + TaskStore
        + CommentStore
        + NotificationStore
        + ScheduleStore
        + ReportStore
        + UserDataStore
{
}
