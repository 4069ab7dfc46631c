//! Access Policy: the single decision table for who may do what.
//!
//! Decisions are pure functions of the [`Actor`] and the [`ResourceFacts`]
//! the calling service gathered about the target. Services never re-derive
//! role booleans themselves; they collect facts and ask here.

use crate::auth::Actor;
use crate::error::{Result, WorktrackError};
use crate::schema::ProjectRole;

/// Operations subject to authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CreateProject,
    EditProject,
    DeleteProject,
    ViewProject,
    AddMember,
    AddManager,
    RemoveMember,
    ListProjectTasks,
    CreateTask,
    EditTask,
    DeleteTask,
    UpdateTaskStatus,
    ViewTask,
    PostComment,
    EditComment,
    DeleteComment,
    CreateSchedule,
    EditSchedule,
    DeleteSchedule,
    ViewSchedule,
    SendNotification,
    ManageOwnNotification,
    ManageUsers,
    EditProfile,
    SubmitReport,
    ViewReports,
    MarkReportRead,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::CreateProject => "create project",
            Action::EditProject => "edit project",
            Action::DeleteProject => "delete project",
            Action::ViewProject => "view project",
            Action::AddMember => "add project member",
            Action::AddManager => "add project manager",
            Action::RemoveMember => "remove project member",
            Action::ListProjectTasks => "list project tasks",
            Action::CreateTask => "create task",
            Action::EditTask => "edit task",
            Action::DeleteTask => "delete task",
            Action::UpdateTaskStatus => "update task status",
            Action::ViewTask => "view task",
            Action::PostComment => "post comment",
            Action::EditComment => "edit comment",
            Action::DeleteComment => "delete comment",
            Action::CreateSchedule => "create schedule",
            Action::EditSchedule => "edit schedule",
            Action::DeleteSchedule => "delete schedule",
            Action::ViewSchedule => "view schedule",
            Action::SendNotification => "send notification",
            Action::ManageOwnNotification => "manage notification",
            Action::ManageUsers => "manage users",
            Action::EditProfile => "edit profile",
            Action::SubmitReport => "submit report",
            Action::ViewReports => "view reports",
            Action::MarkReportRead => "mark report read",
        };
        f.write_str(s)
    }
}

/// Ownership and membership facts about the resource an action targets,
/// as seen from the actor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceFacts {
    /// The actor's role in the project owning the resource.
    pub project_role: Option<ProjectRole>,
    /// The actor is the task's assignee.
    pub is_assignee: bool,
    /// The actor wrote the comment or report.
    pub is_author: bool,
    /// The actor created the schedule.
    pub is_creator: bool,
    /// The actor is the user the resource belongs to.
    pub is_subject: bool,
    /// Project role of the user being removed from a project.
    pub target_role: Option<ProjectRole>,
    /// The targeted user is the actor.
    pub targets_self: bool,
    /// The targeted user belongs to a project the actor manages.
    pub target_in_managed_project: bool,
}

impl ResourceFacts {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn in_project(role: Option<ProjectRole>) -> Self {
        Self {
            project_role: role,
            ..Self::default()
        }
    }

    pub fn assignee(mut self, yes: bool) -> Self {
        self.is_assignee = yes;
        self
    }

    pub fn author(mut self, yes: bool) -> Self {
        self.is_author = yes;
        self
    }

    pub fn creator(mut self, yes: bool) -> Self {
        self.is_creator = yes;
        self
    }

    pub fn subject(mut self, yes: bool) -> Self {
        self.is_subject = yes;
        self
    }

    pub fn removing(mut self, role: ProjectRole, targets_self: bool) -> Self {
        self.target_role = Some(role);
        self.targets_self = targets_self;
        self
    }

    pub fn managed_target(mut self, yes: bool) -> Self {
        self.target_in_managed_project = yes;
        self
    }

    fn is_manager(&self) -> bool {
        self.project_role == Some(ProjectRole::Manager)
    }

    fn is_member(&self) -> bool {
        self.project_role.is_some()
    }
}

/// The decision table.
pub struct AccessPolicy;

impl AccessPolicy {
    /// Whether `actor` may perform `action` on a resource described by `facts`.
    pub fn can_act(actor: &Actor, action: Action, facts: &ResourceFacts) -> bool {
        let admin = actor.is_admin();

        match action {
            Action::CreateProject
            | Action::EditProject
            | Action::DeleteProject
            | Action::SendNotification
            | Action::AddManager
            | Action::ManageUsers => admin,

            Action::ViewProject => admin || facts.is_member(),

            Action::AddMember => admin || facts.is_manager(),

            // Nobody removes themself through this action, not even an admin,
            // and only an admin removes a manager.
            Action::RemoveMember => {
                if facts.targets_self {
                    return false;
                }
                admin
                    || (facts.is_manager() && facts.target_role != Some(ProjectRole::Manager))
            }

            Action::ListProjectTasks
            | Action::CreateTask
            | Action::EditTask
            | Action::DeleteTask => admin || facts.is_manager(),

            Action::UpdateTaskStatus => admin || facts.is_manager() || facts.is_assignee,

            Action::ViewTask | Action::PostComment => {
                admin || facts.is_member() || facts.is_assignee
            }

            Action::EditComment => facts.is_author,

            Action::DeleteComment => facts.is_author || admin || facts.is_manager(),

            Action::CreateSchedule => admin || facts.target_in_managed_project,

            Action::EditSchedule | Action::DeleteSchedule => admin || facts.is_creator,

            Action::ViewSchedule => admin || facts.is_subject || facts.is_creator,

            Action::ManageOwnNotification | Action::EditProfile => facts.is_subject,

            Action::SubmitReport => facts.is_assignee,

            Action::ViewReports => admin || facts.is_manager() || facts.is_assignee,

            Action::MarkReportRead => admin || facts.is_manager(),
        }
    }

    /// Like [`AccessPolicy::can_act`] but returns a forbidden error on denial.
    pub fn require(actor: &Actor, action: Action, facts: &ResourceFacts) -> Result<()> {
        if Self::can_act(actor, action, facts) {
            return Ok(());
        }

        tracing::debug!(
            user_id = %actor.user_id(),
            action = %action,
            ?facts,
            "Access denied"
        );
        Err(WorktrackError::Forbidden(format!("not permitted to {}", action)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn admin() -> Actor {
        Actor::admin(Uuid::new_v4())
    }

    fn user() -> Actor {
        Actor::user(Uuid::new_v4())
    }

    fn manager() -> ResourceFacts {
        ResourceFacts::in_project(Some(ProjectRole::Manager))
    }

    fn member() -> ResourceFacts {
        ResourceFacts::in_project(Some(ProjectRole::Member))
    }

    #[test]
    fn test_project_lifecycle_is_admin_only() {
        for action in [Action::CreateProject, Action::EditProject, Action::DeleteProject] {
            assert!(AccessPolicy::can_act(&admin(), action, &ResourceFacts::none()));
            assert!(!AccessPolicy::can_act(&user(), action, &manager()));
        }
    }

    #[test]
    fn test_member_management() {
        assert!(AccessPolicy::can_act(&user(), Action::AddMember, &manager()));
        assert!(!AccessPolicy::can_act(&user(), Action::AddMember, &member()));

        // Granting the manager role is reserved to admins.
        assert!(!AccessPolicy::can_act(&user(), Action::AddManager, &manager()));
        assert!(AccessPolicy::can_act(&admin(), Action::AddManager, &ResourceFacts::none()));

        let remove_member = manager().removing(ProjectRole::Member, false);
        assert!(AccessPolicy::can_act(&user(), Action::RemoveMember, &remove_member));

        let remove_manager = manager().removing(ProjectRole::Manager, false);
        assert!(!AccessPolicy::can_act(&user(), Action::RemoveMember, &remove_manager));
        assert!(AccessPolicy::can_act(&admin(), Action::RemoveMember, &remove_manager));
    }

    #[test]
    fn test_self_removal_always_denied() {
        let facts = manager().removing(ProjectRole::Manager, true);
        assert!(!AccessPolicy::can_act(&admin(), Action::RemoveMember, &facts));
        let facts = member().removing(ProjectRole::Member, true);
        assert!(!AccessPolicy::can_act(&user(), Action::RemoveMember, &facts));
    }

    #[test]
    fn test_task_permissions() {
        for action in [Action::CreateTask, Action::EditTask, Action::DeleteTask] {
            assert!(AccessPolicy::can_act(&user(), action, &manager()));
            assert!(!AccessPolicy::can_act(&user(), action, &member().assignee(true)));
            assert!(AccessPolicy::can_act(&admin(), action, &ResourceFacts::none()));
        }

        let assignee = member().assignee(true);
        assert!(AccessPolicy::can_act(&user(), Action::UpdateTaskStatus, &assignee));
        assert!(!AccessPolicy::can_act(&user(), Action::UpdateTaskStatus, &member()));
        assert!(AccessPolicy::can_act(&user(), Action::UpdateTaskStatus, &manager()));
    }

    #[test]
    fn test_comment_permissions() {
        assert!(AccessPolicy::can_act(&user(), Action::PostComment, &member()));
        assert!(AccessPolicy::can_act(
            &user(),
            Action::PostComment,
            &ResourceFacts::none().assignee(true)
        ));
        assert!(!AccessPolicy::can_act(&user(), Action::PostComment, &ResourceFacts::none()));

        // Only the author edits, admins included.
        assert!(AccessPolicy::can_act(&user(), Action::EditComment, &member().author(true)));
        assert!(!AccessPolicy::can_act(&admin(), Action::EditComment, &manager()));

        assert!(AccessPolicy::can_act(&user(), Action::DeleteComment, &member().author(true)));
        assert!(AccessPolicy::can_act(&user(), Action::DeleteComment, &manager()));
        assert!(AccessPolicy::can_act(&admin(), Action::DeleteComment, &ResourceFacts::none()));
        assert!(!AccessPolicy::can_act(&user(), Action::DeleteComment, &member()));
    }

    #[test]
    fn test_schedule_permissions() {
        let facts = ResourceFacts::none().managed_target(true);
        assert!(AccessPolicy::can_act(&user(), Action::CreateSchedule, &facts));
        assert!(!AccessPolicy::can_act(&user(), Action::CreateSchedule, &ResourceFacts::none()));
        assert!(AccessPolicy::can_act(&admin(), Action::CreateSchedule, &ResourceFacts::none()));

        let creator = ResourceFacts::none().creator(true);
        assert!(AccessPolicy::can_act(&user(), Action::EditSchedule, &creator));
        assert!(AccessPolicy::can_act(&user(), Action::DeleteSchedule, &creator));
        assert!(!AccessPolicy::can_act(
            &user(),
            Action::EditSchedule,
            &ResourceFacts::none().subject(true)
        ));
        assert!(AccessPolicy::can_act(
            &user(),
            Action::ViewSchedule,
            &ResourceFacts::none().subject(true)
        ));
    }

    #[test]
    fn test_notifications_and_users_are_admin_only() {
        assert!(AccessPolicy::can_act(&admin(), Action::SendNotification, &ResourceFacts::none()));
        assert!(!AccessPolicy::can_act(&user(), Action::SendNotification, &manager()));
        assert!(!AccessPolicy::can_act(&user(), Action::ManageUsers, &ResourceFacts::none()));
    }

    #[test]
    fn test_own_resources_are_subject_only() {
        let own = ResourceFacts::none().subject(true);
        assert!(AccessPolicy::can_act(&user(), Action::ManageOwnNotification, &own));
        assert!(!AccessPolicy::can_act(&admin(), Action::ManageOwnNotification, &ResourceFacts::none()));
        assert!(AccessPolicy::can_act(&user(), Action::EditProfile, &own));
        assert!(!AccessPolicy::can_act(&admin(), Action::EditProfile, &ResourceFacts::none()));
    }

    #[test]
    fn test_report_permissions() {
        assert!(AccessPolicy::can_act(&user(), Action::SubmitReport, &member().assignee(true)));
        assert!(!AccessPolicy::can_act(&user(), Action::SubmitReport, &manager()));
        assert!(AccessPolicy::can_act(&user(), Action::ViewReports, &manager()));
        assert!(AccessPolicy::can_act(&user(), Action::MarkReportRead, &manager()));
        assert!(!AccessPolicy::can_act(&user(), Action::MarkReportRead, &member().assignee(true)));
    }

    #[test]
    fn test_require_returns_forbidden() {
        let err = AccessPolicy::require(&user(), Action::CreateProject, &ResourceFacts::none())
            .unwrap_err();
        assert!(matches!(err, WorktrackError::Forbidden(_)));
        assert!(AccessPolicy::require(&admin(), Action::CreateProject, &ResourceFacts::none()).is_ok());
    }
}
