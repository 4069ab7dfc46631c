//! In-memory collaborators with the same uniqueness, cascade and
//! atomicity behaviour as the PostgreSQL backend.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::clock::Clock;
use crate::directory::AccountDirectory;
use crate::error::{Result, WorktrackError};
use crate::objects::ObjectStore;
use crate::schema::*;
use crate::store::*;

fn done<'a, T: Send + 'a>(result: Result<T>) -> StoreFuture<'a, T> {
    Box::pin(std::future::ready(result))
}

#[derive(Default, Clone)]
struct State {
    projects: Vec<Project>,
    last_code: u32,
    members: Vec<ProjectMember>,
    tasks: Vec<TaskAssignment>,
    comments: Vec<Comment>,
    notifications: Vec<Notification>,
    schedules: Vec<WorkSchedule>,
    reports: Vec<TaskReport>,
}

impl State {
    /// Remove every row hanging off the given tasks and return their object paths.
    fn drop_tasks(&mut self, task_ids: &HashSet<Uuid>) -> Vec<String> {
        let mut orphans = Vec::new();
        self.tasks.retain(|t| {
            if task_ids.contains(&t.id) {
                orphans.extend(t.attachment_path.clone());
                false
            } else {
                true
            }
        });
        self.comments
            .retain(|c| !matches!(c.parent, CommentParent::Task(id) if task_ids.contains(&id)));
        self.reports.retain(|r| {
            if task_ids.contains(&r.task_id) {
                orphans.extend(r.attachment_path.clone());
                false
            } else {
                true
            }
        });
        orphans
    }
}

/// Entity Store held in memory.
///
/// Account deletion also removes the account from a directory linked with
/// [`MemoryStore::with_directory`], mirroring the shared database.
///
/// # Example
///
/// ```ignore
/// let store = MemoryStore::new();
/// store.fail_next_write();
/// assert!(store.insert_task(&task).await.is_err());
/// ```
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    fail_next_write: AtomicBool,
    failing_recipients: RwLock<HashSet<Uuid>>,
    directory: Option<Arc<MemoryDirectory>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_directory(directory: Arc<MemoryDirectory>) -> Self {
        Self {
            directory: Some(directory),
            ..Self::default()
        }
    }

    /// Make the next mutating call fail with a storage error.
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    /// Make every notification insert for `user_id` fail.
    pub fn fail_notifications_for(&self, user_id: Uuid) {
        self.failing_recipients.write().unwrap().insert(user_id);
    }

    fn write_allowed(&self) -> Result<()> {
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(WorktrackError::Storage("injected write failure".into()));
        }
        Ok(())
    }

    fn write<T>(&self, f: impl FnOnce(&mut State) -> Result<T>) -> Result<T> {
        self.write_allowed()?;
        let mut state = self.state.write().unwrap();
        f(&mut state)
    }

    fn read<T>(&self, f: impl FnOnce(&State) -> T) -> T {
        f(&self.state.read().unwrap())
    }
}

fn replace<T, F>(rows: &mut [T], matches: F, row: &T, kind: &str, id: Uuid) -> Result<()>
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    match rows.iter_mut().find(|r| matches(r)) {
        Some(existing) => {
            *existing = row.clone();
            Ok(())
        }
        None => Err(WorktrackError::not_found(kind, id)),
    }
}

fn remove<T>(rows: &mut Vec<T>, matches: impl Fn(&T) -> bool) -> bool {
    let before = rows.len();
    rows.retain(|r| !matches(r));
    rows.len() != before
}

impl ProjectStore for MemoryStore {
    fn find_project(&self, id: Uuid) -> StoreFuture<'_, Option<Project>> {
        done(Ok(self.read(|s| s.projects.iter().find(|p| p.id == id).cloned())))
    }

    fn project_name_taken<'a>(&'a self, name: &'a str, exclude: Option<Uuid>) -> StoreFuture<'a, bool> {
        done(Ok(self.read(|s| {
            s.projects
                .iter()
                .any(|p| p.name.eq_ignore_ascii_case(name) && Some(p.id) != exclude)
        })))
    }

    fn allocate_project_code(&self) -> StoreFuture<'_, ProjectCode> {
        done(self.write(|s| {
            let highest = s
                .projects
                .iter()
                .map(|p| p.code.number())
                .max()
                .unwrap_or(0)
                .max(s.last_code);
            let code = ProjectCode::after(ProjectCode::new(highest).ok())?;
            s.last_code = code.number();
            Ok(code)
        }))
    }

    fn insert_project<'a>(&'a self, project: &'a Project, members: &'a [ProjectMember]) -> StoreFuture<'a, ()> {
        done(self.write(|s| {
            if s.projects.iter().any(|p| p.code == project.code) {
                return Err(WorktrackError::Conflict(format!("project code {} exists", project.code)));
            }
            if s.projects.iter().any(|p| p.name.eq_ignore_ascii_case(&project.name)) {
                return Err(WorktrackError::Conflict(format!("project name {} exists", project.name)));
            }
            let mut pairs = HashSet::new();
            if !members.iter().all(|m| pairs.insert(m.user_id)) {
                return Err(WorktrackError::Conflict("duplicate project member".into()));
            }
            s.projects.push(project.clone());
            s.members.extend(members.iter().cloned());
            Ok(())
        }))
    }

    fn update_project<'a>(&'a self, project: &'a Project) -> StoreFuture<'a, ()> {
        done(self.write(|s| {
            if s
                .projects
                .iter()
                .any(|p| p.id != project.id && p.name.eq_ignore_ascii_case(&project.name))
            {
                return Err(WorktrackError::Conflict(format!("project name {} exists", project.name)));
            }
            replace(&mut s.projects, |p| p.id == project.id, project, "project", project.id)
        }))
    }

    fn delete_project(&self, id: Uuid) -> StoreFuture<'_, Vec<String>> {
        done(self.write(|s| {
            if !remove(&mut s.projects, |p| p.id == id) {
                return Err(WorktrackError::not_found("project", id));
            }
            s.members.retain(|m| m.project_id != id);
            s.comments.retain(|c| c.parent != CommentParent::Project(id));
            for schedule in s.schedules.iter_mut().filter(|w| w.project_id == Some(id)) {
                schedule.project_id = None;
            }
            let task_ids: HashSet<Uuid> = s
                .tasks
                .iter()
                .filter(|t| t.project_id == id)
                .map(|t| t.id)
                .collect();
            Ok(s.drop_tasks(&task_ids))
        }))
    }

    fn list_projects(&self) -> StoreFuture<'_, Vec<Project>> {
        done(Ok(self.read(|s| {
            let mut projects = s.projects.clone();
            projects.sort_by_key(|p| p.code);
            projects
        })))
    }
}

impl MemberStore for MemoryStore {
    fn find_member(&self, project_id: Uuid, user_id: Uuid) -> StoreFuture<'_, Option<ProjectMember>> {
        done(Ok(self.read(|s| {
            s.members
                .iter()
                .find(|m| m.project_id == project_id && m.user_id == user_id)
                .cloned()
        })))
    }

    fn members_of(&self, project_id: Uuid) -> StoreFuture<'_, Vec<ProjectMember>> {
        done(Ok(self.read(|s| {
            s.members
                .iter()
                .filter(|m| m.project_id == project_id)
                .cloned()
                .collect()
        })))
    }

    fn memberships_of(&self, user_id: Uuid) -> StoreFuture<'_, Vec<ProjectMember>> {
        done(Ok(self.read(|s| {
            s.members
                .iter()
                .filter(|m| m.user_id == user_id)
                .cloned()
                .collect()
        })))
    }

    fn insert_members<'a>(&'a self, members: &'a [ProjectMember]) -> StoreFuture<'a, ()> {
        done(self.write(|s| {
            let mut pairs: HashSet<(Uuid, Uuid)> =
                s.members.iter().map(|m| (m.project_id, m.user_id)).collect();
            for member in members {
                if !pairs.insert((member.project_id, member.user_id)) {
                    return Err(WorktrackError::Conflict(format!(
                        "user {} is already a member of project {}",
                        member.user_id, member.project_id
                    )));
                }
            }
            s.members.extend(members.iter().cloned());
            Ok(())
        }))
    }

    fn delete_member(&self, project_id: Uuid, user_id: Uuid) -> StoreFuture<'_, bool> {
        done(self.write(|s| {
            Ok(remove(&mut s.members, |m| {
                m.project_id == project_id && m.user_id == user_id
            }))
        }))
    }
}

impl TaskStore for MemoryStore {
    fn find_task(&self, id: Uuid) -> StoreFuture<'_, Option<TaskAssignment>> {
        done(Ok(self.read(|s| s.tasks.iter().find(|t| t.id == id).cloned())))
    }

    fn insert_task<'a>(&'a self, task: &'a TaskAssignment) -> StoreFuture<'a, ()> {
        done(self.write(|s| {
            s.tasks.push(task.clone());
            Ok(())
        }))
    }

    fn update_task<'a>(&'a self, task: &'a TaskAssignment) -> StoreFuture<'a, ()> {
        done(self.write(|s| replace(&mut s.tasks, |t| t.id == task.id, task, "task", task.id)))
    }

    fn delete_task(&self, id: Uuid) -> StoreFuture<'_, Vec<String>> {
        done(self.write(|s| {
            if !s.tasks.iter().any(|t| t.id == id) {
                return Err(WorktrackError::not_found("task", id));
            }
            Ok(s.drop_tasks(&HashSet::from([id])))
        }))
    }

    fn tasks_in_project(&self, project_id: Uuid) -> StoreFuture<'_, Vec<TaskAssignment>> {
        done(Ok(self.read(|s| {
            s.tasks
                .iter()
                .filter(|t| t.project_id == project_id)
                .cloned()
                .collect()
        })))
    }

    fn tasks_assigned_to(&self, user_id: Uuid) -> StoreFuture<'_, Vec<TaskAssignment>> {
        done(Ok(self.read(|s| {
            s.tasks
                .iter()
                .filter(|t| t.assigned_to == user_id)
                .cloned()
                .collect()
        })))
    }

    fn count_tasks_assigned_to(&self, user_id: Uuid) -> StoreFuture<'_, u64> {
        done(Ok(self.read(|s| {
            s.tasks.iter().filter(|t| t.assigned_to == user_id).count() as u64
        })))
    }
}

impl CommentStore for MemoryStore {
    fn find_comment(&self, id: Uuid) -> StoreFuture<'_, Option<Comment>> {
        done(Ok(self.read(|s| s.comments.iter().find(|c| c.id == id).cloned())))
    }

    fn insert_comment<'a>(&'a self, comment: &'a Comment) -> StoreFuture<'a, ()> {
        done(self.write(|s| {
            s.comments.push(comment.clone());
            Ok(())
        }))
    }

    fn update_comment<'a>(&'a self, comment: &'a Comment) -> StoreFuture<'a, ()> {
        done(self.write(|s| {
            replace(&mut s.comments, |c| c.id == comment.id, comment, "comment", comment.id)
        }))
    }

    fn delete_comment(&self, id: Uuid) -> StoreFuture<'_, bool> {
        done(self.write(|s| Ok(remove(&mut s.comments, |c| c.id == id))))
    }

    fn comments_for(&self, parent: CommentParent) -> StoreFuture<'_, Vec<Comment>> {
        done(Ok(self.read(|s| {
            let mut comments: Vec<Comment> = s
                .comments
                .iter()
                .filter(|c| c.parent == parent)
                .cloned()
                .collect();
            comments.sort_by_key(|c| c.created_at);
            comments
        })))
    }
}

impl NotificationStore for MemoryStore {
    fn insert_notification<'a>(&'a self, notification: &'a Notification) -> StoreFuture<'a, ()> {
        if self
            .failing_recipients
            .read()
            .unwrap()
            .contains(&notification.user_id)
        {
            return done(Err(WorktrackError::Storage(format!(
                "injected failure for {}",
                notification.user_id
            ))));
        }
        done(self.write(|s| {
            s.notifications.push(notification.clone());
            Ok(())
        }))
    }

    fn find_notification(&self, id: Uuid) -> StoreFuture<'_, Option<Notification>> {
        done(Ok(self.read(|s| s.notifications.iter().find(|n| n.id == id).cloned())))
    }

    fn mark_notification_read(&self, id: Uuid) -> StoreFuture<'_, bool> {
        done(self.write(|s| {
            Ok(match s.notifications.iter_mut().find(|n| n.id == id) {
                Some(n) => {
                    n.is_read = true;
                    true
                }
                None => false,
            })
        }))
    }

    fn mark_all_notifications_read(&self, user_id: Uuid) -> StoreFuture<'_, u64> {
        done(self.write(|s| {
            let mut changed = 0;
            for n in s
                .notifications
                .iter_mut()
                .filter(|n| n.user_id == user_id && !n.is_read)
            {
                n.is_read = true;
                changed += 1;
            }
            Ok(changed)
        }))
    }

    fn delete_notification(&self, id: Uuid) -> StoreFuture<'_, bool> {
        done(self.write(|s| Ok(remove(&mut s.notifications, |n| n.id == id))))
    }

    fn notifications_for(&self, user_id: Uuid) -> StoreFuture<'_, Vec<Notification>> {
        done(Ok(self.read(|s| {
            let mut list: Vec<Notification> = s
                .notifications
                .iter()
                .rev()
                .filter(|n| n.user_id == user_id)
                .cloned()
                .collect();
            list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            list
        })))
    }

    fn unread_count(&self, user_id: Uuid) -> StoreFuture<'_, u64> {
        done(Ok(self.read(|s| {
            s.notifications
                .iter()
                .filter(|n| n.user_id == user_id && !n.is_read)
                .count() as u64
        })))
    }
}

impl ScheduleStore for MemoryStore {
    fn insert_schedule<'a>(
        &'a self,
        schedule: &'a WorkSchedule,
        notification: Option<&'a Notification>,
    ) -> StoreFuture<'a, ()> {
        done(self.write(|s| {
            s.schedules.push(schedule.clone());
            s.notifications.extend(notification.cloned());
            Ok(())
        }))
    }

    fn find_schedule(&self, id: Uuid) -> StoreFuture<'_, Option<WorkSchedule>> {
        done(Ok(self.read(|s| s.schedules.iter().find(|w| w.id == id).cloned())))
    }

    fn update_schedule<'a>(&'a self, schedule: &'a WorkSchedule) -> StoreFuture<'a, ()> {
        done(self.write(|s| {
            replace(&mut s.schedules, |w| w.id == schedule.id, schedule, "schedule", schedule.id)
        }))
    }

    fn delete_schedule(&self, id: Uuid) -> StoreFuture<'_, bool> {
        done(self.write(|s| Ok(remove(&mut s.schedules, |w| w.id == id))))
    }

    fn schedules_in_window(
        &self,
        user_id: Option<Uuid>,
        window: DateWindow,
    ) -> StoreFuture<'_, Vec<WorkSchedule>> {
        done(Ok(self.read(|s| {
            let mut list: Vec<WorkSchedule> = s
                .schedules
                .iter()
                .filter(|w| user_id.map_or(true, |u| w.user_id == u))
                .filter(|w| window.contains(w.start, w.end))
                .cloned()
                .collect();
            list.sort_by_key(|w| w.start);
            list
        })))
    }
}

impl ReportStore for MemoryStore {
    fn insert_report<'a>(&'a self, report: &'a TaskReport) -> StoreFuture<'a, ()> {
        done(self.write(|s| {
            s.reports.push(report.clone());
            Ok(())
        }))
    }

    fn find_report(&self, id: Uuid) -> StoreFuture<'_, Option<TaskReport>> {
        done(Ok(self.read(|s| s.reports.iter().find(|r| r.id == id).cloned())))
    }

    fn reports_for_task(&self, task_id: Uuid) -> StoreFuture<'_, Vec<TaskReport>> {
        done(Ok(self.read(|s| {
            let mut list: Vec<TaskReport> = s
                .reports
                .iter()
                .rev()
                .filter(|r| r.task_id == task_id)
                .cloned()
                .collect();
            list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            list
        })))
    }

    fn mark_report_read(&self, id: Uuid) -> StoreFuture<'_, bool> {
        done(self.write(|s| {
            Ok(match s.reports.iter_mut().find(|r| r.id == id) {
                Some(r) => {
                    r.is_read = true;
                    true
                }
                None => false,
            })
        }))
    }
}

impl UserDataStore for MemoryStore {
    fn delete_account(&self, user_id: Uuid) -> StoreFuture<'_, Vec<String>> {
        done(self.write(|s| {
            let assigned = s.tasks.iter().filter(|t| t.assigned_to == user_id).count();
            if assigned > 0 {
                return Err(WorktrackError::Conflict(format!(
                    "user {} still has {} assigned task(s)",
                    user_id, assigned
                )));
            }

            let mut next = s.clone();
            let mut orphans = Vec::new();
            next.comments.retain(|c| c.author_id != user_id);
            next.members.retain(|m| m.user_id != user_id);
            next.reports.retain(|r| {
                if r.author_id == user_id {
                    orphans.extend(r.attachment_path.clone());
                    false
                } else {
                    true
                }
            });
            next.notifications.retain(|n| n.user_id != user_id);
            next.schedules
                .retain(|w| w.user_id != user_id && w.created_by != user_id);

            if let Some(directory) = &self.directory {
                directory.remove_account(user_id)?;
            }
            *s = next;
            Ok(orphans)
        }))
    }
}

struct Account {
    user: User,
    password: String,
    roles: BTreeSet<GlobalRole>,
}

/// Account Directory held in memory. Passwords are kept in clear text.
#[derive(Default)]
pub struct MemoryDirectory {
    accounts: RwLock<Vec<Account>>,
    fail_next_write: AtomicBool,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next mutating call fail with a storage error.
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    fn write_allowed(&self) -> Result<()> {
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(WorktrackError::Storage("injected write failure".into()));
        }
        Ok(())
    }

    fn remove_account(&self, id: Uuid) -> Result<()> {
        self.write_allowed()?;
        if !remove(&mut *self.accounts.write().unwrap(), |a| a.user.id == id) {
            return Err(WorktrackError::not_found("user", id));
        }
        Ok(())
    }

    /// Write a user, and optionally their roles, under one lock.
    fn store_user(&self, user: &User, roles: Option<&BTreeSet<GlobalRole>>) -> Result<()> {
        self.write_allowed()?;
        let mut accounts = self.accounts.write().unwrap();
        let taken = accounts
            .iter()
            .any(|a| a.user.id != user.id && a.user.email.eq_ignore_ascii_case(&user.email));
        if taken {
            return Err(WorktrackError::Conflict(format!(
                "email {} is already registered",
                user.email
            )));
        }
        let account = accounts
            .iter_mut()
            .find(|a| a.user.id == user.id)
            .ok_or_else(|| WorktrackError::not_found("user", user.id))?;

        let code = account
            .user
            .employee_code
            .clone()
            .or_else(|| user.employee_code.clone());
        account.user = User {
            employee_code: code,
            ..user.clone()
        };
        if let Some(roles) = roles {
            account.roles = roles.clone();
        }
        Ok(())
    }

    /// Current roles of a user, empty if unknown.
    pub fn roles(&self, id: Uuid) -> BTreeSet<GlobalRole> {
        self.accounts
            .read()
            .unwrap()
            .iter()
            .find(|a| a.user.id == id)
            .map(|a| a.roles.clone())
            .unwrap_or_default()
    }

    fn find_by<F: Fn(&User) -> bool>(&self, f: F) -> Option<User> {
        self.accounts
            .read()
            .unwrap()
            .iter()
            .find(|a| f(&a.user))
            .map(|a| a.user.clone())
    }

    fn with_account<T>(&self, id: Uuid, f: impl FnOnce(&mut Account) -> T) -> Result<T> {
        self.write_allowed()?;
        let mut accounts = self.accounts.write().unwrap();
        accounts
            .iter_mut()
            .find(|a| a.user.id == id)
            .map(f)
            .ok_or_else(|| WorktrackError::not_found("user", id))
    }
}

impl AccountDirectory for MemoryDirectory {
    fn find_user(&self, id: Uuid) -> StoreFuture<'_, Option<User>> {
        done(Ok(self.find_by(|u| u.id == id)))
    }

    fn find_user_by_email<'a>(&'a self, email: &'a str) -> StoreFuture<'a, Option<User>> {
        done(Ok(self.find_by(|u| u.email.eq_ignore_ascii_case(email))))
    }

    fn find_user_by_employee_code<'a>(&'a self, code: &'a str) -> StoreFuture<'a, Option<User>> {
        done(Ok(self.find_by(|u| u.employee_code.as_deref() == Some(code))))
    }

    fn list_users(&self) -> StoreFuture<'_, Vec<User>> {
        let mut users: Vec<User> = self
            .accounts
            .read()
            .unwrap()
            .iter()
            .map(|a| a.user.clone())
            .collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        done(Ok(users))
    }

    fn create_user<'a>(
        &'a self,
        user: &'a User,
        password: &'a str,
        roles: &'a BTreeSet<GlobalRole>,
    ) -> StoreFuture<'a, ()> {
        if let Err(e) = self.write_allowed() {
            return done(Err(e));
        }
        let mut accounts = self.accounts.write().unwrap();
        let duplicate = accounts.iter().any(|a| {
            a.user.email.eq_ignore_ascii_case(&user.email)
                || (user.employee_code.is_some() && a.user.employee_code == user.employee_code)
        });
        if duplicate {
            return done(Err(WorktrackError::Conflict(format!(
                "account {} already exists",
                user.email
            ))));
        }
        accounts.push(Account {
            user: user.clone(),
            password: password.to_string(),
            roles: roles.clone(),
        });
        done(Ok(()))
    }

    fn update_user<'a>(&'a self, user: &'a User) -> StoreFuture<'a, ()> {
        done(self.store_user(user, None))
    }

    fn update_user_with_roles<'a>(
        &'a self,
        user: &'a User,
        roles: &'a BTreeSet<GlobalRole>,
    ) -> StoreFuture<'a, ()> {
        done(self.store_user(user, Some(roles)))
    }

    fn set_password<'a>(&'a self, id: Uuid, password: &'a str) -> StoreFuture<'a, ()> {
        done(self.with_account(id, |a| a.password = password.to_string()))
    }

    fn verify_password<'a>(&'a self, id: Uuid, password: &'a str) -> StoreFuture<'a, bool> {
        done(Ok(self
            .accounts
            .read()
            .unwrap()
            .iter()
            .any(|a| a.user.id == id && a.password == password)))
    }

    fn delete_user(&self, id: Uuid) -> StoreFuture<'_, ()> {
        done(self.remove_account(id))
    }

    fn roles_of(&self, id: Uuid) -> StoreFuture<'_, BTreeSet<GlobalRole>> {
        done(Ok(self.roles(id)))
    }

    fn add_role(&self, id: Uuid, role: GlobalRole) -> StoreFuture<'_, ()> {
        done(self.with_account(id, |a| {
            a.roles.insert(role);
        }))
    }

    fn remove_role(&self, id: Uuid, role: GlobalRole) -> StoreFuture<'_, ()> {
        done(self.with_account(id, |a| {
            a.roles.remove(&role);
        }))
    }
}

/// Object Store held in memory.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.read().unwrap().contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.read().unwrap().get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectStore for MemoryObjectStore {
    fn put<'a>(&'a self, category: &'a str, suggested_name: &'a str, bytes: &'a [u8]) -> StoreFuture<'a, String> {
        let path = format!("{}/{}_{}", category, Uuid::new_v4().simple(), suggested_name);
        self.objects
            .write()
            .unwrap()
            .insert(path.clone(), bytes.to_vec());
        done(Ok(path))
    }

    fn delete<'a>(&'a self, path: &'a str) -> StoreFuture<'a, ()> {
        self.objects.write().unwrap().remove(path);
        done(Ok(()))
    }
}

/// A clock that only moves when told to.
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Move to 09:00 UTC on `date`.
    pub fn set(&self, date: NaiveDate) {
        if let Some(at) = date.and_hms_opt(9, 0, 0) {
            *self.now.write().unwrap() = at.and_utc();
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.write().unwrap() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(code: u32, name: &str) -> Project {
        Project {
            id: Uuid::new_v4(),
            code: ProjectCode::new(code).unwrap(),
            name: name.into(),
            description: None,
            start_date: "2025-01-01".parse().unwrap(),
            end_date: "2025-12-31".parse().unwrap(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_insert_project_is_atomic() {
        let store = MemoryStore::new();
        let p = project(1, "Alpha");
        let user = Uuid::new_v4();
        let members = vec![
            ProjectMember::new(p.id, user, ProjectRole::Manager, Utc::now()),
            ProjectMember::new(p.id, user, ProjectRole::Member, Utc::now()),
        ];

        let err = store.insert_project(&p, &members).await.unwrap_err();
        assert!(err.is_conflict());
        assert!(store.find_project(p.id).await.unwrap().is_none());
        assert!(store.members_of(p.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_membership_conflicts() {
        let store = MemoryStore::new();
        let p = project(1, "Alpha");
        store.insert_project(&p, &[]).await.unwrap();
        let member = ProjectMember::new(p.id, Uuid::new_v4(), ProjectRole::Member, Utc::now());
        store.insert_members(&[member.clone()]).await.unwrap();

        let again = ProjectMember::new(p.id, member.user_id, ProjectRole::Manager, Utc::now());
        assert!(store.insert_members(&[again]).await.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn test_code_allocation_skips_existing_and_deleted() {
        let store = MemoryStore::new();
        store.insert_project(&project(7, "Imported"), &[]).await.unwrap();
        assert_eq!(store.allocate_project_code().await.unwrap().number(), 8);
        assert_eq!(store.allocate_project_code().await.unwrap().number(), 9);
    }

    #[tokio::test]
    async fn test_injected_failure_applies_once() {
        let store = MemoryStore::new();
        store.fail_next_write();
        assert!(store.insert_project(&project(1, "Alpha"), &[]).await.is_err());
        assert!(store.insert_project(&project(1, "Alpha"), &[]).await.is_ok());
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock::new("2025-01-15T09:00:00Z".parse().unwrap());
        clock.advance(Duration::days(1));
        assert_eq!(clock.today(), "2025-01-16".parse::<NaiveDate>().unwrap());
    }
}
