//! Work schedules: calendar entries placed on a user's schedule.

use uuid::Uuid;

use crate::auth::Actor;
use crate::context::ServiceContext;
use crate::error::{Result, WorktrackError};
use crate::notifications;
use crate::policy::{AccessPolicy, Action, ResourceFacts};
use crate::schema::*;
use crate::validate::{limits, optional_text, required_text};

/// Calendar colour used when none is given.
pub const DEFAULT_COLOR: &str = "#3788d8";

/// Owns WorkSchedule rows.
#[derive(Clone)]
pub struct Schedules {
    ctx: ServiceContext,
}

impl Schedules {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Place an entry on a user's schedule. When the scheduled user is not
    /// the creator they are notified in the same write.
    pub async fn create_schedule(&self, actor: &Actor, input: NewSchedule) -> Result<WorkSchedule> {
        let fields = ScheduleFields::validate(&input)?;
        self.ctx.user(input.user_id).await?;
        self.require_target(actor, Action::CreateSchedule, input.user_id).await?;
        self.check_project(actor, input.project_id).await?;

        let now = self.ctx.clock.now();
        let schedule = WorkSchedule {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            project_id: input.project_id,
            title: fields.title,
            description: fields.description,
            start: input.start,
            end: input.end,
            is_all_day: input.is_all_day,
            color: fields.color,
            schedule_type: input.schedule_type,
            location: fields.location,
            created_by: actor.user_id(),
            created_at: now,
            updated_at: None,
        };

        let notification = if actor.is(schedule.user_id) {
            None
        } else {
            Some(notifications::build(schedule.user_id, &announcement(&schedule), now))
        };
        self.ctx
            .store
            .insert_schedule(&schedule, notification.as_ref())
            .await?;

        tracing::info!(
            schedule_id = %schedule.id,
            user_id = %schedule.user_id,
            created_by = %schedule.created_by,
            notified = notification.is_some(),
            "Schedule created"
        );
        Ok(schedule)
    }

    /// Creator or admin. Moving the entry to another user is checked like a
    /// new entry for that user.
    pub async fn edit_schedule(
        &self,
        actor: &Actor,
        id: Uuid,
        input: NewSchedule,
    ) -> Result<WorkSchedule> {
        let mut schedule = self.find(id).await?;
        let facts = ResourceFacts::none().creator(actor.is(schedule.created_by));
        AccessPolicy::require(actor, Action::EditSchedule, &facts)?;

        let fields = ScheduleFields::validate(&input)?;
        if input.user_id != schedule.user_id {
            self.ctx.user(input.user_id).await?;
            self.require_target(actor, Action::CreateSchedule, input.user_id).await?;
        }
        if input.project_id != schedule.project_id {
            self.check_project(actor, input.project_id).await?;
        }

        schedule.user_id = input.user_id;
        schedule.project_id = input.project_id;
        schedule.title = fields.title;
        schedule.description = fields.description;
        schedule.start = input.start;
        schedule.end = input.end;
        schedule.is_all_day = input.is_all_day;
        schedule.color = fields.color;
        schedule.schedule_type = input.schedule_type;
        schedule.location = fields.location;
        schedule.updated_at = Some(self.ctx.clock.now());

        self.ctx.store.update_schedule(&schedule).await?;
        tracing::info!(schedule_id = %id, "Schedule updated");
        Ok(schedule)
    }

    pub async fn delete_schedule(&self, actor: &Actor, id: Uuid) -> Result<()> {
        let schedule = self.find(id).await?;
        let facts = ResourceFacts::none().creator(actor.is(schedule.created_by));
        AccessPolicy::require(actor, Action::DeleteSchedule, &facts)?;

        if !self.ctx.store.delete_schedule(id).await? {
            return Err(WorktrackError::not_found("schedule", id));
        }
        tracing::info!(schedule_id = %id, "Schedule deleted");
        Ok(())
    }

    /// Admin, the scheduled user, or the creator.
    pub async fn schedule_detail(&self, actor: &Actor, id: Uuid) -> Result<WorkSchedule> {
        let schedule = self.find(id).await?;
        let facts = ResourceFacts::none()
            .creator(actor.is(schedule.created_by))
            .subject(actor.is(schedule.user_id));
        AccessPolicy::require(actor, Action::ViewSchedule, &facts)?;
        Ok(schedule)
    }

    /// Entries inside `window`: every user's for an admin, otherwise the
    /// actor's own.
    pub async fn calendar(&self, actor: &Actor, window: DateWindow) -> Result<Vec<WorkSchedule>> {
        if window.end < window.start {
            return Err(WorktrackError::invalid("end", "window ends before it starts"));
        }
        let user = if actor.is_admin() {
            None
        } else {
            Some(actor.user_id())
        };
        self.ctx.store.schedules_in_window(user, window).await
    }

    async fn find(&self, id: Uuid) -> Result<WorkSchedule> {
        self.ctx
            .store
            .find_schedule(id)
            .await?
            .ok_or_else(|| WorktrackError::not_found("schedule", id))
    }

    async fn require_target(&self, actor: &Actor, action: Action, target: Uuid) -> Result<()> {
        let managed = if actor.is_admin() {
            false
        } else {
            self.ctx.managed_peers(actor.user_id()).await?.contains(&target)
        };
        let facts = ResourceFacts::none()
            .managed_target(managed)
            .subject(actor.is(target));
        AccessPolicy::require(actor, action, &facts)
    }

    /// A referenced project must exist; non-admins may only reference
    /// projects they manage.
    async fn check_project(&self, actor: &Actor, project_id: Option<Uuid>) -> Result<()> {
        let Some(project_id) = project_id else {
            return Ok(());
        };
        self.ctx.project(project_id).await?;
        if actor.is_admin() {
            return Ok(());
        }
        match self.ctx.role_in(project_id, actor.user_id()).await? {
            Some(ProjectRole::Manager) => Ok(()),
            _ => Err(WorktrackError::Forbidden(format!(
                "not a manager of project {}",
                project_id
            ))),
        }
    }
}

struct ScheduleFields {
    title: String,
    description: Option<String>,
    location: Option<String>,
    color: String,
}

impl ScheduleFields {
    fn validate(input: &NewSchedule) -> Result<Self> {
        if input.end <= input.start {
            return Err(WorktrackError::invalid("end", "must be after start"));
        }
        let color = match input.color.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_COLOR.to_string(),
            Some(c) if c.len() <= 20 => c.to_string(),
            Some(_) => return Err(WorktrackError::invalid("color", "too long")),
        };
        Ok(Self {
            title: required_text("title", &input.title, limits::SCHEDULE_TITLE)?,
            description: optional_text(
                "description",
                input.description.as_deref(),
                limits::SCHEDULE_DESCRIPTION,
            )?,
            location: optional_text("location", input.location.as_deref(), limits::SCHEDULE_LOCATION)?,
            color,
        })
    }
}

fn announcement(schedule: &WorkSchedule) -> NewNotification {
    NewNotification {
        title: "New work schedule".to_string(),
        content: format!(
            "You have a new schedule: {} starting {}",
            schedule.title,
            schedule.start.format("%d/%m/%Y")
        ),
        kind: NotificationKind::Info,
        related_url: Some(format!("/schedules/{}", schedule.id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{at, validation_error_for_field, TestWorld};
    use crate::{assert_err_variant, assert_ok};

    fn entry(user: &Actor, start: &str, end: &str) -> NewSchedule {
        NewSchedule {
            user_id: user.user_id(),
            project_id: None,
            title: "Site visit".into(),
            description: None,
            start: at(start),
            end: at(end),
            is_all_day: false,
            color: None,
            schedule_type: ScheduleType::Meeting,
            location: Some("HQ".into()),
        }
    }

    #[tokio::test]
    async fn test_end_must_follow_start() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let bob = world.user("bob").await;

        let err = world
            .schedules
            .create_schedule(&admin, entry(&bob, "2025-02-03T09:00:00Z", "2025-02-03T09:00:00Z"))
            .await
            .unwrap_err();
        assert!(validation_error_for_field(&err, "end"));
    }

    #[tokio::test]
    async fn test_admin_schedules_anyone_and_target_is_notified() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let bob = world.user("bob").await;

        let schedule = world
            .schedules
            .create_schedule(&admin, entry(&bob, "2025-02-03T09:00:00Z", "2025-02-03T11:00:00Z"))
            .await
            .unwrap();
        assert_eq!(schedule.color, DEFAULT_COLOR);

        let inbox = world.notifications.list(&bob).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].title, "New work schedule");
        assert!(inbox[0].content.contains("03/02/2025"));
        assert_eq!(
            inbox[0].related_url.as_deref(),
            Some(format!("/schedules/{}", schedule.id).as_str())
        );
    }

    #[tokio::test]
    async fn test_own_entry_is_not_announced() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        world
            .schedules
            .create_schedule(&admin, entry(&admin, "2025-02-03T09:00:00Z", "2025-02-03T11:00:00Z"))
            .await
            .unwrap();
        assert_eq!(world.notifications.unread_count(&admin).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_manager_limited_to_managed_members() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let mia = world.user("mia").await;
        let bob = world.user("bob").await;
        let outsider = world.user("olga").await;
        let project = world.project(&admin, "Alpha", &[&mia]).await;
        world.add_member(&admin, &project, &bob).await;

        assert_ok!(
            world
                .schedules
                .create_schedule(&mia, entry(&bob, "2025-02-03T09:00:00Z", "2025-02-03T11:00:00Z"))
                .await
        );

        let result = world
            .schedules
            .create_schedule(&mia, entry(&outsider, "2025-02-03T09:00:00Z", "2025-02-03T11:00:00Z"))
            .await;
        assert_err_variant!(result, WorktrackError::Forbidden(_));
        assert_eq!(world.notifications.unread_count(&outsider).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_plain_member_cannot_schedule_others() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let bob = world.user("bob").await;
        let carol = world.user("carol").await;
        let project = world.project(&admin, "Alpha", &[]).await;
        world.add_member(&admin, &project, &bob).await;
        world.add_member(&admin, &project, &carol).await;

        let result = world
            .schedules
            .create_schedule(&bob, entry(&carol, "2025-02-03T09:00:00Z", "2025-02-03T11:00:00Z"))
            .await;
        assert_err_variant!(result, WorktrackError::Forbidden(_));
    }

    #[tokio::test]
    async fn test_edit_and_delete_by_creator_or_admin() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let mia = world.user("mia").await;
        let bob = world.user("bob").await;
        let project = world.project(&admin, "Alpha", &[&mia]).await;
        world.add_member(&admin, &project, &bob).await;

        let schedule = world
            .schedules
            .create_schedule(&mia, entry(&bob, "2025-02-03T09:00:00Z", "2025-02-03T11:00:00Z"))
            .await
            .unwrap();

        let mut change = entry(&bob, "2025-02-04T09:00:00Z", "2025-02-04T11:00:00Z");
        let result = world.schedules.edit_schedule(&bob, schedule.id, change.clone()).await;
        assert_err_variant!(result, WorktrackError::Forbidden(_));

        change.project_id = Some(project.id);
        let edited = world.schedules.edit_schedule(&mia, schedule.id, change).await.unwrap();
        assert_eq!(edited.start, at("2025-02-04T09:00:00Z"));
        assert_eq!(edited.created_by, mia.user_id());

        let result = world.schedules.delete_schedule(&bob, schedule.id).await;
        assert_err_variant!(result, WorktrackError::Forbidden(_));
        assert_ok!(world.schedules.delete_schedule(&admin, schedule.id).await);
    }

    #[tokio::test]
    async fn test_detail_and_calendar_visibility() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let bob = world.user("bob").await;
        let carol = world.user("carol").await;

        let for_bob = world
            .schedules
            .create_schedule(&admin, entry(&bob, "2025-02-03T09:00:00Z", "2025-02-03T11:00:00Z"))
            .await
            .unwrap();
        world
            .schedules
            .create_schedule(&admin, entry(&carol, "2025-02-05T09:00:00Z", "2025-02-05T11:00:00Z"))
            .await
            .unwrap();
        world
            .schedules
            .create_schedule(&admin, entry(&bob, "2025-02-27T09:00:00Z", "2025-03-02T11:00:00Z"))
            .await
            .unwrap();

        assert_ok!(world.schedules.schedule_detail(&bob, for_bob.id).await);
        let result = world.schedules.schedule_detail(&carol, for_bob.id).await;
        assert_err_variant!(result, WorktrackError::Forbidden(_));

        let february = DateWindow::new(at("2025-02-01T00:00:00Z"), at("2025-03-01T00:00:00Z"));
        let mine = world.schedules.calendar(&bob, february).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, for_bob.id);

        assert_eq!(world.schedules.calendar(&admin, february).await.unwrap().len(), 2);
    }
}
