//! Notifications: per-user messages, admin sends and broadcast fan-out.

use uuid::Uuid;

use crate::auth::Actor;
use crate::context::ServiceContext;
use crate::error::{Result, WorktrackError};
use crate::policy::{AccessPolicy, Action, ResourceFacts};
use crate::schema::*;
use crate::validate::{limits, optional_text, required_text};

/// Owns Notification rows and their read state.
#[derive(Clone)]
pub struct Notifications {
    ctx: ServiceContext,
}

impl Notifications {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// System-originated notification for one user.
    pub async fn notify(&self, user_id: Uuid, input: NewNotification) -> Result<Notification> {
        let input = normalize(input)?;
        self.ctx.user(user_id).await?;

        let notification = build(user_id, &input, self.ctx.clock.now());
        self.ctx.store.insert_notification(&notification).await?;

        tracing::info!(
            notification_id = %notification.id,
            user_id = %user_id,
            kind = %notification.kind,
            "Notification created"
        );
        Ok(notification)
    }

    /// Admin-sent notification for one user.
    pub async fn send(
        &self,
        actor: &Actor,
        user_id: Uuid,
        input: NewNotification,
    ) -> Result<Notification> {
        AccessPolicy::require(actor, Action::SendNotification, &ResourceFacts::none())?;
        self.notify(user_id, input).await
    }

    /// Admin broadcast: one row per known user.
    ///
    /// Best effort. A failed row is logged and reported back in
    /// [`BroadcastReport::failed`]; the other users still receive theirs.
    /// Re-running the broadcast delivers again to everyone.
    pub async fn broadcast(&self, actor: &Actor, input: NewNotification) -> Result<BroadcastReport> {
        AccessPolicy::require(actor, Action::SendNotification, &ResourceFacts::none())?;
        let input = normalize(input)?;

        let users = self.ctx.directory.list_users().await?;
        let now = self.ctx.clock.now();
        let mut report = BroadcastReport::default();

        for user in users {
            let notification = build(user.id, &input, now);
            match self.ctx.store.insert_notification(&notification).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(user_id = %user.id, error = %e, "Broadcast delivery failed");
                    report.failed.push(user.id);
                }
            }
        }

        tracing::info!(
            delivered = report.delivered,
            failed = report.failed.len(),
            "Notification broadcast finished"
        );
        Ok(report)
    }

    pub async fn mark_read(&self, actor: &Actor, id: Uuid) -> Result<()> {
        self.owned(actor, id).await?;
        self.ctx.store.mark_notification_read(id).await?;
        Ok(())
    }

    /// Returns how many notifications were unread.
    pub async fn mark_all_read(&self, actor: &Actor) -> Result<u64> {
        let changed = self
            .ctx
            .store
            .mark_all_notifications_read(actor.user_id())
            .await?;
        tracing::debug!(user_id = %actor.user_id(), changed, "Notifications marked read");
        Ok(changed)
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<()> {
        self.owned(actor, id).await?;
        if !self.ctx.store.delete_notification(id).await? {
            return Err(WorktrackError::not_found("notification", id));
        }
        Ok(())
    }

    /// The actor's notifications, newest first.
    pub async fn list(&self, actor: &Actor) -> Result<Vec<Notification>> {
        self.ctx.store.notifications_for(actor.user_id()).await
    }

    pub async fn unread_count(&self, actor: &Actor) -> Result<u64> {
        self.ctx.store.unread_count(actor.user_id()).await
    }

    /// Someone else's notification is reported as missing.
    async fn owned(&self, actor: &Actor, id: Uuid) -> Result<Notification> {
        let notification = self
            .ctx
            .store
            .find_notification(id)
            .await?
            .ok_or_else(|| WorktrackError::not_found("notification", id))?;

        let facts = ResourceFacts::none().subject(actor.is(notification.user_id));
        if !AccessPolicy::can_act(actor, Action::ManageOwnNotification, &facts) {
            return Err(WorktrackError::not_found("notification", id));
        }
        Ok(notification)
    }
}

pub(crate) fn normalize(input: NewNotification) -> Result<NewNotification> {
    Ok(NewNotification {
        title: required_text("title", &input.title, limits::NOTIFICATION_TITLE)?,
        content: required_text("content", &input.content, limits::NOTIFICATION_CONTENT)?,
        kind: input.kind,
        related_url: optional_text(
            "related_url",
            input.related_url.as_deref(),
            limits::NOTIFICATION_URL,
        )?,
    })
}

pub(crate) fn build(
    user_id: Uuid,
    input: &NewNotification,
    now: chrono::DateTime<chrono::Utc>,
) -> Notification {
    Notification {
        id: Uuid::new_v4(),
        user_id,
        title: input.title.clone(),
        content: input.content.clone(),
        kind: input.kind,
        related_url: input.related_url.clone(),
        is_read: false,
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{validation_error_for_field, TestWorld};
    use crate::{assert_err_variant, assert_ok};

    fn message(title: &str) -> NewNotification {
        NewNotification {
            title: title.into(),
            content: "Please read".into(),
            kind: NotificationKind::Warning,
            related_url: None,
        }
    }

    #[tokio::test]
    async fn test_only_admin_sends() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let bob = world.user("bob").await;

        let result = world.notifications.send(&bob, admin.user_id(), message("hi")).await;
        assert_err_variant!(result, WorktrackError::Forbidden(_));

        let sent = world.notifications.send(&admin, bob.user_id(), message("hi")).await.unwrap();
        assert_eq!(sent.user_id, bob.user_id());
        assert!(!sent.is_read);
        assert_eq!(world.notifications.unread_count(&bob).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_title_is_required() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let err = world
            .notifications
            .send(&admin, admin.user_id(), message(" "))
            .await
            .unwrap_err();
        assert!(validation_error_for_field(&err, "title"));
    }

    #[tokio::test]
    async fn test_related_url_length_is_capped() {
        let world = TestWorld::new();
        let admin = world.admin().await;

        let mut long = message("hi");
        long.related_url = Some(format!("/tasks/{}", "x".repeat(limits::NOTIFICATION_URL)));
        let err = world
            .notifications
            .send(&admin, admin.user_id(), long)
            .await
            .unwrap_err();
        assert!(validation_error_for_field(&err, "related_url"));

        let mut fits = message("hi");
        fits.related_url = Some("x".repeat(limits::NOTIFICATION_URL));
        assert_ok!(world.notifications.send(&admin, admin.user_id(), fits).await);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_user() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let bob = world.user("bob").await;
        let carol = world.user("carol").await;

        let report = world.notifications.broadcast(&admin, message("maintenance")).await.unwrap();
        assert_eq!(report.delivered, 3);
        assert!(report.failed.is_empty());
        assert_eq!(world.notifications.list(&bob).await.unwrap().len(), 1);
        assert_eq!(world.notifications.list(&carol).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_skips_failed_rows() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let bob = world.user("bob").await;
        let carol = world.user("carol").await;
        world.store.fail_notifications_for(bob.user_id());

        let report = world.notifications.broadcast(&admin, message("maintenance")).await.unwrap();
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed, vec![bob.user_id()]);
        assert_eq!(world.notifications.unread_count(&carol).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_read_state_is_scoped_to_owner() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let bob = world.user("bob").await;
        let carol = world.user("carol").await;
        let first = world.notifications.send(&admin, bob.user_id(), message("one")).await.unwrap();
        world.notifications.send(&admin, bob.user_id(), message("two")).await.unwrap();
        world.notifications.send(&admin, carol.user_id(), message("three")).await.unwrap();

        let result = world.notifications.mark_read(&carol, first.id).await;
        assert_err_variant!(result, WorktrackError::NotFound(_));
        let result = world.notifications.delete(&carol, first.id).await;
        assert_err_variant!(result, WorktrackError::NotFound(_));

        assert_ok!(world.notifications.mark_read(&bob, first.id).await);
        assert_eq!(world.notifications.unread_count(&bob).await.unwrap(), 1);

        assert_eq!(world.notifications.mark_all_read(&bob).await.unwrap(), 1);
        assert_eq!(world.notifications.unread_count(&bob).await.unwrap(), 0);
        assert_eq!(world.notifications.unread_count(&carol).await.unwrap(), 1);

        assert_ok!(world.notifications.delete(&bob, first.id).await);
        assert_eq!(world.notifications.list(&bob).await.unwrap().len(), 1);
    }
}
