//! Discussion: project-level and task-level comments.

use uuid::Uuid;

use crate::auth::Actor;
use crate::context::ServiceContext;
use crate::error::{Result, WorktrackError};
use crate::policy::{AccessPolicy, Action, ResourceFacts};
use crate::schema::*;
use crate::validate::{limits, required_text};

/// Owns comments and their edit/delete rules.
#[derive(Clone)]
pub struct Discussion {
    ctx: ServiceContext,
}

impl Discussion {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn add_comment(
        &self,
        actor: &Actor,
        parent: CommentParent,
        content: &str,
    ) -> Result<Comment> {
        let facts = self.parent_facts(actor, parent).await?;
        AccessPolicy::require(actor, Action::PostComment, &facts)?;

        let comment = Comment {
            id: Uuid::new_v4(),
            parent,
            author_id: actor.user_id(),
            content: required_text("content", content, limits::COMMENT)?,
            created_at: self.ctx.clock.now(),
            updated_at: None,
        };
        self.ctx.store.insert_comment(&comment).await?;

        tracing::info!(comment_id = %comment.id, parent = %parent, "Comment posted");
        Ok(comment)
    }

    /// Only the author may edit.
    pub async fn edit_comment(&self, actor: &Actor, id: Uuid, content: &str) -> Result<Comment> {
        let mut comment = self.find(id).await?;
        let facts = ResourceFacts::none().author(actor.is(comment.author_id));
        AccessPolicy::require(actor, Action::EditComment, &facts)?;

        comment.content = required_text("content", content, limits::COMMENT)?;
        comment.updated_at = Some(self.ctx.clock.now());
        self.ctx.store.update_comment(&comment).await?;

        tracing::info!(comment_id = %id, "Comment edited");
        Ok(comment)
    }

    /// The author, a manager of the owning project, or an admin may delete.
    pub async fn delete_comment(&self, actor: &Actor, id: Uuid) -> Result<()> {
        let comment = self.find(id).await?;
        let facts = self
            .parent_facts(actor, comment.parent)
            .await?
            .author(actor.is(comment.author_id));
        AccessPolicy::require(actor, Action::DeleteComment, &facts)?;

        if !self.ctx.store.delete_comment(id).await? {
            return Err(WorktrackError::not_found("comment", id));
        }

        tracing::info!(comment_id = %id, parent = %comment.parent, "Comment deleted");
        Ok(())
    }

    /// Comments on a project, oldest first.
    pub async fn project_comments(&self, actor: &Actor, project_id: Uuid) -> Result<Vec<CommentView>> {
        let parent = CommentParent::Project(project_id);
        let facts = self.parent_facts(actor, parent).await?;
        AccessPolicy::require(actor, Action::ViewProject, &facts)?;

        let comments = self.ctx.store.comments_for(parent).await?;
        Ok(comment_views(actor, &facts, comments))
    }

    async fn find(&self, id: Uuid) -> Result<Comment> {
        self.ctx
            .store
            .find_comment(id)
            .await?
            .ok_or_else(|| WorktrackError::not_found("comment", id))
    }

    /// Membership facts for the project owning `parent`.
    async fn parent_facts(&self, actor: &Actor, parent: CommentParent) -> Result<ResourceFacts> {
        match parent {
            CommentParent::Project(project_id) => {
                self.ctx.project(project_id).await?;
                let role = self.ctx.role_in(project_id, actor.user_id()).await?;
                Ok(ResourceFacts::in_project(role))
            }
            CommentParent::Task(task_id) => {
                let task = self.ctx.task(task_id).await?;
                let role = self.ctx.role_in(task.project_id, actor.user_id()).await?;
                Ok(ResourceFacts::in_project(role).assignee(actor.is(task.assigned_to)))
            }
        }
    }
}

/// Attach per-comment capabilities for `actor`, given the facts of the
/// owning project.
pub(crate) fn comment_views(
    actor: &Actor,
    facts: &ResourceFacts,
    comments: Vec<Comment>,
) -> Vec<CommentView> {
    comments
        .into_iter()
        .map(|comment| {
            let facts = facts.author(actor.is(comment.author_id));
            CommentView {
                can_edit: AccessPolicy::can_act(actor, Action::EditComment, &facts),
                can_delete: AccessPolicy::can_act(actor, Action::DeleteComment, &facts),
                comment,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{validation_error_for_field, TestWorld};
    use crate::{assert_err_variant, assert_ok};

    #[tokio::test]
    async fn test_members_and_assignees_may_comment() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let bob = world.user("bob").await;
        let outsider = world.user("olga").await;
        let project = world.project(&admin, "Alpha", &[]).await;
        let task = world.task(&admin, &project, &bob).await;

        assert_ok!(
            world
                .discussion
                .add_comment(&bob, CommentParent::Project(project.id), "hello")
                .await
        );
        assert_ok!(
            world
                .discussion
                .add_comment(&admin, CommentParent::Task(task.id), "looks good")
                .await
        );
        let result = world
            .discussion
            .add_comment(&outsider, CommentParent::Task(task.id), "hi")
            .await;
        assert_err_variant!(result, WorktrackError::Forbidden(_));
    }

    #[tokio::test]
    async fn test_content_rules() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let project = world.project(&admin, "Alpha", &[]).await;
        let parent = CommentParent::Project(project.id);

        let err = world.discussion.add_comment(&admin, parent, "   ").await.unwrap_err();
        assert!(validation_error_for_field(&err, "content"));

        let err = world
            .discussion
            .add_comment(&admin, parent, &"x".repeat(2001))
            .await
            .unwrap_err();
        assert!(validation_error_for_field(&err, "content"));

        let comment = world
            .discussion
            .add_comment(&admin, parent, &"x".repeat(2000))
            .await
            .unwrap();
        assert_eq!(comment.content.len(), 2000);
    }

    #[tokio::test]
    async fn test_only_author_edits() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let bob = world.user("bob").await;
        let project = world.project(&admin, "Alpha", &[]).await;
        world.add_member(&admin, &project, &bob).await;
        let comment = world
            .discussion
            .add_comment(&bob, CommentParent::Project(project.id), "first")
            .await
            .unwrap();

        let result = world.discussion.edit_comment(&admin, comment.id, "changed").await;
        assert_err_variant!(result, WorktrackError::Forbidden(_));

        let edited = world.discussion.edit_comment(&bob, comment.id, " second ").await.unwrap();
        assert_eq!(edited.content, "second");
        assert!(edited.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_delete_rules() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let mia = world.user("mia").await;
        let bob = world.user("bob").await;
        let carol = world.user("carol").await;
        let project = world.project(&admin, "Alpha", &[&mia]).await;
        world.add_member(&admin, &project, &bob).await;
        world.add_member(&admin, &project, &carol).await;
        let parent = CommentParent::Project(project.id);

        let by_bob = world.discussion.add_comment(&bob, parent, "one").await.unwrap();
        let result = world.discussion.delete_comment(&carol, by_bob.id).await;
        assert_err_variant!(result, WorktrackError::Forbidden(_));
        assert_ok!(world.discussion.delete_comment(&mia, by_bob.id).await);

        let by_carol = world.discussion.add_comment(&carol, parent, "two").await.unwrap();
        assert_ok!(world.discussion.delete_comment(&carol, by_carol.id).await);
    }

    #[tokio::test]
    async fn test_comment_views_flags() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let bob = world.user("bob").await;
        let project = world.project(&admin, "Alpha", &[]).await;
        world.add_member(&admin, &project, &bob).await;
        let parent = CommentParent::Project(project.id);
        world.discussion.add_comment(&bob, parent, "mine").await.unwrap();
        world.discussion.add_comment(&admin, parent, "theirs").await.unwrap();

        let views = world.discussion.project_comments(&bob, project.id).await.unwrap();
        assert_eq!(views.len(), 2);
        assert!(views[0].can_edit && views[0].can_delete);
        assert!(!views[1].can_edit && !views[1].can_delete);
    }
}
