//! Accounts: admin user management, self-service profiles and actor
//! resolution.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::auth::Actor;
use crate::context::ServiceContext;
use crate::error::{Result, WorktrackError};
use crate::objects::category;
use crate::policy::{AccessPolicy, Action, ResourceFacts};
use crate::schema::*;
use crate::validate::{self, limits, optional_text, required_text};

/// Longest accepted value for a single profile field.
const PROFILE_FIELD: usize = 200;

#[derive(Clone)]
pub struct Accounts {
    ctx: ServiceContext,
}

impl Accounts {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Build the explicit actor for a signed-in user.
    pub async fn resolve_actor(&self, user_id: Uuid) -> Result<Actor> {
        if self.ctx.directory.find_user(user_id).await?.is_none() {
            return Err(WorktrackError::Unauthorized(format!("unknown user {}", user_id)));
        }
        let roles = self.ctx.directory.roles_of(user_id).await?;
        Ok(Actor::new(user_id, roles))
    }

    /// Create an account. Without explicit roles the user gets `User`.
    pub async fn create_user(&self, actor: &Actor, input: NewUser) -> Result<User> {
        AccessPolicy::require(actor, Action::ManageUsers, &ResourceFacts::none())?;

        let email = validate::email(&input.email)?;
        validate::password(&input.password)?;
        let employee_code =
            required_text("employee_code", &input.employee_code, limits::EMPLOYEE_CODE)?;
        let profile = normalize_profile(input.profile)?;

        if self.ctx.directory.find_user_by_email(&email).await?.is_some() {
            return Err(WorktrackError::Conflict(format!("email {} is already registered", email)));
        }
        if self
            .ctx
            .directory
            .find_user_by_employee_code(&employee_code)
            .await?
            .is_some()
        {
            return Err(WorktrackError::Conflict(format!(
                "employee code {} is already in use",
                employee_code
            )));
        }

        let user = User {
            id: Uuid::new_v4(),
            email,
            employee_code: Some(employee_code),
            profile,
            avatar_path: None,
            created_at: self.ctx.clock.now(),
            updated_at: None,
        };
        let roles = role_set(input.roles);
        self.ctx
            .directory
            .create_user(&user, &input.password, &roles)
            .await?;

        tracing::info!(user_id = %user.id, email = %user.email, roles = ?roles, "User created");
        Ok(user)
    }

    /// Change a user's email and roles. The employee code is untouched and
    /// the user always keeps at least the `User` role.
    pub async fn edit_user(
        &self,
        actor: &Actor,
        id: Uuid,
        email: &str,
        roles: Vec<GlobalRole>,
    ) -> Result<User> {
        AccessPolicy::require(actor, Action::ManageUsers, &ResourceFacts::none())?;

        let mut user = self.ctx.user(id).await?;
        let email = validate::email(email)?;
        if let Some(other) = self.ctx.directory.find_user_by_email(&email).await? {
            if other.id != id {
                return Err(WorktrackError::Conflict(format!(
                    "email {} is already registered",
                    email
                )));
            }
        }

        user.email = email;
        user.updated_at = Some(self.ctx.clock.now());
        let wanted = role_set(roles);
        self.ctx
            .directory
            .update_user_with_roles(&user, &wanted)
            .await?;

        tracing::info!(user_id = %id, roles = ?wanted, "User updated");
        Ok(user)
    }

    /// Self-service profile edit with an optional new avatar.
    pub async fn update_profile(
        &self,
        actor: &Actor,
        id: Uuid,
        profile: UserProfile,
        avatar: Option<Upload>,
    ) -> Result<User> {
        let facts = ResourceFacts::none().subject(actor.is(id));
        AccessPolicy::require(actor, Action::EditProfile, &facts)?;

        let mut user = self.ctx.user(id).await?;
        user.profile = normalize_profile(profile)?;

        let new_avatar = match &avatar {
            Some(upload) => Some(
                self.ctx
                    .save_upload(&self.ctx.storage.avatars, "avatar", category::AVATARS, upload)
                    .await?,
            ),
            None => None,
        };

        let previous = user.avatar_path.clone();
        if let Some(path) = &new_avatar {
            user.avatar_path = Some(path.clone());
        }
        user.updated_at = Some(self.ctx.clock.now());

        if let Err(e) = self.ctx.directory.update_user(&user).await {
            self.ctx.discard_objects(new_avatar).await;
            return Err(e);
        }
        if new_avatar.is_some() {
            self.ctx.discard_objects(previous).await;
        }

        tracing::info!(user_id = %id, avatar_changed = new_avatar.is_some(), "Profile updated");
        Ok(user)
    }

    pub async fn reset_password(&self, actor: &Actor, id: Uuid, password: &str) -> Result<()> {
        AccessPolicy::require(actor, Action::ManageUsers, &ResourceFacts::none())?;
        self.ctx.user(id).await?;
        validate::password(password)?;

        self.ctx.directory.set_password(id, password).await?;
        tracing::info!(user_id = %id, "Password reset");
        Ok(())
    }

    /// Delete an account. Refused while the user still has assigned tasks.
    pub async fn delete_user(&self, actor: &Actor, id: Uuid) -> Result<()> {
        AccessPolicy::require(actor, Action::ManageUsers, &ResourceFacts::none())?;
        if actor.is(id) {
            return Err(WorktrackError::Forbidden("cannot delete your own account".into()));
        }

        let user = self.ctx.user(id).await?;
        let assigned = self.ctx.store.count_tasks_assigned_to(id).await?;
        if assigned > 0 {
            return Err(WorktrackError::Conflict(format!(
                "user {} still has {} assigned task(s); reassign or delete them first",
                user.email, assigned
            )));
        }

        // The store re-checks assigned tasks inside its transaction.
        let orphans = self.ctx.store.delete_account(id).await?;
        tracing::info!(user_id = %id, email = %user.email, "User deleted");

        self.ctx
            .discard_objects(orphans.into_iter().chain(user.avatar_path))
            .await;
        Ok(())
    }

    /// Every account, for admins.
    pub async fn list_users(&self, actor: &Actor) -> Result<Vec<User>> {
        AccessPolicy::require(actor, Action::ManageUsers, &ResourceFacts::none())?;
        self.ctx.directory.list_users().await
    }
}

fn role_set(roles: Vec<GlobalRole>) -> BTreeSet<GlobalRole> {
    let mut set: BTreeSet<GlobalRole> = roles.into_iter().collect();
    set.insert(GlobalRole::User);
    set
}

fn normalize_profile(profile: UserProfile) -> Result<UserProfile> {
    let field = |name: &str, value: Option<String>| optional_text(name, value.as_deref(), PROFILE_FIELD);
    Ok(UserProfile {
        full_name: field("full_name", profile.full_name)?,
        phone_number: field("phone_number", profile.phone_number)?,
        address: field("address", profile.address)?,
        date_of_birth: profile.date_of_birth,
        gender: field("gender", profile.gender)?,
        department: field("department", profile.department)?,
        position: field("position", profile.position)?,
    })
}
