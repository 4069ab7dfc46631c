use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, WorktrackError};
use crate::schema::GlobalRole;

/// The acting user of an operation.
///
/// Passed explicitly into every service call; nothing reads the acting
/// identity from ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    user_id: Uuid,
    roles: BTreeSet<GlobalRole>,
}

impl Actor {
    /// Create an actor with the given global roles.
    pub fn new(user_id: Uuid, roles: impl IntoIterator<Item = GlobalRole>) -> Self {
        Self {
            user_id,
            roles: roles.into_iter().collect(),
        }
    }

    /// An actor holding only the `User` role.
    pub fn user(user_id: Uuid) -> Self {
        Self::new(user_id, [GlobalRole::User])
    }

    /// An actor holding the `Admin` role.
    pub fn admin(user_id: Uuid) -> Self {
        Self::new(user_id, [GlobalRole::Admin])
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn has_role(&self, role: GlobalRole) -> bool {
        self.roles.contains(&role)
    }

    /// Admin supersedes every per-project check.
    pub fn is_admin(&self) -> bool {
        self.has_role(GlobalRole::Admin)
    }

    /// Whether this actor is the given user.
    pub fn is(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    /// Require a global role, returning a forbidden error if absent.
    pub fn require_role(&self, role: GlobalRole) -> Result<()> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(WorktrackError::Forbidden(format!(
                "Required role '{}' not present",
                role
            )))
        }
    }

    pub fn roles(&self) -> impl Iterator<Item = GlobalRole> + '_ {
        self.roles.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_actor() {
        let id = Uuid::new_v4();
        let actor = Actor::admin(id);
        assert!(actor.is_admin());
        assert!(actor.is(id));
        assert!(actor.require_role(GlobalRole::Admin).is_ok());
        assert!(actor.require_role(GlobalRole::Management).is_err());
    }

    #[test]
    fn test_plain_user_is_not_admin() {
        let actor = Actor::user(Uuid::new_v4());
        assert!(!actor.is_admin());
        assert!(actor.has_role(GlobalRole::User));
        assert!(!actor.is(Uuid::new_v4()));
    }

    #[test]
    fn test_roles_are_deduplicated() {
        let actor = Actor::new(
            Uuid::new_v4(),
            vec![GlobalRole::User, GlobalRole::Admin, GlobalRole::User],
        );
        assert_eq!(actor.roles().count(), 2);
    }
}
