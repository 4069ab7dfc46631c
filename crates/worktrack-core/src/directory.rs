//! Account Directory contract: identities, credentials and global roles.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::schema::{GlobalRole, User};
use crate::store::StoreFuture;

/// Identity and credential storage.
///
/// Credentials never leave the directory; callers hand in plain passwords
/// and the implementation hashes them.
pub trait AccountDirectory: Send + Sync {
    fn find_user(&self, id: Uuid) -> StoreFuture<'_, Option<User>>;

    fn find_user_by_email<'a>(&'a self, email: &'a str) -> StoreFuture<'a, Option<User>>;

    fn find_user_by_employee_code<'a>(&'a self, code: &'a str)
        -> StoreFuture<'a, Option<User>>;

    /// Every account, ordered by email.
    fn list_users(&self) -> StoreFuture<'_, Vec<User>>;

    /// Create an account with its roles. Atomic; a duplicate email or
    /// employee code is a conflict.
    fn create_user<'a>(
        &'a self,
        user: &'a User,
        password: &'a str,
        roles: &'a BTreeSet<GlobalRole>,
    ) -> StoreFuture<'a, ()>;

    /// Persist email, profile and avatar changes. The employee code is only
    /// written when the stored one is empty.
    fn update_user<'a>(&'a self, user: &'a User) -> StoreFuture<'a, ()>;

    /// Like [`AccountDirectory::update_user`], and replace the user's global
    /// roles with `roles`, atomically.
    fn update_user_with_roles<'a>(
        &'a self,
        user: &'a User,
        roles: &'a BTreeSet<GlobalRole>,
    ) -> StoreFuture<'a, ()>;

    fn set_password<'a>(&'a self, id: Uuid, password: &'a str) -> StoreFuture<'a, ()>;

    fn verify_password<'a>(&'a self, id: Uuid, password: &'a str) -> StoreFuture<'a, bool>;

    fn delete_user(&self, id: Uuid) -> StoreFuture<'_, ()>;

    fn roles_of(&self, id: Uuid) -> StoreFuture<'_, BTreeSet<GlobalRole>>;

    fn add_role(&self, id: Uuid, role: GlobalRole) -> StoreFuture<'_, ()>;

    fn remove_role(&self, id: Uuid, role: GlobalRole) -> StoreFuture<'_, ()>;
}
