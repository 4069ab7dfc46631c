//! Object Store contract for avatars and attachments.

use crate::store::StoreFuture;

/// Blob storage addressed by opaque paths.
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `category` and return the new object's path.
    /// Never overwrites an existing object.
    fn put<'a>(
        &'a self,
        category: &'a str,
        suggested_name: &'a str,
        bytes: &'a [u8],
    ) -> StoreFuture<'a, String>;

    /// Remove an object. Removing a missing object succeeds.
    fn delete<'a>(&'a self, path: &'a str) -> StoreFuture<'a, ()>;
}

/// Object categories.
pub mod category {
    pub const AVATARS: &str = "avatars";
    pub const TASK_ATTACHMENTS: &str = "tasks";
    pub const REPORT_ATTACHMENTS: &str = "reports";
}
