//! Testing utilities.
//!
//! In-memory implementations of every collaborator, a [`TestWorld`] that
//! wires them into the services, and assertion helpers.
//!
//! # Example
//!
//! ```ignore
//! use worktrack_core::testing::*;
//!
//! #[tokio::test]
//! async fn test_member_cannot_create_project() {
//!     let world = TestWorld::new();
//!     let bob = world.user("bob").await;
//!     let result = world.projects.create_project(&bob, input).await;
//!     assert_err_variant!(result, WorktrackError::Forbidden(_));
//! }
//! ```

pub mod assertions;
pub mod memory;
pub mod world;

pub use assertions::*;
pub use memory::{FixedClock, MemoryDirectory, MemoryObjectStore, MemoryStore};
pub use world::{at, date, TestWorld};
