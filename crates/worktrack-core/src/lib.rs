pub mod accounts;
pub mod app;
pub mod auth;
pub mod clock;
pub mod config;
pub mod context;
pub mod directory;
pub mod discussion;
pub mod error;
pub mod notifications;
pub mod objects;
pub mod policy;
pub mod projects;
pub mod reports;
pub mod schedules;
pub mod schema;
pub mod store;
pub mod tasks;
pub mod validate;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use app::Worktrack;
pub use auth::Actor;
pub use clock::{Clock, SystemClock};
pub use config::WorktrackConfig;
pub use context::ServiceContext;
pub use directory::AccountDirectory;
pub use error::{Result, WorktrackError};
pub use objects::ObjectStore;
pub use policy::{AccessPolicy, Action, ResourceFacts};
pub use store::{EntityStore, StoreFuture};
