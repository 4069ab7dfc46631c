//! The assembled rule services.

use crate::accounts::Accounts;
use crate::context::ServiceContext;
use crate::discussion::Discussion;
use crate::notifications::Notifications;
use crate::projects::ProjectRegistry;
use crate::reports::Reports;
use crate::schedules::Schedules;
use crate::tasks::TaskEngine;

/// Every service wired to one set of collaborators.
#[derive(Clone)]
pub struct Worktrack {
    pub projects: ProjectRegistry,
    pub tasks: TaskEngine,
    pub discussion: Discussion,
    pub notifications: Notifications,
    pub schedules: Schedules,
    pub reports: Reports,
    pub accounts: Accounts,
}

impl Worktrack {
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            projects: ProjectRegistry::new(ctx.clone()),
            tasks: TaskEngine::new(ctx.clone()),
            discussion: Discussion::new(ctx.clone()),
            notifications: Notifications::new(ctx.clone()),
            schedules: Schedules::new(ctx.clone()),
            reports: Reports::new(ctx.clone()),
            accounts: Accounts::new(ctx),
        }
    }
}
