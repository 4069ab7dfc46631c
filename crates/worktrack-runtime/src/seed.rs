//! Default data: global roles, the built-in admin and management accounts
//! and employee codes for accounts created before codes were mandatory.
//!
//! Every step is idempotent; running the seeder twice changes nothing.

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, info, warn};
use uuid::Uuid;
use worktrack_core::clock::Clock;
use worktrack_core::config::SeedConfig;
use worktrack_core::directory::AccountDirectory;
use worktrack_core::error::Result;
use worktrack_core::schema::{GlobalRole, User, UserProfile};

use crate::directory::PgAccountDirectory;

/// What a seeding run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub roles_created: usize,
    pub accounts_created: Vec<String>,
    pub roles_granted: usize,
    pub codes_backfilled: usize,
}

struct DefaultAccount<'a> {
    email: &'a str,
    password: &'a str,
    employee_code: &'static str,
    role: GlobalRole,
    profile: UserProfile,
}

fn default_accounts(config: &SeedConfig) -> [DefaultAccount<'_>; 2] {
    [
        DefaultAccount {
            email: &config.admin_email,
            password: &config.admin_password,
            employee_code: "ADMIN001",
            role: GlobalRole::Admin,
            profile: UserProfile {
                full_name: Some("Administrator".into()),
                department: Some("IT".into()),
                position: Some("System administrator".into()),
                ..Default::default()
            },
        },
        DefaultAccount {
            email: &config.management_email,
            password: &config.management_password,
            employee_code: "MGT001",
            role: GlobalRole::Management,
            profile: UserProfile {
                full_name: Some("Management".into()),
                department: Some("Management".into()),
                position: Some("Project manager".into()),
                ..Default::default()
            },
        },
    ]
}

/// Seed a PostgreSQL deployment.
pub async fn seed(
    directory: &PgAccountDirectory,
    config: &SeedConfig,
    clock: &dyn Clock,
) -> Result<SeedReport> {
    let roles_created = directory.ensure_global_roles().await?;
    let mut report = seed_accounts(directory, config, clock).await?;
    report.roles_created = roles_created;
    Ok(report)
}

/// Backfill missing employee codes, then create or repair the default
/// accounts.
pub async fn seed_accounts(
    directory: &dyn AccountDirectory,
    config: &SeedConfig,
    clock: &dyn Clock,
) -> Result<SeedReport> {
    if config.uses_default_password() {
        warn!("Default accounts use the built-in password; set [seed] passwords in worktrack.toml");
    }

    let mut report = SeedReport {
        codes_backfilled: backfill_employee_codes(directory, clock).await?,
        ..Default::default()
    };

    for account in default_accounts(config) {
        match directory.find_user_by_email(account.email).await? {
            Some(existing) => {
                report.roles_granted += repair_account(directory, existing, &account, clock).await?;
            }
            None => {
                create_account(directory, &account, clock).await?;
                report.accounts_created.push(account.email.to_string());
            }
        }
    }

    Ok(report)
}

async fn create_account(
    directory: &dyn AccountDirectory,
    account: &DefaultAccount<'_>,
    clock: &dyn Clock,
) -> Result<()> {
    let user = User {
        id: Uuid::new_v4(),
        email: account.email.to_lowercase(),
        employee_code: Some(account.employee_code.to_string()),
        profile: account.profile.clone(),
        avatar_path: None,
        created_at: clock.now(),
        updated_at: None,
    };
    let roles = BTreeSet::from([account.role, GlobalRole::User]);
    directory.create_user(&user, account.password, &roles).await?;

    info!(user_id = %user.id, email = %user.email, role = %account.role, "Default account created");
    Ok(())
}

/// Give an existing default account its role and employee code. Returns the
/// number of roles granted.
async fn repair_account(
    directory: &dyn AccountDirectory,
    existing: User,
    account: &DefaultAccount<'_>,
    clock: &dyn Clock,
) -> Result<usize> {
    let mut granted = 0;
    if !directory.roles_of(existing.id).await?.contains(&account.role) {
        directory.add_role(existing.id, account.role).await?;
        info!(user_id = %existing.id, role = %account.role, "Role granted to default account");
        granted += 1;
    }

    if existing.employee_code.is_none() {
        let user = User {
            employee_code: Some(account.employee_code.to_string()),
            updated_at: Some(clock.now()),
            ..existing
        };
        directory.update_user(&user).await?;
        info!(user_id = %user.id, code = account.employee_code, "Employee code assigned");
    } else {
        debug!(email = account.email, "Default account already present");
    }

    Ok(granted)
}

/// Assign `<LOCAL-PART><NNNN>` codes to accounts without one. The counter is
/// shared across the run and skips codes already in use.
pub async fn backfill_employee_codes(
    directory: &dyn AccountDirectory,
    clock: &dyn Clock,
) -> Result<usize> {
    let users = directory.list_users().await?;
    let mut taken: HashSet<String> = users
        .iter()
        .filter_map(|u| u.employee_code.clone())
        .collect();

    let mut counter = 1;
    let mut assigned = 0;
    for user in users.into_iter().filter(|u| u.employee_code.is_none()) {
        let (code, next) = next_employee_code(&user.email, counter, &taken);
        counter = next;
        taken.insert(code.clone());

        let user = User {
            employee_code: Some(code),
            updated_at: Some(clock.now()),
            ..user
        };
        directory.update_user(&user).await?;
        info!(user_id = %user.id, code = ?user.employee_code, "Employee code backfilled");
        assigned += 1;
    }

    Ok(assigned)
}

/// The first free code at or after `counter`, and the counter to use for the
/// next account.
fn next_employee_code(email: &str, mut counter: u32, taken: &HashSet<String>) -> (String, u32) {
    let base = match email.split('@').next() {
        Some(local) if !local.is_empty() => local.to_uppercase(),
        _ => "USER".to_string(),
    };

    let mut code = format!("{}{:04}", base, counter);
    while taken.contains(&code) {
        counter += 1;
        code = format!("{}{:04}", base, counter);
    }
    (code, counter + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use worktrack_core::testing::{at, FixedClock, MemoryDirectory};

    fn clock() -> FixedClock {
        FixedClock::new(at("2025-01-15T09:00:00Z"))
    }

    async fn legacy_user(directory: &MemoryDirectory, email: &str) -> Uuid {
        let user = User {
            id: Uuid::new_v4(),
            email: email.into(),
            employee_code: None,
            profile: UserProfile::default(),
            avatar_path: None,
            created_at: at("2024-06-01T08:00:00Z"),
            updated_at: None,
        };
        directory
            .create_user(&user, "secret1", &BTreeSet::from([GlobalRole::User]))
            .await
            .unwrap();
        user.id
    }

    #[test]
    fn test_next_employee_code_skips_taken() {
        let taken = HashSet::from(["ANA0001".to_string(), "ANA0002".to_string()]);
        assert_eq!(next_employee_code("ana@example.com", 1, &taken), ("ANA0003".into(), 4));
        assert_eq!(next_employee_code("bo@example.com", 1, &taken), ("BO0001".into(), 2));
        assert_eq!(next_employee_code("@example.com", 7, &taken), ("USER0007".into(), 8));
    }

    #[tokio::test]
    async fn test_seed_creates_default_accounts() {
        let directory = MemoryDirectory::new();
        let config = SeedConfig::default();

        let report = seed_accounts(&directory, &config, &clock()).await.unwrap();
        assert_eq!(report.accounts_created.len(), 2);

        let admin = directory
            .find_user_by_email("admin@worktrack.local")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.employee_code.as_deref(), Some("ADMIN001"));
        assert!(directory.roles(admin.id).contains(&GlobalRole::Admin));
        assert!(directory.verify_password(admin.id, &config.admin_password).await.unwrap());

        let management = directory
            .find_user_by_employee_code("MGT001")
            .await
            .unwrap()
            .unwrap();
        assert!(directory.roles(management.id).contains(&GlobalRole::Management));
        assert!(!directory.roles(management.id).contains(&GlobalRole::Admin));
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let directory = MemoryDirectory::new();
        let config = SeedConfig::default();

        seed_accounts(&directory, &config, &clock()).await.unwrap();
        let second = seed_accounts(&directory, &config, &clock()).await.unwrap();

        assert_eq!(second, SeedReport::default());
        assert_eq!(directory.list_users().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_seed_repairs_existing_admin() {
        let directory = MemoryDirectory::new();
        let id = legacy_user(&directory, "admin@worktrack.local").await;

        let report = seed_accounts(&directory, &SeedConfig::default(), &clock())
            .await
            .unwrap();

        assert_eq!(report.roles_granted, 1);
        assert!(directory.roles(id).contains(&GlobalRole::Admin));
        // The backfill runs first, so the legacy admin gets a generated code.
        let admin = directory.find_user(id).await.unwrap().unwrap();
        assert_eq!(admin.employee_code.as_deref(), Some("ADMIN0001"));
    }

    #[tokio::test]
    async fn test_backfill_assigns_unique_codes() {
        let directory = MemoryDirectory::new();
        let first = legacy_user(&directory, "ana@example.com").await;
        let second = legacy_user(&directory, "ana@other.org").await;

        let assigned = backfill_employee_codes(&directory, &clock()).await.unwrap();
        assert_eq!(assigned, 2);

        let a = directory.find_user(first).await.unwrap().unwrap();
        let b = directory.find_user(second).await.unwrap().unwrap();
        let mut codes = vec![a.employee_code.unwrap(), b.employee_code.unwrap()];
        codes.sort();
        assert_eq!(codes, vec!["ANA0001", "ANA0002"]);

        assert_eq!(backfill_employee_codes(&directory, &clock()).await.unwrap(), 0);
    }
}
