use serde::{Deserialize, Serialize};

/// Default accounts created by `worktrack seed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    #[serde(default = "default_admin_email")]
    pub admin_email: String,

    #[serde(default = "default_password")]
    pub admin_password: String,

    #[serde(default = "default_management_email")]
    pub management_email: String,

    #[serde(default = "default_password")]
    pub management_password: String,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            admin_email: default_admin_email(),
            admin_password: default_password(),
            management_email: default_management_email(),
            management_password: default_password(),
        }
    }
}

impl SeedConfig {
    /// Whether either account would be created with the built-in password.
    pub fn uses_default_password(&self) -> bool {
        self.admin_password == default_password() || self.management_password == default_password()
    }
}

fn default_admin_email() -> String {
    "admin@worktrack.local".to_string()
}

fn default_management_email() -> String {
    "management@worktrack.local".to_string()
}

fn default_password() -> String {
    "ChangeMe!123".to_string()
}
