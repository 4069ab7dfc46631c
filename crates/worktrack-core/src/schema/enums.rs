//! Closed enum types stored as snake_case text columns.

use serde::{Deserialize, Serialize};

use crate::error::WorktrackError;

/// Declares a closed enum with a stable snake_case SQL representation,
/// `Display` and `FromStr` (parse failures are validation errors).
macro_rules! sql_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($field:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $sql:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The value stored in the database.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $sql ),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = WorktrackError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $sql => Ok($name::$variant), )+
                    other => Err(WorktrackError::invalid(
                        $field,
                        format!("unknown value '{}'", other),
                    )),
                }
            }
        }
    };
}

sql_enum! {
    /// Global account role. Only `Admin` carries policy weight.
    GlobalRole ("role") {
        Admin => "admin",
        Management => "management",
        User => "user",
    }
}

sql_enum! {
    /// Role of a user inside one project.
    ProjectRole ("role") {
        Manager => "manager",
        Member => "member",
    }
}

sql_enum! {
    /// Task status.
    TaskStatus ("status") {
        NotStarted => "not_started",
        InProgress => "in_progress",
        Completed => "completed",
        Paused => "paused",
    }
}

sql_enum! {
    /// Task priority.
    TaskPriority ("priority") {
        High => "high",
        Medium => "medium",
        Low => "low",
    }
}

sql_enum! {
    /// Notification severity.
    NotificationKind ("type") {
        Info => "info",
        Warning => "warning",
        Success => "success",
        Danger => "danger",
    }
}

sql_enum! {
    /// Kind of calendar entry.
    ScheduleType ("schedule_type") {
        Work => "work",
        Meeting => "meeting",
        Holiday => "holiday",
        Other => "other",
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::NotStarted
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        Self::Medium
    }
}

impl Default for ProjectRole {
    fn default() -> Self {
        Self::Member
    }
}

impl Default for NotificationKind {
    fn default() -> Self {
        Self::Info
    }
}

impl Default for ScheduleType {
    fn default() -> Self {
        Self::Work
    }
}
