//! Sequential project codes (`PROJ-001`, `PROJ-002`, ...).

use serde::{Deserialize, Serialize};

use crate::error::WorktrackError;

const PREFIX: &str = "PROJ-";

/// Immutable business key of a project.
///
/// Numbers are zero-padded to at least three digits and grow past 999
/// without truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectCode(u32);

impl ProjectCode {
    /// The first code ever handed out.
    pub const FIRST: ProjectCode = ProjectCode(1);

    /// Create a code from its sequence number.
    pub fn new(number: u32) -> Result<Self, WorktrackError> {
        if number == 0 {
            return Err(WorktrackError::invalid(
                "project_code",
                "sequence numbers start at 1",
            ));
        }
        Ok(Self(number))
    }

    /// The sequence number.
    pub fn number(&self) -> u32 {
        self.0
    }

    /// The code following this one. Conflict once the sequence is exhausted.
    pub fn next(&self) -> Result<Self, WorktrackError> {
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or_else(|| WorktrackError::Conflict(format!("no project code after {}", self)))
    }

    /// The next code after the highest existing one, or `PROJ-001`.
    pub fn after(highest: Option<ProjectCode>) -> Result<Self, WorktrackError> {
        match highest {
            Some(code) => code.next(),
            None => Ok(Self::FIRST),
        }
    }
}

impl std::fmt::Display for ProjectCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{:03}", PREFIX, self.0)
    }
}

impl std::str::FromStr for ProjectCode {
    type Err = WorktrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix(PREFIX)
            .ok_or_else(|| WorktrackError::invalid("project_code", format!("'{}' lacks PROJ- prefix", s)))?;

        if digits.len() < 3 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(WorktrackError::invalid(
                "project_code",
                format!("'{}' must end in at least three digits", s),
            ));
        }

        let number = digits
            .parse::<u32>()
            .map_err(|e| WorktrackError::invalid("project_code", e))?;
        Self::new(number)
    }
}

impl TryFrom<String> for ProjectCode {
    type Error = WorktrackError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProjectCode> for String {
    fn from(code: ProjectCode) -> Self {
        code.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pads_to_three_digits() {
        assert_eq!(ProjectCode::FIRST.to_string(), "PROJ-001");
        assert_eq!(ProjectCode::new(42).unwrap().to_string(), "PROJ-042");
        assert_eq!(ProjectCode::new(1234).unwrap().to_string(), "PROJ-1234");
    }

    #[test]
    fn test_parse() {
        let code: ProjectCode = "PROJ-017".parse().unwrap();
        assert_eq!(code.number(), 17);
        assert_eq!("PROJ-1000".parse::<ProjectCode>().unwrap().number(), 1000);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("PROJ-01".parse::<ProjectCode>().is_err());
        assert!("TASK-001".parse::<ProjectCode>().is_err());
        assert!("PROJ-00a".parse::<ProjectCode>().is_err());
        assert!("PROJ-000".parse::<ProjectCode>().is_err());
    }

    #[test]
    fn test_after() {
        assert_eq!(ProjectCode::after(None).unwrap(), ProjectCode::FIRST);
        let highest = ProjectCode::new(9).unwrap();
        assert_eq!(ProjectCode::after(Some(highest)).unwrap().to_string(), "PROJ-010");
    }

    #[test]
    fn test_next_stops_at_end_of_sequence() {
        let last = ProjectCode::new(u32::MAX).unwrap();
        assert!(last.next().unwrap_err().is_conflict());
        assert_eq!(ProjectCode::new(41).unwrap().next().unwrap().number(), 42);
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&ProjectCode::new(3).unwrap()).unwrap();
        assert_eq!(json, "\"PROJ-003\"");
        let back: ProjectCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back.number(), 3);
    }
}
