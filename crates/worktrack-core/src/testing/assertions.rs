//! Test assertion macros and helpers.

use crate::error::WorktrackError;

/// Assert that a result is Ok.
///
/// # Example
///
/// ```ignore
/// assert_ok!(world.projects.remove_member(&admin, project.id, bob.user_id()).await);
/// ```
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match &$expr {
            Ok(_) => (),
            Err(e) => panic!("assertion failed: expected Ok, got Err({:?})", e),
        }
    };
    ($expr:expr, $($arg:tt)+) => {
        match &$expr {
            Ok(_) => (),
            Err(e) => panic!("assertion failed: {}: expected Ok, got Err({:?})", format_args!($($arg)+), e),
        }
    };
}

/// Assert that a result is Err.
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match &$expr {
            Err(_) => (),
            Ok(v) => panic!("assertion failed: expected Err, got Ok({:?})", v),
        }
    };
    ($expr:expr, $($arg:tt)+) => {
        match &$expr {
            Err(_) => (),
            Ok(v) => panic!("assertion failed: {}: expected Err, got Ok({:?})", format_args!($($arg)+), v),
        }
    };
}

/// Assert that an error matches a specific variant.
///
/// # Example
///
/// ```ignore
/// let result = world.projects.create_project(&member, input).await;
/// assert_err_variant!(result, WorktrackError::Forbidden(_));
/// ```
#[macro_export]
macro_rules! assert_err_variant {
    ($expr:expr, $variant:pat) => {
        match &$expr {
            Err($variant) => (),
            Err(e) => panic!(
                "assertion failed: expected {}, got {:?}",
                stringify!($variant),
                e
            ),
            Ok(v) => panic!(
                "assertion failed: expected Err({}), got Ok({:?})",
                stringify!($variant),
                v
            ),
        }
    };
}

/// Check if an error message contains a substring.
pub fn error_contains(error: &WorktrackError, substring: &str) -> bool {
    error.to_string().contains(substring)
}

/// Check if an error is a validation error attributed to `field`.
pub fn validation_error_for_field(error: &WorktrackError, field: &str) -> bool {
    match error {
        WorktrackError::Validation(msg) => msg.starts_with(&format!("{}:", field)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_ok_macro() {
        let result: Result<i32, String> = Ok(42);
        assert_ok!(result);
    }

    #[test]
    #[should_panic(expected = "expected Ok")]
    fn test_assert_ok_macro_fails() {
        let result: Result<i32, String> = Err("error".to_string());
        assert_ok!(result);
    }

    #[test]
    fn test_assert_err_macro() {
        let result: Result<i32, String> = Err("error".to_string());
        assert_err!(result);
    }

    #[test]
    #[should_panic(expected = "expected Err")]
    fn test_assert_err_macro_fails() {
        let result: Result<i32, String> = Ok(42);
        assert_err!(result);
    }

    #[test]
    fn test_assert_err_variant_macro() {
        let result: Result<(), WorktrackError> = Err(WorktrackError::NotFound("task".into()));
        assert_err_variant!(result, WorktrackError::NotFound(_));
    }

    #[test]
    fn test_error_contains() {
        let error = WorktrackError::Conflict("email taken".to_string());
        assert!(error_contains(&error, "email"));
        assert!(!error_contains(&error, "password"));
    }

    #[test]
    fn test_validation_error_for_field() {
        let error = WorktrackError::invalid("deadline", "is in the past");
        assert!(validation_error_for_field(&error, "deadline"));
        assert!(!validation_error_for_field(&error, "past"));

        let other_error = WorktrackError::Internal("deadline".to_string());
        assert!(!validation_error_for_field(&other_error, "deadline"));
    }
}
