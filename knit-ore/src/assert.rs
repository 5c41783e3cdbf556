//! Utilities for `assert!`s.

/// Asserts that the provided expression, that returns an `Option`, is `None`.
///
/// Used for registrations that must only ever happen once, e.g. adding the same tool config to
/// a set twice is a programming error and not a user error.
#[macro_export]
macro_rules! assert_none {
    ($val:expr, $($msg:tt)+) => {{
        if let Some(y) = &$val {
            panic!("assertion failed: expected None found Some({y:?}), {}", format!($($msg)+));
        }
    }};
    ($val:expr) => {{
        if let Some(y) = &$val {
            panic!("assertion failed: expected None found Some({y:?})");
        }
    }}
}

#[cfg(test)]
mod tests {
    #[test]
    fn none_passes() {
        let val: Option<u32> = None;
        assert_none!(val, "value {} should be empty", 1);
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn some_panics_with_message() {
        let val = Some("docker");
        assert_none!(val, "registered {}", "twice");
    }
}
