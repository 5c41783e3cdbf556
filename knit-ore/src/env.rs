//! Utilities for reading environment variables.

use std::ffi::OsStr;

/// Values of an environment variable that we consider "off".
static FALSEY: &[&str] = &["0", "", "no", "false", "off"];

/// Returns true if the environment variable is set, and is _not_ one of the following:
/// `'0', '', 'no', 'false', 'off'`.
pub fn is_truthy<K: AsRef<OsStr>>(var: K) -> bool {
    match std::env::var_os(var) {
        None => false,
        Some(value) => value_is_truthy(value),
    }
}

fn value_is_truthy<V: AsRef<OsStr>>(value: V) -> bool {
    let mut value = value.as_ref().to_os_string();
    value.make_ascii_lowercase();
    !FALSEY.iter().any(|falsey| value == *falsey)
}
