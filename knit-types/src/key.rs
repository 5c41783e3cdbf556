use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use compact_str::CompactString;
use serde::{Deserialize, Deserializer};

/// Separator between the segments of a namespaced [`Key`].
pub const KEY_SEPARATOR: char = '/';

/// The name of a setting, e.g. `organization` or `docker/daemonUser`.
///
/// A key is made up of one or more segments separated by [`KEY_SEPARATOR`]. Every segment must
/// be non-empty and only contain ASCII alphanumerics, `_`, `-`, or `.`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(CompactString);

impl Key {
    /// Validate and create a new [`Key`].
    ///
    /// # Errors
    ///
    /// * If the key is empty.
    /// * If any segment of the key is empty, e.g. `docker//user`.
    /// * If the key contains a character outside of the allowed set.
    pub fn new(raw: impl AsRef<str>) -> Result<Key, KeyError> {
        let raw = raw.as_ref();
        if raw.is_empty() {
            return Err(KeyError::Empty);
        }

        for segment in raw.split(KEY_SEPARATOR) {
            if segment.is_empty() {
                return Err(KeyError::EmptySegment {
                    key: CompactString::new(raw),
                });
            }
            if let Some(invalid) = segment.chars().find(|c| !is_key_char(*c)) {
                return Err(KeyError::InvalidChar {
                    key: CompactString::new(raw),
                    invalid,
                });
            }
        }

        Ok(Key(CompactString::new(raw)))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the segments of this key, outermost namespace first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(KEY_SEPARATOR)
    }

    /// Returns the namespace of this key, if it has one.
    ///
    /// `docker/daemonUser` has the namespace `docker`, `organization` has none.
    pub fn namespace(&self) -> Option<&str> {
        self.0.rsplit_once(KEY_SEPARATOR).map(|(namespace, _)| namespace)
    }

    /// Returns the final segment of this key.
    pub fn name(&self) -> &str {
        match self.0.rsplit_once(KEY_SEPARATOR) {
            Some((_, name)) => name,
            None => self.0.as_str(),
        }
    }
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Key {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Key::new(s)
    }
}

impl Borrow<str> for Key {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = CompactString::deserialize(deserializer)?;
        Key::new(raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("setting keys cannot be empty")]
    Empty,
    #[error("setting key '{key}' contains an empty segment")]
    EmptySegment { key: CompactString },
    #[error("setting key '{key}' contains invalid character {invalid:?}")]
    InvalidChar { key: CompactString, invalid: char },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoketest_valid_keys() {
        let key = Key::new("organization").unwrap();
        assert_eq!(key.name(), "organization");
        assert_eq!(key.namespace(), None);

        let key = Key::new("docker/daemonUser").unwrap();
        assert_eq!(key.name(), "daemonUser");
        assert_eq!(key.namespace(), Some("docker"));
        assert_eq!(key.segments().collect::<Vec<_>>(), ["docker", "daemonUser"]);

        let key: Key = "a/b.c/scala-version_2".parse().unwrap();
        assert_eq!(key.namespace(), Some("a/b.c"));
        assert_eq!(key.to_string(), "a/b.c/scala-version_2");
    }

    #[test]
    fn smoketest_invalid_keys() {
        assert_eq!(Key::new(""), Err(KeyError::Empty));
        assert!(matches!(
            Key::new("docker//user"),
            Err(KeyError::EmptySegment { .. })
        ));
        assert!(matches!(
            Key::new("/leading"),
            Err(KeyError::EmptySegment { .. })
        ));
        assert_eq!(
            Key::new("has space"),
            Err(KeyError::InvalidChar {
                key: "has space".into(),
                invalid: ' ',
            })
        );
    }

    #[test]
    fn lookup_by_str() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(Key::new("version").unwrap(), 1);
        assert_eq!(map.get("version"), Some(&1));
    }
}
