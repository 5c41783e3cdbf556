use std::fmt;

use compact_str::CompactString;
use serde::Deserialize;
use smallvec::SmallVec;

use crate::{Key, KeyError, Value};

/// A single `key = value` assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    pub key: Key,
    pub value: Value,
}

/// A named, ordered, and immutable sequence of [`Setting`]s.
///
/// A key may appear more than once, in which case the last assignment wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsBundle {
    name: CompactString,
    settings: SmallVec<[Setting; 4]>,
}

impl SettingsBundle {
    /// Returns a new [`SettingsBundleBuilder`].
    pub fn builder(name: impl Into<CompactString>) -> SettingsBundleBuilder {
        SettingsBundleBuilder {
            name: name.into(),
            settings: SmallVec::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns all of the assignments in this bundle, in the order they were made.
    pub fn iter(&self) -> impl Iterator<Item = &Setting> {
        self.settings.iter()
    }

    /// Returns the effective value of `key` within this bundle, i.e. the last assignment.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.settings
            .iter()
            .rev()
            .find(|setting| setting.key.as_str() == key)
            .map(|setting| &setting.value)
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }
}

impl fmt::Display for SettingsBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        for setting in &self.settings {
            writeln!(f, "\t{} = {}", setting.key, setting.value)?;
        }
        Ok(())
    }
}

/// A builder for a [`SettingsBundle`].
#[derive(Debug)]
pub struct SettingsBundleBuilder {
    name: CompactString,
    settings: SmallVec<[Setting; 4]>,
}

impl SettingsBundleBuilder {
    /// Append an assignment of `key` to `value`.
    pub fn set(&mut self, key: Key, value: impl Into<Value>) -> &mut Self {
        self.settings.push(Setting {
            key,
            value: value.into(),
        });
        self
    }

    /// Append an assignment, validating `key` first.
    ///
    /// # Errors
    ///
    /// * If `key` is not a valid [`Key`].
    pub fn try_set(&mut self, key: &str, value: impl Into<Value>) -> Result<&mut Self, KeyError> {
        let key = Key::new(key)?;
        Ok(self.set(key, value))
    }

    /// Consumes this [`SettingsBundleBuilder`] constructing a [`SettingsBundle`].
    pub fn build(self) -> SettingsBundle {
        SettingsBundle {
            name: self.name,
            settings: self.settings,
        }
    }
}

/// When a conditional [`SettingsBundle`] gets applied to a build unit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    /// Applied to every unit that has all of the required capabilities enabled.
    #[default]
    Auto,
    /// Only applied to units that activate the bundle by name.
    Explicit,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Auto => write!(f, "auto"),
            Trigger::Explicit => write!(f, "explicit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoketest_builder() {
        let mut builder = SettingsBundle::builder("common");
        builder
            .try_set("organization", "com.example")
            .unwrap()
            .try_set("version", "0.1.0-SNAPSHOT")
            .unwrap();
        let bundle = builder.build();

        assert_eq!(bundle.name(), "common");
        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle.get("organization"), Some(&Value::from("com.example")));
        assert_eq!(bundle.get("missing"), None);
    }

    #[test]
    fn duplicate_key_last_write_wins() {
        let mut builder = SettingsBundle::builder("dupes");
        builder
            .try_set("version", "1.0")
            .unwrap()
            .try_set("version", "2.0")
            .unwrap();
        let bundle = builder.build();

        // Both assignments are kept, the last one is what counts.
        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle.get("version"), Some(&Value::from("2.0")));
    }

    #[test]
    fn invalid_key_rejected() {
        let mut builder = SettingsBundle::builder("bad");
        assert!(builder.try_set("not valid", true).is_err());
        assert!(builder.build().is_empty());
    }

    #[test]
    fn trigger_deserialize() {
        #[derive(Deserialize)]
        struct Doc {
            #[serde(default)]
            a: Trigger,
            b: Trigger,
        }
        let doc: Doc = toml::from_str(r#"b = "explicit""#).unwrap();
        assert_eq!(doc.a, Trigger::Auto);
        assert_eq!(doc.b, Trigger::Explicit);
    }
}
