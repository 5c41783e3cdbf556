//! The final configuration of a build unit.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;

use compact_str::CompactString;
use knit_types::{Key, SettingsBundle, Value};

/// Where the value of a setting came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// A bundle applied to every unit.
    Global(CompactString),
    /// A bundle applied because of the unit's capabilities, or because the unit activated it.
    Conditional(CompactString),
    /// The unit's own settings.
    Unit(CompactString),
}

impl Origin {
    pub fn name(&self) -> &str {
        match self {
            Origin::Global(name) | Origin::Conditional(name) | Origin::Unit(name) => name.as_str(),
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Global(name) => write!(f, "global bundle '{name}'"),
            Origin::Conditional(name) => write!(f, "conditional bundle '{name}'"),
            Origin::Unit(name) => write!(f, "unit '{name}'"),
        }
    }
}

/// The value of a single key in a [`ResolvedConfig`], along with its history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    value: Value,
    origin: Origin,
    /// Earlier assignments that were overridden, oldest first.
    overridden: Vec<(Origin, Value)>,
}

impl ResolvedEntry {
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The bundle that made the winning assignment.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Every earlier assignment that lost, oldest first.
    pub fn overridden(&self) -> &[(Origin, Value)] {
        &self.overridden[..]
    }
}

/// The final, merged configuration of a single build unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    unit: CompactString,
    /// Names of every capability enabled for the unit, explicitly or transitively.
    enabled: Vec<CompactString>,
    /// Every bundle that was merged, in merge order.
    applied: Vec<Origin>,
    entries: BTreeMap<Key, ResolvedEntry>,
}

impl ResolvedConfig {
    pub(crate) fn new(unit: CompactString, enabled: Vec<CompactString>) -> Self {
        ResolvedConfig {
            unit,
            enabled,
            applied: Vec::new(),
            entries: BTreeMap::new(),
        }
    }

    /// Merge `bundle` into this config, later assignments win.
    pub(crate) fn apply(&mut self, origin: Origin, bundle: &SettingsBundle, log_overrides: bool) {
        tracing::debug!(unit = %self.unit, bundle = %origin, "applying settings");

        for setting in bundle.iter() {
            match self.entries.entry(setting.key.clone()) {
                Entry::Vacant(vacant) => {
                    vacant.insert(ResolvedEntry {
                        value: setting.value.clone(),
                        origin: origin.clone(),
                        overridden: Vec::new(),
                    });
                }
                Entry::Occupied(mut occupied) => {
                    let entry = occupied.get_mut();
                    if log_overrides {
                        tracing::info!(
                            unit = %self.unit,
                            key = %setting.key,
                            from = %entry.value,
                            to = %setting.value,
                            previous = %entry.origin,
                            "{origin} overrides setting",
                        );
                    }
                    let prev_value = std::mem::replace(&mut entry.value, setting.value.clone());
                    let prev_origin = std::mem::replace(&mut entry.origin, origin.clone());
                    entry.overridden.push((prev_origin, prev_value));
                }
            }
        }

        self.applied.push(origin);
    }

    /// Name of the unit this config belongs to.
    pub fn unit(&self) -> &str {
        self.unit.as_str()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    pub fn entry(&self, key: &str) -> Option<&ResolvedEntry> {
        self.entries.get(key)
    }

    /// Returns every setting, ordered by key.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.entries.iter().map(|(key, entry)| (key, &entry.value))
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Key, &ResolvedEntry)> {
        self.entries.iter()
    }

    /// Every bundle that got merged into this config, in merge order.
    pub fn applied(&self) -> &[Origin] {
        &self.applied[..]
    }

    pub fn enabled_capabilities(&self) -> impl Iterator<Item = &str> {
        self.enabled.iter().map(|name| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns just the `key => value` mapping, dropping provenance.
    pub fn to_map(&self) -> BTreeMap<Key, Value> {
        self.iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(name: &str, settings: &[(&str, &str)]) -> SettingsBundle {
        let mut builder = SettingsBundle::builder(name);
        for (key, value) in settings {
            builder.try_set(key, *value).unwrap();
        }
        builder.build()
    }

    #[test]
    fn smoketest_apply() {
        let mut config = ResolvedConfig::new("core".into(), Vec::new());
        config.apply(
            Origin::Global("common".into()),
            &bundle("common", &[("organization", "com.example"), ("version", "1.0")]),
            false,
        );
        config.apply(
            Origin::Unit("core".into()),
            &bundle("core", &[("version", "2.0")]),
            true,
        );

        assert_eq!(config.len(), 2);
        assert_eq!(config.get("version"), Some(&Value::from("2.0")));

        let entry = config.entry("version").unwrap();
        assert_eq!(entry.origin(), &Origin::Unit("core".into()));
        assert_eq!(
            entry.overridden(),
            &[(Origin::Global("common".into()), Value::from("1.0"))]
        );

        let entry = config.entry("organization").unwrap();
        assert!(entry.overridden().is_empty());
        assert_eq!(
            config.applied(),
            &[Origin::Global("common".into()), Origin::Unit("core".into())]
        );
    }

    #[test]
    fn origin_display() {
        assert_eq!(
            Origin::Conditional("docker".into()).to_string(),
            "conditional bundle 'docker'"
        );
        assert_eq!(Origin::Unit("core".into()).name(), "core");
    }
}
