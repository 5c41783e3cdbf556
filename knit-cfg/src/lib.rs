//! Configuration flags for `knit` itself.
//!
//! The types in this crate should _not_ be used for the settings of build units, those are
//! described by a workspace file. A [`ConfigSet`] is assembled and overridden once at startup
//! and is read-only afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use compact_str::CompactString;
use knit_ore::assert_none;

/// A single configuration setting.
pub struct Config<V: ConfigDefault> {
    name: &'static str,
    desc: &'static str,
    default: V,
}

impl<V: ConfigDefault> Config<V> {
    /// Define a new [`Config`] with a default value.
    pub const fn new(name: &'static str, desc: &'static str, default: V) -> Self {
        Config {
            name,
            desc,
            default,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Read the value of this [`Config`] from the provided [`ConfigSet`].
    ///
    /// # Panics
    /// * If this [`Config`] was never registered with the [`ConfigSetBuilder`].
    pub fn read(&self, set: &ConfigSet) -> V::StoredValue {
        let Some(entry) = set.configs.get(self.name) else {
            panic!("tried to read unregistered config {}", self.name);
        };
        V::from_dyn(&entry.value)
    }
}

/// A thread-safe shareable set of [`Config`]s.
#[derive(Clone, Debug)]
pub struct ConfigSet {
    configs: Arc<BTreeMap<CompactString, ConfigSetEntry>>,
}

impl ConfigSet {
    /// Returns a new [`ConfigSetBuilder`].
    pub fn builder() -> ConfigSetBuilder {
        ConfigSetBuilder::default()
    }

    /// Returns every entry in this set, ordered by name.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ConfigSetEntry)> {
        self.configs
            .iter()
            .map(|(name, entry)| (name.as_str(), entry))
    }
}

impl fmt::Display for ConfigSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, entry) in &*self.configs {
            writeln!(f, "{} => {}\n\t└─ '{}'", name, entry.value, entry.desc)?;
        }
        Ok(())
    }
}

/// Single entry within a [`ConfigSet`].
#[derive(Clone, Debug)]
pub struct ConfigSetEntry {
    value: DynConfigValue,
    desc: &'static str,
    overridden: bool,
}

impl ConfigSetEntry {
    pub fn value(&self) -> &DynConfigValue {
        &self.value
    }

    pub fn desc(&self) -> &'static str {
        self.desc
    }

    /// Whether the value was changed from the default of the [`Config`].
    pub fn is_overridden(&self) -> bool {
        self.overridden
    }
}

/// A builder for a [`ConfigSet`].
#[derive(Default, Debug)]
pub struct ConfigSetBuilder {
    configs: BTreeMap<CompactString, ConfigSetEntry>,
}

impl ConfigSetBuilder {
    /// Register a [`Config`] into this [`ConfigSetBuilder`] with the default value.
    ///
    /// # Panics
    /// * If a [`Config`] with the same name was already registered.
    pub fn register<V: ConfigDefault>(&mut self, config: &'static Config<V>) -> &mut Self {
        let entry = ConfigSetEntry {
            value: config.default.into_stored().into_dyn(),
            desc: config.desc,
            overridden: false,
        };
        let prev = self
            .configs
            .insert(CompactString::const_new(config.name), entry);
        assert_none!(prev, "config '{}' registered more than once", config.name);
        self
    }

    /// Override the value of a [`Config`] in the set that is being built.
    ///
    /// # Panics
    /// * If [`Config`] was not previously registered with this [`ConfigSetBuilder`].
    pub fn set<V: ConfigDefault>(&mut self, config: &'static Config<V>, value: V) -> &mut Self {
        let entry = self
            .configs
            .get_mut(config.name)
            .expect("tried to set unregistered config");
        entry.value = value.into_stored().into_dyn();
        entry.overridden = true;
        self
    }

    /// Override the [`Config`] with `name` by parsing `value`.
    ///
    /// # Errors
    ///
    /// * If no config named `name` exists in this set.
    /// * If the config specified by `name` cannot parse `value`.
    ///
    pub fn try_set(&mut self, name: &str, value: &str) -> Result<&mut Self, anyhow::Error> {
        let entry = self
            .configs
            .get_mut(name)
            .ok_or_else(|| anyhow::anyhow!("no Config named '{name}' found"))?;
        let type_name = entry.value.type_name();
        entry.value = entry.value.parse_same(value).map_err(|err| {
            anyhow::anyhow!("invalid value '{value}' for config '{name}' ({type_name}): {err}")
        })?;
        entry.overridden = true;
        Ok(self)
    }

    /// Override a [`Config`] from a single `name=value` pair, e.g. as passed on the command line.
    ///
    /// # Errors
    ///
    /// * If `pair` does not contain a `=`.
    /// * Any error returned by [`ConfigSetBuilder::try_set`].
    pub fn try_set_pair(&mut self, pair: &str) -> Result<&mut Self, anyhow::Error> {
        let Some((name, value)) = pair.split_once('=') else {
            anyhow::bail!("expected 'name=value', found '{pair}'");
        };
        self.try_set(name.trim(), value.trim())
    }

    /// Consumes this [`ConfigSetBuilder`] construting a [`ConfigSet`].
    pub fn build(self) -> ConfigSet {
        ConfigSet {
            configs: Arc::new(self.configs),
        }
    }
}

/// Types that can be provided as a default to a [`Config`].
pub trait ConfigDefault {
    /// The type that actually gets stored in a [`ConfigSet`].
    type StoredValue: ConfigValue;

    fn into_stored(&self) -> Self::StoredValue;
    fn from_dyn(val: &DynConfigValue) -> Self::StoredValue;
}

impl ConfigDefault for bool {
    type StoredValue = bool;

    fn into_stored(&self) -> Self::StoredValue {
        *self
    }

    fn from_dyn(val: &DynConfigValue) -> Self::StoredValue {
        let DynConfigValue::Bool(val) = val else {
            panic!("programming error, found {val:?} for bool")
        };
        *val
    }
}

impl ConfigDefault for i64 {
    type StoredValue = i64;

    fn into_stored(&self) -> Self::StoredValue {
        *self
    }

    fn from_dyn(val: &DynConfigValue) -> Self::StoredValue {
        let DynConfigValue::I64(val) = val else {
            panic!("programming error, found {val:?} for i64")
        };
        *val
    }
}

impl ConfigDefault for u64 {
    type StoredValue = u64;

    fn into_stored(&self) -> Self::StoredValue {
        *self
    }

    fn from_dyn(val: &DynConfigValue) -> Self::StoredValue {
        let DynConfigValue::U64(val) = val else {
            panic!("programming error, found {val:?} for u64")
        };
        *val
    }
}

impl ConfigDefault for &str {
    type StoredValue = CompactString;

    fn into_stored(&self) -> Self::StoredValue {
        CompactString::new(self)
    }

    fn from_dyn(val: &DynConfigValue) -> Self::StoredValue {
        let DynConfigValue::String(val) = val else {
            panic!("programming error, found {val:?} for string")
        };
        val.clone()
    }
}

pub trait ConfigValue {
    fn into_dyn(self) -> DynConfigValue;
}

impl ConfigValue for bool {
    fn into_dyn(self) -> DynConfigValue {
        DynConfigValue::Bool(self)
    }
}

impl ConfigValue for i64 {
    fn into_dyn(self) -> DynConfigValue {
        DynConfigValue::I64(self)
    }
}

impl ConfigValue for u64 {
    fn into_dyn(self) -> DynConfigValue {
        DynConfigValue::U64(self)
    }
}

impl ConfigValue for CompactString {
    fn into_dyn(self) -> DynConfigValue {
        DynConfigValue::String(self)
    }
}

/// "Type erased" configuration values.
///
/// We prefer an enum as opposed to something like `Box<dyn Value>` because enums offer better
/// performance and are easier to reason about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DynConfigValue {
    Bool(bool),
    I64(i64),
    U64(u64),
    String(CompactString),
}

impl DynConfigValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            DynConfigValue::Bool(_) => "bool",
            DynConfigValue::I64(_) => "i64",
            DynConfigValue::U64(_) => "u64",
            DynConfigValue::String(_) => "string",
        }
    }

    /// Parse `value` into a [`DynConfigValue`] of the same type as `self`.
    pub fn parse_same(&self, value: &str) -> Result<DynConfigValue, anyhow::Error> {
        let parsed = match self {
            DynConfigValue::Bool(_) => DynConfigValue::Bool(value.parse()?),
            DynConfigValue::I64(_) => DynConfigValue::I64(value.parse()?),
            DynConfigValue::U64(_) => DynConfigValue::U64(value.parse()?),
            DynConfigValue::String(_) => DynConfigValue::String(CompactString::new(value)),
        };
        Ok(parsed)
    }
}

impl fmt::Display for DynConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynConfigValue::Bool(val) => write!(f, "{val}"),
            DynConfigValue::I64(val) => write!(f, "{val}"),
            DynConfigValue::U64(val) => write!(f, "{val}"),
            DynConfigValue::String(val) => write!(f, "{val}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    pub static TEST_CONFIG_A: Config<bool> =
        Config::new("test_config_a", "A test configuration value.", true);
    pub static TEST_CONFIG_B: Config<&'static str> =
        Config::new("test_config_b", "A test configuration value.", "foobar");
    pub static TEST_CONFIG_C: Config<u64> =
        Config::new("test_config_c", "A test configuration value.", 64);

    fn test_builder() -> ConfigSetBuilder {
        let mut builder = ConfigSet::builder();
        builder
            .register(&TEST_CONFIG_A)
            .register(&TEST_CONFIG_B)
            .register(&TEST_CONFIG_C);
        builder
    }

    #[test]
    fn smoketest_read() {
        let config_set = test_builder().build();

        assert_eq!(TEST_CONFIG_A.read(&config_set), true);
        assert_eq!(TEST_CONFIG_B.read(&config_set), "foobar");
        assert_eq!(TEST_CONFIG_C.read(&config_set), 64);
        assert!(config_set.entries().all(|(_, entry)| !entry.is_overridden()));
    }

    #[test]
    fn smoketest_set() {
        let mut builder = test_builder();
        builder
            .set(&TEST_CONFIG_A, false)
            .set(&TEST_CONFIG_B, "hello world!");
        let config_set = builder.build();
        let config_set_2 = config_set.clone();

        assert_eq!(TEST_CONFIG_A.read(&config_set), false);
        assert_eq!(TEST_CONFIG_B.read(&config_set), "hello world!");
        assert_eq!(
            TEST_CONFIG_B.read(&config_set),
            TEST_CONFIG_B.read(&config_set_2)
        );
    }

    #[test]
    fn smoketest_parse() {
        let mut builder = test_builder();
        builder.try_set("test_config_a", "false").unwrap();
        builder.try_set_pair("test_config_b = anotha one").unwrap();
        builder.try_set_pair("test_config_c=8").unwrap();
        let config_set = builder.build();

        assert_eq!(TEST_CONFIG_A.read(&config_set), false);
        assert_eq!(TEST_CONFIG_B.read(&config_set), "anotha one");
        assert_eq!(TEST_CONFIG_C.read(&config_set), 8);

        let (_, entry) = config_set
            .entries()
            .find(|(name, _)| *name == "test_config_c")
            .unwrap();
        assert!(entry.is_overridden());
    }

    #[test]
    fn parse_errors() {
        let mut builder = test_builder();
        assert!(builder.try_set("test_config_a", "maybe").is_err());
        assert!(builder.try_set("test_config_c", "-1").is_err());
        assert!(builder.try_set("does_not_exist", "1").is_err());
        assert!(builder.try_set_pair("no_equals_sign").is_err());

        // Failed updates leave the defaults in place.
        let config_set = builder.build();
        assert_eq!(TEST_CONFIG_A.read(&config_set), true);
        assert_eq!(TEST_CONFIG_C.read(&config_set), 64);
    }

    #[test]
    #[should_panic(expected = "registered more than once")]
    fn double_register_panics() {
        let mut builder = test_builder();
        builder.register(&TEST_CONFIG_A);
    }
}
