//! The workspace file format.
//!
//! ```toml
//! [[global]]
//! name = "common"
//! settings = { organization = "com.example", version = "0.1.0-SNAPSHOT" }
//!
//! [capabilities]
//! JavaAppPackaging = {}
//! Docker = { requires = ["JavaAppPackaging"] }
//!
//! [[conditional]]
//! name = "docker-defaults"
//! requires = ["Docker"]
//! settings = { "docker/daemonUser" = "test" }
//!
//! [units.core]
//!
//! [units.fooService]
//! enable = ["Docker"]
//! depends_on = ["core"]
//! ```

use std::collections::BTreeMap;

use compact_str::{CompactString, format_compact};
use knit_types::{Key, SettingsBundle, Trigger, Value};
use serde::Deserialize;

use crate::{BuildUnit, RegistryBuilder};

/// Definition of a [`Workspace`], parsed from a `WORKSPACE_FILENAME`.
///
/// [`Workspace`]: crate::Workspace
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceSpec {
    /// Bundles applied to every unit, in order.
    #[serde(default)]
    pub global: Vec<BundleSpec>,
    /// Every capability a unit may enable.
    #[serde(default)]
    pub capabilities: BTreeMap<CompactString, CapabilitySpec>,
    /// Bundles applied based on capabilities, in order.
    #[serde(default)]
    pub conditional: Vec<ConditionalSpec>,
    /// Every unit in the workspace.
    #[serde(default)]
    pub units: BTreeMap<CompactString, UnitSpec>,
}

impl WorkspaceSpec {
    pub fn from_toml(raw: &str) -> Result<Self, anyhow::Error> {
        let workspace = toml::from_str(raw)?;
        Ok(workspace)
    }

    /// Convert this spec into a [`RegistryBuilder`], validation happens when that gets built.
    pub fn into_builder(self) -> RegistryBuilder {
        let mut builder = RegistryBuilder::new();

        for (idx, spec) in self.global.into_iter().enumerate() {
            let name = spec.name.unwrap_or_else(|| format_compact!("global.{idx}"));
            builder.register(to_bundle(name, spec.settings));
        }
        for (name, spec) in self.capabilities {
            builder.declare_capability(&name, &spec.requires);
        }
        for spec in self.conditional {
            let bundle = to_bundle(spec.name, spec.settings);
            builder.register_conditional(bundle, &spec.requires, spec.trigger);
        }
        for (name, spec) in self.units {
            let mut unit = BuildUnit::builder(name);
            for capability in &spec.enable {
                unit.enable(capability);
            }
            for bundle in &spec.activate {
                unit.activate(bundle);
            }
            for bundle in &spec.exclude {
                unit.exclude(bundle);
            }
            for dependency in &spec.depends_on {
                unit.depends_on(dependency);
            }
            for (key, value) in spec.settings {
                unit.set(key, value);
            }
            builder.declare_unit(unit.build());
        }

        builder
    }
}

fn to_bundle(name: CompactString, settings: BTreeMap<Key, Value>) -> SettingsBundle {
    let mut bundle = SettingsBundle::builder(name);
    for (key, value) in settings {
        bundle.set(key, value);
    }
    bundle.build()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundleSpec {
    /// Defaults to `global.<index>`.
    pub name: Option<CompactString>,
    #[serde(default)]
    pub settings: BTreeMap<Key, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CapabilitySpec {
    #[serde(default)]
    pub requires: Vec<CompactString>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionalSpec {
    pub name: CompactString,
    #[serde(default)]
    pub requires: Vec<CompactString>,
    #[serde(default)]
    pub trigger: Trigger,
    #[serde(default)]
    pub settings: BTreeMap<Key, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitSpec {
    #[serde(default)]
    pub enable: Vec<CompactString>,
    #[serde(default)]
    pub activate: Vec<CompactString>,
    #[serde(default)]
    pub exclude: Vec<CompactString>,
    #[serde(default)]
    pub depends_on: Vec<CompactString>,
    #[serde(default)]
    pub settings: BTreeMap<Key, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoketest_parse() {
        let spec = WorkspaceSpec::from_toml(
            r#"
            [[global]]
            settings = { organization = "com.example" }

            [capabilities]
            JavaAppPackaging = {}
            Docker = { requires = ["JavaAppPackaging"] }

            [[conditional]]
            name = "docker-defaults"
            requires = ["Docker"]
            trigger = "explicit"
            settings = { "docker/daemonUser" = "test" }

            [units.core]

            [units.fooService]
            enable = ["Docker"]
            depends_on = ["core"]
            settings = { name = "foo-service", replicas = 3 }
            "#,
        )
        .unwrap();

        assert_eq!(spec.global.len(), 1);
        assert_eq!(spec.global[0].name, None);
        assert_eq!(spec.capabilities["Docker"].requires, ["JavaAppPackaging"]);
        assert_eq!(spec.conditional[0].trigger, Trigger::Explicit);

        let foo = &spec.units["fooService"];
        assert_eq!(foo.enable, ["Docker"]);
        assert_eq!(
            foo.settings.get("replicas"),
            Some(&Value::Integer(3))
        );
        assert!(spec.units["core"].settings.is_empty());
    }

    #[test]
    fn rejects_malformed_keys() {
        let err = WorkspaceSpec::from_toml(
            r#"
            [[global]]
            settings = { "not a key" = 1 }
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid character"), "{err}");
    }

    #[test]
    fn rejects_unknown_fields() {
        let result = WorkspaceSpec::from_toml(
            r#"
            [units.core]
            enabel = ["Docker"]
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn empty_file() {
        let spec = WorkspaceSpec::from_toml("").unwrap();
        assert!(spec.units.is_empty());
        let workspace = spec.into_builder().build().unwrap();
        assert_eq!(workspace.units().count(), 0);
    }
}
