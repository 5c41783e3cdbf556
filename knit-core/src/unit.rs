use compact_str::CompactString;
use knit_types::{Key, KeyError, SettingsBundle, SettingsBundleBuilder, Value};
use smallvec::SmallVec;

/// One sub-project of a multi-unit build, as declared.
#[derive(Debug, Clone)]
pub struct BuildUnit {
    name: CompactString,
    /// Capabilities this unit explicitly enables.
    enable: SmallVec<[CompactString; 4]>,
    /// Explicitly triggered bundles this unit opts into.
    activate: SmallVec<[CompactString; 2]>,
    /// Automatically triggered bundles this unit opts out of.
    exclude: SmallVec<[CompactString; 2]>,
    /// Other units this unit depends on.
    depends_on: SmallVec<[CompactString; 4]>,
    /// Settings specific to this unit, applied last.
    settings: SettingsBundle,
}

impl BuildUnit {
    /// Returns a new [`BuildUnitBuilder`].
    pub fn builder(name: impl Into<CompactString>) -> BuildUnitBuilder {
        let name = name.into();
        BuildUnitBuilder {
            settings: SettingsBundle::builder(name.clone()),
            name,
            enable: SmallVec::new(),
            activate: SmallVec::new(),
            exclude: SmallVec::new(),
            depends_on: SmallVec::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn enable(&self) -> &[CompactString] {
        &self.enable[..]
    }

    pub fn activate(&self) -> &[CompactString] {
        &self.activate[..]
    }

    pub fn exclude(&self) -> &[CompactString] {
        &self.exclude[..]
    }

    pub fn depends_on(&self) -> &[CompactString] {
        &self.depends_on[..]
    }

    pub fn settings(&self) -> &SettingsBundle {
        &self.settings
    }
}

/// A builder for a [`BuildUnit`].
#[derive(Debug)]
pub struct BuildUnitBuilder {
    name: CompactString,
    enable: SmallVec<[CompactString; 4]>,
    activate: SmallVec<[CompactString; 2]>,
    exclude: SmallVec<[CompactString; 2]>,
    depends_on: SmallVec<[CompactString; 4]>,
    settings: SettingsBundleBuilder,
}

impl BuildUnitBuilder {
    /// Explicitly enable the capability named `capability`.
    pub fn enable(&mut self, capability: &str) -> &mut Self {
        self.enable.push(CompactString::new(capability));
        self
    }

    /// Opt into the explicitly triggered bundle named `bundle`.
    pub fn activate(&mut self, bundle: &str) -> &mut Self {
        self.activate.push(CompactString::new(bundle));
        self
    }

    /// Opt out of the automatically triggered bundle named `bundle`.
    pub fn exclude(&mut self, bundle: &str) -> &mut Self {
        self.exclude.push(CompactString::new(bundle));
        self
    }

    pub fn depends_on(&mut self, unit: &str) -> &mut Self {
        self.depends_on.push(CompactString::new(unit));
        self
    }

    pub fn set(&mut self, key: Key, value: impl Into<Value>) -> &mut Self {
        self.settings.set(key, value);
        self
    }

    /// # Errors
    ///
    /// * If `key` is not a valid [`Key`].
    pub fn try_set(&mut self, key: &str, value: impl Into<Value>) -> Result<&mut Self, KeyError> {
        self.settings.try_set(key, value)?;
        Ok(self)
    }

    /// Consumes this [`BuildUnitBuilder`] constructing a [`BuildUnit`].
    pub fn build(self) -> BuildUnit {
        BuildUnit {
            name: self.name,
            enable: self.enable,
            activate: self.activate,
            exclude: self.exclude,
            depends_on: self.depends_on,
            settings: self.settings.build(),
        }
    }
}
