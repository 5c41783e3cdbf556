//! Registration of bundles, capabilities, and units, and the validated [`Workspace`].

use std::collections::{BTreeMap, BTreeSet};

use compact_str::CompactString;
use derivative::Derivative;
use knit_cfg::ConfigSet;
use knit_graph::{CapabilityGraph, CapabilityGraphBuilder, CapabilitySet, topo};
use knit_types::{SettingsBundle, Trigger};
use smallvec::SmallVec;

use crate::cfgs::{self, LOG_OVERRIDES, MAX_CAPABILITY_DEPTH};
use crate::resolve::{Origin, ResolvedConfig};
use crate::{BuildUnit, LoadError, ResolveError};

/// Collects every declaration of a workspace, validation happens in [`RegistryBuilder::build`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    capabilities: Vec<(CompactString, SmallVec<[CompactString; 4]>)>,
    global: Vec<SettingsBundle>,
    conditional: Vec<PendingConditional>,
    units: Vec<BuildUnit>,
}

#[derive(Debug)]
struct PendingConditional {
    bundle: SettingsBundle,
    required: SmallVec<[CompactString; 4]>,
    trigger: Trigger,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        RegistryBuilder::default()
    }

    /// Declare a capability that requires all of the capabilities in `requires`.
    pub fn declare_capability<I, S>(&mut self, name: &str, requires: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let requires = requires
            .into_iter()
            .map(|req| CompactString::new(req.as_ref()))
            .collect();
        self.capabilities.push((CompactString::new(name), requires));
        self
    }

    /// Register a bundle that gets applied to every unit.
    pub fn register(&mut self, bundle: SettingsBundle) -> &mut Self {
        self.global.push(bundle);
        self
    }

    /// Register a bundle that gets applied to units based on their capabilities.
    ///
    /// * [`Trigger::Auto`]: applied to every unit that has all of `required` enabled.
    /// * [`Trigger::Explicit`]: applied only to units that activate the bundle, activating the
    ///   bundle enables `required` for that unit.
    pub fn register_conditional<I, S>(
        &mut self,
        bundle: SettingsBundle,
        required: I,
        trigger: Trigger,
    ) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let required = required
            .into_iter()
            .map(|req| CompactString::new(req.as_ref()))
            .collect();
        self.conditional.push(PendingConditional {
            bundle,
            required,
            trigger,
        });
        self
    }

    pub fn declare_unit(&mut self, unit: BuildUnit) -> &mut Self {
        self.units.push(unit);
        self
    }

    /// Consumes this [`RegistryBuilder`] validating it with the default configs.
    pub fn build(self) -> Result<Workspace, LoadError> {
        self.build_with(&cfgs::default_configs())
    }

    /// Consumes this [`RegistryBuilder`] validating and constructing a [`Workspace`].
    ///
    /// # Errors
    ///
    /// Any [`LoadError`], e.g. a cycle in capability requirements or a reference to an
    /// undeclared capability.
    pub fn build_with(self, configs: &ConfigSet) -> Result<Workspace, LoadError> {
        let RegistryBuilder {
            capabilities,
            global,
            conditional,
            units,
        } = self;

        // Capabilities first, everything else references them.
        let mut graph = CapabilityGraphBuilder::new();
        for (name, requires) in &capabilities {
            graph.declare(name, requires)?;
        }
        let max_depth = usize::try_from(MAX_CAPABILITY_DEPTH.read(configs)).unwrap_or(usize::MAX);
        let graph = graph.build(max_depth)?;

        // Bundle names are used for provenance and activation, so they must be unique.
        let mut bundle_names = BTreeSet::new();
        let all_bundles = global
            .iter()
            .chain(conditional.iter().map(|pending| &pending.bundle));
        for bundle in all_bundles {
            if bundle.name().is_empty() {
                return Err(LoadError::EmptyName { kind: "bundle" });
            }
            if !bundle_names.insert(CompactString::new(bundle.name())) {
                return Err(LoadError::DuplicateBundle {
                    name: CompactString::new(bundle.name()),
                });
            }
        }

        let conditional = conditional
            .into_iter()
            .map(|pending| {
                let required = pending
                    .required
                    .iter()
                    .map(|name| {
                        graph
                            .lookup(name)
                            .ok_or_else(|| LoadError::UnknownBundleCapability {
                                bundle: CompactString::new(pending.bundle.name()),
                                capability: name.clone(),
                            })
                    })
                    .collect::<Result<_, _>>()?;
                Ok::<_, LoadError>(ConditionalBundle {
                    bundle: pending.bundle,
                    required,
                    trigger: pending.trigger,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let conditional_by_name: BTreeMap<&str, usize> = conditional
            .iter()
            .enumerate()
            .map(|(idx, cond)| (cond.bundle.name(), idx))
            .collect();

        let mut nodes: BTreeMap<CompactString, UnitNode> = BTreeMap::new();
        for unit in units {
            if unit.name().is_empty() {
                return Err(LoadError::EmptyName { kind: "unit" });
            }
            if nodes.contains_key(unit.name()) {
                return Err(LoadError::DuplicateUnit {
                    name: CompactString::new(unit.name()),
                });
            }
            let node = UnitNode::plan(unit, &graph, &conditional, &conditional_by_name)?;
            nodes.insert(CompactString::new(node.unit.name()), node);
        }

        // Validate the dependencies between units.
        for node in nodes.values() {
            for dependency in node.unit.depends_on() {
                if !nodes.contains_key(dependency) {
                    return Err(LoadError::UnknownUnitDependency {
                        unit: CompactString::new(node.unit.name()),
                        dependency: dependency.clone(),
                    });
                }
            }
        }
        let names: Vec<CompactString> = nodes.keys().cloned().collect();
        let unit_order = topo::topo_sort(&names, |name| {
            nodes[name].unit.depends_on().to_vec()
        })
        .map_err(|cycle| LoadError::UnitCycle { path: cycle.0 })?;

        tracing::info!(
            capabilities = graph.len(),
            global = global.len(),
            conditional = conditional.len(),
            units = nodes.len(),
            "loaded workspace",
        );

        Ok(Workspace {
            capabilities: graph,
            global,
            conditional,
            units: nodes,
            unit_order,
            log_overrides: LOG_OVERRIDES.read(configs),
        })
    }
}

/// A bundle that is applied to a unit based on the unit's capabilities.
#[derive(Debug, Clone)]
pub struct ConditionalBundle {
    bundle: SettingsBundle,
    required: CapabilitySet,
    trigger: Trigger,
}

impl ConditionalBundle {
    pub fn bundle(&self) -> &SettingsBundle {
        &self.bundle
    }

    pub fn required(&self) -> &CapabilitySet {
        &self.required
    }

    pub fn trigger(&self) -> Trigger {
        self.trigger
    }
}

/// A declared unit along with everything computed for it at load time.
#[derive(Debug)]
struct UnitNode {
    unit: BuildUnit,
    /// Explicitly enabled capabilities and everything they require.
    enabled: CapabilitySet,
    /// Indexes of the conditional bundles that apply to this unit, in registration order.
    applied: SmallVec<[usize; 4]>,
}

impl UnitNode {
    fn plan(
        unit: BuildUnit,
        graph: &CapabilityGraph,
        conditional: &[ConditionalBundle],
        conditional_by_name: &BTreeMap<&str, usize>,
    ) -> Result<UnitNode, LoadError> {
        let unit_name = || CompactString::new(unit.name());

        let mut seed: SmallVec<[_; 8]> = SmallVec::new();
        for capability in unit.enable() {
            let id = graph
                .lookup(capability)
                .ok_or_else(|| LoadError::UnknownUnitCapability {
                    unit: unit_name(),
                    capability: capability.clone(),
                })?;
            seed.push(id);
        }

        let lookup_bundle = |bundle: &CompactString| {
            conditional_by_name
                .get(bundle.as_str())
                .copied()
                .ok_or_else(|| LoadError::UnknownBundle {
                    unit: unit_name(),
                    bundle: bundle.clone(),
                })
        };

        let mut activated = BTreeSet::new();
        for bundle in unit.activate() {
            let idx = lookup_bundle(bundle)?;
            let cond = &conditional[idx];
            if cond.trigger == Trigger::Auto {
                return Err(LoadError::ActivatedAutoBundle {
                    unit: unit_name(),
                    bundle: bundle.clone(),
                });
            }
            // Activating a bundle brings along the capabilities it requires.
            seed.extend(cond.required.iter());
            activated.insert(idx);
        }

        let mut excluded = BTreeSet::new();
        for bundle in unit.exclude() {
            let idx = lookup_bundle(bundle)?;
            if conditional[idx].trigger == Trigger::Explicit {
                return Err(LoadError::ExcludedExplicitBundle {
                    unit: unit_name(),
                    bundle: bundle.clone(),
                });
            }
            excluded.insert(idx);
        }

        let enabled = graph.closure(seed);
        let applied = conditional
            .iter()
            .enumerate()
            .filter(|(idx, cond)| match cond.trigger {
                Trigger::Auto => !excluded.contains(idx) && enabled.is_superset(&cond.required),
                Trigger::Explicit => activated.contains(idx),
            })
            .map(|(idx, _)| idx)
            .collect();

        Ok(UnitNode {
            unit,
            enabled,
            applied,
        })
    }
}

/// A validated and immutable set of bundles, capabilities, and units.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Workspace {
    /// All declared capabilities and their requirements.
    capabilities: CapabilityGraph,
    /// Bundles applied to every unit, in registration order.
    global: Vec<SettingsBundle>,
    /// Bundles applied based on capabilities, in registration order.
    conditional: Vec<ConditionalBundle>,
    /// Every unit, keyed by name.
    units: BTreeMap<CompactString, UnitNode>,
    /// Unit names ordered such that dependencies come first.
    unit_order: Vec<CompactString>,
    /// Whether to log every override while resolving.
    #[derivative(Debug = "ignore")]
    log_overrides: bool,
}

impl Workspace {
    /// Returns a new [`RegistryBuilder`].
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn capabilities(&self) -> &CapabilityGraph {
        &self.capabilities
    }

    pub fn global_bundles(&self) -> &[SettingsBundle] {
        &self.global[..]
    }

    pub fn conditional_bundles(&self) -> &[ConditionalBundle] {
        &self.conditional[..]
    }

    /// Returns the names of every unit, ordered by name.
    pub fn units(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(|name| name.as_str())
    }

    /// Returns the names of every unit, ordered such that dependencies come first.
    pub fn unit_order(&self) -> &[CompactString] {
        &self.unit_order[..]
    }

    pub fn unit(&self, name: &str) -> Option<&BuildUnit> {
        self.units.get(name).map(|node| &node.unit)
    }

    /// Returns every capability enabled for `unit`, explicitly or transitively.
    pub fn enabled_capabilities(&self, unit: &str) -> Result<&CapabilitySet, ResolveError> {
        self.node(unit).map(|node| &node.enabled)
    }

    /// Resolve the final configuration of `unit`.
    ///
    /// # Errors
    ///
    /// * If no unit named `unit` was declared.
    pub fn resolve(&self, unit: &str) -> Result<ResolvedConfig, ResolveError> {
        let node = self.node(unit)?;
        Ok(self.resolve_node(node))
    }

    /// Resolve every unit, dependencies first.
    pub fn resolve_all(&self) -> Vec<ResolvedConfig> {
        self.unit_order
            .iter()
            .map(|name| self.resolve_node(&self.units[name]))
            .collect()
    }

    fn resolve_node(&self, node: &UnitNode) -> ResolvedConfig {
        let unit = CompactString::new(node.unit.name());
        let enabled = self
            .capabilities
            .names(&node.enabled)
            .map(CompactString::new)
            .collect();
        let mut config = ResolvedConfig::new(unit.clone(), enabled);

        for bundle in &self.global {
            let origin = Origin::Global(CompactString::new(bundle.name()));
            config.apply(origin, bundle, self.log_overrides);
        }
        for idx in &node.applied {
            let bundle = &self.conditional[*idx].bundle;
            let origin = Origin::Conditional(CompactString::new(bundle.name()));
            config.apply(origin, bundle, self.log_overrides);
        }
        config.apply(Origin::Unit(unit), node.unit.settings(), self.log_overrides);

        config
    }

    fn node(&self, unit: &str) -> Result<&UnitNode, ResolveError> {
        self.units
            .get(unit)
            .ok_or_else(|| ResolveError::UnknownUnit(CompactString::new(unit)))
    }
}
