//! The capability graph.
//!
//! A capability (what a build tool would call a "plugin") may require other capabilities. When a
//! build unit enables a capability, everything it requires is enabled too. The graph is declared
//! through a [`CapabilityGraphBuilder`] and validated once in [`CapabilityGraphBuilder::build`],
//! after which it is immutable.

use std::collections::{BTreeMap, BTreeSet};

use compact_str::CompactString;
use derivative::Derivative;
use knit_ore::{assert_none, id_gen::Gen};
use smallvec::SmallVec;

mod pretty;
pub mod topo;

pub use pretty::PrettyCapabilities;

/// ID for a capability in a [`CapabilityGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CapabilityId(u64);

impl From<u64> for CapabilityId {
    fn from(value: u64) -> Self {
        CapabilityId(value)
    }
}

/// A builder for a [`CapabilityGraph`].
#[derive(Derivative)]
#[derivative(Debug, Default)]
pub struct CapabilityGraphBuilder {
    /// String interner for capability names.
    #[derivative(Debug = "ignore")]
    strings: lasso::Rodeo,
    /// Map of interned name to the ID of the capability.
    by_name: BTreeMap<lasso::Spur, CapabilityId>,
    /// Declared capabilities, requirements are resolved in [`CapabilityGraphBuilder::build`].
    pending: BTreeMap<CapabilityId, PendingNode>,
    /// ID generator for all the capabilities in our graph.
    id_gen: Gen<CapabilityId>,
}

impl CapabilityGraphBuilder {
    pub fn new() -> Self {
        CapabilityGraphBuilder::default()
    }

    /// Declare a capability named `name` that requires every capability in `requires`.
    ///
    /// Requirements may reference capabilities that have not been declared yet.
    ///
    /// # Errors
    ///
    /// * If `name` is empty.
    /// * If a capability with the same name was already declared.
    pub fn declare<I, S>(&mut self, name: &str, requires: I) -> Result<CapabilityId, GraphError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if name.is_empty() {
            return Err(GraphError::EmptyName);
        }
        if self.strings.get(name).is_some_and(|spur| self.by_name.contains_key(&spur)) {
            return Err(GraphError::Duplicate {
                name: CompactString::new(name),
            });
        }

        let id = self.id_gen.next();
        let spur = self.strings.get_or_intern(name);
        let requires = requires
            .into_iter()
            .map(|req| CompactString::new(req.as_ref()))
            .collect();

        let prev = self.by_name.insert(spur, id);
        assert_none!(prev);
        let prev = self.pending.insert(id, PendingNode { name: spur, requires });
        assert_none!(prev);

        Ok(id)
    }

    /// Consumes this [`CapabilityGraphBuilder`] validating and constructing a [`CapabilityGraph`].
    ///
    /// # Errors
    ///
    /// * If a capability requires one that was never declared.
    /// * If the requirements form a cycle.
    /// * If a chain of requirements is longer than `max_depth`.
    pub fn build(self, max_depth: usize) -> Result<CapabilityGraph, GraphError> {
        let CapabilityGraphBuilder {
            strings,
            by_name,
            pending,
            ..
        } = self;

        // Resolve all of our requirements.
        let mut nodes = BTreeMap::new();
        for (id, node) in pending {
            let requires = node
                .requires
                .iter()
                .map(|req| {
                    strings
                        .get(req.as_str())
                        .and_then(|spur| by_name.get(&spur).copied())
                        .ok_or_else(|| GraphError::UnknownRequirement {
                            capability: CompactString::new(strings.resolve(&node.name)),
                            requires: req.clone(),
                        })
                })
                .collect::<Result<_, _>>()?;
            nodes.insert(
                id,
                CapabilityNode {
                    name: node.name,
                    requires,
                },
            );
        }

        let ids: Vec<_> = nodes.keys().copied().collect();
        let order = topo::topo_sort(&ids, |id| nodes[id].requires.clone()).map_err(|cycle| {
            let path = cycle
                .0
                .iter()
                .map(|id| CompactString::new(strings.resolve(&nodes[id].name)))
                .collect();
            GraphError::Cycle { path }
        })?;

        // Requirements always come before their dependents in `order`.
        let mut depths: BTreeMap<CapabilityId, usize> = BTreeMap::new();
        for id in &order {
            let node = &nodes[id];
            let depth = 1 + node
                .requires
                .iter()
                .map(|req| depths[req])
                .max()
                .unwrap_or(0);
            if depth > max_depth {
                return Err(GraphError::TooDeep {
                    capability: CompactString::new(strings.resolve(&node.name)),
                    depth,
                    max: max_depth,
                });
            }
            depths.insert(*id, depth);
        }

        Ok(CapabilityGraph {
            strings: strings.into_reader(),
            by_name,
            nodes,
            order,
        })
    }
}

/// Validated, immutable graph of capabilities and their requirements.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct CapabilityGraph {
    /// String interner for capability names.
    #[derivative(Debug = "ignore")]
    strings: lasso::RodeoReader,
    /// Map of interned name to the ID of the capability.
    by_name: BTreeMap<lasso::Spur, CapabilityId>,
    /// Map of [`CapabilityId`] to [`CapabilityNode`], in declaration order.
    nodes: BTreeMap<CapabilityId, CapabilityNode>,
    /// Every capability, ordered such that requirements come first.
    order: Vec<CapabilityId>,
}

impl CapabilityGraph {
    /// Get the ID of the capability named `name`, if it exists.
    pub fn lookup(&self, name: &str) -> Option<CapabilityId> {
        let spur = self.strings.get(name)?;
        self.by_name.get(&spur).copied()
    }

    /// Returns the name of the capability.
    ///
    /// # Panics
    /// * If `id` did not come from this graph.
    pub fn name(&self, id: CapabilityId) -> &str {
        let node = self.nodes.get(&id).expect("capability from another graph");
        self.strings.resolve(&node.name)
    }

    /// Returns the capabilities directly required by `id`.
    pub fn requires(&self, id: CapabilityId) -> &[CapabilityId] {
        self.nodes
            .get(&id)
            .map(|node| &node.requires[..])
            .unwrap_or_default()
    }

    /// Returns all capabilities in the order they were declared.
    pub fn iter(&self) -> impl Iterator<Item = CapabilityId> + '_ {
        self.nodes.keys().copied()
    }

    /// Returns all capabilities such that requirements come before their dependents.
    pub fn dependency_order(&self) -> &[CapabilityId] {
        &self.order[..]
    }

    /// Returns the capabilities that are not required by any other capability.
    pub fn roots(&self) -> Vec<CapabilityId> {
        let required: BTreeSet<_> = self
            .nodes
            .values()
            .flat_map(|node| node.requires.iter().copied())
            .collect();
        self.iter().filter(|id| !required.contains(id)).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns `seed` plus everything it transitively requires.
    pub fn closure<I>(&self, seed: I) -> CapabilitySet
    where
        I: IntoIterator<Item = CapabilityId>,
    {
        let mut enabled = CapabilitySet::default();
        let mut stack: SmallVec<[CapabilityId; 8]> = seed.into_iter().collect();
        while let Some(id) = stack.pop() {
            if enabled.insert(id) {
                stack.extend(self.requires(id).iter().copied());
            }
        }
        enabled
    }

    /// Returns the names of every capability in `set`.
    pub fn names<'a>(&'a self, set: &'a CapabilitySet) -> impl Iterator<Item = &'a str> + 'a {
        set.iter().map(|id| self.name(id))
    }

    /// Return a pretty version of the requirement tree that can be displayed.
    pub fn pretty(&self) -> PrettyCapabilities<'_> {
        PrettyCapabilities::new(self)
    }
}

/// A set of capabilities from a single [`CapabilityGraph`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CapabilitySet(BTreeSet<CapabilityId>);

impl CapabilitySet {
    /// Adds `id` to the set, returning `true` if it was not already present.
    pub fn insert(&mut self, id: CapabilityId) -> bool {
        self.0.insert(id)
    }

    pub fn contains(&self, id: CapabilityId) -> bool {
        self.0.contains(&id)
    }

    pub fn is_superset(&self, other: &CapabilitySet) -> bool {
        self.0.is_superset(&other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = CapabilityId> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<CapabilityId> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = CapabilityId>>(iter: T) -> Self {
        CapabilitySet(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone)]
struct PendingNode {
    name: lasso::Spur,
    requires: SmallVec<[CompactString; 4]>,
}

#[derive(Debug, Clone)]
struct CapabilityNode {
    name: lasso::Spur,
    requires: SmallVec<[CapabilityId; 4]>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("capability names cannot be empty")]
    EmptyName,
    #[error("capability '{name}' declared more than once")]
    Duplicate { name: CompactString },
    #[error("capability '{capability}' requires undeclared capability '{requires}'")]
    UnknownRequirement {
        capability: CompactString,
        requires: CompactString,
    },
    #[error("capability requirements form a cycle: {}", display_path(.path))]
    Cycle { path: Vec<CompactString> },
    #[error("capability '{capability}' has a requirement chain of {depth}, the maximum is {max}")]
    TooDeep {
        capability: CompactString,
        depth: usize,
        max: usize,
    },
}

fn display_path(path: &[CompactString]) -> String {
    let names: Vec<&str> = path.iter().map(|name| name.as_str()).collect();
    names.join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docker_graph() -> CapabilityGraph {
        let mut builder = CapabilityGraphBuilder::new();
        builder.declare("Docker", ["JavaAppPackaging"]).unwrap();
        builder.declare("JavaAppPackaging", ["JavaServer"]).unwrap();
        builder.declare("JavaServer", Vec::<&str>::new()).unwrap();
        builder.declare("Scalafmt", Vec::<&str>::new()).unwrap();
        builder.build(64).unwrap()
    }

    #[test]
    fn smoketest_closure() {
        let graph = docker_graph();
        let docker = graph.lookup("Docker").unwrap();

        let enabled = graph.closure([docker]);
        let names: Vec<_> = graph.names(&enabled).collect();
        assert_eq!(names, ["Docker", "JavaAppPackaging", "JavaServer"]);

        let scalafmt = graph.lookup("Scalafmt").unwrap();
        let enabled = graph.closure([scalafmt]);
        assert_eq!(enabled.len(), 1);
        assert!(!enabled.contains(docker));

        assert!(graph.closure([]).is_empty());
    }

    #[test]
    fn smoketest_order_and_roots() {
        let graph = docker_graph();
        let order: Vec<_> = graph
            .dependency_order()
            .iter()
            .map(|id| graph.name(*id))
            .collect();
        assert_eq!(order, ["JavaServer", "JavaAppPackaging", "Docker", "Scalafmt"]);

        let roots: Vec<_> = graph.roots().into_iter().map(|id| graph.name(id)).collect();
        assert_eq!(roots, ["Docker", "Scalafmt"]);
        assert_eq!(graph.lookup("Missing"), None);
    }

    #[test]
    fn detects_cycle() {
        let mut builder = CapabilityGraphBuilder::new();
        builder.declare("A", ["B"]).unwrap();
        builder.declare("B", ["A"]).unwrap();
        let err = builder.build(64).unwrap_err();

        assert_eq!(
            err,
            GraphError::Cycle {
                path: vec!["A".into(), "B".into(), "A".into()]
            }
        );
        assert_eq!(
            err.to_string(),
            "capability requirements form a cycle: A -> B -> A"
        );
    }

    #[test]
    fn detects_self_cycle() {
        let mut builder = CapabilityGraphBuilder::new();
        builder.declare("A", ["A"]).unwrap();
        assert!(matches!(builder.build(64), Err(GraphError::Cycle { .. })));
    }

    #[test]
    fn rejects_unknown_requirement() {
        let mut builder = CapabilityGraphBuilder::new();
        builder.declare("Docker", ["Kubernetes"]).unwrap();
        let err = builder.build(64).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownRequirement {
                capability: "Docker".into(),
                requires: "Kubernetes".into(),
            }
        );
    }

    #[test]
    fn rejects_duplicates_and_empty_names() {
        let mut builder = CapabilityGraphBuilder::new();
        builder.declare("Docker", Vec::<&str>::new()).unwrap();
        assert_eq!(
            builder.declare("Docker", Vec::<&str>::new()),
            Err(GraphError::Duplicate {
                name: "Docker".into()
            })
        );
        assert_eq!(
            builder.declare("", Vec::<&str>::new()),
            Err(GraphError::EmptyName)
        );
    }

    #[test]
    fn rejects_deep_chains() {
        let mut builder = CapabilityGraphBuilder::new();
        builder.declare("A", ["B"]).unwrap();
        builder.declare("B", ["C"]).unwrap();
        builder.declare("C", Vec::<&str>::new()).unwrap();
        let err = builder.build(2).unwrap_err();
        assert_eq!(
            err,
            GraphError::TooDeep {
                capability: "A".into(),
                depth: 3,
                max: 2,
            }
        );
    }

    #[test]
    fn rejects_long_chains_without_overflowing() {
        let len = 20_000;
        let mut builder = CapabilityGraphBuilder::new();
        for idx in 0..len {
            let requires: Vec<String> = if idx + 1 < len {
                vec![format!("c{}", idx + 1)]
            } else {
                Vec::new()
            };
            builder.declare(&format!("c{idx}"), &requires).unwrap();
        }
        let err = builder.build(64).unwrap_err();
        assert_eq!(
            err,
            GraphError::TooDeep {
                capability: format!("c{}", len - 65).into(),
                depth: 65,
                max: 64,
            }
        );
    }

    #[test]
    fn empty_graph() {
        let graph = CapabilityGraphBuilder::new().build(0).unwrap();
        assert!(graph.is_empty());
        assert!(graph.roots().is_empty());
    }
}
