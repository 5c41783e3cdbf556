use compact_str::CompactString;
use knit_graph::GraphError;

/// A fatal error in the declaration of a workspace.
///
/// These are all reported before any unit gets resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Capability(#[from] GraphError),
    #[error("{kind} names cannot be empty")]
    EmptyName { kind: &'static str },
    #[error("bundle '{name}' registered more than once")]
    DuplicateBundle { name: CompactString },
    #[error("unit '{name}' declared more than once")]
    DuplicateUnit { name: CompactString },
    #[error("bundle '{bundle}' requires undeclared capability '{capability}'")]
    UnknownBundleCapability {
        bundle: CompactString,
        capability: CompactString,
    },
    #[error("unit '{unit}' enables undeclared capability '{capability}'")]
    UnknownUnitCapability {
        unit: CompactString,
        capability: CompactString,
    },
    #[error("unit '{unit}' references unknown bundle '{bundle}'")]
    UnknownBundle {
        unit: CompactString,
        bundle: CompactString,
    },
    #[error("unit '{unit}' activates bundle '{bundle}', which is triggered automatically")]
    ActivatedAutoBundle {
        unit: CompactString,
        bundle: CompactString,
    },
    #[error("unit '{unit}' excludes bundle '{bundle}', which only applies when activated")]
    ExcludedExplicitBundle {
        unit: CompactString,
        bundle: CompactString,
    },
    #[error("unit '{unit}' depends on undeclared unit '{dependency}'")]
    UnknownUnitDependency {
        unit: CompactString,
        dependency: CompactString,
    },
    #[error("unit dependencies form a cycle: {}", display_path(.path))]
    UnitCycle { path: Vec<CompactString> },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("no unit named '{0}'")]
    UnknownUnit(CompactString),
}

fn display_path(path: &[CompactString]) -> String {
    let names: Vec<&str> = path.iter().map(|name| name.as_str()).collect();
    names.join(" -> ")
}
