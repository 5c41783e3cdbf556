//! Pretty printing of a [`CapabilityGraph`] as a tree.

use std::borrow::Cow;
use std::fmt;

use crate::{CapabilityGraph, CapabilityId};

/// Helper struct for implementing [`ptree`]'s traits.
///
/// The root of the tree lists every capability that nothing else requires, below each
/// capability are the capabilities it requires.
#[derive(Clone, Debug)]
pub struct PrettyCapabilities<'a> {
    graph: &'a CapabilityGraph,
    node: Option<CapabilityId>,
}

impl<'a> PrettyCapabilities<'a> {
    pub(crate) fn new(graph: &'a CapabilityGraph) -> Self {
        PrettyCapabilities { graph, node: None }
    }
}

impl<'a> ptree::TreeItem for PrettyCapabilities<'a> {
    type Child = PrettyCapabilities<'a>;

    fn write_self<W: std::io::Write>(&self, f: &mut W, style: &ptree::Style) -> std::io::Result<()> {
        match self.node {
            Some(id) => write!(f, "{}", style.paint(self.graph.name(id))),
            None => write!(f, "{}", style.paint("capabilities")),
        }
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        let children = match self.node {
            None => self.graph.roots(),
            Some(id) => self.graph.requires(id).to_vec(),
        };
        let children: Vec<_> = children
            .into_iter()
            .map(|id| PrettyCapabilities {
                graph: self.graph,
                node: Some(id),
            })
            .collect();

        Cow::Owned(children)
    }
}

impl<'a> fmt::Display for PrettyCapabilities<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Vec::new();
        ptree::write_tree(self, &mut buf).map_err(|_| fmt::Error)?;
        let buf = String::from_utf8_lossy(&buf[..]);
        write!(f, "{buf}")?;
        Ok(())
    }
}
