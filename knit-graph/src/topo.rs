//! Depth-first topological ordering with cycle reporting.

use std::collections::BTreeMap;

use smallvec::SmallVec;

/// A cycle found while ordering a graph.
///
/// The path starts and ends with the same node, e.g. `[a, b, a]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle<N>(pub Vec<N>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Orders `nodes` such that every node comes after everything reachable via `edges`.
///
/// Ties are broken by the order of `nodes`, so the result is deterministic. The walk keeps its
/// own stack, so arbitrarily long chains don't grow the call stack.
pub fn topo_sort<N, F, I>(nodes: &[N], mut edges: F) -> Result<Vec<N>, Cycle<N>>
where
    N: Ord + Clone,
    F: FnMut(&N) -> I,
    I: IntoIterator<Item = N>,
{
    let mut marks = BTreeMap::new();
    let mut order = Vec::with_capacity(nodes.len());
    // The nodes on the stack are the current path from a root.
    let mut stack: Vec<Frame<N>> = Vec::new();

    for root in nodes {
        if marks.contains_key(root) {
            continue;
        }
        marks.insert(root.clone(), Mark::Visiting);
        stack.push(Frame::new(root.clone(), &mut edges));

        loop {
            let next = match stack.last_mut() {
                Some(frame) => frame.children.next(),
                None => break,
            };

            match next {
                Some(child) => match marks.get(&child).copied() {
                    Some(Mark::Done) => (),
                    Some(Mark::Visiting) => {
                        let start = stack
                            .iter()
                            .position(|frame| frame.node == child)
                            .unwrap_or(0);
                        let mut cycle: Vec<N> =
                            stack[start..].iter().map(|frame| frame.node.clone()).collect();
                        cycle.push(child);
                        return Err(Cycle(cycle));
                    }
                    None => {
                        marks.insert(child.clone(), Mark::Visiting);
                        stack.push(Frame::new(child, &mut edges));
                    }
                },
                None => {
                    if let Some(Frame { node, .. }) = stack.pop() {
                        marks.insert(node.clone(), Mark::Done);
                        order.push(node);
                    }
                }
            }
        }
    }

    Ok(order)
}

/// A node being visited along with the children that haven't been walked yet.
struct Frame<N> {
    node: N,
    children: smallvec::IntoIter<[N; 4]>,
}

impl<N> Frame<N> {
    fn new<F, I>(node: N, edges: &mut F) -> Self
    where
        F: FnMut(&N) -> I,
        I: IntoIterator<Item = N>,
    {
        let children: SmallVec<[N; 4]> = edges(&node).into_iter().collect();
        Frame {
            node,
            children: children.into_iter(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges_of(edges: &[(u32, u32)], node: u32) -> Vec<u32> {
        edges
            .iter()
            .filter(|(from, _)| *from == node)
            .map(|(_, to)| *to)
            .collect()
    }

    #[test]
    fn smoketest_order() {
        let edges = [(1, 2), (2, 3), (1, 3), (4, 1)];
        let order = topo_sort(&[1, 2, 3, 4], |n| edges_of(&edges, *n)).unwrap();
        assert_eq!(order, vec![3, 2, 1, 4]);
    }

    #[test]
    fn disconnected_nodes_keep_input_order() {
        let order = topo_sort(&[5, 1, 3], |_| Vec::new()).unwrap();
        assert_eq!(order, vec![5, 1, 3]);
    }

    #[test]
    fn reports_cycle_path() {
        let edges = [(1, 2), (2, 3), (3, 2)];
        let cycle = topo_sort(&[1, 2, 3], |n| edges_of(&edges, *n)).unwrap_err();
        assert_eq!(cycle, Cycle(vec![2, 3, 2]));
    }

    #[test]
    fn reports_self_cycle() {
        let cycle = topo_sort(&["a"], |n| vec![*n]).unwrap_err();
        assert_eq!(cycle, Cycle(vec!["a", "a"]));
    }

    #[test]
    fn long_chain() {
        let len = 100_000u32;
        let nodes: Vec<u32> = (0..len).collect();
        let order = topo_sort(&nodes, |n| (*n + 1 < len).then_some(*n + 1)).unwrap();
        assert_eq!(order.len(), len as usize);
        assert_eq!(order.first(), Some(&(len - 1)));
        assert_eq!(order.last(), Some(&0));

        // Closing the chain into a loop reports every node on it.
        let cycle = topo_sort(&nodes, |n| Some((*n + 1) % len)).unwrap_err();
        assert_eq!(cycle.0.len(), len as usize + 1);
        assert_eq!(cycle.0.first(), cycle.0.last());
    }
}
