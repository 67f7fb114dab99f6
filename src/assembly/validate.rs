//! Full-graph acyclicity check, run after every connection insertion.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

/// Kahn's algorithm over a scratch copy of the predecessor counts.
///
/// Enqueue every agent whose count is zero, repeatedly dequeue and decrement
/// each successor's scratch count, enqueuing it when it reaches zero. If the
/// number of agents visited falls short of the number registered, at least
/// one cycle exists. Re-running this in full on every insertion is fine:
/// assemblies describe pipeline topology, defined once and small.
pub(crate) fn is_acyclic(
    parent_count: &FxHashMap<String, usize>,
    successors: &FxHashMap<String, FxHashSet<String>>,
) -> bool {
    let mut remaining: FxHashMap<&str, usize> = parent_count
        .iter()
        .map(|(id, count)| (id.as_str(), *count))
        .collect();

    let mut queue: VecDeque<&str> = remaining
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(id, _)| *id)
        .collect();

    let mut visited = 0usize;
    while let Some(id) = queue.pop_front() {
        visited += 1;
        if let Some(succs) = successors.get(id) {
            for succ in succs {
                if let Some(count) = remaining.get_mut(succ.as_str()) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push_back(succ.as_str());
                    }
                }
            }
        }
    }

    visited == parent_count.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(
        edges: &[(&str, &str)],
        nodes: &[&str],
    ) -> (FxHashMap<String, usize>, FxHashMap<String, FxHashSet<String>>) {
        let mut parent_count: FxHashMap<String, usize> =
            nodes.iter().map(|n| (n.to_string(), 0)).collect();
        let mut successors: FxHashMap<String, FxHashSet<String>> = FxHashMap::default();
        for (from, to) in edges {
            successors
                .entry(from.to_string())
                .or_default()
                .insert(to.to_string());
            *parent_count.entry(to.to_string()).or_default() += 1;
        }
        (parent_count, successors)
    }

    #[test]
    fn empty_graph_is_acyclic() {
        let (counts, succs) = graph(&[], &[]);
        assert!(is_acyclic(&counts, &succs));
    }

    #[test]
    fn diamond_is_acyclic() {
        let (counts, succs) = graph(
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
            &["a", "b", "c", "d"],
        );
        assert!(is_acyclic(&counts, &succs));
    }

    #[test]
    fn three_cycle_is_rejected() {
        let (counts, succs) = graph(&[("a", "b"), ("b", "c"), ("c", "a")], &["a", "b", "c"]);
        assert!(!is_acyclic(&counts, &succs));
    }

    #[test]
    fn self_loop_is_rejected() {
        let (counts, succs) = graph(&[("a", "a")], &["a"]);
        assert!(!is_acyclic(&counts, &succs));
    }

    #[test]
    fn cycle_with_detached_component_is_rejected() {
        let (counts, succs) = graph(&[("a", "b"), ("b", "a"), ("c", "d")], &["a", "b", "c", "d"]);
        assert!(!is_acyclic(&counts, &succs));
    }
}
