//! Component-level topology: adjacency, reachability, strongly connected components
//!
//! - Arc<str> names shared with the graph (interned)
//! - FxHashMap adjacency, SmallVec neighbor lists (most components have ≤4)

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use super::Graph;

/// Stack-allocated neighbor list
pub type NeighborVec = SmallVec<[Arc<str>; 4]>;

/// Component adjacency derived from a graph's edges
///
/// Parallel edges between the same two components collapse into one.
#[derive(Debug, Clone)]
pub struct Topology {
    successors: FxHashMap<Arc<str>, NeighborVec>,
    predecessors: FxHashMap<Arc<str>, NeighborVec>,
    /// Sorted, so every traversal is deterministic
    names: Vec<Arc<str>>,
    /// Component → index into `sccs`
    scc_index: FxHashMap<Arc<str>, usize>,
    sccs: Vec<Vec<Arc<str>>>,
}

impl Topology {
    pub fn from_graph(graph: &Graph) -> Self {
        let capacity = graph.len();
        let mut successors: FxHashMap<Arc<str>, NeighborVec> =
            FxHashMap::with_capacity_and_hasher(capacity, Default::default());
        let mut predecessors: FxHashMap<Arc<str>, NeighborVec> =
            FxHashMap::with_capacity_and_hasher(capacity, Default::default());
        let names: Vec<Arc<str>> = graph.component_names().cloned().collect();

        for name in &names {
            successors.insert(Arc::clone(name), NeighborVec::new());
            predecessors.insert(Arc::clone(name), NeighborVec::new());
        }

        for edge in graph.edges() {
            let from = &edge.sender.component;
            let to = &edge.receiver.component;
            let out = successors.entry(Arc::clone(from)).or_default();
            if !out.contains(to) {
                out.push(Arc::clone(to));
                predecessors
                    .entry(Arc::clone(to))
                    .or_default()
                    .push(Arc::clone(from));
            }
        }

        for list in successors.values_mut().chain(predecessors.values_mut()) {
            list.sort_unstable();
        }

        let sccs = tarjan(&names, &successors);
        let scc_index = sccs
            .iter()
            .enumerate()
            .flat_map(|(i, members)| members.iter().map(move |m| (Arc::clone(m), i)))
            .collect();

        Self {
            successors,
            predecessors,
            names,
            scc_index,
            sccs,
        }
    }

    #[inline]
    pub fn successors(&self, component: &str) -> &[Arc<str>] {
        static EMPTY: &[Arc<str>] = &[];
        self.successors
            .get(component)
            .map_or(EMPTY, SmallVec::as_slice)
    }

    #[inline]
    pub fn predecessors(&self, component: &str) -> &[Arc<str>] {
        static EMPTY: &[Arc<str>] = &[];
        self.predecessors
            .get(component)
            .map_or(EMPTY, SmallVec::as_slice)
    }

    /// Components with no incoming edges
    pub fn roots(&self) -> Vec<Arc<str>> {
        self.names
            .iter()
            .filter(|name| self.predecessors(name).is_empty())
            .cloned()
            .collect()
    }

    /// Is there a path of one or more edges from `from` to `to`? (BFS)
    pub fn has_path(&self, from: &str, to: &str) -> bool {
        let mut visited: FxHashSet<&str> = FxHashSet::default();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(from);

        while let Some(current) = queue.pop_front() {
            for next in self.successors(current) {
                if next.as_ref() == to {
                    return true;
                }
                if visited.insert(next.as_ref()) {
                    queue.push_back(next.as_ref());
                }
            }
        }
        false
    }

    /// Every component with a path into `component`, minus its own SCC
    pub fn upstream(&self, component: &str) -> FxHashSet<Arc<str>> {
        let mut seen: FxHashSet<Arc<str>> = FxHashSet::default();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(component);

        while let Some(current) = queue.pop_front() {
            for prev in self.predecessors(current) {
                if seen.insert(Arc::clone(prev)) {
                    queue.push_back(prev.as_ref());
                }
            }
        }
        seen.retain(|name| !self.same_scc(name, component));
        seen
    }

    pub fn same_scc(&self, a: &str, b: &str) -> bool {
        match (self.scc_index.get(a), self.scc_index.get(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    /// Strongly connected components, each sorted, in reverse topological order
    pub fn strongly_connected(&self) -> &[Vec<Arc<str>>] {
        &self.sccs
    }

    /// SCCs that contain a cycle: more than one member, or a self-loop
    pub fn cycles(&self) -> impl Iterator<Item = &[Arc<str>]> {
        self.sccs.iter().filter_map(move |members| {
            let cyclic = members.len() > 1
                || self.successors(&members[0]).iter().any(|s| *s == members[0]);
            cyclic.then_some(members.as_slice())
        })
    }

    pub fn is_cyclic(&self, component: &str) -> bool {
        self.scc_index
            .get(component)
            .map(|&i| &self.sccs[i])
            .is_some_and(|members| {
                members.len() > 1 || self.successors(component).iter().any(|s| &**s == component)
            })
    }
}

/// Tarjan's algorithm with an explicit work stack
///
/// Each frame is `(node, next successor to look at)`, so path length never
/// touches the thread stack.
fn tarjan(names: &[Arc<str>], successors: &FxHashMap<Arc<str>, NeighborVec>) -> Vec<Vec<Arc<str>>> {
    const UNVISITED: usize = usize::MAX;

    let position: FxHashMap<&str, usize> = names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_ref(), i))
        .collect();
    let adjacency: Vec<Vec<usize>> = names
        .iter()
        .map(|name| {
            successors
                .get(name)
                .map(|list| list.iter().filter_map(|s| position.get(s.as_ref()).copied()).collect())
                .unwrap_or_default()
        })
        .collect();

    let count = names.len();
    let mut index = vec![UNVISITED; count];
    let mut lowlink = vec![0; count];
    let mut on_stack = vec![false; count];
    let mut stack: Vec<usize> = Vec::new();
    let mut work: Vec<(usize, usize)> = Vec::new();
    let mut next_index = 0;
    let mut sccs = Vec::new();

    for root in 0..count {
        if index[root] != UNVISITED {
            continue;
        }
        work.push((root, 0));

        while let Some((node, cursor)) = work.pop() {
            if cursor == 0 {
                index[node] = next_index;
                lowlink[node] = next_index;
                next_index += 1;
                stack.push(node);
                on_stack[node] = true;
            }

            if let Some(&next) = adjacency[node].get(cursor) {
                work.push((node, cursor + 1));
                if index[next] == UNVISITED {
                    work.push((next, 0));
                } else if on_stack[next] {
                    lowlink[node] = lowlink[node].min(index[next]);
                }
                continue;
            }

            if lowlink[node] == index[node] {
                let mut members = Vec::new();
                while let Some(member) = stack.pop() {
                    on_stack[member] = false;
                    members.push(Arc::clone(&names[member]));
                    if member == node {
                        break;
                    }
                }
                members.sort_unstable();
                sccs.push(members);
            }
            if let Some(&(parent, _)) = work.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[node]);
            }
        }
    }
    sccs
}
