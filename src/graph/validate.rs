//! Whole-graph validation
//!
//! Two checks, both reported in full (never fail-fast):
//! - every required input can receive a value from a graph input or from a
//!   component that can itself run
//! - every cycle has at least one edge leaving a conditional output

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use super::{Endpoint, Graph, Topology};
use crate::component::ComponentDescriptor;
use crate::error::{Result, ValidationIssue, WaveError};

impl Graph {
    /// Check the graph can run; `Err(ValidationFailed)` lists every problem
    pub fn validate(&self) -> Result<()> {
        let issues = self.validation_issues();
        if issues.is_empty() {
            debug!(components = self.len(), edges = self.edges().len(), "graph valid");
            Ok(())
        } else {
            Err(WaveError::ValidationFailed { issues })
        }
    }

    pub fn validation_issues(&self) -> Vec<ValidationIssue> {
        let topology = Topology::from_graph(self);
        let mut issues = self.unresolved_inputs(&topology);
        issues.extend(self.unbreakable_cycles(&topology));
        issues
    }

    /// Fixpoint over "can this component ever fire?"
    ///
    /// Worklist: a component is rechecked only when a predecessor became
    /// runnable.
    fn unresolved_inputs(&self, topology: &Topology) -> Vec<ValidationIssue> {
        let graph_inputs = self.input_endpoints();
        let mut feeders: Feeders<'_> = FxHashMap::default();
        for edge in self.edges() {
            feeders
                .entry(&edge.receiver)
                .or_default()
                .push(&edge.sender.component);
        }
        let inputs = InputSources {
            graph_inputs: &graph_inputs,
            feeders: &feeders,
        };

        let mut runnable: FxHashSet<Arc<str>> = FxHashSet::default();
        let mut queue: VecDeque<&Arc<str>> = self.component_names().collect();
        let mut queued: FxHashSet<&str> = queue.iter().map(|&name| name.as_ref()).collect();

        while let Some(name) = queue.pop_front() {
            queued.remove(name.as_ref());
            if runnable.contains(name) {
                continue;
            }
            let Some(desc) = self.component(name) else {
                continue;
            };
            if !self.can_fire(name, desc, &inputs, &runnable) {
                continue;
            }
            runnable.insert(Arc::clone(name));
            for next in topology.successors(name) {
                if !runnable.contains(next) && queued.insert(next.as_ref()) {
                    queue.push_back(next);
                }
            }
        }

        let mut issues = Vec::new();
        for (name, desc) in self.components() {
            if runnable.contains(name) {
                continue;
            }
            let before = issues.len();
            for socket in desc.required_inputs() {
                let endpoint = Endpoint::new(name, socket.name.as_str());
                if !inputs.is_fed(&endpoint, &runnable) {
                    issues.push(ValidationIssue::UnresolvedInput {
                        component: name.to_string(),
                        socket: socket.name.clone(),
                    });
                }
            }
            if issues.len() == before {
                issues.push(ValidationIssue::NeverRuns {
                    component: name.to_string(),
                });
            }
        }
        issues
    }

    /// Required sockets fed, and something to trigger the first firing
    fn can_fire(
        &self,
        name: &Arc<str>,
        desc: &ComponentDescriptor,
        inputs: &InputSources<'_>,
        runnable: &FxHashSet<Arc<str>>,
    ) -> bool {
        let requirements_met = desc
            .required_inputs()
            .all(|socket| inputs.is_fed(&Endpoint::new(name, socket.name.as_str()), runnable));
        if !requirements_met {
            return false;
        }
        if !self.has_any_incoming(name) {
            return true;
        }
        desc.input_sockets()
            .keys()
            .any(|socket| inputs.is_fed(&Endpoint::new(name, socket.as_str()), runnable))
    }

    fn unbreakable_cycles(&self, topology: &Topology) -> Vec<ValidationIssue> {
        topology
            .cycles()
            .filter(|members| {
                let inside: FxHashSet<&str> = members.iter().map(|m| m.as_ref()).collect();
                !self.edges().iter().any(|edge| {
                    inside.contains(edge.sender.component.as_ref())
                        && inside.contains(edge.receiver.component.as_ref())
                        && self
                            .output_socket(&edge.sender)
                            .is_ok_and(|socket| socket.conditional)
                })
            })
            .map(|members| ValidationIssue::UnbreakableCycle {
                components: members.iter().map(ToString::to_string).collect(),
            })
            .collect()
    }
}

/// Receiver endpoint → sending components
type Feeders<'a> = FxHashMap<&'a Endpoint, Vec<&'a Arc<str>>>;

struct InputSources<'a> {
    graph_inputs: &'a BTreeSet<Endpoint>,
    feeders: &'a Feeders<'a>,
}

impl InputSources<'_> {
    /// Fed by a graph input or by an edge from a runnable sender
    fn is_fed(&self, endpoint: &Endpoint, runnable: &FxHashSet<Arc<str>>) -> bool {
        self.graph_inputs.contains(endpoint)
            || self
                .feeders
                .get(endpoint)
                .is_some_and(|senders| senders.iter().any(|s| runnable.contains(*s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{InputSocket, OutputSocket, SocketType, SocketValues};

    fn stage(conditional: bool) -> ComponentDescriptor {
        let out = OutputSocket::new("y", SocketType::Int);
        ComponentDescriptor::builder("Stage")
            .input(InputSocket::required("x", SocketType::Int))
            .output(if conditional { out.conditional() } else { out })
            .blocking(|_| Ok(SocketValues::new()))
            .unwrap()
    }

    fn looping(conditional: bool) -> ComponentDescriptor {
        let out = OutputSocket::new("again", SocketType::Int);
        ComponentDescriptor::builder("Looping")
            .input(InputSocket::required("seed", SocketType::Int))
            .input(InputSocket::optional("feedback", SocketType::Int))
            .output(if conditional { out.conditional() } else { out })
            .blocking(|_| Ok(SocketValues::new()))
            .unwrap()
    }

    #[test]
    fn chain_with_implicit_input_is_valid() {
        let mut graph = Graph::new();
        graph.add_component("a", stage(false)).unwrap();
        graph.add_component("b", stage(false)).unwrap();
        graph.connect("a.y", "b.x").unwrap();
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn undeclared_required_input_is_unresolved() {
        let mut graph = Graph::new();
        graph.add_component("a", stage(false)).unwrap();
        graph.add_component("b", stage(false)).unwrap();
        graph.add_component("c", stage(false)).unwrap();
        graph.connect("a.y", "b.x").unwrap();
        graph.expose_input("a.x").unwrap();

        let err = graph.validate().unwrap_err();
        assert_eq!(err.unresolved_inputs(), vec![("c", "x")]);
    }

    #[test]
    fn cycle_without_entry_reports_all_members() {
        let mut graph = Graph::new();
        graph.add_component("a", stage(true)).unwrap();
        graph.add_component("b", stage(false)).unwrap();
        graph.connect("a.y", "b.x").unwrap();
        graph.connect("b.y", "a.x").unwrap();

        let err = graph.validate().unwrap_err();
        assert_eq!(err.unresolved_inputs(), vec![("a", "x"), ("b", "x")]);
    }

    #[test]
    fn cycle_with_conditional_edge_is_valid() {
        let mut graph = Graph::new();
        graph.add_component("l", looping(true)).unwrap();
        graph.add_component("p", stage(false)).unwrap();
        graph.connect("l.again", "p.x").unwrap();
        graph.connect("p.y", "l.feedback").unwrap();
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn cycle_without_conditional_edge_is_unbreakable() {
        let mut graph = Graph::new();
        graph.add_component("l", looping(false)).unwrap();
        graph.add_component("p", stage(false)).unwrap();
        graph.connect("l.again", "p.x").unwrap();
        graph.connect("p.y", "l.feedback").unwrap();

        match graph.validate().unwrap_err() {
            WaveError::ValidationFailed { issues } => {
                assert_eq!(
                    issues,
                    vec![ValidationIssue::UnbreakableCycle {
                        components: vec!["l".into(), "p".into()]
                    }]
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn optional_only_cycle_never_runs() {
        let node = || {
            ComponentDescriptor::builder("Node")
                .input(InputSocket::optional("x", SocketType::Int))
                .output(OutputSocket::new("y", SocketType::Int).conditional())
                .blocking(|_| Ok(SocketValues::new()))
                .unwrap()
        };
        let mut graph = Graph::new();
        graph.add_component("a", node()).unwrap();
        graph.add_component("b", node()).unwrap();
        graph.connect("a.y", "b.x").unwrap();
        graph.connect("b.y", "a.x").unwrap();

        match graph.validate().unwrap_err() {
            WaveError::ValidationFailed { issues } => {
                assert!(issues.contains(&ValidationIssue::NeverRuns { component: "a".into() }));
                assert!(issues.contains(&ValidationIssue::NeverRuns { component: "b".into() }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn long_chain_validates() {
        let len = 100_000;
        let mut graph = Graph::new();
        for i in 0..len {
            graph.add_component(&format!("s{i}"), stage(false)).unwrap();
        }
        for i in 1..len {
            graph.connect(&format!("s{}.y", i - 1), &format!("s{i}.x")).unwrap();
        }
        assert!(graph.validate().is_ok());

        graph.remove_component("s500").unwrap();
        graph.expose_input("s0.x").unwrap();
        let err = graph.validate().unwrap_err();
        let unresolved = err.unresolved_inputs();
        assert_eq!(unresolved.len(), len - 501);
        assert!(unresolved.contains(&("s501", "x")));
        assert!(!unresolved.contains(&("s499", "x")));
    }

    #[test]
    fn empty_graph_is_valid() {
        assert!(Graph::new().validate().is_ok());
    }
}
