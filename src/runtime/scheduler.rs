//! Readiness, deferral, limits and value routing
//!
//! A component is ready when every required input holds a value and either
//! - a value arrived since it last fired, or
//! - it never fired and nothing else can wake it: no incoming edges, or
//!   the caller handed it inputs directly.
//!
//! A ready component with a variadic input fed by edges waits while another
//! ready component outside its cycle can still reach it, so the list it
//! receives is complete.

use std::collections::BTreeMap;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::{ExecutionContext, RunConfig};
use crate::component::{ComponentDescriptor, SocketValues};
use crate::error::{ComponentError, Result, WaveError};
use crate::graph::{Endpoint, Graph, Topology};

/// Receivers of one output socket, with their variadic flag
type Route = SmallVec<[(Endpoint, bool); 2]>;

/// Scheduling tables of one graph, built once and shared by every run
#[derive(Debug)]
pub struct Schedule {
    topology: Topology,
    /// Components with at least one incoming edge
    edge_fed: FxHashSet<Arc<str>>,
    /// Component with a variadic socket fed by edges → components outside
    /// its cycle that can reach it
    upstream: FxHashMap<Arc<str>, FxHashSet<Arc<str>>>,
    routes: FxHashMap<Endpoint, Route>,
}

impl Schedule {
    pub fn new(graph: &Graph) -> Self {
        let mut edge_fed = FxHashSet::default();
        let mut gathering = FxHashSet::default();
        let mut routes: FxHashMap<Endpoint, Route> = FxHashMap::default();

        for edge in graph.edges() {
            let variadic = graph
                .input_socket(&edge.receiver)
                .is_ok_and(|socket| socket.variadic);
            edge_fed.insert(Arc::clone(&edge.receiver.component));
            if variadic {
                gathering.insert(Arc::clone(&edge.receiver.component));
            }
            routes
                .entry(edge.sender.clone())
                .or_default()
                .push((edge.receiver.clone(), variadic));
        }

        let topology = Topology::from_graph(graph);
        let upstream = gathering
            .into_iter()
            .map(|name: Arc<str>| {
                let reach = topology.upstream(&name);
                (name, reach)
            })
            .collect();

        Self {
            topology,
            edge_fed,
            upstream,
            routes,
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }
}

pub struct Scheduler<'g> {
    graph: &'g Graph,
    schedule: &'g Schedule,
}

impl<'g> Scheduler<'g> {
    pub fn new(graph: &'g Graph, schedule: &'g Schedule) -> Self {
        Self { graph, schedule }
    }

    /// Check caller inputs and load them into the context
    ///
    /// Inputs to sockets no edge feeds become constants for the whole run;
    /// inputs to edge-fed sockets are consumed by the first firing.
    pub fn seed(&self, ctx: &mut ExecutionContext, inputs: BTreeMap<String, Value>) -> Result<()> {
        let graph_inputs = self.graph.input_endpoints();

        for (key, value) in inputs {
            let invalid = |reason: String| WaveError::InvalidRunInput {
                socket: key.clone(),
                reason,
            };
            let endpoint = Endpoint::parse(&key)
                .map_err(|_| invalid("expected 'component.socket'".to_string()))?;
            let socket = self
                .graph
                .input_socket(&endpoint)
                .map_err(|e| invalid(e.to_string()))?;
            if !graph_inputs.contains(&endpoint) {
                return Err(invalid("not a graph input".to_string()));
            }
            if !socket.ty.accepts(&value) {
                return Err(invalid(format!("expected {}, got {}", socket.ty, value)));
            }

            if self.graph.has_incoming(&endpoint.component, &endpoint.socket) {
                ctx.seed(&endpoint, value, socket.variadic);
            } else {
                ctx.set_constant(&endpoint, value);
            }
        }

        for endpoint in &graph_inputs {
            let Ok(socket) = self.graph.input_socket(endpoint) else {
                continue;
            };
            let unfed = !self.graph.has_incoming(&endpoint.component, &endpoint.socket);
            if socket.required && unfed && !ctx.has_value(&endpoint.component, &endpoint.socket) {
                return Err(WaveError::MissingRunInput {
                    socket: endpoint.to_string(),
                });
            }
        }
        Ok(())
    }

    fn is_ready(&self, name: &Arc<str>, desc: &ComponentDescriptor, ctx: &ExecutionContext) -> bool {
        let filled = desc
            .required_inputs()
            .all(|socket| ctx.has_value(name, &socket.name));
        if !filled {
            return false;
        }
        ctx.has_fresh(name)
            || (ctx.fire_count(name) == 0 && (!self.schedule.edge_fed.contains(name) || ctx.is_seeded(name)))
    }

    /// Components to fire in the next wave, in name order
    pub fn ready_set(&self, ctx: &ExecutionContext) -> Vec<Arc<str>> {
        let candidates: Vec<Arc<str>> = self
            .graph
            .components()
            .filter(|(name, desc)| self.is_ready(name, desc, ctx))
            .map(|(name, _)| Arc::clone(name))
            .collect();

        candidates
            .iter()
            .filter(|name| {
                let Some(upstream) = self.schedule.upstream.get(*name) else {
                    return true;
                };
                let blocked_by = candidates.iter().find(|other| upstream.contains(*other));
                if let Some(upstream) = blocked_by {
                    trace!(component = %name, upstream = %upstream, "deferred until upstream settles");
                    return false;
                }
                true
            })
            .cloned()
            .collect()
    }

    /// Fail if any ready component already used up its iterations
    pub fn check_limits(
        &self,
        ready: &[Arc<str>],
        ctx: &ExecutionContext,
        config: &RunConfig,
        wave: u32,
    ) -> Result<()> {
        for name in ready {
            let count = ctx.fire_count(name);
            let limit = config.limit_for(name);
            if count >= limit {
                return Err(WaveError::MaxIterationsExceeded {
                    component: name.to_string(),
                    count,
                    limit,
                    wave,
                });
            }
        }
        Ok(())
    }

    /// Every emitted socket must be declared and hold a value of its type
    pub fn check_outputs(&self, name: &str, outputs: &SocketValues) -> std::result::Result<(), ComponentError> {
        let Some(desc) = self.graph.component(name) else {
            return Err(ComponentError::new(format!("unknown component '{}'", name)));
        };
        for (socket, value) in outputs {
            let declared = desc.output(socket).ok_or_else(|| {
                ComponentError::new(format!("emitted undeclared output socket '{}'", socket))
            })?;
            if !declared.ty.accepts(value) {
                return Err(ComponentError::new(format!(
                    "output '{}' expected {}, got {}",
                    socket, declared.ty, value
                )));
            }
        }
        Ok(())
    }

    /// Record a firing's outputs and deliver them along every outgoing edge
    pub fn publish(&self, ctx: &mut ExecutionContext, name: &Arc<str>, outputs: SocketValues) {
        for (socket, value) in outputs {
            let sender = Endpoint {
                component: Arc::clone(name),
                socket,
            };
            if let Some(receivers) = self.schedule.routes.get(&sender) {
                for (receiver, variadic) in receivers {
                    debug!(from = %sender, to = %receiver, "deliver");
                    ctx.deliver(receiver, value.clone(), *variadic);
                }
            }
            ctx.record_output(sender, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{InputSocket, OutputSocket, SocketType};
    use serde_json::json;

    fn stage() -> ComponentDescriptor {
        ComponentDescriptor::builder("Stage")
            .input(InputSocket::required("x", SocketType::Int))
            .output(OutputSocket::new("y", SocketType::Int))
            .blocking(|_| Ok(SocketValues::new()))
            .unwrap()
    }

    fn source() -> ComponentDescriptor {
        ComponentDescriptor::builder("Source")
            .output(OutputSocket::new("y", SocketType::Int))
            .blocking(|_| Ok(SocketValues::new()))
            .unwrap()
    }

    fn joiner() -> ComponentDescriptor {
        ComponentDescriptor::builder("Join")
            .input(InputSocket::required("x", SocketType::Int).variadic())
            .output(OutputSocket::new("y", SocketType::list(SocketType::Int)))
            .blocking(|_| Ok(SocketValues::new()))
            .unwrap()
    }

    fn names(ready: &[Arc<str>]) -> Vec<&str> {
        ready.iter().map(|n| n.as_ref()).collect()
    }

    #[test]
    fn sources_fire_once() {
        let mut graph = Graph::new();
        graph.add_component("a", source()).unwrap();
        graph.add_component("b", stage()).unwrap();
        graph.connect("a.y", "b.x").unwrap();
        let schedule = Schedule::new(&graph);
        let scheduler = Scheduler::new(&graph, &schedule);
        let mut ctx = ExecutionContext::new();
        scheduler.seed(&mut ctx, BTreeMap::new()).unwrap();

        assert_eq!(names(&scheduler.ready_set(&ctx)), vec!["a"]);
        ctx.take_inputs(&"a".into(), graph.component("a").unwrap());
        scheduler.publish(&mut ctx, &"a".into(), SocketValues::from([("y".into(), json!(1))]));

        assert_eq!(names(&scheduler.ready_set(&ctx)), vec!["b"]);
    }

    #[test]
    fn seed_validates_inputs() {
        let mut graph = Graph::new();
        graph.add_component("a", stage()).unwrap();
        let schedule = Schedule::new(&graph);
        let scheduler = Scheduler::new(&graph, &schedule);

        let err = scheduler
            .seed(&mut ExecutionContext::new(), BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, WaveError::MissingRunInput { ref socket } if socket == "a.x"));

        let err = scheduler
            .seed(&mut ExecutionContext::new(), BTreeMap::from([("a.x".to_string(), json!("one"))]))
            .unwrap_err();
        assert!(matches!(err, WaveError::InvalidRunInput { .. }));

        let err = scheduler
            .seed(&mut ExecutionContext::new(), BTreeMap::from([("a.z".to_string(), json!(1))]))
            .unwrap_err();
        assert!(matches!(err, WaveError::InvalidRunInput { .. }));

        let err = scheduler
            .seed(&mut ExecutionContext::new(), BTreeMap::from([("ax".to_string(), json!(1))]))
            .unwrap_err();
        assert!(matches!(err, WaveError::InvalidRunInput { .. }));

        let mut ctx = ExecutionContext::new();
        scheduler
            .seed(&mut ctx, BTreeMap::from([("a.x".to_string(), json!(1))]))
            .unwrap();
        assert_eq!(names(&scheduler.ready_set(&ctx)), vec!["a"]);
    }

    #[test]
    fn variadic_receiver_waits_for_upstream() {
        // a → b → join, a → join
        let mut graph = Graph::new();
        graph.add_component("a", source()).unwrap();
        graph.add_component("b", stage()).unwrap();
        graph.add_component("join", joiner()).unwrap();
        graph.connect("a.y", "b.x").unwrap();
        graph.connect("a.y", "join.x").unwrap();
        graph.connect("b.y", "join.x").unwrap();

        let schedule = Schedule::new(&graph);
        let scheduler = Scheduler::new(&graph, &schedule);
        let mut ctx = ExecutionContext::new();
        let a: Arc<str> = "a".into();
        ctx.take_inputs(&a, graph.component("a").unwrap());
        scheduler.publish(&mut ctx, &a, SocketValues::from([("y".into(), json!(1))]));

        // join has a value but b can still reach it
        assert_eq!(names(&scheduler.ready_set(&ctx)), vec!["b"]);
    }

    #[test]
    fn limits_are_checked_before_firing() {
        let mut graph = Graph::new();
        graph.add_component("a", source()).unwrap();
        let schedule = Schedule::new(&graph);
        let scheduler = Scheduler::new(&graph, &schedule);
        let mut ctx = ExecutionContext::new();
        let config = RunConfig::default().with_max_iterations(1);
        let a: Arc<str> = "a".into();

        assert!(scheduler.check_limits(&[Arc::clone(&a)], &ctx, &config, 1).is_ok());
        ctx.take_inputs(&a, graph.component("a").unwrap());
        let err = scheduler
            .check_limits(&[a], &ctx, &config, 2)
            .unwrap_err();
        assert!(matches!(err, WaveError::MaxIterationsExceeded { count: 1, limit: 1, wave: 2, .. }));
    }

    #[test]
    fn outputs_must_be_declared_and_typed() {
        let mut graph = Graph::new();
        graph.add_component("a", source()).unwrap();
        let schedule = Schedule::new(&graph);
        let scheduler = Scheduler::new(&graph, &schedule);
        assert!(scheduler
            .check_outputs("a", &SocketValues::from([("y".into(), json!(1))]))
            .is_ok());
        assert!(scheduler
            .check_outputs("a", &SocketValues::from([("z".into(), json!(1))]))
            .is_err());
        assert!(scheduler
            .check_outputs("a", &SocketValues::from([("y".into(), json!("s"))]))
            .is_err());
    }
}
