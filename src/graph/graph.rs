//! Graph construction
//!
//! Every mutating call checks all its preconditions before touching state, so
//! an `Err` always leaves the graph unchanged.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use super::{Edge, Endpoint};
use crate::component::{ComponentDescriptor, InputSocket, OutputSocket, SocketDirection};
use crate::error::{Result, WaveError};
use crate::util::{intern, validate_component_name};

/// Named components wired together by typed edges
///
/// Build it once with `add_component` / `connect`, validate it, then reuse it
/// for any number of runs.
#[derive(Clone, Default)]
pub struct Graph {
    components: BTreeMap<Arc<str>, Arc<ComponentDescriptor>>,
    /// Insertion order, preserved by serialization
    edges: Vec<Edge>,
    index: EdgeIndex,
    declared_inputs: BTreeSet<Endpoint>,
    declared_outputs: BTreeSet<Endpoint>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════
    // COMPONENTS
    // ═══════════════════════════════════════════

    pub fn add_component(&mut self, name: &str, descriptor: ComponentDescriptor) -> Result<()> {
        validate_component_name(name)?;
        if self.components.contains_key(name) {
            return Err(WaveError::DuplicateName {
                name: name.to_string(),
            });
        }
        debug!(component = name, type_name = descriptor.type_name(), "component added");
        self.components.insert(intern(name), Arc::new(descriptor));
        Ok(())
    }

    /// Remove a component with every edge and exposed socket that touches it
    pub fn remove_component(&mut self, name: &str) -> Result<Arc<ComponentDescriptor>> {
        let descriptor = self
            .components
            .remove(name)
            .ok_or_else(|| WaveError::ComponentNotFound {
                name: name.to_string(),
            })?;
        self.edges.retain(|edge| !edge.touches(name));
        self.index = EdgeIndex::from_edges(&self.edges);
        self.declared_inputs.retain(|ep| &*ep.component != name);
        self.declared_outputs.retain(|ep| &*ep.component != name);
        debug!(component = name, "component removed");
        Ok(descriptor)
    }

    pub fn component(&self, name: &str) -> Option<&ComponentDescriptor> {
        self.components.get(name).map(Arc::as_ref)
    }

    pub(crate) fn component_arc(&self, name: &str) -> Option<&Arc<ComponentDescriptor>> {
        self.components.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    /// Component names in lexicographic order
    pub fn component_names(&self) -> impl Iterator<Item = &Arc<str>> {
        self.components.keys()
    }

    pub fn components(&self) -> impl Iterator<Item = (&Arc<str>, &ComponentDescriptor)> {
        self.components.iter().map(|(name, desc)| (name, desc.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    fn require_component(&self, name: &str) -> Result<&ComponentDescriptor> {
        self.component(name).ok_or_else(|| WaveError::ComponentNotFound {
            name: name.to_string(),
        })
    }

    pub(crate) fn input_socket(&self, endpoint: &Endpoint) -> Result<&InputSocket> {
        self.require_component(&endpoint.component)?
            .input(&endpoint.socket)
            .ok_or_else(|| WaveError::SocketNotFound {
                component: endpoint.component.to_string(),
                socket: endpoint.socket.clone(),
                direction: SocketDirection::Input,
            })
    }

    pub(crate) fn output_socket(&self, endpoint: &Endpoint) -> Result<&OutputSocket> {
        self.require_component(&endpoint.component)?
            .output(&endpoint.socket)
            .ok_or_else(|| WaveError::SocketNotFound {
                component: endpoint.component.to_string(),
                socket: endpoint.socket.clone(),
                direction: SocketDirection::Output,
            })
    }

    // ═══════════════════════════════════════════
    // EDGES
    // ═══════════════════════════════════════════

    /// Connect `"sender.socket"` to `"receiver.socket"`
    pub fn connect(&mut self, sender: &str, receiver: &str) -> Result<()> {
        let sender = Endpoint::parse(sender)?;
        let receiver = Endpoint::parse(receiver)?;
        self.connect_endpoints(sender, receiver)
    }

    pub fn connect_endpoints(&mut self, sender: Endpoint, receiver: Endpoint) -> Result<()> {
        let out = self.output_socket(&sender)?;
        let input = self.input_socket(&receiver)?;

        if !out.ty.is_compatible_with(&input.ty) {
            return Err(WaveError::TypeMismatch {
                sender: sender.to_string(),
                sender_type: out.ty.to_string(),
                receiver: receiver.to_string(),
                receiver_type: input.ty.to_string(),
            });
        }

        let edge = Edge::new(sender, receiver);
        if self.index.edges.contains(&edge) {
            return Err(WaveError::DuplicateEdge {
                sender: edge.sender.to_string(),
                receiver: edge.receiver.to_string(),
            });
        }

        if !input.variadic && self.has_incoming(&edge.receiver.component, &edge.receiver.socket) {
            let existing = self
                .incoming(&edge.receiver)
                .next()
                .map(|e| e.sender.to_string())
                .unwrap_or_default();
            return Err(WaveError::Cardinality {
                receiver: edge.receiver.to_string(),
                existing,
            });
        }

        debug!(edge = %edge, "connected");
        self.index.insert(&edge);
        self.edges.push(edge);
        Ok(())
    }

    /// Connect two components by inferring the socket pair
    ///
    /// Picks the only type-compatible pair whose receiver can still take an
    /// edge. When several pairs fit, a pair with matching socket names wins
    /// if it is unique.
    pub fn connect_components(&mut self, sender: &str, receiver: &str) -> Result<Edge> {
        let sender_desc = self.require_component(sender)?;
        let receiver_desc = self.require_component(receiver)?;

        let mut candidates: Vec<(String, String)> = Vec::new();
        for out in sender_desc.output_sockets().values() {
            for input in receiver_desc.input_sockets().values() {
                if !out.ty.is_compatible_with(&input.ty) {
                    continue;
                }
                let receiver_ep = Endpoint::new(receiver, input.name.as_str());
                if !input.variadic && self.has_incoming(receiver, &input.name) {
                    continue;
                }
                let edge = Edge::new(Endpoint::new(sender, out.name.as_str()), receiver_ep);
                if self.index.edges.contains(&edge) {
                    continue;
                }
                candidates.push((out.name.clone(), input.name.clone()));
            }
        }

        if candidates.len() > 1 {
            let same_name: Vec<(String, String)> =
                candidates.iter().filter(|(o, i)| o == i).cloned().collect();
            if same_name.len() == 1 {
                candidates = same_name;
            }
        }

        let ambiguous = |reason: String| WaveError::AmbiguousConnection {
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            reason,
        };

        match candidates.as_slice() {
            [] => Err(ambiguous("no free type-compatible socket pair".to_string())),
            [(out, input)] => {
                let edge = Edge::new(
                    Endpoint::new(sender, out.as_str()),
                    Endpoint::new(receiver, input.as_str()),
                );
                self.connect_endpoints(edge.sender.clone(), edge.receiver.clone())?;
                Ok(edge)
            }
            many => Err(ambiguous(format!(
                "{} candidate pairs ({})",
                many.len(),
                many.iter()
                    .map(|(o, i)| format!("{}.{} → {}.{}", sender, o, receiver, i))
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }

    /// All edges in insertion order
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edges feeding one input socket
    pub fn incoming<'a>(&'a self, receiver: &'a Endpoint) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |edge| edge.receiver == *receiver)
    }

    /// Edges leaving a component, across all of its output sockets
    pub fn outgoing<'a>(&'a self, component: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges
            .iter()
            .filter(move |edge| &*edge.sender.component == component)
    }

    pub fn has_incoming(&self, component: &str, socket: &str) -> bool {
        self.index
            .fed
            .get(component)
            .is_some_and(|sockets| sockets.contains(socket))
    }

    /// Does any edge end at this component?
    pub fn has_any_incoming(&self, component: &str) -> bool {
        self.index.fed.contains_key(component)
    }

    /// Does any edge leave this output socket?
    pub fn has_outgoing(&self, component: &str, socket: &str) -> bool {
        self.index
            .used
            .get(component)
            .is_some_and(|sockets| sockets.contains(socket))
    }

    // ═══════════════════════════════════════════
    // GRAPH-LEVEL SOCKETS
    // ═══════════════════════════════════════════

    /// Declare an input socket as a graph input
    ///
    /// Once any input is declared, only declared inputs accept run values.
    pub fn expose_input(&mut self, endpoint: &str) -> Result<()> {
        let endpoint = Endpoint::parse(endpoint)?;
        self.input_socket(&endpoint)?;
        self.declared_inputs.insert(endpoint);
        Ok(())
    }

    /// Declare an output socket as a graph output
    ///
    /// Once any output is declared, only declared outputs are returned.
    pub fn expose_output(&mut self, endpoint: &str) -> Result<()> {
        let endpoint = Endpoint::parse(endpoint)?;
        self.output_socket(&endpoint)?;
        self.declared_outputs.insert(endpoint);
        Ok(())
    }

    pub fn has_declared_inputs(&self) -> bool {
        !self.declared_inputs.is_empty()
    }

    pub(crate) fn declared_inputs(&self) -> &BTreeSet<Endpoint> {
        &self.declared_inputs
    }

    pub(crate) fn declared_outputs(&self) -> &BTreeSet<Endpoint> {
        &self.declared_outputs
    }

    /// Graph inputs: the declared ones, or every input socket without an incoming edge
    pub fn input_endpoints(&self) -> BTreeSet<Endpoint> {
        if !self.declared_inputs.is_empty() {
            return self.declared_inputs.clone();
        }
        let mut endpoints = BTreeSet::new();
        for (name, desc) in &self.components {
            for socket in desc.input_sockets().keys() {
                if !self.has_incoming(name, socket) {
                    endpoints.insert(Endpoint::new(name, socket.as_str()));
                }
            }
        }
        endpoints
    }

    /// Graph outputs: the declared ones, or every output socket without an outgoing edge
    pub fn output_endpoints(&self) -> BTreeSet<Endpoint> {
        if !self.declared_outputs.is_empty() {
            return self.declared_outputs.clone();
        }
        let mut endpoints = BTreeSet::new();
        for (name, desc) in &self.components {
            for socket in desc.output_sockets().keys() {
                if !self.has_outgoing(name, socket) {
                    endpoints.insert(Endpoint::new(name, socket.as_str()));
                }
            }
        }
        endpoints
    }

    /// Graph-level input sockets, grouped by component
    pub fn inputs(&self) -> BTreeMap<String, BTreeMap<String, InputSocket>> {
        let mut map: BTreeMap<String, BTreeMap<String, InputSocket>> = BTreeMap::new();
        for endpoint in self.input_endpoints() {
            if let Ok(socket) = self.input_socket(&endpoint) {
                map.entry(endpoint.component.to_string())
                    .or_default()
                    .insert(endpoint.socket.clone(), socket.clone());
            }
        }
        map
    }

    /// Graph-level output sockets, grouped by component
    pub fn outputs(&self) -> BTreeMap<String, BTreeMap<String, OutputSocket>> {
        let mut map: BTreeMap<String, BTreeMap<String, OutputSocket>> = BTreeMap::new();
        for endpoint in self.output_endpoints() {
            if let Ok(socket) = self.output_socket(&endpoint) {
                map.entry(endpoint.component.to_string())
                    .or_default()
                    .insert(endpoint.socket.clone(), socket.clone());
            }
        }
        map
    }
}

/// Lookup tables over `Graph::edges`, kept in step by every mutation
#[derive(Clone, Default)]
struct EdgeIndex {
    edges: FxHashSet<Edge>,
    /// Receiving component → input sockets with at least one edge
    fed: FxHashMap<Arc<str>, FxHashSet<String>>,
    /// Sending component → output sockets with at least one edge
    used: FxHashMap<Arc<str>, FxHashSet<String>>,
}

impl EdgeIndex {
    fn from_edges(edges: &[Edge]) -> Self {
        let mut index = Self::default();
        for edge in edges {
            index.insert(edge);
        }
        index
    }

    fn insert(&mut self, edge: &Edge) {
        self.edges.insert(edge.clone());
        self.fed
            .entry(Arc::clone(&edge.receiver.component))
            .or_default()
            .insert(edge.receiver.socket.clone());
        self.used
            .entry(Arc::clone(&edge.sender.component))
            .or_default()
            .insert(edge.sender.socket.clone());
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .field(
                "edges",
                &self.edges.iter().map(ToString::to_string).collect::<Vec<_>>(),
            )
            .finish()
    }
}
