//! Mutable state of one run
//!
//! Owned by the run loop alone: firings get their inputs moved out before
//! dispatch and hand their outputs back after the barrier, so nothing here is
//! shared across tasks.

use std::collections::BTreeMap;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use smallvec::SmallVec;
use tracing::warn;

use crate::component::{ComponentDescriptor, SocketValues};
use crate::graph::Endpoint;

/// Values waiting at one input socket
#[derive(Debug, Default)]
struct InputSlot {
    /// Caller input to a socket no edge feeds; reused by every firing
    constant: Option<Value>,
    /// Values delivered since the last firing, in arrival order
    queued: SmallVec<[Value; 1]>,
}

#[derive(Debug)]
pub struct ExecutionContext {
    run_id: String,
    slots: FxHashMap<Arc<str>, BTreeMap<String, InputSlot>>,
    /// Components that received any caller input
    seeded: FxHashSet<Arc<str>>,
    fired_this_wave: FxHashSet<Arc<str>>,
    fire_counts: FxHashMap<Arc<str>, u32>,
    outputs: BTreeMap<Endpoint, Value>,
    wave: u32,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            slots: FxHashMap::default(),
            seeded: FxHashSet::default(),
            fired_this_wave: FxHashSet::default(),
            fire_counts: FxHashMap::default(),
            outputs: BTreeMap::new(),
            wave: 0,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Current wave, 0 before the first one starts
    pub fn wave(&self) -> u32 {
        self.wave
    }

    pub fn begin_wave(&mut self) -> u32 {
        self.wave += 1;
        self.fired_this_wave.clear();
        self.wave
    }

    fn slot(&mut self, endpoint: &Endpoint) -> &mut InputSlot {
        self.slots
            .entry(Arc::clone(&endpoint.component))
            .or_default()
            .entry(endpoint.socket.clone())
            .or_default()
    }

    /// Store a caller input that every firing of the component will see
    pub fn set_constant(&mut self, endpoint: &Endpoint, value: Value) {
        self.slot(endpoint).constant = Some(value);
        self.seeded.insert(Arc::clone(&endpoint.component));
    }

    /// Store a caller input that is consumed by the first firing
    pub fn seed(&mut self, endpoint: &Endpoint, value: Value, variadic: bool) {
        self.deliver(endpoint, value, variadic);
        self.seeded.insert(Arc::clone(&endpoint.component));
    }

    /// Queue a value at an input socket
    ///
    /// A non-variadic socket keeps only the newest value. Returns `true` when
    /// an unconsumed value was overwritten.
    pub fn deliver(&mut self, endpoint: &Endpoint, value: Value, variadic: bool) -> bool {
        let slot = self.slot(endpoint);
        if variadic || slot.queued.is_empty() {
            slot.queued.push(value);
            return false;
        }
        slot.queued.clear();
        slot.queued.push(value);
        warn!(socket = %endpoint, "unconsumed input replaced by a newer value");
        true
    }

    pub fn has_value(&self, component: &str, socket: &str) -> bool {
        self.slots
            .get(component)
            .and_then(|sockets| sockets.get(socket))
            .is_some_and(|slot| slot.constant.is_some() || !slot.queued.is_empty())
    }

    /// Has any value arrived since the component last fired?
    pub fn has_fresh(&self, component: &str) -> bool {
        self.slots
            .get(component)
            .is_some_and(|sockets| sockets.values().any(|slot| !slot.queued.is_empty()))
    }

    pub fn is_seeded(&self, component: &str) -> bool {
        self.seeded.contains(component)
    }

    pub fn fire_count(&self, component: &str) -> u32 {
        self.fire_counts.get(component).copied().unwrap_or(0)
    }

    pub fn fired_in_current_wave(&self, component: &str) -> bool {
        self.fired_this_wave.contains(component)
    }

    /// Consume the component's pending inputs for one firing
    ///
    /// Returns the input map and the 1-based firing number.
    pub fn take_inputs(&mut self, name: &Arc<str>, desc: &ComponentDescriptor) -> (SocketValues, u32) {
        let mut values = SocketValues::new();
        let mut sockets = self.slots.remove(name).unwrap_or_default();

        for socket in desc.input_sockets().values() {
            let slot = sockets.get_mut(&socket.name);
            let value = if socket.variadic {
                let items: Vec<Value> = slot
                    .map(|slot| {
                        slot.constant
                            .iter()
                            .cloned()
                            .chain(slot.queued.drain(..))
                            .collect()
                    })
                    .unwrap_or_default();
                if items.is_empty() {
                    socket.default.clone()
                } else {
                    Some(Value::Array(items))
                }
            } else {
                slot.and_then(|slot| slot.queued.pop().or_else(|| slot.constant.clone()))
                    .or_else(|| socket.default.clone())
            };
            if let Some(value) = value {
                values.insert(socket.name.clone(), value);
            }
        }

        // constants stay for the next firing; queued values are gone
        sockets.retain(|_, slot| slot.constant.is_some());
        if !sockets.is_empty() {
            self.slots.insert(Arc::clone(name), sockets);
        }

        self.fired_this_wave.insert(Arc::clone(name));
        let count = self.fire_counts.entry(Arc::clone(name)).or_insert(0);
        *count += 1;
        (values, *count)
    }

    pub fn record_output(&mut self, endpoint: Endpoint, value: Value) {
        self.outputs.insert(endpoint, value);
    }

    /// Latest value emitted on an output socket
    pub fn output(&self, endpoint: &Endpoint) -> Option<&Value> {
        self.outputs.get(endpoint)
    }

    pub fn outputs_of<'a>(&'a self, component: &'a str) -> impl Iterator<Item = (&'a Endpoint, &'a Value)> + 'a {
        self.outputs
            .iter()
            .filter(move |(endpoint, _)| &*endpoint.component == component)
    }

    pub fn fire_counts(&self) -> BTreeMap<String, u32> {
        self.fire_counts
            .iter()
            .map(|(name, count)| (name.to_string(), *count))
            .collect()
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}
