//! Graph Module - construction, analysis, validation, serialization
//!
//! - `endpoint`: `component.socket` parsing, edges
//! - `graph`: the mutable graph with atomic add/connect/remove
//! - `analysis`: component topology (reachability, SCCs)
//! - `validate`: unresolved inputs and unbreakable cycles
//! - `serial`: `wavegraph/graph@1` documents

mod analysis;
mod endpoint;
#[allow(clippy::module_inception)]
mod graph;
mod serial;
mod validate;

pub use analysis::{NeighborVec, Topology};
pub use endpoint::{Edge, Endpoint};
pub use graph::Graph;
pub use serial::{ComponentSpec, ConnectionSpec, GraphSpec, GRAPH_SCHEMA};
