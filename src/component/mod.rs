//! Component Module - typed units of work and their sockets
//!
//! - `types`: socket type expressions and compatibility
//! - `socket`: input/output socket descriptors
//! - `descriptor`: the component traits and the frozen descriptor
//! - `function`: closure-backed components
//! - `builtin`: Constant, PassThrough, ListJoiner
//! - `registry`: type name → factory, for deserialization

pub mod builtin;
mod descriptor;
mod function;
mod registry;
mod socket;
mod types;

pub use builtin::{Constant, ListJoiner, PassThrough};
pub use descriptor::{
    BlockingComponent, Component, ComponentDescriptor, ExecutionKind, RunCapability,
    SuspendingComponent,
};
pub use function::ComponentBuilder;
pub use registry::{ComponentFactory, ComponentRegistry};
pub use socket::{InputSocket, OutputSocket, SocketDirection, SocketValues};
pub use types::SocketType;
