//! `component.socket` endpoints and the edges between them

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::WaveError;
use crate::util::intern;

/// One side of a connection: a component name and one of its sockets
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Endpoint {
    pub component: Arc<str>,
    pub socket: String,
}

impl Endpoint {
    pub fn new(component: &str, socket: impl Into<String>) -> Self {
        Self {
            component: intern(component),
            socket: socket.into(),
        }
    }

    /// Parse `"component.socket"`; both halves must be non-empty
    ///
    /// Splits at the first dot, so the socket half must not contain one
    /// either.
    pub fn parse(endpoint: &str) -> Result<Self, WaveError> {
        let malformed = || WaveError::MalformedEndpoint {
            endpoint: endpoint.to_string(),
        };
        let (component, socket) = endpoint.split_once('.').ok_or_else(malformed)?;
        if component.is_empty() || socket.is_empty() || socket.contains('.') {
            return Err(malformed());
        }
        Ok(Self::new(component, socket))
    }
}

impl FromStr for Endpoint {
    type Err = WaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.socket)
    }
}

/// Directed connection from an output socket to an input socket
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub sender: Endpoint,
    pub receiver: Endpoint,
}

impl Edge {
    pub fn new(sender: Endpoint, receiver: Endpoint) -> Self {
        Self { sender, receiver }
    }

    pub fn touches(&self, component: &str) -> bool {
        &*self.sender.component == component || &*self.receiver.component == component
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.sender, self.receiver)
    }
}
