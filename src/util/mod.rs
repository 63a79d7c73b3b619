//! Utilities Module - shared infrastructure
//!
//! - `interner`: Component-name interning (Arc<str> deduplication)
//! - `name`: Identifier rules for component and socket names

mod interner;
mod name;

pub use interner::{intern, Interner};
pub use name::{is_valid_identifier, validate_component_name, validate_socket_name};
