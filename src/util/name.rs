//! Identifier rules shared by component names and socket names

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, WaveError};

/// `^[A-Za-z_][A-Za-z0-9_]*$`
static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex is valid")
});

#[inline]
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

pub fn validate_component_name(name: &str) -> Result<()> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(WaveError::InvalidComponentName {
            name: name.to_string(),
        })
    }
}

/// `component` is the declaring component type, used for the error only
pub fn validate_socket_name(component: &str, socket: &str) -> Result<()> {
    if is_valid_identifier(socket) {
        Ok(())
    } else {
        Err(WaveError::InvalidSocketName {
            component: component.to_string(),
            socket: socket.to_string(),
        })
    }
}
