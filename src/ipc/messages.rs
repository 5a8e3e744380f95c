//! Control message types for client ↔ accessory communication

use serde::{Deserialize, Serialize};

use crate::accessory::AccessorySnapshot;
use crate::inputs::Input;

/// Requests sent to the accessory
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ControlRequest {
    /// Write the Active characteristic
    SetActive(bool),

    /// Write the ActiveIdentifier characteristic
    SetActiveIdentifier(u32),

    /// Read current characteristic values
    GetState,

    /// Read the input source descriptors
    ListInputs,

    /// Health check
    Ping,
}

/// Responses sent back to the client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ControlResponse {
    State(AccessorySnapshot),

    Inputs(Vec<Input>),

    Pong,

    /// Acknowledgment that a write was applied
    Ready,

    Error(String),
}
