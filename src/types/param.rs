//! Onboard parameter values

use serde::{Deserialize, Serialize};

/// Maximum parameter name length on the wire.
pub const PARAM_ID_LEN: usize = 16;

/// MAV_PARAM_TYPE_REAL32
pub const PARAM_TYPE_REAL32: u8 = 9;

/// A single onboard parameter as exchanged with the vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamEntry {
    /// Parameter name, at most 16 ASCII characters
    pub id: String,
    pub value: f32,
    /// MAV_PARAM_TYPE code
    pub param_type: u8,
    pub index: u16,
}

impl ParamEntry {
    /// A REAL32 parameter for writing; the index is ignored by PARAM_SET.
    pub fn real32(id: impl Into<String>, value: f32) -> Self {
        Self { id: id.into(), value, param_type: PARAM_TYPE_REAL32, index: u16::MAX }
    }
}
