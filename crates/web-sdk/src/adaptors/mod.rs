//! Adaptors for translating canonical hits into backend command protocols.
//!
//! Each adaptor implements [`CommandAdaptor`] to turn a [`HitDescriptor`]
//! into the commands its backend understands and to hand those commands to
//! the backend (a global function for the modern protocol, a command queue
//! for the legacy one).

pub mod legacy;
pub mod modern;

use ga_bridge_core::{BridgeResult, Command, Settings};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::events::HitDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Modern,
    Legacy,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protocol::Modern => "modern",
            Protocol::Legacy => "legacy",
        })
    }
}

/// Renders hits as protocol-native commands and delivers them.
pub trait CommandAdaptor: Send + Sync {
    fn protocol(&self) -> Protocol;

    /// Render one hit as zero or more unprefixed commands. Settings are the
    /// values current at the moment of the call.
    fn translate(&self, hit: &HitDescriptor, settings: &Settings) -> BridgeResult<Vec<Command>>;

    /// Hand one command to the backend. Fire-and-forget.
    fn dispatch(&self, command: Command);
}
