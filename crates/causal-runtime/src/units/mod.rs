//! The three execution units of a process.

mod driver;
mod inbound;
mod outbound;

pub(crate) use driver::ApplicationDriver;
pub(crate) use inbound::InboundUnit;
pub(crate) use outbound::OutboundUnit;

use causal_core::ProcessId;

/// A send instruction handed from the driver to the outbound unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SendRequest {
    /// Position of the instruction in the script
    pub(crate) index: usize,
    /// Event label, carried by the message
    pub(crate) label: String,
    /// Destination process
    pub(crate) to: ProcessId,
    /// Label of the matching receive at the destination
    pub(crate) peer_label: String,
}
