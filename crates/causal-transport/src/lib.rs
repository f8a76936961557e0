#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]
//! # Causal Transport - Layer 2: Point-to-Point Delivery
//!
//! Reliable, FIFO-per-ordered-pair delivery between the processes of a fixed
//! group. The runtime only depends on the [`Transport`] trait:
//! - `probe` reports, without waiting, which peer has a message pending
//! - `receive` takes the next message from one peer
//! - `send` hands a message to the link towards its destination
//!
//! Two implementations are provided:
//! - [`MemoryNetwork`] / [`MemoryTransport`]: every process in one address space
//! - [`TcpTransport`]: one OS process per rank, connected in a full mesh

pub mod codec;
pub mod error;
pub mod memory;
pub mod tcp;
pub mod traits;

mod inbox;

pub use error::{TransportError, TransportResult};
pub use memory::{MemoryNetwork, MemoryTransport};
pub use tcp::{TcpConfig, TcpTransport};
pub use traits::Transport;
