#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]
//! # Causal Core - Layer 1: Clocks, Messages and Scripts
//!
//! Pure data types shared by every other crate in the workspace:
//! - `VectorClock` causal timestamps and their partial order
//! - `Message` envelopes exchanged between processes (NORMAL and MARKER)
//! - `Instruction` / `Script` / `Scenario` values describing what each
//!   process does, including the reference three-process trace
//!
//! Nothing in this crate performs I/O or spawns tasks.

pub mod clock;
pub mod errors;
pub mod identifiers;
pub mod message;
pub mod scenario;

pub use clock::{CausalOrder, VectorClock};
pub use errors::{CoreError, CoreResult};
pub use identifiers::ProcessId;
pub use message::{Message, MessageKind};
pub use scenario::{Instruction, Scenario, Script, SnapshotTrigger};
