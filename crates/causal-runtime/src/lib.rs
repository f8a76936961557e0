#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]
//! # Causal Runtime - Layer 3: Processes and Snapshots
//!
//! Runs one process of a group as three cooperating tokio tasks:
//! - **InboundUnit**: polls the transport, routes markers to the snapshot
//!   coordinator and queues application messages
//! - **OutboundUnit**: stamps queued send requests with the vector clock and
//!   transmits them
//! - **ApplicationDriver**: executes the process script, applying received
//!   clocks and initiating snapshot rounds according to a [`SnapshotPolicy`]
//!
//! The units share one exclusion lock over the vector clock and the
//! Chandy-Lamport state, two [`BoundedQueue`]s and a [`ShutdownSignal`].
//!
//! ```rust,no_run
//! use causal_core::Scenario;
//! use causal_runtime::{policy_for, run_scenario, GlobalSnapshot, RuntimeConfig, TracingObserver};
//! use std::sync::Arc;
//!
//! # async fn example() -> causal_runtime::RuntimeResult<()> {
//! let scenario = Scenario::reference();
//! let reports = run_scenario(
//!     &scenario,
//!     RuntimeConfig::default(),
//!     policy_for(&scenario),
//!     Arc::new(TracingObserver),
//! )
//! .await?;
//! let global = GlobalSnapshot::assemble(scenario.processes, 1, &reports)?;
//! assert!(global.is_consistent());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod consistency;
pub mod error;
pub mod observer;
pub mod policy;
pub mod process;
pub mod queue;
pub mod runner;
pub mod shutdown;
pub mod snapshot;

mod coordinator;
mod units;

pub use config::RuntimeConfig;
pub use consistency::{ChannelMismatch, GlobalSnapshot};
pub use error::{RuntimeError, RuntimeResult};
pub use observer::{EventKind, EventRecord, NullObserver, Observer, Recorder, TracingObserver};
pub use policy::{policy_for, NoSnapshots, SnapshotPolicy};
pub use process::{DriverOutcome, ProcessBuilder, ProcessHandle, ProcessReport};
pub use queue::BoundedQueue;
pub use runner::run_scenario;
pub use shutdown::{ShutdownSignal, ShutdownToken};
pub use snapshot::{LocalSnapshot, RecordOutcome, SnapshotState};
