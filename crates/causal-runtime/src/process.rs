//! Process bootstrap and shutdown.
//!
//! A process is three tokio tasks sharing one [`ProcessContext`]:
//! - the inbound unit drains the transport and routes markers
//! - the outbound unit stamps and transmits send requests
//! - the application driver executes the script
//!
//! The driver signals shutdown when its script ends; the other two units
//! observe the signal and exit. [`ProcessHandle::join`] waits for all three
//! and returns the process report or the first fatal error.

use crate::config::RuntimeConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::observer::{EventRecord, NullObserver, Observer, Recorder};
use crate::policy::{NoSnapshots, SnapshotPolicy};
use crate::queue::BoundedQueue;
use crate::shutdown::ShutdownSignal;
use crate::snapshot::{LocalSnapshot, SnapshotState};
use crate::units::{ApplicationDriver, InboundUnit, OutboundUnit, SendRequest};
use causal_core::{CoreError, Message, ProcessId, Script, VectorClock};
use causal_transport::Transport;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// State guarded by the process exclusion lock.
#[derive(Debug)]
pub(crate) struct ProcessState {
    pub(crate) clock: VectorClock,
    pub(crate) snapshot: SnapshotState,
    /// NORMAL messages handed to the inbound queue but not yet applied by
    /// the driver, as (sender, label), in arrival order
    pub(crate) undelivered: VecDeque<(ProcessId, String)>,
}

/// Everything the three units of one process share.
pub(crate) struct ProcessContext {
    pub(crate) id: ProcessId,
    pub(crate) processes: usize,
    pub(crate) config: RuntimeConfig,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) state: Mutex<ProcessState>,
    /// Held while stamping and transmitting a NORMAL message, and while
    /// recording local state and broadcasting markers
    pub(crate) send_gate: tokio::sync::Mutex<()>,
    pub(crate) inbox: BoundedQueue<Message>,
    pub(crate) outbox: BoundedQueue<SendRequest>,
    pub(crate) shutdown: ShutdownSignal,
    pub(crate) policy: Arc<dyn SnapshotPolicy>,
    observer: Arc<dyn Observer>,
    recorder: Recorder,
}

impl ProcessContext {
    /// Current clock, copied under the lock.
    pub(crate) fn clock(&self) -> VectorClock {
        self.state.lock().clock.clone()
    }

    pub(crate) fn emit_event(&self, record: EventRecord) {
        debug!(process = %self.id, clock = %record.clock, "{record}");
        self.recorder.on_event(&record);
        self.observer.on_event(&record);
    }

    pub(crate) fn emit_snapshot(&self, snapshot: LocalSnapshot) {
        info!(
            process = %self.id,
            round = snapshot.round,
            recorded = %snapshot.recorded_clock,
            "Snapshot round complete"
        );
        self.recorder.on_snapshot(&snapshot);
        self.observer.on_snapshot(&snapshot);
    }
}

/// Result of the application driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DriverOutcome {
    /// Instructions executed
    pub executed: usize,
    /// False if the process stopped before the script ended
    pub completed: bool,
}

/// What a process did, collected when it stops.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessReport {
    /// Reporting process
    pub process: ProcessId,
    /// True if the whole script ran
    pub completed: bool,
    /// Instructions executed by the driver
    pub executed: usize,
    /// Clock when the process stopped
    pub final_clock: VectorClock,
    /// Event records, ordered by the process's own clock component
    pub events: Vec<EventRecord>,
    /// Completed local snapshots, in round order
    pub snapshots: Vec<LocalSnapshot>,
}

impl ProcessReport {
    /// Local snapshot of `round`, if it completed here.
    pub fn snapshot(&self, round: u64) -> Option<&LocalSnapshot> {
        self.snapshots.iter().find(|s| s.round == round)
    }
}

/// Configures and spawns one process.
pub struct ProcessBuilder {
    script: Script,
    transport: Arc<dyn Transport>,
    config: RuntimeConfig,
    policy: Arc<dyn SnapshotPolicy>,
    observer: Arc<dyn Observer>,
}

impl ProcessBuilder {
    /// Process executing `script` over `transport`.
    pub fn new(script: Script, transport: Arc<dyn Transport>) -> Self {
        Self {
            script,
            transport,
            config: RuntimeConfig::default(),
            policy: Arc::new(NoSnapshots),
            observer: Arc::new(NullObserver),
        }
    }

    /// Use `config` instead of the defaults.
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Decide snapshot initiation with `policy`.
    pub fn policy(mut self, policy: Arc<dyn SnapshotPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Forward records to `observer`.
    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Validate and start the three units on the current tokio runtime.
    pub fn spawn(self) -> RuntimeResult<ProcessHandle> {
        self.config.validate()?;

        let id = self.transport.local_id();
        let processes = self.transport.processes();
        if self.script.process != id {
            return Err(RuntimeError::invalid_configuration(format!(
                "script of {} handed to the transport of {id}",
                self.script.process
            )));
        }
        if processes == 0 {
            return Err(CoreError::invalid_scenario("a group needs at least one process").into());
        }
        self.script.validate(processes)?;

        let context = Arc::new(ProcessContext {
            id,
            processes,
            transport: self.transport,
            state: Mutex::new(ProcessState {
                clock: VectorClock::zeroed(processes),
                snapshot: SnapshotState::new(id, processes),
                undelivered: VecDeque::new(),
            }),
            send_gate: tokio::sync::Mutex::new(()),
            inbox: BoundedQueue::new(self.config.queue_capacity),
            outbox: BoundedQueue::new(self.config.queue_capacity),
            shutdown: ShutdownSignal::new(),
            policy: self.policy,
            observer: self.observer,
            recorder: Recorder::new(),
            config: self.config,
        });

        info!(
            process = %id,
            processes,
            instructions = self.script.instructions.len(),
            transport = context.transport.transport_type(),
            "Starting process"
        );

        let inbound = tokio::spawn(InboundUnit::new(context.clone()).run());
        let outbound = tokio::spawn(OutboundUnit::new(context.clone()).run());
        let driver = tokio::spawn(ApplicationDriver::new(context.clone(), self.script).run());

        Ok(ProcessHandle {
            context,
            driver,
            inbound,
            outbound,
        })
    }
}

/// Handle to a running process.
pub struct ProcessHandle {
    context: Arc<ProcessContext>,
    driver: JoinHandle<RuntimeResult<DriverOutcome>>,
    inbound: JoinHandle<RuntimeResult<()>>,
    outbound: JoinHandle<RuntimeResult<()>>,
}

impl ProcessHandle {
    /// Process id.
    pub fn id(&self) -> ProcessId {
        self.context.id
    }

    /// Current vector clock.
    pub fn clock(&self) -> VectorClock {
        self.context.clock()
    }

    /// Shared shutdown signal of the process.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.context.shutdown.clone()
    }

    /// Stop the process; units exit at their next wake.
    pub fn shutdown(&self) {
        self.context.shutdown.trigger();
    }

    /// Start a snapshot round now.
    ///
    /// Returns false if a round was already active; the request is then
    /// absorbed into that round.
    pub async fn initiate_snapshot(&self) -> RuntimeResult<bool> {
        self.context.start_snapshot().await
    }

    /// Wait for the script to end and every unit to exit.
    pub async fn join(self) -> RuntimeResult<ProcessReport> {
        let id = self.context.id;
        let driver = self
            .driver
            .await
            .map_err(|e| RuntimeError::task_failed(id, "driver", e));
        self.context.shutdown.trigger();
        let inbound = self
            .inbound
            .await
            .map_err(|e| RuntimeError::task_failed(id, "inbound", e));
        let outbound = self
            .outbound
            .await
            .map_err(|e| RuntimeError::task_failed(id, "outbound", e));

        // Unit errors come before driver errors: a failing unit interrupts
        // the driver, not the other way round.
        inbound??;
        outbound??;
        let outcome = driver??;

        let (mut events, snapshots) = self.context.recorder.take();
        events.sort_by_key(EventRecord::sequence);
        let report = ProcessReport {
            process: id,
            completed: outcome.completed,
            executed: outcome.executed,
            final_clock: self.context.clock(),
            events,
            snapshots,
        };
        info!(
            process = %id,
            completed = report.completed,
            clock = %report.final_clock,
            snapshots = report.snapshots.len(),
            "Process stopped"
        );
        Ok(report)
    }
}
