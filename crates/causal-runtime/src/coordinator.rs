//! Chandy-Lamport coordination for one process.
//!
//! Wraps [`SnapshotState`](crate::snapshot::SnapshotState) with the process
//! lock, the drain wait before a marker-triggered recording, and the marker
//! broadcast. Recording and broadcasting happen under the send gate so that
//! no NORMAL message stamped after the cut leaves before the markers.

use crate::error::{RuntimeError, RuntimeResult};
use crate::process::{ProcessContext, ProcessState};
use crate::snapshot::{LocalSnapshot, RecordOutcome};
use causal_core::{Message, ProcessId};
use tracing::{debug, info};

enum MarkerStep {
    /// The marker closed a channel of the active round
    Closed(Option<LocalSnapshot>),
    /// This marker started the round here
    Recorded(Option<LocalSnapshot>),
    /// Messages arrived during the drain wait; wait again
    Retry,
}

impl ProcessContext {
    /// Start a round locally.
    ///
    /// Records the current clock immediately. Messages already delivered to
    /// the inbound queue but not yet applied become the first entries of
    /// their channels' in-transit logs.
    ///
    /// Unlike [`on_marker_arrival`](Self::on_marker_arrival) there is no
    /// drain wait: the driver calling this is the only consumer of the
    /// inbound queue, so waiting for it to empty would never finish.
    pub(crate) async fn start_snapshot(&self) -> RuntimeResult<bool> {
        if self.state.lock().snapshot.is_active() {
            debug!(process = %self.id, "Snapshot already active");
            return Ok(false);
        }

        let gate = self.send_gate.lock().await;
        let (outcome, completed) = {
            let mut state = self.state.lock();
            let ProcessState {
                clock,
                snapshot,
                undelivered,
            } = &mut *state;
            let outcome = snapshot.record(clock.clone(), None, undelivered.iter().cloned());
            (outcome, snapshot.take_completed())
        };
        if outcome == RecordOutcome::AlreadyActive {
            debug!(process = %self.id, "Snapshot already active");
            return Ok(false);
        }

        info!(process = %self.id, "Initiating snapshot");
        let sent = self.broadcast_markers().await;
        drop(gate);
        if let Some(snapshot) = completed {
            self.emit_snapshot(snapshot);
        }
        sent.map(|()| true)
    }

    /// Handle a MARKER from `from`.
    ///
    /// The first marker of a round waits until the application has applied
    /// every delivered message, records the clock with `from`'s channel
    /// already closed, and forwards markers. Later markers close their
    /// channel. Repeated markers are ignored.
    pub(crate) async fn on_marker_arrival(&self, from: ProcessId) -> RuntimeResult<()> {
        loop {
            let closed = {
                let mut state = self.state.lock();
                if state.snapshot.is_active() {
                    state.snapshot.close_channel(from);
                    Some(state.snapshot.take_completed())
                } else {
                    None
                }
            };
            if let Some(completed) = closed {
                debug!(process = %self.id, peer = %from, "Channel closed by marker");
                if let Some(snapshot) = completed {
                    self.emit_snapshot(snapshot);
                }
                return Ok(());
            }

            if !self.wait_for_drain().await {
                return Ok(());
            }

            let gate = self.send_gate.lock().await;
            let step = {
                let mut state = self.state.lock();
                let ProcessState {
                    clock,
                    snapshot,
                    undelivered,
                } = &mut *state;
                if snapshot.is_active() {
                    snapshot.close_channel(from);
                    MarkerStep::Closed(snapshot.take_completed())
                } else if !undelivered.is_empty() {
                    MarkerStep::Retry
                } else {
                    snapshot.record(clock.clone(), Some(from), []);
                    MarkerStep::Recorded(snapshot.take_completed())
                }
            };

            match step {
                MarkerStep::Retry => continue,
                MarkerStep::Closed(completed) => {
                    drop(gate);
                    if let Some(snapshot) = completed {
                        self.emit_snapshot(snapshot);
                    }
                    return Ok(());
                }
                MarkerStep::Recorded(completed) => {
                    info!(process = %self.id, peer = %from, "First marker, state recorded");
                    let sent = self.broadcast_markers().await;
                    drop(gate);
                    if let Some(snapshot) = completed {
                        self.emit_snapshot(snapshot);
                    }
                    return sent;
                }
            }
        }
    }

    /// Handle a NORMAL message from `from` before it is queued for the
    /// application.
    pub(crate) fn on_normal_arrival(&self, from: ProcessId, label: &str) {
        let mut state = self.state.lock();
        if state.snapshot.log_in_transit(from, label) {
            debug!(process = %self.id, peer = %from, label, "Logged in transit");
        }
        state.undelivered.push_back((from, label.to_string()));
    }

    /// Wait until every delivered message has been applied. Returns false
    /// if the process stopped first.
    async fn wait_for_drain(&self) -> bool {
        let token = self.shutdown.token();
        loop {
            if self.state.lock().undelivered.is_empty() {
                return true;
            }
            if self.shutdown.is_triggered() {
                return false;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.config.drain_poll_interval()) => {}
                _ = token.cancelled() => {}
            }
        }
    }

    /// Send a MARKER to every peer. Caller holds the send gate.
    async fn broadcast_markers(&self) -> RuntimeResult<()> {
        for peer in self.id.peers(self.processes) {
            self.transport
                .send(Message::marker(self.id, peer))
                .await
                .map_err(|e| RuntimeError::transport(self.id, e))?;
        }
        Ok(())
    }
}
