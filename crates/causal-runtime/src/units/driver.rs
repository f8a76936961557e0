//! Application driver: executes the script.

use crate::error::RuntimeResult;
use crate::observer::{EventKind, EventRecord};
use crate::process::{DriverOutcome, ProcessContext};
use crate::shutdown::ShutdownToken;
use crate::units::SendRequest;
use causal_core::{Instruction, Message, Script, VectorClock};
use std::sync::Arc;
use tracing::{debug, warn};

pub(crate) struct ApplicationDriver {
    context: Arc<ProcessContext>,
    script: Script,
}

impl ApplicationDriver {
    pub(crate) fn new(context: Arc<ProcessContext>, script: Script) -> Self {
        Self { context, script }
    }

    /// Execute the script, then stop the process.
    pub(crate) async fn run(self) -> RuntimeResult<DriverOutcome> {
        let token = self.context.shutdown.token();
        let result = self.execute(&token).await;
        self.context.shutdown.trigger();
        debug!(process = %self.context.id, "Driver finished");
        result
    }

    async fn execute(&self, token: &ShutdownToken) -> RuntimeResult<DriverOutcome> {
        let context = &self.context;
        let mut executed = 0;

        for (index, instruction) in self.script.instructions.iter().enumerate() {
            if token.is_cancelled() {
                return Ok(DriverOutcome {
                    executed,
                    completed: false,
                });
            }

            match instruction {
                Instruction::Internal { label } => {
                    let clock = {
                        let mut state = context.state.lock();
                        state.clock.increment(context.id);
                        state.clock.clone()
                    };
                    context.emit_event(EventRecord {
                        process: context.id,
                        index,
                        label: label.clone(),
                        clock,
                        kind: EventKind::Internal,
                    });
                    if context.policy.initiate_after(context.id, label) {
                        context.start_snapshot().await?;
                    }
                }
                Instruction::Send {
                    label,
                    to,
                    peer_label,
                } => {
                    let request = SendRequest {
                        index,
                        label: label.clone(),
                        to: *to,
                        peer_label: peer_label.clone(),
                    };
                    if context.outbox.push(request, token).await.is_err() {
                        return Ok(DriverOutcome {
                            executed,
                            completed: false,
                        });
                    }
                }
                Instruction::Receive { label, peer_label } => {
                    let Some(message) = context.inbox.pop(token).await else {
                        return Ok(DriverOutcome {
                            executed,
                            completed: false,
                        });
                    };
                    let clock = self.apply(&message);
                    let message_label = message.label().unwrap_or_default().to_string();
                    if message_label != *peer_label {
                        warn!(
                            process = %context.id,
                            expected = %peer_label,
                            actual = %message_label,
                            "Received an unexpected message"
                        );
                    }
                    context.emit_event(EventRecord {
                        process: context.id,
                        index,
                        label: label.clone(),
                        clock,
                        kind: EventKind::Received {
                            from: message.from(),
                            message_label,
                            peer_label: peer_label.clone(),
                        },
                    });
                }
            }

            executed += 1;
            if let Some(delay) = context.config.step_delay() {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = token.cancelled() => {}
                }
            }
        }

        Ok(DriverOutcome {
            executed,
            completed: true,
        })
    }

    /// Merge the message clock and mark it applied, atomically with respect
    /// to snapshot recording.
    fn apply(&self, message: &Message) -> VectorClock {
        let context = &self.context;
        let mut state = context.state.lock();
        state.undelivered.pop_front();
        if let Some(incoming) = message.clock() {
            state.clock.receive(context.id, incoming);
        }
        state.clock.clone()
    }
}
