//! Inbound unit: transport to inbound queue.

use crate::error::{RuntimeError, RuntimeResult};
use crate::process::ProcessContext;
use crate::shutdown::ShutdownToken;
use causal_core::{Message, MessageKind};
use std::sync::Arc;
use tracing::{debug, error, trace};

pub(crate) struct InboundUnit {
    context: Arc<ProcessContext>,
}

impl InboundUnit {
    pub(crate) fn new(context: Arc<ProcessContext>) -> Self {
        Self { context }
    }

    pub(crate) async fn run(self) -> RuntimeResult<()> {
        let token = self.context.shutdown.token();
        let result = self.pump(&token).await;
        if let Err(e) = &result {
            error!(process = %self.context.id, error = %e, "Inbound unit failed");
            self.context.shutdown.trigger();
        }
        debug!(process = %self.context.id, "Inbound unit stopped");
        result
    }

    async fn pump(&self, token: &ShutdownToken) -> RuntimeResult<()> {
        let context = &self.context;
        while !token.is_cancelled() {
            let pending = context
                .transport
                .probe()
                .await
                .map_err(|e| RuntimeError::transport(context.id, e))?;
            let Some(sender) = pending else {
                tokio::select! {
                    _ = tokio::time::sleep(context.config.poll_interval()) => {}
                    _ = token.cancelled() => {}
                }
                continue;
            };

            let message = context
                .transport
                .receive(sender)
                .await
                .map_err(|e| RuntimeError::transport(context.id, e))?;
            self.check(&message)?;

            match message.kind() {
                MessageKind::Marker => {
                    trace!(process = %context.id, peer = %message.from(), "Marker");
                    context.on_marker_arrival(message.from()).await?;
                }
                MessageKind::Normal { label, .. } => {
                    trace!(process = %context.id, peer = %message.from(), label = %label, "Message");
                    context.on_normal_arrival(message.from(), label);
                    if context.inbox.push(message, token).await.is_err() {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Reject messages that cannot belong to this group.
    fn check(&self, message: &Message) -> RuntimeResult<()> {
        let context = &self.context;
        if message.to() != context.id {
            return Err(RuntimeError::malformed(
                context.id,
                format!("addressed to {}", message.to()),
            ));
        }
        if message.from() == context.id || message.from().index() >= context.processes {
            return Err(RuntimeError::malformed(
                context.id,
                format!("unexpected sender {}", message.from()),
            ));
        }
        if let Some(clock) = message.clock() {
            clock.ensure_dimension(context.processes)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::process::ProcessBuilder;
    use crate::RuntimeError;
    use causal_core::{Instruction, Message, ProcessId, Script, VectorClock};
    use causal_transport::{MemoryNetwork, Transport};

    #[tokio::test]
    async fn wrong_clock_dimension_is_fatal() {
        let mut transports = MemoryNetwork::build(2).into_iter();
        let p0 = transports.next().unwrap();
        let p1 = transports.next().unwrap();

        let handle = ProcessBuilder::new(
            Script::new(ProcessId::new(1), vec![Instruction::receive("x", "y")]),
            p1,
        )
        .spawn()
        .unwrap();

        p0.send(Message::normal(
            ProcessId::new(0),
            ProcessId::new(1),
            "y",
            VectorClock::zeroed(5),
        ))
        .await
        .unwrap();

        let error = handle.join().await.unwrap_err();
        assert!(matches!(error, RuntimeError::Core(_)), "{error}");
    }
}
