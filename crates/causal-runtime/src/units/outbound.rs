//! Outbound unit: send requests to the transport.

use crate::error::{RuntimeError, RuntimeResult};
use crate::observer::{EventKind, EventRecord};
use crate::process::ProcessContext;
use crate::units::SendRequest;
use causal_core::Message;
use std::sync::Arc;
use tracing::{debug, error};

pub(crate) struct OutboundUnit {
    context: Arc<ProcessContext>,
}

impl OutboundUnit {
    pub(crate) fn new(context: Arc<ProcessContext>) -> Self {
        Self { context }
    }

    /// Transmit requests until the process stops and the queue is empty.
    pub(crate) async fn run(self) -> RuntimeResult<()> {
        let token = self.context.shutdown.token();
        while let Some(request) = self.context.outbox.pop(&token).await {
            if let Err(e) = self.transmit(request).await {
                error!(process = %self.context.id, error = %e, "Outbound unit failed");
                self.context.shutdown.trigger();
                return Err(e);
            }
        }
        debug!(process = %self.context.id, "Outbound unit stopped");
        Ok(())
    }

    async fn transmit(&self, request: SendRequest) -> RuntimeResult<()> {
        let context = &self.context;
        let gate = context.send_gate.lock().await;
        let clock = {
            let mut state = context.state.lock();
            state.clock.increment(context.id);
            state.clock.clone()
        };
        let message = Message::normal(context.id, request.to, request.label.clone(), clock.clone());
        context
            .transport
            .send(message)
            .await
            .map_err(|e| RuntimeError::transport(context.id, e))?;
        drop(gate);

        context.emit_event(EventRecord {
            process: context.id,
            index: request.index,
            label: request.label,
            clock,
            kind: EventKind::Sent {
                to: request.to,
                peer_label: request.peer_label,
            },
        });
        Ok(())
    }
}
