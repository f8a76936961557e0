//! Core transport trait definitions

use crate::TransportResult;
use async_trait::async_trait;
use causal_core::{Message, ProcessId};

/// Point-to-point delivery between the members of a fixed group.
///
/// Implementations guarantee reliable delivery in send order for every
/// ordered pair of processes. Markers and application messages travel on the
/// same links, so a marker never overtakes an earlier message.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Process owning this endpoint
    fn local_id(&self) -> ProcessId;

    /// Group size N
    fn processes(&self) -> usize;

    /// Sender of a pending message, without waiting for one to arrive
    async fn probe(&self) -> TransportResult<Option<ProcessId>>;

    /// Take the next message from `sender`, waiting if none is pending yet
    async fn receive(&self, sender: ProcessId) -> TransportResult<Message>;

    /// Send a message to `message.to()`
    async fn send(&self, message: Message) -> TransportResult<()>;

    /// Transport type identifier
    fn transport_type(&self) -> &'static str;

    /// Probe and, if something is pending, receive it
    async fn try_receive(&self) -> TransportResult<Option<Message>> {
        match self.probe().await? {
            Some(sender) => self.receive(sender).await.map(Some),
            None => Ok(None),
        }
    }
}
