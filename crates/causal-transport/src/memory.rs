//! In-memory transport for tests and single-address-space runs

use crate::{inbox::PeerInbox, traits::Transport, TransportError, TransportResult};
use async_trait::async_trait;
use causal_core::{Message, ProcessId};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Builder for a fully connected group of in-memory endpoints.
pub struct MemoryNetwork;

impl MemoryNetwork {
    /// Create one endpoint per rank, linked pairwise by FIFO channels.
    ///
    /// Endpoint `i` of the returned vector belongs to process `i`.
    pub fn build(processes: usize) -> Vec<Arc<MemoryTransport>> {
        let mut senders: Vec<Vec<Option<mpsc::UnboundedSender<Message>>>> =
            (0..processes).map(|_| vec![None; processes]).collect();
        let mut receivers: Vec<Vec<Option<mpsc::UnboundedReceiver<Message>>>> = (0..processes)
            .map(|_| (0..processes).map(|_| None).collect())
            .collect();

        for from in 0..processes {
            for to in 0..processes {
                if from == to {
                    continue;
                }
                let (tx, rx) = mpsc::unbounded_channel();
                senders[from][to] = Some(tx);
                receivers[to][from] = Some(rx);
            }
        }

        senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (outgoing, incoming))| {
                let local = ProcessId::new(rank as u32);
                Arc::new(MemoryTransport {
                    outgoing,
                    inbox: PeerInbox::new(local, incoming),
                })
            })
            .collect()
    }
}

/// Endpoint of one process in a [`MemoryNetwork`].
pub struct MemoryTransport {
    outgoing: Vec<Option<mpsc::UnboundedSender<Message>>>,
    inbox: PeerInbox,
}

#[async_trait]
impl Transport for MemoryTransport {
    fn local_id(&self) -> ProcessId {
        self.inbox.local()
    }

    fn processes(&self) -> usize {
        self.outgoing.len()
    }

    async fn probe(&self) -> TransportResult<Option<ProcessId>> {
        Ok(self.inbox.probe().await)
    }

    async fn receive(&self, sender: ProcessId) -> TransportResult<Message> {
        self.inbox.receive(sender).await
    }

    async fn send(&self, message: Message) -> TransportResult<()> {
        let local = self.local_id();
        if message.from() != local {
            return Err(TransportError::Misaddressed {
                expected: local,
                actual: message.from(),
            });
        }
        let peer = message.to();
        let link = self
            .outgoing
            .get(peer.index())
            .and_then(Option::as_ref)
            .ok_or(TransportError::PeerUnreachable { peer })?;
        link.send(message)
            .map_err(|_| TransportError::Disconnected { peer })
    }

    fn transport_type(&self) -> &'static str {
        "memory"
    }
}
