//! Per-peer receive side shared by every transport.
//!
//! Each incoming link is an unbounded FIFO fed by the peer (memory) or by a
//! socket reader task (TCP). Probing peeks one message into a slot so that a
//! later `receive` from the same peer returns it without waiting.

use crate::{TransportError, TransportResult};
use causal_core::{Message, ProcessId};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, Mutex};

struct Link {
    receiver: mpsc::UnboundedReceiver<Message>,
    peeked: Option<Message>,
}

pub(crate) struct PeerInbox {
    local: ProcessId,
    links: Vec<Option<Mutex<Link>>>,
    cursor: AtomicUsize,
}

impl PeerInbox {
    /// `receivers[p]` carries the messages sent by `p`; the local slot is `None`.
    pub(crate) fn new(
        local: ProcessId,
        receivers: Vec<Option<mpsc::UnboundedReceiver<Message>>>,
    ) -> Self {
        Self {
            local,
            links: receivers
                .into_iter()
                .map(|receiver| {
                    receiver.map(|receiver| {
                        Mutex::new(Link {
                            receiver,
                            peeked: None,
                        })
                    })
                })
                .collect(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Rotate over peers so one chatty link cannot starve the others.
    pub(crate) async fn probe(&self) -> Option<ProcessId> {
        let count = self.links.len();
        if count == 0 {
            return None;
        }
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % count;

        for offset in 0..count {
            let rank = (start + offset) % count;
            let Some(link) = &self.links[rank] else {
                continue;
            };
            let mut link = link.lock().await;
            if link.peeked.is_some() {
                return Some(ProcessId::new(rank as u32));
            }
            // A disconnected link has nothing more to deliver; `receive`
            // reports the closure if someone waits on it.
            if let Ok(message) = link.receiver.try_recv() {
                link.peeked = Some(message);
                return Some(ProcessId::new(rank as u32));
            }
        }
        None
    }

    pub(crate) async fn receive(&self, sender: ProcessId) -> TransportResult<Message> {
        let link = self
            .links
            .get(sender.index())
            .and_then(Option::as_ref)
            .ok_or(TransportError::PeerUnreachable { peer: sender })?;

        let mut link = link.lock().await;
        if let Some(message) = link.peeked.take() {
            return Ok(message);
        }
        link.receiver
            .recv()
            .await
            .ok_or(TransportError::Disconnected { peer: sender })
    }

    pub(crate) fn local(&self) -> ProcessId {
        self.local
    }
}
