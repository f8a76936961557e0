//! TCP transport: one OS process per rank, connected in a full mesh.
//!
//! Rank `i` dials every rank `j < i` and accepts a connection from every rank
//! `j > i`. The dialer opens with its rank as a 4-byte big-endian integer;
//! after that each direction of a connection carries length-prefixed frames
//! (see [`crate::codec`]). TCP keeps each link in send order, which is all
//! the snapshot protocol needs from the network.

use crate::{
    codec::{read_frame, write_frame},
    inbox::PeerInbox,
    traits::Transport,
    TransportError, TransportResult,
};
use async_trait::async_trait;
use causal_core::{Message, ProcessId};
use std::{net::SocketAddr, time::Duration};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpListener, TcpStream,
    },
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

/// Connection setup parameters.
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Dial attempts per lower-ranked peer before giving up
    pub connect_attempts: u32,
    /// Pause between dial attempts
    pub connect_backoff: Duration,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            connect_attempts: 50,
            connect_backoff: Duration::from_millis(100),
        }
    }
}

/// Endpoint of one process in a TCP mesh.
pub struct TcpTransport {
    processes: usize,
    writers: Vec<Option<Mutex<OwnedWriteHalf>>>,
    inbox: PeerInbox,
    readers: Vec<JoinHandle<()>>,
}

impl TcpTransport {
    /// Connect `local` to every other rank.
    ///
    /// `listener` must already be bound to `peers[local]`; binding before
    /// calling lets every rank start listening before anyone dials.
    pub async fn establish(
        local: ProcessId,
        listener: TcpListener,
        peers: &[SocketAddr],
        config: &TcpConfig,
    ) -> TransportResult<Self> {
        let processes = peers.len();
        if local.index() >= processes {
            return Err(TransportError::handshake(format!(
                "{local} is outside a mesh of {processes}"
            )));
        }

        let mut streams: Vec<Option<TcpStream>> = (0..processes).map(|_| None).collect();

        for (rank, addr) in peers.iter().enumerate().take(local.index()) {
            let mut stream = dial(*addr, config).await?;
            stream
                .write_all(&local.0.to_be_bytes())
                .await
                .map_err(|e| TransportError::io("rank handshake write", e))?;
            debug!(process = %local, peer = rank, %addr, "Dialed peer");
            streams[rank] = Some(stream);
        }

        for _ in local.index() + 1..processes {
            let (mut stream, addr) = listener
                .accept()
                .await
                .map_err(|e| TransportError::io("accept", e))?;
            let mut rank_bytes = [0u8; 4];
            stream
                .read_exact(&mut rank_bytes)
                .await
                .map_err(|e| TransportError::io("rank handshake read", e))?;
            let rank = u32::from_be_bytes(rank_bytes) as usize;
            if rank <= local.index() || rank >= processes || streams[rank].is_some() {
                return Err(TransportError::handshake(format!(
                    "unexpected rank {rank} from {addr}"
                )));
            }
            debug!(process = %local, peer = rank, %addr, "Accepted peer");
            streams[rank] = Some(stream);
        }

        let mut writers = Vec::with_capacity(processes);
        let mut receivers = Vec::with_capacity(processes);
        let mut readers = Vec::with_capacity(processes.saturating_sub(1));
        for (rank, stream) in streams.into_iter().enumerate() {
            let Some(stream) = stream else {
                writers.push(None);
                receivers.push(None);
                continue;
            };
            stream
                .set_nodelay(true)
                .map_err(|e| TransportError::io("set_nodelay", e))?;
            let (read_half, write_half) = stream.into_split();
            let (tx, rx) = mpsc::unbounded_channel();
            let peer = ProcessId::new(rank as u32);
            readers.push(tokio::spawn(read_loop(local, peer, read_half, tx)));
            writers.push(Some(Mutex::new(write_half)));
            receivers.push(Some(rx));
        }

        info!(process = %local, processes, "TCP mesh established");
        Ok(Self {
            processes,
            writers,
            inbox: PeerInbox::new(local, receivers),
            readers,
        })
    }
}

async fn dial(addr: SocketAddr, config: &TcpConfig) -> TransportResult<TcpStream> {
    let mut attempt = 1;
    loop {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) if attempt < config.connect_attempts => {
                debug!(%addr, attempt, error = %e, "Peer not listening yet");
                attempt += 1;
                tokio::time::sleep(config.connect_backoff).await;
            }
            Err(e) => return Err(TransportError::io(format!("connect to {addr}"), e)),
        }
    }
}

async fn read_loop(
    local: ProcessId,
    peer: ProcessId,
    mut reader: OwnedReadHalf,
    frames: mpsc::UnboundedSender<Message>,
) {
    loop {
        match read_frame(&mut reader).await {
            Ok(Some(message)) => {
                if message.from() != peer || message.to() != local {
                    warn!(process = %local, %peer, "Dropping link after misrouted frame");
                    break;
                }
                if frames.send(message).is_err() {
                    break;
                }
            }
            Ok(None) => {
                debug!(process = %local, %peer, "Link closed by peer");
                break;
            }
            Err(e) => {
                warn!(process = %local, %peer, error = %e, "Link read failed");
                break;
            }
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    fn local_id(&self) -> ProcessId {
        self.inbox.local()
    }

    fn processes(&self) -> usize {
        self.processes
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
        let writer = self
            .writers
            .get(peer.index())
            .and_then(Option::as_ref)
            .ok_or(TransportError::PeerUnreachable { peer })?;

        let mut writer = writer.lock().await;
        write_frame(&mut *writer, &message).await
    }

    fn transport_type(&self) -> &'static str {
        "tcp"
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        for reader in self.readers.drain(..) {
            reader.abort();
        }
    }
}
