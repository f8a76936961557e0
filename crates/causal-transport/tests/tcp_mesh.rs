//! TCP Mesh Tests
//!
//! Builds a three-rank mesh on loopback and checks that it behaves like the
//! in-memory network: per-link FIFO, markers and application messages on the
//! same link, and misaddressed sends rejected locally.

use causal_core::{Message, ProcessId, VectorClock};
use causal_transport::{TcpConfig, TcpTransport, Transport, TransportError};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

async fn mesh(processes: usize) -> Vec<TcpTransport> {
    let mut listeners = Vec::new();
    let mut addrs: Vec<SocketAddr> = Vec::new();
    for _ in 0..processes {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        addrs.push(listener.local_addr().unwrap());
        listeners.push(listener);
    }

    let config = TcpConfig {
        connect_attempts: 20,
        connect_backoff: Duration::from_millis(20),
    };
    let handles: Vec<_> = listeners
        .into_iter()
        .enumerate()
        .map(|(rank, listener)| {
            let addrs = addrs.clone();
            let config = config.clone();
            tokio::spawn(async move {
                TcpTransport::establish(ProcessId::new(rank as u32), listener, &addrs, &config)
                    .await
            })
        })
        .collect();

    let mut transports = Vec::new();
    for handle in handles {
        transports.push(handle.await.unwrap().unwrap());
    }
    transports
}

async fn receive_within(transport: &TcpTransport) -> Message {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(message) = transport.try_receive().await.unwrap() {
                return message;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mesh_preserves_link_order() {
    let transports = mesh(3).await;
    assert_eq!(transports[2].processes(), 3);
    assert_eq!(transports[2].transport_type(), "tcp");

    let clock = VectorClock::from_counters([0, 0, 1]);
    transports[2]
        .send(Message::normal(ProcessId(2), ProcessId(0), "l", clock.clone()))
        .await
        .unwrap();
    transports[2]
        .send(Message::marker(ProcessId(2), ProcessId(0)))
        .await
        .unwrap();

    let first = receive_within(&transports[0]).await;
    let second = receive_within(&transports[0]).await;
    assert_eq!(first.label(), Some("l"));
    assert_eq!(first.clock(), Some(&clock));
    assert!(second.is_marker());
    assert_eq!(second.from(), ProcessId(2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn every_pair_is_connected() {
    let transports = mesh(3).await;
    for from in 0..3u32 {
        for to in 0..3u32 {
            if from != to {
                transports[from as usize]
                    .send(Message::marker(ProcessId(from), ProcessId(to)))
                    .await
                    .unwrap();
            }
        }
    }
    for (rank, transport) in transports.iter().enumerate() {
        let mut senders = vec![
            receive_within(transport).await.from(),
            receive_within(transport).await.from(),
        ];
        senders.sort();
        let expected: Vec<_> = ProcessId::new(rank as u32).peers(3).collect();
        assert_eq!(senders, expected);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn foreign_sender_is_rejected() {
    let transports = mesh(2).await;
    let err = transports[0]
        .send(Message::marker(ProcessId(1), ProcessId(0)))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Misaddressed { .. }));
}
