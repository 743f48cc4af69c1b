// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests/examples panic on failure
#![allow(clippy::items_after_statements)] // Test helpers
#![allow(clippy::similar_names)] // Test variable naming
#![allow(clippy::cast_possible_truncation)] // Test parameters

//! Datagram channels over real loopback UDP sockets.
//!
//! Validates that:
//! 1. unconnected send/receive reports the sender's address
//! 2. connect/disconnect reach the kernel (connected read/write work, and
//!    the socket accepts other senders again after disconnect)
//! 3. close releases a thread blocked in receive within a poll interval
//! 4. the socket adapter moves packets in blocking mode
//! 5. socket options from the channel config are set on the descriptor

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use udpchan::{
    ByteBuffer, ByteChannel, ChannelConfig, ChannelError, DatagramChannel, DatagramPacket,
    OpenState, OsNetwork,
};

const POLL: Duration = Duration::from_millis(20);

fn network() -> Arc<OsNetwork> {
    Arc::new(OsNetwork::new())
}

fn open(net: &Arc<OsNetwork>) -> DatagramChannel {
    DatagramChannel::builder(net.clone())
        .config(ChannelConfig::with_poll_interval(POLL))
        .build()
        .expect("open channel")
}

fn open_bound(net: &Arc<OsNetwork>) -> (DatagramChannel, SocketAddr) {
    let channel = open(net);
    channel
        .bind("127.0.0.1:0".parse().unwrap())
        .expect("bind loopback");
    let addr = channel.local_address().expect("bound address");
    (channel, addr)
}

#[test]
fn unconnected_round_trip_reports_sender() {
    let net = network();
    let (server, server_addr) = open_bound(&net);
    let (client, client_addr) = open_bound(&net);

    let mut out = ByteBuffer::copy_from_slice(b"hello over udp");
    assert_eq!(client.send(&mut out, server_addr).unwrap(), 14);
    assert_eq!(out.remaining(), 0);

    let mut buf = ByteBuffer::allocate(1500);
    let from = server.receive(&mut buf).unwrap();
    assert_eq!(from, Some(client_addr));
    assert_eq!(buf.filled(), b"hello over udp");
}

#[test]
fn connected_pair_reads_and_writes() {
    let net = network();
    let (a, a_addr) = open_bound(&net);
    let (b, b_addr) = open_bound(&net);
    a.connect(b_addr).unwrap();
    b.connect(a_addr).unwrap();

    assert_eq!(a.write(&mut ByteBuffer::copy_from_slice(b"ping")).unwrap(), 4);
    let mut buf = ByteBuffer::allocate(64);
    assert_eq!(b.read(&mut buf).unwrap(), 4);
    assert_eq!(buf.filled(), b"ping");

    buf.clear();
    assert_eq!(b.write(&mut ByteBuffer::copy_from_slice(b"pong")).unwrap(), 4);
    assert_eq!(a.read(&mut buf).unwrap(), 4);
    assert_eq!(buf.filled(), b"pong");
}

#[test]
fn gather_with_offset_sends_one_datagram() {
    let net = network();
    let (a, a_addr) = open_bound(&net);
    let (b, b_addr) = open_bound(&net);
    a.connect(b_addr).unwrap();
    b.connect(a_addr).unwrap();

    let mut srcs = vec![
        ByteBuffer::copy_from_slice(b"xxxxx"),
        ByteBuffer::copy_from_slice(b"abcdefg"),
        ByteBuffer::copy_from_slice(b"hij"),
    ];
    assert_eq!(a.write_gather(&mut srcs, 1, 2).unwrap(), 10);
    assert_eq!(srcs[0].position(), 0);
    assert!(!srcs[1].has_remaining());
    assert!(!srcs[2].has_remaining());

    let mut dsts = vec![ByteBuffer::allocate(4), ByteBuffer::allocate(16)];
    assert_eq!(b.read_all(&mut dsts).unwrap(), 10);
    assert_eq!(dsts[0].filled(), b"abcd");
    assert_eq!(dsts[1].filled(), b"efghij");
}

#[test]
fn disconnect_accepts_other_senders_again() {
    let net = network();
    let (peer, peer_addr) = open_bound(&net);
    let (stranger, stranger_addr) = open_bound(&net);
    let (channel, channel_addr) = open_bound(&net);

    channel.connect(peer_addr).unwrap();
    channel.disconnect().unwrap();
    assert!(!channel.is_connected());
    assert!(channel.is_bound());

    stranger
        .send(&mut ByteBuffer::copy_from_slice(b"hi"), channel_addr)
        .unwrap();
    let mut buf = ByteBuffer::allocate(16);
    assert_eq!(channel.receive(&mut buf).unwrap(), Some(stranger_addr));
    drop(peer);
}

#[test]
fn close_releases_blocked_receiver() {
    let net = network();
    let (channel, _) = open_bound(&net);
    let channel = Arc::new(channel);

    let receiver = {
        let channel = Arc::clone(&channel);
        thread::spawn(move || {
            let mut buf = ByteBuffer::allocate(64);
            channel.receive(&mut buf).map_err(|e| e.to_string())
        })
    };

    let deadline = Instant::now() + Duration::from_secs(5);
    while channel.blocking_sections_in_flight() == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }

    let started = Instant::now();
    channel.close().unwrap();
    assert_eq!(receiver.join().unwrap(), Ok(None));
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "close took {:?}",
        started.elapsed()
    );
    assert_eq!(channel.open_state(), OpenState::Closed);
    assert_eq!(channel.blocking_sections_in_flight(), 0);
}

#[test]
fn non_blocking_receive_returns_none_when_idle() {
    let net = network();
    let (channel, _) = open_bound(&net);
    channel.configure_blocking(false).unwrap();

    let started = Instant::now();
    let mut buf = ByteBuffer::allocate(64);
    assert_eq!(channel.receive(&mut buf).unwrap(), None);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn socket_adapter_packet_exchange() {
    let net = network();
    let (server, server_addr) = open_bound(&net);
    let client = open(&net);
    let socket = client.socket();

    socket.connect(server_addr).unwrap();
    assert_eq!(socket.port(), Some(server_addr.port()));
    assert!(matches!(
        socket.bind("127.0.0.1:0".parse().unwrap()),
        Err(ChannelError::AlreadyConnected)
    ));
    socket.send(&DatagramPacket::new(b"via adapter", None)).unwrap();

    let mut packet = DatagramPacket::with_capacity(64);
    server.socket().receive(&mut packet).unwrap();
    assert_eq!(packet.data(), b"via adapter");
    assert_eq!(packet.address(), socket.local_address());
}

#[test]
fn dropping_channel_closes_socket() {
    let net = network();
    let (channel, addr) = open_bound(&net);
    drop(channel);

    // The port is free again once the descriptor is gone.
    let rebound = open(&net);
    rebound.bind(addr).unwrap();
    assert_eq!(rebound.local_address(), Some(addr));
}

#[cfg(unix)]
#[test]
fn builder_config_reaches_the_socket() {
    use std::os::fd::BorrowedFd;
    use udpchan::Selectable;

    let config = ChannelConfig {
        broadcast: true,
        ttl: Some(7),
        recv_buffer_size: Some(64 * 1024),
        ..ChannelConfig::with_poll_interval(POLL)
    };
    let channel = DatagramChannel::builder(network())
        .config(config)
        .build()
        .expect("open channel");

    let fd = channel.raw_fd().expect("open socket has a descriptor");
    // SAFETY: the channel stays open (and owns fd) for the rest of the test.
    let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
    let sock = socket2::SockRef::from(&borrowed);
    assert!(sock.broadcast().unwrap(), "SO_BROADCAST not applied");
    assert_eq!(sock.ttl().unwrap(), 7);
    // Linux doubles the requested size; other stacks report it as set.
    assert!(sock.recv_buffer_size().unwrap() >= 64 * 1024);

    let plain = open(&network());
    let fd = plain.raw_fd().expect("open socket has a descriptor");
    // SAFETY: as above, `plain` outlives the borrow.
    let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
    assert!(!socket2::SockRef::from(&borrowed).broadcast().unwrap());
}
