// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Channel state machine and transfer tests on the in-process fabric.

use super::*;
use crate::buffer::ByteBuffer;
use crate::net::{LoopbackFaults, LoopbackNetwork};
use crate::policy::HostAllowList;
use crate::traits::ByteChannel;
use std::net::{IpAddr, Ipv4Addr};
use std::thread;
use std::time::{Duration, Instant};

const POLL: Duration = Duration::from_millis(10);

fn fabric() -> Arc<LoopbackNetwork> {
    Arc::new(LoopbackNetwork::new())
}

fn open(net: &Arc<LoopbackNetwork>) -> DatagramChannel {
    DatagramChannel::builder(net.clone())
        .config(ChannelConfig::with_poll_interval(POLL))
        .build()
        .unwrap()
}

fn open_bound(net: &Arc<LoopbackNetwork>) -> (DatagramChannel, SocketAddr) {
    let channel = open(net);
    channel.bind(any()).unwrap();
    let addr = channel.local_address().unwrap();
    (channel, addr)
}

fn any() -> SocketAddr {
    "0.0.0.0:0".parse().unwrap()
}

fn nowhere() -> SocketAddr {
    "127.0.0.1:9".parse().unwrap()
}

/// Spin until another thread has entered a blocking section.
fn wait_for_blocked(channel: &DatagramChannel) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while channel.blocking_sections_in_flight() == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
}

// ===== Construction and state =====

#[test]
fn test_new_channel_state() {
    let net = fabric();
    let channel = open(&net);
    assert!(channel.is_open());
    assert_eq!(channel.open_state(), OpenState::Open);
    assert!(channel.is_blocking());
    assert!(!channel.is_bound());
    assert!(!channel.is_connected());
    assert_eq!(channel.remote_address(), None);
    assert_eq!(channel.local_address(), None);
    assert_eq!(channel.valid_ops(), Ops::READ | Ops::WRITE);
    assert!(!channel.is_registered());
}

#[test]
fn test_builder_non_blocking() {
    let net = fabric();
    let channel = DatagramChannel::builder(net)
        .blocking(false)
        .build()
        .unwrap();
    assert!(!channel.is_blocking());
}

#[test]
fn test_bind_twice_rejected() {
    let net = fabric();
    let (channel, _) = open_bound(&net);
    assert!(channel.is_bound());
    assert!(matches!(
        channel.bind(any()),
        Err(ChannelError::AlreadyBound)
    ));
}

#[test]
fn test_bind_after_connect_rejected() {
    let net = fabric();
    let channel = open(&net);
    channel.connect(nowhere()).unwrap();
    assert!(matches!(
        channel.bind(any()),
        Err(ChannelError::AlreadyConnected)
    ));
}

// ===== Connect / disconnect =====

#[test]
fn test_connect_refused_is_swallowed() {
    let net = fabric();
    let channel = open(&net);
    channel.connect(nowhere()).unwrap();
    assert!(channel.is_connected());
    assert!(channel.is_bound());
    assert_eq!(channel.remote_address(), Some(nowhere()));
    assert!(channel.local_address().is_some());
}

#[test]
fn test_connect_twice_rejected() {
    let net = fabric();
    let channel = open(&net);
    channel.connect(nowhere()).unwrap();
    let other: SocketAddr = "127.0.0.1:10".parse().unwrap();
    assert!(matches!(
        channel.connect(other),
        Err(ChannelError::AlreadyConnected)
    ));
    assert_eq!(channel.remote_address(), Some(nowhere()));
}

#[test]
fn test_connect_wildcard_rejected_without_state_change() {
    let net = fabric();
    let channel = open(&net);
    let wildcard = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 4000);
    assert!(matches!(
        channel.connect(wildcard),
        Err(ChannelError::IllegalArgument(_))
    ));
    assert!(!channel.is_connected());
    assert!(!channel.is_bound());
}

#[test]
fn test_connect_unresolved_rejected() {
    let net = fabric();
    let channel = open(&net);
    let err = channel
        .connect(Endpoint::unresolved("peer.invalid", 7400))
        .unwrap_err();
    assert!(matches!(err, ChannelError::UnresolvedAddress(_)));
    assert!(!channel.is_connected());
}

#[test]
fn test_connect_os_failure_leaves_unconnected() {
    let net = fabric();
    net.set_faults(LoopbackFaults {
        connect_error: Some(io::ErrorKind::PermissionDenied),
        ..Default::default()
    });
    let channel = open(&net);
    let err = channel.connect(nowhere()).unwrap_err();
    assert!(matches!(err, ChannelError::Io(ref e) if e.kind() == io::ErrorKind::PermissionDenied));
    assert!(!channel.is_connected());
    assert_eq!(channel.remote_address(), None);
}

#[test]
fn test_connect_denied_by_policy() {
    let net = fabric();
    let allowed = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 2));
    let channel = DatagramChannel::builder(net)
        .policy(Arc::new(HostAllowList::new([allowed])))
        .build()
        .unwrap();
    assert!(matches!(
        channel.connect(nowhere()),
        Err(ChannelError::AccessDenied(_))
    ));
    assert!(!channel.is_connected());
}

#[test]
fn test_disconnect_then_reconnect_elsewhere() {
    let net = fabric();
    let channel = open(&net);
    channel.disconnect().unwrap();

    channel.connect(nowhere()).unwrap();
    channel.disconnect().unwrap();
    assert!(!channel.is_connected());
    channel.disconnect().unwrap();
    assert!(!channel.is_connected());
    assert_eq!(channel.remote_address(), None);
    assert!(channel.is_bound());

    let other: SocketAddr = "127.0.0.1:10".parse().unwrap();
    channel.connect(other).unwrap();
    assert_eq!(channel.remote_address(), Some(other));
}

#[test]
fn test_failed_disconnect_keeps_peer() {
    let net = fabric();
    let channel = open(&net);
    channel.connect(nowhere()).unwrap();
    net.set_faults(LoopbackFaults {
        disconnect_error: Some(io::ErrorKind::PermissionDenied),
        ..Default::default()
    });

    let err = channel.disconnect().unwrap_err();
    assert!(matches!(err, ChannelError::Io(ref e) if e.kind() == io::ErrorKind::PermissionDenied));
    assert!(channel.is_connected());
    assert_eq!(channel.remote_address(), Some(nowhere()));

    net.clear_faults();
    channel.disconnect().unwrap();
    assert!(!channel.is_connected());
}

#[test]
fn test_connect_succeeds_after_injected_failure_clears() {
    let net = fabric();
    let (peer, peer_addr) = open_bound(&net);
    let channel = open(&net);
    net.set_faults(LoopbackFaults {
        connect_error: Some(io::ErrorKind::PermissionDenied),
        ..Default::default()
    });
    assert!(channel.connect(peer_addr).is_err());
    net.clear_faults();

    channel.connect(peer_addr).unwrap();
    assert_eq!(channel.write(&mut ByteBuffer::copy_from_slice(b"late")).unwrap(), 4);
    let mut buf = ByteBuffer::allocate(16);
    assert!(peer.receive(&mut buf).unwrap().is_some());
    assert_eq!(buf.filled(), b"late");
}

// ===== Close =====

#[test]
fn test_close_is_idempotent_and_clears_connection() {
    let net = fabric();
    let channel = open(&net);
    channel.connect(nowhere()).unwrap();
    channel.close().unwrap();
    channel.close().unwrap();
    assert!(!channel.is_open());
    assert_eq!(channel.open_state(), OpenState::Closed);
    assert!(!channel.is_connected());
    assert_eq!(channel.local_address(), None);
    channel.disconnect().unwrap();
}

#[test]
fn test_operations_after_close_fail_closed() {
    let net = fabric();
    let channel = open(&net);
    channel.close().unwrap();

    assert!(matches!(channel.bind(any()), Err(ChannelError::Closed)));
    assert!(matches!(channel.connect(nowhere()), Err(ChannelError::Closed)));
    assert!(matches!(
        channel.configure_blocking(false),
        Err(ChannelError::Closed)
    ));
    let mut buf = ByteBuffer::allocate(8);
    assert!(matches!(channel.receive(&mut buf), Err(ChannelError::Closed)));
    assert!(matches!(
        channel.send(&mut buf, nowhere()),
        Err(ChannelError::Closed)
    ));
    // Closed takes precedence over NotYetConnected.
    assert!(matches!(channel.read(&mut buf), Err(ChannelError::Closed)));
    assert!(matches!(channel.write(&mut buf), Err(ChannelError::Closed)));
}

#[test]
fn test_close_releases_blocked_receive() {
    let net = fabric();
    let (channel, _) = open_bound(&net);
    let channel = Arc::new(channel);

    let receiver = {
        let channel = Arc::clone(&channel);
        thread::spawn(move || {
            let mut buf = ByteBuffer::allocate(64);
            let result = channel.receive(&mut buf);
            (result.map_err(|e| e.to_string()), buf.position())
        })
    };

    wait_for_blocked(&channel);
    let started = Instant::now();
    channel.close().unwrap();
    let (result, position) = receiver.join().unwrap();
    assert_eq!(result, Ok(None));
    assert_eq!(position, 0);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(channel.blocking_sections_in_flight(), 0);
}

#[test]
fn test_close_releases_blocked_read() {
    let net = fabric();
    let channel = Arc::new(open(&net));
    channel.connect(nowhere()).unwrap();

    let reader = {
        let channel = Arc::clone(&channel);
        thread::spawn(move || {
            let mut buf = ByteBuffer::allocate(64);
            channel.read(&mut buf).map_err(|e| e.to_string())
        })
    };

    wait_for_blocked(&channel);
    channel.close().unwrap();
    assert_eq!(reader.join().unwrap(), Ok(0));
}

// ===== Receive =====

#[test]
fn test_receive_unbound_returns_none_immediately() {
    let net = fabric();
    let channel = open(&net);
    let mut buf = ByteBuffer::allocate(8);
    assert_eq!(channel.receive(&mut buf).unwrap(), None);
    assert_eq!(buf.position(), 0);
}

#[test]
fn test_receive_read_only_rejected() {
    let net = fabric();
    let (channel, _) = open_bound(&net);
    let mut buf = ByteBuffer::allocate(8).into_read_only();
    assert!(matches!(
        channel.receive(&mut buf),
        Err(ChannelError::UnwritableBuffer)
    ));
}

#[test]
fn test_send_receive_round_trip() {
    let net = fabric();
    let (server, server_addr) = open_bound(&net);
    let client = open(&net);

    let mut out = ByteBuffer::copy_from_slice(b"hello");
    assert_eq!(client.send(&mut out, server_addr).unwrap(), 5);
    assert!(!out.has_remaining());
    assert!(!client.is_bound());

    let mut buf = ByteBuffer::allocate(64);
    let from = server.receive(&mut buf).unwrap();
    assert_eq!(buf.filled(), b"hello");
    assert!(from.is_some_and(|addr| addr.ip().is_loopback()));
}

#[test]
fn test_non_blocking_receive_with_nothing_queued() {
    let net = fabric();
    let (channel, _) = open_bound(&net);
    channel.configure_blocking(false).unwrap();
    let mut buf = ByteBuffer::allocate(8);
    assert_eq!(channel.receive(&mut buf).unwrap(), None);
    assert_eq!(buf.position(), 0);
}

#[test]
fn test_receive_truncates_to_remaining() {
    let net = fabric();
    let (server, server_addr) = open_bound(&net);
    let (client, _) = open_bound(&net);

    client
        .send(&mut ByteBuffer::copy_from_slice(b"abcdef"), server_addr)
        .unwrap();
    let mut buf = ByteBuffer::allocate(4);
    server.receive(&mut buf).unwrap();
    assert_eq!(buf.filled(), b"abcd");
}

#[test]
fn test_receive_discards_refused_senders() {
    let net = fabric();
    let (stranger, _) = open_bound(&net);

    // Every channel of this fabric binds to 127.0.0.1, so allow nothing and
    // check that a non-blocking receive drops the datagram.
    let server = DatagramChannel::builder(net.clone())
        .policy(Arc::new(HostAllowList::new(Vec::<IpAddr>::new())))
        .blocking(false)
        .build()
        .unwrap();
    server.bind(any()).unwrap();
    let server_addr = server.local_address().unwrap();

    stranger
        .send(&mut ByteBuffer::copy_from_slice(b"x"), server_addr)
        .unwrap();
    let mut buf = ByteBuffer::allocate(8);
    assert_eq!(server.receive(&mut buf).unwrap(), None);
    assert_eq!(buf.position(), 0);
}

#[test]
fn test_connected_receive_only_from_peer() {
    let net = fabric();
    let (peer, peer_addr) = open_bound(&net);
    let (stranger, _) = open_bound(&net);
    let (channel, channel_addr) = open_bound(&net);
    channel.connect(peer_addr).unwrap();

    stranger
        .send(&mut ByteBuffer::copy_from_slice(b"noise"), channel_addr)
        .unwrap();
    peer.send(&mut ByteBuffer::copy_from_slice(b"signal"), channel_addr)
        .unwrap();

    let mut buf = ByteBuffer::allocate(16);
    let from = channel.receive(&mut buf).unwrap();
    assert_eq!(from, Some(peer_addr));
    assert_eq!(buf.filled(), b"signal");
}

// ===== Send =====

#[test]
fn test_send_to_other_than_peer_rejected() {
    let net = fabric();
    let channel = open(&net);
    channel.connect(nowhere()).unwrap();
    let mut out = ByteBuffer::copy_from_slice(b"abc");
    let other: SocketAddr = "127.0.0.1:10".parse().unwrap();
    assert!(matches!(
        channel.send(&mut out, other),
        Err(ChannelError::IllegalArgument(_))
    ));
    assert_eq!(out.position(), 0);
    assert_eq!(channel.send(&mut out, nowhere()).unwrap(), 3);
}

#[test]
fn test_send_unresolved_is_io_error() {
    let net = fabric();
    let channel = open(&net);
    let mut out = ByteBuffer::copy_from_slice(b"abc");
    let err = channel
        .send(&mut out, Endpoint::unresolved("peer.invalid", 9))
        .unwrap_err();
    assert!(matches!(err, ChannelError::Io(_)));
    assert_eq!(out.position(), 0);
}

#[test]
fn test_send_partial_acceptance_advances_by_count() {
    let net = fabric();
    let (server, server_addr) = open_bound(&net);
    let client = open(&net);
    net.set_faults(LoopbackFaults {
        send_limit: Some(3),
        ..Default::default()
    });

    let mut out = ByteBuffer::copy_from_slice(b"abcdef");
    assert_eq!(client.send(&mut out, server_addr).unwrap(), 3);
    assert_eq!(out.position(), 3);

    let mut buf = ByteBuffer::allocate(16);
    server.receive(&mut buf).unwrap();
    assert_eq!(buf.filled(), b"abc");
}

// ===== Connected-mode transfers =====

#[test]
fn test_read_write_require_connection() {
    let net = fabric();
    let (channel, _) = open_bound(&net);
    let mut buf = ByteBuffer::allocate(8);
    assert!(matches!(
        channel.read(&mut buf),
        Err(ChannelError::NotYetConnected)
    ));
    assert!(matches!(
        channel.write(&mut buf),
        Err(ChannelError::NotYetConnected)
    ));
    let mut bufs = vec![ByteBuffer::allocate(4)];
    assert!(matches!(
        channel.read_all(&mut bufs),
        Err(ChannelError::NotYetConnected)
    ));
    assert!(matches!(
        channel.write_all(&mut bufs),
        Err(ChannelError::NotYetConnected)
    ));
}

#[test]
fn test_read_write_between_connected_pair() {
    let net = fabric();
    let (a, a_addr) = open_bound(&net);
    let (b, b_addr) = open_bound(&net);
    a.connect(b_addr).unwrap();
    b.connect(a_addr).unwrap();

    assert_eq!(a.write(&mut ByteBuffer::copy_from_slice(b"ping")).unwrap(), 4);
    let mut buf = ByteBuffer::allocate(16);
    assert_eq!(b.read(&mut buf).unwrap(), 4);
    assert_eq!(buf.filled(), b"ping");

    // Empty buffers transfer nothing and do not block.
    assert_eq!(b.read(&mut ByteBuffer::allocate(0)).unwrap(), 0);
    assert_eq!(a.write(&mut ByteBuffer::allocate(0)).unwrap(), 0);
}

#[test]
fn test_write_gather_partial_acceptance() {
    let net = fabric();
    let (a, a_addr) = open_bound(&net);
    let (b, b_addr) = open_bound(&net);
    a.connect(b_addr).unwrap();
    b.connect(a_addr).unwrap();
    net.set_faults(LoopbackFaults {
        send_limit: Some(8),
        ..Default::default()
    });

    let mut srcs = vec![
        ByteBuffer::copy_from_slice(b"zzzzz"),
        ByteBuffer::copy_from_slice(b"abcdefg"),
        ByteBuffer::copy_from_slice(b"hij"),
    ];
    assert_eq!(a.write_gather(&mut srcs, 1, 2).unwrap(), 8);
    assert_eq!(srcs[0].position(), 0);
    assert_eq!(srcs[1].position(), 7);
    assert_eq!(srcs[2].position(), 1);

    let mut buf = ByteBuffer::allocate(16);
    b.read(&mut buf).unwrap();
    assert_eq!(buf.filled(), b"abcdefgh");
}

#[test]
fn test_read_scatter_fills_in_order() {
    let net = fabric();
    let (a, a_addr) = open_bound(&net);
    let (b, b_addr) = open_bound(&net);
    a.connect(b_addr).unwrap();
    b.connect(a_addr).unwrap();

    a.write(&mut ByteBuffer::copy_from_slice(b"hello")).unwrap();
    let mut dsts = vec![
        ByteBuffer::allocate(4),
        ByteBuffer::allocate(2),
        ByteBuffer::allocate(3),
    ];
    assert_eq!(b.read_scatter(&mut dsts, 1, 2).unwrap(), 5);
    assert_eq!(dsts[0].position(), 0);
    assert_eq!(dsts[1].filled(), b"he");
    assert_eq!(dsts[2].filled(), b"llo");
}

#[test]
fn test_scatter_gather_range_checked_before_state() {
    let net = fabric();
    let channel = open(&net);
    let mut bufs = vec![ByteBuffer::allocate(4), ByteBuffer::allocate(4)];
    assert!(matches!(
        channel.read_scatter(&mut bufs, 1, 2),
        Err(ChannelError::IndexOutOfBounds { offset: 1, length: 2, len: 2 })
    ));
    assert!(matches!(
        channel.write_gather(&mut bufs, 3, 0),
        Err(ChannelError::IndexOutOfBounds { .. })
    ));
}

#[test]
fn test_read_scatter_rejects_read_only_target() {
    let net = fabric();
    let channel = open(&net);
    channel.connect(nowhere()).unwrap();
    let mut dsts = vec![
        ByteBuffer::allocate(4),
        ByteBuffer::allocate(4).into_read_only(),
    ];
    assert!(matches!(
        channel.read_all(&mut dsts),
        Err(ChannelError::UnwritableBuffer)
    ));
}

#[test]
fn test_concurrent_writers_do_not_interleave() {
    const WRITERS: u8 = 4;
    const PER_WRITER: usize = 50;

    let net = fabric();
    let (sink, sink_addr) = open_bound(&net);
    let writer = Arc::new(open(&net));
    writer.connect(sink_addr).unwrap();

    let handles: Vec<_> = (0..WRITERS)
        .map(|id| {
            let writer = Arc::clone(&writer);
            thread::spawn(move || {
                for _ in 0..PER_WRITER {
                    let mut out = ByteBuffer::wrap(vec![id; 32]);
                    writer.write(&mut out).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    sink.configure_blocking(false).unwrap();
    let mut seen = [0usize; WRITERS as usize];
    let mut buf = ByteBuffer::allocate(64);
    while sink.receive(&mut buf).unwrap().is_some() {
        let datagram = buf.filled();
        assert_eq!(datagram.len(), 32);
        assert!(datagram.iter().all(|b| *b == datagram[0]));
        seen[datagram[0] as usize] += 1;
        buf.clear();
    }
    assert_eq!(seen, [PER_WRITER; WRITERS as usize]);
}

#[test]
fn test_dropped_sends_report_full_count() {
    let net = fabric();
    let (server, server_addr) = open_bound(&net);
    server.configure_blocking(false).unwrap();
    let client = open(&net);
    net.set_faults(LoopbackFaults {
        drop_sends: true,
        ..Default::default()
    });

    let mut out = ByteBuffer::copy_from_slice(b"lost");
    assert_eq!(client.send(&mut out, server_addr).unwrap(), 4);
    let mut buf = ByteBuffer::allocate(8);
    assert_eq!(server.receive(&mut buf).unwrap(), None);
}

// ===== Blocking mode =====

#[test]
fn test_configure_blocking_round_trip_without_keys() {
    let net = fabric();
    let channel = open(&net);
    channel.configure_blocking(false).unwrap();
    assert!(!channel.is_blocking());
    channel.configure_blocking(false).unwrap();
    channel.configure_blocking(true).unwrap();
    assert!(channel.is_blocking());
}

// ===== Socket adapter =====

#[test]
fn test_adapter_reflects_channel_state() {
    let net = fabric();
    let channel = open(&net);
    let socket = channel.socket();
    assert!(!socket.is_bound());
    assert_eq!(socket.inet_address(), None);
    assert_eq!(socket.port(), None);

    socket.connect(nowhere()).unwrap();
    assert!(socket.is_connected());
    assert_eq!(socket.inet_address(), Some(nowhere().ip()));
    assert_eq!(socket.port(), Some(9));
    assert!(matches!(
        socket.bind(any()),
        Err(ChannelError::AlreadyConnected)
    ));

    socket.disconnect();
    assert!(!channel.is_connected());
    socket.close().unwrap();
    assert!(socket.is_closed());
    assert!(!channel.is_open());
}

#[test]
fn test_adapter_packet_round_trip() {
    let net = fabric();
    let (server, server_addr) = open_bound(&net);
    let client = open(&net);

    client
        .socket()
        .send(&DatagramPacket::new(b"datagram", Some(server_addr)))
        .unwrap();

    let mut packet = DatagramPacket::with_capacity(64);
    server.socket().receive(&mut packet).unwrap();
    assert_eq!(packet.data(), b"datagram");
    assert!(packet.address().is_some());
    assert_eq!(packet.capacity(), 64);
}

#[test]
fn test_adapter_send_to_connected_peer_without_address() {
    let net = fabric();
    let (server, server_addr) = open_bound(&net);
    let client = open(&net);
    client.connect(server_addr).unwrap();

    client.socket().send(&DatagramPacket::new(b"hi", None)).unwrap();
    let mut packet = DatagramPacket::with_capacity(8);
    server.socket().receive(&mut packet).unwrap();
    assert_eq!(packet.data(), b"hi");

    let unconnected = open(&net);
    assert!(matches!(
        unconnected.socket().send(&DatagramPacket::new(b"hi", None)),
        Err(ChannelError::IllegalArgument(_))
    ));
}

#[test]
fn test_adapter_requires_blocking_mode() {
    let net = fabric();
    let (channel, addr) = open_bound(&net);
    channel.configure_blocking(false).unwrap();
    let socket = channel.socket();
    assert!(matches!(
        socket.send(&DatagramPacket::new(b"x", Some(addr))),
        Err(ChannelError::IllegalBlockingMode)
    ));
    let mut packet = DatagramPacket::with_capacity(8);
    assert!(matches!(
        socket.receive(&mut packet),
        Err(ChannelError::IllegalBlockingMode)
    ));
}

#[test]
fn test_adapter_receive_binds_implicitly() {
    let net = fabric();
    let channel = Arc::new(open(&net));

    let receiver = {
        let channel = Arc::clone(&channel);
        thread::spawn(move || {
            let mut packet = DatagramPacket::with_capacity(8);
            channel
                .socket()
                .receive(&mut packet)
                .map(|()| packet.data().to_vec())
                .map_err(|e| e.to_string())
        })
    };

    let deadline = Instant::now() + Duration::from_secs(5);
    while channel.local_address().is_none() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    let target = channel.local_address().unwrap();
    let sender = open(&net);
    sender
        .send(&mut ByteBuffer::copy_from_slice(b"wake"), target)
        .unwrap();
    assert_eq!(receiver.join().unwrap(), Ok(b"wake".to_vec()));
    assert!(channel.is_bound());
}
