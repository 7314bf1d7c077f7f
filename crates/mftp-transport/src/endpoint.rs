//! # Datagram Endpoint
//!
//! Socket setup and thin send/recv wrappers shared by both engines.
//!
//! Receivers bind one inbound socket and block on it. Senders open one
//! unbound socket **per destination** with a 10 µs receive timeout: the
//! stop-and-wait loop polls every destination from a single thread, and
//! the sub-millisecond timeout turns `recv_from` into a near-non-blocking
//! operation without busy-spinning, keeping the poll round-robin fair.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use crate::TransportError;

/// Receive timeout applied to every outbound (sender-side) socket.
pub const POLL_TIMEOUT: Duration = Duration::from_micros(10);

/// Create the receiver's inbound socket, bound to `0.0.0.0:port`.
///
/// Port 0 requests an ephemeral port; use [`UdpSocket::local_addr`] to
/// discover which one was assigned.
pub fn bind_inbound(port: u16) -> Result<UdpSocket, TransportError> {
    UdpSocket::bind(("0.0.0.0", port)).map_err(|source| TransportError::Bind { port, source })
}

/// Create a sender-side socket with the short poll timeout. The OS picks
/// the local port; no explicit bind to a fixed address is performed.
pub fn open_outbound() -> Result<UdpSocket, TransportError> {
    let socket = UdpSocket::bind(("0.0.0.0", 0))?;
    socket.set_read_timeout(Some(POLL_TIMEOUT))?;
    Ok(socket)
}

/// Resolve `host:port` to a socket address.
pub fn resolve(host: &str, port: u16) -> Result<SocketAddr, TransportError> {
    (host, port)
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| TransportError::Resolve {
            host: host.to_string(),
        })
}

/// Resolve a destination spec: a bare `host` addressed on `default_port`,
/// or `host:port` overriding the shared port.
pub fn resolve_destination(spec: &str, default_port: u16) -> Result<SocketAddr, TransportError> {
    if spec.contains(':') {
        spec.to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| TransportError::Resolve {
                host: spec.to_string(),
            })
    } else {
        resolve(spec, default_port)
    }
}

/// Send one datagram.
pub fn send_to(socket: &UdpSocket, buf: &[u8], addr: SocketAddr) -> Result<(), TransportError> {
    socket.send_to(buf, addr)?;
    Ok(())
}

/// Receive one datagram. `None` on timeout; real socket failures
/// propagate.
pub fn recv_from(
    socket: &UdpSocket,
    buf: &mut [u8],
) -> Result<Option<(usize, SocketAddr)>, TransportError> {
    match socket.recv_from(buf) {
        Ok((n, src)) => Ok(Some((n, src))),
        Err(e)
            if e.kind() == std::io::ErrorKind::WouldBlock
                || e.kind() == std::io::ErrorKind::TimedOut =>
        {
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quanta::Instant;

    #[test]
    fn bind_inbound_ephemeral() {
        let socket = bind_inbound(0).unwrap();
        assert_ne!(socket.local_addr().unwrap().port(), 0);
    }

    #[test]
    fn outbound_recv_times_out_quickly() {
        let socket = open_outbound().unwrap();
        let mut buf = [0u8; 64];

        let start = Instant::now();
        let got = recv_from(&socket, &mut buf).unwrap();
        assert!(got.is_none(), "nothing was sent, must time out");
        assert!(
            start.elapsed() < Duration::from_millis(100),
            "poll timeout must be far below blocking"
        );
    }

    #[test]
    fn loopback_send_recv() {
        let inbound = bind_inbound(0).unwrap();
        let port = inbound.local_addr().unwrap().port();
        let outbound = open_outbound().unwrap();

        let dest = resolve("127.0.0.1", port).unwrap();
        send_to(&outbound, b"mftp", dest).unwrap();

        let mut buf = [0u8; 64];
        let (n, _src) = inbound.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"mftp");
    }

    #[test]
    fn resolve_localhost() {
        let addr = resolve("localhost", 9999).unwrap();
        assert_eq!(addr.port(), 9999);
    }

    #[test]
    fn resolve_garbage_fails() {
        let err = resolve("no.such.host.invalid.", 1).unwrap_err();
        assert!(matches!(err, TransportError::Resolve { .. }));
    }
}
