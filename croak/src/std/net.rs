use std::io::{self, Read, Write};
use std::net::{TcpStream, UdpSocket};

use croak_lock::Lock;
use no_std_net as no_std;

use crate::net::{Addrd, Recvd, Socket};

pub(crate) fn io_to_nb(err: io::Error) -> nb::Error<io::Error> {
  match err.kind() {
    | io::ErrorKind::WouldBlock => nb::Error::WouldBlock,
    | _ => nb::Error::Other(err),
  }
}

/// Convert a `no_std_net` address to a `std::net` one
pub fn to_std(addr: no_std::SocketAddr) -> std::net::SocketAddr {
  match addr {
    | no_std::SocketAddr::V4(v4) => {
      let [a, b, c, d] = v4.ip().octets();
      std::net::SocketAddr::V4(std::net::SocketAddrV4::new(std::net::Ipv4Addr::new(a, b, c, d),
                                                           v4.port()))
    },
    | no_std::SocketAddr::V6(v6) => {
      let [a, b, c, d, e, f, g, h] = v6.ip().segments();
      std::net::SocketAddr::V6(std::net::SocketAddrV6::new(std::net::Ipv6Addr::new(a, b, c, d, e, f, g, h),
                                                           v6.port(),
                                                           v6.flowinfo(),
                                                           v6.scope_id()))
    },
  }
}

/// Convert a `std::net` address to a `no_std_net` one
pub fn from_std(addr: std::net::SocketAddr) -> no_std::SocketAddr {
  match addr {
    | std::net::SocketAddr::V4(v4) => {
      let [a, b, c, d] = v4.ip().octets();
      no_std::SocketAddr::V4(no_std::SocketAddrV4::new(no_std::Ipv4Addr::new(a, b, c, d), v4.port()))
    },
    | std::net::SocketAddr::V6(v6) => {
      let [a, b, c, d, e, f, g, h] = v6.ip().segments();
      no_std::SocketAddr::V6(no_std::SocketAddrV6::new(no_std::Ipv6Addr::new(a, b, c, d, e, f, g, h),
                                                       v6.port(),
                                                       v6.flowinfo(),
                                                       v6.scope_id()))
    },
  }
}

impl Socket for UdpSocket {
  type Error = io::Error;

  fn local_addr(&self) -> Result<no_std::SocketAddr, Self::Error> {
    UdpSocket::local_addr(self).map(from_std)
  }

  fn send(&self, msg: Addrd<&[u8]>) -> nb::Result<(), Self::Error> {
    self.send_to(msg.data(), to_std(msg.addr()))
        .map(|_| ())
        .map_err(io_to_nb)
  }

  /// `to` is always the socket's bound address; `std` has no
  /// portable way to recover a datagram's destination group.
  fn recv(&self, buffer: &mut [u8]) -> nb::Result<Recvd, Self::Error> {
    let (len, from) = self.recv_from(buffer).map_err(io_to_nb)?;
    let to = Socket::local_addr(self).map_err(nb::Error::Other)?;

    Ok(Recvd { len,
               from: from_std(from),
               to })
  }

  fn join_multicast(&self, addr: no_std::IpAddr) -> Result<(), Self::Error> {
    match addr {
      | no_std::IpAddr::V4(ip) => {
        let [a, b, c, d] = ip.octets();
        self.join_multicast_v4(&std::net::Ipv4Addr::new(a, b, c, d),
                               &std::net::Ipv4Addr::UNSPECIFIED)
      },
      | no_std::IpAddr::V6(ip) => {
        let [a, b, c, d, e, f, g, h] = ip.segments();
        self.join_multicast_v6(&std::net::Ipv6Addr::new(a, b, c, d, e, f, g, h), 0)
      },
    }
  }
}

/// Bytes in front of every message on a [`TcpConn`]: its length as a
/// big-endian `u16`
pub const FRAME_PREFIX: usize = 2;

/// A non-blocking TCP connection carrying length-prefixed messages.
///
/// Bytes read past the end of a message wait for the next
/// [`recv`](Socket::recv). Bytes the stream won't take yet wait
/// in a backlog that every `send` and `recv` tries to flush, so a
/// message is never left half-written. The remote address of a send
/// is ignored in favor of the stream's peer.
#[derive(Debug)]
pub struct TcpConn {
  stream: TcpStream,
  rx: Lock<Vec<u8>>,
  tx: Lock<Vec<u8>>,
}

impl TcpConn {
  /// Wrap a stream, switching it to non-blocking
  pub fn new(stream: TcpStream) -> io::Result<Self> {
    stream.set_nonblocking(true)?;
    Ok(Self { stream,
              rx: Lock::new(Vec::new()),
              tx: Lock::new(Vec::new()) })
  }

  /// The wrapped stream
  pub fn stream(&self) -> &TcpStream {
    &self.stream
  }

  /// Bytes accepted by `send` that the stream hasn't taken yet
  pub fn backlog(&self) -> usize {
    self.tx.read(|tx| tx.len())
  }

  /// Write as much of the backlog as the stream will take
  pub fn flush(&self) -> io::Result<()> {
    self.tx.write(|tx| {
             let mut stream = &self.stream;
             while !tx.is_empty() {
               match stream.write(&tx[..]) {
                 | Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero)),
                 | Ok(n) => drop(tx.drain(..n)),
                 | Err(e) if e.kind() == io::ErrorKind::Interrupted => (),
                 | Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                 | Err(e) => return Err(e),
               }
             }
             Ok(())
           })
  }
}

/// Append `msg` to `out` behind its length prefix
fn frame(msg: &[u8], out: &mut Vec<u8>) -> io::Result<()> {
  let len = u16::try_from(msg.len()).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
  out.extend_from_slice(&len.to_be_bytes());
  out.extend_from_slice(msg);
  Ok(())
}

/// Length of the message in the first frame of `rx`, once all of
/// it has arrived
fn complete_frame(rx: &[u8]) -> Option<usize> {
  match rx {
    | [a, b, rest @ ..] => {
      let len = u16::from_be_bytes([*a, *b]) as usize;
      (rest.len() >= len).then(|| len)
    },
    | _ => None,
  }
}

impl Socket for TcpConn {
  type Error = io::Error;

  fn local_addr(&self) -> Result<no_std::SocketAddr, Self::Error> {
    self.stream.local_addr().map(from_std)
  }

  fn send(&self, msg: Addrd<&[u8]>) -> nb::Result<(), Self::Error> {
    self.tx
        .write(|tx| frame(msg.data(), tx))
        .map_err(nb::Error::Other)?;
    self.flush().map_err(nb::Error::Other)
  }

  /// Yields one message per call. A message longer than `buffer` is
  /// cut short, like a datagram would be.
  fn recv(&self, buffer: &mut [u8]) -> nb::Result<Recvd, Self::Error> {
    self.flush().map_err(nb::Error::Other)?;

    let len = self.rx.write(|rx| {
                       let mut chunk = [0u8; 512];
                       let mut stream = &self.stream;

                       let len = loop {
                         if let Some(len) = complete_frame(&rx[..]) {
                           break len;
                         }

                         match stream.read(&mut chunk) {
                           | Ok(0) => {
                             return Err(nb::Error::Other(io::Error::from(io::ErrorKind::UnexpectedEof)))
                           },
                           | Ok(n) => rx.extend_from_slice(&chunk[..n]),
                           | Err(e) if e.kind() == io::ErrorKind::Interrupted => (),
                           | Err(e) => return Err(io_to_nb(e)),
                         }
                       };

                       let copied = len.min(buffer.len());
                       buffer[..copied].copy_from_slice(&rx[FRAME_PREFIX..FRAME_PREFIX + copied]);
                       rx.drain(..FRAME_PREFIX + len);
                       Ok(copied)
                     })?;

    let from = self.stream.peer_addr().map_err(nb::Error::Other)?;
    let to = Socket::local_addr(self).map_err(nb::Error::Other)?;

    Ok(Recvd { len,
               from: from_std(from),
               to })
  }

  fn join_multicast(&self, _: no_std::IpAddr) -> Result<(), Self::Error> {
    Err(io::Error::from(io::ErrorKind::Unsupported))
  }
}
