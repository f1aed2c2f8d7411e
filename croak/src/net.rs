use no_std_net::{IpAddr, SocketAddr};

/// Data that came from (or is going to) a network socket
#[derive(PartialEq, PartialOrd, Eq, Ord, Hash, Debug, Clone, Copy)]
pub struct Addrd<T>(pub T, pub SocketAddr);

impl<T> Addrd<T> {
  /// Borrow the contents of this Addressed
  pub fn as_ref(&self) -> Addrd<&T> {
    Addrd(self.data(), self.addr())
  }

  /// Discard the socket and get the data in this Addressed
  pub fn unwrap(self) -> T {
    self.0
  }

  /// Map the data contained in this Addressed
  pub fn map<R>(self, f: impl FnOnce(T) -> R) -> Addrd<R> {
    Addrd(f(self.0), self.1)
  }

  /// Borrow the contents of the addressed item
  pub fn data(&self) -> &T {
    &self.0
  }

  /// Copy the socket address for the data
  pub fn addr(&self) -> SocketAddr {
    self.1
  }
}

/// Which transport a message travels over
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Transport {
  /// UDP datagrams
  Udp,
  /// A TCP stream, one message per read
  Tcp,
}

impl Transport {
  /// Lowercase name for log lines
  pub fn name(&self) -> &'static str {
    match self {
      | Transport::Udp => "udp",
      | Transport::Tcp => "tcp",
    }
  }
}

/// A received datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Recvd {
  /// Bytes written to the receive buffer
  pub len: usize,
  /// The sender
  pub from: SocketAddr,
  /// The address the datagram landed on; a multicast
  /// group address when it was sent to one
  pub to: SocketAddr,
}

/// A CoAP network socket
///
/// This mirrors the Udp socket traits in embedded-nal, but allows us to
/// implement them for foreign types (like `std::net::UdpSocket`).
///
/// Implementors should be non-blocking: `send` and `recv` yield
/// [`nb::Error::WouldBlock`] rather than waiting.
pub trait Socket {
  /// The error yielded by socket operations
  type Error: core::fmt::Debug;

  /// Get the local address this socket was created from
  fn local_addr(&self) -> Result<SocketAddr, Self::Error>;

  /// Send a message to a remote address
  fn send(&self, msg: Addrd<&[u8]>) -> nb::Result<(), Self::Error>;

  /// Pull a buffered datagram from the socket, along with the address to the sender.
  ///
  /// It is expected that (like [`std::net::UdpSocket`]) if the message is larger
  /// than the buffer, those bytes are dropped and not considered an error condition.
  fn recv(&self, buffer: &mut [u8]) -> nb::Result<Recvd, Self::Error>;

  /// Join a multicast group
  fn join_multicast(&self, addr: IpAddr) -> Result<(), Self::Error>;
}

/// A [`Socket`] for platforms without a second transport.
///
/// Never receives anything, and every send fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Disconnected;

impl Socket for Disconnected {
  type Error = Disconnected;

  fn local_addr(&self) -> Result<SocketAddr, Self::Error> {
    Err(Disconnected)
  }

  fn send(&self, _: Addrd<&[u8]>) -> nb::Result<(), Self::Error> {
    Err(nb::Error::Other(Disconnected))
  }

  fn recv(&self, _: &mut [u8]) -> nb::Result<Recvd, Self::Error> {
    Err(nb::Error::WouldBlock)
  }

  fn join_multicast(&self, _: IpAddr) -> Result<(), Self::Error> {
    Err(Disconnected)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn disconnected() {
    let sock = Disconnected;
    let mut buf = [0u8; 4];
    assert_eq!(sock.recv(&mut buf), Err(nb::Error::WouldBlock));
    assert_eq!(sock.send(Addrd(&[1u8][..], "1.1.1.1:5683".parse().unwrap())),
               Err(nb::Error::Other(Disconnected)));
  }

  #[test]
  fn addrd_map() {
    let addr: SocketAddr = "10.0.0.1:5683".parse().unwrap();
    let a = Addrd(2u8, addr).map(|n| n * 2);
    assert_eq!(a, Addrd(4, addr));
    assert_eq!(a.as_ref().unwrap(), &4);
  }
}
