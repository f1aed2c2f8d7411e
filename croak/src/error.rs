use core::fmt;

use croak_msg::OptError;

use crate::net::Socket;
use crate::platform::Platform;
use crate::pool::PoolError;

/// The context that an error occurred in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum When {
  /// Feeding a received datagram to the engine
  Receiving,
  /// Sending a queued message
  Transmitting,
  /// Building an outbound request
  BuildingRequest,
  /// Pulling a datagram off of a platform socket
  Polling,
}

impl When {
  /// Construct a specific error from the context the error occurred in
  pub fn what<P: Platform>(self, what: What<P>) -> Error<P> {
    Error { when: self, what }
  }
}

/// A contextless error
pub enum What<P: Platform> {
  /// A UDP socket operation failed
  UdpSock(<P::Udp as Socket>::Error),
  /// A TCP socket operation failed
  TcpSock(<P::Tcp as Socket>::Error),
  /// The clock failed to provide timing
  Clock,
  /// An option could not be written
  Opt(OptError),
  /// The pool could not provide storage
  Pool(PoolError),
}

impl<P: Platform> fmt::Debug for What<P> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | What::UdpSock(e) => f.debug_tuple("UdpSock").field(e).finish(),
      | What::TcpSock(e) => f.debug_tuple("TcpSock").field(e).finish(),
      | What::Clock => f.write_str("Clock"),
      | What::Opt(e) => f.debug_tuple("Opt").field(e).finish(),
      | What::Pool(e) => f.debug_tuple("Pool").field(e).finish(),
    }
  }
}

/// An error encountered by the engine
pub struct Error<P: Platform> {
  /// What happened?
  pub what: What<P>,
  /// What were we doing when it happened?
  pub when: When,
}

impl<P: Platform> fmt::Debug for Error<P> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Error")
     .field("what", &self.what)
     .field("when", &self.when)
     .finish()
  }
}

impl<P: Platform> Error<P> {
  /// Is this a pool exhaustion error?
  pub fn pool_error(&self) -> Option<&PoolError> {
    match self.what {
      | What::Pool(ref e) => Some(e),
      | _ => None,
    }
  }
}
