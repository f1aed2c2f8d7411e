use croak_msg::{BodyRef, Header, Id};
use no_std_net::SocketAddr;

use crate::net::{Socket, Transport};
use crate::route::Routes;
use crate::time::Clock;

/// Things the engine tells the application about, best-effort.
///
/// Every method has a no-op default, and `()` implements
/// `Hooks` for platforms that don't care.
pub trait Hooks {
  /// A message expecting a response was just sent for the first time
  fn response_expected(&self, transport: Transport, remote: SocketAddr, id: Id, token: &[u8]) {
    let _ = (transport, remote, id, token);
  }

  /// A response (piggybacked on an ACK, or separate) came in
  fn response_received(&self, transport: Transport, remote: SocketAddr, header: &Header, body: BodyRef<'_>) {
    let _ = (transport, remote, header, body);
  }

  /// Something was received on a transport
  fn activity(&self, transport: Transport) {
    let _ = transport;
  }
}

impl Hooks for () {}

/// The types an [`Engine`](crate::engine::Engine) is built from
///
/// ```
/// use croak::net::Disconnected;
/// use croak::platform::Platform;
/// use croak::route::Route;
/// use croak::test::{ClockMock, SockMock};
///
/// struct Device;
///
/// impl Platform for Device {
///   type Clock = ClockMock;
///   type Udp = SockMock;
///   type Tcp = Disconnected;
///   type Hooks = ();
///   type Routes = [Route; 1];
/// }
/// ```
pub trait Platform: Sized {
  /// What time is it?
  type Clock: Clock;

  /// The UDP socket
  type Udp: Socket;

  /// The TCP connection, or [`Disconnected`](crate::net::Disconnected)
  type Tcp: Socket;

  /// See [`Hooks`]
  type Hooks: Hooks;

  /// See [`Routes`]
  type Routes: Routes;
}

/// Everything an engine needs from the platform
#[allow(missing_debug_implementations)]
pub struct Parts<P: Platform> {
  /// The clock
  pub clock: P::Clock,
  /// The UDP socket
  pub udp: P::Udp,
  /// The TCP connection
  pub tcp: P::Tcp,
  /// Application hooks
  pub hooks: P::Hooks,
  /// The route table
  pub routes: P::Routes,
}
