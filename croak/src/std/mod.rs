use std::io;
use std::net::{TcpStream, ToSocketAddrs, UdpSocket};

use embedded_time::rate::Fraction;

/// `std::net` sockets
pub mod net;
pub use net::{from_std, to_std, TcpConn};

use crate::config::Config;
use crate::engine::Engine;
use crate::multicast::ALL_COAP_DEVICES_IP;
use crate::net::{Disconnected, Socket};
use crate::platform::{Parts, Platform};
use crate::route::Route;

/// [`Platform`] for `std` hosts serving UDP only
#[derive(Debug, Clone, Copy)]
pub struct Std;

impl Platform for Std {
  type Clock = Clock;
  type Udp = UdpSocket;
  type Tcp = Disconnected;
  type Hooks = ();
  type Routes = Vec<Route>;
}

/// [`Platform`] for `std` hosts with a TCP connection as well
/// (see [`TcpConn`] for its framing)
#[derive(Debug, Clone, Copy)]
pub struct StdTcp;

impl Platform for StdTcp {
  type Clock = Clock;
  type Udp = UdpSocket;
  type Tcp = TcpConn;
  type Hooks = ();
  type Routes = Vec<Route>;
}

fn udp<A: ToSocketAddrs>(addr: A) -> io::Result<UdpSocket> {
  let sock = UdpSocket::bind(addr)?;
  sock.set_nonblocking(true)?;

  if let Err(e) = Socket::join_multicast(&sock, no_std_net::IpAddr::V4(ALL_COAP_DEVICES_IP)) {
    log::warn!("couldn't join All-CoAP-Devices group: {:?}", e);
  }

  Ok(sock)
}

/// Bind a non-blocking UDP socket (joined to the All-CoAP-Devices
/// group) and build an engine around it.
pub fn bind<A: ToSocketAddrs>(addr: A, config: Config, routes: Vec<Route>) -> io::Result<Engine<Std>> {
  let udp = udp(addr)?;
  log::info!("croak listening on {:?}", udp.local_addr());

  Ok(Engine::new(config,
                 Parts { clock: Clock::new(),
                         udp,
                         tcp: Disconnected,
                         hooks: (),
                         routes }))
}

/// [`bind`], with a TCP connection as the second transport.
///
/// Both ends of the connection prefix each message with its length
/// as a big-endian `u16`.
pub fn bind_with_tcp<A: ToSocketAddrs>(addr: A,
                                       tcp: TcpStream,
                                       config: Config,
                                       routes: Vec<Route>)
                                       -> io::Result<Engine<StdTcp>> {
  let udp = udp(addr)?;
  let tcp = TcpConn::new(tcp)?;
  log::info!("croak listening on {:?}, connected to {:?}",
             udp.local_addr(),
             tcp.stream().peer_addr());

  Ok(Engine::new(config,
                 Parts { clock: Clock::new(),
                         udp,
                         tcp,
                         hooks: (),
                         routes }))
}

/// Implement [`embedded_time::Clock`] using [`std::time`] primitives
#[derive(Debug, Clone, Copy)]
pub struct Clock(std::time::Instant);

impl Default for Clock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock {
  /// Create a new clock
  pub fn new() -> Self {
    Self(std::time::Instant::now())
  }
}

impl embedded_time::Clock for Clock {
  type T = u64;

  // microseconds
  const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

  fn try_now(&self) -> Result<embedded_time::Instant<Self>, embedded_time::clock::Error> {
    let now = std::time::Instant::now();
    let elapsed = now.duration_since(self.0);
    Ok(embedded_time::Instant::new(elapsed.as_micros() as u64))
  }
}
