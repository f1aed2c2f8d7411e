//! `croak` is a CoAP message engine for devices that can't afford
//! to allocate per message.
//!
//! ## Memory
//! Every message croak will ever handle lives in one arena carved
//! up at startup into blocks of 5 size classes (see [`config::PoolConfig`]).
//! A message is an [`Envelope`](envelope::Envelope) (header, addressing,
//! send bookkeeping) plus one attached block holding its token,
//! options and payload, edited in place with [`croak_msg::Body`].
//!
//! When the pool runs dry, croak drops (and for UDP, RESETs) rather
//! than allocating; see [`pool::Stats`] and [`engine::Status`].
//!
//! ## Flow
//! ```text
//!   socket ──> udp_received / tcp_received ──> UdpRecv / TcpRecv queue
//!                                                      │
//!                                           dispatch ──┘── route handler
//!                                                      │
//!   socket <── transmit <── UdpXmit / TcpXmit queue <──┘
//! ```
//!
//! An [`Engine`](engine::Engine) owns the pool, the queues and the
//! platform (clock, sockets, hooks, routes). The host drives it:
//! receive threads (or an interrupt handler) call
//! [`Engine::poll_udp`](engine::Engine::poll_udp) or feed datagrams to
//! [`Engine::udp_received`](engine::Engine::udp_received), and a
//! processing loop calls [`Engine::poll`](engine::Engine::poll).
//!
//! ```no_run
//! use croak::config::Config;
//! use croak::dispatch::Disposition;
//! use croak::respond::Exchange;
//! use croak::route::Route;
//! use croak::{code, engine::Drain};
//! use croak_msg::opt::ContentFormat;
//!
//! fn hello(ex: &mut Exchange<'_>, _: usize) -> Disposition {
//!   ex.respond(code::CONTENT).ok();
//!   ex.append_payload(b"hello", ContentFormat::Text).ok();
//!   Disposition::SendResponse
//! }
//!
//! let routes = vec![Route::new("hello").get(hello)];
//! let engine = croak::std::bind("0.0.0.0:5683", Config::default(), routes).unwrap();
//!
//! loop {
//!   while engine.poll_udp().is_ok() {}
//!   engine.poll(Drain::All).ok();
//! }
//! ```

// x-release-please-start-version
#![doc(html_root_url = "https://docs.rs/croak/0.1.0")]
// x-release-please-end
#![cfg_attr(any(docsrs, feature = "docs"), feature(doc_cfg))]
// -
// style
#![allow(clippy::unused_unit)]
// -
// deny
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![deny(missing_copy_implementations)]
#![cfg_attr(not(test), deny(unsafe_code))]
// -
// warnings
#![cfg_attr(not(test), warn(unreachable_pub))]
// -
// features
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc as std_alloc;

pub(crate) mod logging;

#[doc(hidden)]
pub mod writable;

/// response & request codes
pub mod code;

/// configuring runtime behavior
pub mod config;

/// receive dispatcher
pub mod dispatch;

/// the engine context and receive path
pub mod engine;

/// message envelopes
pub mod envelope;

/// engine errors
pub mod error;

/// network abstractions
pub mod net;

/// platform configuration
pub mod platform;

/// size-classed message pool
pub mod pool;

/// time-ordered message queues
pub mod queue;

/// response builder and request handler context
pub mod respond;

/// resource routing
pub mod route;

/// time abstractions
pub mod time;

/// transmit engine
pub mod transmit;

/// `std`-only croak stuff
#[cfg(feature = "std")]
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
pub mod std;


/// The default CoAP port
pub const DEFAULT_PORT: u16 = 5683;

/// Largest message (header excluded) croak will receive or send
pub const MAX_MESSAGE_SIZE: usize = 1280;

/// Largest response payload the response builder will produce
pub const MAX_PAYLOAD_SIZE: usize = 1024;

/// Size of the stack buffer datagrams are serialized into
pub const DGRAM_CAPACITY: usize = croak_msg::HEADER_SIZE + MAX_MESSAGE_SIZE;

/// Helper constants and functions for creating multicast addresses
pub mod multicast {
  use no_std_net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};

  /// IPv4 "All CoAP devices" multicast address.
  ///
  /// If using multicast to discover devices, it's recommended
  /// that you use this address with a port specific to your application.
  pub const ALL_COAP_DEVICES_IP: Ipv4Addr = Ipv4Addr::new(224, 0, 1, 187);

  /// Create a SocketAddr (IP + port) with the [`ALL_COAP_DEVICES_IP`] address
  ///
  /// ```
  /// use croak::multicast::{all_coap_devices, ALL_COAP_DEVICES_IP};
  ///
  /// assert_eq!(all_coap_devices(5683).ip(), no_std_net::IpAddr::V4(ALL_COAP_DEVICES_IP));
  /// ```
  pub const fn all_coap_devices(port: u16) -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(ALL_COAP_DEVICES_IP, port))
  }

  /// Whether a datagram that landed on `addr` was sent to an IPv4 multicast group
  ///
  /// ```
  /// use croak::multicast::{all_coap_devices, is_ipv4_multicast};
  ///
  /// assert!(is_ipv4_multicast(all_coap_devices(5683)));
  /// assert!(!is_ipv4_multicast("10.0.0.1:5683".parse().unwrap()));
  /// ```
  pub fn is_ipv4_multicast(addr: SocketAddr) -> bool {
    matches!(addr.ip(), IpAddr::V4(ip) if ip.is_multicast())
  }
}

macro_rules! code {
  (#[doc = $doc:expr] $name:ident = $c:literal * $d:literal) => {
    #[doc = $doc]
    #[allow(clippy::zero_prefixed_literal)]
    pub const $name: croak_msg::Code = croak_msg::Code::new($c, $d);
  };
  (#[doc = $doc:expr] $name:ident = $newtype:tt($c:literal * $d:literal)) => {
    #[doc = $doc]
    #[allow(clippy::zero_prefixed_literal)]
    pub const $name: $newtype = $newtype(croak_msg::Code::new($c, $d));
  };
}

pub(crate) use code as code_macro;
