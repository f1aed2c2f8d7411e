use croak_msg::Header;
use no_std_net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use crate::net::Transport;
use crate::queue::QueueId;
use crate::time::Tick;

/// Index of an envelope in the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EnvelopeIx(pub(crate) u16);

/// Index of a data block in the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockIx(pub(crate) u16);

/// Exclusive handle to an envelope that has been taken off of its queue.
///
/// Not `Clone`; handing it back with [`Pool::release`](crate::pool::Pool::release)
/// or [`Pool::add_at`](crate::pool::Pool::add_at) consumes it, so a message
/// can't be released twice or queued while still being worked on.
#[allow(missing_copy_implementations)]
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a Msg that is dropped without being released or queued leaks its envelope"]
pub struct Msg(pub(crate) EnvelopeIx);

impl Msg {
  /// Index of the envelope this handle owns
  pub fn ix(&self) -> EnvelopeIx {
    self.0
  }
}

/// Retransmission bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendState {
  /// Times the message has been (re)queued for sending
  pub attempts: u8,
  /// When the message was first sent
  pub initial: Option<Tick>,
  /// When the message is next due
  pub next: Tick,
  /// Whether the peer is expected to answer
  pub response_expected: bool,
}

/// Where a message came from or is going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Addressing {
  /// The transport it arrived on / will leave on
  pub transport: Transport,
  /// The peer
  pub remote: SocketAddr,
  /// The local address an inbound message landed on
  pub landing: SocketAddr,
}

const UNSPECIFIED: SocketAddr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(0, 0, 0, 0), 0));

impl Default for Addressing {
  fn default() -> Self {
    Addressing { transport: Transport::Udp,
                 remote: UNSPECIFIED,
                 landing: UNSPECIFIED }
  }
}

/// Per-message metadata; the token, options and payload live
/// in the attached block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Envelope {
  /// The 4-byte header
  pub header: Header,
  /// see [`SendState`]
  pub send: SendState,
  /// see [`Addressing`]
  pub addressing: Addressing,
  pub(crate) block: Option<BlockIx>,
  pub(crate) prev: Option<EnvelopeIx>,
  pub(crate) next: Option<EnvelopeIx>,
  pub(crate) queue: Option<QueueId>,
}

impl Envelope {
  /// The attached data block, if any
  pub fn block(&self) -> Option<BlockIx> {
    self.block
  }

  /// The queue this envelope is linked into, if any
  pub fn queue(&self) -> Option<QueueId> {
    self.queue
  }

  pub(crate) fn clear(&mut self) {
    *self = Envelope::default();
  }
}
