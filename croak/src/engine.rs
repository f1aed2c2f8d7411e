use core::ops::{BitOr, BitOrAssign};

use croak_lock::Lock;
use croak_msg::opt::{known, OptNumber};
use croak_msg::{Code, Header, Id, Token, Type, HEADER_SIZE, MAX_TOKEN_LEN};
use no_std_net::SocketAddr;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::code::Method;
use crate::config::Config;
use crate::envelope::Addressing;
use crate::error::{Error, What, When};
use crate::net::{Addrd, Socket, Transport};
use crate::platform::{Hooks, Parts, Platform};
use crate::pool::{Census, Pool, PoolError, Stats};
use crate::queue::QueueId;
use crate::time::Tick;
use crate::{logging, multicast, DGRAM_CAPACITY};

/// How much work a call to [`Engine::dispatch`], [`Engine::transmit`]
/// or [`Engine::poll`] should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drain {
  /// Handle at most one message from each transport's queue
  One,
  /// Keep going until both transports' queues are empty (or nothing is due)
  All,
}

/// Sticky flags accumulated by the engine and cleared by [`Engine::take_status`]
///
/// ```
/// use croak::engine::Status;
///
/// let s = Status::SEND_FAILED | Status::OVERSIZED;
/// assert!(s.contains(Status::OVERSIZED));
/// assert!(!s.contains(Status::ENVELOPES_EXHAUSTED));
/// assert!(Status::default().is_empty());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Status(pub u16);

impl Status {
  /// An allocation found no free envelope
  pub const ENVELOPES_EXHAUSTED: Status = Status(1);
  /// An allocation found every adequate size class empty
  pub const CLASS_EXHAUSTED: Status = Status(1 << 1);
  /// An allocation was larger than every size class
  pub const OVERSIZED: Status = Status(1 << 2);
  /// A message could not be sent
  pub const SEND_FAILED: Status = Status(1 << 3);
  /// A received datagram was dropped for being malformed
  pub const RECV_DROPPED: Status = Status(1 << 4);

  /// Are all of `other`'s flags set?
  pub fn contains(&self, other: Status) -> bool {
    self.0 & other.0 == other.0
  }

  /// Is no flag set?
  pub fn is_empty(&self) -> bool {
    self.0 == 0
  }
}

impl BitOr for Status {
  type Output = Status;

  fn bitor(self, rhs: Status) -> Status {
    Status(self.0 | rhs.0)
  }
}

impl BitOrAssign for Status {
  fn bitor_assign(&mut self, rhs: Status) {
    self.0 |= rhs.0;
  }
}

impl From<PoolError> for Status {
  fn from(e: PoolError) -> Self {
    match e {
      | PoolError::EnvelopesExhausted => Status::ENVELOPES_EXHAUSTED,
      | PoolError::ClassUnavailable { .. } | PoolError::Detached => Status::CLASS_EXHAUSTED,
      | PoolError::Oversized { .. } => Status::OVERSIZED,
    }
  }
}

/// State guarded by the engine's main lock
#[derive(Debug)]
pub(crate) struct Shared {
  pub(crate) pool: Pool,
  pub(crate) next_id: Id,
  pub(crate) rng: ChaCha8Rng,
  pub(crate) status: Status,
}

impl Shared {
  pub(crate) fn next_id(&mut self) -> Id {
    let id = self.next_id;
    self.next_id = id.next();
    id
  }
}

#[derive(Debug, Clone, Copy, Default)]
struct LastRx {
  udp: Option<Tick>,
  tcp: Option<Tick>,
}

impl LastRx {
  fn stamp(&mut self, transport: Transport, now: Tick) {
    match transport {
      | Transport::Udp => self.udp = Some(now),
      | Transport::Tcp => self.tcp = Some(now),
    }
  }
}

/// Queue that messages received over `transport` are dispatched from
pub(crate) fn recv_queue(transport: Transport) -> QueueId {
  match transport {
    | Transport::Udp => QueueId::UdpRecv,
    | Transport::Tcp => QueueId::TcpRecv,
  }
}

/// Queue that messages leaving over `transport` wait in
pub(crate) fn xmit_queue(transport: Transport) -> QueueId {
  match transport {
    | Transport::Udp => QueueId::UdpXmit,
    | Transport::Tcp => QueueId::TcpXmit,
  }
}

/// The message engine: pool, queues and platform, all in one owned context.
///
/// Every method takes `&self`; the pool and queues sit behind one
/// [`Lock`] that is only ever held for short, I/O-free sections, so
/// receive threads and the processing loop can share an `&Engine`.
#[allow(missing_debug_implementations)]
pub struct Engine<P: Platform> {
  pub(crate) config: Config,
  pub(crate) clock: P::Clock,
  pub(crate) udp: P::Udp,
  pub(crate) tcp: P::Tcp,
  pub(crate) hooks: P::Hooks,
  pub(crate) routes: P::Routes,
  pub(crate) shared: Lock<Shared>,
  last_rx: Lock<LastRx>,
  reset_tx: Lock<()>,
}

impl<P: Platform> Engine<P> {
  /// Allocate the pool and seed the id sequence
  pub fn new(config: Config, parts: Parts<P>) -> Self {
    let mut rng = ChaCha8Rng::seed_from_u64(config.msg.seed);
    let next_id = Id(rng.gen());

    Self { shared: Lock::new(Shared { pool: Pool::new(&config.pool),
                                      next_id,
                                      rng,
                                      status: Status::default() }),
           last_rx: Lock::new(LastRx::default()),
           reset_tx: Lock::new(()),
           config,
           clock: parts.clock,
           udp: parts.udp,
           tcp: parts.tcp,
           hooks: parts.hooks,
           routes: parts.routes }
  }

  /// The runtime config
  pub fn config(&self) -> Config {
    self.config
  }

  /// The platform clock
  pub fn clock(&self) -> &P::Clock {
    &self.clock
  }

  /// The UDP socket
  pub fn udp(&self) -> &P::Udp {
    &self.udp
  }

  /// The TCP connection
  pub fn tcp(&self) -> &P::Tcp {
    &self.tcp
  }

  /// The application hooks
  pub fn hooks(&self) -> &P::Hooks {
    &self.hooks
  }

  /// Snapshot of the pool's counters and queue lengths
  pub fn stats(&self) -> Stats {
    self.shared.read(|s| s.pool.stats())
  }

  /// Walk the pool's ownership graph (see [`Census::is_conserved`])
  pub fn census(&self) -> Census {
    self.shared.read(|s| s.pool.census())
  }

  /// Get and clear the sticky status flags
  pub fn take_status(&self) -> Status {
    self.shared
        .write(|s| core::mem::take(&mut s.status))
  }

  /// When something was last received over `transport`
  pub fn last_received(&self, transport: Transport) -> Option<Tick> {
    self.last_rx.read(|l| match transport {
                  | Transport::Udp => l.udp,
                  | Transport::Tcp => l.tcp,
                })
  }

  /// Drop every message waiting in a queue
  pub fn release_all(&self, queue: QueueId) {
    self.shared.write(|s| s.pool.release_all(queue))
  }

  pub(crate) fn now(&self, when: When) -> Result<Tick, Error<P>> {
    Tick::now(&self.clock).map_err(|_| when.what(What::Clock))
  }

  /// Feed a datagram received over UDP to the engine.
  ///
  /// `landing` is the local address it arrived on; when that is
  /// a multicast group, responses to it are delayed by a random
  /// backoff (see [`multicast_response_leisure`](crate::config::Msg::multicast_response_leisure)).
  ///
  /// Datagrams too short to hold a header and token, or with a
  /// token length over 8, are dropped. When no pool storage is
  /// available a RESET is sent straight back (unless the datagram
  /// was multicast) and the pool error is returned.
  pub fn udp_received(&self, bytes: &[u8], from: SocketAddr, landing: SocketAddr) -> Result<(), Error<P>> {
    self.received(Transport::Udp, bytes, from, landing)
  }

  /// Feed a message received over TCP to the engine.
  ///
  /// Each call carries exactly one message with the same
  /// framing as UDP.
  pub fn tcp_received(&self, bytes: &[u8], from: SocketAddr) -> Result<(), Error<P>> {
    let landing = self.tcp.local_addr().unwrap_or(Addressing::default().landing);
    self.received(Transport::Tcp, bytes, from, landing)
  }

  fn received(&self,
              transport: Transport,
              bytes: &[u8],
              from: SocketAddr,
              landing: SocketAddr)
              -> Result<(), Error<P>> {
    if let Ok(now) = Tick::now(&self.clock) {
      self.last_rx.write(|l| l.stamp(transport, now));
    }
    self.hooks.activity(transport);

    let discard = |why: &str| {
      log::warn!("dropping {}b from {} over {}: {}", bytes.len(), from, transport.name(), why);
      self.shared.write(|s| s.status |= Status::RECV_DROPPED);
      Ok(())
    };

    let hdr = match Header::parse(bytes) {
      | Ok(hdr) => hdr,
      | Err(_) => return discard("shorter than a header"),
    };

    if hdr.tkl > MAX_TOKEN_LEN {
      return discard("token length over 8");
    }

    if bytes.len() < HEADER_SIZE + hdr.tkl as usize {
      return discard("shorter than its token");
    }

    let body = &bytes[HEADER_SIZE..];
    log::trace!("recvd {}", logging::msg_summary(transport, from, &hdr, body.len()).as_str());

    let queued = self.shared.write(|s| {
                                match s.pool.get(body.len()) {
                                  | Ok(msg) => {
                                    s.pool.fill(&msg, body).ok();
                                    let env = s.pool.envelope_mut(&msg);
                                    env.header = hdr;
                                    env.addressing = Addressing { transport,
                                                                  remote: from,
                                                                  landing };
                                    s.pool.add_at(Tick::NOW, recv_queue(transport), msg, 0);
                                    Ok(())
                                  },
                                  | Err(e) => {
                                    s.status |= Status::from(e);
                                    Err(e)
                                  },
                                }
                              });

    queued.map_err(|e| {
            if transport == Transport::Udp
               && !multicast::is_ipv4_multicast(landing)
               && hdr.ty.is_con_or_non()
            {
              self.send_reset(from, hdr.id);
            }
            When::Receiving.what(What::Pool(e))
          })
  }

  /// Send a bare RESET for `id`, bypassing the pool
  fn send_reset(&self, to: SocketAddr, id: Id) {
    let reset = Header { ty: Type::Reset,
                         tkl: 0,
                         code: Code::EMPTY,
                         id,
                         ..Default::default() }.to_bytes();

    self.reset_tx.write(|_| match self.udp.send(Addrd(&reset[..], to)) {
                   | Ok(()) => log::debug!("out of storage; sent RESET {:?} -> {}", id, to),
                   | Err(e) => log::warn!("out of storage and could not RESET {:?} -> {}: {:?}", id, to, e),
                 });
  }

  /// Pull one datagram off of the UDP socket and feed it to [`Engine::udp_received`].
  ///
  /// A datagram longer than [`DGRAM_CAPACITY`] is discarded and flagged
  /// with [`Status::RECV_DROPPED`].
  pub fn poll_udp(&self) -> nb::Result<(), Error<P>> {
    let mut buf = [0u8; DGRAM_CAPACITY + 1];
    let recvd = self.udp
                    .recv(&mut buf)
                    .map_err(|e| e.map(|e| When::Polling.what(What::UdpSock(e))))?;

    if recvd.len > DGRAM_CAPACITY {
      self.drop_oversized(Transport::Udp, recvd.from);
      return Ok(());
    }

    self.udp_received(&buf[..recvd.len], recvd.from, recvd.to)
        .map_err(nb::Error::Other)
  }

  /// Pull one message off of the TCP connection and feed it to [`Engine::tcp_received`].
  ///
  /// Oversized messages are discarded as in [`Engine::poll_udp`].
  pub fn poll_tcp(&self) -> nb::Result<(), Error<P>> {
    let mut buf = [0u8; DGRAM_CAPACITY + 1];
    let recvd = self.tcp
                    .recv(&mut buf)
                    .map_err(|e| e.map(|e| When::Polling.what(What::TcpSock(e))))?;

    if recvd.len > DGRAM_CAPACITY {
      self.drop_oversized(Transport::Tcp, recvd.from);
      return Ok(());
    }

    self.received(Transport::Tcp, &buf[..recvd.len], recvd.from, recvd.to)
        .map_err(nb::Error::Other)
  }

  fn drop_oversized(&self, transport: Transport, from: SocketAddr) {
    log::warn!("dropping message from {} over {}: longer than {}b",
               from,
               transport.name(),
               DGRAM_CAPACITY);
    self.hooks.activity(transport);
    self.shared.write(|s| s.status |= Status::RECV_DROPPED);
  }

  /// Queue a request to `remote` for `path` (segments separated by `/`).
  ///
  /// The request gets a fresh id and a random token of
  /// [`token_len`](crate::config::Msg::token_len) bytes; a CON
  /// request is flagged as expecting a response, which is reported
  /// to [`Hooks::response_expected`] once it's sent.
  pub fn request(&self,
                 transport: Transport,
                 remote: SocketAddr,
                 ty: Type,
                 method: Method,
                 path: &str)
                 -> Result<(Id, Token), Error<P>> {
    let tkl = self.config.msg.token_len.min(MAX_TOKEN_LEN);
    let min = self.config.pool.default_block as usize;
    let path = path.trim_start_matches('/');

    self.shared.write(|s| {
                 let msg = s.pool.get(min).map_err(|e| {
                                             s.status |= Status::from(e);
                                             When::BuildingRequest.what(What::Pool(e))
                                           })?;

                 let mut token = [0u8; MAX_TOKEN_LEN as usize];
                 s.rng.fill_bytes(&mut token[..tkl as usize]);
                 let token = &token[..tkl as usize];
                 let id = s.next_id();

                 let env = s.pool.envelope_mut(&msg);
                 env.header = Header { ty,
                                       tkl,
                                       code: method.code(),
                                       id,
                                       ..Default::default() };
                 env.addressing = Addressing { transport,
                                               remote,
                                               ..Default::default() };
                 env.send.response_expected = ty == Type::Con;

                 let built = s.pool
                              .body_mut(&msg)
                              .map_err(What::Pool)
                              .and_then(|mut body| {
                                body.extend_from_slice(token).map_err(What::Opt)?;
                                if !path.is_empty() {
                                  body.add_options_from_string(known::URI_PATH, path, '/', OptNumber(0))
                                      .map_err(What::Opt)?;
                                }
                                Ok(())
                              });

                 match built {
                   | Ok(()) => {
                     s.pool.add_at(Tick::NOW, xmit_queue(transport), msg, 0);
                     Ok((id, Token::from_slice(token).unwrap_or_default()))
                   },
                   | Err(what) => {
                     s.pool.release(msg);
                     Err(When::BuildingRequest.what(what))
                   },
                 }
               })
  }

  /// Handle everything received, then send everything due.
  ///
  /// This is the host's periodic call; returns the number of messages sent.
  pub fn poll(&self, drain: Drain) -> Result<usize, Error<P>> {
    self.dispatch(drain);
    self.transmit(drain)
  }
}
