use croak_msg::HEADER_SIZE;
use rand::Rng;
use tinyvec::ArrayVec;

use crate::engine::{xmit_queue, Drain, Engine, Status};
use crate::envelope::{Envelope, Msg};
use crate::error::{Error, When};
use crate::net::{Addrd, Socket, Transport};
use crate::platform::{Hooks, Platform};
use crate::time::Tick;
use crate::{logging, multicast, DGRAM_CAPACITY};

type Dgram = ArrayVec<[u8; DGRAM_CAPACITY]>;

/// What became of a message popped off of a transmit queue
enum Popped {
  /// Serialized and ready to go
  Send(Msg, Envelope, Dgram),
  /// Multicast backoff; put back on the queue
  Deferred,
  /// Couldn't be serialized and was released
  Dropped,
}

impl<P: Platform> Engine<P> {
  /// Send messages that are due, alternating between the UDP and
  /// TCP transmit queues.
  ///
  /// UDP messages answering a multicast request are first pushed
  /// back by a random delay of up to
  /// [`multicast_response_leisure`](crate::config::Msg::multicast_response_leisure);
  /// TCP messages go out as soon as they're queued.
  ///
  /// Every message taken off of a queue is released once it's been
  /// sent (or failed to send). Returns the number of messages sent.
  pub fn transmit(&self, drain: Drain) -> Result<usize, Error<P>> {
    let now = self.now(When::Transmitting)?;
    let mut sent = 0;

    loop {
      let mut any = false;

      for transport in [Transport::Udp, Transport::Tcp] {
        match self.pop_due(transport, now) {
          | None => (),
          | Some(Popped::Deferred) | Some(Popped::Dropped) => any = true,
          | Some(Popped::Send(msg, env, dgram)) => {
            any = true;
            if self.send(transport, now, msg, &env, &dgram) {
              sent += 1;
            }
          },
        }
      }

      if !any || drain == Drain::One {
        break Ok(sent);
      }
    }
  }

  fn pop_due(&self, transport: Transport, now: Tick) -> Option<Popped> {
    let leisure = u32::try_from(self.config.msg.multicast_response_leisure.0).unwrap_or(u32::MAX);

    self.shared.write(|s| {
                 let msg = match transport {
                   | Transport::Udp => s.pool.pop_before(now, xmit_queue(transport)),
                   | Transport::Tcp => s.pool.pop(xmit_queue(transport)),
                 }?;

                 let env = *s.pool.envelope(&msg);
                 if transport == Transport::Udp
                    && env.send.next == Tick::NOW
                    && multicast::is_ipv4_multicast(env.addressing.landing)
                 {
                   let delay = s.rng.gen_range(0..=leisure);
                   log::trace!("answering multicast {:?} in {}ms", env.header.id, delay);
                   s.pool
                    .add_at(now.after(delay), xmit_queue(transport), msg, env.send.attempts);
                   return Some(Popped::Deferred);
                 }

                 match serialize(&env, s.pool.body(&msg).as_bytes()) {
                   | Some(dgram) => Some(Popped::Send(msg, env, dgram)),
                   | None => {
                     log::warn!("dropping {:?}: too big to send", env.header.id);
                     s.status |= Status::SEND_FAILED;
                     s.pool.release(msg);
                     Some(Popped::Dropped)
                   },
                 }
               })
  }

  /// Send a serialized message, then release it
  fn send(&self, transport: Transport, now: Tick, msg: Msg, env: &Envelope, dgram: &[u8]) -> bool {
    let remote = env.addressing.remote;
    let summary = logging::msg_summary(transport, remote, &env.header, dgram.len() - HEADER_SIZE);

    let sent = match transport {
                 | Transport::Udp => self.udp
                                         .send(Addrd(dgram, remote))
                                         .map_err(|e| log::warn!("failed to send {}: {:?}", summary.as_str(), e)),
                 | Transport::Tcp => self.tcp
                                         .send(Addrd(dgram, remote))
                                         .map_err(|e| log::warn!("failed to send {}: {:?}", summary.as_str(), e)),
               }.is_ok();

    let first = sent && env.send.response_expected && env.send.initial.is_none();

    self.shared.write(|s| {
                 if !sent {
                   s.status |= Status::SEND_FAILED;
                 } else if first {
                   s.pool.envelope_mut(&msg).send.initial = Some(now);
                 }
                 s.pool.release(msg);
               });

    if sent {
      log::trace!("sent {}", summary.as_str());
    }

    if first {
      let tkl = (env.header.tkl as usize).min(dgram.len() - HEADER_SIZE);
      self.hooks.response_expected(transport,
                                   remote,
                                   env.header.id,
                                   &dgram[HEADER_SIZE..HEADER_SIZE + tkl]);
    }

    sent
  }
}

/// Header followed by the block's bytes, or `None` if that won't
/// fit in a datagram
fn serialize(env: &Envelope, body: &[u8]) -> Option<Dgram> {
  if HEADER_SIZE + body.len() > DGRAM_CAPACITY {
    return None;
  }

  let mut dgram = Dgram::new();
  dgram.extend_from_slice(&env.header.to_bytes());
  dgram.extend_from_slice(body);
  Some(dgram)
}
