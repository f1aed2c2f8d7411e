use croak_msg::opt::ContentFormat;
use croak_msg::{validate, CodeKind, Header, Type};
use tinyvec::ArrayVec;

use crate::code::{self, Code, Method};
use crate::engine::{recv_queue, xmit_queue, Drain, Engine, Shared};
use crate::envelope::{Addressing, Msg};
use crate::logging;
use crate::net::Transport;
use crate::platform::{Hooks, Platform};
use crate::respond::{append_response_payload, store_empty, store_response_header, Exchange};
use crate::route::Routes;
use crate::time::Tick;
use crate::DGRAM_CAPACITY;

/// What to do with a message once it's been handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
  /// Release it
  NoResponse,
  /// It has been turned into a response; queue it for sending
  SendResponse,
}

impl<P: Platform> Engine<P> {
  /// Handle received messages, alternating between the UDP and TCP
  /// receive queues so neither transport starves the other.
  ///
  /// Returns the number of messages handled.
  pub fn dispatch(&self, drain: Drain) -> usize {
    let mut handled = 0;

    loop {
      let mut any = false;

      for transport in [Transport::Udp, Transport::Tcp] {
        if let Some(msg) = self.shared.write(|s| s.pool.pop(recv_queue(transport))) {
          any = true;
          handled += 1;
          self.finish(msg, transport);
        }
      }

      if !any || drain == Drain::One {
        break handled;
      }
    }
  }

  fn finish(&self, msg: Msg, transport: Transport) {
    match self.handle_inbound(&msg) {
      | Disposition::NoResponse => self.shared.write(|s| s.pool.release(msg)),
      | Disposition::SendResponse => {
        self.shared
            .write(|s| s.pool.add_at(Tick::NOW, xmit_queue(transport), msg, 0))
      },
    }
  }

  /// Decide what a received message needs, and build the response if it needs one.
  ///
  /// - token longer than 8: dropped before anything else is looked at
  /// - CON / NON request: validated and routed to a handler;
  ///   4.00 when malformed, 4.04 for an unknown path, 4.05 when
  ///   the route has no handler for the method (always the case for PUT and DELETE)
  /// - empty CON (a ping): answered with a RESET
  /// - CON / NON response: passed to [`Hooks::response_received`]
  /// - ACK / RESET: cancels the matching queued CON, and a piggybacked
  ///   response goes to [`Hooks::response_received`]
  pub fn handle_inbound(&self, msg: &Msg) -> Disposition {
    let (hdr, addressing, len) = self.shared.read(|s| {
                                               (s.pool.header(msg),
                                                s.pool.envelope(msg).addressing,
                                                s.pool.body(msg).as_bytes().len())
                                             });

    log::trace!("dispatching {}",
                logging::msg_summary(addressing.transport, addressing.remote, &hdr, len).as_str());

    if hdr.check_token_len().is_err() {
      log::warn!("ignoring message with token length {}", hdr.tkl);
      return Disposition::NoResponse;
    }

    match (hdr.ty, hdr.code.kind()) {
      | (Type::Con | Type::Non, CodeKind::Request) => self.handle_request(msg, hdr),
      | (Type::Con, CodeKind::Empty) => {
        log::trace!("ping {:?} from {}", hdr.id, addressing.remote);
        self.shared
            .write(|s| store_empty(&mut s.pool, msg, Type::Reset))
            .map(|_| Disposition::SendResponse)
            .unwrap_or(Disposition::NoResponse)
      },
      | (Type::Non, CodeKind::Empty) => Disposition::NoResponse,
      | (Type::Con | Type::Non, CodeKind::Response) => {
        log::trace!("separate response {} {:?}", hdr.code, hdr.id);
        self.notify_response(msg, hdr, addressing);
        Disposition::NoResponse
      },
      | (Type::Ack | Type::Reset, kind) => {
        let cancelled = self.shared.write(|s| {
                                     s.pool
                                      .pop_confirmable_match(xmit_queue(addressing.transport),
                                                             addressing.remote,
                                                             hdr.id)
                                      .map(|m| s.pool.release(m))
                                      .is_some()
                                   });
        log::trace!("{:?} {:?} from {} (cancelled queued CON: {})",
                    hdr.ty,
                    hdr.id,
                    addressing.remote,
                    cancelled);

        if kind == CodeKind::Response {
          self.notify_response(msg, hdr, addressing);
        }
        Disposition::NoResponse
      },
    }
  }

  fn notify_response(&self, msg: &Msg, hdr: Header, addressing: Addressing) {
    let mut copy = ArrayVec::<[u8; DGRAM_CAPACITY]>::new();
    self.shared.read(|s| {
                 let body = s.pool.body(msg).as_bytes();
                 copy.extend_from_slice(&body[..body.len().min(DGRAM_CAPACITY)]);
               });

    self.hooks.response_received(addressing.transport,
                                 addressing.remote,
                                 &hdr,
                                 croak_msg::BodyRef::new(&copy, hdr.tkl));
  }

  fn handle_request(&self, msg: &Msg, hdr: Header) -> Disposition {
    let parsed = match self.shared.read(|s| validate(s.pool.body(msg))) {
      | Ok(parsed) => parsed,
      | Err(e) => {
        log::warn!("malformed request {:?}: {}", hdr.id, e.reason());
        return self.respond_error(msg, hdr, code::BAD_REQUEST, e.reason());
      },
    };

    let route = match self.routes.lookup(parsed.uri()) {
      | Some(route) => route,
      | None => {
        log::debug!("no route for {:?}", parsed.uri());
        return self.respond_error(msg, hdr, code::NOT_FOUND, "");
      },
    };

    let handler = match Method::from_code(hdr.code).and_then(|m| route.handler(m)) {
      | Some(h) => h,
      | None => {
        log::debug!("{} not allowed on {:?}", hdr.code, route.uri);
        return self.respond_error(msg, hdr, code::METHOD_NOT_ALLOWED, "");
      },
    };

    let mut exchange = Exchange::new(&self.shared, msg, hdr, &parsed);
    match handler(&mut exchange, route.arg) {
      | Disposition::SendResponse if !exchange.has_responded() => {
        log::warn!("handler for {:?} asked to respond without building a response",
                   route.uri);
        self.respond_error(msg, hdr, code::INTERNAL_SERVER_ERROR, "")
      },
      | disposition => disposition,
    }
  }

  /// Turn the request into an error response (ACK for CON, NON otherwise)
  /// with an optional text diagnostic
  fn respond_error(&self, msg: &Msg, request: Header, code: Code, reason: &str) -> Disposition {
    let ty = match request.ty {
      | Type::Con => Type::Ack,
      | _ => Type::Non,
    };

    let built = self.shared.write(|s| {
                             let Shared { pool, next_id, .. } = s;
                             store_response_header(pool, next_id, msg, ty, code)?;
                             append_response_payload(pool, msg, reason.as_bytes(), ContentFormat::Text)
                           });

    match built {
      | Ok(()) => Disposition::SendResponse,
      | Err(e) => {
        log::warn!("couldn't build {} response: {:?}", code, e);
        Disposition::NoResponse
      },
    }
  }
}
