use std::sync::atomic::{AtomicUsize, Ordering};

use croak::code::{self, Method};
use croak::config::{Config, PoolConfig};
use croak::dispatch::Disposition;
use croak::engine::{Drain, Status};
use croak::multicast::all_coap_devices;
use croak::net::Transport;
use croak::pool::PoolError;
use croak::queue::QueueId;
use croak::respond::Exchange;
use croak::route::Route;
use croak::test::{addr, engine_with, Expected, Mock};
use croak_msg::opt::{known, ContentFormat};
use croak_msg::{validate, Body, BodyRef, Code, Header, Id, OptNumber, Type, HEADER_SIZE};

type Engine = croak::engine::Engine<Mock>;

fn hello(ex: &mut Exchange<'_>, _: usize) -> Disposition {
  ex.respond(code::CONTENT).ok();
  ex.append_payload(b"hello", ContentFormat::Text).ok();
  Disposition::SendResponse
}

fn echo(ex: &mut Exchange<'_>, arg: usize) -> Disposition {
  let payload = ex.payload(|p| String::from_utf8_lossy(p).into_owned());
  let query = ex.query().to_string();

  ex.respond(code::CHANGED).ok();
  ex.append_payload_fmt(format_args!("{} {} {}", query, arg, payload),
                        ContentFormat::Text)
    .ok();
  Disposition::SendResponse
}

fn lazy(_: &mut Exchange<'_>, _: usize) -> Disposition {
  Disposition::SendResponse
}

fn silent(_: &mut Exchange<'_>, _: usize) -> Disposition {
  Disposition::NoResponse
}

static WATCHED_CALLS: AtomicUsize = AtomicUsize::new(0);

fn watched(ex: &mut Exchange<'_>, _: usize) -> Disposition {
  WATCHED_CALLS.fetch_add(1, Ordering::SeqCst);
  hello(ex, 0)
}

fn routes() -> Vec<Route> {
  vec![Route::new("hello").get(hello),
       Route::new("echo").post(echo).arg(7),
       Route::new("lazy").get(lazy),
       Route::new("silent").post(silent),
       Route::new("watched").get(watched).post(watched)]
}

fn engine() -> Engine {
  engine_with(Config::default(), routes())
}

fn dgram(hdr: Header, build: impl FnOnce(&mut Body)) -> Vec<u8> {
  let mut buf = [0u8; 1400];
  let mut len = 0;
  let mut body = Body::new(&mut buf, &mut len, hdr.tkl);
  build(&mut body);
  hdr.to_bytes().iter().chain(body.as_bytes()).copied().collect()
}

fn request(ty: Type, method: Method, id: u16, token: &[u8], path: &str) -> Vec<u8> {
  let hdr = Header { ty,
                     tkl: token.len() as u8,
                     code: method.code(),
                     id: Id(id),
                     ..Default::default() };

  dgram(hdr, |b| {
    b.extend_from_slice(token).unwrap();
    b.add_options_from_string(known::URI_PATH, path, '/', OptNumber(0))
     .unwrap();
  })
}

fn empty(ty: Type, id: u16) -> Vec<u8> {
  Header { ty,
           tkl: 0,
           code: Code::EMPTY,
           id: Id(id),
           ..Default::default() }.to_bytes()
                                 .to_vec()
}

/// The one datagram sent over UDP, parsed
fn sent_one(engine: &Engine) -> (Header, Vec<u8>) {
  let sent = engine.udp().take_sent();
  assert_eq!(sent.len(), 1, "expected exactly one datagram, got {:?}", sent);

  let bytes = sent[0].data().clone();
  (Header::parse(&bytes).unwrap(), bytes[HEADER_SIZE..].to_vec())
}

fn payload(hdr: &Header, body: &[u8]) -> Vec<u8> {
  BodyRef::new(body, hdr.tkl).payload()
                             .unwrap()
                             .map(|p| p.to_vec())
                             .unwrap_or_default()
}

fn assert_conserved(engine: &Engine) {
  let census = engine.census();
  assert!(census.is_conserved(), "{:?}", census);
}

#[test]
fn get_piggybacks_content() {
  let _ = simple_logger::init_with_level(log::Level::Trace);
  let engine = engine();

  engine.udp()
        .push_rx(&request(Type::Con, Method::GET, 0x1000, &[1, 2], "hello"), addr(1));
  engine.poll_udp().unwrap();
  assert_eq!(engine.poll(Drain::All).unwrap(), 1);

  let (hdr, body) = sent_one(&engine);
  assert_eq!(hdr.ty, Type::Ack);
  assert_eq!(hdr.code, code::CONTENT);
  assert_eq!(hdr.id, Id(0x1000));
  assert_eq!(BodyRef::new(&body, hdr.tkl).token(), Some(&[1u8, 2][..]));
  assert_eq!(payload(&hdr, &body), b"hello");
  assert_eq!(validate(BodyRef::new(&body, hdr.tkl)).unwrap().content_format,
             Some(ContentFormat::Text));

  assert_eq!(engine.hooks().activity_count(), 1);
  assert_conserved(&engine);
}

#[test]
fn non_request_gets_non_response() {
  let engine = engine();
  engine.udp_received(&request(Type::Non, Method::GET, 0x0042, &[9], "hello"),
                      addr(1),
                      addr(0))
        .unwrap();
  engine.poll(Drain::All).unwrap();

  let (hdr, body) = sent_one(&engine);
  assert_eq!(hdr.ty, Type::Non);
  assert_eq!(hdr.code, code::CONTENT);
  assert_eq!(BodyRef::new(&body, hdr.tkl).token(), Some(&[9u8][..]));
}

#[test]
fn unknown_path_not_found() {
  let engine = engine();
  engine.udp_received(&request(Type::Con, Method::GET, 7, &[], "nope"), addr(1), addr(0))
        .unwrap();
  engine.poll(Drain::All).unwrap();

  let (hdr, _) = sent_one(&engine);
  assert_eq!((hdr.ty, hdr.code, hdr.id), (Type::Ack, code::NOT_FOUND, Id(7)));
}

#[test]
fn wrong_method_not_allowed() {
  let engine = engine();
  engine.udp_received(&request(Type::Con, Method::POST, 7, &[], "hello"),
                      addr(1),
                      addr(0))
        .unwrap();
  engine.poll(Drain::All).unwrap();

  let (hdr, _) = sent_one(&engine);
  assert_eq!(hdr.code, code::METHOD_NOT_ALLOWED);
}

#[test]
fn put_and_delete_never_reach_a_handler() {
  let engine = engine();

  for (id, method) in [(20, Method::PUT), (21, Method::DELETE)] {
    engine.udp_received(&request(Type::Con, method, id, &[], "watched"),
                        addr(1),
                        addr(0))
          .unwrap();
    engine.poll(Drain::All).unwrap();

    let (hdr, _) = sent_one(&engine);
    assert_eq!((hdr.ty, hdr.code, hdr.id),
               (Type::Ack, code::METHOD_NOT_ALLOWED, Id(id)));
  }

  assert_eq!(WATCHED_CALLS.load(Ordering::SeqCst), 0);
  assert_conserved(&engine);
}

#[test]
fn non_error_response_is_non_with_fresh_id() {
  let engine = engine();
  engine.udp_received(&request(Type::Non, Method::GET, 0x0042, &[3, 4], "nope"),
                      addr(1),
                      addr(0))
        .unwrap();
  engine.poll(Drain::All).unwrap();

  let (hdr, body) = sent_one(&engine);
  assert_eq!((hdr.ty, hdr.code), (Type::Non, code::NOT_FOUND));
  assert_ne!(hdr.id, Id(0x0042));
  assert_eq!(BodyRef::new(&body, hdr.tkl).token(), Some(&[3u8, 4][..]));

  // the id came off of the engine's own sequence
  let (next, _) = engine.request(Transport::Udp, addr(1), Type::Non, Method::GET, "x")
                        .unwrap();
  assert_eq!(next, hdr.id.next());

  engine.udp_received(&request(Type::Non, Method::POST, 0x0043, &[], "hello"),
                      addr(1),
                      addr(0))
        .unwrap();
  engine.poll(Drain::All).unwrap();

  let sent = engine.udp().take_sent();
  let not_allowed = sent.iter()
                        .map(|d| Header::parse(d.data()).unwrap())
                        .find(|h| h.code == code::METHOD_NOT_ALLOWED)
                        .unwrap();
  assert_eq!(not_allowed.ty, Type::Non);
  assert_ne!(not_allowed.id, Id(0x0043));
}

#[test]
fn malformed_bad_request_with_reason() {
  let engine = engine();
  let hdr = Header { ty: Type::Con,
                     code: Method::GET.code(),
                     id: Id(3),
                     ..Default::default() };
  let bytes = hdr.to_bytes().iter().chain(&[0xF0]).copied().collect::<Vec<_>>();

  engine.udp_received(&bytes, addr(1), addr(0)).unwrap();
  engine.poll(Drain::All).unwrap();

  let (hdr, body) = sent_one(&engine);
  assert_eq!((hdr.ty, hdr.code, hdr.id), (Type::Ack, code::BAD_REQUEST, Id(3)));
  assert_eq!(payload(&hdr, &body), b"reserved option nibble");
}

#[test]
fn handler_sees_query_payload_and_arg() {
  let engine = engine();
  let hdr = Header { ty: Type::Con,
                     tkl: 1,
                     code: Method::POST.code(),
                     id: Id(11),
                     ..Default::default() };
  let bytes = dgram(hdr, |b| {
                b.extend_from_slice(&[0x5A]).unwrap();
                b.add_options_from_string(known::URI_PATH, "echo", '/', OptNumber(0))
                 .unwrap();
                b.add_options_from_string(known::URI_QUERY, "n=1", '&', known::URI_PATH)
                 .unwrap();
                b.append_payload(b"abc").unwrap();
              });

  engine.udp_received(&bytes, addr(1), addr(0)).unwrap();
  engine.poll(Drain::All).unwrap();

  let (hdr, body) = sent_one(&engine);
  assert_eq!(hdr.code, code::CHANGED);
  assert_eq!(payload(&hdr, &body), b"n=1 7 abc");
}

#[test]
fn handler_without_response_gets_internal_error() {
  let engine = engine();
  engine.udp_received(&request(Type::Con, Method::GET, 1, &[], "lazy"), addr(1), addr(0))
        .unwrap();
  engine.poll(Drain::All).unwrap();

  let (hdr, _) = sent_one(&engine);
  assert_eq!(hdr.code, code::INTERNAL_SERVER_ERROR);
}

#[test]
fn no_response_is_released() {
  let engine = engine();
  engine.udp_received(&request(Type::Con, Method::POST, 1, &[], "silent"),
                      addr(1),
                      addr(0))
        .unwrap();

  assert_eq!(engine.poll(Drain::All).unwrap(), 0);
  assert!(engine.udp().sent().is_empty());
  assert_conserved(&engine);
}

#[test]
fn ping_is_reset() {
  let engine = engine();
  engine.udp_received(&empty(Type::Con, 0xBEEF), addr(4), addr(0))
        .unwrap();
  engine.poll(Drain::All).unwrap();

  let sent = engine.udp().sent();
  assert_eq!(sent[0].addr(), addr(4));
  assert_eq!(sent[0].data(), &vec![0x70, 0x00, 0xBE, 0xEF]);
}

#[test]
fn tcp_responses_go_out_over_tcp() {
  let engine = engine();
  engine.tcp_received(&request(Type::Con, Method::GET, 5, &[], "hello"), addr(3))
        .unwrap();
  engine.poll(Drain::All).unwrap();

  assert!(engine.udp().sent().is_empty());
  let sent = engine.tcp().sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].addr(), addr(3));
  assert!(engine.last_received(Transport::Tcp).is_some());
}

#[test]
fn drain_one_takes_one_per_transport() {
  let engine = engine();
  for id in 0..3 {
    engine.udp_received(&empty(Type::Con, id), addr(1), addr(0))
          .unwrap();
  }

  assert_eq!(engine.dispatch(Drain::One), 1);
  assert_eq!(engine.stats().queues[QueueId::UdpRecv.ix()], 2);
  assert_eq!(engine.dispatch(Drain::All), 2);
  assert_eq!(engine.transmit(Drain::All).unwrap(), 3);

  let ids = engine.udp()
                  .sent()
                  .iter()
                  .map(|d| Header::parse(d.data()).unwrap().id.0)
                  .collect::<Vec<_>>();
  assert_eq!(ids, vec![0, 1, 2]);
}

#[test]
fn multicast_response_is_delayed() {
  let engine = engine();
  engine.clock().set_ms(1_000);

  engine.udp_received(&request(Type::Non, Method::GET, 9, &[1], "hello"),
                      addr(1),
                      all_coap_devices(5683))
        .unwrap();
  engine.poll(Drain::All).unwrap();

  // the default seed's backoff is well above zero
  assert!(engine.udp().sent().is_empty());
  assert_eq!(engine.stats().queues[QueueId::UdpXmit.ix()], 1);

  engine.clock().set_ms(1_001);
  engine.poll(Drain::All).unwrap();
  assert!(engine.udp().sent().is_empty());

  // never later than the leisure
  engine.clock().set_ms(6_000);
  engine.poll(Drain::All).unwrap();

  let (hdr, _) = sent_one(&engine);
  assert_eq!((hdr.ty, hdr.code), (Type::Non, code::CONTENT));
  assert_eq!(engine.stats().queues[QueueId::UdpXmit.ix()], 0);
  assert_conserved(&engine);
}

#[test]
fn multicast_to_unknown_path_is_deferred_not_found() {
  let engine = engine();
  engine.clock().set_ms(1_000);

  engine.udp_received(&request(Type::Non, Method::GET, 10, &[1], "nope"),
                      addr(1),
                      all_coap_devices(5683))
        .unwrap();
  assert_eq!(engine.dispatch(Drain::All), 1);
  assert_eq!(engine.transmit(Drain::All).unwrap(), 0);
  assert_eq!(engine.stats().queues[QueueId::UdpXmit.ix()], 1);

  engine.clock().set_ms(6_000);
  assert_eq!(engine.transmit(Drain::All).unwrap(), 1);

  let (hdr, _) = sent_one(&engine);
  assert_eq!((hdr.ty, hdr.code), (Type::Non, code::NOT_FOUND));
  assert_ne!(hdr.id, Id(10));
  assert_conserved(&engine);
}

#[test]
fn exhaustion_resets_unicast() {
  let config = Config { pool: PoolConfig { envelopes: 1,
                                           ..Default::default() },
                        ..Default::default() };
  let engine = engine_with(config, routes());

  engine.udp_received(&empty(Type::Con, 1), addr(1), addr(0))
        .unwrap();
  let err = engine.udp_received(&request(Type::Con, Method::GET, 0x2222, &[], "hello"),
                                addr(2),
                                addr(0))
                  .unwrap_err();

  assert_eq!(err.pool_error(), Some(&PoolError::EnvelopesExhausted));
  assert_eq!(engine.udp().sent()[0].data(), &vec![0x70, 0x00, 0x22, 0x22]);
  assert!(engine.take_status().contains(Status::ENVELOPES_EXHAUSTED));
  assert_eq!(engine.stats().envelopes_exhausted, 1);

  // no RESET for multicast
  engine.udp_received(&empty(Type::Con, 3), addr(2), all_coap_devices(5683))
        .unwrap_err();
  assert_eq!(engine.udp().sent().len(), 1);
}

#[test]
fn oversized_datagram_is_reset() {
  let engine = engine();
  let hdr = Header { ty: Type::Non,
                     code: Method::POST.code(),
                     id: Id(8),
                     ..Default::default() };
  let mut bytes = hdr.to_bytes().to_vec();
  bytes.extend_from_slice(&[0xFF; 1281]);

  let err = engine.udp_received(&bytes, addr(1), addr(0)).unwrap_err();
  assert_eq!(err.pool_error(), Some(&PoolError::Oversized { min: 1281 }));
  assert!(engine.take_status().contains(Status::OVERSIZED));
  assert_eq!(engine.udp().sent()[0].data(), &vec![0x70, 0x00, 0x00, 0x08]);
}

#[test]
fn ack_cancels_queued_con_and_reports_response() {
  let engine = engine();
  let (id, token) = engine.request(Transport::Udp, addr(2), Type::Con, Method::GET, "temp")
                          .unwrap();

  let hdr = Header { ty: Type::Ack,
                     tkl: token.as_bytes().len() as u8,
                     code: code::CONTENT,
                     id,
                     ..Default::default() };
  let ack = dgram(hdr, |b| {
              b.extend_from_slice(token.as_bytes()).unwrap();
              b.append_payload(b"21").unwrap();
            });

  engine.udp_received(&ack, addr(2), addr(0)).unwrap();
  assert_eq!(engine.dispatch(Drain::All), 1);
  assert_eq!(engine.stats().queues[QueueId::UdpXmit.ix()], 0);

  let received = engine.hooks().received();
  assert_eq!(received.len(), 1);
  assert_eq!(received[0].remote, addr(2));
  assert_eq!(received[0].header.code, code::CONTENT);
  assert_eq!(payload(&received[0].header, &received[0].body), b"21");
  assert_conserved(&engine);
}

#[test]
fn ack_from_elsewhere_cancels_nothing() {
  let engine = engine();
  let (id, _) = engine.request(Transport::Udp, addr(2), Type::Con, Method::GET, "temp")
                      .unwrap();

  engine.udp_received(&empty(Type::Ack, id.0), addr(3), addr(0))
        .unwrap();
  engine.dispatch(Drain::All);

  assert_eq!(engine.stats().queues[QueueId::UdpXmit.ix()], 1);
  assert!(engine.hooks().received().is_empty());
}

#[test]
fn sending_con_reports_expected_response() {
  let engine = engine();
  let (id, token) = engine.request(Transport::Udp, addr(2), Type::Con, Method::GET, "temp")
                          .unwrap();
  engine.request(Transport::Udp, addr(2), Type::Non, Method::GET, "temp")
        .unwrap();

  assert_eq!(engine.poll(Drain::All).unwrap(), 2);
  assert_eq!(engine.hooks().expected(),
             vec![Expected { transport: Transport::Udp,
                             remote: addr(2),
                             id,
                             token: token.as_bytes().to_vec() }]);
}

#[test]
fn send_failure_is_flagged_and_released() {
  let engine = engine();
  engine.udp()
        .fail_sends
        .store(true, std::sync::atomic::Ordering::SeqCst);

  engine.request(Transport::Udp, addr(2), Type::Con, Method::GET, "x")
        .unwrap();

  assert_eq!(engine.poll(Drain::All).unwrap(), 0);
  assert!(engine.take_status().contains(Status::SEND_FAILED));
  assert!(engine.hooks().expected().is_empty());
  assert_conserved(&engine);
}

#[test]
fn pool_conserved_under_mixed_traffic() {
  let engine = engine();

  for n in 0..40u16 {
    let from = addr((n % 5) as u8 + 1);
    let bytes = match n % 4 {
      | 0 => request(Type::Con, Method::GET, n, &[n as u8], "hello"),
      | 1 => request(Type::Non, Method::GET, n, &[], "nope"),
      | 2 => empty(Type::Con, n),
      | _ => request(Type::Con, Method::POST, n, &[1, 2, 3, 4], "silent"),
    };
    engine.udp_received(&bytes, from, addr(0)).unwrap();

    if n % 7 == 0 {
      engine.poll(Drain::One).unwrap();
      assert_conserved(&engine);
    }
  }

  engine.poll(Drain::All).unwrap();
  assert_conserved(&engine);

  let census = engine.census();
  assert_eq!(census.envelopes_free, census.envelopes);
  assert_eq!(census.blocks_free, census.blocks);
  assert_eq!(engine.udp().sent().len(), 30);
}

#[test]
fn coap_lite_reads_our_response() {
  use coap_lite::{MessageClass, MessageType, Packet, ResponseType};

  let engine = engine();
  engine.udp_received(&request(Type::Con, Method::GET, 0x0102, &[0xAB, 0xCD], "hello"),
                      addr(1),
                      addr(0))
        .unwrap();
  engine.poll(Drain::All).unwrap();

  let sent = engine.udp().sent();
  let packet = Packet::from_bytes(sent[0].data()).unwrap();

  assert_eq!(packet.header.get_type(), MessageType::Acknowledgement);
  assert_eq!(packet.header.code, MessageClass::Response(ResponseType::Content));
  assert_eq!(packet.header.message_id, 0x0102);
  assert_eq!(packet.get_token().to_vec(), vec![0xAB, 0xCD]);
  assert_eq!(packet.payload, b"hello".to_vec());
}
