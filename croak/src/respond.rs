use core::fmt::{self, Write as _};

use croak_lock::Lock;
use croak_msg::opt::{header_size, known, uint_bytes, ContentFormat, OptError};
use croak_msg::{Code, Header, Id, Lookup, Parsed, Type, MAX_TOKEN_LEN};

use crate::code;
use crate::engine::Shared;
use crate::envelope::{Msg, SendState};
use crate::pool::Pool;
use crate::writable::Writable;
use crate::MAX_PAYLOAD_SIZE;

/// Errors encounterable while building a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildError {
  /// The payload would exceed [`MAX_PAYLOAD_SIZE`], or the pool had
  /// no block big enough to hold it
  BufferOverflow,
  /// The bytes were appended, but the message already committed
  /// to a different Content-Format
  ContentFormatMismatch {
    /// Content-Format already in the message
    present: ContentFormat,
    /// Content-Format passed to the append
    requested: ContentFormat,
  },
  /// The message being turned into a response has a token longer than 8 bytes
  InvalidTokenLength(u8),
  /// The message's options could not be read or written
  Opt(OptError),
}

impl From<OptError> for BuildError {
  fn from(e: OptError) -> Self {
    match e {
      | OptError::BufferTooSmall { .. } => BuildError::BufferOverflow,
      | e => BuildError::Opt(e),
    }
  }
}

/// Turn a message (usually the request being answered) into a
/// response header in place.
///
/// Token, version and addressing are kept; type and code are set,
/// the send state is cleared and everything after the token is
/// dropped. CON and NON responses get the next id from `next_id`;
/// ACK and RESET keep the id of the message they answer.
pub fn store_response_header(pool: &mut Pool,
                             next_id: &mut Id,
                             msg: &Msg,
                             ty: Type,
                             code: Code)
                             -> Result<(), BuildError> {
  let tkl = pool.header(msg).tkl;
  if tkl > MAX_TOKEN_LEN {
    return Err(BuildError::InvalidTokenLength(tkl));
  }

  pool.body_mut(msg)
      .map_err(|_| BuildError::BufferOverflow)?
      .truncate(tkl as usize);
  pool.resize(msg, tkl as usize).map_err(|e| {
                                  log::warn!("no block for response header: {:?}", e);
                                  BuildError::BufferOverflow
                                })?;

  let env = pool.envelope_mut(msg);
  env.header.ty = ty;
  env.header.code = code;
  env.send = SendState::default();

  if ty.is_con_or_non() {
    env.header.id = *next_id;
    *next_id = next_id.next();
  }

  Ok(())
}

/// Turn a message into an empty (code 0.00, no token) message
/// of type `ty`, keeping its id and addressing.
pub fn store_empty(pool: &mut Pool, msg: &Msg, ty: Type) -> Result<(), BuildError> {
  pool.body_mut(msg)
      .map_err(|_| BuildError::BufferOverflow)?
      .truncate(0);

  let env = pool.envelope_mut(msg);
  env.header = Header { ty,
                        tkl: 0,
                        code: Code::EMPTY,
                        ..env.header };
  env.send = SendState::default();
  Ok(())
}

/// Append payload bytes to a response.
///
/// The first append inserts a Content-Format option (unless one is
/// already present) ahead of the `0xFF` payload marker; later
/// appends just extend the payload. The attached block grows as
/// needed.
///
/// If the message already carries a different Content-Format,
/// the bytes are still appended but
/// [`BuildError::ContentFormatMismatch`] is returned.
pub fn append_response_payload(pool: &mut Pool,
                               msg: &Msg,
                               bytes: &[u8],
                               format: ContentFormat)
                               -> Result<(), BuildError> {
  if bytes.is_empty() {
    return Ok(());
  }

  let body = pool.body(msg);
  let payload_len = body.payload()?.map(|p| p.len()).unwrap_or(0);
  if payload_len + bytes.len() > MAX_PAYLOAD_SIZE {
    return Err(BuildError::BufferOverflow);
  }

  let lookup = body.find_numeric_option(known::CONTENT_FORMAT)?;
  let (insert, mismatch) = match lookup {
    | Lookup::Found { value, .. } => {
      let present = ContentFormat::from(value as u16);
      let mismatch = (present != format).then(|| BuildError::ContentFormatMismatch { present,
                                                                                    requested: format });
      (None, mismatch)
    },
    | Lookup::Missing { insert_at, prev } => (Some((insert_at, prev)), None),
  };

  let opt_len = match insert {
    | Some((_, prev)) => {
      let value_len = uint_bytes(format.value() as u32)?.len();
      header_size(known::CONTENT_FORMAT.0 - prev.0, value_len)? + value_len
    },
    | None => 0,
  };
  let marker_len = if body.payload_marker()?.is_some() { 0 } else { 1 };
  let needed = body.as_bytes().len() + opt_len + marker_len + bytes.len();

  if needed > pool.capacity(msg) {
    pool.resize(msg, needed).map_err(|e| {
                              log::warn!("can't grow response to {} bytes: {:?}", needed, e);
                              BuildError::BufferOverflow
                            })?;
  }

  let mut body = pool.body_mut(msg)
                     .map_err(|_| BuildError::BufferOverflow)?;
  if let Some((at, prev)) = insert {
    body.insert_numeric_option(at, prev, known::CONTENT_FORMAT, format.value() as u32)?;
  }
  body.append_payload(bytes)?;

  match mismatch {
    | Some(e) => Err(e),
    | None => Ok(()),
  }
}

/// [`append_response_payload`] with formatted text
pub fn append_response_payload_fmt(pool: &mut Pool,
                                   msg: &Msg,
                                   args: fmt::Arguments<'_>,
                                   format: ContentFormat)
                                   -> Result<(), BuildError> {
  let mut buf = Writable::<[u8; MAX_PAYLOAD_SIZE]>::default();
  buf.write_fmt(args)
     .map_err(|_| BuildError::BufferOverflow)?;
  append_response_payload(pool, msg, &buf, format)
}

/// A request being handled, and the response being built for it.
///
/// Handed to a [`Handler`](crate::route::Handler). The request's
/// payload is readable until [`Exchange::respond`] is called, after
/// which the message holds the response.
///
/// Every method takes the engine lock for as long as it runs, and
/// no longer.
#[allow(missing_copy_implementations)]
#[derive(Debug)]
pub struct Exchange<'a> {
  shared: &'a Lock<Shared>,
  msg: &'a Msg,
  request: Header,
  parsed: &'a Parsed,
  responded: bool,
}

impl<'a> Exchange<'a> {
  pub(crate) fn new(shared: &'a Lock<Shared>, msg: &'a Msg, request: Header, parsed: &'a Parsed) -> Self {
    Self { shared,
           msg,
           request,
           parsed,
           responded: false }
  }

  /// The request's header
  pub fn request(&self) -> Header {
    self.request
  }

  /// What validation found in the request
  pub fn parsed(&self) -> &Parsed {
    self.parsed
  }

  /// The request's Uri-Path, segments joined by `/`
  pub fn uri(&self) -> &str {
    self.parsed.uri()
  }

  /// The request's Uri-Query, terms joined by `&`
  pub fn query(&self) -> &str {
    self.parsed.query()
  }

  /// Has a response been started?
  pub fn has_responded(&self) -> bool {
    self.responded
  }

  /// Read the request's payload (empty when there is none,
  /// or once a response has been started)
  pub fn payload<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
    let range = self.parsed.payload.clone().filter(|_| !self.responded);
    let msg = self.msg;

    self.shared.read(|s| {
                 let bytes = s.pool.body(msg).as_bytes();
                 f(range.and_then(|r| bytes.get(r)).unwrap_or(&[]))
               })
  }

  /// Start a response with `code`: an ACK piggybacked on a CON
  /// request, a NON otherwise.
  pub fn respond(&mut self, code: Code) -> Result<(), BuildError> {
    let ty = match self.request.ty {
      | Type::Con => Type::Ack,
      | _ => Type::Non,
    };
    self.respond_as(ty, code)
  }

  /// Start a response of a specific type
  pub fn respond_as(&mut self, ty: Type, code: Code) -> Result<(), BuildError> {
    let msg = self.msg;
    self.shared.write(|s| {
                 let Shared { pool, next_id, .. } = s;
                 store_response_header(pool, next_id, msg, ty, code)
               })?;
    self.responded = true;
    Ok(())
  }

  fn ensure_responding(&mut self) -> Result<(), BuildError> {
    if self.responded {
      Ok(())
    } else {
      self.respond(code::CONTENT)
    }
  }

  /// Append to the response's payload, starting a 2.05 Content
  /// response if none was started (see [`append_response_payload`])
  pub fn append_payload(&mut self, bytes: &[u8], format: ContentFormat) -> Result<(), BuildError> {
    self.ensure_responding()?;
    let msg = self.msg;
    self.shared
        .write(|s| append_response_payload(&mut s.pool, msg, bytes, format))
  }

  /// Append formatted text to the response's payload
  /// (see [`append_response_payload_fmt`])
  pub fn append_payload_fmt(&mut self, args: fmt::Arguments<'_>, format: ContentFormat) -> Result<(), BuildError> {
    self.ensure_responding()?;
    let msg = self.msg;
    self.shared
        .write(|s| append_response_payload_fmt(&mut s.pool, msg, args, format))
  }
}

#[cfg(test)]
mod tests {
  use croak_msg::opt::OptNumber;

  use super::*;
  use crate::config::PoolConfig;

  fn request(pool: &mut Pool, ty: Type, body: &[u8], tkl: u8) -> Msg {
    let msg = pool.get(body.len()).unwrap();
    pool.fill(&msg, body).unwrap();
    let hdr = &mut pool.envelope_mut(&msg).header;
    hdr.ty = ty;
    hdr.tkl = tkl;
    hdr.code = Code::new(0, 1);
    hdr.id = Id(77);
    msg
  }

  #[test]
  fn header_for_ack_keeps_id_and_token() {
    let mut pool = Pool::new(&PoolConfig::default());
    let mut next_id = Id(5);
    let msg = request(&mut pool, Type::Con, &[1, 2, 0xB1, b'a', 0xFF, 9], 2);

    store_response_header(&mut pool, &mut next_id, &msg, Type::Ack, code::CONTENT).unwrap();

    let hdr = pool.header(&msg);
    assert_eq!((hdr.ty, hdr.code, hdr.id, hdr.tkl),
               (Type::Ack, code::CONTENT, Id(77), 2));
    assert_eq!(pool.body(&msg).as_bytes(), &[1, 2]);
    assert_eq!(next_id, Id(5));
    pool.release(msg);
  }

  #[test]
  fn header_for_non_takes_next_id() {
    let mut pool = Pool::new(&PoolConfig::default());
    let mut next_id = Id(5);
    let msg = request(&mut pool, Type::Non, &[], 0);
    pool.envelope_mut(&msg).send.attempts = 3;

    store_response_header(&mut pool, &mut next_id, &msg, Type::Non, code::CHANGED).unwrap();

    assert_eq!(pool.header(&msg).id, Id(5));
    assert_eq!(pool.envelope(&msg).send, SendState::default());
    assert_eq!(next_id, Id(6));
    pool.release(msg);
  }

  #[test]
  fn header_rejects_long_token() {
    let mut pool = Pool::new(&PoolConfig::default());
    let msg = request(&mut pool, Type::Con, &[0; 9], 9);

    assert_eq!(store_response_header(&mut pool, &mut Id(0), &msg, Type::Ack, code::CONTENT),
               Err(BuildError::InvalidTokenLength(9)));
    pool.release(msg);
  }

  #[test]
  fn two_appends_same_format() {
    let mut pool = Pool::new(&PoolConfig::default());
    let msg = request(&mut pool, Type::Con, &[0xAB], 1);
    store_response_header(&mut pool, &mut Id(0), &msg, Type::Ack, code::CONTENT).unwrap();

    append_response_payload(&mut pool, &msg, b"hel", ContentFormat::Text).unwrap();
    append_response_payload(&mut pool, &msg, b"lo", ContentFormat::Text).unwrap();

    assert_eq!(pool.body(&msg).as_bytes(),
               &[0xAB, 0xC1, 0x00, 0xFF, b'h', b'e', b'l', b'l', b'o']);
    pool.release(msg);
  }

  #[test]
  fn mismatched_format_still_appends() {
    let mut pool = Pool::new(&PoolConfig::default());
    let msg = request(&mut pool, Type::Non, &[], 0);
    store_response_header(&mut pool, &mut Id(0), &msg, Type::Non, code::CONTENT).unwrap();

    append_response_payload(&mut pool, &msg, b"{", ContentFormat::Json).unwrap();
    assert_eq!(append_response_payload(&mut pool, &msg, b"}", ContentFormat::Text),
               Err(BuildError::ContentFormatMismatch { present: ContentFormat::Json,
                                                       requested: ContentFormat::Text }));

    let body = pool.body(&msg);
    assert_eq!(body.payload().unwrap(), Some(&b"{}"[..]));
    pool.release(msg);
  }

  #[test]
  fn inserts_before_existing_payload() {
    let mut pool = Pool::new(&PoolConfig::default());
    let msg = request(&mut pool, Type::Non, &[], 0);
    pool.body_mut(&msg)
        .unwrap()
        .add_str_option(known::URI_HOST, b"h", OptNumber(0))
        .unwrap();
    pool.body_mut(&msg).unwrap().append_payload(b"x").unwrap();

    append_response_payload(&mut pool, &msg, b"y", ContentFormat::OctetStream).unwrap();
    assert_eq!(pool.body(&msg).as_bytes(),
               &[0x31, b'h', 0x91, 42, 0xFF, b'x', b'y']);
    pool.release(msg);
  }

  #[test]
  fn grows_the_block() {
    let mut pool = Pool::new(&PoolConfig::default());
    let msg = request(&mut pool, Type::Non, &[], 0);
    store_response_header(&mut pool, &mut Id(0), &msg, Type::Non, code::CONTENT).unwrap();
    assert_eq!(pool.capacity(&msg), 64);

    let payload = [b'z'; 300];
    append_response_payload(&mut pool, &msg, &payload, ContentFormat::Text).unwrap();
    assert_eq!(pool.capacity(&msg), 512);

    assert_eq!(pool.body(&msg).payload().unwrap().map(|p| p.len()), Some(300));
    pool.release(msg);
    assert!(pool.census().is_conserved());
  }

  #[test]
  fn payload_limit() {
    let mut pool = Pool::new(&PoolConfig::default());
    let msg = request(&mut pool, Type::Non, &[], 0);

    let payload = [0u8; 1000];
    append_response_payload(&mut pool, &msg, &payload, ContentFormat::OctetStream).unwrap();
    assert_eq!(append_response_payload(&mut pool, &msg, &payload[..25], ContentFormat::OctetStream),
               Err(BuildError::BufferOverflow));
    append_response_payload(&mut pool, &msg, &payload[..24], ContentFormat::OctetStream).unwrap();
    pool.release(msg);
  }

  #[test]
  fn formatted() {
    let mut pool = Pool::new(&PoolConfig::default());
    let msg = request(&mut pool, Type::Non, &[], 0);

    append_response_payload_fmt(&mut pool, &msg, format_args!("t={}", 21), ContentFormat::Text).unwrap();
    assert_eq!(pool.body(&msg).payload().unwrap(), Some(&b"t=21"[..]));
    pool.release(msg);
  }

  #[test]
  fn empty_message() {
    let mut pool = Pool::new(&PoolConfig::default());
    let msg = request(&mut pool, Type::Con, &[1, 2, 3], 3);

    store_empty(&mut pool, &msg, Type::Reset).unwrap();
    let hdr = pool.header(&msg);
    assert_eq!((hdr.ty, hdr.tkl, hdr.code, hdr.id), (Type::Reset, 0, Code::EMPTY, Id(77)));
    assert!(pool.body(&msg).as_bytes().is_empty());
    pool.release(msg);
  }
}
