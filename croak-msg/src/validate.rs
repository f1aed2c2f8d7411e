use core::ops::Range;

use tinyvec::ArrayVec;

use crate::opt::{known, read_uint, ContentFormat, OptError, OptNumber};
use crate::{BodyRef, PAYLOAD_MARKER};

/// Capacity of the joined Uri-Path and of the joined Uri-Query
pub const URI_CAPACITY: usize = 128;

/// Why a request body was rejected
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Malformed {
  /// The joined Uri-Path or Uri-Query didn't fit in [`URI_CAPACITY`] bytes
  UriTooLong,
  /// An option outside of [`known::RECOGNIZED`]
  UnrecognizedOption(OptNumber),
  /// The body ended in the middle of the token or an option
  Truncated,
  /// An option header used the reserved nibble 15
  Reserved,
  /// A Uri-Path or Uri-Query value was not UTF-8
  NotUtf8(OptNumber),
  /// A numeric option had a value longer than 2 bytes
  NotNumeric(OptNumber),
  /// A payload marker with nothing after it
  EmptyPayload,
}

impl Malformed {
  /// Diagnostic text sent back in the 4.00 response
  pub fn reason(&self) -> &'static str {
    match self {
      | Malformed::UriTooLong => "uri too long",
      | Malformed::UnrecognizedOption(_) => "unrecognized option",
      | Malformed::Truncated => "option truncated",
      | Malformed::Reserved => "reserved option nibble",
      | Malformed::NotUtf8(_) => "uri not utf-8",
      | Malformed::NotNumeric(_) => "numeric option too long",
      | Malformed::EmptyPayload => "payload marker without payload",
    }
  }
}

impl From<OptError> for Malformed {
  fn from(e: OptError) -> Self {
    match e {
      | OptError::ReservedDelta | OptError::ReservedLength => Malformed::Reserved,
      | OptError::NotNumeric { number, .. } => Malformed::NotNumeric(number),
      | _ => Malformed::Truncated,
    }
  }
}

/// What a request handler needs out of a validated request
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Parsed {
  uri: ArrayVec<[u8; URI_CAPACITY]>,
  query: ArrayVec<[u8; URI_CAPACITY]>,
  /// Range of the payload within the body, if there is one
  pub payload: Option<Range<usize>>,
  /// Content-Format option
  pub content_format: Option<ContentFormat>,
  /// Accept option
  pub accept: Option<ContentFormat>,
  /// Last byte of the Block1 option (`NUM` low bits, `M`, `SZX`)
  pub block1: Option<u8>,
  /// Last byte of the Block2 option
  pub block2: Option<u8>,
}

impl Parsed {
  /// Uri-Path segments joined by `/`, without a leading `/`
  pub fn uri(&self) -> &str {
    core::str::from_utf8(&self.uri).unwrap_or("")
  }

  /// Uri-Query terms joined by `&`
  pub fn query(&self) -> &str {
    core::str::from_utf8(&self.query).unwrap_or("")
  }
}

fn append(dst: &mut ArrayVec<[u8; URI_CAPACITY]>, sep: u8, seg: &[u8]) -> Result<(), Malformed> {
  let sep_len = if dst.is_empty() { 0 } else { 1 };
  if dst.len() + sep_len + seg.len() > URI_CAPACITY {
    return Err(Malformed::UriTooLong);
  }

  if sep_len == 1 {
    dst.push(sep);
  }
  dst.extend_from_slice(seg);
  Ok(())
}

/// Walk the options of an inbound request.
///
/// ```
/// use croak_msg::opt::{known, ContentFormat};
/// use croak_msg::{validate, BodyRef};
///
/// // token 0xAB, Uri-Path "a", Uri-Path "b", Content-Format json, payload "{}"
/// let bytes = [0xAB, 0xB1, b'a', 0x01, b'b', 0x11, 50, 0xFF, b'{', b'}'];
/// let parsed = validate(BodyRef::new(&bytes, 1)).unwrap();
///
/// assert_eq!(parsed.uri(), "a/b");
/// assert_eq!(parsed.content_format, Some(ContentFormat::Json));
/// assert_eq!(parsed.payload, Some(8..10));
/// ```
pub fn validate(body: BodyRef<'_>) -> Result<Parsed, Malformed> {
  if body.token().is_none() {
    return Err(Malformed::Truncated);
  }

  let mut parsed = Parsed::default();
  let mut opts = body.options();

  for o in opts.by_ref() {
    let o = o?;

    if !known::is_recognized(o.number) {
      return Err(Malformed::UnrecognizedOption(o.number));
    }

    let utf8 = |v: &[u8]| core::str::from_utf8(v).map(|_| ()).map_err(|_| Malformed::NotUtf8(o.number));
    let numeric = |v: &[u8]| read_uint(o.number, v).map(|n| ContentFormat::from(n as u16));

    match o.number {
      | known::URI_PATH => {
        utf8(o.value)?;
        append(&mut parsed.uri, b'/', o.value)?;
      },
      | known::URI_QUERY => {
        utf8(o.value)?;
        append(&mut parsed.query, b'&', o.value)?;
      },
      | known::CONTENT_FORMAT => parsed.content_format = Some(numeric(o.value)?),
      | known::ACCEPT => parsed.accept = Some(numeric(o.value)?),
      | known::BLOCK1 => parsed.block1 = Some(o.value.last().copied().unwrap_or(0)),
      | known::BLOCK2 => parsed.block2 = Some(o.value.last().copied().unwrap_or(0)),
      | _ => (),
    }
  }

  let end = opts.position();
  let bytes = body.as_bytes();
  if bytes.get(end) == Some(&PAYLOAD_MARKER) {
    if end + 1 == bytes.len() {
      return Err(Malformed::EmptyPayload);
    }
    parsed.payload = Some(end + 1..bytes.len());
  }

  Ok(parsed)
}
