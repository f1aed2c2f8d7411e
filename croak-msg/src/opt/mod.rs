use tinyvec::ArrayVec;

use crate::cursor::Cursor;

mod content_format;
mod error;

/// Option numbers understood by croak
pub mod known;

pub use content_format::*;
pub use error::*;

/// Largest delta or length the extended nibble encoding can carry
pub const MAX_EXTENDED: u32 = 269 + u16::MAX as u32;

/// Largest an option header can be: 1 byte of nibbles,
/// 2 bytes of extended delta, 2 bytes of extended length
pub const MAX_HEADER_SIZE: usize = 5;

/// Option Number, identifying which option is being set
/// (e.g. Content-Format has a Number of 12).
///
/// On the wire each option only carries the difference
/// between its number and the previous option's, so
/// numbers are accumulated while scanning.
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct OptNumber(pub u32);

impl OptNumber {
  /// Critical options must be understood by the receiver
  ///
  /// ```
  /// use croak_msg::opt::known;
  ///
  /// assert!(known::URI_PATH.is_critical());
  /// assert!(!known::CONTENT_FORMAT.is_critical());
  /// ```
  pub fn is_critical(&self) -> bool {
    self.0 & 0b1 == 1
  }
}

/// A freshly parsed option header
///
/// ```text
///   0   1   2   3   4   5   6   7
/// +---------------+---------------+
/// |  Option Delta | Option Length |   1 byte
/// +---------------+---------------+
/// /         Option Delta          /   0-2 bytes
/// \          (extended)           \
/// +-------------------------------+
/// /         Option Length         /   0-2 bytes
/// \          (extended)           \
/// +-------------------------------+
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OptHeader {
  /// Difference between this option's number and the previous option's
  pub delta: u32,
  /// Length of the value following the header
  pub len: usize,
  /// Number of bytes the header itself occupied
  pub size: usize,
}

fn nibble(val: u32) -> Result<(u8, ArrayVec<[u8; 2]>), OptError> {
  let mut ext = ArrayVec::new();
  match val {
    | n if n > MAX_EXTENDED => Err(OptError::TooLarge(n)),
    | n if n >= 269 => {
      ext.extend(((n - 269) as u16).to_be_bytes());
      Ok((14, ext))
    },
    | n if n >= 13 => {
      ext.push((n - 13) as u8);
      Ok((13, ext))
    },
    | n => Ok((n as u8, ext)),
  }
}

/// Number of bytes an option header with this delta
/// and value length occupies
///
/// ```
/// use croak_msg::opt::header_size;
///
/// assert_eq!(header_size(0, 12).unwrap(), 1);
/// assert_eq!(header_size(13, 12).unwrap(), 2);
/// assert_eq!(header_size(13, 300).unwrap(), 4);
/// ```
pub fn header_size(delta: u32, len: usize) -> Result<usize, OptError> {
  let (_, d) = nibble(delta)?;
  let (_, l) = nibble(len_u32(len)?)?;
  Ok(1 + d.len() + l.len())
}

fn len_u32(len: usize) -> Result<u32, OptError> {
  u32::try_from(len).map_err(|_| OptError::TooLarge(u32::MAX))
}

fn parse_nibble(head: u8, bytes: &mut Cursor<'_>, reserved_err: OptError) -> Result<u32, OptError> {
  match head {
    | 13 => {
      let n = bytes.next().ok_or_else(OptError::eof)?;
      Ok((n as u32) + 13)
    },
    | 14 => match bytes.take_exact(2) {
      | Some(&[a, b]) => Ok(u16::from_be_bytes([a, b]) as u32 + 269),
      | _ => Err(OptError::eof()),
    },
    | 15 => Err(reserved_err),
    | _ => Ok(head as u32),
  }
}

/// Write the header of an option with number `number` and a
/// value `len` bytes long, following an option numbered `prev`.
///
/// Returns the number of bytes written to the front of `out`.
/// Nothing is written when an error is returned.
///
/// ```
/// use croak_msg::opt::{create_option_header, known, OptError};
/// use croak_msg::OptNumber;
///
/// let mut out = [0u8; 5];
///
/// // Uri-Path after nothing: delta 11, length 1
/// assert_eq!(create_option_header(known::URI_PATH, 1, OptNumber(0), &mut out), Ok(1));
/// assert_eq!(out[0], 0xB1);
///
/// // delta 300 needs 2 extension bytes
/// assert_eq!(create_option_header(OptNumber(300), 0, OptNumber(0), &mut out), Ok(3));
/// assert_eq!(&out[..3], &[0xE0, 0x00, 31]);
///
/// assert_eq!(create_option_header(OptNumber(3), 0, OptNumber(8), &mut out),
///            Err(OptError::OutOfOrder { prev: OptNumber(8), number: OptNumber(3) }));
/// ```
pub fn create_option_header(number: OptNumber,
                            len: usize,
                            prev: OptNumber,
                            out: &mut [u8])
                            -> Result<usize, OptError> {
  if number < prev {
    return Err(OptError::OutOfOrder { prev, number });
  }

  let (del, del_bytes) = nibble(number.0 - prev.0)?;
  let (len, len_bytes) = nibble(len_u32(len)?)?;

  let size = 1 + del_bytes.len() + len_bytes.len();
  if out.len() < size {
    return Err(OptError::BufferTooSmall { needed: size,
                                          available: out.len() });
  }

  out[0] = del << 4 | len;
  out[1..1 + del_bytes.len()].copy_from_slice(&del_bytes);
  out[1 + del_bytes.len()..size].copy_from_slice(&len_bytes);

  Ok(size)
}

/// Read the option header at the front of `bytes`.
///
/// This does not check that the value fits in `bytes`;
/// see [`OptHeader::len`].
///
/// ```
/// use croak_msg::opt::{parse_option_header, OptError, OptHeader};
///
/// assert_eq!(parse_option_header(&[0xD1, 0x02, b'x']),
///            Ok(OptHeader { delta: 15, len: 1, size: 2 }));
/// assert_eq!(parse_option_header(&[0xF1]), Err(OptError::ReservedDelta));
/// assert_eq!(parse_option_header(&[0xE1, 0x00]), Err(OptError::UnexpectedEndOfStream));
/// ```
pub fn parse_option_header(bytes: &[u8]) -> Result<OptHeader, OptError> {
  let mut cur = Cursor::new(bytes);
  let head = cur.next().ok_or_else(OptError::eof)?;

  let delta = parse_nibble(head >> 4, &mut cur, OptError::ReservedDelta)?;
  let len = parse_nibble(head & 0b1111, &mut cur, OptError::ReservedLength)?;

  Ok(OptHeader { delta,
                 len: len as usize,
                 size: cur.position() })
}

/// The fewest bytes a numeric option value can be written in.
///
/// Values up to 255 take one byte, up to 65535 two.
///
/// ```
/// use croak_msg::opt::{uint_bytes, OptError};
///
/// assert_eq!(uint_bytes(0).unwrap().as_slice(), &[0]);
/// assert_eq!(uint_bytes(256).unwrap().as_slice(), &[1, 0]);
/// assert_eq!(uint_bytes(65536), Err(OptError::ValueTooLarge(65536)));
/// ```
pub fn uint_bytes(value: u32) -> Result<ArrayVec<[u8; 2]>, OptError> {
  let mut bytes = ArrayVec::new();
  match value {
    | n if n > u16::MAX as u32 => return Err(OptError::ValueTooLarge(n)),
    | n if n > u8::MAX as u32 => bytes.extend((n as u16).to_be_bytes()),
    | n => bytes.push(n as u8),
  }
  Ok(bytes)
}

/// Read a numeric option value of 0, 1 or 2 bytes
pub fn read_uint(number: OptNumber, value: &[u8]) -> Result<u32, OptError> {
  match value {
    | [] => Ok(0),
    | &[a] => Ok(a as u32),
    | &[a, b] => Ok(u16::from_be_bytes([a, b]) as u32),
    | _ => Err(OptError::NotNumeric { number,
                                      len: value.len() }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn roundtrip(delta: u32, len: usize) {
    let mut out = [0u8; MAX_HEADER_SIZE];
    let size = create_option_header(OptNumber(delta + 4), len, OptNumber(4), &mut out).unwrap();
    assert_eq!(size, header_size(delta, len).unwrap());
    assert_eq!(parse_option_header(&out[..size]).unwrap(),
               OptHeader { delta, len, size });
  }

  #[test]
  fn header_roundtrips_across_encoding_boundaries() {
    for v in [0u32, 12, 13, 268, 269, 65804] {
      roundtrip(v, 0);
      roundtrip(0, v as usize);
      roundtrip(v, v as usize);
    }
  }

  #[test]
  fn delta_extension_precedes_length_extension() {
    let mut out = [0u8; MAX_HEADER_SIZE];
    let size = create_option_header(OptNumber(13), 269, OptNumber(0), &mut out).unwrap();
    assert_eq!(&out[..size], &[0xDE, 0x00, 0x00, 0x00]);
  }

  #[test]
  fn too_large() {
    let mut out = [0u8; MAX_HEADER_SIZE];
    assert_eq!(create_option_header(OptNumber(65805), 0, OptNumber(0), &mut out),
               Err(OptError::TooLarge(65805)));
    assert_eq!(create_option_header(OptNumber(0), 65805, OptNumber(0), &mut out),
               Err(OptError::TooLarge(65805)));
  }

  #[test]
  fn out_of_order_and_short_buffer_leave_output_untouched() {
    let mut out = [0xAAu8; 2];
    assert!(matches!(create_option_header(OptNumber(1), 0, OptNumber(2), &mut out),
                     Err(OptError::OutOfOrder { .. })));
    assert_eq!(create_option_header(OptNumber(300), 0, OptNumber(0), &mut out),
               Err(OptError::BufferTooSmall { needed: 3,
                                              available: 2 }));
    assert_eq!(out, [0xAA, 0xAA]);
  }

  #[test]
  fn reserved_length() {
    assert_eq!(parse_option_header(&[0x1F]), Err(OptError::ReservedLength));
  }

  #[test]
  fn read_uint_lengths() {
    assert_eq!(read_uint(OptNumber(12), &[]), Ok(0));
    assert_eq!(read_uint(OptNumber(12), &[0x01, 0x00]), Ok(256));
    assert_eq!(read_uint(OptNumber(12), &[1, 2, 3]),
               Err(OptError::NotNumeric { number: OptNumber(12),
                                          len: 3 }));
  }
}
