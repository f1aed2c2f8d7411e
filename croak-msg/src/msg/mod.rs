mod code;
mod id;
mod parse_error;
mod token;
mod ty;
mod ver;

pub use code::*;
pub use id::*;
pub use parse_error::*;
pub use token::*;
pub use ty::*;
pub use ver::*;

/// Size of the fixed message header on the wire
pub const HEADER_SIZE: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Byte1 {
  pub(crate) ver: Version,
  pub(crate) ty: Type,
  pub(crate) tkl: u8,
}

impl TryFrom<u8> for Byte1 {
  type Error = MessageParseError;

  fn try_from(b: u8) -> Result<Self, Self::Error> {
    let ver = b >> 6; // bits 0 & 1
    let ty = b >> 4 & 0b11; // bits 2 & 3
    let tkl = b & 0b1111u8; // last 4 bits

    Ok(Byte1 { ver: Version(ver),
               ty: Type::try_from(ty)?,
               tkl })
  }
}

impl From<Byte1> for u8 {
  fn from(b: Byte1) -> u8 {
    let ver = b.ver.0 << 6;
    let ty = u8::from(b.ty) << 4;
    let tkl = b.tkl & 0b1111;

    ver | ty | tkl
  }
}

/// The 4 bytes at the front of every CoAP message
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |Ver| T |  TKL  |      Code     |          Message ID           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// `tkl` is kept exactly as it appeared on the wire (0..=15);
/// values above [`crate::MAX_TOKEN_LEN`] are only rejected by
/// [`Header::check_token_len`] so that a receiver can still
/// read the id out of a broken message.
///
/// ```
/// use croak_msg::{Code, Header, Id, Type};
///
/// let hdr = Header::parse(&[0x42, 0x01, 0x12, 0x34]).unwrap();
/// assert_eq!(hdr.ty, Type::Con);
/// assert_eq!(hdr.tkl, 2);
/// assert_eq!(hdr.code, Code::new(0, 1));
/// assert_eq!(hdr.id, Id(0x1234));
/// assert_eq!(hdr.to_bytes(), [0x42, 0x01, 0x12, 0x34]);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Header {
  /// see [`Version`]
  pub ver: Version,
  /// see [`Type`]
  pub ty: Type,
  /// Token length
  pub tkl: u8,
  /// see [`Code`]
  pub code: Code,
  /// see [`Id`]
  pub id: Id,
}

impl Header {
  /// Read a header from the first 4 bytes of `bytes`
  pub fn parse(bytes: &[u8]) -> Result<Self, MessageParseError> {
    match bytes {
      | &[b1, code, id_a, id_b, ..] => {
        let Byte1 { ver, ty, tkl } = Byte1::try_from(b1)?;
        Ok(Header { ver,
                    ty,
                    tkl,
                    code: Code::from(code),
                    id: Id::from_be_bytes([id_a, id_b]) })
      },
      | _ => Err(MessageParseError::eof()),
    }
  }

  /// Fail with [`MessageParseError::InvalidTokenLength`]
  /// if `tkl` is larger than 8
  pub fn check_token_len(&self) -> Result<(), MessageParseError> {
    if self.tkl > crate::MAX_TOKEN_LEN {
      Err(MessageParseError::InvalidTokenLength(self.tkl))
    } else {
      Ok(())
    }
  }

  /// Serialize to wire bytes
  pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
    let byte1: u8 = Byte1 { ver: self.ver,
                            ty: self.ty,
                            tkl: self.tkl }.into();
    let [id_a, id_b]: [u8; 2] = self.id.into();

    [byte1, self.code.into(), id_a, id_b]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_byte1() {
    let byte = 0b_01_10_0011u8;
    let byte = Byte1::try_from(byte).unwrap();
    assert_eq!(byte,
               Byte1 { ver: Version(1),
                       ty: Type::Ack,
                       tkl: 3 })
  }

  #[test]
  fn keeps_oversized_tkl() {
    let hdr = Header::parse(&[0b01_00_1001, 0x01, 0, 1]).unwrap();
    assert_eq!(hdr.tkl, 9);
    assert_eq!(hdr.check_token_len(),
               Err(MessageParseError::InvalidTokenLength(9)));
  }

  #[test]
  fn short_header() {
    assert_eq!(Header::parse(&[0x40, 0x01, 0x00]),
               Err(MessageParseError::UnexpectedEndOfStream));
  }

  #[test]
  fn to_bytes() {
    let hdr = Header { ver: Version(1),
                       ty: Type::Reset,
                       tkl: 0,
                       code: Code::EMPTY,
                       id: Id(0xBEEF) };
    assert_eq!(hdr.to_bytes(), [0b01_11_0000, 0, 0xBE, 0xEF]);
  }
}
