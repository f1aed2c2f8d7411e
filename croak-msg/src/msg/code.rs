/// Message code, split into a 3-bit class and a 5-bit detail
/// and written `c.dd` (`2.05`, `4.04`, ...).
///
/// |class|meaning|
/// |---|---|
/// |`0`|request (or the empty message, `0.00`)|
/// |`2`|success response|
/// |`4`|client error response|
/// |`5`|server error response|
///
/// See [RFC7252 - Code](https://datatracker.ietf.org/doc/html/rfc7252#section-12.1) for context
///
/// ```
/// use croak_msg::Code;
///
/// assert_eq!(u8::from(Code::new(2, 5)), 0b010_00101);
/// assert_eq!(Code::from(0b100_00100), Code::new(4, 4));
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Code {
  /// 3-bit class of the code
  pub class: u8,

  /// 2-digit integer (range `[0, 32)`) that provides granular information about the response status.
  ///
  /// Will always be `0` for the empty message.
  pub detail: u8,
}

/// What a [`Code`] says about the message carrying it
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CodeKind {
  /// `0.00`; pings, ACKs and RESETs without a piggybacked response
  Empty,
  /// `0.01` through `0.31`
  Request,
  /// Every other class
  Response,
}

impl Code {
  /// The empty message code, `0.00`
  pub const EMPTY: Code = Code::new(0, 0);

  /// Create a new Code
  ///
  /// ```
  /// use croak_msg::Code;
  ///
  /// let content = Code::new(2, 05);
  /// ```
  pub const fn new(class: u8, detail: u8) -> Self {
    Self { class, detail }
  }

  /// Classify this code
  ///
  /// ```
  /// use croak_msg::{Code, CodeKind};
  ///
  /// assert_eq!(Code::new(0, 0).kind(), CodeKind::Empty);
  /// assert_eq!(Code::new(0, 1).kind(), CodeKind::Request);
  /// assert_eq!(Code::new(2, 5).kind(), CodeKind::Response);
  /// ```
  pub fn kind(&self) -> CodeKind {
    match (self.class, self.detail) {
      | (0, 0) => CodeKind::Empty,
      | (0, _) => CodeKind::Request,
      | _ => CodeKind::Response,
    }
  }

  /// Get the human string representation of a message code
  ///
  /// # Returns
  /// A `char` array
  ///
  /// This is to avoid unnecessary heap allocation,
  /// you can create a `String` with `FromIterator::<String>::from_iter`.
  /// ```
  /// use croak_msg::Code;
  ///
  /// let code = Code { class: 2, detail: 5 };
  /// let chars = code.to_human();
  /// let string = String::from_iter(chars);
  /// assert_eq!(string, "2.05".to_string());
  /// ```
  pub fn to_human(&self) -> [char; 4] {
    let to_char = |d: u8| char::from_digit(d.into(), 10).unwrap_or('?');
    [to_char(self.class),
     '.',
     to_char(self.detail / 10),
     to_char(self.detail % 10)]
  }
}

impl core::fmt::Display for Code {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    use core::fmt::Write;
    self.to_human().iter().try_for_each(|c| f.write_char(*c))
  }
}

impl From<u8> for Code {
  fn from(b: u8) -> Self {
    let class = b >> 5;
    let detail = b & 0b0011111;

    Code { class, detail }
  }
}

impl From<Code> for u8 {
  fn from(code: Code) -> u8 {
    let class = code.class << 5;
    let detail = code.detail & 0b0011111;

    class | detail
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_code() {
    let byte = 0b_010_00101u8;
    let code = Code::from(byte);
    assert_eq!(code, Code { class: 2, detail: 5 })
  }

  #[test]
  fn serialize_code() {
    let code = Code { class: 4, detail: 15 };
    let actual: u8 = code.into();
    assert_eq!(actual, 0b_100_01111u8);
  }

  #[test]
  fn display() {
    assert_eq!(Code::new(4, 4).to_string(), "4.04");
    assert_eq!(Code::EMPTY.to_string(), "0.00");
  }
}
