use tinyvec::ArrayVec;

/// Message token, 0 to 8 opaque bytes used to match a response
/// to the request that caused it.
///
/// Unlike [`crate::Id`], which pairs an Acknowledgement with
/// its Confirmable message, the token survives separate responses
/// and is chosen by the client.
///
/// See [RFC7252 - Token](https://datatracker.ietf.org/doc/html/rfc7252#section-5.3.1) for context
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Debug, Default)]
pub struct Token(pub ArrayVec<[u8; 8]>);

impl Token {
  /// Copy a token out of a byte slice, yielding `None`
  /// when it is longer than 8 bytes.
  ///
  /// ```
  /// use croak_msg::Token;
  ///
  /// assert_eq!(Token::from_slice(&[1, 2]).unwrap().as_bytes(), &[1, 2]);
  /// assert!(Token::from_slice(&[0; 9]).is_none());
  /// ```
  pub fn from_slice(bytes: &[u8]) -> Option<Self> {
    ArrayVec::try_from(bytes).ok().map(Token)
  }

  /// The token's bytes
  pub fn as_bytes(&self) -> &[u8] {
    &self.0
  }
}
