use super::MessageParseError;

/// Indicates if this message is of
/// type Confirmable (0), Non-confirmable (1), Acknowledgement (2), or Reset (3).
///
/// See [RFC7252 - Message Details](https://datatracker.ietf.org/doc/html/rfc7252#section-3) for context
#[derive(Copy, Clone, Hash, Eq, Ord, PartialEq, PartialOrd, Debug)]
pub enum Type {
  /// Some messages do not require an acknowledgement, e.g.
  /// repeated readings from a sensor.
  Non,
  /// Messages that require an acknowledgement. Each Confirmable
  /// message elicits exactly one Acknowledgement or Reset.
  Con,
  /// Acknowledges that a specific Confirmable message arrived,
  /// possibly carrying a piggybacked response.
  Ack,
  /// A specific message was received but some context is missing
  /// to process it. Also the answer to an empty Confirmable message
  /// ("CoAP ping").
  Reset,
}

impl Type {
  /// Whether this is [`Type::Con`] or [`Type::Non`]
  pub fn is_con_or_non(&self) -> bool {
    matches!(self, Type::Con | Type::Non)
  }
}

impl Default for Type {
  fn default() -> Self {
    Type::Con
  }
}

impl TryFrom<u8> for Type {
  type Error = MessageParseError;

  fn try_from(b: u8) -> Result<Self, Self::Error> {
    match b {
      | 0 => Ok(Type::Con),
      | 1 => Ok(Type::Non),
      | 2 => Ok(Type::Ack),
      | 3 => Ok(Type::Reset),
      | _ => Err(MessageParseError::InvalidType(b)),
    }
  }
}

impl From<Type> for u8 {
  fn from(t: Type) -> u8 {
    match t {
      | Type::Con => 0,
      | Type::Non => 1,
      | Type::Ack => 2,
      | Type::Reset => 3,
    }
  }
}
