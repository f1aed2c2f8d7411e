use super::OptNumber;

/// Errors encounterable while encoding, decoding or
/// editing options in place
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum OptError {
  /// An option was written with a number smaller than
  /// the option preceding it
  OutOfOrder {
    /// number of the preceding option
    prev: OptNumber,
    /// number that was attempted
    number: OptNumber,
  },

  /// The destination buffer can't hold the bytes to be written
  BufferTooSmall {
    /// total bytes the operation needed
    needed: usize,
    /// bytes the buffer had available
    available: usize,
  },

  /// An option delta or value length was larger than 65804,
  /// the largest value the extended encoding can carry
  TooLarge(u32),

  /// A numeric option value didn't fit in 2 bytes
  ValueTooLarge(u32),

  /// Option Delta was set to 15, which is invalid.
  ReservedDelta,

  /// Value Length was set to 15, which is invalid.
  ReservedLength,

  /// Reached end of stream before an option was finished
  UnexpectedEndOfStream,

  /// An option read as a number had a value longer than 2 bytes
  NotNumeric {
    /// the option's number
    number: OptNumber,
    /// length of the value found
    len: usize,
  },

  /// The input to a string split began or ended with the separator
  StrayDelimiter,

  /// The input to a string split was empty
  EmptyString,

  /// An insertion point was outside of the option region
  InvalidPosition(usize),

  /// Options can't be appended once a payload is present
  PayloadPresent,
}

impl OptError {
  /// Shorthand for [`OptError::UnexpectedEndOfStream`]
  pub fn eof() -> Self {
    Self::UnexpectedEndOfStream
  }
}
