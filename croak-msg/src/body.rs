use crate::opt::{self, create_option_header, header_size, parse_option_header, read_uint, OptError,
                 OptHeader, OptNumber};
use crate::PAYLOAD_MARKER;

/// One option found while scanning a body
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OptRef<'a> {
  /// Option number, accumulated from the deltas before it
  pub number: OptNumber,
  /// Offset of the option header within the body
  pub at: usize,
  /// The parsed header
  pub header: OptHeader,
  /// The option value
  pub value: &'a [u8],
}

impl<'a> OptRef<'a> {
  /// Offset of the first byte after this option
  pub fn end(&self) -> usize {
    self.at + self.header.size + self.header.len
  }
}

/// Iterator over the options of a body, yielded in wire order.
///
/// Stops at the payload marker or the end of the body. A malformed
/// option is yielded as an `Err`, after which the iterator is done.
#[allow(missing_copy_implementations)]
#[derive(Clone, Debug)]
pub struct Options<'a> {
  bytes: &'a [u8],
  pos: usize,
  number: OptNumber,
  done: bool,
}

impl<'a> Options<'a> {
  fn new(bytes: &'a [u8], start: usize) -> Self {
    Self { bytes,
           pos: start,
           number: OptNumber(0),
           done: false }
  }

  /// Offset of the next option header, or (once exhausted)
  /// of the payload marker / end of body
  pub fn position(&self) -> usize {
    self.pos
  }

  /// Number of the last option yielded
  pub fn last_number(&self) -> OptNumber {
    self.number
  }
}

impl<'a> Iterator for Options<'a> {
  type Item = Result<OptRef<'a>, OptError>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.done {
      return None;
    }

    let bytes: &'a [u8] = self.bytes;
    let rest = match bytes.get(self.pos..) {
      | Some(rest) => rest,
      | None => {
        self.done = true;
        return Some(Err(OptError::eof()));
      },
    };

    match rest.first() {
      | None | Some(&PAYLOAD_MARKER) => {
        self.done = true;
        None
      },
      | Some(_) => {
        let at = self.pos;
        let prev = self.number;
        let found = parse_option_header(rest).and_then(|header| {
                                                let value = rest.get(header.size..header.size + header.len)
                                                                .ok_or_else(OptError::eof)?;
                                                let number = prev.0
                                                                 .checked_add(header.delta)
                                                                 .map(OptNumber)
                                                                 .ok_or(OptError::TooLarge(header.delta))?;
                                                Ok(OptRef { number,
                                                            at,
                                                            header,
                                                            value })
                                              });

        match found {
          | Ok(o) => {
            self.pos = o.end();
            self.number = o.number;
            Some(Ok(o))
          },
          | Err(e) => {
            self.done = true;
            Some(Err(e))
          },
        }
      },
    }
  }
}

/// Result of [`BodyRef::find_numeric_option`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup {
  /// The option is present
  Found {
    /// its value
    value: u32,
    /// offset of its header
    at: usize,
  },
  /// The option is absent
  Missing {
    /// where it would have to be inserted to keep options ordered
    insert_at: usize,
    /// number of the option preceding `insert_at` (0 if none)
    prev: OptNumber,
  },
}

/// A read-only view of a message body:
/// token, options, optional `0xFF` + payload.
#[derive(Clone, Copy, Debug)]
pub struct BodyRef<'a> {
  bytes: &'a [u8],
  tkl: usize,
}

impl<'a> BodyRef<'a> {
  /// View `bytes` as a body whose token is `tkl` bytes long
  pub fn new(bytes: &'a [u8], tkl: u8) -> Self {
    Self { bytes,
           tkl: tkl as usize }
  }

  /// The raw body bytes
  pub fn as_bytes(&self) -> &'a [u8] {
    self.bytes
  }

  /// Token length this view was created with
  pub fn token_len(&self) -> usize {
    self.tkl
  }

  /// The token, or `None` if the body is shorter than the token length
  pub fn token(&self) -> Option<&'a [u8]> {
    self.bytes.get(..self.tkl)
  }

  /// Iterate over the options following the token
  pub fn options(&self) -> Options<'a> {
    Options::new(self.bytes, self.tkl)
  }

  /// Offset of the `0xFF` payload marker, if there is one
  pub fn payload_marker(&self) -> Result<Option<usize>, OptError> {
    let mut opts = self.options();
    opts.by_ref().try_for_each(|o| o.map(|_| ()))?;

    match self.bytes.get(opts.position()) {
      | Some(&PAYLOAD_MARKER) => Ok(Some(opts.position())),
      | _ => Ok(None),
    }
  }

  /// The bytes following the payload marker, if there is one
  pub fn payload(&self) -> Result<Option<&'a [u8]>, OptError> {
    let bytes: &'a [u8] = self.bytes;
    self.payload_marker()
        .map(|marker| marker.map(|ix| &bytes[ix + 1..]))
  }

  /// Offset just past the last option, and that option's number.
  ///
  /// This is where an option with a number greater than
  /// every present option would go.
  pub fn end_of_options(&self) -> Result<(usize, OptNumber), OptError> {
    let mut opts = self.options();
    opts.by_ref().try_for_each(|o| o.map(|_| ()))?;
    Ok((opts.position(), opts.last_number()))
  }

  /// Look for the first option numbered `number` and read its value as an unsigned int.
  ///
  /// When missing, the result says where it would have to be
  /// inserted (see [`Body::insert_numeric_option`]).
  ///
  /// ```
  /// use croak_msg::opt::known;
  /// use croak_msg::{BodyRef, Lookup, OptNumber};
  ///
  /// // Uri-Host "h", Location-Path "p"
  /// let bytes = [0x31, b'h', 0x51, b'p'];
  /// let body = BodyRef::new(&bytes, 0);
  ///
  /// assert_eq!(body.find_numeric_option(known::IF_NONE_MATCH).unwrap(),
  ///            Lookup::Missing { insert_at: 2, prev: known::URI_HOST });
  /// ```
  pub fn find_numeric_option(&self, number: OptNumber) -> Result<Lookup, OptError> {
    let mut prev = OptNumber(0);
    let mut opts = self.options();

    for o in opts.by_ref() {
      let o = o?;

      if o.number == number {
        return read_uint(number, o.value).map(|value| Lookup::Found { value, at: o.at });
      }

      if o.number > number {
        return Ok(Lookup::Missing { insert_at: o.at,
                                    prev });
      }

      prev = o.number;
    }

    Ok(Lookup::Missing { insert_at: opts.position(),
                         prev })
  }
}

/// A message body being built or edited in place.
///
/// Wraps the body region of a fixed-capacity buffer (the bytes
/// after the 4-byte header) together with the body's current
/// length. Every edit checks capacity before touching a byte,
/// so a failed operation leaves the buffer as it was.
#[derive(Debug)]
pub struct Body<'a> {
  buf: &'a mut [u8],
  len: &'a mut usize,
  tkl: usize,
}

impl<'a> Body<'a> {
  /// Edit the first `*len` bytes of `buf` as a body whose
  /// token is `tkl` bytes long.
  ///
  /// `len` is clamped to the capacity of `buf`.
  pub fn new(buf: &'a mut [u8], len: &'a mut usize, tkl: u8) -> Self {
    *len = (*len).min(buf.len());
    Self { buf,
           len,
           tkl: tkl as usize }
  }

  /// Read-only view of this body
  pub fn view(&self) -> BodyRef<'_> {
    BodyRef { bytes: &self.buf[..*self.len],
              tkl: self.tkl }
  }

  /// The body bytes written so far
  pub fn as_bytes(&self) -> &[u8] {
    &self.buf[..*self.len]
  }

  /// Bytes written so far
  pub fn len(&self) -> usize {
    *self.len
  }

  /// Whether nothing (not even a token) has been written
  pub fn is_empty(&self) -> bool {
    *self.len == 0
  }

  /// Size of the underlying buffer
  pub fn capacity(&self) -> usize {
    self.buf.len()
  }

  /// Bytes still available for writing
  pub fn remaining(&self) -> usize {
    self.capacity() - self.len()
  }

  /// Discard everything past `len` bytes
  pub fn truncate(&mut self, len: usize) {
    *self.len = (*self.len).min(len);
  }

  /// Append raw bytes
  pub fn extend_from_slice(&mut self, bytes: &[u8]) -> Result<(), OptError> {
    let start = *self.len;
    if bytes.len() > self.remaining() {
      return Err(OptError::BufferTooSmall { needed: bytes.len(),
                                            available: self.remaining() });
    }

    self.buf[start..start + bytes.len()].copy_from_slice(bytes);
    *self.len += bytes.len();
    Ok(())
  }

  fn ensure_no_payload(&self) -> Result<(), OptError> {
    match self.view().payload_marker()? {
      | Some(_) => Err(OptError::PayloadPresent),
      | None => Ok(()),
    }
  }

  fn push_option(&mut self, number: OptNumber, value: &[u8], prev: OptNumber) -> Result<(), OptError> {
    if number < prev {
      return Err(OptError::OutOfOrder { prev, number });
    }

    let hdr = header_size(number.0 - prev.0, value.len())?;
    let needed = hdr + value.len();
    if needed > self.remaining() {
      return Err(OptError::BufferTooSmall { needed,
                                            available: self.remaining() });
    }

    let start = *self.len;
    create_option_header(number, value.len(), prev, &mut self.buf[start..])?;
    self.buf[start + hdr..start + needed].copy_from_slice(value);
    *self.len += needed;
    Ok(())
  }

  /// Append an option with a numeric value after the option numbered `prev`.
  ///
  /// Values up to 255 are written in one byte, up to 65535 in two;
  /// anything larger is [`OptError::ValueTooLarge`].
  pub fn add_uint_option(&mut self, number: OptNumber, value: u32, prev: OptNumber) -> Result<(), OptError> {
    let value = opt::uint_bytes(value)?;
    self.ensure_no_payload()?;
    self.push_option(number, &value, prev)
  }

  /// Append an option with an opaque or string value after the option numbered `prev`.
  ///
  /// ```
  /// use croak_msg::opt::known;
  /// use croak_msg::{Body, OptError, OptNumber};
  ///
  /// let mut buf = [0u8; 4];
  /// let mut len = 0;
  /// let mut body = Body::new(&mut buf, &mut len, 0);
  ///
  /// body.add_str_option(known::URI_PATH, b"ab", OptNumber(0)).unwrap();
  /// assert_eq!(body.add_str_option(known::URI_PATH, b"cd", known::URI_PATH),
  ///            Err(OptError::BufferTooSmall { needed: 3, available: 1 }));
  /// assert_eq!(body.as_bytes(), &[0xB2, b'a', b'b']);
  /// ```
  pub fn add_str_option(&mut self, number: OptNumber, value: &[u8], prev: OptNumber) -> Result<(), OptError> {
    self.ensure_no_payload()?;
    self.push_option(number, value, prev)
  }

  /// Split `s` on `separator` and append one option numbered `number`
  /// per segment, e.g. a path `"sensors/temp"` into two Uri-Path options.
  ///
  /// The whole input is checked (ordering, empty input, leading or
  /// trailing separator, total size) before any byte is written.
  ///
  /// ```
  /// use croak_msg::opt::known;
  /// use croak_msg::{Body, OptError, OptNumber};
  ///
  /// let mut buf = [0u8; 16];
  /// let mut len = 0;
  /// let mut body = Body::new(&mut buf, &mut len, 0);
  ///
  /// assert_eq!(body.add_options_from_string(known::URI_PATH, "/a", '/', OptNumber(0)),
  ///            Err(OptError::StrayDelimiter));
  /// body.add_options_from_string(known::URI_PATH, "a/bc", '/', OptNumber(0)).unwrap();
  /// assert_eq!(body.as_bytes(), &[0xB1, b'a', 0x02, b'b', b'c']);
  /// ```
  pub fn add_options_from_string(&mut self,
                                 number: OptNumber,
                                 s: &str,
                                 separator: char,
                                 prev: OptNumber)
                                 -> Result<(), OptError> {
    if s.is_empty() {
      return Err(OptError::EmptyString);
    }

    if s.starts_with(separator) || s.ends_with(separator) {
      return Err(OptError::StrayDelimiter);
    }

    if number < prev {
      return Err(OptError::OutOfOrder { prev, number });
    }

    self.ensure_no_payload()?;

    let needed = s.split(separator)
                  .enumerate()
                  .map(|(ix, seg)| {
                    let delta = if ix == 0 { number.0 - prev.0 } else { 0 };
                    header_size(delta, seg.len()).map(|hdr| hdr + seg.len())
                  })
                  .sum::<Result<usize, OptError>>()?;

    if needed > self.remaining() {
      return Err(OptError::BufferTooSmall { needed,
                                            available: self.remaining() });
    }

    s.split(separator).enumerate().try_for_each(|(ix, seg)| {
                                    let prev = if ix == 0 { prev } else { number };
                                    self.push_option(number, seg.as_bytes(), prev)
                                  })
  }

  /// Insert a numeric option at offset `at`, which must be an option
  /// boundary (see [`Lookup::Missing`]) following the option numbered `prev`.
  ///
  /// The option that used to start at `at` (if any) has its delta
  /// re-encoded relative to `number`, and every byte after it shifts by
  /// `new option size + following header size after - following header size before`.
  ///
  /// ```
  /// use croak_msg::opt::known;
  /// use croak_msg::{Body, OptNumber};
  ///
  /// // Uri-Host "h", Location-Path "p"
  /// let mut buf = [0x31, b'h', 0x51, b'p', 0, 0];
  /// let mut len = 4;
  /// let mut body = Body::new(&mut buf, &mut len, 0);
  ///
  /// body.insert_numeric_option(2, known::URI_HOST, known::IF_NONE_MATCH, 0).unwrap();
  /// assert_eq!(body.as_bytes(), &[0x31, b'h', 0x21, 0x00, 0x31, b'p']);
  /// ```
  pub fn insert_numeric_option(&mut self,
                               at: usize,
                               prev: OptNumber,
                               number: OptNumber,
                               value: u32)
                               -> Result<(), OptError> {
    let len = *self.len;
    if at < self.tkl || at > len {
      return Err(OptError::InvalidPosition(at));
    }

    if number < prev {
      return Err(OptError::OutOfOrder { prev, number });
    }

    let value = opt::uint_bytes(value)?;
    let new_hdr = header_size(number.0 - prev.0, value.len())?;
    let new_bytes = new_hdr + value.len();

    let following = match self.buf[at..len].first() {
      | None | Some(&PAYLOAD_MARKER) => None,
      | Some(_) => {
        let hdr = parse_option_header(&self.buf[at..len])?;
        let following = prev.0
                            .checked_add(hdr.delta)
                            .map(OptNumber)
                            .ok_or(OptError::TooLarge(hdr.delta))?;
        if following < number {
          return Err(OptError::OutOfOrder { prev: number,
                                            number: following });
        }

        let rewritten = header_size(following.0 - number.0, hdr.len)?;
        Some((following, hdr, rewritten))
      },
    };

    let (old_hdr, next_hdr) = following.map(|(_, hdr, rewritten)| (hdr.size, rewritten))
                                       .unwrap_or((0, 0));

    let size_change = new_bytes + next_hdr - old_hdr;
    if len + size_change > self.capacity() {
      return Err(OptError::BufferTooSmall { needed: size_change,
                                            available: self.remaining() });
    }

    self.buf.copy_within(at + old_hdr..len, at + new_bytes + next_hdr);
    create_option_header(number, value.len(), prev, &mut self.buf[at..])?;
    self.buf[at + new_hdr..at + new_bytes].copy_from_slice(&value);

    if let Some((following, hdr, _)) = following {
      create_option_header(following, hdr.len, number, &mut self.buf[at + new_bytes..])?;
    }

    *self.len = len + size_change;
    Ok(())
  }

  /// Append payload bytes, writing the `0xFF` marker first if
  /// there isn't one yet. Appending nothing is a no-op, since
  /// a marker followed by an empty payload is a format error.
  pub fn append_payload(&mut self, bytes: &[u8]) -> Result<(), OptError> {
    if bytes.is_empty() {
      return Ok(());
    }

    let marker = match self.view().payload_marker()? {
      | Some(_) => 0,
      | None => 1,
    };

    let needed = marker + bytes.len();
    if needed > self.remaining() {
      return Err(OptError::BufferTooSmall { needed,
                                            available: self.remaining() });
    }

    if marker == 1 {
      self.extend_from_slice(&[PAYLOAD_MARKER])?;
    }
    self.extend_from_slice(bytes)
  }

  /// See [`BodyRef::options`]
  pub fn options(&self) -> Options<'_> {
    self.view().options()
  }

  /// See [`BodyRef::payload_marker`]
  pub fn payload_marker(&self) -> Result<Option<usize>, OptError> {
    self.view().payload_marker()
  }

  /// See [`BodyRef::find_numeric_option`]
  pub fn find_numeric_option(&self, number: OptNumber) -> Result<Lookup, OptError> {
    self.view().find_numeric_option(number)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::opt::known;

  fn body<'a>(buf: &'a mut [u8], len: &'a mut usize) -> Body<'a> {
    Body::new(buf, len, 0)
  }

  #[test]
  fn uri_path_then_content_format() {
    let mut buf = [0u8; 16];
    let mut len = 0;
    let mut b = body(&mut buf, &mut len);

    b.add_str_option(known::URI_PATH, b"a", OptNumber(0)).unwrap();
    b.add_uint_option(known::CONTENT_FORMAT, 0, known::URI_PATH)
     .unwrap();

    assert_eq!(b.as_bytes(), &[0xB1, b'a', 0x11, 0x00]);
    assert_eq!(b.payload_marker(), Ok(None));
  }

  #[test]
  fn uint_option_widths() {
    let mut buf = [0u8; 16];
    let mut len = 0;
    let mut b = body(&mut buf, &mut len);

    b.add_uint_option(known::MAX_AGE, 255, OptNumber(0)).unwrap();
    b.add_uint_option(known::ACCEPT, 256, known::MAX_AGE).unwrap();
    assert_eq!(b.add_uint_option(known::SIZE1, 65536, known::ACCEPT),
               Err(OptError::ValueTooLarge(65536)));

    assert_eq!(b.as_bytes(), &[0xD1, 0x01, 0xFF, 0x32, 0x01, 0x00]);
  }

  #[test]
  fn out_of_order_leaves_buffer_untouched() {
    let mut buf = [0u8; 16];
    let mut len = 0;
    let mut b = body(&mut buf, &mut len);

    b.add_uint_option(known::CONTENT_FORMAT, 0, OptNumber(0)).unwrap();
    let before = b.as_bytes().to_vec();

    assert!(matches!(b.add_str_option(known::URI_PATH, b"x", known::CONTENT_FORMAT),
                     Err(OptError::OutOfOrder { .. })));
    assert!(matches!(b.add_options_from_string(known::URI_PATH, "x/y", '/', known::CONTENT_FORMAT),
                     Err(OptError::OutOfOrder { .. })));
    assert!(matches!(b.insert_numeric_option(0, known::CONTENT_FORMAT, known::URI_PORT, 1),
                     Err(OptError::OutOfOrder { .. })));

    assert_eq!(b.as_bytes(), before.as_slice());
  }

  #[test]
  fn from_string_checks_size_before_writing() {
    let mut buf = [0u8; 5];
    let mut len = 0;
    let mut b = body(&mut buf, &mut len);

    assert_eq!(b.add_options_from_string(known::URI_PATH, "ab/cd", '/', OptNumber(0)),
               Err(OptError::BufferTooSmall { needed: 6,
                                              available: 5 }));
    assert!(b.is_empty());
    assert_eq!(b.add_options_from_string(known::URI_PATH, "", '/', OptNumber(0)),
               Err(OptError::EmptyString));
    assert_eq!(b.add_options_from_string(known::URI_QUERY, "a=1&", '&', OptNumber(0)),
               Err(OptError::StrayDelimiter));
  }

  #[test]
  fn insert_before_following_option() {
    // token "tk", Uri-Host "h", Location-Path "p", payload "xyz"
    let mut buf = [0u8; 16];
    let init = [b't', b'k', 0x31, b'h', 0x51, b'p', 0xFF, b'x', b'y', b'z'];
    buf[..init.len()].copy_from_slice(&init);
    let mut len = init.len();
    let mut b = Body::new(&mut buf, &mut len, 2);

    let (at, prev) = match b.find_numeric_option(known::IF_NONE_MATCH).unwrap() {
      | Lookup::Missing { insert_at, prev } => (insert_at, prev),
      | found => panic!("unexpected {:?}", found),
    };
    assert_eq!((at, prev), (4, known::URI_HOST));

    b.insert_numeric_option(at, prev, known::IF_NONE_MATCH, 7)
     .unwrap();

    assert_eq!(b.as_bytes(),
               &[b't', b'k', 0x31, b'h', 0x21, 7, 0x31, b'p', 0xFF, b'x', b'y', b'z']);
    assert_eq!(b.len(), init.len() + 2);
    assert_eq!(b.view().payload().unwrap(), Some(&b"xyz"[..]));
    assert_eq!(b.find_numeric_option(known::IF_NONE_MATCH).unwrap(),
               Lookup::Found { value: 7, at: 4 });
  }

  #[test]
  fn insert_before_payload_marker() {
    let mut buf = [0u8; 16];
    let init = [0x31, b'h', 0xFF, b'x'];
    buf[..init.len()].copy_from_slice(&init);
    let mut len = init.len();
    let mut b = body(&mut buf, &mut len);

    let (at, prev) = match b.find_numeric_option(known::CONTENT_FORMAT).unwrap() {
      | Lookup::Missing { insert_at, prev } => (insert_at, prev),
      | found => panic!("unexpected {:?}", found),
    };
    assert_eq!(at, 2);

    b.insert_numeric_option(at, prev, known::CONTENT_FORMAT, 50)
     .unwrap();
    assert_eq!(b.as_bytes(), &[0x31, b'h', 0x91, 50, 0xFF, b'x']);
  }

  #[test]
  fn insert_rewrites_extended_delta() {
    // Uri-Host at 3, then Size1 (60): delta 57 needs one extension byte
    let mut buf = [0u8; 16];
    let init = [0x31, b'h', 0xD1, 57 - 13, 9];
    buf[..init.len()].copy_from_slice(&init);
    let mut len = init.len();
    let mut b = body(&mut buf, &mut len);

    // Max-Age at 14 leaves a delta of 46 for Size1, still extended
    b.insert_numeric_option(2, known::URI_HOST, known::MAX_AGE, 1)
     .unwrap();
    assert_eq!(b.as_bytes(), &[0x31, b'h', 0xB1, 1, 0xD1, 46 - 13, 9]);

    // Block1 at 27 leaves 33 for Size1 and takes the place after Max-Age
    let at = match b.find_numeric_option(known::BLOCK1).unwrap() {
      | Lookup::Missing { insert_at, prev } => {
        assert_eq!(prev, known::MAX_AGE);
        insert_at
      },
      | found => panic!("unexpected {:?}", found),
    };
    b.insert_numeric_option(at, known::MAX_AGE, known::BLOCK1, 2)
     .unwrap();
    assert_eq!(b.as_bytes(),
               &[0x31, b'h', 0xB1, 1, 0xD1, 0, 2, 0xD1, 33 - 13, 9]);
  }

  #[test]
  fn insert_overflow() {
    let mut buf = [0x31, b'h', 0x51, b'p'];
    let mut len = 4;
    let mut b = body(&mut buf, &mut len);

    assert!(matches!(b.insert_numeric_option(2, known::URI_HOST, known::IF_NONE_MATCH, 0),
                     Err(OptError::BufferTooSmall { .. })));
    assert_eq!(b.as_bytes(), &[0x31, b'h', 0x51, b'p']);
  }

  #[test]
  fn find_rejects_long_values() {
    let bytes = [0xC3, 1, 2, 3];
    let body = BodyRef::new(&bytes, 0);
    assert_eq!(body.find_numeric_option(known::CONTENT_FORMAT),
               Err(OptError::NotNumeric { number: known::CONTENT_FORMAT,
                                          len: 3 }));
  }

  #[test]
  fn find_reports_overrun() {
    let bytes = [0xC3, 1];
    let body = BodyRef::new(&bytes, 0);
    assert_eq!(body.find_numeric_option(known::ACCEPT),
               Err(OptError::UnexpectedEndOfStream));
  }

  #[test]
  fn append_payload() {
    let mut buf = [0u8; 8];
    let mut len = 0;
    let mut b = body(&mut buf, &mut len);

    b.add_uint_option(known::CONTENT_FORMAT, 0, OptNumber(0)).unwrap();
    b.append_payload(b"").unwrap();
    assert_eq!(b.payload_marker(), Ok(None));

    b.append_payload(b"ab").unwrap();
    b.append_payload(b"c").unwrap();
    assert_eq!(b.as_bytes(), &[0xC1, 0, 0xFF, b'a', b'b', b'c']);
    assert_eq!(b.append_payload(b"def"),
               Err(OptError::BufferTooSmall { needed: 3,
                                              available: 2 }));
    assert_eq!(b.add_uint_option(known::SIZE1, 1, known::CONTENT_FORMAT),
               Err(OptError::PayloadPresent));
  }

  #[test]
  fn options_iter() {
    let bytes = [0xB1, b'a', 0x01, b'b', 0x41, b'q', 0xFF, 0x31];
    let opts = BodyRef::new(&bytes, 0).options()
                                       .map(|o| o.map(|o| (o.number, o.value)))
                                       .collect::<Result<Vec<_>, _>>()
                                       .unwrap();
    assert_eq!(opts,
               vec![(known::URI_PATH, &b"a"[..]),
                    (known::URI_PATH, &b"b"[..]),
                    (known::URI_QUERY, &b"q"[..])]);
  }
}
