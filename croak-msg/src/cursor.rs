/// Reads an option header a byte at a time
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cursor<'a> {
  bytes: &'a [u8],
  pos: usize,
}

impl<'a> Cursor<'a> {
  pub(crate) fn new(bytes: &'a [u8]) -> Self {
    Cursor { bytes, pos: 0 }
  }

  /// The next byte, or None at the end
  pub(crate) fn next(&mut self) -> Option<u8> {
    self.take_exact(1).map(|b| b[0])
  }

  /// The next `n` bytes, or None (without moving) if fewer remain
  pub(crate) fn take_exact(&mut self, n: usize) -> Option<&'a [u8]> {
    let taken = self.bytes.get(self.pos..self.pos.checked_add(n)?)?;
    self.pos += n;
    Some(taken)
  }

  /// Bytes consumed so far
  pub(crate) fn position(&self) -> usize {
    self.pos
  }
}
