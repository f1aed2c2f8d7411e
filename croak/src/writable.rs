use core::fmt::Display;
use core::ops::Deref;

use tinyvec::{Array, ArrayVec};

/// A fixed-capacity byte buffer usable with `write!`
///
/// ```
/// use core::fmt::Write as _;
///
/// use croak::writable::Writable;
///
/// let mut faux_string = Writable::<[u8; 4]>::default();
/// write!(faux_string, "{}", 123).unwrap();
/// assert_eq!(faux_string.as_str(), "123");
///
/// assert!(write!(faux_string, "45").is_err());
/// assert_eq!(faux_string.as_str(), "123");
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Writable<A: Array<Item = u8>>(ArrayVec<A>);

impl<A: Array<Item = u8>> Writable<A> {
  /// The bytes written so far, as a string slice
  pub fn as_str(&self) -> &str {
    core::str::from_utf8(&self.0).unwrap_or("")
  }
}

impl<A: Array<Item = u8>> Default for Writable<A> {
  fn default() -> Self {
    Self(ArrayVec::new())
  }
}

impl<A: Array<Item = u8>> Display for Writable<A> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl<A: Array<Item = u8>> Deref for Writable<A> {
  type Target = [u8];

  fn deref(&self) -> &[u8] {
    &self.0
  }
}

impl<A: Array<Item = u8>> core::fmt::Write for Writable<A> {
  fn write_str(&mut self, s: &str) -> core::fmt::Result {
    if self.0.len() + s.len() > A::CAPACITY {
      Err(core::fmt::Error)
    } else {
      self.0.extend_from_slice(s.as_bytes());
      Ok(())
    }
  }
}
