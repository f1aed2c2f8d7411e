use embedded_time::duration::Milliseconds;

/// A duration, in milliseconds
pub type Millis = Milliseconds<u64>;

/// Supertrait of [`embedded_time::Clock`] pinning the
/// type of "ticks" to u64
pub trait Clock: embedded_time::Clock<T = u64> {}
impl<C: embedded_time::Clock<T = u64>> Clock for C {}

/// The clock could not produce a timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockError;

/// A point in time on the queues' millisecond timeline.
///
/// Ticks are the low 32 bits of the clock's milliseconds since
/// epoch, so they wrap roughly every 49.7 days; compare them with
/// [`Tick::is_later_than`], never with `<`.
///
/// `Tick(0)` is reserved to mean "due immediately" and is never
/// produced from a clock reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Tick(pub u32);

impl Tick {
  /// Due immediately
  pub const NOW: Tick = Tick(0);

  /// The last tick before wrapping
  pub const MAX: Tick = Tick(u32::MAX);

  /// A quarter of the way around the timeline
  pub const QUARTER: Tick = Tick(1 << 30);

  const HALF: u32 = 1 << 31;

  /// Convert milliseconds since epoch to a tick
  ///
  /// ```
  /// use croak::time::Tick;
  ///
  /// assert_eq!(Tick::from_millis(12), Tick(12));
  /// assert_eq!(Tick::from_millis(1 << 32), Tick(1));
  /// ```
  pub fn from_millis(ms: u64) -> Tick {
    match ms as u32 {
      | 0 => Tick(1),
      | n => Tick(n),
    }
  }

  /// Read the current tick from a clock
  pub fn now<C: Clock>(clock: &C) -> Result<Tick, ClockError> {
    let now = clock.try_now().map_err(|e| {
                                log::warn!("clock failed: {:?}", e);
                                ClockError
                              })?;
    let ms = Millis::try_from(now.duration_since_epoch()).map_err(|e| {
                                                            log::warn!("clock reading not representable in ms: {:?}", e);
                                                            ClockError
                                                          })?;
    Ok(Tick::from_millis(ms.0))
  }

  /// `ms` milliseconds after this tick, skipping over `Tick(0)`
  ///
  /// ```
  /// use croak::time::Tick;
  ///
  /// assert_eq!(Tick(10).after(5), Tick(15));
  /// assert_eq!(Tick(u32::MAX).after(1), Tick(1));
  /// ```
  pub fn after(self, ms: u32) -> Tick {
    match self.0.wrapping_add(ms) {
      | 0 => Tick(1),
      | n => Tick(n),
    }
  }

  /// Whether `self` is strictly later than `other`, accounting for wraparound.
  ///
  /// `Tick::NOW` is never later than anything, and everything
  /// else is later than `Tick::NOW`. Otherwise `self` is later
  /// when it is less than half the timeline ahead of `other`.
  ///
  /// ```
  /// use croak::time::Tick;
  ///
  /// assert!(Tick(5).is_later_than(Tick(4)));
  /// assert!(!Tick(4).is_later_than(Tick(4)));
  /// assert!(Tick(3).is_later_than(Tick(u32::MAX - 3)));
  /// assert!(!Tick::NOW.is_later_than(Tick(7)));
  /// assert!(Tick(7).is_later_than(Tick::NOW));
  /// ```
  pub fn is_later_than(self, other: Tick) -> bool {
    match (self.0, other.0) {
      | (0, _) => false,
      | (_, 0) => true,
      | (a, b) => {
        let d = a.wrapping_sub(b);
        d != 0 && d < Self::HALF
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test::ClockMock;

  #[test]
  fn now_reads_ms() {
    let clock = ClockMock::new();
    clock.set_ms(1_500);
    assert_eq!(Tick::now(&clock), Ok(Tick(1_500)));

    clock.set_ms(0);
    assert_eq!(Tick::now(&clock), Ok(Tick(1)));
  }

  #[test]
  fn ordering_across_wrap() {
    let before_wrap = Tick(u32::MAX - 10);
    let after_wrap = before_wrap.after(20);

    assert_eq!(after_wrap, Tick(9));
    assert!(after_wrap.is_later_than(before_wrap));
    assert!(!before_wrap.is_later_than(after_wrap));
  }

  #[test]
  fn antisymmetric() {
    for (a, b) in [(1u32, 2u32), (7, 1 << 31), (u32::MAX, 1), (1 << 30, (1 << 30) + 5)] {
      let (a, b) = (Tick(a), Tick(b));
      assert!(a.is_later_than(b) != b.is_later_than(a) || a == b,
              "{:?} {:?}",
              a,
              b);
    }
  }
}
