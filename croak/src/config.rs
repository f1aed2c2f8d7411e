use embedded_time::duration::Milliseconds;

use crate::time::Millis;

/// Number of block size classes in the pool
pub const CLASS_COUNT: usize = 5;

/// One block size class: `blocks` blocks of `capacity` bytes each
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SizeClass {
  /// Bytes per block
  pub capacity: u16,
  /// Number of blocks
  pub blocks: u16,
}

impl SizeClass {
  /// Create a size class
  pub const fn new(capacity: u16, blocks: u16) -> Self {
    Self { capacity, blocks }
  }
}

/// Configuration of the message pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PoolConfig {
  /// The block size classes, in ascending order of capacity.
  ///
  /// Defaults to 64×24, 128×16, 256×12, 512×8 and 1280×4 (bytes × blocks),
  /// an arena of 19,456 bytes:
  /// ```
  /// use croak::config::{PoolConfig, SizeClass};
  ///
  /// assert_eq!(PoolConfig::default().classes,
  ///            [SizeClass::new(64, 24),
  ///             SizeClass::new(128, 16),
  ///             SizeClass::new(256, 12),
  ///             SizeClass::new(512, 8),
  ///             SizeClass::new(1280, 4)]);
  /// assert_eq!(PoolConfig::default().arena_size(), 19_456);
  /// ```
  pub classes: [SizeClass; CLASS_COUNT],

  /// Number of message envelopes, the most messages that
  /// can be in flight at once.
  ///
  /// Defaults to 64, one per block.
  /// ```
  /// use croak::config::PoolConfig;
  ///
  /// assert_eq!(PoolConfig::default().envelopes, 64);
  /// ```
  pub envelopes: u16,

  /// Minimum block size requested when a message is
  /// popped straight off of the free queue.
  ///
  /// Defaults to 128 bytes.
  /// ```
  /// use croak::config::PoolConfig;
  ///
  /// assert_eq!(PoolConfig::default().default_block, 128);
  /// ```
  pub default_block: u16,
}

impl PoolConfig {
  /// Total bytes the arena needs for all classes
  pub fn arena_size(&self) -> usize {
    self.classes
        .iter()
        .map(|c| c.capacity as usize * c.blocks as usize)
        .sum()
  }

  /// Total number of blocks across all classes
  pub fn block_count(&self) -> usize {
    self.classes.iter().map(|c| c.blocks as usize).sum()
  }
}

impl Default for PoolConfig {
  fn default() -> Self {
    PoolConfig { classes: [SizeClass::new(64, 24),
                           SizeClass::new(128, 16),
                           SizeClass::new(256, 12),
                           SizeClass::new(512, 8),
                           SizeClass::new(1280, 4)],
                 envelopes: 64,
                 default_block: 128 }
  }
}

/// Configuration options related to handling messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Msg {
  /// Set the maximum amount of time we should delay
  /// our response to multicast requests.
  ///
  /// The actual delay will be random between zero
  /// and this value.
  ///
  /// Defaults to 5000 milliseconds.
  ///
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use croak::config::Msg;
  ///
  /// assert_eq!(Msg::default().multicast_response_leisure,
  ///            Milliseconds(5000u64));
  /// ```
  pub multicast_response_leisure: Millis,

  /// Seed for the random number generator that picks the
  /// first message id, tokens and multicast delays.
  ///
  /// The default value is 0, although it is
  /// best practice to set this to something else.
  /// (random integer, machine identifier)
  ///
  /// ```
  /// use croak::config::Msg;
  ///
  /// assert_eq!(Msg::default().seed, 0);
  /// ```
  pub seed: u64,

  /// Length of the tokens generated for outbound requests.
  ///
  /// Defaults to 4 bytes; values above 8 are clamped.
  /// ```
  /// use croak::config::Msg;
  ///
  /// assert_eq!(Msg::default().token_len, 4);
  /// ```
  pub token_len: u8,
}

impl Default for Msg {
  fn default() -> Self {
    Msg { multicast_response_leisure: Milliseconds(5000),
          seed: 0,
          token_len: 4 }
  }
}

/// Runtime config
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Config {
  /// See [`PoolConfig`]
  pub pool: PoolConfig,
  /// See [`Msg`]
  pub msg: Msg,
}
