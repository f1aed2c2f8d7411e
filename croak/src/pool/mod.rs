use croak_msg::{Body, BodyRef, Header};
use std_alloc::vec;
use std_alloc::vec::Vec;

use crate::config::{PoolConfig, CLASS_COUNT};
use crate::envelope::{BlockIx, Envelope, EnvelopeIx, Msg};
use crate::queue::{Queue, QueueId, QUEUE_COUNT};

mod stats;
pub use stats::*;

/// Errors encounterable while getting or resizing storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
  /// Every envelope is in use
  EnvelopesExhausted,
  /// Some classes are large enough, but none of them has a free block
  ClassUnavailable {
    /// bytes requested
    min: usize,
  },
  /// No class is large enough
  Oversized {
    /// bytes requested
    min: usize,
  },
  /// The message has no attached block
  Detached,
}

/// Ownership of a data block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
  /// Linked into its class's free list
  Free { next: Option<BlockIx> },
  /// Owned by an envelope
  Attached(EnvelopeIx),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Block {
  pub(crate) offset: usize,
  pub(crate) capacity: usize,
  pub(crate) class: usize,
  pub(crate) len: usize,
  pub(crate) slot: Slot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Class {
  pub(crate) capacity: usize,
  pub(crate) total: u16,
  pub(crate) free: u16,
  pub(crate) head: Option<BlockIx>,
  pub(crate) min_free: u16,
  pub(crate) exhausted: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Counters {
  pub(crate) envelopes_exhausted: u32,
  pub(crate) class_unavailable: u32,
  pub(crate) oversized: u32,
  pub(crate) leaks: u32,
}

/// Every envelope and data block croak will ever use,
/// allocated once by [`Pool::new`].
///
/// Envelopes cycle between the [`QueueId::Free`] queue and one
/// traffic queue (or a [`Msg`] handle while being worked on).
/// Blocks cycle between their class's free list and an envelope.
#[derive(Debug)]
pub struct Pool {
  arena: Vec<u8>,
  pub(crate) blocks: Vec<Block>,
  pub(crate) classes: [Class; CLASS_COUNT],
  pub(crate) envelopes: Vec<Envelope>,
  pub(crate) queues: [Queue; QUEUE_COUNT],
  pub(crate) counters: Counters,
  pub(crate) default_block: usize,
}

impl Pool {
  /// Carve the arena into blocks, and put every block on its
  /// class's free list and every envelope on the free queue.
  pub fn new(config: &PoolConfig) -> Self {
    let mut sizes = config.classes;
    sizes.sort_by_key(|c| c.capacity);

    let mut pool = Pool { arena: vec![0; config.arena_size()],
                          blocks: Vec::with_capacity(config.block_count()),
                          classes: Default::default(),
                          envelopes: vec![Envelope::default(); config.envelopes as usize],
                          queues: Default::default(),
                          counters: Default::default(),
                          default_block: config.default_block as usize };

    let mut offset = 0;
    for (class_ix, size) in sizes.iter().enumerate() {
      pool.classes[class_ix].capacity = size.capacity as usize;
      pool.classes[class_ix].total = size.blocks;

      for _ in 0..size.blocks {
        let ix = BlockIx(pool.blocks.len() as u16);
        pool.blocks.push(Block { offset,
                                 capacity: size.capacity as usize,
                                 class: class_ix,
                                 len: 0,
                                 slot: Slot::Attached(EnvelopeIx(0)) });
        pool.push_free_block(ix);
        offset += size.capacity as usize;
      }

      pool.classes[class_ix].min_free = size.blocks;
    }

    (0..config.envelopes).for_each(|ix| pool.link_tail(QueueId::Free, EnvelopeIx(ix)));

    log::debug!("pool: {} bytes in {} blocks, {} envelopes",
                pool.arena.len(),
                pool.blocks.len(),
                pool.envelopes.len());
    pool
  }

  fn push_free_block(&mut self, ix: BlockIx) {
    let block = &mut self.blocks[ix.0 as usize];
    let class = &mut self.classes[block.class];

    self.arena[block.offset..block.offset + block.capacity].fill(0);
    block.len = 0;
    block.slot = Slot::Free { next: class.head };
    class.head = Some(ix);
    class.free += 1;
  }

  fn pop_free_block(&mut self, class_ix: usize) -> Option<BlockIx> {
    let class = &mut self.classes[class_ix];
    let ix = class.head?;

    match self.blocks[ix.0 as usize].slot {
      | Slot::Free { next } => {
        class.head = next;
        class.free -= 1;
        class.min_free = class.min_free.min(class.free);
        Some(ix)
      },
      | Slot::Attached(owner) => {
        log::error!("free list of class {} points at block {:?} owned by {:?}; dropping the list",
                    class_ix,
                    ix,
                    owner);
        class.head = None;
        class.free = 0;
        class.min_free = 0;
        self.counters.leaks += 1;
        None
      },
    }
  }

  fn attach(&mut self, block: BlockIx, env: EnvelopeIx) {
    self.blocks[block.0 as usize].slot = Slot::Attached(env);
    self.envelopes[env.0 as usize].block = Some(block);
  }

  /// Smallest class that fits `min` bytes and has a free block,
  /// counting each adequate class passed over for being empty.
  fn pick_class(&mut self, min: usize) -> Result<usize, PoolError> {
    let mut adequate = false;

    for (ix, class) in self.classes.iter_mut().enumerate() {
      if class.capacity < min {
        continue;
      }

      adequate = true;
      if class.free > 0 {
        return Ok(ix);
      }

      class.exhausted += 1;
    }

    if adequate {
      self.counters.class_unavailable += 1;
      Err(PoolError::ClassUnavailable { min })
    } else {
      self.counters.oversized += 1;
      Err(PoolError::Oversized { min })
    }
  }

  /// Take a free envelope and attach a zeroed block of at least `min` bytes.
  ///
  /// The block comes from the smallest class that fits `min` and
  /// has a free block; every adequate class passed over because
  /// it was empty has its exhaustion count bumped.
  ///
  /// ```
  /// use croak::config::PoolConfig;
  /// use croak::pool::{Pool, PoolError};
  ///
  /// let mut pool = Pool::new(&PoolConfig::default());
  /// let msg = pool.get(100).unwrap();
  /// assert_eq!(pool.capacity(&msg), 128);
  ///
  /// assert_eq!(pool.get(4096).unwrap_err(), PoolError::Oversized { min: 4096 });
  /// pool.release(msg);
  /// ```
  pub fn get(&mut self, min: usize) -> Result<Msg, PoolError> {
    let env = match self.queues[QueueId::Free.ix()].head {
      | Some(env) => env,
      | None => {
        self.counters.envelopes_exhausted += 1;
        log::warn!("pool: out of envelopes");
        return Err(PoolError::EnvelopesExhausted);
      },
    };

    let class = self.pick_class(min).map_err(|e| {
                                      log::warn!("pool: no block for {} bytes: {:?}", min, e);
                                      e
                                    })?;
    let block = self.pop_free_block(class)
                    .ok_or(PoolError::ClassUnavailable { min })?;

    self.unlink(env);
    self.envelopes[env.0 as usize].clear();
    self.attach(block, env);

    Ok(Msg(env))
  }

  /// Return a message's block to its free list and its envelope to the free queue.
  ///
  /// A block that isn't attached to this envelope is
  /// logged as a leak and left alone.
  pub fn release(&mut self, msg: Msg) {
    let env = msg.0;

    if let Some(block) = self.envelopes[env.0 as usize].block {
      match self.blocks[block.0 as usize].slot {
        | Slot::Attached(owner) if owner == env => self.push_free_block(block),
        | slot => {
          log::error!("pool: leaked block {:?}; envelope {:?} points at it but it is {:?}",
                      block,
                      env,
                      slot);
          self.counters.leaks += 1;
        },
      }
    }

    self.envelopes[env.0 as usize].clear();
    self.link_tail(QueueId::Free, env);
  }

  /// Make sure the message's block holds at least `min` bytes.
  ///
  /// A no-op when the attached block is big enough and no
  /// smaller class that fits `min` has a free block. Otherwise
  /// the content (truncated to the new capacity) moves to the
  /// best fitting free block and the old block is released.
  ///
  /// Growth fails when no class that fits `min` has a free block,
  /// leaving the message as it was.
  pub fn resize(&mut self, msg: &Msg, min: usize) -> Result<(), PoolError> {
    let old = self.envelopes[msg.0 .0 as usize].block
                  .ok_or(PoolError::Detached)?;
    let current = self.blocks[old.0 as usize];

    let best = self.classes
                   .iter()
                   .position(|c| c.capacity >= min && c.free > 0);

    let target = match best {
      | Some(class) if class < current.class => class,
      | _ if current.capacity >= min => return Ok(()),
      | Some(class) => class,
      | None if self.classes.iter().any(|c| c.capacity >= min) => {
        return Err(PoolError::ClassUnavailable { min })
      },
      | None => return Err(PoolError::Oversized { min }),
    };

    let new = self.pop_free_block(target)
                  .ok_or(PoolError::ClassUnavailable { min })?;
    let dst = self.blocks[new.0 as usize];
    let len = current.len.min(dst.capacity);

    self.arena
        .copy_within(current.offset..current.offset + len, dst.offset);
    self.blocks[new.0 as usize].len = len;
    self.attach(new, msg.0);
    self.push_free_block(old);

    Ok(())
  }

  /// Borrow an envelope
  pub fn envelope(&self, msg: &Msg) -> &Envelope {
    &self.envelopes[msg.0 .0 as usize]
  }

  /// Mutably borrow an envelope
  pub fn envelope_mut(&mut self, msg: &Msg) -> &mut Envelope {
    &mut self.envelopes[msg.0 .0 as usize]
  }

  /// Shorthand for `envelope(msg).header`
  pub fn header(&self, msg: &Msg) -> Header {
    self.envelope(msg).header
  }

  /// Capacity of the attached block (0 if there is none)
  pub fn capacity(&self, msg: &Msg) -> usize {
    self.envelope(msg)
        .block
        .map(|b| self.blocks[b.0 as usize].capacity)
        .unwrap_or(0)
  }

  /// Read the message's body (token, options, payload)
  pub fn body(&self, msg: &Msg) -> BodyRef<'_> {
    let env = self.envelope(msg);
    match env.block {
      | Some(b) => {
        let block = &self.blocks[b.0 as usize];
        BodyRef::new(&self.arena[block.offset..block.offset + block.len],
                     env.header.tkl)
      },
      | None => BodyRef::new(&[], env.header.tkl),
    }
  }

  /// Edit the message's body in place
  pub fn body_mut(&mut self, msg: &Msg) -> Result<Body<'_>, PoolError> {
    let env = &self.envelopes[msg.0 .0 as usize];
    let tkl = env.header.tkl;
    let b = env.block.ok_or(PoolError::Detached)?;

    let block = &mut self.blocks[b.0 as usize];
    let buf = &mut self.arena[block.offset..block.offset + block.capacity];
    Ok(Body::new(buf, &mut block.len, tkl))
  }

  /// Copy bytes into a message's block, replacing its body.
  ///
  /// Bytes past the block's capacity are dropped; returns the number copied.
  pub fn fill(&mut self, msg: &Msg, bytes: &[u8]) -> Result<usize, PoolError> {
    let b = self.envelope(msg).block.ok_or(PoolError::Detached)?;
    let block = &mut self.blocks[b.0 as usize];
    let n = bytes.len().min(block.capacity);

    self.arena[block.offset..block.offset + n].copy_from_slice(&bytes[..n]);
    block.len = n;
    Ok(n)
  }
}
