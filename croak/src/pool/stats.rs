use super::{Pool, Slot};
use crate::config::CLASS_COUNT;
use crate::queue::{QueueId, QUEUE_COUNT};

/// Usage of one size class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassStats {
  /// Bytes per block
  pub capacity: usize,
  /// Blocks in the class
  pub total: u16,
  /// Blocks currently free
  pub free: u16,
  /// Fewest blocks that have ever been free at once
  pub min_free: u16,
  /// Times an allocation that fit this class found it empty
  pub exhausted: u32,
}

/// A snapshot of the pool's counters, for capacity planning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
  /// Per size class, ascending by capacity
  pub classes: [ClassStats; CLASS_COUNT],
  /// Allocations that failed because every envelope was in use
  pub envelopes_exhausted: u32,
  /// Allocations that failed because every adequate class was empty
  pub class_unavailable: u32,
  /// Allocations larger than every class
  pub oversized: u32,
  /// Blocks found in an inconsistent state and abandoned
  pub leaks: u32,
  /// Length of each queue, indexed by [`QueueId::ix`]
  pub queues: [usize; QUEUE_COUNT],
}

/// A full walk of the pool's ownership graph.
///
/// See [`Census::is_conserved`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Census {
  /// Blocks allocated at startup
  pub blocks: usize,
  /// Blocks reachable from the class free lists
  pub blocks_free: usize,
  /// Blocks attached to an envelope that points back at them
  pub blocks_attached: usize,
  /// Envelopes allocated at startup
  pub envelopes: usize,
  /// Envelopes reachable from the free queue
  pub envelopes_free: usize,
  /// Envelopes reachable from a traffic queue
  pub envelopes_queued: usize,
  /// Envelopes held by a [`Msg`](crate::envelope::Msg) handle
  pub envelopes_out: usize,
}

impl Census {
  /// Every block is either free or attached, and every envelope is
  /// in exactly one of: the free queue, a traffic queue, a handle.
  pub fn is_conserved(&self) -> bool {
    self.blocks_free + self.blocks_attached == self.blocks
    && self.envelopes_free + self.envelopes_queued + self.envelopes_out == self.envelopes
  }
}

impl Pool {
  /// Snapshot the counters
  pub fn stats(&self) -> Stats {
    let mut stats = Stats { envelopes_exhausted: self.counters.envelopes_exhausted,
                            class_unavailable: self.counters.class_unavailable,
                            oversized: self.counters.oversized,
                            leaks: self.counters.leaks,
                            ..Default::default() };

    self.classes
        .iter()
        .zip(stats.classes.iter_mut())
        .for_each(|(class, stats)| {
          *stats = ClassStats { capacity: class.capacity,
                                total: class.total,
                                free: class.free,
                                min_free: class.min_free,
                                exhausted: class.exhausted }
        });

    QueueId::ALL.iter()
                .for_each(|q| stats.queues[q.ix()] = self.len(*q));

    stats
  }

  /// Walk every free list, queue and envelope
  pub fn census(&self) -> Census {
    let mut census = Census { blocks: self.blocks.len(),
                              envelopes: self.envelopes.len(),
                              ..Default::default() };

    for class in self.classes.iter() {
      let mut cur = class.head;
      // bounded by the block count
      for _ in 0..self.blocks.len() {
        match cur.map(|ix| self.blocks[ix.0 as usize].slot) {
          | Some(Slot::Free { next }) => {
            census.blocks_free += 1;
            cur = next;
          },
          | _ => break,
        }
      }
    }

    census.blocks_attached = self.blocks
                                 .iter()
                                 .enumerate()
                                 .filter(|(ix, b)| match b.slot {
                                   | Slot::Attached(env) => {
                                     self.envelopes[env.0 as usize].block.map(|b| b.0 as usize) == Some(*ix)
                                   },
                                   | Slot::Free { .. } => false,
                                 })
                                 .count();

    for q in QueueId::ALL {
      let mut cur = self.queues[q.ix()].head;
      for _ in 0..self.envelopes.len() {
        match cur.map(|ix| &self.envelopes[ix.0 as usize]) {
          | Some(env) if env.queue == Some(q) => {
            match q {
              | QueueId::Free => census.envelopes_free += 1,
              | _ => census.envelopes_queued += 1,
            }
            cur = env.next;
          },
          | _ => break,
        }
      }
    }

    census.envelopes_out = self.envelopes.iter().filter(|e| e.queue.is_none()).count();

    census
  }
}
