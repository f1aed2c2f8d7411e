use croak_msg::{Id, Type};
use no_std_net::SocketAddr;

use crate::envelope::{EnvelopeIx, Msg};
use crate::pool::Pool;
use crate::time::Tick;

/// Number of queues
pub const QUEUE_COUNT: usize = 5;

/// The queues an envelope can be linked into
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueueId {
  /// Unused envelopes
  Free,
  /// Received over UDP, waiting to be dispatched
  UdpRecv,
  /// Waiting to be sent over UDP
  UdpXmit,
  /// Received over TCP, waiting to be dispatched
  TcpRecv,
  /// Waiting to be sent over TCP
  TcpXmit,
}

impl QueueId {
  /// Every queue, in index order
  pub const ALL: [QueueId; QUEUE_COUNT] = [QueueId::Free,
                                           QueueId::UdpRecv,
                                           QueueId::UdpXmit,
                                           QueueId::TcpRecv,
                                           QueueId::TcpXmit];

  /// Index of this queue in [`QueueId::ALL`]
  pub fn ix(&self) -> usize {
    match self {
      | QueueId::Free => 0,
      | QueueId::UdpRecv => 1,
      | QueueId::UdpXmit => 2,
      | QueueId::TcpRecv => 3,
      | QueueId::TcpXmit => 4,
    }
  }
}

/// Head, tail and length of one doubly linked queue of envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Queue {
  pub(crate) head: Option<EnvelopeIx>,
  pub(crate) tail: Option<EnvelopeIx>,
  pub(crate) len: usize,
}

impl Pool {
  fn next_of(&self, ix: EnvelopeIx) -> Option<EnvelopeIx> {
    self.envelopes[ix.0 as usize].next
  }

  fn prev_of(&self, ix: EnvelopeIx) -> Option<EnvelopeIx> {
    self.envelopes[ix.0 as usize].prev
  }

  fn due_of(&self, ix: EnvelopeIx) -> Tick {
    self.envelopes[ix.0 as usize].send.next
  }

  /// Link `ix` into `queue` right after `after`, or at the head when `after` is `None`
  fn link_after(&mut self, queue: QueueId, after: Option<EnvelopeIx>, ix: EnvelopeIx) {
    let next = match after {
      | Some(a) => self.next_of(a),
      | None => self.queues[queue.ix()].head,
    };

    {
      let env = &mut self.envelopes[ix.0 as usize];
      env.prev = after;
      env.next = next;
      env.queue = Some(queue);
    }

    match after {
      | Some(a) => self.envelopes[a.0 as usize].next = Some(ix),
      | None => self.queues[queue.ix()].head = Some(ix),
    }

    match next {
      | Some(n) => self.envelopes[n.0 as usize].prev = Some(ix),
      | None => self.queues[queue.ix()].tail = Some(ix),
    }

    self.queues[queue.ix()].len += 1;
  }

  pub(crate) fn link_tail(&mut self, queue: QueueId, ix: EnvelopeIx) {
    let tail = self.queues[queue.ix()].tail;
    self.link_after(queue, tail, ix);
  }

  /// Unlink an envelope from whatever queue it is in
  pub(crate) fn unlink(&mut self, ix: EnvelopeIx) {
    let (queue, prev, next) = {
      let env = &self.envelopes[ix.0 as usize];
      match env.queue {
        | Some(q) => (q, env.prev, env.next),
        | None => return,
      }
    };

    match prev {
      | Some(p) => self.envelopes[p.0 as usize].next = next,
      | None => self.queues[queue.ix()].head = next,
    }

    match next {
      | Some(n) => self.envelopes[n.0 as usize].prev = prev,
      | None => self.queues[queue.ix()].tail = prev,
    }

    let env = &mut self.envelopes[ix.0 as usize];
    env.prev = None;
    env.next = None;
    env.queue = None;
    self.queues[queue.ix()].len -= 1;
  }

  /// Number of envelopes in a queue
  pub fn len(&self, queue: QueueId) -> usize {
    self.queues[queue.ix()].len
  }

  /// Whether a queue is empty
  pub fn is_empty(&self, queue: QueueId) -> bool {
    self.len(queue) == 0
  }

  /// When the head of a queue is due
  pub fn next_due(&self, queue: QueueId) -> Option<Tick> {
    self.queues[queue.ix()].head.map(|h| self.due_of(h))
  }

  /// Queue a message to be due at `due`.
  ///
  /// Searches back from the tail for the last entry not due later
  /// than `due` and inserts after it, so entries due at the same
  /// time stay in insertion order. Resets the send state:
  /// `attempts` is recorded, `initial` cleared and `next = due`.
  ///
  /// Adding to [`QueueId::Free`] releases the message.
  pub fn add_at(&mut self, due: Tick, queue: QueueId, msg: Msg, attempts: u8) {
    if queue == QueueId::Free {
      self.release(msg);
      return;
    }

    let ix = msg.0;
    {
      let send = &mut self.envelopes[ix.0 as usize].send;
      send.attempts = attempts;
      send.initial = None;
      send.next = due;
    }

    let mut after = self.queues[queue.ix()].tail;
    while let Some(a) = after {
      if !self.due_of(a).is_later_than(due) {
        break;
      }
      after = self.prev_of(a);
    }

    self.link_after(queue, after, ix);
  }

  /// Take the head of a queue if it is due no later than `t`.
  ///
  /// Popping from [`QueueId::Free`] is [`Pool::pop`].
  pub fn pop_before(&mut self, t: Tick, queue: QueueId) -> Option<Msg> {
    if queue == QueueId::Free {
      return self.pop(queue);
    }

    let head = self.queues[queue.ix()].head?;
    if self.due_of(head).is_later_than(t) {
      return None;
    }

    self.unlink(head);
    Some(Msg(head))
  }

  /// Take the head of a queue, whenever it is due.
  ///
  /// Popping from [`QueueId::Free`] allocates a message with the
  /// configured default block size (see [`Pool::get`]).
  pub fn pop(&mut self, queue: QueueId) -> Option<Msg> {
    if queue == QueueId::Free {
      return self.get(self.default_block).ok();
    }

    let head = self.queues[queue.ix()].head?;
    self.unlink(head);
    Some(Msg(head))
  }

  /// Release every message in a queue.
  ///
  /// Drains everything due by [`Tick::MAX`], then everything due by
  /// [`Tick::QUARTER`], which between them cover entries on both
  /// sides of the wrap. Anything left after that is logged and
  /// released anyway.
  pub fn release_all(&mut self, queue: QueueId) {
    if queue == QueueId::Free {
      return;
    }

    for horizon in [Tick::MAX, Tick::QUARTER] {
      while let Some(msg) = self.pop_before(horizon, queue) {
        self.release(msg);
      }
    }

    if !self.is_empty(queue) {
      log::warn!("{:?} still holds {} messages after draining; releasing them",
                 queue,
                 self.len(queue));
      while let Some(msg) = self.pop(queue) {
        self.release(msg);
      }
    }
  }

  /// Remove a queued confirmable message still waiting on a response
  /// from `remote` under message id `id`, searching from the tail.
  pub fn pop_confirmable_match(&mut self, queue: QueueId, remote: SocketAddr, id: Id) -> Option<Msg> {
    let mut cur = self.queues[queue.ix()].tail;

    while let Some(ix) = cur {
      let env = &self.envelopes[ix.0 as usize];
      if env.header.ty == Type::Con
         && env.send.response_expected
         && env.addressing.remote == remote
         && env.header.id == id
      {
        self.unlink(ix);
        return Some(Msg(ix));
      }

      cur = env.prev;
    }

    None
  }
}
