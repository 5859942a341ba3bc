//! Event bus with ordering guarantees.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::events::{Event, Timestamp};

/// Rank within a single millisecond. Operator commands land before ticks
/// stamped at the same time, so a tick never advances a trip the operator
/// already paused or reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Lane {
    Control = 0,
    Tick = 1,
}

impl Lane {
    fn of(event: &Event) -> Self {
        match event {
            Event::Control(_) => Lane::Control,
            Event::Sys(_) => Lane::Tick,
        }
    }
}

/// Heap entry; `seq` keeps insertion order within a lane.
struct QueuedEvent {
    ts: Timestamp,
    lane: Lane,
    seq: u64,
    event: Event,
}

impl QueuedEvent {
    fn key(&self) -> (Timestamp, Lane, u64) {
        (self.ts, self.lane, self.seq)
    }
}

impl PartialEq for QueuedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for QueuedEvent {}

impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reversed so the smallest key pops first
        other.key().cmp(&self.key())
    }
}

/// Deterministic event queue shared by the scheduler and `replay`.
///
/// Pops by timestamp, then lane (controls before ticks), then arrival.
pub struct EventBus {
    queue: BinaryHeap<QueuedEvent>,
    seq_counter: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            seq_counter: 0,
        }
    }

    /// Queue an event under its own timestamp.
    pub fn push(&mut self, event: Event) {
        self.seq_counter += 1;
        self.queue.push(QueuedEvent {
            ts: event.timestamp(),
            lane: Lane::of(&event),
            seq: self.seq_counter,
            event,
        });
    }

    /// Next event to reduce, if any.
    pub fn pop(&mut self) -> Option<Event> {
        self.queue.pop().map(|q| q.event)
    }

    /// Events still waiting.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
