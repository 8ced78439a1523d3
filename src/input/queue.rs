// InputQueue - bounded funnel between input submission and frame steps
//
// Pointer-move events can arrive many times per frame. Consecutive batches
// of a continuous kind with the same pointer count are coalesced so the
// queue holds at most one pending move per gesture phase. Discrete events
// (down, up, cancel) are never merged.

use std::collections::VecDeque;

use super::InputEvent;

/// Result of queueing one input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Appended as a new entry
    Queued,
    /// Replaced the previous entry of the same continuous kind
    Coalesced,
    /// Queue was full; the oldest entry was discarded to make room
    DroppedOldest,
}

/// Bounded FIFO of pending input events
#[derive(Debug)]
pub struct InputQueue {
    events: VecDeque<InputEvent>,
    capacity: usize,
}

impl InputQueue {
    /// Create a queue holding at most `capacity` events (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: InputEvent) -> PushOutcome {
        if let Some(last) = self.events.back_mut() {
            if last.kind == event.kind
                && event.kind.is_continuous()
                && last.batch.len() == event.batch.len()
            {
                *last = event;
                return PushOutcome::Coalesced;
            }
        }

        let outcome = if self.events.len() == self.capacity {
            self.events.pop_front();
            PushOutcome::DroppedOldest
        } else {
            PushOutcome::Queued
        };
        self.events.push_back(event);
        outcome
    }

    /// Remove and return all pending events in arrival order
    pub fn drain(&mut self) -> std::collections::vec_deque::Drain<'_, InputEvent> {
        self.events.drain(..)
    }

    /// Discard all pending events, returning how many were discarded
    pub fn clear(&mut self) -> usize {
        let count = self.events.len();
        self.events.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputKind, PointerBatch};

    fn event(kind: InputKind, x: f32) -> InputEvent {
        InputEvent::new(kind, PointerBatch::single(x, 0.0))
    }

    #[test]
    fn moves_with_same_pointer_count_coalesce() {
        let mut queue = InputQueue::new(8);
        assert_eq!(queue.push(event(InputKind::Move, 1.0)), PushOutcome::Queued);
        assert_eq!(
            queue.push(event(InputKind::Move, 2.0)),
            PushOutcome::Coalesced
        );
        assert_eq!(queue.len(), 1);

        let drained: Vec<_> = queue.drain().collect();
        assert_eq!(drained[0].batch.points()[0].x, 2.0);
        assert!(queue.is_empty());
    }

    #[test]
    fn discrete_events_are_kept() {
        let mut queue = InputQueue::new(8);
        queue.push(event(InputKind::Down, 1.0));
        queue.push(event(InputKind::Down, 2.0));
        queue.push(event(InputKind::Up, 2.0));
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn pointer_count_change_breaks_coalescing() {
        let mut queue = InputQueue::new(8);
        queue.push(event(InputKind::Touch, 1.0));
        let two = PointerBatch::from_parallel(&[1.0, 2.0], &[0.0, 0.0]).unwrap();
        assert_eq!(
            queue.push(InputEvent::new(InputKind::Touch, two)),
            PushOutcome::Queued
        );
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn full_queue_drops_oldest() {
        let mut queue = InputQueue::new(2);
        queue.push(event(InputKind::Down, 1.0));
        queue.push(event(InputKind::Up, 1.0));
        assert_eq!(
            queue.push(event(InputKind::Down, 3.0)),
            PushOutcome::DroppedOldest
        );

        let kinds: Vec<_> = queue.drain().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![InputKind::Up, InputKind::Down]);
    }

    #[test]
    fn clear_reports_discarded_count() {
        let mut queue = InputQueue::new(4);
        queue.push(event(InputKind::Down, 1.0));
        queue.push(event(InputKind::Up, 1.0));
        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
    }
}
