//! Multi-pointer input types.
//!
//! The platform delivers touches as two parallel float arrays plus an integer
//! kind tag. [`PointerBatch`] turns the arrays into a single sequence of
//! pairs so that an x value can never be paired with another pointer's y.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

pub mod queue;

pub use queue::{InputQueue, PushOutcome};

/// One touch contact in surface pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pointer {
    pub x: f32,
    pub y: f32,
}

impl Pointer {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Typed view of the integer kind tag carried by every input call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// Full touch state; the stock activity sends this for every motion event
    Touch,
    Down,
    Move,
    Up,
    Cancel,
    /// Unrecognized tag, dispatched unchanged
    Other(i32),
}

impl InputKind {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => InputKind::Touch,
            2 => InputKind::Down,
            3 => InputKind::Move,
            4 => InputKind::Up,
            5 => InputKind::Cancel,
            other => InputKind::Other(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            InputKind::Touch => 1,
            InputKind::Down => 2,
            InputKind::Move => 3,
            InputKind::Up => 4,
            InputKind::Cancel => 5,
            InputKind::Other(code) => *code,
        }
    }

    /// Kinds that describe a continuous pointer state, where only the most
    /// recent batch matters.
    pub fn is_continuous(&self) -> bool {
        matches!(self, InputKind::Touch | InputKind::Move)
    }

    /// Kinds after which no pointer is considered down.
    pub fn ends_contact(&self) -> bool {
        matches!(self, InputKind::Up | InputKind::Cancel)
    }
}

/// Simultaneous touch contacts delivered by one input event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointerBatch {
    points: Vec<Pointer>,
}

impl PointerBatch {
    /// Build a batch from the parallel arrays handed over by the platform.
    ///
    /// # Errors
    /// `SessionError::PointerMismatch` when the arrays differ in length.
    pub fn from_parallel(xs: &[f32], ys: &[f32]) -> Result<Self, SessionError> {
        if xs.len() != ys.len() {
            return Err(SessionError::PointerMismatch {
                xs: xs.len(),
                ys: ys.len(),
            });
        }

        Ok(Self {
            points: xs
                .iter()
                .zip(ys)
                .map(|(&x, &y)| Pointer::new(x, y))
                .collect(),
        })
    }

    pub fn from_points(points: Vec<Pointer>) -> Self {
        Self { points }
    }

    pub fn single(x: f32, y: f32) -> Self {
        Self {
            points: vec![Pointer::new(x, y)],
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Pointer] {
        &self.points
    }

    /// Keep at most `max` pointers, returning how many were dropped.
    pub fn truncate(&mut self, max: usize) -> usize {
        let dropped = self.points.len().saturating_sub(max);
        self.points.truncate(max);
        dropped
    }
}

/// A kind tag paired with its pointer batch.
#[derive(Debug, Clone, PartialEq)]
pub struct InputEvent {
    pub kind: InputKind,
    pub batch: PointerBatch,
}

impl InputEvent {
    pub fn new(kind: InputKind, batch: PointerBatch) -> Self {
        Self { kind, batch }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_parallel_pairs_by_index() {
        let batch = PointerBatch::from_parallel(&[1.0, 2.0], &[10.0, 20.0]).unwrap();
        assert_eq!(
            batch.points(),
            &[Pointer::new(1.0, 10.0), Pointer::new(2.0, 20.0)]
        );
    }

    #[test]
    fn from_parallel_rejects_length_mismatch() {
        let err = PointerBatch::from_parallel(&[1.0, 2.0], &[10.0]).unwrap_err();
        assert_eq!(err, SessionError::PointerMismatch { xs: 2, ys: 1 });
    }

    #[test]
    fn empty_arrays_make_empty_batch() {
        let batch = PointerBatch::from_parallel(&[], &[]).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn truncate_reports_dropped_pointers() {
        let mut batch = PointerBatch::from_points(vec![Pointer::new(0.0, 0.0); 12]);
        assert_eq!(batch.truncate(10), 2);
        assert_eq!(batch.len(), 10);
        assert_eq!(batch.truncate(10), 0);
    }

    #[test]
    fn kind_codes_are_stable() {
        assert_eq!(InputKind::from_code(1), InputKind::Touch);
        assert_eq!(InputKind::from_code(5), InputKind::Cancel);
        assert_eq!(InputKind::from_code(42), InputKind::Other(42));
        assert_eq!(InputKind::Other(42).code(), 42);
        assert_eq!(InputKind::Move.code(), 3);
    }
}
