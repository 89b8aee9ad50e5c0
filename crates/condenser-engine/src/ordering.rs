//! In-order delivery of batched frame results.

use std::collections::BTreeMap;

use crate::error::{EngineError, EngineResult};

/// Reorders results tagged with a processing sequence number.
///
/// Items may be pushed in any order; `pop_ready` yields them strictly by
/// sequence, starting at 0, with no gaps. A bounded buffer fails as soon as
/// more than `max_pending` items wait behind a gap.
#[derive(Debug)]
pub struct OrderedFrames<T> {
    next: u64,
    pending: BTreeMap<u64, T>,
    max_pending: Option<usize>,
}

impl<T> Default for OrderedFrames<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OrderedFrames<T> {
    pub fn new() -> Self {
        Self {
            next: 0,
            pending: BTreeMap::new(),
            max_pending: None,
        }
    }

    /// Buffer that holds at most `max_pending` items behind a gap.
    pub fn bounded(max_pending: usize) -> Self {
        Self {
            max_pending: Some(max_pending),
            ..Self::new()
        }
    }

    /// Buffer an item. Fails on a sequence number already released or pending.
    pub fn push(&mut self, sequence: u64, item: T) -> EngineResult<()> {
        if sequence < self.next || self.pending.contains_key(&sequence) {
            return Err(EngineError::FrameOutOfOrder {
                sequence,
                expected: self.next,
            });
        }
        if let Some(limit) = self.max_pending {
            if sequence != self.next && self.pending.len() >= limit {
                return Err(EngineError::MissingFrames {
                    expected: self.next,
                    pending: self.pending.len() + 1,
                });
            }
        }
        self.pending.insert(sequence, item);
        Ok(())
    }

    /// Release the next item if it has arrived.
    pub fn pop_ready(&mut self) -> Option<T> {
        let item = self.pending.remove(&self.next)?;
        self.next += 1;
        Some(item)
    }

    /// Release every contiguous item that has arrived.
    pub fn drain_ready(&mut self) -> Vec<T> {
        std::iter::from_fn(|| self.pop_ready()).collect()
    }

    /// Sequence number expected next.
    pub fn next_sequence(&self) -> u64 {
        self.next
    }

    /// Items buffered behind a gap.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Confirm nothing is stranded behind a gap.
    pub fn finish(&self) -> EngineResult<()> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(EngineError::MissingFrames {
                expected: self.next,
                pending: self.pending.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_releases_in_sequence() {
        let mut frames = OrderedFrames::new();
        frames.push(2, "c").unwrap();
        frames.push(0, "a").unwrap();
        assert_eq!(frames.drain_ready(), vec!["a"]);
        assert_eq!(frames.pending(), 1);

        frames.push(1, "b").unwrap();
        assert_eq!(frames.drain_ready(), vec!["b", "c"]);
        assert_eq!(frames.next_sequence(), 3);
        assert!(frames.finish().is_ok());
    }

    #[test]
    fn test_rejects_duplicates_and_released() {
        let mut frames = OrderedFrames::new();
        frames.push(0, 1).unwrap();
        frames.push(3, 4).unwrap();
        assert!(matches!(
            frames.push(3, 9),
            Err(EngineError::FrameOutOfOrder { sequence: 3, .. })
        ));
        assert_eq!(frames.pop_ready(), Some(1));
        assert!(matches!(
            frames.push(0, 1),
            Err(EngineError::FrameOutOfOrder {
                sequence: 0,
                expected: 1
            })
        ));
    }

    #[test]
    fn test_gap_reported_on_finish() {
        let mut frames = OrderedFrames::new();
        frames.push(1, ()).unwrap();
        frames.push(2, ()).unwrap();
        assert!(frames.drain_ready().is_empty());
        assert!(matches!(
            frames.finish(),
            Err(EngineError::MissingFrames {
                expected: 0,
                pending: 2
            })
        ));
    }

    #[test]
    fn test_bounded_buffer_fails_early_on_gap() {
        let mut frames = OrderedFrames::bounded(2);
        frames.push(1, ()).unwrap();
        frames.push(2, ()).unwrap();
        assert!(matches!(
            frames.push(3, ()),
            Err(EngineError::MissingFrames {
                expected: 0,
                pending: 3
            })
        ));
    }

    #[test]
    fn test_bounded_buffer_accepts_the_missing_frame() {
        let mut frames = OrderedFrames::bounded(2);
        frames.push(2, 'c').unwrap();
        frames.push(1, 'b').unwrap();
        frames.push(0, 'a').unwrap();
        assert_eq!(frames.drain_ready(), vec!['a', 'b', 'c']);
    }
}
