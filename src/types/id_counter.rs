//! Type-safe counter for generating arena ids.
//!
//! Every arena in the crate (declarations, types, units, files) numbers its
//! slots from 1 so that ids can be stored as `NonZeroU32`-backed newtypes and
//! an id of 0 never denotes a live node.

use std::marker::PhantomData;
use std::num::NonZeroU32;

use super::ArenaId;

/// Type-safe counter for generating unique arena ids.
///
/// This type ensures that:
/// - Ids start at 1 (never 0)
/// - Ids are generated sequentially, so `id.index()` is a dense slot number
/// - A counter for one id kind cannot hand out ids of another kind
#[derive(Debug)]
pub struct IdCounter<I> {
    next_id: NonZeroU32,
    _kind: PhantomData<I>,
}

impl<I: ArenaId> IdCounter<I> {
    /// Creates a new counter starting at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: NonZeroU32::MIN,
            _kind: PhantomData,
        }
    }

    /// Creates a counter that continues after `count` already issued ids.
    pub fn after(count: usize) -> Self {
        let mut counter = Self::new();
        let count = u32::try_from(count).expect("arena exceeds u32::MAX slots");
        counter.next_id = NonZeroU32::MIN.saturating_add(count);
        counter
    }

    /// Generates the next id and increments the counter.
    ///
    /// # Panics
    /// Panics if the counter would overflow (after 4 billion nodes).
    pub fn next_id(&mut self) -> I {
        let current = self.next_id;
        self.next_id = current
            .checked_add(1)
            .expect("id counter overflow - more than 4 billion nodes in one arena");
        I::from_raw(current)
    }

    /// Returns the number of ids generated so far.
    #[must_use]
    pub fn current_count(&self) -> u32 {
        self.next_id.get() - 1
    }
}

impl<I: ArenaId> Default for IdCounter<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> Clone for IdCounter<I> {
    fn clone(&self) -> Self {
        Self {
            next_id: self.next_id,
            _kind: PhantomData,
        }
    }
}
