//! Sink identifiers and sink selections.
//!
//! A `SinkId` names exactly one registered sink; a `SinkSelection` is an
//! ordered subset of sinks an event should be routed to. Iteration order over
//! a selection is ascending by id, which is also the dispatch order contract.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::num::NonZeroU8;

/// Identifier for a single registered sink. Zero is reserved and refused at
/// construction, so a `SinkId` always names a real registry slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SinkId(NonZeroU8);

impl SinkId {
    /// Creates a sink id.
    ///
    /// # Panics
    ///
    /// Panics if `id` is zero. Passing zero is a wiring bug, not a runtime
    /// condition, so it fails fast.
    pub const fn new(id: u8) -> Self {
        match NonZeroU8::new(id) {
            Some(id) => Self(id),
            None => panic!("sink id must be non-zero"),
        }
    }

    pub const fn get(self) -> u8 {
        self.0.get()
    }
}

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ordered set of sinks. The empty selection is meaningful on an event: it
/// tells the router to consult its resolver instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkSelection(BTreeSet<SinkId>);

impl SinkSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selection containing a single sink.
    pub fn only(id: SinkId) -> Self {
        Self(BTreeSet::from([id]))
    }

    pub fn insert(&mut self, id: SinkId) -> bool {
        self.0.insert(id)
    }

    pub fn contains(&self, id: SinkId) -> bool {
        self.0.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates sink ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = SinkId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<SinkId> for SinkSelection {
    fn from_iter<I: IntoIterator<Item = SinkId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<SinkId> for SinkSelection {
    fn extend<I: IntoIterator<Item = SinkId>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl fmt::Display for SinkSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, id) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{id}")?;
        }
        write!(f, "}}")
    }
}
