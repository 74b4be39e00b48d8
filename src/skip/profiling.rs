//! Profiling counters for understanding the asymptotic behaviour of a set.
//!
//! The counters never influence behaviour. Tests read them to check that
//! search cost grows logarithmically and that every node is released.

use std::cell::Cell;

/// A snapshot of the counters of one set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Profiling {
    /// Physical nodes currently alive.
    pub nodes: usize,
    /// Event-chain steps and path compressions.
    pub overhead: usize,
    /// Splice steps performed by insertions.
    pub insertion: usize,
    /// Search steps performed while localizing insertion points.
    pub localization: usize,
}

impl Profiling {
    /// One-line human readable summary.
    pub fn report(&self) -> String {
        return format!(
            "nodes: {}, overhead: {}, insertion: {}, localization: {}",
            self.nodes, self.overhead, self.insertion, self.localization
        );
    }
}

/// Live counters shared between a set and each of its nodes.
///
/// Nodes keep a handle so that releasing the last node is observable even
/// after the owning set is gone.
#[derive(Debug, Default)]
pub struct Counters {
    nodes: Cell<usize>,
    overhead: Cell<usize>,
    insertion: Cell<usize>,
    localization: Cell<usize>,
}

impl Counters {
    pub fn new() -> Counters {
        return Counters::default();
    }

    #[inline]
    pub(crate) fn node_created(&self) {
        self.nodes.set(self.nodes.get() + 1);
    }

    #[inline]
    pub(crate) fn node_released(&self) {
        self.nodes.set(self.nodes.get() - 1);
    }

    #[inline]
    pub(crate) fn overhead(&self) {
        self.overhead.set(self.overhead.get() + 1);
    }

    #[inline]
    pub(crate) fn insertion(&self) {
        self.insertion.set(self.insertion.get() + 1);
    }

    #[inline]
    pub(crate) fn localization(&self) {
        self.localization.set(self.localization.get() + 1);
    }

    /// Number of nodes alive right now.
    pub fn nodes(&self) -> usize {
        return self.nodes.get();
    }

    pub fn snapshot(&self) -> Profiling {
        return Profiling {
            nodes: self.nodes.get(),
            overhead: self.overhead.get(),
            insertion: self.insertion.get(),
            localization: self.localization.get(),
        };
    }
}
