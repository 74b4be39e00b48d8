//! Naive reference model of a time-indexed ordered set.
//!
//! `NaiveSet` keeps every accepted interval in a flat list and answers each
//! query by filtering it. It is obviously correct and far too slow for real
//! use, which makes it a good oracle for conformance tests.
//!
//! ```
//! use oracle::NaiveSet;
//!
//! let mut set = NaiveSet::new();
//! set.insert(10, 0, 5).unwrap();
//! set.insert(20, 2, 8).unwrap();
//! assert_eq!(set.slice(3), vec![10, 20]);
//! assert_eq!(set.breakpoints(), vec![0, 2, 5, 8]);
//! ```

/// The value is already alive during part of the requested interval.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("value is already active during part of the interval")]
pub struct Overlap;

#[derive(Debug, Clone)]
pub struct NaiveSet<D, T> {
    intervals: Vec<(D, T, T)>,
}

impl<D: Ord + Clone, T: Ord + Copy> Default for NaiveSet<D, T> {
    fn default() -> Self {
        return Self::new();
    }
}

impl<D: Ord + Clone, T: Ord + Copy> NaiveSet<D, T> {
    pub fn new() -> Self {
        return NaiveSet {
            intervals: Vec::new(),
        };
    }

    /// Would `[start, end)` for `value` collide with an accepted interval?
    pub fn clashes(&self, value: &D, start: T, end: T) -> bool {
        if start >= end {
            return false;
        }
        return self
            .intervals
            .iter()
            .any(|(v, s, e)| v == value && *s < end && start < *e);
    }

    /// Accept `[start, end)` for `value`. Empty intervals are ignored.
    pub fn insert(&mut self, value: D, start: T, end: T) -> Result<(), Overlap> {
        if self.clashes(&value, start, end) {
            return Err(Overlap);
        }
        if start < end {
            self.intervals.push((value, start, end));
        }
        return Ok(());
    }

    pub fn len(&self) -> usize {
        return self.intervals.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.intervals.is_empty();
    }

    /// The sorted values alive at `t`.
    pub fn slice(&self, t: T) -> Vec<D> {
        let mut out: Vec<D> = self
            .intervals
            .iter()
            .filter(|(_, s, e)| *s <= t && t < *e)
            .map(|(v, _, _)| v.clone())
            .collect();
        out.sort();
        return out;
    }

    /// The smallest value alive at `t` not less than `value`.
    pub fn lower_bound(&self, value: &D, t: T) -> Option<D> {
        return self
            .intervals
            .iter()
            .filter(|(v, s, e)| v >= value && *s <= t && t < *e)
            .map(|(v, _, _)| v.clone())
            .min();
    }

    /// Every time at which some answer can change, ascending.
    pub fn breakpoints(&self) -> Vec<T> {
        let mut times: Vec<T> = self
            .intervals
            .iter()
            .flat_map(|(_, s, e)| [*s, *e])
            .collect();
        times.sort();
        times.dedup();
        return times;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacent_intervals_do_not_clash() {
        let mut set = NaiveSet::new();
        set.insert(1, 0, 10).unwrap();
        set.insert(1, 10, 20).unwrap();
        assert_eq!(set.insert(1, 5, 15), Err(Overlap));
        assert_eq!(set.slice(9), vec![1]);
        assert_eq!(set.slice(10), vec![1]);
        assert_eq!(set.slice(20), Vec::<i32>::new());
    }

    #[test]
    fn lower_bound_skips_dead_values() {
        let mut set = NaiveSet::new();
        set.insert(5, 0, 2).unwrap();
        set.insert(8, 0, 9).unwrap();
        assert_eq!(set.lower_bound(&4, 1), Some(5));
        assert_eq!(set.lower_bound(&4, 3), Some(8));
        assert_eq!(set.lower_bound(&9, 3), None);
    }

    #[test]
    fn empty_interval_is_ignored() {
        let mut set: NaiveSet<u8, u8> = NaiveSet::new();
        set.insert(3, 4, 4).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn overlap_is_a_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(Overlap);
        assert_eq!(
            err.to_string(),
            "value is already active during part of the interval"
        );
    }
}
