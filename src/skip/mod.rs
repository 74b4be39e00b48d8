//! A partially persistent, time-indexed ordered set.
//!
//! Values are inserted together with a half-open lifetime `[start, end)`.
//! Any point in time can then be queried for the sorted set of values alive
//! at that moment. The set is a skip list whose links are versioned in time;
//! each node holds two generations of its link in place and forks when a
//! third arrives.
//!
//! ```
//! use timeskip::PersistentSet;
//!
//! let mut set = PersistentSet::<u32, u32>::new();
//! set.insert(10, 0, 5).unwrap();
//! set.insert(20, 2, 8).unwrap();
//! assert_eq!(set.slice(3), vec![10, 20]);
//! assert_eq!(set.slice(6), vec![20]);
//! ```

mod fault;
mod graph;
mod node;
mod profiling;
mod time;

use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;

pub use fault::{ConfigError, Fault};
pub use graph::{Edge, EdgeKind};
pub use profiling::{Counters, Profiling};
pub use time::Timestamp;

use fault::{verified, verify};
use node::{instance, next_event, set_next, successor, terminate, Link, Node, NodeRef};

/// Predecessor and successor of a value on one level.
type Bracket<D, T> = (NodeRef<D, T>, Link<D, T>);

/// Tuning for a [`PersistentSet`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Probability that an insertion stops climbing after each level.
    pub settle: f64,
    /// Seed of the leveling coin.
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Config {
        return Config {
            settle: 0.9,
            seed: 0,
        };
    }
}

impl Config {
    pub fn with_seed(seed: u64) -> Config {
        return Config {
            seed,
            ..Config::default()
        };
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.settle) {
            return Err(ConfigError::Probability(self.settle));
        }
        return Ok(());
    }
}

/// A sorted set whose membership is a function of time.
///
/// Each value is a member during the intervals it was inserted with. A value
/// may be inserted several times as long as its intervals do not overlap.
/// Reads never change what later reads observe, though they do compress the
/// internal representation.
pub struct PersistentSet<D, T> {
    /// One head per level, bottom level first.
    roots: Vec<NodeRef<D, T>>,
    counters: Rc<Counters>,
    rng: StdRng,
    settle: f64,
    poisoned: bool,
}

impl<D: Ord + Clone, T: Timestamp> Default for PersistentSet<D, T> {
    fn default() -> Self {
        return Self::new();
    }
}

impl<D: Ord + Clone, T: Timestamp> PersistentSet<D, T> {
    pub fn new() -> Self {
        return Self::build(Config::default());
    }

    pub fn with_config(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        return Ok(Self::build(config));
    }

    /// Build without validation; a `settle` outside `[0, 1]` acts like the
    /// nearer bound.
    pub(crate) fn build(config: Config) -> Self {
        let counters = Rc::new(Counters::new());
        let base = Node::alloc(None, T::ORIGIN, &counters);
        return PersistentSet {
            roots: vec![base],
            counters,
            rng: StdRng::seed_from_u64(config.seed),
            settle: config.settle,
            poisoned: false,
        };
    }

    /// Number of skip-list levels materialized so far.
    pub fn levels(&self) -> usize {
        return self.roots.len();
    }

    pub fn profiling(&self) -> Profiling {
        return self.counters.snapshot();
    }

    /// A handle on the live counters that outlives the set.
    pub fn counters(&self) -> Rc<Counters> {
        return self.counters.clone();
    }

    pub fn is_poisoned(&self) -> bool {
        return self.poisoned;
    }

    /// Make `value` a member during `[start, end)`.
    ///
    /// An empty interval is accepted and ignored. `end == T::INFINITY` keeps
    /// the value forever. Any fault other than a rejected argument leaves
    /// the set poisoned.
    pub fn insert(&mut self, value: D, start: T, end: T) -> Result<(), Fault> {
        if self.poisoned {
            return Err(Fault::Poisoned);
        }
        if start > end {
            return Err(Fault::InvertedInterval);
        }
        if start == end {
            return Ok(());
        }

        // Nothing is written before the brackets are known, so an overlap
        // found here leaves the set intact.
        let path = match self.localize(&value, start) {
            Ok(path) => path,
            Err(fault) => return Err(self.poison(fault)),
        };
        let alive = path
            .iter()
            .any(|(_, succ)| matches!(succ, Some(s) if s.borrow().data.as_ref() == Some(&value)));
        if alive {
            tracing::warn!("insertion rejected: value already alive at start");
            return Err(Fault::Overlap);
        }

        if let Err(fault) = self.climb(value, start, end, path) {
            return Err(self.poison(fault));
        }
        return Ok(());
    }

    fn poison(&mut self, fault: Fault) -> Fault {
        self.poisoned = true;
        tracing::warn!(%fault, "insertion faulted; set poisoned");
        return fault;
    }

    /// The sorted values alive at `t`.
    pub fn slice(&self, t: T) -> Vec<D> {
        let mut out = Vec::new();
        let mut cur = instance(&self.roots[0], t);
        while let Some(next) = successor(&cur, t) {
            if let Some(data) = &next.borrow().data {
                out.push(data.clone());
            }
            cur = next;
        }
        return out;
    }

    /// The smallest value alive at `t` that is not less than `value`.
    ///
    /// A structure broken by an earlier fault can make the search fail; that
    /// is logged and reported as `None`.
    pub fn lower_bound(&self, value: &D, t: T) -> Option<D> {
        let path = match self.localize(value, t) {
            Ok(path) => path,
            Err(fault) => {
                tracing::warn!(%fault, poisoned = self.poisoned, "lower_bound search faulted");
                return None;
            }
        };
        let (_, succ) = path.into_iter().next()?;
        let succ = succ?;
        let data = succ.borrow().data.clone();
        return data;
    }

    pub fn contains(&self, value: &D, t: T) -> bool {
        return self.lower_bound(value, t).as_ref() == Some(value);
    }

    /// Tear the set down iteratively and report the final counters.
    ///
    /// `nodes` in the result is zero unless something leaked.
    pub fn teardown(self) -> Profiling {
        let counters = self.counters.clone();
        drop(self);
        return counters.snapshot();
    }

    /// Brackets of `value` at `t` on every level, bottom level first.
    fn localize(&self, value: &D, t: T) -> Result<SmallVec<[Bracket<D, T>; 8]>, Fault> {
        let mut path: SmallVec<[Bracket<D, T>; 8]> = SmallVec::new();
        let mut start = self.top();
        for level in (0..self.roots.len()).rev() {
            self.counters.localization();
            let (pred, succ) = self.bracket(&start, value, t, Counters::localization)?;
            if level > 0 {
                let down = pred.borrow().tower.clone();
                start = verified!(down);
            }
            path.push((pred, succ));
        }
        path.reverse();
        return Ok(path);
    }

    /// Walk one level from `start` to the last node below `value` at `t`.
    fn bracket(
        &self,
        start: &NodeRef<D, T>,
        value: &D,
        t: T,
        tally: fn(&Counters),
    ) -> Result<Bracket<D, T>, Fault> {
        let mut pred = instance(start, t);
        verify!(pred.borrow().data.as_ref() < Some(value));
        let mut succ = successor(&pred, t);
        loop {
            let step = match &succ {
                Some(s) if s.borrow().data.as_ref() < Some(value) => s.clone(),
                _ => break,
            };
            tally(&self.counters);
            pred = step;
            succ = successor(&pred, t);
        }
        if let Some(s) = &succ {
            verify!(s.borrow().data.is_some());
        }
        return Ok((pred, succ));
    }

    fn top(&self) -> NodeRef<D, T> {
        return self.roots[self.roots.len() - 1].clone();
    }

    /// Splice `value` into the bottom level and keep promoting it while the
    /// coin allows.
    fn climb(
        &mut self,
        value: D,
        start: T,
        end: T,
        path: SmallVec<[Bracket<D, T>; 8]>,
    ) -> Result<(), Fault> {
        let mut brackets = path.into_iter();
        let mut below: Link<D, T> = None;
        let mut level = 0;
        loop {
            let (bracket, fresh) = match brackets.next() {
                Some(bracket) => (bracket, false),
                None => (self.push_level(), true),
            };
            let (pred, succ) = bracket;
            let node = self.splice(level, &value, start, end, pred, succ, below.take())?;
            tracing::trace!(level, "spliced");
            if fresh || self.rng.r#gen::<f64>() < self.settle {
                return Ok(());
            }
            below = Some(node);
            level += 1;
        }
    }

    fn push_level(&mut self) -> Bracket<D, T> {
        let head = Node::alloc(None, T::ORIGIN, &self.counters);
        head.borrow_mut().tower = Some(self.top());
        self.roots.push(head.clone());
        tracing::debug!(levels = self.roots.len(), "new level");
        return (head, None);
    }

    /// Thread a new node for `value` through one level for `[start, end)`.
    ///
    /// The predecessor can change during the interval, so the walk follows
    /// every scheduled change of the current predecessor and links the new
    /// node again after each one.
    #[allow(clippy::too_many_arguments)]
    fn splice(
        &self,
        level: usize,
        value: &D,
        start: T,
        end: T,
        mut pred: NodeRef<D, T>,
        mut succ: Link<D, T>,
        below: Link<D, T>,
    ) -> Result<NodeRef<D, T>, Fault> {
        let node = Node::alloc(Some(value.clone()), start, &self.counters);
        node.borrow_mut().tower = below;

        let mut t = start;
        loop {
            self.counters.insertion();
            set_next(&node, t, succ.clone())?;
            set_next(&pred, t, Some(instance(&node, t)))?;

            let change = next_event(&pred, t);
            if change.is_infinite() || change > end {
                break;
            }
            let (p, s) = self.relocate(level, &pred, value, change)?;
            pred = p;
            succ = s;
            if change == end {
                // A successor equal to `value` starting exactly at `end` is
                // an adjacent interval.
                break;
            }
            if let Some(s) = &succ {
                if s.borrow().data.as_ref() == Some(value) {
                    return Err(Fault::Overlap);
                }
            }
            t = change;
        }

        if !end.is_infinite() {
            let follow = instance(&pred, end);
            terminate(&node, end, &follow)?;
            set_next(&follow, end, succ.map(|s| instance(&s, end)))?;
        }
        return Ok(node);
    }

    /// The bracket of `value` at `t` on `level`, starting near `pred`.
    fn relocate(
        &self,
        level: usize,
        pred: &NodeRef<D, T>,
        value: &D,
        t: T,
    ) -> Result<Bracket<D, T>, Fault> {
        let near = instance(pred, t);
        let alive = near.borrow().alive_at(t);
        let start = if alive {
            near
        } else {
            // The close-out redirect was reclaimed; come down from the top.
            self.descend(level, value, t)?
        };
        return self.bracket(&start, value, t, Counters::insertion);
    }

    /// A node on `level` alive at `t` and below `value`, found from the top.
    fn descend(&self, level: usize, value: &D, t: T) -> Result<NodeRef<D, T>, Fault> {
        let mut start = self.top();
        for _ in (level + 1..self.roots.len()).rev() {
            let (pred, _) = self.bracket(&start, value, t, Counters::insertion)?;
            let down = pred.borrow().tower.clone();
            start = verified!(down);
        }
        return Ok(instance(&start, t));
    }
}

impl<D, T> Drop for PersistentSet<D, T> {
    fn drop(&mut self) {
        // Chains can be arbitrarily long; release them without recursion.
        let mut stack: Vec<NodeRef<D, T>> = self.roots.drain(..).collect();
        while let Some(node) = stack.pop() {
            if let Ok(mut n) = node.try_borrow_mut() {
                n.detach(&mut stack);
            }
        }
        if self.counters.nodes() != 0 {
            tracing::warn!(nodes = self.counters.nodes(), "nodes outlived their set");
        }
    }
}
