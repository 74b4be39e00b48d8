//! Versioned nodes, the unit of persistence.
//!
//! A node is one (value, outgoing link) slot of one level. Its outgoing link
//! can hold two generations in place:
//!
//! ```text
//!   Single(a)                  a on [init, end)
//!   Dual { a, b, switch }      a on [init, switch), b on [switch, end)
//! ```
//!
//! A third generation does not fit, so the node forks: a new node carrying
//! the same value takes over from the fork time, and the old node's event
//! points at it. The forward chain of forks is the event chain:
//!
//! ```text
//!   N0 [0, 5) ──Fork@5──> N1 [5, 9) ──Fork@9──> N2 [9, 12) ──End@12──> pred
//! ```
//!
//! `end` of a node is the time of its event (or `INFINITY`). The last node of
//! a finished value ends with `End`, a weak redirect to the predecessor that
//! was live at the end time. Stale references resolve through it to a live
//! node with a smaller value.
//!
//! Every strong edge points to a larger value (links), the same value later
//! in time (forks), or one level down (towers), so the strong graph is
//! acyclic and reference counting releases everything.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use super::fault::{verify, Fault};
use super::profiling::Counters;
use super::time::Timestamp;

pub(crate) type NodeRef<D, T> = Rc<RefCell<Node<D, T>>>;

/// A possibly absent successor. `None` is the end of a level.
pub(crate) type Link<D, T> = Option<NodeRef<D, T>>;

/// Return true if both links name the same physical node (or both are empty).
pub(crate) fn same<D, T>(a: &Link<D, T>, b: &Link<D, T>) -> bool {
    return match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        _ => false,
    };
}

/// The in-place generations of a node's outgoing link.
pub(crate) enum Links<D, T> {
    Single(Link<D, T>),
    Dual {
        early: Link<D, T>,
        late: Link<D, T>,
        switch: T,
    },
}

impl<D, T: Copy> Clone for Links<D, T> {
    fn clone(&self) -> Self {
        return match self {
            Links::Single(only) => Links::Single(only.clone()),
            Links::Dual { early, late, switch } => Links::Dual {
                early: early.clone(),
                late: late.clone(),
                switch: *switch,
            },
        };
    }
}

impl<D, T: Timestamp> Links<D, T> {
    /// The link active at `t`.
    pub(crate) fn at(&self, t: T) -> &Link<D, T> {
        return match self {
            Links::Single(only) => only,
            Links::Dual { early, late, switch } => {
                if t < *switch {
                    early
                } else {
                    late
                }
            }
        };
    }

    /// The link active from the node's own start.
    pub(crate) fn first(&self) -> &Link<D, T> {
        return match self {
            Links::Single(only) => only,
            Links::Dual { early, .. } => early,
        };
    }

    /// Generations as (start, link) pairs, with `init` as the first start.
    pub(crate) fn generations(&self, init: T) -> SmallVec<[(T, &Link<D, T>); 2]> {
        let mut out = SmallVec::new();
        match self {
            Links::Single(only) => out.push((init, only)),
            Links::Dual { early, late, switch } => {
                out.push((init, early));
                out.push((*switch, late));
            }
        }
        return out;
    }

    /// Switch time of the second generation, or `INFINITY`.
    pub(crate) fn switch(&self) -> T {
        return match self {
            Links::Single(_) => T::INFINITY,
            Links::Dual { switch, .. } => *switch,
        };
    }

    /// Merge indistinguishable generations.
    fn collapse(&mut self) {
        if let Links::Dual { early, late, .. } = self {
            if same(early, late) {
                let only = early.take();
                *self = Links::Single(only);
            }
        }
    }

    /// Make `target` the successor from `t` until the next scheduled change.
    ///
    /// `init` is the owning node's start and `init <= t` must hold. Returns
    /// the generation that no longer fits in place, as (start, link); the
    /// caller must move it to a fork.
    fn schedule(&mut self, init: T, t: T, target: Link<D, T>) -> Option<(T, Link<D, T>)> {
        let current = std::mem::replace(self, Links::Single(None));
        let (links, spill) = match current {
            Links::Single(_) if t == init => (Links::Single(target), None),
            Links::Dual { late, switch, .. } if t == init => (
                Links::Dual {
                    early: target,
                    late,
                    switch,
                },
                None,
            ),
            Links::Dual { early, switch, .. } if t == switch => (
                Links::Dual {
                    early,
                    late: target,
                    switch,
                },
                None,
            ),
            Links::Single(only) => {
                if same(&only, &target) {
                    (Links::Single(only), None)
                } else {
                    (
                        Links::Dual {
                            early: only,
                            late: target,
                            switch: t,
                        },
                        None,
                    )
                }
            }
            Links::Dual { early, late, switch } if t < switch => {
                if same(&late, &target) {
                    // The later generation simply starts earlier.
                    (Links::Dual { early, late, switch: t }, None)
                } else if same(&early, &target) {
                    (Links::Dual { early, late, switch }, None)
                } else {
                    (
                        Links::Dual {
                            early,
                            late: target,
                            switch: t,
                        },
                        Some((switch, late)),
                    )
                }
            }
            Links::Dual { early, late, switch } => {
                if same(&late, &target) {
                    (Links::Dual { early, late, switch }, None)
                } else {
                    (Links::Dual { early, late, switch }, Some((t, target)))
                }
            }
        };
        *self = links;
        self.collapse();
        return spill;
    }
}

/// What follows a node once its authority ends.
pub(crate) enum Event<D, T> {
    /// The same value continues in a later-born node.
    Fork { at: T, node: NodeRef<D, T> },
    /// The value leaves the level; stale readers fall back to `follow`.
    End {
        at: T,
        follow: Weak<RefCell<Node<D, T>>>,
    },
}

impl<D, T: Copy> Event<D, T> {
    pub(crate) fn at(&self) -> T {
        return match self {
            Event::Fork { at, .. } => *at,
            Event::End { at, .. } => *at,
        };
    }
}

pub(crate) struct Node<D, T> {
    /// Absent only for level heads.
    pub(crate) data: Option<D>,
    /// Start of this node's authority.
    pub(crate) init: T,
    pub(crate) links: Links<D, T>,
    /// The node of the same insertion one level down.
    pub(crate) tower: Link<D, T>,
    pub(crate) event: Option<Event<D, T>>,
    counters: Rc<Counters>,
}

impl<D, T: Timestamp> Node<D, T> {
    pub(crate) fn alloc(data: Option<D>, init: T, counters: &Rc<Counters>) -> NodeRef<D, T> {
        counters.node_created();
        return Rc::new(RefCell::new(Node {
            data,
            init,
            links: Links::Single(None),
            tower: None,
            event: None,
            counters: counters.clone(),
        }));
    }

    /// End of this node's authority.
    pub(crate) fn end(&self) -> T {
        return match &self.event {
            Some(event) => event.at(),
            None => T::INFINITY,
        };
    }

    /// A node emptied by a merge: it only forwards to its fork.
    pub(crate) fn is_pass_through(&self) -> bool {
        return matches!(&self.event, Some(Event::Fork { at, .. }) if *at == self.init);
    }

    /// True unless the node ended at or before `t`.
    pub(crate) fn alive_at(&self, t: T) -> bool {
        return !matches!(&self.event, Some(Event::End { at, .. }) if *at <= t);
    }

    /// Node-local structural invariants.
    pub(crate) fn check(&self) -> Result<(), Fault> {
        if self.is_pass_through() {
            return Ok(());
        }
        let end = self.end();
        verify!(self.init < end);
        if let Links::Dual { early, late, switch } = &self.links {
            verify!(!same(early, late));
            verify!(self.init < *switch);
            verify!(*switch < end);
        }
        return Ok(());
    }
}

impl<D, T> Node<D, T> {
    /// Move every strong outgoing reference onto `out`.
    pub(crate) fn detach(&mut self, out: &mut Vec<NodeRef<D, T>>) {
        match std::mem::replace(&mut self.links, Links::Single(None)) {
            Links::Single(only) => out.extend(only),
            Links::Dual { early, late, .. } => {
                out.extend(early);
                out.extend(late);
            }
        }
        out.extend(self.tower.take());
        if let Some(Event::Fork { node, .. }) = self.event.take() {
            out.push(node);
        }
    }
}

impl<D, T> Drop for Node<D, T> {
    fn drop(&mut self) {
        self.counters.node_released();
    }
}

/// Follow forks up to `t` without touching the representation.
pub(crate) fn resolve<D, T: Timestamp>(node: &NodeRef<D, T>, t: T) -> NodeRef<D, T> {
    let mut cur = node.clone();
    loop {
        let next = match &cur.borrow().event {
            Some(Event::Fork { at, node }) if *at <= t => node.clone(),
            _ => break,
        };
        cur = next;
    }
    return cur;
}

enum Step<D, T> {
    Stop,
    Fork(NodeRef<D, T>),
    Follow(NodeRef<D, T>),
}

/// Resolve `node` to the physical node authoritative at `t`.
///
/// Every node stepped past has its references canonicalized. Emptied nodes
/// are spliced out of the chain, and a generation duplicated across a fork
/// boundary is handed to the fork. None of this changes what any query
/// observes.
pub(crate) fn instance<D, T: Timestamp>(node: &NodeRef<D, T>, t: T) -> NodeRef<D, T> {
    node.borrow().counters.overhead();
    let mut cur = node.clone();
    loop {
        let step = match &cur.borrow().event {
            Some(Event::Fork { at, node }) if *at <= t => Step::Fork(node.clone()),
            Some(Event::End { at, follow }) if *at <= t => match follow.upgrade() {
                Some(follow) => Step::Follow(follow),
                None => Step::Stop,
            },
            _ => Step::Stop,
        };
        match step {
            Step::Stop => return cur,
            Step::Follow(follow) => {
                compress(&cur);
                cur = follow;
            }
            Step::Fork(fork) => {
                compress(&cur);
                if absorb(&cur, &fork) {
                    continue;
                }
                merge(&cur, &fork);
                cur = fork;
            }
        }
        cur.borrow().counters.overhead();
    }
}

/// Point every reference of `node` at the instance valid where it starts.
fn compress<D, T: Timestamp>(node: &NodeRef<D, T>) {
    let (init, links, tower) = {
        let n = node.borrow();
        (n.init, n.links.clone(), n.tower.clone())
    };
    let canon = |link: Link<D, T>, at: T| link.map(|target| resolve(&target, at));
    let links = match links {
        Links::Single(only) => Links::Single(canon(only, init)),
        Links::Dual { early, late, switch } => Links::Dual {
            early: canon(early, init),
            late: canon(late, switch),
            switch,
        },
    };
    let tower = canon(tower, init);

    let mut n = node.borrow_mut();
    n.links = links;
    n.links.collapse();
    n.tower = tower;
    n.counters.overhead();
}

/// Splice `fork` out of the chain if it is a pass-through.
fn absorb<D, T: Timestamp>(cur: &NodeRef<D, T>, fork: &NodeRef<D, T>) -> bool {
    let after = {
        let f = fork.borrow();
        match &f.event {
            Some(Event::Fork { node, .. }) if f.is_pass_through() => node.clone(),
            _ => return false,
        }
    };
    if let Some(Event::Fork { node, .. }) = &mut cur.borrow_mut().event {
        *node = after;
    }
    return true;
}

/// Hand a generation that continues unchanged into `fork` over to it.
fn merge<D, T: Timestamp>(cur: &NodeRef<D, T>, fork: &NodeRef<D, T>) {
    let mut c = cur.borrow_mut();
    let mut f = fork.borrow_mut();
    let fork_at = c.end();
    let continues = same(c.links.at(fork_at), f.links.first());
    if !continues {
        return;
    }
    match c.links.clone() {
        Links::Dual { early, switch, .. } => {
            f.init = switch;
            f.tower = c.tower.clone();
            c.links = Links::Single(early);
            c.event = Some(Event::Fork {
                at: switch,
                node: fork.clone(),
            });
        }
        Links::Single(_) if c.init < fork_at => {
            f.init = c.init;
            f.tower = c.tower.take();
            c.links = Links::Single(None);
            let at = c.init;
            c.event = Some(Event::Fork {
                at,
                node: fork.clone(),
            });
        }
        Links::Single(_) => {}
    }
}

/// The raw successor link at `t`.
pub(crate) fn next<D, T: Timestamp>(node: &NodeRef<D, T>, t: T) -> Link<D, T> {
    let n = instance(node, t);
    let link = n.borrow().links.at(t).clone();
    return link;
}

/// The successor at `t`, resolved to its authoritative instance.
pub(crate) fn successor<D, T: Timestamp>(node: &NodeRef<D, T>, t: T) -> Link<D, T> {
    return next(node, t).map(|target| instance(&target, t));
}

/// The first time after `t` at which the node's outgoing state changes.
pub(crate) fn next_event<D, T: Timestamp>(node: &NodeRef<D, T>, t: T) -> T {
    let n = instance(node, t);
    let n = n.borrow();
    let switch = n.links.switch();
    if !switch.is_infinite() && switch > t {
        return switch;
    }
    return n.end();
}

/// Record that from `t` onward the successor of `node` is `target`.
pub(crate) fn set_next<D: Clone, T: Timestamp>(
    node: &NodeRef<D, T>,
    t: T,
    target: Link<D, T>,
) -> Result<(), Fault> {
    let n = instance(node, t);
    let mut b = n.borrow_mut();
    verify!(b.init <= t && t < b.end());
    b.check()?;

    let init = b.init;
    if let Some((at, first)) = b.links.schedule(init, t, target) {
        let fork = Node::alloc(b.data.clone(), at, &b.counters);
        {
            let mut f = fork.borrow_mut();
            f.links = Links::Single(first);
            f.tower = b.tower.clone();
            f.event = b.event.take();
        }
        b.event = Some(Event::Fork { at, node: fork });
    }

    b.check()?;
    return Ok(());
}

/// End the value held by `node` at `t`, redirecting stale readers to `follow`.
pub(crate) fn terminate<D: Ord, T: Timestamp>(
    node: &NodeRef<D, T>,
    t: T,
    follow: &NodeRef<D, T>,
) -> Result<(), Fault> {
    let last = instance(node, t);
    verify!(!Rc::ptr_eq(&last, follow));
    verify!(follow.borrow().data < last.borrow().data);

    let mut b = last.borrow_mut();
    verify!(b.event.is_none());
    verify!(b.init < t);
    verify!(b.links.switch().is_infinite() || b.links.switch() < t);
    b.event = Some(Event::End {
        at: t,
        follow: Rc::downgrade(follow),
    });
    return Ok(());
}
