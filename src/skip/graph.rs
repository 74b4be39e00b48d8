//! Whole-graph walks over a set: rendering traversal and structural audit.

use std::rc::Rc;

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use super::fault::{verify, Fault};
use super::node::{Event, NodeRef};
use super::time::Timestamp;
use super::PersistentSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// A successor link, drawn at the time its generation starts.
    Link,
    /// The lifetime of one physical node, from its start to its fork.
    Fork,
    /// The step down to the same insertion one level below.
    Tower,
}

/// One edge of the node graph, as two (data, time) points.
///
/// `None` data stands for a level head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge<'a, D, T> {
    pub kind: EdgeKind,
    pub data: Option<&'a D>,
    pub time: T,
    pub next_data: Option<&'a D>,
    pub next_time: T,
}

/// Depth-first walk over every physical node reachable from `roots`.
///
/// `expand` sees each node and pushes the neighbours to continue into.
fn walk<D, T, F>(roots: &[NodeRef<D, T>], mut expand: F) -> Result<(), Fault>
where
    F: FnMut(&NodeRef<D, T>, &mut SmallVec<[NodeRef<D, T>; 4]>) -> Result<(), Fault>,
{
    let mut seen: FxHashSet<*const ()> = FxHashSet::default();
    // The top level is popped first.
    let mut stack: Vec<NodeRef<D, T>> = roots.to_vec();
    let mut children = SmallVec::new();
    while let Some(node) = stack.pop() {
        if !seen.insert(Rc::as_ptr(&node) as *const ()) {
            continue;
        }
        expand(&node, &mut children)?;
        stack.extend(children.drain(..).rev());
    }
    return Ok(());
}

/// The first node along the fork chain from `node` that is not a
/// pass-through.
fn settled<D, T: Timestamp>(node: &NodeRef<D, T>) -> NodeRef<D, T> {
    let mut cur = node.clone();
    loop {
        let after = {
            let n = cur.borrow();
            match &n.event {
                Some(Event::Fork { node, .. }) if n.is_pass_through() => Some(node.clone()),
                _ => None,
            }
        };
        match after {
            Some(next) => cur = next,
            None => return cur,
        }
    }
}

impl<D: Ord + Clone, T: Timestamp> PersistentSet<D, T> {
    /// Walk the committed node graph, reporting each edge to `predicate`.
    ///
    /// The walk continues through an edge only if `predicate` returns true.
    /// Levels are visited top first; within a node, links come before the
    /// fork and the tower. Nothing is compressed during the walk.
    pub fn visit<F>(&self, mut predicate: F)
    where
        F: FnMut(Edge<'_, D, T>) -> bool,
    {
        let _ = walk(&self.roots, |node, children| {
            let n = node.borrow();
            for (start, link) in n.links.generations(n.init) {
                if let Some(target) = link {
                    let m = target.borrow();
                    let edge = Edge {
                        kind: EdgeKind::Link,
                        data: n.data.as_ref(),
                        time: start,
                        next_data: m.data.as_ref(),
                        next_time: start,
                    };
                    if predicate(edge) {
                        children.push(target.clone());
                    }
                }
            }
            if let Some(Event::Fork { at, node: fork }) = &n.event {
                let edge = Edge {
                    kind: EdgeKind::Fork,
                    data: n.data.as_ref(),
                    time: n.init,
                    next_data: n.data.as_ref(),
                    next_time: *at,
                };
                if predicate(edge) {
                    children.push(fork.clone());
                }
            }
            if let Some(tower) = &n.tower {
                let m = tower.borrow();
                let edge = Edge {
                    kind: EdgeKind::Tower,
                    data: n.data.as_ref(),
                    time: n.init,
                    next_data: m.data.as_ref(),
                    next_time: n.init,
                };
                if predicate(edge) {
                    children.push(tower.clone());
                }
            }
            return Ok(());
        });
    }

    /// Audit every physical node against the structural invariants.
    ///
    /// Checks generation ordering, value ordering along links, that forks
    /// and towers keep their value, and that close-out redirects point to a
    /// smaller value.
    pub fn verify(&self) -> Result<(), Fault> {
        return walk(&self.roots, |node, children| {
            let n = node.borrow();
            n.check()?;
            if n.is_pass_through() {
                if let Some(Event::Fork { node: fork, .. }) = &n.event {
                    children.push(fork.clone());
                }
                return Ok(());
            }
            if let Some(event) = &n.event {
                verify!(event.at() >= n.init);
            }

            for (_, link) in n.links.generations(n.init) {
                if let Some(target) = link {
                    verify!(target.borrow().data > n.data);
                    children.push(target.clone());
                }
            }
            match &n.event {
                Some(Event::Fork { at, node: fork }) => {
                    // A merge hands the tower on to the next real node.
                    let towered = settled(fork).borrow().tower.is_some();
                    let f = fork.borrow();
                    verify!(f.data == n.data);
                    verify!(f.init == *at);
                    verify!(towered == n.tower.is_some());
                    children.push(fork.clone());
                }
                Some(Event::End { follow, .. }) => {
                    if let Some(follow) = follow.upgrade() {
                        verify!(follow.borrow().data < n.data);
                    }
                }
                None => {}
            }
            if let Some(tower) = &n.tower {
                verify!(tower.borrow().data == n.data);
                children.push(tower.clone());
            }
            return Ok(());
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PersistentSet<u32, u32> {
        let mut set = PersistentSet::new();
        set.insert(10, 0, 5).unwrap();
        set.insert(20, 2, 8).unwrap();
        set.insert(5, 1, 3).unwrap();
        return set;
    }

    #[test]
    fn visit_reports_links_in_value_order() {
        let set = sample();
        let mut links = 0;
        set.visit(|edge| {
            if edge.kind == EdgeKind::Link {
                assert!(edge.next_data > edge.data);
                links += 1;
            }
            return true;
        });
        assert!(links >= 3);
    }

    #[test]
    fn visit_prunes_on_false() {
        let set = sample();
        let mut calls = 0;
        set.visit(|_| {
            calls += 1;
            return false;
        });
        let mut full = 0;
        set.visit(|_| {
            full += 1;
            return true;
        });
        assert!(calls < full);
    }

    #[test]
    fn verify_accepts_sample() {
        let set = sample();
        set.verify().unwrap();
        // Queries compress the representation; it must stay valid.
        for t in 0..10 {
            set.slice(t);
        }
        set.verify().unwrap();
    }

    #[test]
    fn verify_accepts_tower_handed_past_pass_through() {
        let config = crate::Config {
            settle: 0.0,
            seed: 0,
        };
        let mut set = PersistentSet::<u32, u32>::with_config(config).unwrap();
        set.insert(3, 1, 3).unwrap();
        set.insert(0, 2, 4).unwrap();
        set.insert(2, 7, 11).unwrap();

        let slices: Vec<Vec<u32>> = (0..12).map(|t| set.slice(t)).collect();
        assert_eq!(
            slices,
            vec![
                vec![],
                vec![3],
                vec![0, 3],
                vec![0],
                vec![],
                vec![],
                vec![],
                vec![2],
                vec![2],
                vec![2],
                vec![2],
                vec![],
            ]
        );
        set.verify().unwrap();
    }
}
