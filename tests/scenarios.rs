//! Concrete insertion scenarios with hand-checked answers.

use timeskip::{Config, Fault, PersistentSet};

fn filled(inserts: &[(u32, u32, u32)]) -> PersistentSet<u32, u32> {
    let mut set = PersistentSet::new();
    for &(value, start, end) in inserts {
        set.insert(value, start, end).unwrap();
    }
    return set;
}

// =============================================================================
// Snapshots
// =============================================================================

#[test]
fn three_staggered_intervals() {
    let set = filled(&[(10, 0, 5), (20, 2, 8), (5, 1, 3)]);
    assert_eq!(set.slice(0), vec![10]);
    assert_eq!(set.slice(2), vec![5, 10, 20]);
    assert_eq!(set.slice(4), vec![10, 20]);
    assert_eq!(set.slice(6), vec![20]);
    assert_eq!(set.slice(9), Vec::<u32>::new());
    set.verify().unwrap();
}

#[test]
fn adjacent_intervals_of_one_value() {
    let set = filled(&[(1, 0, 10), (1, 10, 20)]);
    assert_eq!(set.slice(9), vec![1]);
    assert_eq!(set.slice(10), vec![1]);
    assert_eq!(set.slice(19), vec![1]);
    assert_eq!(set.slice(20), Vec::<u32>::new());
}

#[test]
fn adjacent_intervals_inserted_backwards() {
    let set = filled(&[(1, 10, 20), (1, 0, 10), (2, 5, 15)]);
    for t in 0..20 {
        let mut expected = vec![1];
        if (5..15).contains(&t) {
            expected.push(2);
        }
        assert_eq!(set.slice(t), expected, "t = {}", t);
    }
    set.verify().unwrap();
}

#[test]
fn open_ended_interval_never_closes() {
    let set = filled(&[(3, 4, u32::MAX), (1, 0, 6)]);
    assert_eq!(set.slice(3), vec![1]);
    assert_eq!(set.slice(5), vec![1, 3]);
    assert_eq!(set.slice(1_000_000), vec![3]);
}

#[test]
fn empty_interval_is_a_no_op() {
    let mut set = PersistentSet::<u32, u32>::new();
    set.insert(4, 3, 3).unwrap();
    assert_eq!(set.slice(3), Vec::<u32>::new());
    assert_eq!(set.profiling().nodes, 1);
}

// =============================================================================
// Faults
// =============================================================================

#[test]
fn overlapping_interval_faults() {
    let mut set = filled(&[(1, 0, 10)]);
    assert_eq!(set.insert(1, 5, 15), Err(Fault::Overlap));
}

#[test]
fn enclosing_interval_faults() {
    let mut set = filled(&[(1, 4, 6)]);
    assert_eq!(set.insert(1, 0, 10), Err(Fault::Overlap));
    assert!(set.is_poisoned());
    assert_eq!(set.insert(2, 0, 1), Err(Fault::Poisoned));
}

#[test]
fn inverted_interval_is_rejected() {
    let mut set = PersistentSet::<u32, u32>::new();
    assert_eq!(set.insert(1, 5, 2), Err(Fault::InvertedInterval));
    assert!(!set.is_poisoned());
    set.insert(1, 2, 5).unwrap();
}

// =============================================================================
// Point queries
// =============================================================================

#[test]
fn lower_bound_and_contains() {
    let set = filled(&[(10, 0, 5), (20, 2, 8), (5, 1, 3)]);
    assert_eq!(set.lower_bound(&0, 2), Some(5));
    assert_eq!(set.lower_bound(&6, 2), Some(10));
    assert_eq!(set.lower_bound(&11, 4), Some(20));
    assert_eq!(set.lower_bound(&11, 9), None);
    assert!(set.contains(&10, 4));
    assert!(!set.contains(&10, 5));
    assert!(!set.contains(&15, 4));
}

#[test]
fn point_queries_on_many_levels() {
    let config = Config {
        settle: 0.3,
        seed: 17,
    };
    let mut set = PersistentSet::<u32, u32>::with_config(config).unwrap();
    for v in 0..300u32 {
        set.insert(v * 2, v, v + 100).unwrap();
    }
    assert!(set.levels() > 2);
    // At t = 150 the values 2 * 51 ..= 2 * 150 are alive.
    assert_eq!(set.lower_bound(&0, 150), Some(102));
    assert_eq!(set.lower_bound(&201, 150), Some(202));
    assert_eq!(set.lower_bound(&301, 150), None);
    assert!(set.contains(&200, 150));
    assert!(!set.contains(&201, 150));
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn teardown_releases_every_node() {
    let set = filled(&[(10, 0, 5), (20, 2, 8), (5, 1, 3), (7, 0, u32::MAX)]);
    assert!(set.profiling().nodes > 4);
    let report = set.teardown();
    assert_eq!(report.nodes, 0);
    assert!(report.insertion > 0);
    assert!(report.localization > 0);
}

#[test]
fn long_chain_drops_without_recursion() {
    let mut set = PersistentSet::<u32, u32>::with_config(Config {
        settle: 1.0,
        seed: 0,
    })
    .unwrap();
    let counters = set.counters();
    // A single value blinking produces a long fork chain on the head.
    for i in 0..4_000u32 {
        set.insert(1, 2 * i, 2 * i + 1).unwrap();
    }
    drop(set);
    assert_eq!(counters.nodes(), 0);
}
