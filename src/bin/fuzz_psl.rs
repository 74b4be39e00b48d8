//! AFL fuzz harness for the persistent set.
//!
//! The input picks a leveling bias and then a list of insertions. Insertions
//! that would make a value alive twice are dropped before they reach the
//! set. The harness checks:
//! 1. Snapshot correctness: every slice equals the naive filter over the
//!    accepted intervals
//! 2. Structural audit: `verify` passes before and after querying
//! 3. Leak freedom: teardown releases every node

use afl::fuzz;
use timeskip::{Config, PersistentSet, Segment};

/// Every decoded time is below this, so slicing up to it covers all changes.
const HORIZON: u32 = 80;

/// An insertion decoded from three bytes.
fn decode(bytes: &[u8]) -> Option<(Segment<u8, u32>, &[u8])> {
    if bytes.len() < 3 {
        return None;
    }
    let value = bytes[0] % 16;
    let start = (bytes[1] % 64) as u32;
    // 16 means open-ended.
    let len = bytes[2] % 17;
    let end = if len == 16 { u32::MAX } else { start + len as u32 };
    return Some((Segment::new(value, start, end), &bytes[3..]));
}

fn clashes(accepted: &[Segment<u8, u32>], s: &Segment<u8, u32>) -> bool {
    if s.start == s.end {
        return false;
    }
    return accepted
        .iter()
        .any(|a| a.value == s.value && a.start < s.end && s.start < a.end);
}

fn main() {
    fuzz!(|data: &[u8]| {
        let Some((&bias, mut remaining)) = data.split_first() else {
            return;
        };
        let config = Config {
            settle: (bias % 11) as f64 / 10.0,
            seed: bias as u64,
        };
        let mut set = PersistentSet::<u8, u32>::with_config(config).expect("bias is in range");
        let counters = set.counters();

        let mut accepted = Vec::new();
        while let Some((segment, rest)) = decode(remaining) {
            remaining = rest;
            if clashes(&accepted, &segment) {
                continue;
            }
            if let Err(fault) = set.insert(segment.value, segment.start, segment.end) {
                panic!("insert {:?} faulted: {}", segment, fault);
            }
            if segment.start != segment.end {
                accepted.push(segment);
            }
        }

        set.verify().expect("structure is consistent after inserts");
        for t in 0..HORIZON {
            let mut expected: Vec<u8> = accepted
                .iter()
                .filter(|s| s.start <= t && t < s.end)
                .map(|s| s.value)
                .collect();
            expected.sort();
            assert_eq!(set.slice(t), expected, "slice mismatch at t = {}", t);
        }
        set.verify().expect("structure is consistent after queries");

        drop(set);
        assert_eq!(counters.nodes(), 0, "nodes leaked");
    });
}
