//! Interval workloads for tests, benchmarks and fuzzing.
//!
//! Every generator returns segments whose same-value intervals never
//! overlap, so the whole list can be inserted into one set.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;

/// A value together with its lifetime `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Segment<D, T> {
    pub value: D,
    pub start: T,
    pub end: T,
}

impl<D, T> Segment<D, T> {
    pub fn new(value: D, start: T, end: T) -> Self {
        return Segment { value, start, end };
    }
}

/// Simulate a set evolving one step at a time.
///
/// Each step either activates a fresh random value (with probability 0.75,
/// or always when nothing is active) or retires a random active one. The
/// values left active at the end are retired one per step. The segments
/// come back shuffled.
pub fn random_trace<R: Rng>(operations: usize, rng: &mut R) -> Vec<Segment<u32, usize>> {
    let mut active: BTreeMap<u32, usize> = BTreeMap::new();
    let mut segments = Vec::new();

    let mut retire = |active: &mut BTreeMap<u32, usize>, rng: &mut R, at: usize| {
        let idx = rng.gen_range(0..active.len());
        let Some((&value, &start)) = active.iter().nth(idx) else {
            return;
        };
        active.remove(&value);
        segments.push(Segment::new(value, start, at));
    };

    for step in 0..operations {
        if active.is_empty() || rng.gen_bool(0.75) {
            loop {
                let value: u32 = rng.r#gen();
                if !active.contains_key(&value) {
                    active.insert(value, step);
                    break;
                }
            }
        } else {
            retire(&mut active, rng, step);
        }
    }

    let mut step = operations;
    while !active.is_empty() {
        retire(&mut active, rng, step);
        step += 1;
    }

    segments.shuffle(rng);
    return segments;
}

/// Intervals nested inside each other, inserted outermost first.
///
/// Two interleaved families of `n / 2` intervals each: family one has values
/// rising as the intervals shrink, family two has values falling.
pub fn nested(n: usize) -> Vec<Segment<u32, usize>> {
    let half = n / 2;
    let mut segments = Vec::with_capacity(2 * half);
    for l in 0..half {
        segments.push(Segment::new(l as u32 + 1, 2 * l, 4 * half - 2 * l));
    }
    for l in 0..half {
        segments.push(Segment::new(
            (2 * half - l + 1) as u32,
            2 * l + 1,
            4 * half - 2 * l - 1,
        ));
    }
    return segments;
}

/// One value blinking on and off `n / 2` times, under `n / 2` long intervals.
///
/// With `inverted`, the long intervals all cover the middle and grow outward
/// in both directions; otherwise they shrink from both ends.
pub fn staircase(n: usize, inverted: bool) -> Vec<Segment<u32, usize>> {
    let half = n / 2;
    let mut segments = Vec::with_capacity(2 * half);
    for l in 0..half {
        segments.push(Segment::new(half as u32, half + 2 * l, half + 2 * l + 1));
    }
    for l in 0..half {
        let (start, end) = if inverted {
            (half - 1 - l, 3 * half + l)
        } else {
            (l, 4 * half - l - 1)
        };
        segments.push(Segment::new(l as u32, start, end));
    }
    return segments;
}

/// `n` distinct values, each alive between a random pair of distinct times.
pub fn permutation<R: Rng>(n: usize, rng: &mut R) -> Vec<Segment<u32, usize>> {
    let mut times: Vec<usize> = (0..2 * n).collect();
    let mut values: Vec<u32> = (1..=n as u32).collect();
    values.shuffle(rng);
    times.shuffle(rng);

    return values
        .into_iter()
        .zip(times.chunks_exact(2))
        .map(|(value, pair)| Segment::new(value, pair[0].min(pair[1]), pair[0].max(pair[1])))
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// No value may be alive twice at once.
    fn disjoint_per_value(segments: &[Segment<u32, usize>]) -> bool {
        let mut sorted = segments.to_vec();
        sorted.sort();
        return sorted
            .windows(2)
            .all(|w| w[0].value != w[1].value || w[0].end <= w[1].start);
    }

    #[test]
    fn random_trace_is_well_formed() {
        let mut rng = StdRng::seed_from_u64(5);
        let segments = random_trace(500, &mut rng);
        assert!(!segments.is_empty());
        assert!(segments.iter().all(|s| s.start < s.end));
        assert!(disjoint_per_value(&segments));
    }

    #[test]
    fn nested_shapes() {
        let segments = nested(8);
        assert_eq!(segments.len(), 8);
        assert_eq!(segments[0], Segment::new(1, 0, 16));
        assert_eq!(segments[4], Segment::new(9, 1, 15));
        assert!(disjoint_per_value(&segments));
    }

    #[test]
    fn staircase_shapes() {
        let plain = staircase(8, false);
        assert_eq!(plain[0], Segment::new(4, 4, 5));
        assert_eq!(plain[4], Segment::new(0, 0, 15));
        assert!(disjoint_per_value(&plain));

        let inverted = staircase(8, true);
        assert_eq!(inverted[4], Segment::new(0, 3, 12));
        assert!(disjoint_per_value(&inverted));
    }

    #[test]
    fn permutation_uses_every_time_once() {
        let mut rng = StdRng::seed_from_u64(1);
        let segments = permutation(100, &mut rng);
        let mut times: Vec<usize> = segments.iter().flat_map(|s| [s.start, s.end]).collect();
        times.sort();
        assert_eq!(times, (0..200).collect::<Vec<_>>());
        assert!(segments.iter().all(|s| s.start < s.end));
    }
}
