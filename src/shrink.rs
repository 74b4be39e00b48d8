//! Shrink a faulting list of insertions to a small one that still faults.
//!
//! This is randomized bisection: try to keep a random subset of a target
//! size, or its complement, and accept whichever still faults. Halve the
//! target when no attempt succeeds.

use rand::Rng;

use crate::skip::{Config, Fault, PersistentSet, Timestamp};
use crate::workload::Segment;

/// Attempts per target size before halving it.
const TRIES: usize = 10;

/// Insert `segments` in order into a fresh set built from `config`.
pub fn fill<D: Ord + Clone, T: Timestamp>(
    segments: &[Segment<D, T>],
    config: &Config,
) -> Result<(), Fault> {
    let mut set = PersistentSet::build(*config);
    for segment in segments {
        set.insert(segment.value.clone(), segment.start, segment.end)?;
    }
    return Ok(());
}

/// Reduce `segments` while replaying them keeps faulting.
///
/// Input that does not fault is returned unchanged. Relative order of the
/// kept segments is preserved.
pub fn minimize<D, T, R>(segments: Vec<Segment<D, T>>, config: &Config, rng: &mut R) -> Vec<Segment<D, T>>
where
    D: Ord + Clone,
    T: Timestamp,
    R: Rng,
{
    if fill(&segments, config).is_ok() {
        return segments;
    }

    let mut segments = segments;
    let mut target = segments.len() / 2;
    while target > 0 {
        if !attempt(&mut segments, &mut target, config, rng) {
            target /= 2;
        }
    }
    tracing::info!(len = segments.len(), "minimization finished");
    return segments;
}

/// Try a few random splits; on success replace `segments` with the faulting
/// side and reset `target` to half its size.
fn attempt<D, T, R>(
    segments: &mut Vec<Segment<D, T>>,
    target: &mut usize,
    config: &Config,
    rng: &mut R,
) -> bool
where
    D: Ord + Clone,
    T: Timestamp,
    R: Rng,
{
    for attempt in 0..TRIES {
        tracing::info!(attempt, target = *target, len = segments.len(), "shrinking");
        let (picked, rest) = split(segments, *target, rng);
        for side in [picked, rest] {
            if fill(&side, config).is_err() {
                *segments = side;
                *target = segments.len() / 2;
                return true;
            }
        }
    }
    return false;
}

/// Split into a random subset of exactly `n` elements and the remainder,
/// both in the original order.
fn split<S: Clone, R: Rng>(items: &[S], n: usize, rng: &mut R) -> (Vec<S>, Vec<S>) {
    let mut picked = Vec::with_capacity(n);
    let mut rest = Vec::with_capacity(items.len().saturating_sub(n));
    for (i, item) in items.iter().enumerate() {
        let need = (n - picked.len()) as f64;
        let left = (items.len() - i) as f64;
        if rng.r#gen::<f64>() < need / left {
            picked.push(item.clone());
        } else {
            rest.push(item.clone());
        }
    }
    return (picked, rest);
}
