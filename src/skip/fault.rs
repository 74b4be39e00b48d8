//! Consistency faults raised by the persistent set.

/// An unrecoverable failure of an insertion.
///
/// A fault means the set may be left half-modified. The only sensible
/// reaction is to drop the set; the minimizer in [`crate::shrink`] uses
/// faults to shrink a failing input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    /// A value would be active twice at the same time.
    #[error("value is already active during part of the interval")]
    Overlap,

    /// The interval end precedes its start.
    #[error("interval end precedes its start")]
    InvertedInterval,

    /// An earlier insertion faulted; the set must be discarded.
    #[error("set was poisoned by an earlier fault")]
    Poisoned,

    /// An internal structural check failed.
    #[error("consistency check `{check}` failed at {file}:{line}")]
    Invariant {
        check: &'static str,
        file: &'static str,
        line: u32,
    },
}

/// Return `Fault::Invariant` from the enclosing function unless the
/// condition holds.
macro_rules! verify {
    ($cond:expr) => {
        if !($cond) {
            tracing::warn!(
                check = stringify!($cond),
                file = file!(),
                line = line!(),
                "consistency check failed"
            );
            return Err($crate::skip::fault::Fault::Invariant {
                check: stringify!($cond),
                file: file!(),
                line: line!(),
            });
        }
    };
}

/// Unwrap an `Option`, or return `Fault::Invariant` if it is empty.
macro_rules! verified {
    ($opt:expr) => {
        match $opt {
            Some(value) => value,
            None => {
                tracing::warn!(
                    check = stringify!($opt),
                    file = file!(),
                    line = line!(),
                    "expected value was missing"
                );
                return Err($crate::skip::fault::Fault::Invariant {
                    check: stringify!($opt),
                    file: file!(),
                    line: line!(),
                });
            }
        }
    };
}

pub(crate) use {verified, verify};

/// Error returned for an unusable [`super::Config`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("leveling probability {0} is outside [0, 1]")]
    Probability(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positive(x: i32) -> Result<i32, Fault> {
        verify!(x > 0);
        return Ok(x);
    }

    #[test]
    fn verify_passes_through() {
        assert_eq!(positive(3), Ok(3));
    }

    #[test]
    fn verify_reports_check_text() {
        match positive(-1) {
            Err(Fault::Invariant { check, file, .. }) => {
                assert_eq!(check, "x > 0");
                assert!(file.ends_with("fault.rs"));
            }
            other => panic!("expected invariant fault, got {:?}", other),
        }
    }

    fn first(xs: &[u8]) -> Result<u8, Fault> {
        let x = verified!(xs.first());
        return Ok(*x);
    }

    #[test]
    fn verified_unwraps_or_faults() {
        assert_eq!(first(&[7, 8]), Ok(7));
        assert!(matches!(first(&[]), Err(Fault::Invariant { .. })));
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            Fault::Overlap.to_string(),
            "value is already active during part of the interval"
        );
        assert_eq!(
            ConfigError::Probability(1.5).to_string(),
            "leveling probability 1.5 is outside [0, 1]"
        );
    }
}
