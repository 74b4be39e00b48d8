//! The time axis of a persistent set.

use std::fmt::Debug;

/// A discrete, totally ordered time coordinate with a designated maximum.
///
/// `INFINITY` is a sentinel meaning "no scheduled change". An interval whose
/// end is `INFINITY` never closes. `ORIGIN` is the earliest representable
/// time; level heads exist from it onward.
pub trait Timestamp: Copy + Ord + Debug {
    const INFINITY: Self;
    const ORIGIN: Self;

    /// Return true if this is the `INFINITY` sentinel.
    #[inline]
    fn is_infinite(self) -> bool {
        return self == Self::INFINITY;
    }
}

macro_rules! impl_timestamp {
    ($($t:ty),*) => {
        $(
            impl Timestamp for $t {
                const INFINITY: Self = <$t>::MAX;
                const ORIGIN: Self = <$t>::MIN;
            }
        )*
    };
}

impl_timestamp!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infinity_is_max() {
        assert_eq!(<u32 as Timestamp>::INFINITY, u32::MAX);
        assert_eq!(<i64 as Timestamp>::INFINITY, i64::MAX);
        assert!(usize::MAX.is_infinite());
        assert!(!0usize.is_infinite());
        assert_eq!(<i32 as Timestamp>::ORIGIN, i32::MIN);
        assert_eq!(<usize as Timestamp>::ORIGIN, 0);
    }
}
