//! Timeskip - a time-indexed, partially persistent ordered set.
//!
//! Values are inserted with a half-open lifetime `[start, end)` and the set
//! can be sliced at any time to obtain the values alive then, in order.
//!
//! # Quick Start
//!
//! ```
//! use timeskip::PersistentSet;
//!
//! let mut set = PersistentSet::<u32, u32>::new();
//! set.insert(10, 0, 5).unwrap();
//! set.insert(20, 2, 8).unwrap();
//! set.insert(5, 1, 3).unwrap();
//!
//! assert_eq!(set.slice(2), vec![5, 10, 20]);
//! assert_eq!(set.slice(6), vec![20]);
//! assert_eq!(set.lower_bound(&11, 4), Some(20));
//! ```

pub mod shrink;
pub mod skip;
pub mod workload;

pub use skip::{Config, ConfigError, Fault, PersistentSet, Profiling, Timestamp};
pub use workload::Segment;
