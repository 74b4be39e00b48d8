//! Replay a recorded JSON trace and compare against its recorded snapshots.

use serde::Deserialize;
use timeskip::PersistentSet;

#[derive(Debug, Clone, Deserialize)]
struct Insert {
    value: u32,
    start: u64,
    /// `null` means the value never leaves.
    end: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct Snapshot {
    time: u64,
    values: Vec<u32>,
}

#[derive(Debug, Clone, Deserialize)]
struct Trace {
    #[allow(dead_code)]
    description: String,
    inserts: Vec<Insert>,
    snapshots: Vec<Snapshot>,
}

impl Trace {
    fn load(text: &str) -> Trace {
        return serde_json::from_str(text).expect("failed to parse trace");
    }
}

#[test]
fn blinking_trace_matches_snapshots() {
    let trace = Trace::load(include_str!("fixtures/blinking.json"));
    let mut set = PersistentSet::<u32, u64>::new();
    for insert in &trace.inserts {
        let end = insert.end.unwrap_or(u64::MAX);
        set.insert(insert.value, insert.start, end).unwrap();
    }
    set.verify().unwrap();
    for snapshot in &trace.snapshots {
        assert_eq!(set.slice(snapshot.time), snapshot.values, "t = {}", snapshot.time);
    }
    // Second pass over compressed structure.
    for snapshot in trace.snapshots.iter().rev() {
        assert_eq!(set.slice(snapshot.time), snapshot.values, "t = {}", snapshot.time);
    }
    assert_eq!(set.teardown().nodes, 0);
}
