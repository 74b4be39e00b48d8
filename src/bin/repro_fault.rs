//! Replay a trace of insertions and shrink it if it faults.
//!
//! Usage: cargo run --bin repro_fault -- <trace_file>
//!
//! The trace holds one insertion per line as `value start end`. Blank lines
//! and lines starting with `#` are skipped. On a fault the trace is
//! minimized and the smaller failing trace is printed in the same format.

use std::fs;

use rand::SeedableRng;
use rand::rngs::StdRng;
use timeskip::shrink;
use timeskip::{Config, PersistentSet, Segment};

fn parse(text: &str) -> Vec<Segment<u64, u64>> {
    let mut segments = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<u64> = line
            .split_whitespace()
            .map(|field| {
                field
                    .parse()
                    .unwrap_or_else(|_| panic!("line {}: bad number {:?}", number + 1, field))
            })
            .collect();
        assert_eq!(fields.len(), 3, "line {}: expected `value start end`", number + 1);
        segments.push(Segment::new(fields[0], fields[1], fields[2]));
    }
    return segments;
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <trace_file>", args[0]);
        std::process::exit(1);
    }
    let text = fs::read_to_string(&args[1]).expect("Failed to read file");
    let segments = parse(&text);
    eprintln!("Input: {} insertions", segments.len());

    let config = Config::default();
    let mut set = PersistentSet::<u64, u64>::with_config(config).expect("default config is valid");
    for (i, s) in segments.iter().enumerate() {
        if let Err(fault) = set.insert(s.value, s.start, s.end) {
            eprintln!("Op {}: insert {} [{}, {}) faulted: {}", i + 1, s.value, s.start, s.end, fault);
            let mut rng = StdRng::seed_from_u64(0);
            let failing = segments[..=i].to_vec();
            let minimized = shrink::minimize(failing, &config, &mut rng);
            eprintln!("\n=== Minimized to {} insertions ===", minimized.len());
            for m in &minimized {
                println!("{} {} {}", m.value, m.start, m.end);
            }
            std::process::exit(2);
        }
    }

    set.verify().expect("structure is consistent");
    eprintln!("levels: {}", set.levels());
    eprintln!("{}", set.profiling().report());
    let last = segments
        .iter()
        .flat_map(|s| [s.start, s.end])
        .filter(|t| *t != u64::MAX)
        .max()
        .unwrap_or(0);
    for t in 0..=last.min(64) {
        eprintln!("  t={}: {:?}", t, set.slice(t));
    }

    let report = set.teardown();
    assert_eq!(report.nodes, 0, "nodes leaked");
    eprintln!("\nAll checks passed!");
}
