//! Integration tests for statistics collection and reporting.

use noc_traffic::stats::{SampleStats, SimStats};

/// Tests min/average/max tracking over a sample stream.
#[test]
fn test_sample_stats_tracking() {
    let mut stats = SampleStats::default();
    assert_eq!(stats.count(), 0);
    assert_eq!(stats.average(), 0.0);

    stats.add_sample(4.0);
    stats.add_sample(10.0);
    stats.add_sample(1.0);

    assert_eq!(stats.count(), 3);
    assert_eq!(stats.min(), 1.0);
    assert_eq!(stats.max(), 10.0);
    assert_eq!(stats.average(), 5.0);
}

/// Tests the CSV row fragment layout: three latency columns followed by
/// three batch-duration columns.
#[test]
fn test_csv_fragment() {
    let mut stats = SimStats::new(1);
    stats.packet_latency[0].add_sample(8.0);
    stats.batch_time.add_sample(100.0);
    stats.batch_time.add_sample(200.0);

    let row = stats.overall_stats_csv(0);
    assert_eq!(row, "8,8,8,100,150,200");
}

/// Tests the free-form text summary statements.
#[test]
fn test_write_stats_statements() {
    let mut stats = SimStats::new(1);
    stats.cycles = 77;
    stats.batch_time.add_sample(42.0);

    let mut out = Vec::new();
    stats.write_stats(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("sim_cycles = 77;"));
    assert!(text.contains("batch_time = 42;"));
}

/// Tests that the JSON dump is well-formed and carries the counters.
#[test]
fn test_json_dump() {
    let mut stats = SimStats::new(2);
    stats.sent_messages[1] = 9;

    let json = stats.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["sent_messages"][1], 9);
    assert_eq!(value["cycles"], 0);
}
