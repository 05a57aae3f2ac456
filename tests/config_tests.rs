//! Integration tests for configuration loading.

use noc_traffic::common::ConfigError;
use noc_traffic::config::{extend_per_class, Config};
use noc_traffic::reorder::Granularity;

fn config_from(toml_str: &str) -> Config {
    toml::from_str(toml_str).expect("config should parse")
}

const MINIMAL: &str = r#"
    [general]

    [traffic]
    patterns = ["uniform"]

    [batch]
"#;

/// Tests that a minimal config picks up every default.
#[test]
fn test_minimal_config_defaults() {
    let config = config_from(MINIMAL);
    assert_eq!(config.general.nodes, 16);
    assert_eq!(config.general.classes, 1);
    assert_eq!(config.batch.size, 100);
    assert_eq!(config.batch.count, 1);
    assert_eq!(config.batch.max_outstanding, 0);
    assert!(config.batch.sent_log.is_empty());
    assert_eq!(config.fabric.latency, 8);
    assert_eq!(config.fabric.jitter, 0);
    assert_eq!(
        config.reorder.granularity_val().unwrap(),
        Granularity::Message
    );
    assert!(config.validate().is_ok());
}

/// Tests that per-class lists extend with their last value.
#[test]
fn test_per_class_extension() {
    assert_eq!(extend_per_class(&[1, 2], 4), vec![1, 2, 2, 2]);
    assert_eq!(extend_per_class(&[7], 3), vec![7, 7, 7]);
    assert_eq!(extend_per_class(&[1, 2, 3, 4], 2), vec![1, 2]);
}

/// Tests per-class accessors against a two-class config.
#[test]
fn test_two_class_resolution() {
    let config = config_from(
        r#"
        [general]
        classes = 2

        [traffic]
        patterns = ["uniform"]
        rates = [0.1, 0.3]
        use_read_write = [true]

        [batch]
        "#,
    );
    assert_eq!(config.traffic.patterns_val(2), vec!["uniform", "uniform"]);
    assert_eq!(config.traffic.rates_val(2), vec![0.1, 0.3]);
    assert_eq!(config.traffic.use_read_write_val(2), vec![true, true]);
}

/// Tests that an unknown reorder granularity fails validation.
#[test]
fn test_bad_granularity_rejected() {
    let config = config_from(
        r#"
        [general]

        [traffic]
        patterns = ["uniform"]

        [batch]

        [reorder]
        granularity = "flow"
        "#,
    );
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

/// Tests that node ids outside the node space fail validation.
#[test]
fn test_out_of_range_hotspot_rejected() {
    let config = config_from(
        r#"
        [general]
        nodes = 4

        [hotspot]
        dests = [9]

        [traffic]
        patterns = ["uniform"]

        [batch]
        "#,
    );
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

/// Tests that a zero node count fails validation.
#[test]
fn test_zero_nodes_rejected() {
    let config = config_from(
        r#"
        [general]
        nodes = 0

        [traffic]
        patterns = ["uniform"]

        [batch]
        "#,
    );
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

/// Tests that empty node-class lists resolve to every node.
#[test]
fn test_node_sets_default_to_all() {
    let config = config_from(MINIMAL);
    assert_eq!(config.topology.compute_nodes_val(4), vec![0, 1, 2, 3]);
    assert_eq!(config.topology.memory_nodes_val(3), vec![0, 1, 2]);
}

/// Tests that a missing config file reports an I/O error.
#[test]
fn test_missing_file_reports_io_error() {
    let err = Config::from_file("/nonexistent/noc-traffic.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
