use crate::common::ConfigError;
use serde::Deserialize;
use std::fs;

const DEFAULT_NODES: usize = 16;
const DEFAULT_BATCH_SIZE: u64 = 100;
const DEFAULT_FABRIC_LATENCY: u64 = 8;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub general: GeneralConfig,

    #[serde(default)]
    pub topology: TopologyConfig,

    #[serde(default)]
    pub hotspot: HotspotConfig,

    pub traffic: TrafficConfig,

    #[serde(default)]
    pub sizes: SizeConfig,

    pub batch: BatchConfig,

    #[serde(default)]
    pub reorder: ReorderConfig,

    #[serde(default)]
    pub fabric: FabricConfig,
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string(),
            source: e,
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn non_empty<T>(name: &str, values: &[T]) -> Result<(), ConfigError> {
            if values.is_empty() {
                Err(ConfigError::Invalid(format!(
                    "{} must have at least one entry",
                    name
                )))
            } else {
                Ok(())
            }
        }

        non_empty("traffic.patterns", &self.traffic.patterns)?;
        non_empty("traffic.injection_process", &self.traffic.injection_process)?;
        non_empty("traffic.rates", &self.traffic.rates)?;
        non_empty("traffic.use_read_write", &self.traffic.use_read_write)?;
        non_empty("traffic.write_fraction", &self.traffic.write_fraction)?;
        non_empty("sizes.packet_size", &self.sizes.packet_size)?;
        non_empty("sizes.message_size", &self.sizes.message_size)?;
        non_empty("sizes.read_request_size", &self.sizes.read_request_size)?;
        non_empty("sizes.read_reply_size", &self.sizes.read_reply_size)?;
        non_empty("sizes.write_request_size", &self.sizes.write_request_size)?;
        non_empty("sizes.write_reply_size", &self.sizes.write_reply_size)?;
        non_empty(
            "sizes.read_request_message_size",
            &self.sizes.read_request_message_size,
        )?;
        non_empty(
            "sizes.read_reply_message_size",
            &self.sizes.read_reply_message_size,
        )?;
        non_empty(
            "sizes.write_request_message_size",
            &self.sizes.write_request_message_size,
        )?;
        non_empty(
            "sizes.write_reply_message_size",
            &self.sizes.write_reply_message_size,
        )?;

        if self.general.nodes == 0 {
            return Err(ConfigError::Invalid(
                "at least one node is required".to_string(),
            ));
        }
        if self.general.classes == 0 {
            return Err(ConfigError::Invalid(
                "at least one traffic class is required".to_string(),
            ));
        }
        if self.topology.k == 0 || self.topology.n == 0 || self.topology.xr == 0 {
            return Err(ConfigError::Invalid(
                "topology parameters k, n, and xr must be positive".to_string(),
            ));
        }
        for &node in self
            .hotspot
            .dests
            .iter()
            .chain(self.topology.compute_nodes.iter())
            .chain(self.topology.memory_nodes.iter())
        {
            if node >= self.general.nodes {
                return Err(ConfigError::Invalid(format!(
                    "node id {} out of range (nodes = {})",
                    node, self.general.nodes
                )));
            }
        }
        self.reorder.granularity_val()?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_nodes")]
    pub nodes: usize,

    #[serde(default = "default_classes")]
    pub classes: usize,

    #[serde(default)]
    pub seed: u64,

    #[serde(default)]
    pub watch_flits: Vec<u64>,
}

#[derive(Debug, Deserialize)]
pub struct TopologyConfig {
    #[serde(default = "default_k")]
    pub k: usize,

    #[serde(default = "default_n")]
    pub n: usize,

    #[serde(default = "default_xr")]
    pub xr: usize,

    /// Nodes that generate traffic. Empty means every node.
    #[serde(default)]
    pub compute_nodes: Vec<usize>,

    /// Nodes eligible as destinations for the selective patterns.
    /// Empty means every node.
    #[serde(default)]
    pub memory_nodes: Vec<usize>,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            n: default_n(),
            xr: default_xr(),
            compute_nodes: Vec::new(),
            memory_nodes: Vec::new(),
        }
    }
}

impl TopologyConfig {
    pub fn compute_nodes_val(&self, nodes: usize) -> Vec<usize> {
        if self.compute_nodes.is_empty() {
            (0..nodes).collect()
        } else {
            self.compute_nodes.clone()
        }
    }

    pub fn memory_nodes_val(&self, nodes: usize) -> Vec<usize> {
        if self.memory_nodes.is_empty() {
            (0..nodes).collect()
        } else {
            self.memory_nodes.clone()
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct HotspotConfig {
    /// Designated hotspot destinations; excluded from acting as traffic
    /// sources.
    #[serde(default)]
    pub dests: Vec<usize>,

    /// Sources participating in hotspot traffic.
    #[serde(default)]
    pub senders: Vec<usize>,

    /// When set, every source sends hotspot traffic regardless of the
    /// sender list.
    #[serde(default)]
    pub send_all: bool,
}

#[derive(Debug, Deserialize)]
pub struct TrafficConfig {
    pub patterns: Vec<String>,

    #[serde(default = "default_injection_process")]
    pub injection_process: Vec<String>,

    #[serde(default = "default_rates")]
    pub rates: Vec<f64>,

    #[serde(default = "default_use_read_write")]
    pub use_read_write: Vec<bool>,

    #[serde(default = "default_write_fraction")]
    pub write_fraction: Vec<f64>,

    /// When set, rates are flit rates and are normalized by the average
    /// message size in flits.
    #[serde(default)]
    pub injection_rate_uses_flits: bool,

    /// Fallback seed for `randperm` when the pattern spec carries none.
    #[serde(default)]
    pub perm_seed: Option<u64>,

    /// Destination-list length for `groupperm`.
    #[serde(default = "default_perm_elem")]
    pub perm_elem: usize,

    #[serde(default = "default_onoff_alpha")]
    pub onoff_alpha: f64,

    #[serde(default = "default_onoff_beta")]
    pub onoff_beta: f64,
}

impl TrafficConfig {
    pub fn patterns_val(&self, classes: usize) -> Vec<String> {
        extend_per_class(&self.patterns, classes)
    }

    pub fn injection_process_val(&self, classes: usize) -> Vec<String> {
        extend_per_class(&self.injection_process, classes)
    }

    pub fn rates_val(&self, classes: usize) -> Vec<f64> {
        extend_per_class(&self.rates, classes)
    }

    pub fn use_read_write_val(&self, classes: usize) -> Vec<bool> {
        extend_per_class(&self.use_read_write, classes)
    }

    pub fn write_fraction_val(&self, classes: usize) -> Vec<f64> {
        extend_per_class(&self.write_fraction, classes)
    }
}

#[derive(Debug, Deserialize)]
pub struct SizeConfig {
    /// Flits per packet for plain data messages.
    #[serde(default = "default_unit_sizes")]
    pub packet_size: Vec<usize>,

    /// Packets per plain data message; one size is drawn uniformly from
    /// the class's list per message.
    #[serde(default = "default_message_size")]
    pub message_size: Vec<Vec<usize>>,

    #[serde(default = "default_unit_sizes")]
    pub read_request_size: Vec<usize>,

    #[serde(default = "default_unit_sizes")]
    pub read_reply_size: Vec<usize>,

    #[serde(default = "default_unit_sizes")]
    pub write_request_size: Vec<usize>,

    #[serde(default = "default_unit_sizes")]
    pub write_reply_size: Vec<usize>,

    #[serde(default = "default_unit_sizes")]
    pub read_request_message_size: Vec<usize>,

    #[serde(default = "default_unit_sizes")]
    pub read_reply_message_size: Vec<usize>,

    #[serde(default = "default_unit_sizes")]
    pub write_request_message_size: Vec<usize>,

    #[serde(default = "default_unit_sizes")]
    pub write_reply_message_size: Vec<usize>,
}

impl Default for SizeConfig {
    fn default() -> Self {
        Self {
            packet_size: default_unit_sizes(),
            message_size: default_message_size(),
            read_request_size: default_unit_sizes(),
            read_reply_size: default_unit_sizes(),
            write_request_size: default_unit_sizes(),
            write_reply_size: default_unit_sizes(),
            read_request_message_size: default_unit_sizes(),
            read_reply_message_size: default_unit_sizes(),
            write_request_message_size: default_unit_sizes(),
            write_reply_message_size: default_unit_sizes(),
        }
    }
}

impl SizeConfig {
    pub fn packet_size_val(&self, classes: usize) -> Vec<usize> {
        extend_per_class(&self.packet_size, classes)
    }

    pub fn message_size_val(&self, classes: usize) -> Vec<Vec<usize>> {
        extend_per_class(&self.message_size, classes)
    }

    pub fn read_request_size_val(&self, classes: usize) -> Vec<usize> {
        extend_per_class(&self.read_request_size, classes)
    }

    pub fn read_reply_size_val(&self, classes: usize) -> Vec<usize> {
        extend_per_class(&self.read_reply_size, classes)
    }

    pub fn write_request_size_val(&self, classes: usize) -> Vec<usize> {
        extend_per_class(&self.write_request_size, classes)
    }

    pub fn write_reply_size_val(&self, classes: usize) -> Vec<usize> {
        extend_per_class(&self.write_reply_size, classes)
    }

    pub fn read_request_message_size_val(&self, classes: usize) -> Vec<usize> {
        extend_per_class(&self.read_request_message_size, classes)
    }

    pub fn read_reply_message_size_val(&self, classes: usize) -> Vec<usize> {
        extend_per_class(&self.read_reply_message_size, classes)
    }

    pub fn write_request_message_size_val(&self, classes: usize) -> Vec<usize> {
        extend_per_class(&self.write_request_message_size, classes)
    }

    pub fn write_reply_message_size_val(&self, classes: usize) -> Vec<usize> {
        extend_per_class(&self.write_reply_message_size, classes)
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_batch_size")]
    pub size: u64,

    #[serde(default = "default_batch_count")]
    pub count: u64,

    /// Per-node cap on issued-but-unanswered requests; zero disables the
    /// cap.
    #[serde(default)]
    pub max_outstanding: u64,

    /// Path for the raw sent-unit log. Empty disables logging.
    #[serde(default)]
    pub sent_log: String,
}

#[derive(Debug, Deserialize)]
pub struct ReorderConfig {
    #[serde(default = "default_granularity")]
    pub granularity: String,
}

impl Default for ReorderConfig {
    fn default() -> Self {
        Self {
            granularity: default_granularity(),
        }
    }
}

impl ReorderConfig {
    pub fn granularity_val(&self) -> Result<crate::reorder::Granularity, ConfigError> {
        match self.granularity.as_str() {
            "packet" => Ok(crate::reorder::Granularity::Packet),
            "message" => Ok(crate::reorder::Granularity::Message),
            other => Err(ConfigError::Invalid(format!(
                "unknown reorder granularity: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FabricConfig {
    #[serde(default = "default_fabric_latency")]
    pub latency: u64,

    /// Uniform extra delay in [0, jitter] drawn per packet; nonzero
    /// values make packets leave the fabric out of order.
    #[serde(default)]
    pub jitter: u64,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            latency: default_fabric_latency(),
            jitter: 0,
        }
    }
}

/// Extends a per-class option list to `classes` entries by repeating the
/// last value, matching the original configuration convention.
pub fn extend_per_class<T: Clone>(values: &[T], classes: usize) -> Vec<T> {
    assert!(!values.is_empty(), "per-class option list is empty");
    let mut out = values.to_vec();
    let last = out.last().unwrap().clone();
    out.resize(classes, last);
    out.truncate(classes);
    out
}

fn default_nodes() -> usize {
    DEFAULT_NODES
}

fn default_classes() -> usize {
    1
}

fn default_k() -> usize {
    4
}

fn default_n() -> usize {
    1
}

fn default_xr() -> usize {
    1
}

fn default_injection_process() -> Vec<String> {
    vec!["bernoulli".to_string()]
}

fn default_rates() -> Vec<f64> {
    vec![0.0]
}

fn default_use_read_write() -> Vec<bool> {
    vec![false]
}

fn default_write_fraction() -> Vec<f64> {
    vec![0.5]
}

fn default_perm_elem() -> usize {
    1
}

fn default_onoff_alpha() -> f64 {
    0.01
}

fn default_onoff_beta() -> f64 {
    0.1
}

fn default_unit_sizes() -> Vec<usize> {
    vec![1]
}

fn default_message_size() -> Vec<Vec<usize>> {
    vec![vec![1]]
}

fn default_batch_size() -> u64 {
    DEFAULT_BATCH_SIZE
}

fn default_batch_count() -> u64 {
    1
}

fn default_granularity() -> String {
    "message".to_string()
}

fn default_fabric_latency() -> u64 {
    DEFAULT_FABRIC_LATENCY
}
