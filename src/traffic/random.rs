//! Random Traffic Patterns.
//!
//! Uniform and constrained-random destination selection, the selective
//! patterns that restrict destinations to the configured memory nodes,
//! hotspot traffic, and the lazily built load-balanced group
//! permutation. Constraints are enforced by rejection sampling: draw
//! until the constraint holds.

use super::TrafficPattern;
use crate::common::ConfigError;
use log::debug;
use rand::{Rng, RngCore};
use std::collections::HashSet;

/// Uniform over all nodes.
pub struct UniformPattern {
    nodes: usize,
}

impl UniformPattern {
    pub fn new(nodes: usize) -> Self {
        Self { nodes }
    }
}

impl TrafficPattern for UniformPattern {
    fn dest(&mut self, source: usize, rng: &mut dyn RngCore) -> usize {
        assert!(source < self.nodes);
        rng.gen_range(0..self.nodes)
    }
}

/// Uniform over nodes outside the source's group of `k` endpoints.
pub struct UniformInterPattern {
    nodes: usize,
    k: usize,
}

impl UniformInterPattern {
    pub fn new(nodes: usize, k: usize) -> Self {
        Self { nodes, k }
    }
}

impl TrafficPattern for UniformInterPattern {
    fn dest(&mut self, source: usize, rng: &mut dyn RngCore) -> usize {
        assert!(source < self.nodes);
        let mut dest = rng.gen_range(0..self.nodes);
        while source / self.k == dest / self.k {
            dest = rng.gen_range(0..self.nodes);
        }
        dest
    }
}

/// Uniform over the memory-node subset.
pub struct UniformSelectivePattern {
    nodes: usize,
    memory_nodes: HashSet<usize>,
}

impl UniformSelectivePattern {
    pub fn new(nodes: usize, memory_nodes: HashSet<usize>) -> Self {
        assert!(!memory_nodes.is_empty(), "selective pattern with no memory nodes");
        Self { nodes, memory_nodes }
    }
}

impl TrafficPattern for UniformSelectivePattern {
    fn dest(&mut self, source: usize, rng: &mut dyn RngCore) -> usize {
        assert!(source < self.nodes);
        let mut dest = rng.gen_range(0..self.nodes);
        while !self.memory_nodes.contains(&dest) {
            dest = rng.gen_range(0..self.nodes);
        }
        dest
    }
}

/// Fixed random mapping onto the memory nodes, built lazily on first
/// use from the main stream. Unlike `randperm` the mapping is not a
/// bijection; endpoint contention at popular memory nodes is the point.
pub struct RandPermSelectivePattern {
    nodes: usize,
    memory_nodes: HashSet<usize>,
    dest: Vec<Option<usize>>,
}

impl RandPermSelectivePattern {
    pub fn new(nodes: usize, memory_nodes: HashSet<usize>) -> Self {
        assert!(!memory_nodes.is_empty(), "selective pattern with no memory nodes");
        Self {
            nodes,
            memory_nodes,
            dest: Vec::new(),
        }
    }
}

impl TrafficPattern for RandPermSelectivePattern {
    fn dest(&mut self, source: usize, rng: &mut dyn RngCore) -> usize {
        assert!(source < self.nodes);

        if self.dest.is_empty() {
            self.dest = (0..self.nodes)
                .map(|_| {
                    let mut d = rng.gen_range(0..self.nodes);
                    while !self.memory_nodes.contains(&d) {
                        d = rng.gen_range(0..self.nodes);
                    }
                    Some(d)
                })
                .collect();
        }

        self.dest[source].expect("selective permutation has no entry for source")
    }
}

/// Load-balanced group permutation.
///
/// On first use, builds a per-source list of `perm_elem` unique
/// destinations drawn from a pool shared across all sources. The pool
/// starts as all nodes and is refilled whenever it empties; an entry is
/// removed once a source accepts it, so each refill round hands every
/// node to exactly one source and all nodes end up selected an equal
/// number of times. Later calls pick uniformly from the per-source list.
pub struct GroupPermPattern {
    nodes: usize,
    perm_elem: usize,
    pool: Vec<usize>,
    dest_lists: Vec<Vec<usize>>,
}

impl GroupPermPattern {
    pub fn new(nodes: usize, perm_elem: usize) -> Self {
        assert!(perm_elem > 0, "groupperm requires a positive list size");
        Self {
            nodes,
            perm_elem,
            pool: Vec::new(),
            dest_lists: Vec::new(),
        }
    }

    fn build(&mut self, rng: &mut dyn RngCore) {
        self.dest_lists = vec![Vec::new(); self.nodes];
        for src in 0..self.nodes {
            while self.dest_lists[src].len() < self.perm_elem {
                if self.pool.is_empty() {
                    self.pool = (0..self.nodes).collect();
                }

                let idx = rng.gen_range(0..self.pool.len());
                self.dest_lists[src].push(self.pool[idx]);

                // A draw that survives dedup was new for this source;
                // only then does the entry leave the shared pool.
                let before = self.dest_lists[src].len();
                self.dest_lists[src].sort_unstable();
                self.dest_lists[src].dedup();
                if self.dest_lists[src].len() == before {
                    self.pool.swap_remove(idx);
                }
            }
            debug!("groupperm: node {} -> {:?}", src, self.dest_lists[src]);
        }
    }

    /// Destination lists per source, built on first call.
    pub fn destinations(&mut self, rng: &mut dyn RngCore) -> &[Vec<usize>] {
        if self.dest_lists.is_empty() {
            self.build(rng);
        }
        &self.dest_lists
    }
}

impl TrafficPattern for GroupPermPattern {
    fn dest(&mut self, source: usize, rng: &mut dyn RngCore) -> usize {
        assert!(source < self.nodes);

        if self.dest_lists.is_empty() {
            self.build(rng);
        }

        let list = &self.dest_lists[source];
        list[rng.gen_range(0..list.len())]
    }
}

/// Deterministic worst case for modulo source/destination hashing.
pub struct ModuloWorstPattern {
    nodes: usize,
    k: usize,
}

impl ModuloWorstPattern {
    pub fn new(nodes: usize, k: usize) -> Self {
        Self { nodes, k }
    }
}

impl TrafficPattern for ModuloWorstPattern {
    fn dest(&mut self, source: usize, _rng: &mut dyn RngCore) -> usize {
        assert!(source < self.nodes);
        assert!(self.nodes % self.k == 0);
        let src_router = source / self.k;
        let dest_router = (source % self.k) * self.k;
        (dest_router + src_router) % self.nodes
    }
}

/// Constrained-random best case for modulo hashing: a memory node whose
/// modulo-`k` residue matches the source's.
pub struct ModuloBestPattern {
    nodes: usize,
    k: usize,
    memory_nodes: HashSet<usize>,
}

impl ModuloBestPattern {
    pub fn new(nodes: usize, k: usize, memory_nodes: HashSet<usize>) -> Self {
        assert!(!memory_nodes.is_empty(), "selective pattern with no memory nodes");
        Self {
            nodes,
            k,
            memory_nodes,
        }
    }
}

impl TrafficPattern for ModuloBestPattern {
    fn dest(&mut self, source: usize, rng: &mut dyn RngCore) -> usize {
        assert!(source < self.nodes);
        assert!(self.nodes % self.k == 0);
        let mut dest = rng.gen_range(0..self.nodes);
        while !self.memory_nodes.contains(&dest) || dest % self.k != source % self.k {
            dest = rng.gen_range(0..self.nodes);
        }
        dest
    }
}

/// Uniform over the designated hotspot destinations.
///
/// Sources outside the hotspot-sender set may only appear here when the
/// send-all override is active; anything else is a wiring error in the
/// controller.
pub struct RandHotspotPattern {
    nodes: usize,
    hotspot_dests: HashSet<usize>,
    hotspot_senders: HashSet<usize>,
    send_all: bool,
}

impl RandHotspotPattern {
    pub fn new(
        nodes: usize,
        hotspot_dests: HashSet<usize>,
        hotspot_senders: HashSet<usize>,
        send_all: bool,
    ) -> Self {
        assert!(!hotspot_dests.is_empty(), "rand_hotspot with no hotspot destinations");
        Self {
            nodes,
            hotspot_dests,
            hotspot_senders,
            send_all,
        }
    }
}

impl TrafficPattern for RandHotspotPattern {
    fn dest(&mut self, source: usize, rng: &mut dyn RngCore) -> usize {
        assert!(source < self.nodes);
        if !self.send_all && !self.hotspot_senders.contains(&source) {
            panic!("node {} is not a hotspot sender", source);
        }
        let mut dest = rng.gen_range(0..self.nodes);
        while !self.hotspot_dests.contains(&dest) {
            dest = rng.gen_range(0..self.nodes);
        }
        dest
    }
}

/// Uniform background traffic avoiding both hotspot destinations and
/// hotspot senders.
pub struct BackgroundUniformPattern {
    nodes: usize,
    hotspot_dests: HashSet<usize>,
    hotspot_senders: HashSet<usize>,
}

impl BackgroundUniformPattern {
    pub fn new(
        nodes: usize,
        hotspot_dests: HashSet<usize>,
        hotspot_senders: HashSet<usize>,
    ) -> Self {
        Self {
            nodes,
            hotspot_dests,
            hotspot_senders,
        }
    }
}

impl TrafficPattern for BackgroundUniformPattern {
    fn dest(&mut self, source: usize, rng: &mut dyn RngCore) -> usize {
        assert!(source < self.nodes);
        let mut dest = rng.gen_range(0..self.nodes);
        while self.hotspot_dests.contains(&dest) || self.hotspot_senders.contains(&dest) {
            dest = rng.gen_range(0..self.nodes);
        }
        dest
    }
}

/// Uniform over all nodes except an explicit excluded list.
pub struct BackgroundPattern {
    nodes: usize,
    excluded: HashSet<usize>,
}

impl BackgroundPattern {
    pub fn new(nodes: usize, excluded_nodes: &[i64]) -> Result<Self, ConfigError> {
        let mut excluded = HashSet::new();
        for &node in excluded_nodes {
            if node < 0 || node as usize >= nodes {
                return Err(ConfigError::BadParameter {
                    pattern: "background".to_string(),
                    param: "excluded_nodes",
                    value: node.to_string(),
                });
            }
            excluded.insert(node as usize);
        }
        if excluded.len() >= nodes {
            return Err(ConfigError::BadNodeCount {
                pattern: "background",
                reason: "every node is excluded".to_string(),
            });
        }
        Ok(Self { nodes, excluded })
    }
}

impl TrafficPattern for BackgroundPattern {
    fn dest(&mut self, source: usize, rng: &mut dyn RngCore) -> usize {
        assert!(source < self.nodes);
        loop {
            let result = rng.gen_range(0..self.nodes);
            if !self.excluded.contains(&result) {
                return result;
            }
        }
    }
}

/// Next node with probability 1/3, self otherwise.
pub struct DiagonalPattern {
    nodes: usize,
}

impl DiagonalPattern {
    pub fn new(nodes: usize) -> Self {
        Self { nodes }
    }
}

impl TrafficPattern for DiagonalPattern {
    fn dest(&mut self, source: usize, rng: &mut dyn RngCore) -> usize {
        assert!(source < self.nodes);
        if rng.gen_range(0..3) == 0 {
            (source + 1) % self.nodes
        } else {
            source
        }
    }
}

/// Folds the node space in half; a coin flip selects the half.
pub struct AsymmetricPattern {
    nodes: usize,
}

impl AsymmetricPattern {
    pub fn new(nodes: usize) -> Self {
        Self { nodes }
    }
}

impl TrafficPattern for AsymmetricPattern {
    fn dest(&mut self, source: usize, rng: &mut dyn RngCore) -> usize {
        assert!(source < self.nodes);
        let half = self.nodes / 2;
        source % half + if rng.gen_range(0..2) == 1 { half } else { 0 }
    }
}

/// 64-node taper: half the traffic lands in the source's ±8/±1
/// neighborhood, the rest is uniform.
pub struct Taper64Pattern {
    nodes: usize,
}

impl Taper64Pattern {
    pub fn new(nodes: usize) -> Result<Self, ConfigError> {
        if nodes != 64 {
            return Err(ConfigError::BadNodeCount {
                pattern: "taper64",
                reason: format!("requires exactly 64 nodes, got {}", nodes),
            });
        }
        Ok(Self { nodes })
    }
}

impl TrafficPattern for Taper64Pattern {
    fn dest(&mut self, source: usize, rng: &mut dyn RngCore) -> usize {
        assert!(source < self.nodes);
        if rng.gen_range(0..2) == 1 {
            let row = rng.gen_range(0..3) as i64 - 1;
            let col = rng.gen_range(0..3) as i64 - 1;
            ((64 + source as i64 + 8 * row + col) % 64) as usize
        } else {
            rng.gen_range(0..self.nodes)
        }
    }
}

/// Weighted selection among a fixed list of hotspot destinations.
///
/// Weights accumulate into a cumulative total; a uniform draw over the
/// total picks the first hotspot whose cumulative weight exceeds the
/// draw, so ties favor earlier entries.
pub struct HotspotPattern {
    nodes: usize,
    hotspots: Vec<usize>,
    rates: Vec<u64>,
    total: u64,
}

impl HotspotPattern {
    pub fn new(nodes: usize, hotspots: Vec<usize>, rates: Vec<u64>) -> Result<Self, ConfigError> {
        if hotspots.is_empty() {
            return Err(ConfigError::MissingParameter {
                pattern: "hotspot".to_string(),
                param: "hotspots",
            });
        }
        let mut rates = rates;
        let fill = rates.last().copied().unwrap_or(1);
        rates.resize(hotspots.len(), fill);
        rates.truncate(hotspots.len());

        let mut total = 0;
        for (&hotspot, &rate) in hotspots.iter().zip(rates.iter()) {
            if hotspot >= nodes {
                return Err(ConfigError::BadParameter {
                    pattern: "hotspot".to_string(),
                    param: "hotspots",
                    value: hotspot.to_string(),
                });
            }
            if rate == 0 {
                return Err(ConfigError::BadParameter {
                    pattern: "hotspot".to_string(),
                    param: "rates",
                    value: rate.to_string(),
                });
            }
            total += rate;
        }
        Ok(Self {
            nodes,
            hotspots,
            rates,
            total,
        })
    }
}

impl TrafficPattern for HotspotPattern {
    fn dest(&mut self, source: usize, rng: &mut dyn RngCore) -> usize {
        assert!(source < self.nodes);

        if self.hotspots.len() == 1 {
            return self.hotspots[0];
        }

        let mut pct = rng.gen_range(0..self.total);
        for (&hotspot, &rate) in self
            .hotspots
            .iter()
            .zip(self.rates.iter())
            .take(self.hotspots.len() - 1)
        {
            if rate > pct {
                return hotspot;
            }
            pct -= rate;
        }
        assert!(*self.rates.last().unwrap() > pct);
        *self.hotspots.last().unwrap()
    }
}
