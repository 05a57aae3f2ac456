//! Permutation Traffic Patterns.
//!
//! Deterministic bit and digit permutations over the node address space,
//! the adversarial permutations for specific topologies, and the seeded
//! random permutation. The bit permutations require a power-of-two node
//! count; transpose additionally requires an even power so the address
//! splits into two equal halves.

use super::TrafficPattern;
use crate::common::ConfigError;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

fn require_power_of_two(pattern: &'static str, nodes: usize) -> Result<(), ConfigError> {
    if !nodes.is_power_of_two() {
        return Err(ConfigError::BadNodeCount {
            pattern,
            reason: format!("requires a power-of-two node count, got {}", nodes),
        });
    }
    Ok(())
}

/// Bitwise complement of the source address. Self-inverse.
pub struct BitCompPattern {
    nodes: usize,
}

impl BitCompPattern {
    pub fn new(nodes: usize) -> Result<Self, ConfigError> {
        require_power_of_two("bitcomp", nodes)?;
        Ok(Self { nodes })
    }
}

impl TrafficPattern for BitCompPattern {
    fn dest(&mut self, source: usize, _rng: &mut dyn RngCore) -> usize {
        assert!(source < self.nodes);
        !source & (self.nodes - 1)
    }
}

/// Swaps the upper and lower halves of the address bits.
pub struct TransposePattern {
    nodes: usize,
    shift: u32,
}

impl TransposePattern {
    pub fn new(nodes: usize) -> Result<Self, ConfigError> {
        require_power_of_two("transpose", nodes)?;
        let bits = nodes.trailing_zeros();
        if bits % 2 != 0 {
            return Err(ConfigError::BadNodeCount {
                pattern: "transpose",
                reason: format!("requires an even power-of-two node count, got {}", nodes),
            });
        }
        Ok(Self {
            nodes,
            shift: bits / 2,
        })
    }
}

impl TrafficPattern for TransposePattern {
    fn dest(&mut self, source: usize, _rng: &mut dyn RngCore) -> usize {
        assert!(source < self.nodes);
        let mask_lo = (1 << self.shift) - 1;
        let mask_hi = mask_lo << self.shift;
        ((source >> self.shift) & mask_lo) | ((source << self.shift) & mask_hi)
    }
}

/// Reverses the address bits of the source.
pub struct BitRevPattern {
    nodes: usize,
}

impl BitRevPattern {
    pub fn new(nodes: usize) -> Result<Self, ConfigError> {
        require_power_of_two("bitrev", nodes)?;
        Ok(Self { nodes })
    }
}

impl TrafficPattern for BitRevPattern {
    fn dest(&mut self, source: usize, _rng: &mut dyn RngCore) -> usize {
        assert!(source < self.nodes);
        let mut source = source;
        let mut result = 0;
        let mut n = self.nodes;
        while n > 1 {
            result = (result << 1) | (source & 1);
            source >>= 1;
            n >>= 1;
        }
        result
    }
}

/// Rotates the address bits left by one position.
pub struct ShufflePattern {
    nodes: usize,
}

impl ShufflePattern {
    pub fn new(nodes: usize) -> Result<Self, ConfigError> {
        require_power_of_two("shuffle", nodes)?;
        Ok(Self { nodes })
    }
}

impl TrafficPattern for ShufflePattern {
    fn dest(&mut self, source: usize, _rng: &mut dyn RngCore) -> usize {
        assert!(source < self.nodes);
        let shifted = source << 1;
        (shifted & (self.nodes - 1)) | usize::from(shifted & self.nodes != 0)
    }
}

/// Mixed-radix digit permutation: `n` digits of radix `xr * k`, each
/// offset by half the radix (rounded to land on the far side).
pub struct TornadoPattern {
    nodes: usize,
    k: usize,
    n: usize,
    xr: usize,
}

impl TornadoPattern {
    pub fn new(nodes: usize, k: usize, n: usize, xr: usize) -> Self {
        Self { nodes, k, n, xr }
    }
}

impl TrafficPattern for TornadoPattern {
    fn dest(&mut self, source: usize, _rng: &mut dyn RngCore) -> usize {
        assert!(source < self.nodes);
        let radix = self.xr * self.k;
        let mut offset = 1;
        let mut result = 0;
        for _ in 0..self.n {
            result += offset * (((source / offset) % radix + ((radix + 1) / 2 - 1)) % radix);
            offset *= radix;
        }
        result
    }
}

/// Mixed-radix digit permutation offsetting each digit by one.
pub struct NeighborPattern {
    nodes: usize,
    k: usize,
    n: usize,
    xr: usize,
}

impl NeighborPattern {
    pub fn new(nodes: usize, k: usize, n: usize, xr: usize) -> Self {
        Self { nodes, k, n, xr }
    }
}

impl TrafficPattern for NeighborPattern {
    fn dest(&mut self, source: usize, _rng: &mut dyn RngCore) -> usize {
        assert!(source < self.nodes);
        let radix = self.xr * self.k;
        let mut offset = 1;
        let mut result = 0;
        for _ in 0..self.n {
            result += offset * (((source / offset) % radix + 1) % radix);
            offset *= radix;
        }
        result
    }
}

/// Row/column adversarial permutation over an `xr * k` grid: the
/// destination row is the source's grid row, the column is random.
pub struct BadPermYarcPattern {
    nodes: usize,
    k: usize,
    xr: usize,
}

impl BadPermYarcPattern {
    pub fn new(nodes: usize, k: usize, _n: usize, xr: usize) -> Self {
        Self { nodes, k, xr }
    }
}

impl TrafficPattern for BadPermYarcPattern {
    fn dest(&mut self, source: usize, rng: &mut dyn RngCore) -> usize {
        assert!(source < self.nodes);
        let row_size = self.xr * self.k;
        let row = source / row_size;
        rng.gen_range(0..row_size) * row_size + row
    }
}

/// Adversarial pattern for the 1-D flattened butterfly: every source
/// targets a random endpoint of the next router.
pub struct BadFlatflyPattern {
    nodes: usize,
    k: usize,
}

impl BadFlatflyPattern {
    pub fn new(nodes: usize, k: usize, _n: usize) -> Self {
        Self { nodes, k }
    }
}

impl TrafficPattern for BadFlatflyPattern {
    fn dest(&mut self, source: usize, rng: &mut dyn RngCore) -> usize {
        assert!(source < self.nodes);
        assert!(self.nodes % self.k == 0);
        let c = self.nodes / self.k;
        let src_router = source / c;
        let dest_router = (src_router + 1) % self.k;
        dest_router * c + rng.gen_range(0..c)
    }
}

/// Adversarial pattern for the dragonfly: every source targets a random
/// endpoint of the next group (group size `2 * k * k`).
pub struct BadDragonPattern {
    nodes: usize,
    k: usize,
}

impl BadDragonPattern {
    pub fn new(nodes: usize, k: usize, _n: usize) -> Self {
        Self { nodes, k }
    }
}

impl TrafficPattern for BadDragonPattern {
    fn dest(&mut self, source: usize, rng: &mut dyn RngCore) -> usize {
        assert!(source < self.nodes);
        let grp_size_nodes = 2 * self.k * self.k;
        (rng.gen_range(0..grp_size_nodes) + (source / grp_size_nodes + 1) * grp_size_nodes)
            % self.nodes
    }
}

/// Seeded random bijection over the node space.
///
/// The mapping is fixed at construction from an isolated random stream
/// seeded with `seed`; the simulation's main stream is untouched. Each
/// destination is placed by drawing a rank uniformly among the unfilled
/// source slots and walking to that slot, which preserves uniqueness by
/// construction.
pub struct RandPermPattern {
    nodes: usize,
    dest: Vec<usize>,
}

impl RandPermPattern {
    pub fn new(nodes: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut dest: Vec<Option<usize>> = vec![None; nodes];

        for i in 0..nodes {
            let ind = rng.gen_range(0..nodes - i);

            let mut j = 0;
            let mut cnt = 0;
            while cnt < ind || dest[j].is_some() {
                if dest[j].is_none() {
                    cnt += 1;
                }
                j += 1;
                assert!(j < nodes, "random permutation ran out of slots");
            }
            dest[j] = Some(i);
        }

        let dest: Vec<usize> = dest.into_iter().map(|d| d.unwrap()).collect();
        for (src, d) in dest.iter().enumerate() {
            debug!("randperm pair: source {} -> dest {}", src, d);
        }
        Self { nodes, dest }
    }
}

impl TrafficPattern for RandPermPattern {
    fn dest(&mut self, source: usize, _rng: &mut dyn RngCore) -> usize {
        assert!(source < self.nodes);
        self.dest[source]
    }
}
