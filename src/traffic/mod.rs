//! Traffic Pattern Engine.
//!
//! This module defines the destination-selection strategies that drive
//! traffic generation. A pattern is built from a spec string of the form
//! `name` or `name(p1,p2,...)` and exposes a single operation mapping a
//! source node to a destination node. Patterns that consume randomness
//! draw from the simulation's main random stream, which the caller
//! threads through every call; the seeded random permutation is the one
//! exception and builds its own isolated stream at construction.

use crate::common::ConfigError;
use crate::config::Config;
use rand::{Rng, RngCore};
use std::collections::HashSet;

/// Deterministic and randomized bit/digit permutations.
pub mod permutation;

/// Random, selective, and hotspot destination selection.
pub mod random;

use permutation::{
    BadDragonPattern, BadFlatflyPattern, BadPermYarcPattern, BitCompPattern, BitRevPattern,
    NeighborPattern, RandPermPattern, ShufflePattern, TornadoPattern, TransposePattern,
};
use random::{
    AsymmetricPattern, BackgroundPattern, BackgroundUniformPattern, DiagonalPattern,
    GroupPermPattern, HotspotPattern, ModuloBestPattern, ModuloWorstPattern, RandHotspotPattern,
    RandPermSelectivePattern, Taper64Pattern, UniformInterPattern, UniformPattern,
    UniformSelectivePattern,
};

/// Destination-selection strategy.
///
/// Implementations may keep lazily built state (the group permutation
/// builds its destination lists on first use), hence `&mut self`.
pub trait TrafficPattern {
    /// Selects the destination node for a unit injected at `source`.
    fn dest(&mut self, source: usize, rng: &mut dyn RngCore) -> usize;
}

/// Construction context for the pattern factory.
///
/// Carries the configuration fallbacks a pattern may need when its spec
/// string omits inline parameters, plus the node-class sets consumed by
/// the selective patterns.
#[derive(Clone, Debug)]
pub struct PatternParams {
    /// Radix of one routing digit.
    pub k: usize,
    /// Number of routing digits.
    pub n: usize,
    /// Concentration factor multiplying the digit radix.
    pub xr: usize,
    /// Configuration fallback seed for `randperm`.
    pub perm_seed: Option<u64>,
    /// Destination-list length for `groupperm`.
    pub perm_elem: usize,
    /// Nodes acting as traffic sources.
    pub compute_nodes: HashSet<usize>,
    /// Nodes the selective patterns may target.
    pub memory_nodes: HashSet<usize>,
    /// Designated hotspot destinations.
    pub hotspot_dests: HashSet<usize>,
    /// Sources participating in hotspot traffic.
    pub hotspot_senders: HashSet<usize>,
    /// Every source sends hotspot traffic when set.
    pub hotspot_send_all: bool,
}

impl PatternParams {
    /// Neutral parameters over `nodes` endpoints: single-digit radix 1,
    /// every node both compute and memory, no hotspots.
    pub fn for_nodes(nodes: usize) -> Self {
        Self {
            k: 1,
            n: 1,
            xr: 1,
            perm_seed: None,
            perm_elem: 1,
            compute_nodes: (0..nodes).collect(),
            memory_nodes: (0..nodes).collect(),
            hotspot_dests: HashSet::new(),
            hotspot_senders: HashSet::new(),
            hotspot_send_all: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let nodes = config.general.nodes;
        Self {
            k: config.topology.k,
            n: config.topology.n,
            xr: config.topology.xr,
            perm_seed: config.traffic.perm_seed,
            perm_elem: config.traffic.perm_elem,
            compute_nodes: config.topology.compute_nodes_val(nodes).into_iter().collect(),
            memory_nodes: config.topology.memory_nodes_val(nodes).into_iter().collect(),
            hotspot_dests: config.hotspot.dests.iter().copied().collect(),
            hotspot_senders: config.hotspot.senders.iter().copied().collect(),
            hotspot_send_all: config.hotspot.send_all,
        }
    }
}

/// Builds the pattern named by `spec` over `nodes` endpoints.
///
/// `rng` is the main simulation stream; it is consumed here only where
/// the original semantics call for it (randomizing negative hotspot
/// entries). Unknown names, missing parameters, and structurally
/// incompatible node counts are construction errors.
pub fn build(
    spec: &str,
    nodes: usize,
    params: &PatternParams,
    rng: &mut dyn RngCore,
) -> Result<Box<dyn TrafficPattern>, ConfigError> {
    let (name, args) = parse_spec(spec);

    let pattern: Box<dyn TrafficPattern> = match name.as_str() {
        "bitcomp" => Box::new(BitCompPattern::new(nodes)?),
        "transpose" => Box::new(TransposePattern::new(nodes)?),
        "bitrev" => Box::new(BitRevPattern::new(nodes)?),
        "shuffle" => Box::new(ShufflePattern::new(nodes)?),
        "randperm" => {
            let seed = match args.first() {
                Some(arg) => parse_int(spec, "perm_seed", arg)?,
                None => params.perm_seed.ok_or(ConfigError::MissingParameter {
                    pattern: spec.to_string(),
                    param: "perm_seed",
                })?,
            };
            Box::new(RandPermPattern::new(nodes, seed))
        }
        "tornado" | "neighbor" | "badperm_yarc" => {
            let k = digit_param(spec, &args, 0, params.k)?;
            let n = digit_param(spec, &args, 1, params.n)?;
            let xr = digit_param(spec, &args, 2, params.xr)?;
            match name.as_str() {
                "tornado" => Box::new(TornadoPattern::new(nodes, k, n, xr)),
                "neighbor" => Box::new(NeighborPattern::new(nodes, k, n, xr)),
                _ => Box::new(BadPermYarcPattern::new(nodes, k, n, xr)),
            }
        }
        "bad_flatfly" => {
            let k = digit_param(spec, &args, 0, params.k)?;
            let n = digit_param(spec, &args, 1, params.n)?;
            Box::new(BadFlatflyPattern::new(nodes, k, n))
        }
        "bad_dragon" => {
            let k = digit_param(spec, &args, 0, params.k)?;
            let n = digit_param(spec, &args, 1, params.n)?;
            Box::new(BadDragonPattern::new(nodes, k, n))
        }
        "uniform" => Box::new(UniformPattern::new(nodes)),
        "uniform_inter" => Box::new(UniformInterPattern::new(nodes, params.k)),
        "uniform_sel" => Box::new(UniformSelectivePattern::new(
            nodes,
            params.memory_nodes.clone(),
        )),
        "randperm_sel" => Box::new(RandPermSelectivePattern::new(
            nodes,
            params.memory_nodes.clone(),
        )),
        "groupperm" => {
            if params.perm_elem == 0 {
                return Err(ConfigError::MissingParameter {
                    pattern: spec.to_string(),
                    param: "perm_elem",
                });
            }
            Box::new(GroupPermPattern::new(nodes, params.perm_elem))
        }
        "modulo_worst" => Box::new(ModuloWorstPattern::new(nodes, params.k)),
        "modulo_best" => Box::new(ModuloBestPattern::new(
            nodes,
            params.k,
            params.memory_nodes.clone(),
        )),
        "rand_hotspot" => Box::new(RandHotspotPattern::new(
            nodes,
            params.hotspot_dests.clone(),
            params.hotspot_senders.clone(),
            params.hotspot_send_all,
        )),
        "background_uniform" => Box::new(BackgroundUniformPattern::new(
            nodes,
            params.hotspot_dests.clone(),
            params.hotspot_senders.clone(),
        )),
        "background" => {
            let arg = args.first().ok_or(ConfigError::MissingParameter {
                pattern: spec.to_string(),
                param: "excluded_nodes",
            })?;
            let excluded = parse_int_list(spec, "excluded_nodes", arg)?;
            Box::new(BackgroundPattern::new(nodes, &excluded)?)
        }
        "diagonal" => Box::new(DiagonalPattern::new(nodes)),
        "asymmetric" => Box::new(AsymmetricPattern::new(nodes)),
        "taper64" => Box::new(Taper64Pattern::new(nodes)?),
        "hotspot" => {
            let mut hotspots = match args.first() {
                Some(arg) => parse_int_list(spec, "hotspots", arg)?,
                None => vec![-1],
            };
            for spot in hotspots.iter_mut() {
                if *spot < 0 {
                    *spot = rng.gen_range(0..nodes) as i64;
                }
            }
            let hotspots: Vec<usize> = hotspots.into_iter().map(|h| h as usize).collect();
            let rates = match args.get(1) {
                Some(arg) => parse_int_list(spec, "rates", arg)?
                    .into_iter()
                    .map(|r| r as u64)
                    .collect(),
                None => vec![1; hotspots.len()],
            };
            Box::new(HotspotPattern::new(nodes, hotspots, rates)?)
        }
        _ => return Err(ConfigError::UnknownPattern(spec.to_string())),
    };
    Ok(pattern)
}

/// Splits `name(p1,p2,...)` into the name and its top-level parameters.
///
/// Braced groups are kept intact so `hotspot({4,6},{2,1})` yields two
/// parameters. A missing closing parenthesis consumes to end of string,
/// as in the original parser.
fn parse_spec(spec: &str) -> (String, Vec<String>) {
    let Some(left) = spec.find('(') else {
        return (spec.to_string(), Vec::new());
    };
    let name = spec[..left].to_string();
    let inner = match spec.rfind(')') {
        Some(right) if right > left => &spec[left + 1..right],
        _ => &spec[left + 1..],
    };

    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in inner.chars() {
        match ch {
            '{' => {
                depth += 1;
                current.push(ch);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        args.push(current.trim().to_string());
    }
    (name, args)
}

fn parse_int<T: std::str::FromStr>(
    pattern: &str,
    param: &'static str,
    value: &str,
) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::BadParameter {
        pattern: pattern.to_string(),
        param,
        value: value.to_string(),
    })
}

/// Parses `{a,b,c}` (or a bare `a`) into a list of integers.
fn parse_int_list(
    pattern: &str,
    param: &'static str,
    value: &str,
) -> Result<Vec<i64>, ConfigError> {
    let inner = value
        .trim()
        .trim_start_matches('{')
        .trim_end_matches('}');
    inner
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| parse_int(pattern, param, s.trim()))
        .collect()
}

fn digit_param(
    spec: &str,
    args: &[String],
    index: usize,
    fallback: usize,
) -> Result<usize, ConfigError> {
    match args.get(index) {
        Some(arg) => parse_int(spec, ["k", "n", "xr"][index], arg),
        None => Ok(fallback),
    }
}
