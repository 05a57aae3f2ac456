//! Integration tests for the traffic pattern engine.

use noc_traffic::common::ConfigError;
use noc_traffic::traffic::random::GroupPermPattern;
use noc_traffic::traffic::{self, PatternParams, TrafficPattern};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

fn build(spec: &str, nodes: usize, params: &PatternParams) -> Box<dyn TrafficPattern> {
    let mut rng = StdRng::seed_from_u64(7);
    traffic::build(spec, nodes, params, &mut rng).expect("pattern should build")
}

fn build_err(spec: &str, nodes: usize, params: &PatternParams) -> ConfigError {
    let mut rng = StdRng::seed_from_u64(7);
    traffic::build(spec, nodes, params, &mut rng).err().expect("pattern should fail")
}

/// Tests the bit-complement example table for four nodes.
#[test]
fn test_bitcomp_four_nodes() {
    let params = PatternParams::for_nodes(4);
    let mut pattern = build("bitcomp", 4, &params);
    let mut rng = StdRng::seed_from_u64(0);

    assert_eq!(pattern.dest(0, &mut rng), 3);
    assert_eq!(pattern.dest(1, &mut rng), 2);
    assert_eq!(pattern.dest(2, &mut rng), 1);
    assert_eq!(pattern.dest(3, &mut rng), 0);
}

/// Tests that bit-complement is self-inverse for every power-of-two
/// node count up to 256.
#[test]
fn test_bitcomp_self_inverse() {
    let mut rng = StdRng::seed_from_u64(0);
    for shift in 1..=8 {
        let nodes = 1usize << shift;
        let params = PatternParams::for_nodes(nodes);
        let mut pattern = build("bitcomp", nodes, &params);
        for source in 0..nodes {
            let dest = pattern.dest(source, &mut rng);
            assert_eq!(pattern.dest(dest, &mut rng), source);
        }
    }
}

/// Tests the bit-reversal example table for four nodes.
#[test]
fn test_bitrev_four_nodes() {
    let params = PatternParams::for_nodes(4);
    let mut pattern = build("bitrev", 4, &params);
    let mut rng = StdRng::seed_from_u64(0);

    assert_eq!(pattern.dest(0, &mut rng), 0);
    assert_eq!(pattern.dest(1, &mut rng), 2);
    assert_eq!(pattern.dest(2, &mut rng), 1);
    assert_eq!(pattern.dest(3, &mut rng), 3);
}

/// Tests that transpose swaps the address-bit halves and is
/// self-inverse.
#[test]
fn test_transpose_sixteen_nodes() {
    let params = PatternParams::for_nodes(16);
    let mut pattern = build("transpose", 16, &params);
    let mut rng = StdRng::seed_from_u64(0);

    assert_eq!(pattern.dest(0b0001, &mut rng), 0b0100);
    assert_eq!(pattern.dest(0b0100, &mut rng), 0b0001);
    assert_eq!(pattern.dest(0b1110, &mut rng), 0b1011);
    for source in 0..16 {
        let dest = pattern.dest(source, &mut rng);
        assert_eq!(pattern.dest(dest, &mut rng), source);
    }
}

/// Tests the shuffle rotate-left-by-one examples.
#[test]
fn test_shuffle_eight_nodes() {
    let params = PatternParams::for_nodes(8);
    let mut pattern = build("shuffle", 8, &params);
    let mut rng = StdRng::seed_from_u64(0);

    assert_eq!(pattern.dest(0b100, &mut rng), 0b001);
    assert_eq!(pattern.dest(0b011, &mut rng), 0b110);
    assert_eq!(pattern.dest(0b000, &mut rng), 0b000);
}

/// Tests the tornado digit offset for a single digit of radix 8.
#[test]
fn test_tornado_single_digit() {
    let mut params = PatternParams::for_nodes(8);
    params.k = 8;
    let mut pattern = build("tornado", 8, &params);
    let mut rng = StdRng::seed_from_u64(0);

    for source in 0..8 {
        assert_eq!(pattern.dest(source, &mut rng), (source + 3) % 8);
    }
}

/// Tests the neighbor digit offset with inline parameters.
#[test]
fn test_neighbor_inline_params() {
    let params = PatternParams::for_nodes(8);
    let mut pattern = build("neighbor(8,1,1)", 8, &params);
    let mut rng = StdRng::seed_from_u64(0);

    for source in 0..8 {
        assert_eq!(pattern.dest(source, &mut rng), (source + 1) % 8);
    }
}

/// Tests the tornado digit decomposition over two digits.
#[test]
fn test_tornado_two_digits() {
    let mut params = PatternParams::for_nodes(16);
    params.k = 4;
    params.n = 2;
    let mut pattern = build("tornado", 16, &params);
    let mut rng = StdRng::seed_from_u64(0);

    // Radix 4, offset 1 per digit: digits (1, 2) -> (2, 3).
    assert_eq!(pattern.dest(1 + 4 * 2, &mut rng), 2 + 4 * 3);
}

/// Tests that the random permutation is a bijection for a fixed seed.
#[test]
fn test_randperm_bijection() {
    let nodes = 32;
    let params = PatternParams::for_nodes(nodes);
    let mut pattern = build("randperm(42)", nodes, &params);
    let mut rng = StdRng::seed_from_u64(0);

    let mut seen = vec![false; nodes];
    for source in 0..nodes {
        let dest = pattern.dest(source, &mut rng);
        assert!(!seen[dest], "destination {} chosen twice", dest);
        seen[dest] = true;
    }
    assert!(seen.iter().all(|&s| s));
}

/// Tests that the same seed reproduces the same permutation.
#[test]
fn test_randperm_deterministic() {
    let nodes = 16;
    let params = PatternParams::for_nodes(nodes);
    let mut a = build("randperm(9)", nodes, &params);
    let mut b = build("randperm(9)", nodes, &params);
    let mut rng = StdRng::seed_from_u64(0);

    for source in 0..nodes {
        assert_eq!(a.dest(source, &mut rng), b.dest(source, &mut rng));
    }
}

/// Tests that the configuration fallback seed is honored.
#[test]
fn test_randperm_config_seed() {
    let nodes = 16;
    let mut params = PatternParams::for_nodes(nodes);
    params.perm_seed = Some(9);
    let mut from_config = build("randperm", nodes, &params);
    let mut inline = build("randperm(9)", nodes, &params);
    let mut rng = StdRng::seed_from_u64(0);

    for source in 0..nodes {
        assert_eq!(
            from_config.dest(source, &mut rng),
            inline.dest(source, &mut rng)
        );
    }
}

/// Tests that a single-destination hotspot ignores the draw entirely.
#[test]
fn test_hotspot_single_destination() {
    let params = PatternParams::for_nodes(8);
    let mut pattern = build("hotspot({5})", 8, &params);
    let mut rng = StdRng::seed_from_u64(3);

    for source in 0..8 {
        for _ in 0..16 {
            assert_eq!(pattern.dest(source, &mut rng), 5);
        }
    }
}

/// Tests that weighted hotspot draws stay inside the hotspot list and
/// favor the heavier entry.
#[test]
fn test_hotspot_weighted() {
    let params = PatternParams::for_nodes(16);
    let mut pattern = build("hotspot({2,9},{10,1})", 16, &params);
    let mut rng = StdRng::seed_from_u64(11);

    let mut counts: HashMap<usize, usize> = HashMap::new();
    for _ in 0..2000 {
        let dest = pattern.dest(0, &mut rng);
        assert!(dest == 2 || dest == 9);
        *counts.entry(dest).or_default() += 1;
    }
    assert!(counts[&2] > counts[&9]);
}

/// Tests the group permutation load-balance guarantee: every node
/// appears as a destination an equal number of times across all
/// per-source lists, give or take one.
#[test]
fn test_groupperm_load_balance() {
    let nodes = 16;
    let mut rng = StdRng::seed_from_u64(5);
    let mut pattern = GroupPermPattern::new(nodes, 4);

    let mut counts = vec![0usize; nodes];
    for list in pattern.destinations(&mut rng) {
        assert_eq!(list.len(), 4);
        for &dest in list {
            counts[dest] += 1;
        }
    }
    let min = counts.iter().min().unwrap();
    let max = counts.iter().max().unwrap();
    assert!(max - min <= 1, "unbalanced destination counts: {:?}", counts);
}

/// Tests that group permutation draws come from the per-source list.
#[test]
fn test_groupperm_draws_from_list() {
    let nodes = 8;
    let mut rng = StdRng::seed_from_u64(5);
    let mut pattern = GroupPermPattern::new(nodes, 2);
    let lists: Vec<Vec<usize>> = pattern.destinations(&mut rng).to_vec();

    for source in 0..nodes {
        for _ in 0..32 {
            let dest = pattern.dest(source, &mut rng);
            assert!(lists[source].contains(&dest));
        }
    }
}

/// Tests that uniform-inter never targets the source's own group.
#[test]
fn test_uniform_inter_leaves_group() {
    let mut params = PatternParams::for_nodes(8);
    params.k = 2;
    let mut pattern = build("uniform_inter", 8, &params);
    let mut rng = StdRng::seed_from_u64(1);

    for source in 0..8 {
        for _ in 0..64 {
            let dest = pattern.dest(source, &mut rng);
            assert_ne!(source / 2, dest / 2);
        }
    }
}

/// Tests that the selective pattern only targets memory nodes.
#[test]
fn test_uniform_sel_targets_memory() {
    let mut params = PatternParams::for_nodes(8);
    params.memory_nodes = [1, 3, 6].into_iter().collect();
    let mut pattern = build("uniform_sel", 8, &params);
    let mut rng = StdRng::seed_from_u64(1);

    for source in 0..8 {
        for _ in 0..64 {
            let dest = pattern.dest(source, &mut rng);
            assert!(params.memory_nodes.contains(&dest));
        }
    }
}

/// Tests the deterministic modulo worst-case formula.
#[test]
fn test_modulo_worst_formula() {
    let mut params = PatternParams::for_nodes(16);
    params.k = 4;
    let mut pattern = build("modulo_worst", 16, &params);
    let mut rng = StdRng::seed_from_u64(0);

    for source in 0..16 {
        let expected = ((source % 4) * 4 + source / 4) % 16;
        assert_eq!(pattern.dest(source, &mut rng), expected);
    }
}

/// Tests that modulo-best destinations are memory nodes sharing the
/// source's residue.
#[test]
fn test_modulo_best_constraint() {
    let mut params = PatternParams::for_nodes(16);
    params.k = 4;
    let mut pattern = build("modulo_best", 16, &params);
    let mut rng = StdRng::seed_from_u64(2);

    for source in 0..16 {
        for _ in 0..16 {
            let dest = pattern.dest(source, &mut rng);
            assert_eq!(dest % 4, source % 4);
        }
    }
}

/// Tests that background traffic avoids the excluded list.
#[test]
fn test_background_excludes() {
    let params = PatternParams::for_nodes(8);
    let mut pattern = build("background({0,7})", 8, &params);
    let mut rng = StdRng::seed_from_u64(4);

    for _ in 0..256 {
        let dest = pattern.dest(3, &mut rng);
        assert!(dest != 0 && dest != 7);
    }
}

/// Tests that an unknown pattern name is a construction error.
#[test]
fn test_unknown_pattern_rejected() {
    let params = PatternParams::for_nodes(8);
    let err = build_err("wavefront", 8, &params);
    assert!(matches!(err, ConfigError::UnknownPattern(_)));
}

/// Tests that bit permutations reject non-power-of-two node counts.
#[test]
fn test_bitcomp_rejects_non_power_of_two() {
    let params = PatternParams::for_nodes(12);
    let err = build_err("bitcomp", 12, &params);
    assert!(matches!(err, ConfigError::BadNodeCount { .. }));
}

/// Tests that transpose rejects an odd power of two.
#[test]
fn test_transpose_rejects_odd_power() {
    let params = PatternParams::for_nodes(8);
    let err = build_err("transpose", 8, &params);
    assert!(matches!(err, ConfigError::BadNodeCount { .. }));
}

/// Tests that randperm without a seed anywhere is a construction error.
#[test]
fn test_randperm_missing_seed() {
    let params = PatternParams::for_nodes(8);
    let err = build_err("randperm", 8, &params);
    assert!(matches!(
        err,
        ConfigError::MissingParameter { param: "perm_seed", .. }
    ));
}

/// Tests that taper64 demands exactly 64 nodes.
#[test]
fn test_taper64_node_count() {
    let params = PatternParams::for_nodes(32);
    let err = build_err("taper64", 32, &params);
    assert!(matches!(err, ConfigError::BadNodeCount { .. }));

    let params = PatternParams::for_nodes(64);
    let mut pattern = build("taper64", 64, &params);
    let mut rng = StdRng::seed_from_u64(0);
    for _ in 0..64 {
        assert!(pattern.dest(10, &mut rng) < 64);
    }
}

/// Tests that a malformed numeric parameter is rejected.
#[test]
fn test_bad_parameter_rejected() {
    let params = PatternParams::for_nodes(8);
    let err = build_err("randperm(abc)", 8, &params);
    assert!(matches!(err, ConfigError::BadParameter { .. }));
}
