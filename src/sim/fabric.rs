//! Fabric Interface.
//!
//! The router/crossbar simulation that actually moves flits is an
//! external collaborator; the controller only needs to hand flits in,
//! advance it one cycle at a time, and collect what arrives. This
//! module defines that seam and ships a latency-model implementation
//! used by the CLI and the tests.

use crate::common::Flit;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Steppable network fabric.
pub trait Fabric {
    /// Accepts a flit for transport; `now` is the injection cycle.
    fn inject(&mut self, flit: Flit, now: u64);

    /// Advances one cycle and returns every flit reaching its
    /// destination at `now`, in deterministic (arrival time, flit id)
    /// order.
    fn step(&mut self, now: u64) -> Vec<Flit>;

    /// True when no flit is in transit.
    fn quiescent(&self) -> bool;
}

struct Transit {
    deliver: u64,
    flit: Flit,
}

impl PartialEq for Transit {
    fn eq(&self, other: &Self) -> bool {
        self.deliver == other.deliver && self.flit.id == other.flit.id
    }
}

impl Eq for Transit {}

impl PartialOrd for Transit {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Transit {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.deliver, self.flit.id).cmp(&(other.deliver, other.flit.id))
    }
}

/// Fixed-latency fabric with optional per-packet jitter.
///
/// Every packet arrives `latency` cycles after injection plus a uniform
/// extra delay in `[0, jitter]` drawn from the fabric's own seeded
/// stream. The delay is drawn once per packet: flits of one packet stay
/// together and in order, as they would on a real wormhole-routed path,
/// while packets of one message overtake each other freely.
pub struct LatencyFabric {
    latency: u64,
    jitter: u64,
    in_transit: BinaryHeap<Reverse<Transit>>,
    rng: StdRng,
    last_packet: Option<(u64, u64)>,
}

impl LatencyFabric {
    pub fn new(latency: u64, jitter: u64, seed: u64) -> Self {
        Self {
            latency,
            jitter,
            in_transit: BinaryHeap::new(),
            rng: StdRng::seed_from_u64(seed),
            last_packet: None,
        }
    }

    fn packet_delay(&mut self, pid: u64) -> u64 {
        if let Some((last_pid, extra)) = self.last_packet {
            if last_pid == pid {
                return extra;
            }
        }
        let extra = if self.jitter == 0 {
            0
        } else {
            self.rng.gen_range(0..=self.jitter)
        };
        self.last_packet = Some((pid, extra));
        extra
    }
}

impl Fabric for LatencyFabric {
    fn inject(&mut self, flit: Flit, now: u64) {
        let extra = self.packet_delay(flit.pid);
        self.in_transit.push(Reverse(Transit {
            deliver: now + self.latency.max(1) + extra,
            flit,
        }));
    }

    fn step(&mut self, now: u64) -> Vec<Flit> {
        let mut arrivals = Vec::new();
        while self
            .in_transit
            .peek()
            .is_some_and(|Reverse(t)| t.deliver <= now)
        {
            arrivals.push(self.in_transit.pop().unwrap().0.flit);
        }
        arrivals
    }

    fn quiescent(&self) -> bool {
        self.in_transit.is_empty()
    }
}
