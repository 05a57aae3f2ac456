//! Simulation Harness.
//!
//! This module drives the per-cycle simulation: the batch injection
//! controller decides which nodes inject, hands generated flits to the
//! fabric, and consumes retired flits back from the reorder buffer. The
//! controller is composed from pluggable pieces (traffic pattern,
//! injection process, fabric) rather than subclassed; the per-batch and
//! drain loops live in [`BatchSimulation::run`].

use crate::common::flit::TYPE_BUCKETS;
use crate::common::{ConfigError, Flit, FlitType, PendingReply};
use crate::config::Config;
use crate::reorder::{Granularity, ReorderBuffer};
use crate::stats::SimStats;
use crate::traffic::{self, PatternParams, TrafficPattern};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashSet, VecDeque};
use std::fs::File;
use std::io::{BufWriter, Write};

/// Steppable network fabric seam and the shipped latency model.
pub mod fabric;

/// Per-class injection processes.
pub mod injection;

use fabric::Fabric;
use injection::InjectionProcess;

/// Simulation phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimState {
    /// Batch injection in progress.
    Running,
    /// Waiting for the current batch's flits to retire.
    DrainingBatch,
    /// All batches sent; simulation-level wind-down.
    Draining,
    /// Nothing left in flight or pending.
    Done,
}

/// Outcome of one per-node, per-class issue evaluation.
#[derive(Clone, Copy, Debug)]
enum IssueDecision {
    /// Nothing to send this cycle.
    None,
    /// A pending reply exists but its not-before time has not arrived;
    /// new issuance is held back.
    Defer,
    /// Service the node's oldest due reply obligation.
    Reply(PendingReply),
    /// Inject a new message.
    Request { kind: FlitType, packets: usize },
}

/// Resolved per-class traffic configuration.
struct ClassState {
    pattern: Box<dyn TrafficPattern>,
    injection: Box<dyn InjectionProcess>,
    send_all: bool,
    use_read_write: bool,
    write_fraction: f64,
    packet_size: usize,
    message_size: Vec<usize>,
    read_request_size: usize,
    read_reply_size: usize,
    write_request_size: usize,
    write_reply_size: usize,
    read_request_message_size: usize,
    read_reply_message_size: usize,
    write_request_message_size: usize,
    write_reply_message_size: usize,
}

impl ClassState {
    fn flits_per_packet(&self, kind: FlitType) -> usize {
        match kind {
            FlitType::Data => self.packet_size,
            FlitType::ReadRequest => self.read_request_size,
            FlitType::ReadReply => self.read_reply_size,
            FlitType::WriteRequest => self.write_request_size,
            FlitType::WriteReply => self.write_reply_size,
        }
    }
}

struct NodeState {
    /// Messages issued toward the current batch quota.
    message_seq: u64,
    /// Issued-but-unretired requests.
    outstanding: u64,
    /// Reply obligations this node owes, oldest first.
    pending_replies: VecDeque<PendingReply>,
}

/// Endpoint-side state touched by the retirement callback.
///
/// Kept apart from the reorder buffer so retirement can mutate it while
/// the buffer drains.
struct Endpoints {
    nodes: Vec<NodeState>,
    in_flight: Vec<u64>,
    last_flit: Option<u64>,
    last_packet: Option<u64>,
}

impl Endpoints {
    fn retire(&mut self, f: Flit, now: u64, stats: &mut SimStats) {
        if f.watch {
            debug!("{} - retire flit {} packet {} message {}", now, f.id, f.pid, f.mid);
        }

        assert!(
            self.in_flight[f.class] > 0,
            "retired a flit with none in flight for class {}",
            f.class
        );
        self.in_flight[f.class] -= 1;
        stats.retired_flits[f.class] += 1;
        self.last_flit = Some(f.id);
        self.last_packet = Some(f.pid);

        if f.tail {
            stats.packet_latency[f.class].add_sample((f.rtime - f.ctime) as f64);
        }
        if !(f.tail && f.msg_tail) {
            return;
        }

        stats.retired_messages[f.class] += 1;
        stats.message_latency[f.class].add_sample((f.rtime - f.ctime) as f64);

        match f.kind {
            FlitType::ReadRequest | FlitType::WriteRequest => {
                self.nodes[f.dest].pending_replies.push_back(PendingReply {
                    kind: f.kind.reply_type(),
                    requester: f.src,
                    time: now,
                });
            }
            FlitType::ReadReply | FlitType::WriteReply => {
                let outstanding = &mut self.nodes[f.dest].outstanding;
                assert!(*outstanding > 0, "reply retired with no outstanding request");
                *outstanding -= 1;
            }
            FlitType::Data => {
                let outstanding = &mut self.nodes[f.src].outstanding;
                assert!(*outstanding > 0, "message retired with no outstanding request");
                *outstanding -= 1;
            }
        }
    }
}

/// Batch-mode traffic simulation over a pluggable fabric.
pub struct BatchSimulation<F: Fabric> {
    nodes: usize,
    k: usize,
    batch_size: u64,
    batch_count: u64,
    max_outstanding: u64,
    granularity: Granularity,
    eligible: Vec<bool>,
    watch_flits: HashSet<u64>,

    class_states: Vec<ClassState>,
    fabric: F,
    rob: ReorderBuffer,
    endpoints: Endpoints,
    stats: SimStats,
    rng: StdRng,

    state: SimState,
    time: u64,
    next_flit_id: u64,
    next_packet_id: u64,
    next_message_id: u64,
    /// Running packet sequence per (source, destination, bucket); only
    /// consumed under packet granularity.
    pair_seq: Vec<u64>,
    sent_log: Option<BufWriter<File>>,
    drain_start: Option<u64>,
}

impl<F: Fabric> BatchSimulation<F> {
    pub fn new(config: &Config, fabric: F) -> Result<Self, ConfigError> {
        config.validate()?;

        let nodes = config.general.nodes;
        let classes = config.general.classes;
        let granularity = config.reorder.granularity_val()?;
        let mut rng = StdRng::seed_from_u64(config.general.seed);
        let params = PatternParams::from_config(config);

        let patterns = config.traffic.patterns_val(classes);
        let processes = config.traffic.injection_process_val(classes);
        let rates = config.traffic.rates_val(classes);
        let use_read_write = config.traffic.use_read_write_val(classes);
        let write_fraction = config.traffic.write_fraction_val(classes);
        let packet_size = config.sizes.packet_size_val(classes);
        let message_size = config.sizes.message_size_val(classes);
        let read_request_size = config.sizes.read_request_size_val(classes);
        let read_reply_size = config.sizes.read_reply_size_val(classes);
        let write_request_size = config.sizes.write_request_size_val(classes);
        let write_reply_size = config.sizes.write_reply_size_val(classes);
        let read_request_message_size = config.sizes.read_request_message_size_val(classes);
        let read_reply_message_size = config.sizes.read_reply_message_size_val(classes);
        let write_request_message_size = config.sizes.write_request_message_size_val(classes);
        let write_reply_message_size = config.sizes.write_reply_message_size_val(classes);

        let mut class_states = Vec::with_capacity(classes);
        for c in 0..classes {
            if message_size[c].is_empty() || message_size[c].iter().any(|&m| m == 0) {
                return Err(ConfigError::Invalid(format!(
                    "class {} message sizes must be positive",
                    c
                )));
            }
            if packet_size[c] == 0 {
                return Err(ConfigError::Invalid(format!(
                    "class {} packet size must be positive",
                    c
                )));
            }

            let average_message_size = if use_read_write[c] {
                (read_request_message_size[c] * read_request_size[c]
                    + read_reply_message_size[c] * read_reply_size[c]
                    + write_request_message_size[c] * write_request_size[c]
                    + write_reply_message_size[c] * write_reply_size[c]) as f64
                    / 2.0
            } else {
                message_size[c].iter().sum::<usize>() as f64 / message_size[c].len() as f64
                    * packet_size[c] as f64
            };
            let mut rate = rates[c];
            if config.traffic.injection_rate_uses_flits {
                rate /= average_message_size;
            }

            class_states.push(ClassState {
                pattern: traffic::build(&patterns[c], nodes, &params, &mut rng)?,
                injection: injection::build(
                    &processes[c],
                    nodes,
                    rate,
                    config.traffic.onoff_alpha,
                    config.traffic.onoff_beta,
                )?,
                send_all: rates[c] == 0.0,
                use_read_write: use_read_write[c],
                write_fraction: write_fraction[c],
                packet_size: packet_size[c],
                message_size: message_size[c].clone(),
                read_request_size: read_request_size[c],
                read_reply_size: read_reply_size[c],
                write_request_size: write_request_size[c],
                write_reply_size: write_reply_size[c],
                read_request_message_size: read_request_message_size[c],
                read_reply_message_size: read_reply_message_size[c],
                write_request_message_size: write_request_message_size[c],
                write_reply_message_size: write_reply_message_size[c],
            });
        }

        let compute: HashSet<usize> = config.topology.compute_nodes_val(nodes).into_iter().collect();
        let hotspot_dests: HashSet<usize> = config.hotspot.dests.iter().copied().collect();
        let eligible: Vec<bool> = (0..nodes)
            .map(|n| compute.contains(&n) && !hotspot_dests.contains(&n))
            .collect();

        let sent_log = if config.batch.sent_log.is_empty() {
            None
        } else {
            match File::create(&config.batch.sent_log) {
                Ok(file) => Some(BufWriter::new(file)),
                Err(e) => {
                    warn!(
                        "could not open sent-unit log {}: {}; logging disabled",
                        config.batch.sent_log, e
                    );
                    None
                }
            }
        };

        Ok(Self {
            nodes,
            k: config.topology.k,
            batch_size: config.batch.size,
            batch_count: config.batch.count,
            max_outstanding: config.batch.max_outstanding,
            granularity,
            eligible,
            watch_flits: config.general.watch_flits.iter().copied().collect(),
            class_states,
            fabric,
            rob: ReorderBuffer::new(nodes, granularity),
            endpoints: Endpoints {
                nodes: (0..nodes)
                    .map(|_| NodeState {
                        message_seq: 0,
                        outstanding: 0,
                        pending_replies: VecDeque::new(),
                    })
                    .collect(),
                in_flight: vec![0; classes],
                last_flit: None,
                last_packet: None,
            },
            stats: SimStats::new(classes),
            rng,
            state: SimState::Running,
            time: 0,
            next_flit_id: 0,
            next_packet_id: 0,
            next_message_id: 0,
            pair_seq: vec![0; nodes * nodes * TYPE_BUCKETS],
            sent_log,
            drain_start: None,
        })
    }

    /// Runs every configured batch followed by the terminal drain.
    pub fn run(&mut self) {
        for batch in 0..self.batch_count {
            for node in &mut self.endpoints.nodes {
                node.message_seq = 0;
            }
            self.endpoints.last_flit = None;
            self.endpoints.last_packet = None;
            self.state = SimState::Running;
            let start_time = self.time;
            println!(
                "[Sim] Sending batch {} ({} messages per node)...",
                batch + 1,
                self.batch_size
            );

            loop {
                self.step();
                if self.batch_complete() {
                    break;
                }
            }
            println!(
                "[Sim] Batch injected. Time used is {} cycles.",
                self.time - start_time
            );

            let sent_time = self.time;
            self.state = SimState::DrainingBatch;
            println!("[Sim] Waiting for batch to complete...");

            let mut empty_steps = 0u64;
            while self.flits_in_flight() {
                self.step();
                empty_steps += 1;
                if empty_steps % 1000 == 0 {
                    self.display_remaining();
                }
            }
            println!(
                "[Sim] Batch received. Time used is {} cycles.",
                self.time - sent_time
            );
            println!(
                "[Sim] Last packet was {}, last flit was {}.",
                self.endpoints.last_packet.map_or(-1, |v| v as i64),
                self.endpoints.last_flit.map_or(-1, |v| v as i64)
            );

            self.stats.inject_time.add_sample((sent_time - start_time) as f64);
            self.stats.batch_time.add_sample((self.time - start_time) as f64);
        }

        self.state = SimState::Draining;
        self.drain_start = Some(self.time);
        while self.flits_in_flight() || self.replies_pending() || !self.fabric.quiescent() {
            self.step();
        }
        self.stats.rob_high_water = self.rob.high_water();
        if let Some(log) = &mut self.sent_log {
            let _ = log.flush();
        }
        self.state = SimState::Done;
    }

    /// Advances the simulation one cycle: fabric step, arrivals through
    /// the reorder buffer, then the injection sweep in ascending node
    /// order.
    pub fn step(&mut self) {
        self.time += 1;
        self.stats.cycles = self.time;

        let arrivals = self.fabric.step(self.time);
        for f in arrivals {
            if f.src / self.k != f.dest / self.k {
                self.stats
                    .rob_occupancy
                    .add_sample(self.rob.occupancy(f.src, f.dest) as f64);
            }
            let endpoints = &mut self.endpoints;
            let stats = &mut self.stats;
            let now = self.time;
            self.rob.arrive(f, now, |f| endpoints.retire(f, now, stats));
        }

        self.inject_sweep();
    }

    fn inject_sweep(&mut self) {
        for source in 0..self.nodes {
            for class in 0..self.class_states.len() {
                match self.issue_message(source, class) {
                    IssueDecision::None | IssueDecision::Defer => {}
                    IssueDecision::Reply(reply) => {
                        let packets = match reply.kind {
                            FlitType::ReadReply => self.class_states[class].read_reply_message_size,
                            FlitType::WriteReply => {
                                self.class_states[class].write_reply_message_size
                            }
                            _ => unreachable!("pending reply with a request type"),
                        };
                        self.generate_message(source, reply.requester, reply.kind, packets, class);
                    }
                    IssueDecision::Request { kind, packets } => {
                        let dest = self.class_states[class]
                            .pattern
                            .dest(source, &mut self.rng);
                        self.generate_message(source, dest, kind, packets, class);
                    }
                }
            }
        }
    }

    /// Per-node, per-class issue decision.
    ///
    /// Reply obligations take precedence and ignore eligibility: even a
    /// node excluded from injecting new traffic must answer requests
    /// addressed to it. A not-yet-due obligation defers new issuance,
    /// which is distinct from having nothing to send.
    fn issue_message(&mut self, source: usize, class: usize) -> IssueDecision {
        let node = &mut self.endpoints.nodes[source];
        let cs = &mut self.class_states[class];
        let rng = &mut self.rng;

        if cs.use_read_write {
            if let Some(front) = node.pending_replies.front().copied() {
                if front.time <= self.time {
                    node.pending_replies.pop_front();
                    return IssueDecision::Reply(front);
                }
                return IssueDecision::Defer;
            }

            if self.eligible[source]
                && (cs.injection.test(source, rng) || cs.send_all)
                && node.message_seq < self.batch_size
                && (self.max_outstanding == 0 || node.outstanding < self.max_outstanding)
            {
                let kind = if rng.gen::<f64>() < cs.write_fraction {
                    FlitType::WriteRequest
                } else {
                    FlitType::ReadRequest
                };
                node.outstanding += 1;
                node.message_seq += 1;
                let packets = match kind {
                    FlitType::WriteRequest => cs.write_request_message_size,
                    _ => cs.read_request_message_size,
                };
                return IssueDecision::Request { kind, packets };
            }
            IssueDecision::None
        } else {
            if self.eligible[source]
                && (cs.injection.test(source, rng) || cs.send_all)
                && node.message_seq < self.batch_size
                && (self.max_outstanding == 0 || node.outstanding < self.max_outstanding)
            {
                let packets = cs.message_size[rng.gen_range(0..cs.message_size.len())];
                node.outstanding += 1;
                node.message_seq += 1;
                return IssueDecision::Request {
                    kind: FlitType::Data,
                    packets,
                };
            }
            IssueDecision::None
        }
    }

    /// Creates every flit of one message and hands them to the fabric.
    fn generate_message(
        &mut self,
        source: usize,
        dest: usize,
        kind: FlitType,
        packets: usize,
        class: usize,
    ) {
        assert!(
            dest < self.nodes,
            "pattern selected out-of-range destination {}",
            dest
        );
        let flits_per_packet = self.class_states[class].flits_per_packet(kind);

        let mid = self.next_message_id;
        self.next_message_id += 1;

        if let Some(log) = &mut self.sent_log {
            let _ = writeln!(
                log,
                "{},{},{},{},{:?},{},{}",
                self.time,
                source,
                dest,
                class,
                kind,
                packets,
                packets * flits_per_packet
            );
        }

        for p in 0..packets {
            let pid = self.next_packet_id;
            self.next_packet_id += 1;

            let seq = match self.granularity {
                Granularity::Message => p as u64,
                Granularity::Packet => {
                    let idx = (source * self.nodes + dest) * TYPE_BUCKETS + kind.bucket();
                    let seq = self.pair_seq[idx];
                    self.pair_seq[idx] += 1;
                    seq
                }
            };

            for i in 0..flits_per_packet {
                let id = self.next_flit_id;
                self.next_flit_id += 1;
                let tail = i + 1 == flits_per_packet;
                let flit = Flit {
                    id,
                    pid,
                    mid,
                    src: source,
                    dest,
                    class,
                    kind,
                    packet_seq: seq,
                    head: i == 0,
                    tail,
                    msg_tail: tail && p + 1 == packets,
                    watch: self.watch_flits.contains(&id),
                    ctime: self.time,
                    rtime: 0,
                };
                if flit.watch {
                    debug!(
                        "{} - inject flit {} packet {} message {} ({} -> {})",
                        self.time, id, pid, mid, source, dest
                    );
                }
                self.fabric.inject(flit, self.time);
            }
        }

        self.endpoints.in_flight[class] += (packets * flits_per_packet) as u64;
        self.stats.sent_messages[class] += 1;
        self.stats.sent_flits[class] += (packets * flits_per_packet) as u64;
    }

    /// True once every eligible node has met the batch quota. Nodes that
    /// can never inject are excluded, otherwise the batch would never
    /// complete.
    fn batch_complete(&self) -> bool {
        self.endpoints
            .nodes
            .iter()
            .enumerate()
            .all(|(i, n)| !self.eligible[i] || n.message_seq >= self.batch_size)
    }

    fn flits_in_flight(&self) -> bool {
        self.endpoints.in_flight.iter().any(|&count| count > 0)
    }

    fn replies_pending(&self) -> bool {
        self.endpoints
            .nodes
            .iter()
            .any(|n| !n.pending_replies.is_empty())
    }

    fn display_remaining(&self) {
        for (c, &count) in self.endpoints.in_flight.iter().enumerate() {
            println!(
                "[Sim] Class {}: {} flits in flight at time {}",
                c, count, self.time
            );
        }
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn state(&self) -> SimState {
        self.state
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    /// Cycle the terminal drain phase began, once reached.
    pub fn drain_start(&self) -> Option<u64> {
        self.drain_start
    }

    /// Messages node `node` has issued toward the current batch quota.
    pub fn issued_in_batch(&self, node: usize) -> u64 {
        self.endpoints.nodes[node].message_seq
    }

    /// Requests node `node` has issued whose replies are still out.
    pub fn outstanding(&self, node: usize) -> u64 {
        self.endpoints.nodes[node].outstanding
    }

    /// Reply obligations currently queued at `node`.
    pub fn pending_reply_count(&self, node: usize) -> usize {
        self.endpoints.nodes[node].pending_replies.len()
    }
}
