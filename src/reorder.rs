//! Reorder Buffer.
//!
//! Units may leave the fabric out of order; this module restores
//! packet-sequence order before units are handed to the retirement
//! callback. Ordering state is kept per (source, destination, type
//! bucket), where requests and replies occupy independent buckets, and
//! at one of two granularities selected at runtime: a single shared
//! sequence counter per bucket (packet granularity) or an independent
//! counter per message, created lazily and removed when the message
//! completes (message granularity, the default).
//!
//! The heaps own their flits by value; a unit is moved in on arrival
//! and moved out exactly once when released.

use crate::common::flit::TYPE_BUCKETS;
use crate::common::Flit;
use log::debug;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

/// Reordering granularity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Granularity {
    /// One shared sequence counter and heap per (source, destination,
    /// type bucket).
    Packet,
    /// An independent counter and heap per message id within each
    /// (source, destination, type bucket).
    Message,
}

/// Heap entry ordered by (packet sequence, flit id).
///
/// Flit ids increase in issue order, so within one packet the id breaks
/// ties in creation order.
struct OrderedFlit(Flit);

impl PartialEq for OrderedFlit {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for OrderedFlit {}

impl PartialOrd for OrderedFlit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedFlit {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.0.packet_seq, self.0.id).cmp(&(other.0.packet_seq, other.0.id))
    }
}

struct Bucket {
    expected: u64,
    heap: BinaryHeap<Reverse<OrderedFlit>>,
}

impl Bucket {
    fn new() -> Self {
        Self {
            expected: 0,
            heap: BinaryHeap::new(),
        }
    }
}

enum Slot {
    Packet(Bucket),
    Message(HashMap<u64, Bucket>),
}

/// Per-(source, destination, class-bucket) reorder buffer.
pub struct ReorderBuffer {
    granularity: Granularity,
    nodes: usize,
    slots: Vec<Slot>,
    occupancy: Vec<i64>,
    high_water: usize,
}

impl ReorderBuffer {
    pub fn new(nodes: usize, granularity: Granularity) -> Self {
        let slots = (0..nodes * nodes * TYPE_BUCKETS)
            .map(|_| match granularity {
                Granularity::Packet => Slot::Packet(Bucket::new()),
                Granularity::Message => Slot::Message(HashMap::new()),
            })
            .collect();
        Self {
            granularity,
            nodes,
            slots,
            occupancy: vec![0; nodes * nodes],
            high_water: 0,
        }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Buffered flits currently held for the (source, destination) pair.
    pub fn occupancy(&self, src: usize, dest: usize) -> i64 {
        self.occupancy[src * self.nodes + dest]
    }

    /// Largest per-pair occupancy observed so far.
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// Accepts a flit leaving the fabric and releases every flit that is
    /// now in order to `retire`.
    ///
    /// Tail flits get their retirement timestamp here. Within one
    /// (source, destination, bucket, message) scope the callback sees
    /// non-decreasing sequence numbers regardless of arrival order.
    ///
    /// # Panics
    ///
    /// Panics on an out-of-range node id or a negative occupancy count;
    /// both indicate a fabric/controller logic error.
    pub fn arrive<F: FnMut(Flit)>(&mut self, mut flit: Flit, now: u64, mut retire: F) {
        assert!(
            flit.src < self.nodes && flit.dest < self.nodes,
            "flit {} routed outside the node space ({} -> {})",
            flit.id,
            flit.src,
            flit.dest
        );

        if flit.tail {
            flit.rtime = now;
        }
        if flit.watch {
            debug!(
                "{} - push flit {} packet {} message {} into the reorder buffer",
                now, flit.id, flit.pid, flit.mid
            );
        }

        let pair = flit.src * self.nodes + flit.dest;
        self.occupancy[pair] += 1;
        if self.occupancy[pair] as usize > self.high_water {
            self.high_water = self.occupancy[pair] as usize;
        }

        let occupancy = &mut self.occupancy[pair];
        let slot = &mut self.slots[pair * TYPE_BUCKETS + flit.kind.bucket()];
        match slot {
            Slot::Packet(bucket) => {
                bucket.heap.push(Reverse(OrderedFlit(flit)));
                drain(bucket, occupancy, &mut retire);
            }
            Slot::Message(messages) => {
                let mid = flit.mid;
                let bucket = messages.entry(mid).or_insert_with(Bucket::new);
                bucket.heap.push(Reverse(OrderedFlit(flit)));
                if drain(bucket, occupancy, &mut retire) {
                    assert!(
                        bucket.heap.is_empty(),
                        "message {} released its tail with flits still buffered",
                        mid
                    );
                    messages.remove(&mid);
                }
            }
        }
    }
}

/// Releases every in-order flit from `bucket`; returns true once the
/// message-tail flit has been released.
fn drain<F: FnMut(Flit)>(bucket: &mut Bucket, occupancy: &mut i64, retire: &mut F) -> bool {
    let mut message_done = false;
    while bucket
        .heap
        .peek()
        .is_some_and(|Reverse(OrderedFlit(f))| f.packet_seq <= bucket.expected)
    {
        let Reverse(OrderedFlit(f)) = bucket.heap.pop().unwrap();

        if f.tail {
            bucket.expected += 1;
        }
        *occupancy -= 1;
        assert!(*occupancy >= 0, "negative reorder-buffer occupancy");

        if f.tail && f.msg_tail {
            message_done = true;
        }
        if f.watch {
            debug!(
                "release flit {} packet {} message {} from the reorder buffer",
                f.id, f.pid, f.mid
            );
        }
        retire(f);
    }
    message_done
}
