//! Integration tests for the reorder buffer.

use noc_traffic::common::{Flit, FlitType};
use noc_traffic::reorder::{Granularity, ReorderBuffer};

/// Builds a single-flit packet with the given identity.
fn flit(id: u64, pid: u64, mid: u64, seq: u64, tail: bool, msg_tail: bool) -> Flit {
    Flit {
        id,
        pid,
        mid,
        src: 0,
        dest: 1,
        class: 0,
        kind: FlitType::Data,
        packet_seq: seq,
        head: true,
        tail,
        msg_tail,
        watch: false,
        ctime: 0,
        rtime: 0,
    }
}

fn released_ids(releases: &[Flit]) -> Vec<u64> {
    releases.iter().map(|f| f.id).collect()
}

/// Tests that reversed arrivals are released in sequence order and only
/// once the gap closes.
#[test]
fn test_message_granularity_reorders() {
    let mut rob = ReorderBuffer::new(4, Granularity::Message);
    let mut released = Vec::new();

    // Three single-flit packets of one message, arriving in reverse.
    rob.arrive(flit(2, 2, 0, 2, true, true), 10, |f| released.push(f));
    assert!(released.is_empty());
    rob.arrive(flit(1, 1, 0, 1, true, false), 11, |f| released.push(f));
    assert!(released.is_empty());
    rob.arrive(flit(0, 0, 0, 0, true, false), 12, |f| released.push(f));

    assert_eq!(released_ids(&released), vec![0, 1, 2]);
    assert_eq!(rob.occupancy(0, 1), 0);
}

/// Tests that release order is non-decreasing in sequence number for
/// every arrival order of a four-packet message.
#[test]
fn test_message_granularity_all_arrival_orders() {
    let orders: &[[u64; 4]] = &[
        [0, 1, 2, 3],
        [3, 2, 1, 0],
        [2, 0, 3, 1],
        [1, 3, 0, 2],
        [3, 0, 1, 2],
    ];
    for order in orders {
        let mut rob = ReorderBuffer::new(4, Granularity::Message);
        let mut released = Vec::new();
        for &seq in order {
            rob.arrive(
                flit(seq, seq, 0, seq, true, seq == 3),
                seq + 1,
                |f| released.push(f),
            );
        }
        assert_eq!(released_ids(&released), vec![0, 1, 2, 3], "order {:?}", order);
        assert_eq!(rob.occupancy(0, 1), 0);
    }
}

/// Tests that flits of different messages interleave without
/// cross-ordering constraints.
#[test]
fn test_messages_are_independent() {
    let mut rob = ReorderBuffer::new(4, Granularity::Message);
    let mut released = Vec::new();

    // Message 0 is stuck waiting for its first packet; message 1 flows.
    rob.arrive(flit(5, 5, 0, 1, true, true), 1, |f| released.push(f));
    assert!(released.is_empty());
    rob.arrive(flit(6, 6, 1, 0, true, false), 2, |f| released.push(f));
    assert_eq!(released_ids(&released), vec![6]);

    rob.arrive(flit(4, 4, 0, 0, true, false), 3, |f| released.push(f));
    assert_eq!(released_ids(&released), vec![6, 4, 5]);
}

/// Tests that a held multi-flit packet drains in flit-id order once the
/// sequence gap ahead of it closes.
#[test]
fn test_multi_flit_packet_order() {
    let mut rob = ReorderBuffer::new(4, Granularity::Message);
    let mut released = Vec::new();

    // Packet seq 1 (flits 1..=3) arrives in reverse while seq 0 is
    // still missing, so all of it is held.
    let mut body = flit(2, 1, 0, 1, false, false);
    body.head = false;
    let head = flit(1, 1, 0, 1, false, false);
    let tail = flit(3, 1, 0, 1, true, true);

    rob.arrive(tail, 1, |f| released.push(f));
    rob.arrive(body, 2, |f| released.push(f));
    rob.arrive(head, 3, |f| released.push(f));
    assert!(released.is_empty());

    rob.arrive(flit(0, 0, 0, 0, true, false), 4, |f| released.push(f));
    assert_eq!(released_ids(&released), vec![0, 1, 2, 3]);
}

/// Tests packet granularity's shared counter across packets of
/// different messages on one path.
#[test]
fn test_packet_granularity_shared_counter() {
    let mut rob = ReorderBuffer::new(4, Granularity::Packet);
    let mut released = Vec::new();

    // Sequence numbers run per (source, destination, bucket) under
    // packet granularity, regardless of message boundaries.
    rob.arrive(flit(1, 1, 1, 1, true, true), 1, |f| released.push(f));
    assert!(released.is_empty());
    rob.arrive(flit(0, 0, 0, 0, true, true), 2, |f| released.push(f));
    assert_eq!(released_ids(&released), vec![0, 1]);
}

/// Tests that request and reply lanes do not order against each other.
#[test]
fn test_type_buckets_independent() {
    let mut rob = ReorderBuffer::new(4, Granularity::Packet);
    let mut released = Vec::new();

    let mut request = flit(10, 0, 0, 1, true, true);
    request.kind = FlitType::ReadRequest;
    let mut reply = flit(11, 1, 1, 0, true, true);
    reply.kind = FlitType::ReadReply;

    // The request lane is blocked at seq 1; the reply lane is not.
    rob.arrive(request, 1, |f| released.push(f));
    assert!(released.is_empty());
    rob.arrive(reply, 2, |f| released.push(f));
    assert_eq!(released_ids(&released), vec![11]);
}

/// Tests occupancy accounting and the high-water mark.
#[test]
fn test_occupancy_and_high_water() {
    let mut rob = ReorderBuffer::new(4, Granularity::Message);
    let mut released = Vec::new();

    rob.arrive(flit(3, 3, 0, 3, true, true), 1, |f| released.push(f));
    rob.arrive(flit(2, 2, 0, 2, true, false), 2, |f| released.push(f));
    assert_eq!(rob.occupancy(0, 1), 2);
    assert_eq!(rob.high_water(), 2);

    rob.arrive(flit(0, 0, 0, 0, true, false), 3, |f| released.push(f));
    assert_eq!(rob.occupancy(0, 1), 1);

    rob.arrive(flit(1, 1, 0, 1, true, false), 4, |f| released.push(f));
    assert_eq!(rob.occupancy(0, 1), 0);
    assert_eq!(rob.high_water(), 2);
    assert_eq!(released_ids(&released), vec![0, 1, 2, 3]);
}

/// Tests that the retirement timestamp is stamped on tail flits at
/// arrival time.
#[test]
fn test_tail_retirement_timestamp() {
    let mut rob = ReorderBuffer::new(4, Granularity::Message);
    let mut released = Vec::new();

    rob.arrive(flit(0, 0, 0, 0, true, true), 42, |f| released.push(f));
    assert_eq!(released[0].rtime, 42);
}

/// Tests that an out-of-range node id panics rather than corrupting
/// state.
#[test]
#[should_panic(expected = "routed outside the node space")]
fn test_out_of_range_node_panics() {
    let mut rob = ReorderBuffer::new(2, Granularity::Message);
    let mut bad = flit(0, 0, 0, 0, true, true);
    bad.dest = 5;
    rob.arrive(bad, 1, |_| {});
}
