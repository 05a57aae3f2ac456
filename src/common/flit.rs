//! Transport Unit Model.
//!
//! This module defines the units that move through the simulated fabric:
//! flits (the smallest transport unit), the packet/message identity they
//! carry, and the reply obligations queued at a node while a request
//! awaits its answer. Flits are plain data; all behavior lives in the
//! injection controller and the reorder buffer.

/// Classification of a flit's payload.
///
/// Request-like types (including plain data) and reply-like types are
/// reordered independently of each other; `bucket()` folds the five
/// variants into those two ordering lanes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlitType {
    /// Plain data traffic with no request/reply pairing.
    Data,

    /// Read request issued by a compute node.
    ReadRequest,

    /// Reply carrying the data for an earlier read request.
    ReadReply,

    /// Write request issued by a compute node.
    WriteRequest,

    /// Acknowledgement for an earlier write request.
    WriteReply,
}

/// Number of independent reordering lanes per (source, destination) pair.
pub const TYPE_BUCKETS: usize = 2;

impl FlitType {
    /// Folds the flit type into its reordering lane.
    ///
    /// Requests and plain data share lane 0, replies use lane 1, so a
    /// reply stream is never ordered against the request stream that
    /// produced it.
    pub fn bucket(self) -> usize {
        match self {
            FlitType::Data | FlitType::ReadRequest | FlitType::WriteRequest => 0,
            FlitType::ReadReply | FlitType::WriteReply => 1,
        }
    }

    /// Returns true for the two request variants.
    pub fn is_request(self) -> bool {
        matches!(self, FlitType::ReadRequest | FlitType::WriteRequest)
    }

    /// Returns true for the two reply variants.
    pub fn is_reply(self) -> bool {
        matches!(self, FlitType::ReadReply | FlitType::WriteReply)
    }

    /// Maps a request type to the reply type that answers it.
    ///
    /// # Panics
    ///
    /// Panics if called on a non-request variant; pairing a reply to a
    /// reply is a logic error in the caller.
    pub fn reply_type(self) -> FlitType {
        match self {
            FlitType::ReadRequest => FlitType::ReadReply,
            FlitType::WriteRequest => FlitType::WriteReply,
            _ => panic!("no reply type for {:?}", self),
        }
    }
}

/// Smallest transport unit.
///
/// Created by the injection controller, owned by the fabric while in
/// transit, moved into the reorder buffer on arrival and consumed by
/// retirement. Identity fields order flits within their packet and
/// packets within their ordering scope.
#[derive(Clone, Debug)]
pub struct Flit {
    /// Globally unique id, strictly increasing in issue order.
    pub id: u64,
    /// Id of the owning packet.
    pub pid: u64,
    /// Id of the owning message.
    pub mid: u64,
    /// Source node.
    pub src: usize,
    /// Destination node.
    pub dest: usize,
    /// Traffic class.
    pub class: usize,
    /// Payload classification.
    pub kind: FlitType,
    /// Sequence number of the owning packet within its ordering scope.
    pub packet_seq: u64,
    /// First flit of its packet.
    pub head: bool,
    /// Last flit of its packet.
    pub tail: bool,
    /// Set only on the tail flit of the last packet of a message.
    pub msg_tail: bool,
    /// Debug flag; watched flits are traced through the reorder buffer.
    pub watch: bool,
    /// Cycle the flit was created.
    pub ctime: u64,
    /// Cycle the tail flit left the fabric; 0 until retirement.
    pub rtime: u64,
}

/// Reply obligation queued at a responding node.
///
/// Pushed when a request message fully retires at its destination and
/// popped when the reply message is issued. `time` is the earliest cycle
/// the reply may be injected.
#[derive(Clone, Copy, Debug)]
pub struct PendingReply {
    /// Reply type answering the retired request.
    pub kind: FlitType,
    /// Node that issued the request and awaits the reply.
    pub requester: usize,
    /// Not-before injection time.
    pub time: u64,
}
