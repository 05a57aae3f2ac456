//! Common types shared across the simulator.
//!
//! This module provides the transport unit model (flits, pending
//! replies) and the fatal error types raised during configuration and
//! pattern construction.

/// Fatal configuration and construction error types.
pub mod error;

/// Flit, flit type, and pending-reply definitions.
pub mod flit;

pub use error::ConfigError;
pub use flit::{Flit, FlitType, PendingReply, TYPE_BUCKETS};
