//! Interconnection-Network Traffic Front End.
//!
//! This crate implements the traffic-generation and delivery-ordering
//! front end of a cycle-accurate interconnection-network simulator.
//! Every simulated cycle it decides which endpoint nodes inject new
//! transport units, where they are headed, and in what order arriving
//! units are handed back to the application layer once they leave the
//! fabric.
//!
//! # Architecture
//!
//! * **Traffic patterns**: destination-selection strategies built from a
//!   spec string (bit permutations, digit permutations, random and
//!   selective variants, hotspots, group permutations).
//! * **Batch controller**: paces per-node message generation under
//!   outstanding-request limits and read/write semantics, and detects
//!   batch completion and network drain.
//! * **Reorder buffer**: restores packet-sequence order per (source,
//!   destination, class) at packet or message granularity.
//!
//! The router/crossbar simulation itself is a collaborator behind the
//! [`sim::fabric::Fabric`] trait; a latency-model implementation ships
//! for the CLI and the tests.
//!
//! # Modules
//!
//! * `common`: transport unit model and error types.
//! * `config`: configuration loading and parsing.
//! * `reorder`: delivery-order restoration.
//! * `sim`: simulation harness, injection processes, fabric seam.
//! * `stats`: run statistics collection.
//! * `traffic`: destination-selection strategies.

/// Transport unit model and fatal error types.
pub mod common;

/// Configuration system for topology, traffic, batch, and fabric
/// settings.
///
/// Loads and parses TOML configuration files; per-class list options
/// extend with their last value.
pub mod config;

/// Reorder buffer restoring delivery order per (source, destination,
/// class) at configurable granularity.
pub mod reorder;

/// Simulation harness: batch injection controller, injection processes,
/// and the fabric seam.
pub mod sim;

/// Run statistics collection and reporting.
pub mod stats;

/// Traffic pattern engine: destination-selection strategies selected by
/// name plus parameters.
pub mod traffic;
