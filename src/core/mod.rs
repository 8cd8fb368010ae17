//! Core packet filtering functionality
//!
//! This module contains the rule model, its wire form, the shared rule table
//! and the verdict engine. It provides:
//!
//! - [`firewall`]: Data structures for representing filter rules and verdicts
//! - [`codec`]: Fixed-width binary record encoding and decoding
//! - [`table`]: Bounded rule table with atomic whole-table replacement
//! - [`direction`]: Traversal direction from interface names
//! - [`engine`]: First-match-wins packet classification
//! - [`packet`]: Packet descriptors parsed from raw IPv4 packets
//! - [`error`]: Error types for rule, table and packet operations

pub mod codec;
pub mod direction;
pub mod engine;
pub mod error;
pub mod firewall;
pub mod packet;
pub mod table;

#[cfg(test)]
pub mod test_helpers;
