//! SECWS - Stateless IPv4 packet filter
//!
//! An ordered rule table and a first-match-wins verdict engine, fed through a
//! fixed-width binary record interface.
//!
//! # Architecture
//!
//! - [`core`] - Rule model, record codec, rule table, verdict engine
//! - [`device`] - Byte-oriented device surface and forward hook
//! - [`validators`] - Field validation for the text rule format
//! - [`config`] - Configuration persistence
//! - [`utils`] - Utility functions (XDG directories, atomic writes)
//!
//! # Guarantees
//!
//! - Table updates are all-or-nothing; a rejected update changes nothing
//! - Classification never blocks on a writer and never sees a half-written table
//! - Packets no rule matches get the configured default policy

// Allow pedantic clippy warnings that are not worth fixing for this codebase
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod core;
pub mod device;
pub mod utils;
pub mod validators;

// Re-export commonly used types
pub use core::error::{Error, Result};
pub use core::firewall::{Direction, Protocol, Rule, Verdict};
pub use device::FirewallDevice;
