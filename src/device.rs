//! Firewall device: the external surface of the filter
//!
//! The device exposes two byte-oriented attributes and the forward hook:
//!
//! - `rules`: read dumps the table as concatenated records, write replaces it
//!   atomically from the same format
//! - `log`: accepted for compatibility, reads are always empty and writes are
//!   discarded
//! - `inspect`: resolve direction from the interfaces, then classify
//!
//! The device can also persist its table to a file so that separate CLI
//! invocations share one rule set.

use crate::config::EngineConfig;
use crate::core::direction::InterfaceConvention;
use crate::core::engine::{PacketInfo, VerdictEngine};
use crate::core::error::{Result, TableError};
use crate::core::firewall::{Rule, Verdict};
use crate::core::table::RuleTable;
use crate::utils::write_atomic;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct FirewallDevice {
    engine: VerdictEngine,
    interfaces: InterfaceConvention,
}

impl FirewallDevice {
    /// Creates a device with an empty table
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            engine: VerdictEngine::new(Arc::new(RuleTable::new()), config.default_policy),
            interfaces: config.interfaces,
        }
    }

    pub fn table(&self) -> &Arc<RuleTable> {
        self.engine.table()
    }

    /// Reads the `rules` attribute
    pub fn rules_show(&self) -> Vec<u8> {
        let bytes = self.table().dump_records();
        tracing::debug!(bytes = bytes.len(), "rules read");
        bytes
    }

    /// Writes the `rules` attribute, returning the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// Any [`TableError`]; the table keeps its previous contents.
    pub fn rules_store(&self, bytes: &[u8]) -> std::result::Result<usize, TableError> {
        tracing::debug!(bytes = bytes.len(), "rules write");
        self.table().store_records(bytes)
    }

    /// Reads the `log` attribute. There is no log, so it is always empty.
    pub fn log_show(&self) -> Vec<u8> {
        Vec::new()
    }

    /// Writes the `log` attribute. Input is ignored.
    pub fn log_store(&self, bytes: &[u8]) -> usize {
        tracing::debug!(bytes = bytes.len(), "log write ignored");
        0
    }

    /// Forward hook for a parsed packet
    pub fn inspect(&self, packet: &PacketInfo, ingress: &str, egress: &str) -> Verdict {
        let direction = self.interfaces.resolve(ingress, egress);
        self.engine.classify(packet, direction)
    }

    /// Forward hook for a raw IPv4 packet.
    ///
    /// A packet that cannot be parsed gets the default policy.
    pub fn inspect_raw(&self, packet: &[u8], ingress: &str, egress: &str) -> Verdict {
        match PacketInfo::parse(packet) {
            Ok(info) => self.inspect(&info, ingress, egress),
            Err(e) => {
                tracing::debug!(error = %e, "Unparsable packet, applying default policy");
                self.engine.default_policy()
            }
        }
    }

    /// Replaces the table from already-parsed rules
    ///
    /// # Errors
    ///
    /// Any [`TableError`]; the table keeps its previous contents.
    pub fn load_rules(&self, rules: Vec<Rule>) -> std::result::Result<(), TableError> {
        self.table().replace_all(rules)
    }

    /// Restores the table from a records file. A missing file leaves the table
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the file cannot be read or its contents are rejected.
    pub fn restore(&self, path: &Path) -> Result<()> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        self.rules_store(&bytes)?;
        tracing::debug!(path = %path.display(), "Restored rule table");
        Ok(())
    }

    /// Writes the current table to a records file atomically.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the file cannot be written.
    pub fn persist(&self, path: &Path) -> Result<()> {
        write_atomic(path, &self.rules_show())?;
        tracing::debug!(path = %path.display(), "Persisted rule table");
        Ok(())
    }
}
