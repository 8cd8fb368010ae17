//! First-match-wins packet classification
//!
//! The engine scans the rule table in storage order and returns the action of
//! the first rule whose every field matches the packet. Packets no rule
//! matches get the default policy.

use super::firewall::{Direction, Protocol, Rule, Verdict};
use super::table::RuleTable;
use std::net::Ipv4Addr;
use std::sync::Arc;

/// Verdict applied when no rule matches (default-deny).
pub const DEFAULT_POLICY: Verdict = Verdict::Drop;

/// Header fields of one packet, as seen by the matcher.
///
/// `src_port`/`dst_port` are only read for TCP and UDP, `ack` only for TCP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketInfo {
    pub protocol: Protocol,
    pub src_addr: Ipv4Addr,
    pub dst_addr: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
    pub ack: bool,
}

/// Linear first-match-wins classifier over a shared [`RuleTable`].
///
/// `classify` holds no lock while scanning; it works on the table snapshot
/// taken at the start of the call.
#[derive(Debug, Clone)]
pub struct VerdictEngine {
    table: Arc<RuleTable>,
    default_policy: Verdict,
}

impl VerdictEngine {
    pub fn new(table: Arc<RuleTable>, default_policy: Verdict) -> Self {
        Self {
            table,
            default_policy,
        }
    }

    pub fn table(&self) -> &Arc<RuleTable> {
        &self.table
    }

    pub fn default_policy(&self) -> Verdict {
        self.default_policy
    }

    /// Returns the action of the first rule matching `packet` travelling in
    /// `direction`, or the default policy if none does.
    pub fn classify(&self, packet: &PacketInfo, direction: Direction) -> Verdict {
        let rules = self.table.snapshot();
        match rules.iter().find(|r| Self::matches(r, packet, direction)) {
            Some(rule) => {
                tracing::trace!(rule = %rule.name, verdict = %rule.action, "Rule matched");
                rule.action.verdict()
            }
            None => {
                tracing::trace!(verdict = %self.default_policy, "No rule matched, applying default policy");
                self.default_policy
            }
        }
    }

    /// Check if a rule matches a packet on direction, addresses, protocol, ports and ACK.
    pub fn matches(rule: &Rule, packet: &PacketInfo, direction: Direction) -> bool {
        if !rule.direction.matches(direction) {
            return false;
        }

        // Prefix 0 always matches; host bits in the rule address are masked off
        if !rule
            .source_network()
            .is_some_and(|net| net.contains(packet.src_addr))
        {
            return false;
        }
        if !rule
            .destination_network()
            .is_some_and(|net| net.contains(packet.dst_addr))
        {
            return false;
        }

        if !rule.protocol.matches(packet.protocol) {
            return false;
        }

        // Ports only exist on TCP/UDP packets; everything else ignores them
        if packet.protocol.carries_ports()
            && !(rule.source_port.matches(packet.src_port) && rule.dest_port.matches(packet.dst_port))
        {
            return false;
        }

        // Non-TCP packets are exempt from the ACK check
        if packet.protocol == Protocol::Tcp && !rule.ack.matches(packet.ack) {
            return false;
        }

        true
    }
}
