//! Firewall rule data structures
//!
//! This module defines the rule model held by the [`RuleTable`](super::table::RuleTable)
//! and matched by the [`VerdictEngine`](super::engine::VerdictEngine).
//!
//! # Rule Structure
//!
//! A [`Rule`] represents a single filter condition with:
//! - A fixed-width, opaque name
//! - Traversal direction (In/Out/Any)
//! - Source and destination IPv4 CIDRs (prefix length 0 matches anything)
//! - Protocol (TCP, UDP, ICMP, Other, Any)
//! - Source and destination ports, meaningful only for TCP/UDP
//! - Required TCP ACK flag state
//! - Action (Accept/Drop)
//!
//! Every enumeration carries the one-byte tag it is stored under in the binary
//! record (see [`codec`](super::codec)).
//!
//! # Text Form
//!
//! Rules also have a one-line text form used by the CLI:
//!
//! ```
//! use secws::core::firewall::Rule;
//!
//! let rule: Rule = "http_out out 10.0.1.0/24 any tcp any 80 any drop".parse().unwrap();
//! assert_eq!(rule.to_string(), "http_out out 10.0.1.0/24 any tcp any 80 any drop");
//! ```

use super::error::{self, Error, InvalidRule, RuleSyntaxError};
use crate::validators;
use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Width of the name field in bytes
pub const NAME_LEN: usize = 20;

/// Direction a packet traverses the filter, derived per packet and never stored
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
pub enum Direction {
    /// Entering the protected network
    #[strum(serialize = "in")]
    In,
    /// Leaving the protected network
    #[strum(serialize = "out")]
    Out,
}

/// Direction a rule applies to
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
pub enum RuleDirection {
    #[strum(serialize = "in")]
    In,
    #[strum(serialize = "out")]
    Out,
    #[strum(serialize = "any")]
    Any,
}

impl RuleDirection {
    pub const fn tag(self) -> u8 {
        match self {
            RuleDirection::In => 0x01,
            RuleDirection::Out => 0x02,
            RuleDirection::Any => 0x03,
        }
    }

    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x01 => Some(RuleDirection::In),
            0x02 => Some(RuleDirection::Out),
            0x03 => Some(RuleDirection::Any),
            _ => None,
        }
    }

    #[inline]
    pub fn matches(self, direction: Direction) -> bool {
        match self {
            RuleDirection::Any => true,
            RuleDirection::In => direction == Direction::In,
            RuleDirection::Out => direction == Direction::Out,
        }
    }
}

/// Transport protocol of a rule or a packet.
///
/// `Any` only makes sense on a rule; a packet whose IP protocol number is not
/// ICMP, TCP or UDP is described as `Other`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
pub enum Protocol {
    #[strum(serialize = "icmp")]
    Icmp,
    #[strum(serialize = "tcp")]
    Tcp,
    #[strum(serialize = "udp")]
    Udp,
    #[strum(serialize = "other")]
    Other,
    #[strum(serialize = "any")]
    Any,
}

impl Protocol {
    /// Record tag. ICMP/TCP/UDP reuse their IP protocol numbers.
    pub const fn tag(self) -> u8 {
        match self {
            Protocol::Icmp => 1,
            Protocol::Tcp => 6,
            Protocol::Udp => 17,
            Protocol::Other => 255,
            Protocol::Any => 143,
        }
    }

    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Protocol::Icmp),
            6 => Some(Protocol::Tcp),
            17 => Some(Protocol::Udp),
            255 => Some(Protocol::Other),
            143 => Some(Protocol::Any),
            _ => None,
        }
    }

    /// Maps the IPv4 header protocol number of a packet
    pub const fn from_ip_number(number: u8) -> Self {
        match number {
            1 => Protocol::Icmp,
            6 => Protocol::Tcp,
            17 => Protocol::Udp,
            _ => Protocol::Other,
        }
    }

    /// Returns `true` for protocols whose packets carry ports
    #[inline]
    pub const fn carries_ports(self) -> bool {
        matches!(self, Protocol::Tcp | Protocol::Udp)
    }

    #[inline]
    pub fn matches(self, packet: Protocol) -> bool {
        self == Protocol::Any || self == packet
    }
}

/// Required state of the TCP ACK flag
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
pub enum AckFilter {
    #[strum(serialize = "no")]
    No,
    #[strum(serialize = "yes")]
    Yes,
    #[strum(serialize = "any")]
    Any,
}

impl AckFilter {
    pub const fn tag(self) -> u8 {
        match self {
            AckFilter::No => 0x01,
            AckFilter::Yes => 0x02,
            AckFilter::Any => 0x03,
        }
    }

    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x01 => Some(AckFilter::No),
            0x02 => Some(AckFilter::Yes),
            0x03 => Some(AckFilter::Any),
            _ => None,
        }
    }

    #[inline]
    pub fn matches(self, ack: bool) -> bool {
        match self {
            AckFilter::Any => true,
            AckFilter::Yes => ack,
            AckFilter::No => !ack,
        }
    }
}

/// Rule action
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
pub enum Action {
    #[strum(serialize = "drop")]
    Drop,
    #[strum(serialize = "accept")]
    Accept,
}

impl Action {
    /// Record tag, matching netfilter's `NF_DROP`/`NF_ACCEPT`
    pub const fn tag(self) -> u8 {
        match self {
            Action::Drop => 0,
            Action::Accept => 1,
        }
    }

    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Action::Drop),
            1 => Some(Action::Accept),
            _ => None,
        }
    }

    pub const fn verdict(self) -> Verdict {
        match self {
            Action::Drop => Verdict::Drop,
            Action::Accept => Verdict::Accept,
        }
    }
}

/// Outcome of classifying one packet
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    #[strum(serialize = "accept")]
    Accept,
    #[strum(serialize = "drop")]
    Drop,
}

/// A 16-bit port where 0 stands for "any port"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Port(pub u16);

impl Port {
    pub const ANY: Port = Port(0);

    pub const fn is_any(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn matches(self, port: u16) -> bool {
        self.is_any() || self.0 == port
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_any() {
            f.write_str("any")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Prefix marking a name written as hex bytes in the text form
pub const HEX_NAME_PREFIX: &str = "0x";

/// Fixed-width rule label. Opaque bytes; carries no matching semantics.
///
/// `Display` writes the text-form token: the plain name when it is printable
/// ASCII followed only by NUL padding, otherwise [`HEX_NAME_PREFIX`] and the
/// bytes in hex with trailing NULs dropped.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RuleName([u8; NAME_LEN]);

impl RuleName {
    pub const fn from_bytes(bytes: [u8; NAME_LEN]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; NAME_LEN] {
        &self.0
    }

    /// Builds a NUL-padded name, or `None` if `name` does not fit
    pub fn new(name: &str) -> Option<Self> {
        let src = name.as_bytes();
        if src.len() > NAME_LEN {
            return None;
        }
        let mut bytes = [0u8; NAME_LEN];
        bytes[..src.len()].copy_from_slice(src);
        Some(Self(bytes))
    }

    /// Parses the hex token body (without [`HEX_NAME_PREFIX`]), NUL padding
    /// the rest. `None` on odd length, non-hex digits or more than
    /// [`NAME_LEN`] bytes.
    pub fn from_hex(digits: &str) -> Option<Self> {
        if digits.len() % 2 != 0 || digits.len() > NAME_LEN * 2 {
            return None;
        }
        let mut bytes = [0u8; NAME_LEN];
        for (slot, pair) in bytes.iter_mut().zip(digits.as_bytes().chunks_exact(2)) {
            let pair = std::str::from_utf8(pair).ok()?;
            *slot = u8::from_str_radix(pair, 16).ok()?;
        }
        Some(Self(bytes))
    }

    /// Returns `true` if the plain text token reproduces these bytes exactly
    fn is_plain(&self) -> bool {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        let (text, padding) = self.0.split_at(end);
        !text.is_empty()
            && text.iter().all(u8::is_ascii_graphic)
            && padding.iter().all(|&b| b == 0)
            && !text.starts_with(HEX_NAME_PREFIX.as_bytes())
            && !text.starts_with(b"#")
    }

    /// Bytes up to the first NUL, decoded lossily
    pub fn to_string_lossy(&self) -> String {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        String::from_utf8_lossy(&self.0[..end]).into_owned()
    }
}

impl fmt::Debug for RuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RuleName({:?})", self.to_string_lossy())
    }
}

impl fmt::Display for RuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_plain() {
            return f.write_str(&self.to_string_lossy());
        }
        let len = self.0.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        f.write_str(HEX_NAME_PREFIX)?;
        for byte in &self.0[..len] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rule {
    pub name: RuleName,
    pub direction: RuleDirection,
    pub source: Ipv4Addr,
    pub source_prefix_len: u8,
    pub destination: Ipv4Addr,
    pub dest_prefix_len: u8,
    pub protocol: Protocol,
    pub source_port: Port,
    pub dest_port: Port,
    /// Only checked against TCP packets
    pub ack: AckFilter,
    pub action: Action,
}

impl Rule {
    /// Catch-all rule: every field set to its wildcard.
    pub fn any(name: &str, action: Action) -> Option<Self> {
        Some(Self {
            name: RuleName::new(name)?,
            direction: RuleDirection::Any,
            source: Ipv4Addr::UNSPECIFIED,
            source_prefix_len: 0,
            destination: Ipv4Addr::UNSPECIFIED,
            dest_prefix_len: 0,
            protocol: Protocol::Any,
            source_port: Port::ANY,
            dest_port: Port::ANY,
            ack: AckFilter::Any,
            action,
        })
    }

    /// Checks every range-constrained field, reporting the first violation in
    /// record field order. Enumerated fields are valid by construction.
    pub fn validate(&self) -> Result<(), InvalidRule> {
        if self.source_prefix_len > 32 {
            return Err(InvalidRule::SourcePrefixTooLong(self.source_prefix_len));
        }
        if self.dest_prefix_len > 32 {
            return Err(InvalidRule::DestPrefixTooLong(self.dest_prefix_len));
        }
        Ok(())
    }

    /// Source CIDR, or `None` if the prefix length is out of range
    pub fn source_network(&self) -> Option<Ipv4Network> {
        Ipv4Network::new(self.source, self.source_prefix_len).ok()
    }

    /// Destination CIDR, or `None` if the prefix length is out of range
    pub fn destination_network(&self) -> Option<Ipv4Network> {
        Ipv4Network::new(self.destination, self.dest_prefix_len).ok()
    }
}

fn fmt_cidr(f: &mut fmt::Formatter<'_>, addr: Ipv4Addr, prefix_len: u8) -> fmt::Result {
    // Other addresses under /0 are written in full
    if prefix_len == 0 && addr.is_unspecified() {
        f.write_str("any")
    } else {
        write!(f, "{addr}/{prefix_len}")
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ", self.name, self.direction)?;
        fmt_cidr(f, self.source, self.source_prefix_len)?;
        f.write_str(" ")?;
        fmt_cidr(f, self.destination, self.dest_prefix_len)?;
        write!(
            f,
            " {} {} {} {} {}",
            self.protocol, self.source_port, self.dest_port, self.ack, self.action
        )
    }
}

fn parse_enum<T: FromStr>(field: &'static str, token: &str) -> Result<T, RuleSyntaxError> {
    token
        .to_ascii_lowercase()
        .parse()
        .map_err(|_| RuleSyntaxError::new(field, format!("unrecognised value '{token}'")))
}

impl FromStr for Rule {
    type Err = RuleSyntaxError;

    /// Parses `<name> <dir> <src> <dst> <proto> <sport> <dport> <ack> <action>`
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let [name, direction, src, dst, protocol, sport, dport, ack, action] = tokens[..] else {
            return Err(RuleSyntaxError::new(
                "rule",
                format!("expected 9 fields, found {}", tokens.len()),
            ));
        };

        let (source, source_prefix_len) = validators::parse_cidr(src)?;
        let (destination, dest_prefix_len) = validators::parse_cidr(dst)?;

        Ok(Rule {
            name: validators::validate_name(name)?,
            direction: parse_enum("direction", direction)?,
            source,
            source_prefix_len,
            destination,
            dest_prefix_len,
            protocol: parse_enum("protocol", protocol)?,
            source_port: validators::parse_port(sport)?,
            dest_port: validators::parse_port(dport)?,
            ack: parse_enum("ack", ack)?,
            action: parse_enum("action", action)?,
        })
    }
}

/// Parses a rule file: one rule per line in storage order.
///
/// Blank lines and lines starting with `#` are skipped. Errors carry the
/// 1-based line number.
///
/// # Errors
///
/// Returns [`Error::Syntax`] for the first line that fails to parse.
pub fn parse_rules(text: &str) -> error::Result<Vec<Rule>> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line, text)| {
            text.parse::<Rule>()
                .map_err(|source| Error::Syntax { line, source })
        })
        .collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::core::test_helpers::arb_rule;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_text_form_round_trips(rule in arb_rule()) {
            let line = rule.to_string();
            prop_assert_eq!(line.parse::<Rule>(), Ok(rule));
            prop_assert_eq!(parse_rules(&line).unwrap(), vec![rule]);
        }
    }
}
