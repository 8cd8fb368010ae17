//! Fixed-width binary rule records
//!
//! Every rule travels as one [`RECORD_WIDTH`]-byte record; a table is the
//! plain concatenation of its records. Multi-byte fields are big-endian.
//!
//! | offset | width | field             |
//! |--------|-------|-------------------|
//! | 0      | 20    | name (opaque)     |
//! | 20     | 1     | direction tag     |
//! | 21     | 4     | source address    |
//! | 25     | 1     | source prefix len |
//! | 26     | 4     | dest address      |
//! | 30     | 1     | dest prefix len   |
//! | 31     | 1     | protocol tag      |
//! | 32     | 2     | source port       |
//! | 34     | 2     | dest port         |
//! | 36     | 1     | ack tag           |
//! | 37     | 1     | action tag        |

use super::error::{InvalidRule, RecordError};
use super::firewall::{
    AckFilter, Action, NAME_LEN, Port, Protocol, Rule, RuleDirection, RuleName,
};
use std::net::Ipv4Addr;

const NAME_OFFSET: usize = 0;
const DIRECTION_OFFSET: usize = NAME_OFFSET + NAME_LEN;
const SRC_IP_OFFSET: usize = DIRECTION_OFFSET + 1;
const SRC_PREFIX_OFFSET: usize = SRC_IP_OFFSET + 4;
const DST_IP_OFFSET: usize = SRC_PREFIX_OFFSET + 1;
const DST_PREFIX_OFFSET: usize = DST_IP_OFFSET + 4;
const PROTOCOL_OFFSET: usize = DST_PREFIX_OFFSET + 1;
const SRC_PORT_OFFSET: usize = PROTOCOL_OFFSET + 1;
const DST_PORT_OFFSET: usize = SRC_PORT_OFFSET + 2;
const ACK_OFFSET: usize = DST_PORT_OFFSET + 2;
const ACTION_OFFSET: usize = ACK_OFFSET + 1;

/// Size of one encoded rule in bytes
pub const RECORD_WIDTH: usize = ACTION_OFFSET + 1;

pub type Record = [u8; RECORD_WIDTH];

fn read_ipv4(record: &Record, offset: usize) -> Ipv4Addr {
    Ipv4Addr::new(
        record[offset],
        record[offset + 1],
        record[offset + 2],
        record[offset + 3],
    )
}

fn read_u16(record: &Record, offset: usize) -> u16 {
    u16::from_be_bytes([record[offset], record[offset + 1]])
}

/// Decodes one record.
///
/// Fields are checked in layout order and the first bad one is reported, so a
/// successfully decoded rule always passes [`Rule::validate`].
///
/// # Errors
///
/// - [`RecordError::Malformed`] if `bytes` is not exactly one record wide
/// - [`RecordError::Invalid`] if a tag or prefix length is out of range
pub fn decode(bytes: &[u8]) -> Result<Rule, RecordError> {
    let record = <&Record>::try_from(bytes).map_err(|_| RecordError::Malformed {
        len: bytes.len(),
        expected: RECORD_WIDTH,
    })?;

    let mut name = [0u8; NAME_LEN];
    name.copy_from_slice(&record[NAME_OFFSET..DIRECTION_OFFSET]);

    let direction = RuleDirection::from_tag(record[DIRECTION_OFFSET])
        .ok_or(InvalidRule::UnknownDirection(record[DIRECTION_OFFSET]))?;

    let rule = Rule {
        name: RuleName::from_bytes(name),
        direction,
        source: read_ipv4(record, SRC_IP_OFFSET),
        source_prefix_len: record[SRC_PREFIX_OFFSET],
        destination: read_ipv4(record, DST_IP_OFFSET),
        dest_prefix_len: record[DST_PREFIX_OFFSET],
        // Placeholders until the prefix lengths have been checked, keeping
        // the reported violation in layout order.
        protocol: Protocol::Any,
        source_port: Port(read_u16(record, SRC_PORT_OFFSET)),
        dest_port: Port(read_u16(record, DST_PORT_OFFSET)),
        ack: AckFilter::Any,
        action: Action::Drop,
    };
    rule.validate()?;

    Ok(Rule {
        protocol: Protocol::from_tag(record[PROTOCOL_OFFSET])
            .ok_or(InvalidRule::UnknownProtocol(record[PROTOCOL_OFFSET]))?,
        ack: AckFilter::from_tag(record[ACK_OFFSET])
            .ok_or(InvalidRule::UnknownAck(record[ACK_OFFSET]))?,
        action: Action::from_tag(record[ACTION_OFFSET])
            .ok_or(InvalidRule::UnknownAction(record[ACTION_OFFSET]))?,
        ..rule
    })
}

/// Encodes one rule. Inverse of [`decode`] for every valid rule.
pub fn encode(rule: &Rule) -> Record {
    let mut record = [0u8; RECORD_WIDTH];
    record[NAME_OFFSET..DIRECTION_OFFSET].copy_from_slice(rule.name.as_bytes());
    record[DIRECTION_OFFSET] = rule.direction.tag();
    record[SRC_IP_OFFSET..SRC_PREFIX_OFFSET].copy_from_slice(&rule.source.octets());
    record[SRC_PREFIX_OFFSET] = rule.source_prefix_len;
    record[DST_IP_OFFSET..DST_PREFIX_OFFSET].copy_from_slice(&rule.destination.octets());
    record[DST_PREFIX_OFFSET] = rule.dest_prefix_len;
    record[PROTOCOL_OFFSET] = rule.protocol.tag();
    record[SRC_PORT_OFFSET..DST_PORT_OFFSET].copy_from_slice(&rule.source_port.0.to_be_bytes());
    record[DST_PORT_OFFSET..ACK_OFFSET].copy_from_slice(&rule.dest_port.0.to_be_bytes());
    record[ACK_OFFSET] = rule.ack.tag();
    record[ACTION_OFFSET] = rule.action.tag();
    record
}

/// Concatenates the records of `rules` in order
pub fn encode_all(rules: &[Rule]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rules.len() * RECORD_WIDTH);
    for rule in rules {
        out.extend_from_slice(&encode(rule));
    }
    out
}
