//! Shared test utilities for core module tests
//!
//! Provides common builders to avoid duplication across test suites.
//! This module is only compiled in test mode.

use crate::core::codec::{Record, encode};
use crate::core::engine::PacketInfo;
use crate::core::firewall::{
    AckFilter, Action, NAME_LEN, Port, Protocol, Rule, RuleDirection, RuleName,
};
use proptest::prelude::*;
use std::net::Ipv4Addr;
use strum::IntoEnumIterator;

/// Rule matching every packet in both directions.
pub fn any_rule(name: &str, action: Action) -> Rule {
    Rule::any(name, action).expect("test rule name fits")
}

/// TCP rule on a single destination port, every other field a wildcard.
pub fn tcp_rule(name: &str, direction: RuleDirection, dest_port: u16, action: Action) -> Rule {
    Rule {
        direction,
        protocol: Protocol::Tcp,
        dest_port: Port(dest_port),
        ..any_rule(name, action)
    }
}

/// TCP packet `192.168.1.100:50000 -> 10.0.0.1:<dest_port>` with ACK set.
pub fn tcp_packet(dest_port: u16) -> PacketInfo {
    PacketInfo {
        protocol: Protocol::Tcp,
        src_addr: Ipv4Addr::new(192, 168, 1, 100),
        dst_addr: Ipv4Addr::new(10, 0, 0, 1),
        src_port: 50000,
        dst_port: dest_port,
        ack: true,
    }
}

/// Well-formed record: `ssh_in in 10.0.1.0/24 any tcp any 22 no accept`.
pub fn sample_record() -> Record {
    encode(&Rule {
        name: RuleName::new("ssh_in").expect("fits"),
        direction: RuleDirection::In,
        source: Ipv4Addr::new(10, 0, 1, 0),
        source_prefix_len: 24,
        destination: Ipv4Addr::UNSPECIFIED,
        dest_prefix_len: 0,
        protocol: Protocol::Tcp,
        source_port: Port::ANY,
        dest_port: Port(22),
        ack: AckFilter::No,
        action: Action::Accept,
    })
}

/// Minimal IPv4 packet (IHL 5, no options) carrying `payload`.
pub fn ipv4_packet(protocol: u8, src: [u8; 4], dst: [u8; 4], payload: &[u8]) -> Vec<u8> {
    let total_len = (20 + payload.len()) as u16;
    let mut packet = vec![0x45, 0x00];
    packet.extend_from_slice(&total_len.to_be_bytes());
    packet.extend_from_slice(&[0, 0, 0, 0]); // id, flags, fragment offset
    packet.push(64); // ttl
    packet.push(protocol);
    packet.extend_from_slice(&[0, 0]); // checksum
    packet.extend_from_slice(&src);
    packet.extend_from_slice(&dst);
    packet.extend_from_slice(payload);
    packet
}

/// Strategy producing arbitrary valid rules.
pub fn arb_rule() -> impl Strategy<Value = Rule> {
    let addressing = (
        any::<[u8; NAME_LEN]>(),
        prop::sample::select(RuleDirection::iter().collect::<Vec<_>>()),
        any::<u32>(),
        0u8..=32,
        any::<u32>(),
        0u8..=32,
    );
    let matching = (
        prop::sample::select(Protocol::iter().collect::<Vec<_>>()),
        any::<u16>(),
        any::<u16>(),
        prop::sample::select(AckFilter::iter().collect::<Vec<_>>()),
        prop::sample::select(Action::iter().collect::<Vec<_>>()),
    );
    (addressing, matching).prop_map(
        |(
            (name, direction, src, source_prefix_len, dst, dest_prefix_len),
            (protocol, sport, dport, ack, action),
        )| Rule {
            name: RuleName::from_bytes(name),
            direction,
            source: Ipv4Addr::from(src),
            source_prefix_len,
            destination: Ipv4Addr::from(dst),
            dest_prefix_len,
            protocol,
            source_port: Port(sport),
            dest_port: Port(dport),
            ack,
            action,
        },
    )
}
