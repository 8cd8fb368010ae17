//! Packet descriptors from raw IPv4 packets
//!
//! The forward hook sees packets starting at the IP header (no link layer).
//! Only the fields the matcher reads are extracted.

use super::engine::PacketInfo;
use super::error::PacketError;
use super::firewall::Protocol;
use std::net::Ipv4Addr;

const IP_HEADER_MIN_SIZE: usize = 20;
const IP_IHL_MASK: u8 = 0x0F;
const IP_FLAGS_OFFSET: usize = 6;
const IP_FRAGMENT_OFFSET_MASK: u16 = 0x1FFF;
const IP_PROTOCOL_OFFSET: usize = 9;
const IP_SRC_OFFSET: usize = 12;
const IP_DST_OFFSET: usize = 16;

const UDP_HEADER_SIZE: usize = 8;
const TCP_HEADER_MIN_SIZE: usize = 20;
const TCP_FLAGS_OFFSET: usize = 13;
const TCP_FLAG_ACK: u8 = 0x10;

fn ensure(packet: &[u8], needed: usize) -> Result<(), PacketError> {
    if packet.len() < needed {
        Err(PacketError::Truncated {
            len: packet.len(),
            needed,
        })
    } else {
        Ok(())
    }
}

fn addr_at(packet: &[u8], offset: usize) -> Ipv4Addr {
    Ipv4Addr::new(
        packet[offset],
        packet[offset + 1],
        packet[offset + 2],
        packet[offset + 3],
    )
}

fn u16_at(packet: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([packet[offset], packet[offset + 1]])
}

impl PacketInfo {
    /// Builds a descriptor from a packet starting at its IPv4 header.
    ///
    /// Non-initial fragments have no transport header; they are described
    /// with ports 0 and the ACK flag clear.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the packet is not IPv4, has an IHL below 5, or is too
    /// short for the headers it announces.
    pub fn parse(packet: &[u8]) -> Result<Self, PacketError> {
        ensure(packet, 1)?;
        let version = packet[0] >> 4;
        if version != 4 {
            return Err(PacketError::NotIpv4(version));
        }

        let header_len = usize::from(packet[0] & IP_IHL_MASK) * 4;
        if header_len < IP_HEADER_MIN_SIZE {
            return Err(PacketError::BadHeaderLength(header_len));
        }
        ensure(packet, header_len)?;

        let protocol = Protocol::from_ip_number(packet[IP_PROTOCOL_OFFSET]);
        let mut info = PacketInfo {
            protocol,
            src_addr: addr_at(packet, IP_SRC_OFFSET),
            dst_addr: addr_at(packet, IP_DST_OFFSET),
            src_port: 0,
            dst_port: 0,
            ack: false,
        };

        let fragment_offset = u16_at(packet, IP_FLAGS_OFFSET) & IP_FRAGMENT_OFFSET_MASK;
        if fragment_offset != 0 {
            return Ok(info);
        }

        let l4 = header_len;
        match protocol {
            Protocol::Tcp => {
                ensure(packet, l4 + TCP_HEADER_MIN_SIZE)?;
                info.src_port = u16_at(packet, l4);
                info.dst_port = u16_at(packet, l4 + 2);
                info.ack = packet[l4 + TCP_FLAGS_OFFSET] & TCP_FLAG_ACK != 0;
            }
            Protocol::Udp => {
                ensure(packet, l4 + UDP_HEADER_SIZE)?;
                info.src_port = u16_at(packet, l4);
                info.dst_port = u16_at(packet, l4 + 2);
            }
            _ => {}
        }

        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_helpers::ipv4_packet;

    #[test]
    fn test_parse_tcp() {
        let packet = ipv4_packet(6, [10, 0, 1, 1], [10, 0, 2, 2], &{
            let mut tcp = [0u8; 20];
            tcp[..2].copy_from_slice(&40000u16.to_be_bytes());
            tcp[2..4].copy_from_slice(&80u16.to_be_bytes());
            tcp[13] = 0x12; // SYN|ACK
            tcp
        });
        let info = PacketInfo::parse(&packet).unwrap();
        assert_eq!(info.protocol, Protocol::Tcp);
        assert_eq!(info.src_addr, Ipv4Addr::new(10, 0, 1, 1));
        assert_eq!(info.dst_addr, Ipv4Addr::new(10, 0, 2, 2));
        assert_eq!(info.src_port, 40000);
        assert_eq!(info.dst_port, 80);
        assert!(info.ack);
    }

    #[test]
    fn test_parse_tcp_syn_has_no_ack() {
        let mut tcp = [0u8; 20];
        tcp[13] = 0x02;
        let info = PacketInfo::parse(&ipv4_packet(6, [1, 1, 1, 1], [2, 2, 2, 2], &tcp)).unwrap();
        assert!(!info.ack);
    }

    #[test]
    fn test_parse_udp() {
        let mut udp = [0u8; 8];
        udp[..2].copy_from_slice(&5353u16.to_be_bytes());
        udp[2..4].copy_from_slice(&53u16.to_be_bytes());
        let info = PacketInfo::parse(&ipv4_packet(17, [1, 1, 1, 1], [8, 8, 8, 8], &udp)).unwrap();
        assert_eq!(info.protocol, Protocol::Udp);
        assert_eq!(info.src_port, 5353);
        assert_eq!(info.dst_port, 53);
        assert!(!info.ack);
    }

    #[test]
    fn test_parse_icmp_and_other() {
        let icmp = PacketInfo::parse(&ipv4_packet(1, [1, 1, 1, 1], [2, 2, 2, 2], &[8, 0, 0, 0])).unwrap();
        assert_eq!(icmp.protocol, Protocol::Icmp);
        assert_eq!((icmp.src_port, icmp.dst_port), (0, 0));

        let gre = PacketInfo::parse(&ipv4_packet(47, [1, 1, 1, 1], [2, 2, 2, 2], &[])).unwrap();
        assert_eq!(gre.protocol, Protocol::Other);
    }

    #[test]
    fn test_parse_rejects_ipv6() {
        let mut packet = ipv4_packet(6, [1, 1, 1, 1], [2, 2, 2, 2], &[0; 20]);
        packet[0] = 0x60;
        assert_eq!(PacketInfo::parse(&packet), Err(PacketError::NotIpv4(6)));
    }

    #[test]
    fn test_parse_rejects_small_ihl() {
        let mut packet = ipv4_packet(6, [1, 1, 1, 1], [2, 2, 2, 2], &[0; 20]);
        packet[0] = 0x44;
        assert_eq!(PacketInfo::parse(&packet), Err(PacketError::BadHeaderLength(16)));
    }

    #[test]
    fn test_parse_truncated() {
        assert!(matches!(PacketInfo::parse(&[]), Err(PacketError::Truncated { .. })));
        assert!(matches!(
            PacketInfo::parse(&[0x45, 0, 0, 20]),
            Err(PacketError::Truncated { needed: 20, .. })
        ));

        let short_tcp = ipv4_packet(6, [1, 1, 1, 1], [2, 2, 2, 2], &[0; 10]);
        assert_eq!(
            PacketInfo::parse(&short_tcp),
            Err(PacketError::Truncated { len: 30, needed: 40 })
        );
    }

    #[test]
    fn test_parse_honours_ip_options() {
        // IHL 6: one 4-byte option word before the UDP header
        let mut packet = ipv4_packet(17, [1, 1, 1, 1], [2, 2, 2, 2], &[0, 0, 0, 0]);
        packet[0] = 0x46;
        packet.extend_from_slice(&[0x13, 0x88, 0x00, 0x35, 0, 8, 0, 0]);
        let info = PacketInfo::parse(&packet).unwrap();
        assert_eq!(info.src_port, 5000);
        assert_eq!(info.dst_port, 53);
    }

    #[test]
    fn test_non_initial_fragment_has_no_ports() {
        let mut packet = ipv4_packet(6, [1, 1, 1, 1], [2, 2, 2, 2], &[0xAB; 8]);
        packet[6..8].copy_from_slice(&0x0010u16.to_be_bytes());
        let info = PacketInfo::parse(&packet).unwrap();
        assert_eq!(info.protocol, Protocol::Tcp);
        assert_eq!((info.src_port, info.dst_port, info.ack), (0, 0, false));
    }
}
