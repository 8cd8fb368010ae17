//! Traversal direction from interface names
//!
//! The filter sits between two interfaces that differ in a single marker
//! character at a fixed position of their names (`enp0s8`, `enp0s9`). A
//! packet arriving on the inside-marked interface and leaving on the
//! outside-marked one is [`Direction::In`]. Every other pairing, including
//! names too short to carry a marker, is [`Direction::Out`].

use super::firewall::Direction;
use serde::{Deserialize, Serialize};

/// Interface naming convention used to tell the two sides apart
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InterfaceConvention {
    /// Byte offset of the marker within the interface name
    pub position: usize,
    /// Marker of the ingress interface for inbound traffic
    pub inside_marker: char,
    /// Marker of the egress interface for inbound traffic
    pub outside_marker: char,
}

impl Default for InterfaceConvention {
    fn default() -> Self {
        Self {
            position: 5,
            inside_marker: '8',
            outside_marker: '9',
        }
    }
}

impl InterfaceConvention {
    /// Classifies a packet by the interfaces it entered and will exit through.
    ///
    /// Never fails: unrecognised pairs resolve to [`Direction::Out`].
    pub fn resolve(&self, ingress: &str, egress: &str) -> Direction {
        if Self::has_marker(ingress, self.position, self.inside_marker)
            && Self::has_marker(egress, self.position, self.outside_marker)
        {
            Direction::In
        } else {
            Direction::Out
        }
    }

    fn has_marker(name: &str, position: usize, marker: char) -> bool {
        // Markers are ASCII, so comparing the byte at `position` is exact
        marker.is_ascii() && name.as_bytes().get(position) == Some(&(marker as u8))
    }
}
