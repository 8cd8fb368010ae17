use thiserror::Error;

/// A single rule field outside its enumeration or range.
///
/// Variants are listed in record field order; validation reports the first
/// one it encounters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidRule {
    #[error("unknown direction tag {0}")]
    UnknownDirection(u8),

    #[error("source prefix length {0} exceeds 32")]
    SourcePrefixTooLong(u8),

    #[error("destination prefix length {0} exceeds 32")]
    DestPrefixTooLong(u8),

    #[error("unknown protocol tag {0}")]
    UnknownProtocol(u8),

    #[error("unknown ack tag {0}")]
    UnknownAck(u8),

    #[error("unknown action tag {0}")]
    UnknownAction(u8),
}

/// Failure to turn one fixed-width record into a [`Rule`](super::firewall::Rule).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("malformed record: {len} bytes, expected {expected}")]
    Malformed { len: usize, expected: usize },

    #[error(transparent)]
    Invalid(#[from] InvalidRule),
}

/// Rejected table update. The table is never modified when one of these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TableError {
    /// Input is not a whole number of records.
    #[error("malformed rule stream: {len} bytes is not a multiple of the {record_width}-byte record")]
    MalformedRecord { len: usize, record_width: usize },

    /// The rule at `index` (0-based) failed validation.
    #[error("invalid rule at index {index}: {source}")]
    InvalidRule { index: usize, source: InvalidRule },

    /// More rules than the table can hold.
    #[error("rule table capacity exceeded: {count} rules, max {max}")]
    CapacityExceeded { count: usize, max: usize },
}

/// Raw IPv4 packet that could not be turned into a packet descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PacketError {
    #[error("packet truncated: {len} bytes, need {needed}")]
    Truncated { len: usize, needed: usize },

    #[error("not an IPv4 packet (version {0})")]
    NotIpv4(u8),

    #[error("bad IPv4 header length {0}")]
    BadHeaderLength(usize),
}

/// Error in the human-readable rule format
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {message}")]
pub struct RuleSyntaxError {
    pub field: &'static str,
    pub message: String,
}

impl RuleSyntaxError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Core error types for secws
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Rule table rejected an update
    #[error("Rule table error: {0}")]
    Table(#[from] TableError),

    /// A line of a rule file could not be parsed
    #[error("Rule file line {line}: {source}")]
    Syntax {
        line: usize,
        source: RuleSyntaxError,
    },

    /// No XDG directory could be resolved for this user
    #[error("Directory not found: {0}")]
    NoDirectory(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
