//! Input validation for the human-readable rule format
//!
//! Each function turns one whitespace-free token of a rule line into the
//! typed field value, or explains why it cannot.

use crate::core::error::RuleSyntaxError;
use crate::core::firewall::{HEX_NAME_PREFIX, NAME_LEN, Port, RuleName};
use ipnetwork::Ipv4Network;
use std::net::Ipv4Addr;

/// Validates a rule name token.
///
/// Names are stored in a fixed-width field, so anything longer than
/// [`NAME_LEN`] bytes is rejected rather than silently truncated.
/// Only printable ASCII is accepted so the text form stays one token.
///
/// A token starting with `0x` holds the raw bytes in hex, NUL padded. This
/// is how names that are empty or not printable are written.
///
/// # Examples
///
/// ```
/// use secws::validators::validate_name;
///
/// assert!(validate_name("allow_ssh").is_ok());
/// assert!(validate_name("this_name_is_far_too_long_to_fit").is_err());
/// assert_eq!(&validate_name("0x612062").unwrap().as_bytes()[..3], b"a b");
/// ```
///
/// # Errors
///
/// Returns `Err` if the name is too long, contains non-graphic characters,
/// or is a malformed hex token.
pub fn validate_name(input: &str) -> Result<RuleName, RuleSyntaxError> {
    if let Some(digits) = input.strip_prefix(HEX_NAME_PREFIX) {
        return RuleName::from_hex(digits).ok_or_else(|| {
            RuleSyntaxError::new(
                "name",
                format!("'{input}' is not an even number of hex digits up to {NAME_LEN} bytes"),
            )
        });
    }
    if !input.chars().all(|c| c.is_ascii_graphic()) {
        return Err(RuleSyntaxError::new(
            "name",
            "only printable ASCII characters are allowed",
        ));
    }
    RuleName::new(input).ok_or_else(|| {
        RuleSyntaxError::new("name", format!("too long (max {NAME_LEN} characters)"))
    })
}

/// Validates a single port token.
///
/// `any` maps to the wildcard sentinel. Port 0 is the sentinel itself and is
/// therefore not accepted as a literal.
///
/// # Errors
///
/// Returns `Err` if the token is not `any` or a number between 1 and 65535.
pub fn parse_port(input: &str) -> Result<Port, RuleSyntaxError> {
    if input.eq_ignore_ascii_case("any") {
        return Ok(Port::ANY);
    }
    match input.parse::<u16>() {
        Ok(0) | Err(_) => Err(RuleSyntaxError::new(
            "port",
            format!("'{input}' is not 'any' or a port between 1 and 65535"),
        )),
        Ok(port) => Ok(Port(port)),
    }
}

/// Validates an IPv4 CIDR token, returning address and prefix length.
///
/// `any` maps to `0.0.0.0/0`. A bare address is treated as `/32`.
/// Host bits are kept as written.
///
/// # Errors
///
/// Returns `Err` if the token is not a valid IPv4 address or CIDR.
pub fn parse_cidr(input: &str) -> Result<(Ipv4Addr, u8), RuleSyntaxError> {
    if input.eq_ignore_ascii_case("any") {
        return Ok((Ipv4Addr::UNSPECIFIED, 0));
    }
    input
        .parse::<Ipv4Network>()
        .map(|net| (net.ip(), net.prefix()))
        .map_err(|e| RuleSyntaxError::new("address", format!("'{input}': {e}")))
}

/// Validates a network interface name.
///
/// Linux kernel interface name rules:
/// - Max 15 characters (IFNAMSIZ - 1)
/// - Alphanumeric, dot, dash, underscore only
/// - Cannot be "." or ".."
///
/// # Errors
///
/// Returns `Err` if interface name violates kernel constraints.
pub fn validate_interface(name: &str) -> Result<String, String> {
    if name.is_empty() {
        return Err("Interface name is empty".to_string());
    }

    if name.len() > 15 {
        return Err("Interface name too long (max 15 characters)".to_string());
    }

    if name == "." || name == ".." {
        return Err("Invalid interface name".to_string());
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    {
        return Err("Interface name contains invalid characters".to_string());
    }

    Ok(name.to_string())
}
