//! IP literal parsing for `ip4:` / `ip6:` terms and resolved addresses.
//!
//! The IPv6 check is a heuristic, not an RFC 4291 parser: on top of the
//! character, segment and prefix checks it rejects a segment of fewer than
//! four digits starting with `0` once a `::` compression has been seen
//! (zero-omission heuristic).

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IpError {
    #[error("invalid IP literal '{input}'")]
    InvalidFormat { input: String },
    #[error("invalid prefix length in '{input}' (expected 1..={max})")]
    InvalidPrefix { input: String, max: u8 },
}

impl IpError {
    pub(crate) fn invalid_format(input: &str) -> Self {
        Self::InvalidFormat {
            input: input.to_string(),
        }
    }

    pub(crate) fn invalid_prefix(input: &str, max: u8) -> Self {
        Self::InvalidPrefix {
            input: input.to_string(),
            max,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Cidr {
    pub addr: Ipv4Addr,
    pub prefix: Option<u8>,
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prefix {
            Some(prefix) => write!(f, "{}/{}", self.addr, prefix),
            None => write!(f, "{}", self.addr),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv6Literal {
    pub addr: Ipv6Addr,
    pub prefix: Option<u8>,
}

/// Parse `a.b.c.d[/prefix]` with octets 0-255 (no leading zeros) and a
/// prefix of 1-32.
pub fn parse_ipv4_cidr(text: &str) -> Result<Ipv4Cidr, IpError> {
    let (address, prefix) = match text.split_once('/') {
        Some((address, prefix)) => (address, Some(prefix)),
        None => (text, None),
    };

    let mut octets = [0u8; 4];
    let mut count = 0;
    for part in address.split('.') {
        if count == 4 {
            return Err(IpError::invalid_format(text));
        }
        octets[count] = parse_octet(part).ok_or_else(|| IpError::invalid_format(text))?;
        count += 1;
    }
    if count != 4 {
        return Err(IpError::invalid_format(text));
    }

    let prefix = match prefix {
        Some(raw) => Some(parse_prefix(raw, 32).ok_or_else(|| IpError::invalid_prefix(text, 32))?),
        None => None,
    };

    Ok(Ipv4Cidr {
        addr: Ipv4Addr::from(octets),
        prefix,
    })
}

/// False for RFC 1918 space (10/8, 172.16/12, 192.168/16), true otherwise.
/// Loopback, link-local, CGNAT and documentation ranges are not checked.
pub fn is_public_ipv4(addr: Ipv4Addr) -> bool {
    match addr.octets() {
        [10, ..] => false,
        [172, second, ..] if (16..=31).contains(&second) => false,
        [192, 168, ..] => false,
        _ => true,
    }
}

/// Parse an IPv6 literal with an optional `/prefix` (1-128).
pub fn parse_ipv6(text: &str) -> Result<Ipv6Literal, IpError> {
    let (address, prefix) = match text.split_once('/') {
        Some((address, prefix)) => (address, Some(prefix)),
        None => (text, None),
    };

    if address.is_empty()
        || !address
            .chars()
            .all(|c| c.is_ascii_hexdigit() || c == ':')
    {
        return Err(IpError::invalid_format(text));
    }

    let prefix = match prefix {
        Some(raw) => Some(parse_prefix(raw, 128).ok_or_else(|| IpError::invalid_prefix(text, 128))?),
        None => None,
    };

    match address.matches("::").count() {
        0 => {
            let segments: Vec<&str> = address.split(':').collect();
            if segments.len() != 8 || !segments.iter().all(|segment| is_hex_segment(segment)) {
                return Err(IpError::invalid_format(text));
            }
        }
        1 => {
            let (head, tail) = address
                .split_once("::")
                .ok_or_else(|| IpError::invalid_format(text))?;
            let head = explicit_segments(head).ok_or_else(|| IpError::invalid_format(text))?;
            let tail = explicit_segments(tail).ok_or_else(|| IpError::invalid_format(text))?;
            if head.len() + tail.len() > 7 {
                return Err(IpError::invalid_format(text));
            }
            if tail
                .iter()
                .any(|segment| segment.len() < 4 && segment.starts_with('0'))
            {
                return Err(IpError::invalid_format(text));
            }
        }
        _ => return Err(IpError::invalid_format(text)),
    }

    let addr = address
        .parse::<Ipv6Addr>()
        .map_err(|_| IpError::invalid_format(text))?;
    Ok(Ipv6Literal { addr, prefix })
}

/// Decimal prefix length in `1..=max`, without sign or leading zeros.
pub(crate) fn parse_prefix(raw: &str, max: u8) -> Option<u8> {
    if raw.is_empty() || raw.len() > 3 || raw.starts_with('0') {
        return None;
    }
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u16 = raw.parse().ok()?;
    if (1..=u16::from(max)).contains(&value) {
        u8::try_from(value).ok()
    } else {
        None
    }
}

fn parse_octet(part: &str) -> Option<u8> {
    if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if part.len() > 1 && part.starts_with('0') {
        return None;
    }
    part.parse::<u16>().ok().and_then(|value| u8::try_from(value).ok())
}

fn is_hex_segment(segment: &str) -> bool {
    (1..=4).contains(&segment.len()) && segment.chars().all(|c| c.is_ascii_hexdigit())
}

fn explicit_segments(side: &str) -> Option<Vec<&str>> {
    if side.is_empty() {
        return Some(Vec::new());
    }
    let segments: Vec<&str> = side.split(':').collect();
    if segments.iter().all(|segment| is_hex_segment(segment)) {
        Some(segments)
    } else {
        None
    }
}
