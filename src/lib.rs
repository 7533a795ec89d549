#![forbid(unsafe_code)]
//! mailauth_check: syntax and semantic checks for SPF and DMARC records.
//!
//! Every validator returns a [`ValidationResult`]; DNS failures and grammar
//! violations are reported as [`Issue`]s, never as errors.

pub mod check;
pub mod dmarc;
pub mod ip;
pub mod options;
pub mod report;
pub mod resolver;
pub mod spf;

mod context;

pub use check::{DomainReport, check_domain};
pub use dmarc::{DmarcPolicy, validate_dmarc, validate_dmarc_with_options};
pub use ip::{IpError, Ipv4Cidr, Ipv6Literal, is_public_ipv4, parse_ipv4_cidr, parse_ipv6};
pub use options::ValidationOptions;
pub use report::{Issue, Severity, ValidationResult};
pub use resolver::{DnsError, LookupDns, MxRecord, normalize_domain};
pub use spf::{validate_spf, validate_spf_with_options};

#[cfg(feature = "with-dns")]
pub use resolver::SystemResolver;

#[cfg(test)]
mod test_support;
