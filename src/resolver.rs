//! DNS collaborator used by the validators.
//!
//! The validators only see the [`LookupDns`] trait. [`SystemResolver`]
//! (feature `with-dns`) implements it on top of the synchronous
//! trust-dns resolver with a bounded per-query timeout.

use std::net::Ipv4Addr;

use thiserror::Error;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

/// Errors raised by a [`LookupDns`] implementation.
///
/// The validators treat every variant as "not found"; the distinction only
/// shows up in logs and in [`crate::SystemResolver`] construction.
#[derive(Debug, Error)]
pub enum DnsError {
    #[error("domain is empty")]
    EmptyName,
    #[error("IDNA conversion failed for {name}")]
    IdnaConversion {
        name: String,
        #[source]
        source: idna::Errors,
    },
    #[error("resolver initialization failed: {source}")]
    ResolverInit {
        #[source]
        source: std::io::Error,
    },
    #[error("no records found for {name}")]
    NotFound { name: String },
    #[error("lookup timed out for {name}")]
    Timeout { name: String },
    #[cfg(feature = "with-dns")]
    #[error("lookup failed for {name}: {source}")]
    Lookup {
        name: String,
        #[source]
        source: trust_dns_resolver::error::ResolveError,
    },
    #[error("TXT record {name} contains invalid UTF-8 data: {source}")]
    TxtDataUtf8 {
        name: String,
        #[source]
        source: std::str::Utf8Error,
    },
}

impl DnsError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn timeout(name: impl Into<String>) -> Self {
        Self::Timeout { name: name.into() }
    }

    pub(crate) fn idna(name: impl Into<String>, source: idna::Errors) -> Self {
        Self::IdnaConversion {
            name: name.into(),
            source,
        }
    }

    #[cfg(feature = "with-dns")]
    pub(crate) fn resolver_init(source: std::io::Error) -> Self {
        Self::ResolverInit { source }
    }

    #[cfg(feature = "with-dns")]
    pub(crate) fn lookup(
        name: impl Into<String>,
        source: trust_dns_resolver::error::ResolveError,
    ) -> Self {
        Self::Lookup {
            name: name.into(),
            source,
        }
    }

    #[cfg(feature = "with-dns")]
    pub(crate) fn txt_data_utf8(name: impl Into<String>, source: std::str::Utf8Error) -> Self {
        Self::TxtDataUtf8 {
            name: name.into(),
            source,
        }
    }
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MxRecord {
    pub preference: u16,
    pub exchange: String,
}

impl MxRecord {
    pub fn new(preference: u16, exchange: impl Into<String>) -> Self {
        Self {
            preference,
            exchange: exchange.into(),
        }
    }
}

/// TXT / A / MX resolution, answers in the order the server returned them.
pub trait LookupDns {
    fn lookup_txt(&self, name: &str) -> Result<Vec<String>, DnsError>;
    fn lookup_a(&self, name: &str) -> Result<Vec<Ipv4Addr>, DnsError>;
    fn lookup_mx(&self, name: &str) -> Result<Vec<MxRecord>, DnsError>;
}

impl<R: LookupDns + ?Sized> LookupDns for &R {
    fn lookup_txt(&self, name: &str) -> Result<Vec<String>, DnsError> {
        (**self).lookup_txt(name)
    }

    fn lookup_a(&self, name: &str) -> Result<Vec<Ipv4Addr>, DnsError> {
        (**self).lookup_a(name)
    }

    fn lookup_mx(&self, name: &str) -> Result<Vec<MxRecord>, DnsError> {
        (**self).lookup_mx(name)
    }
}

/// Trim, drop the trailing root dot and convert to ASCII (IDNA) if needed.
pub fn normalize_domain(domain: &str) -> Result<String, DnsError> {
    let trimmed = domain.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(DnsError::EmptyName);
    }
    if trimmed.is_ascii() {
        return Ok(trimmed.to_ascii_lowercase());
    }
    idna::domain_to_ascii(trimmed).map_err(|err| DnsError::idna(trimmed, err))
}

pub(crate) fn fqdn(label: &str, domain: &str) -> String {
    let trimmed = label.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        domain.to_string()
    } else {
        format!("{}.{}", trimmed.to_ascii_lowercase(), domain)
    }
}

#[cfg(feature = "with-dns")]
pub(crate) fn normalize_exchange(exchange: String) -> String {
    let trimmed = exchange.trim_end_matches('.');
    trimmed.to_ascii_lowercase()
}

#[cfg(feature = "with-dns")]
pub use system::SystemResolver;

#[cfg(feature = "with-dns")]
mod system {
    use std::net::Ipv4Addr;
    use std::time::Duration;

    use trust_dns_resolver::{
        Resolver,
        error::{ResolveError, ResolveErrorKind},
        lookup::TxtLookup,
        system_conf::read_system_conf,
    };

    use super::{DnsError, LookupDns, MxRecord, normalize_domain, normalize_exchange};

    /// [`LookupDns`] backed by the system resolver configuration.
    pub struct SystemResolver {
        inner: Resolver,
    }

    impl SystemResolver {
        pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

        pub fn from_system_conf() -> Result<Self, DnsError> {
            Self::with_timeout(Self::DEFAULT_TIMEOUT)
        }

        /// One attempt per query, bounded by `timeout`. A timed-out query
        /// surfaces as [`DnsError::Timeout`].
        pub fn with_timeout(timeout: Duration) -> Result<Self, DnsError> {
            let (config, mut opts) =
                read_system_conf().map_err(|err| DnsError::resolver_init(std::io::Error::other(err)))?;
            opts.timeout = timeout;
            opts.attempts = 1;
            let inner = Resolver::new(config, opts).map_err(DnsError::resolver_init)?;
            Ok(Self { inner })
        }
    }

    impl LookupDns for SystemResolver {
        fn lookup_txt(&self, name: &str) -> Result<Vec<String>, DnsError> {
            let ascii = normalize_domain(name)?;
            tracing::debug!(name = %ascii, "TXT lookup");
            let lookup = self
                .inner
                .txt_lookup(ascii.as_str())
                .map_err(|err| classify(&ascii, err))?;
            collect_txt_records(&ascii, &lookup)
        }

        fn lookup_a(&self, name: &str) -> Result<Vec<Ipv4Addr>, DnsError> {
            let ascii = normalize_domain(name)?;
            tracing::debug!(name = %ascii, "A lookup");
            let lookup = self
                .inner
                .ipv4_lookup(ascii.as_str())
                .map_err(|err| classify(&ascii, err))?;
            Ok(lookup.iter().map(|a| a.0).collect())
        }

        fn lookup_mx(&self, name: &str) -> Result<Vec<MxRecord>, DnsError> {
            let ascii = normalize_domain(name)?;
            tracing::debug!(name = %ascii, "MX lookup");
            let lookup = self
                .inner
                .mx_lookup(ascii.as_str())
                .map_err(|err| classify(&ascii, err))?;
            let mut records = Vec::new();
            for mx in lookup.iter() {
                let exchange = normalize_exchange(mx.exchange().to_utf8());
                records.push(MxRecord::new(mx.preference(), exchange));
            }
            Ok(records)
        }
    }

    fn collect_txt_records(name: &str, lookup: &TxtLookup) -> Result<Vec<String>, DnsError> {
        let mut records = Vec::new();
        for txt in lookup.iter() {
            let mut record = String::new();
            for piece in txt.txt_data().iter() {
                let segment = std::str::from_utf8(piece.as_ref())
                    .map_err(|err| DnsError::txt_data_utf8(name, err))?;
                record.push_str(segment);
            }
            records.push(record);
        }
        Ok(records)
    }

    fn classify(name: &str, err: ResolveError) -> DnsError {
        if matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. }) {
            return DnsError::not_found(name);
        }
        if matches!(err.kind(), ResolveErrorKind::Timeout) {
            return DnsError::timeout(name);
        }
        DnsError::lookup(name, err)
    }
}
