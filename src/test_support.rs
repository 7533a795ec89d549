use std::cell::RefCell;
use std::collections::HashMap;
use std::net::Ipv4Addr;

use crate::resolver::{DnsError, LookupDns, MxRecord};

/// In-memory resolver that records every query it receives.
#[derive(Default)]
pub(crate) struct StubResolver {
    txt: HashMap<String, Vec<String>>,
    a: HashMap<String, Vec<Ipv4Addr>>,
    mx: HashMap<String, Vec<MxRecord>>,
    queries: RefCell<Vec<String>>,
}

impl StubResolver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn txt<I, S>(mut self, name: &str, records: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = records.into_iter().map(Into::into).collect();
        self.txt.insert(normalize_name(name), values);
        self
    }

    pub(crate) fn a(mut self, name: &str, addresses: &[[u8; 4]]) -> Self {
        let values = addresses.iter().map(|octets| Ipv4Addr::from(*octets)).collect();
        self.a.insert(normalize_name(name), values);
        self
    }

    pub(crate) fn mx(mut self, name: &str, hosts: &[(u16, &str)]) -> Self {
        let values = hosts
            .iter()
            .map(|(preference, exchange)| MxRecord::new(*preference, *exchange))
            .collect();
        self.mx.insert(normalize_name(name), values);
        self
    }

    pub(crate) fn queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }

    pub(crate) fn was_queried(&self, query: &str) -> bool {
        self.queries.borrow().iter().any(|seen| seen == query)
    }

    fn record(&self, kind: &str, name: &str) -> String {
        let key = normalize_name(name);
        self.queries.borrow_mut().push(format!("{kind} {key}"));
        key
    }
}

impl LookupDns for StubResolver {
    fn lookup_txt(&self, name: &str) -> Result<Vec<String>, DnsError> {
        let key = self.record("TXT", name);
        self.txt.get(&key).cloned().ok_or_else(|| DnsError::not_found(key))
    }

    fn lookup_a(&self, name: &str) -> Result<Vec<Ipv4Addr>, DnsError> {
        let key = self.record("A", name);
        self.a.get(&key).cloned().ok_or_else(|| DnsError::not_found(key))
    }

    fn lookup_mx(&self, name: &str) -> Result<Vec<MxRecord>, DnsError> {
        let key = self.record("MX", name);
        self.mx.get(&key).cloned().ok_or_else(|| DnsError::not_found(key))
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}
