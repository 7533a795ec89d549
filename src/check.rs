//! Domain-level checks: find the published SPF and DMARC records of a
//! domain and validate them.

#[cfg(feature = "with-serde")]
use serde::Serialize;

use crate::dmarc::{self, DmarcPolicy, TagKind, TagValue};
use crate::options::ValidationOptions;
use crate::report::{Issue, Severity, ValidationResult};
use crate::resolver::{LookupDns, fqdn, normalize_domain};
use crate::spf::{self, is_spf_record};

#[cfg_attr(feature = "with-serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainReport {
    pub domain: String,
    pub spf_record: Option<String>,
    pub spf: ValidationResult,
    pub dmarc_record: Option<String>,
    pub dmarc: ValidationResult,
    pub dmarc_policy: Option<DmarcPolicy>,
}

impl DomainReport {
    pub fn is_valid(&self) -> bool {
        self.spf.status && self.dmarc.status
    }
}

pub fn check_domain<R>(resolver: &R, domain: &str, options: &ValidationOptions) -> DomainReport
where
    R: LookupDns,
{
    let ascii = match normalize_domain(domain) {
        Ok(ascii) => ascii,
        Err(err) => {
            let failure = ValidationResult::from_issues(vec![Issue::new(
                Severity::Critical,
                format!("invalid domain '{domain}': {err}"),
            )]);
            return DomainReport {
                domain: domain.to_string(),
                spf_record: None,
                spf: failure.clone(),
                dmarc_record: None,
                dmarc: failure,
                dmarc_policy: None,
            };
        }
    };

    let (spf_record, spf) = check_spf(resolver, &ascii, options);
    let (dmarc_record, dmarc, dmarc_policy) = check_dmarc(resolver, &ascii, options);

    DomainReport {
        domain: ascii,
        spf_record,
        spf,
        dmarc_record,
        dmarc,
        dmarc_policy,
    }
}

fn check_spf<R>(
    resolver: &R,
    domain: &str,
    options: &ValidationOptions,
) -> (Option<String>, ValidationResult)
where
    R: LookupDns,
{
    let records = published(resolver, domain, is_spf_record);
    let Some(record) = records.first().cloned() else {
        return (
            None,
            single_critical(format!("no SPF record found for {domain}")),
        );
    };

    let mut issues = Vec::new();
    if records.len() > 1 {
        issues.push(Issue::new(
            Severity::Critical,
            format!("multiple SPF records published for {domain} ({})", records.len()),
        ));
    }
    issues.extend(spf::validate_spf_with_options(resolver, &record, domain, options).issues);
    (Some(record), ValidationResult::from_issues(issues))
}

fn check_dmarc<R>(
    resolver: &R,
    domain: &str,
    options: &ValidationOptions,
) -> (Option<String>, ValidationResult, Option<DmarcPolicy>)
where
    R: LookupDns,
{
    let name = fqdn("_dmarc", domain);
    let records = published(resolver, &name, |record| record.starts_with(dmarc::VERSION));
    let Some(record) = records.first().cloned() else {
        return (
            None,
            single_critical(format!("no DMARC record found at {name}")),
            None,
        );
    };

    let mut issues = Vec::new();
    if records.len() > 1 {
        issues.push(Issue::new(
            Severity::Critical,
            format!("multiple DMARC records published at {name} ({})", records.len()),
        ));
    }
    let (result, tags) = dmarc::evaluate_dmarc(resolver, &record, domain, options);
    issues.extend(result.issues);

    let policy = tags.iter().find_map(|tag| match (&tag.kind, &tag.value) {
        (TagKind::Policy, Some(TagValue::Policy(policy))) => Some(*policy),
        _ => None,
    });
    (Some(record), ValidationResult::from_issues(issues), policy)
}

fn published<R, F>(resolver: &R, name: &str, matches: F) -> Vec<String>
where
    R: LookupDns,
    F: Fn(&str) -> bool,
{
    match resolver.lookup_txt(name) {
        Ok(records) => records
            .iter()
            .map(|record| record.trim())
            .filter(|record| matches(*record))
            .map(str::to_string)
            .collect(),
        Err(err) => {
            tracing::debug!(name, error = %err, "TXT lookup failed");
            Vec::new()
        }
    }
}

fn single_critical(message: String) -> ValidationResult {
    ValidationResult::from_issues(vec![Issue::new(Severity::Critical, message)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubResolver;

    #[test]
    fn combines_spf_and_dmarc() {
        let stub = StubResolver::new()
            .txt("example.com", ["google-site-verification=abc", "v=spf1 ip4:192.0.2.1 ~all"])
            .txt("_dmarc.example.com", ["v=DMARC1; p=none; rua=mailto:d@example.com"]);
        let report = check_domain(&stub, "Example.com.", &ValidationOptions::default());

        assert_eq!(report.domain, "example.com");
        assert_eq!(report.spf_record.as_deref(), Some("v=spf1 ip4:192.0.2.1 ~all"));
        assert!(report.spf.status, "{}", report.spf);
        assert_eq!(report.dmarc_policy, Some(DmarcPolicy::None));
        assert_eq!(report.dmarc.count(Severity::Warning), 1);
        assert!(!report.is_valid());
    }

    #[test]
    fn missing_records_are_critical() {
        let stub = StubResolver::new();
        let report = check_domain(&stub, "example.com", &ValidationOptions::default());
        assert_eq!(report.spf.count(Severity::Critical), 1);
        assert_eq!(report.dmarc.count(Severity::Critical), 1);
        assert_eq!(report.spf_record, None);
        assert_eq!(report.dmarc_policy, None);
    }

    #[test]
    fn multiple_spf_records_are_critical() {
        let stub = StubResolver::new()
            .txt("example.com", ["v=spf1 -all", "v=spf1 ~all"])
            .txt("_dmarc.example.com", ["v=DMARC1; p=reject"]);
        let report = check_domain(&stub, "example.com", &ValidationOptions::default());
        assert_eq!(report.spf.issues.len(), 1);
        assert!(report.spf.issues[0].message.contains("multiple SPF records"));
        assert_eq!(report.spf_record.as_deref(), Some("v=spf1 -all"));
        assert!(report.dmarc.status);
        assert_eq!(report.dmarc_policy, Some(DmarcPolicy::Reject));
    }

    #[test]
    fn empty_domain_is_reported_not_raised() {
        let stub = StubResolver::new();
        let report = check_domain(&stub, "  ", &ValidationOptions::default());
        assert!(!report.spf.status);
        assert!(!report.dmarc.status);
        assert!(stub.queries().is_empty());
    }
}
