use std::collections::{HashMap, HashSet};

use crate::context::{ValidationContext, domain_key};
use crate::options::ValidationOptions;
use crate::report::ValidationResult;
use crate::resolver::{LookupDns, fqdn};

use super::mailto::{ReportUri, parse_report_uri};
use super::tag::{AlignmentMode, DmarcPolicy, FailureOption, Tag, TagKind, TagValue, parse_tags};

/// Validate one DMARC record published for `domain`.
pub fn validate_dmarc<R>(resolver: &R, record: &str, domain: &str) -> ValidationResult
where
    R: LookupDns,
{
    validate_dmarc_with_options(resolver, record, domain, &ValidationOptions::default())
}

pub fn validate_dmarc_with_options<R>(
    resolver: &R,
    record: &str,
    domain: &str,
    options: &ValidationOptions,
) -> ValidationResult
where
    R: LookupDns,
{
    evaluate_dmarc(resolver, record, domain, options).0
}

/// Validation result plus the tags with their parsed values.
pub(crate) fn evaluate_dmarc<R>(
    resolver: &R,
    record: &str,
    domain: &str,
    options: &ValidationOptions,
) -> (ValidationResult, Vec<Tag>)
where
    R: LookupDns,
{
    let mut ctx = ValidationContext::new(options);
    let mut validator = TagValidator {
        resolver,
        domain: domain_key(domain),
        authorized: HashMap::new(),
    };
    let tags = validator.evaluate(record, &mut ctx);
    (ctx.finish(), tags)
}

struct TagValidator<'r, R> {
    resolver: &'r R,
    domain: String,
    /// Authorization outcome per mailbox domain, `None` when it could not be checked.
    authorized: HashMap<String, Option<bool>>,
}

impl<R> TagValidator<'_, R>
where
    R: LookupDns,
{
    fn evaluate(&mut self, record: &str, ctx: &mut ValidationContext) -> Vec<Tag> {
        let Some(parsed) = parse_tags(record) else {
            ctx.diagnostics
                .critical("DMARC record does not start with v=DMARC1");
            return Vec::new();
        };

        let mut tags = Vec::new();
        for entry in parsed {
            match entry {
                Ok(mut tag) => {
                    tag.value = self.validate_tag(&tag, ctx);
                    tracing::trace!(tag = %tag.name, value = ?tag.value, "DMARC tag checked");
                    tags.push(tag);
                }
                Err(malformed) => ctx.diagnostics.error(format!(
                    "malformed tag '{}': expected name=value",
                    malformed.0
                )),
            }
        }
        tags
    }

    fn validate_tag(&mut self, tag: &Tag, ctx: &mut ValidationContext) -> Option<TagValue> {
        let name = tag.name.as_str();
        let value = tag.raw.as_str();
        match tag.kind {
            TagKind::Policy | TagKind::SubdomainPolicy => {
                let Some(policy) = DmarcPolicy::parse(value) else {
                    ctx.diagnostics.error(format!(
                        "tag {name} value must be none or quarantine or reject (found '{value}')"
                    ));
                    return None;
                };
                if policy == DmarcPolicy::None {
                    ctx.diagnostics.warning(format!(
                        "tag {name} is set to none; quarantine or reject is recommended"
                    ));
                }
                Some(TagValue::Policy(policy))
            }
            TagKind::AggregateReports | TagKind::FailureReports => {
                self.validate_report_uris(name, value, ctx)
            }
            TagKind::FailureOptions => validate_failure_options(value, ctx),
            TagKind::DkimAlignment | TagKind::SpfAlignment => match AlignmentMode::parse(value) {
                Some(mode) => Some(TagValue::Alignment(mode)),
                None => {
                    ctx.diagnostics
                        .error(format!("tag {name} value must be s or r (found '{value}')"));
                    None
                }
            },
            TagKind::ReportFormat => {
                if value.eq_ignore_ascii_case("afrf") {
                    Some(TagValue::ReportFormat)
                } else {
                    ctx.diagnostics
                        .error(format!("tag rf value must be afrf (found '{value}')"));
                    None
                }
            }
            TagKind::ReportInterval => match value.parse::<u64>().ok().map(u32::try_from) {
                Some(Ok(seconds)) => Some(TagValue::Interval(seconds)),
                Some(Err(_)) => {
                    ctx.diagnostics.error(format!(
                        "ri tag value {value} is out of range for a 32-bit unsigned integer"
                    ));
                    None
                }
                None => {
                    ctx.diagnostics.error(format!(
                        "ri tag value must be a 32-bit unsigned integer (found '{value}')"
                    ));
                    None
                }
            },
            TagKind::Percent => match value.parse::<i64>() {
                Ok(percent) if !(0..=100).contains(&percent) => {
                    ctx.diagnostics
                        .error(format!("pct tag value must be between 0 and 100 (found {percent})"));
                    None
                }
                Ok(percent) => {
                    if percent < 100 {
                        ctx.diagnostics.warning(format!(
                            "pct tag is {percent}; the policy only applies to part of the mail, 100 is safer"
                        ));
                    }
                    u8::try_from(percent).ok().map(TagValue::Percent)
                }
                Err(_) => {
                    ctx.diagnostics
                        .error(format!("pct tag value must be an integer (found '{value}')"));
                    None
                }
            },
            TagKind::Version => {
                ctx.diagnostics
                    .error("v tag must only appear once, at the start of the record");
                None
            }
            TagKind::Unknown => {
                ctx.diagnostics.error(format!("invalid tag: {name}"));
                None
            }
        }
    }

    fn validate_report_uris(
        &mut self,
        name: &str,
        value: &str,
        ctx: &mut ValidationContext,
    ) -> Option<TagValue> {
        let mut uris: Vec<ReportUri> = Vec::new();
        let mut valid = true;
        let mut checked_domains = HashSet::new();

        for entry in value.split(',').map(str::trim) {
            let (uri, problems) = parse_report_uri(entry);
            for problem in &problems {
                ctx.diagnostics.error(format!(
                    "invalid email '{entry}' in {name} tag: {}",
                    problem.describe()
                ));
            }
            valid &= problems.is_empty();

            let Some(uri) = uri else {
                continue;
            };
            if checked_domains.insert(uri.domain.clone()) && self.authorize(&uri.domain, ctx) == Some(false) {
                valid = false;
                ctx.diagnostics.error(format!(
                    "mailbox domain {} in {name} tag does not accept DMARC reports for {} or is invalid",
                    uri.domain, self.domain
                ));
            }
            uris.push(uri);
        }

        valid.then_some(TagValue::ReportUris(uris))
    }

    /// External report destinations must publish
    /// `<domain>._report._dmarc.<mailbox-domain>` containing `v=DMARC1`.
    fn authorize(&mut self, mailbox_domain: &str, ctx: &mut ValidationContext) -> Option<bool> {
        if domain_key(mailbox_domain) == self.domain {
            return Some(true);
        }
        if let Some(known) = self.authorized.get(mailbox_domain) {
            return *known;
        }
        if !ctx.within_deadline() {
            return None;
        }

        let name = fqdn(&format!("{}._report._dmarc", self.domain), mailbox_domain);
        tracing::debug!(name = %name, "checking report authorization");
        let outcome = match self.resolver.lookup_txt(&name) {
            Ok(records) => records.iter().any(|record| record.contains("v=DMARC1")),
            Err(err) => {
                tracing::debug!(name = %name, error = %err, "report authorization lookup failed");
                false
            }
        };
        self.authorized
            .insert(mailbox_domain.to_string(), Some(outcome));
        Some(outcome)
    }
}

fn validate_failure_options(value: &str, ctx: &mut ValidationContext) -> Option<TagValue> {
    let mut options = Vec::new();
    let mut reported = HashSet::new();
    let mut valid = true;

    for raw in value.split(':').map(str::trim) {
        match FailureOption::parse(raw) {
            Some(option) if options.contains(&option) => {
                valid = false;
                if reported.insert(option) {
                    ctx.diagnostics
                        .error(format!("duplicate value '{raw}' in fo tag"));
                }
            }
            Some(option) => options.push(option),
            None => {
                valid = false;
                ctx.diagnostics.error(format!(
                    "invalid value '{raw}' in fo tag; allowed values are 0, 1, d and s"
                ));
            }
        }
    }

    valid.then_some(TagValue::FailureOptions(options))
}
