use std::sync::OnceLock;

use regex::Regex;

use crate::resolver::normalize_domain;

/// A `mailto:` destination from a `rua` / `ruf` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportUri {
    pub local: String,
    /// ASCII form of the mailbox domain.
    pub domain: String,
    /// Optional `!<size>` limit, e.g. `10m`.
    pub size_limit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UriProblem {
    Scheme,
    AtSign,
    EmptyLocal,
    LocalDotEdge,
    LocalDoubleDot,
    EmptyDomain,
    DomainLeadingDot,
    DomainEncoding,
    SizeLimit(String),
}

impl UriProblem {
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Scheme => "it must use the mailto: scheme".to_string(),
            Self::AtSign => "the address must contain exactly one '@'".to_string(),
            Self::EmptyLocal => "the mailbox name is empty".to_string(),
            Self::LocalDotEdge => "the mailbox name should not start nor end with a '.'".to_string(),
            Self::LocalDoubleDot => "the mailbox name should not include '..'".to_string(),
            Self::EmptyDomain => "the domain is empty".to_string(),
            Self::DomainLeadingDot => "the domain should not start with a '.'".to_string(),
            Self::DomainEncoding => "the domain cannot be converted to ASCII".to_string(),
            Self::SizeLimit(size) => format!("size limit '{size}' is not <digits>[k|m|g|t]"),
        }
    }
}

fn size_limit_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(?i)[0-9]+[kmgt]?$").expect("static pattern compiles"))
}

/// Parse one comma-separated entry. Returns the URI when an address with a
/// usable domain could be extracted, together with every problem found.
pub(crate) fn parse_report_uri(entry: &str) -> (Option<ReportUri>, Vec<UriProblem>) {
    let mut problems = Vec::new();

    let scheme_ok = entry
        .get(..7)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("mailto:"));
    if !scheme_ok {
        problems.push(UriProblem::Scheme);
        return (None, problems);
    }
    let target = &entry[7..];

    // the size suffix can only follow the domain; '!' is legal in a local part
    let bang = target
        .rfind('@')
        .and_then(|at| target[at..].rfind('!').map(|offset| at + offset));
    let (address, size_limit) = match bang.map(|index| (&target[..index], &target[index + 1..])) {
        Some((address, size)) => {
            if !size_limit_pattern().is_match(size) {
                problems.push(UriProblem::SizeLimit(size.to_string()));
            }
            (address, Some(size.to_string()))
        }
        None => (target, None),
    };

    let parts: Vec<&str> = address.split('@').collect();
    let [local, domain] = parts.as_slice() else {
        problems.push(UriProblem::AtSign);
        return (None, problems);
    };

    if local.is_empty() {
        problems.push(UriProblem::EmptyLocal);
    } else if local.starts_with('.') || local.ends_with('.') {
        problems.push(UriProblem::LocalDotEdge);
    } else if local.contains("..") {
        problems.push(UriProblem::LocalDoubleDot);
    }

    let ascii_domain = if domain.is_empty() {
        problems.push(UriProblem::EmptyDomain);
        None
    } else if domain.starts_with('.') {
        problems.push(UriProblem::DomainLeadingDot);
        None
    } else {
        match normalize_domain(domain) {
            Ok(ascii) => Some(ascii),
            Err(_) => {
                problems.push(UriProblem::DomainEncoding);
                None
            }
        }
    };

    let uri = ascii_domain.map(|domain| ReportUri {
        local: local.to_string(),
        domain,
        size_limit,
    });
    (uri, problems)
}
