use std::fmt;

pub(crate) const VERSION: &str = "v=spf1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualifier {
    Pass,
    Fail,
    SoftFail,
    Neutral,
}

impl Qualifier {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Pass),
            '-' => Some(Self::Fail),
            '~' => Some(Self::SoftFail),
            '?' => Some(Self::Neutral),
            _ => None,
        }
    }
}

/// Raw `/ip4-prefix` and `//ip6-prefix` parts of an `a` or `mx` term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DualCidr {
    pub ip4: Option<String>,
    pub ip6: Option<String>,
}

impl DualCidr {
    fn parse(raw: &str) -> Self {
        let Some(rest) = raw.strip_prefix('/') else {
            return Self::default();
        };
        if let Some(ip6) = rest.strip_prefix('/') {
            return Self {
                ip4: None,
                ip6: Some(ip6.to_string()),
            };
        }
        match rest.split_once("//") {
            Some((ip4, ip6)) => Self {
                ip4: Some(ip4.to_string()),
                ip6: Some(ip6.to_string()),
            },
            None => Self {
                ip4: Some(rest.to_string()),
                ip6: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermKind {
    All,
    Include(String),
    A {
        domain: Option<String>,
        cidr: DualCidr,
    },
    Mx {
        domain: Option<String>,
        cidr: DualCidr,
    },
    Ip4(String),
    Ip6(String),
    Exists(String),
    Ptr,
    Redirect(String),
    Explanation(String),
    Invalid,
}

/// One space-separated SPF term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub raw: String,
    pub qualifier: Option<Qualifier>,
    pub kind: TermKind,
}

impl Term {
    pub fn parse(raw: &str) -> Self {
        let mut chars = raw.chars();
        let (qualifier, body) = match chars.next().and_then(Qualifier::from_char) {
            Some(qualifier) => (Some(qualifier), chars.as_str()),
            None => (None, raw),
        };
        let kind = classify(body, qualifier.is_some());
        Self {
            raw: raw.to_string(),
            qualifier,
            kind,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn classify(body: &str, qualified: bool) -> TermKind {
    // mechanism names are ASCII, so offsets into `lower` are valid in `body`
    let lower = body.to_ascii_lowercase();
    let tail = |prefix: &str| body[prefix.len()..].to_string();

    if lower.starts_with("redirect=") || lower.starts_with("exp=") {
        if qualified {
            return TermKind::Invalid;
        }
        return if lower.starts_with("redirect=") {
            TermKind::Redirect(tail("redirect="))
        } else {
            TermKind::Explanation(tail("exp="))
        };
    }

    if lower == "all" {
        TermKind::All
    } else if lower.starts_with("include:") {
        TermKind::Include(tail("include:"))
    } else if lower.starts_with("ip4:") {
        TermKind::Ip4(tail("ip4:"))
    } else if lower.starts_with("ip6:") {
        TermKind::Ip6(tail("ip6:"))
    } else if lower.starts_with("exists:") {
        TermKind::Exists(tail("exists:"))
    } else if lower.starts_with("ptr") {
        TermKind::Ptr
    } else if let Some((domain, cidr)) = host_mechanism(body, &lower, "mx") {
        TermKind::Mx { domain, cidr }
    } else if let Some((domain, cidr)) = host_mechanism(body, &lower, "a") {
        TermKind::A { domain, cidr }
    } else {
        TermKind::Invalid
    }
}

/// `name`, `name:domain[cidr]` or `name/cidr`.
fn host_mechanism(body: &str, lower: &str, name: &str) -> Option<(Option<String>, DualCidr)> {
    let rest = lower.strip_prefix(name)?;
    let rest_raw = &body[name.len()..];
    if rest.is_empty() {
        return Some((None, DualCidr::default()));
    }
    if rest.starts_with('/') {
        return Some((None, DualCidr::parse(rest_raw)));
    }
    let argument = rest_raw.strip_prefix(':')?;
    match argument.find('/') {
        Some(slash) => Some((
            Some(argument[..slash].to_string()),
            DualCidr::parse(&argument[slash..]),
        )),
        None => Some((Some(argument.to_string()), DualCidr::default())),
    }
}

/// Split a record into terms. `None` when it does not start with `v=spf1`.
pub fn tokenize(record: &str) -> Option<Vec<Term>> {
    let rest = record.trim_end().strip_prefix(VERSION)?;
    if rest.is_empty() {
        return Some(Vec::new());
    }
    let rest = rest.strip_prefix(' ')?;
    let terms: Vec<Term> = rest.split(' ').map(Term::parse).collect();
    tracing::trace!(count = terms.len(), "SPF record tokenized");
    Some(terms)
}

pub(crate) fn is_spf_record(text: &str) -> bool {
    text.strip_prefix(VERSION)
        .map(|rest| rest.is_empty() || rest.starts_with(' '))
        .unwrap_or(false)
}
