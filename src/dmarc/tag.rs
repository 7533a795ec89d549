use std::fmt;

use phf::phf_map;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

use super::mailto::ReportUri;

pub(crate) const VERSION: &str = "v=DMARC1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Policy,
    SubdomainPolicy,
    AggregateReports,
    FailureReports,
    FailureOptions,
    DkimAlignment,
    SpfAlignment,
    ReportFormat,
    ReportInterval,
    Percent,
    Version,
    Unknown,
}

const TAG_KINDS: phf::Map<&'static str, TagKind> = phf_map! {
    "p" => TagKind::Policy,
    "sp" => TagKind::SubdomainPolicy,
    "rua" => TagKind::AggregateReports,
    "ruf" => TagKind::FailureReports,
    "fo" => TagKind::FailureOptions,
    "adkim" => TagKind::DkimAlignment,
    "aspf" => TagKind::SpfAlignment,
    "rf" => TagKind::ReportFormat,
    "ri" => TagKind::ReportInterval,
    "pct" => TagKind::Percent,
    "v" => TagKind::Version,
};

impl TagKind {
    pub fn from_name(name: &str) -> Self {
        TAG_KINDS
            .get(name.to_ascii_lowercase().as_str())
            .copied()
            .unwrap_or(Self::Unknown)
    }
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmarcPolicy {
    None,
    Quarantine,
    Reject,
}

impl DmarcPolicy {
    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "quarantine" => Some(Self::Quarantine),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Quarantine => "quarantine",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for DmarcPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentMode {
    Strict,
    Relaxed,
}

impl AlignmentMode {
    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "s" => Some(Self::Strict),
            "r" => Some(Self::Relaxed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureOption {
    All,
    Any,
    Dkim,
    Spf,
}

impl FailureOption {
    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "0" => Some(Self::All),
            "1" => Some(Self::Any),
            "d" => Some(Self::Dkim),
            "s" => Some(Self::Spf),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    Policy(DmarcPolicy),
    ReportUris(Vec<ReportUri>),
    FailureOptions(Vec<FailureOption>),
    Alignment(AlignmentMode),
    ReportFormat,
    Interval(u32),
    Percent(u8),
}

/// One `name=value` pair of a DMARC record, in record order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub raw: String,
    pub kind: TagKind,
    /// Filled in by validation when the value matches the tag grammar.
    pub value: Option<TagValue>,
}

/// A segment that could not be split into `name=value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedTag(pub String);

/// Split a record into tags. `None` when the record does not start with
/// `v=DMARC1`. The version tag itself is not returned.
pub fn parse_tags(record: &str) -> Option<Vec<Result<Tag, MalformedTag>>> {
    if !record.starts_with(VERSION) {
        return None;
    }
    let mut segments = record.split(';');
    if segments.next().map(str::trim) != Some(VERSION) {
        return None;
    }

    let tags = segments
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.split_once('=') {
            Some((name, value)) => {
                let name = name.trim().to_string();
                Ok(Tag {
                    kind: TagKind::from_name(&name),
                    name,
                    raw: value.trim().to_string(),
                    value: None,
                })
            }
            None => Err(MalformedTag(segment.to_string())),
        })
        .collect();
    Some(tags)
}
