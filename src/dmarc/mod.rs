//! DMARC record validation.
//!
//! Each tag is checked against its own grammar. `rua` / `ruf` destinations
//! outside the queried domain must authorize the reports through a
//! `<domain>._report._dmarc.<mailbox-domain>` TXT record.

mod mailto;
mod tag;
mod validate;

pub use mailto::ReportUri;
pub use tag::{
    AlignmentMode, DmarcPolicy, FailureOption, MalformedTag, Tag, TagKind, TagValue, parse_tags,
};
pub use validate::{validate_dmarc, validate_dmarc_with_options};

pub(crate) use tag::VERSION;
pub(crate) use validate::evaluate_dmarc;
