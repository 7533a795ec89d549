//! SPF record validation.
//!
//! [`validate_spf`] walks the record's terms in order and follows
//! `include:` / `redirect=` references depth-first, sharing one lookup
//! budget and one cycle guard across the whole tree.

mod eval;
mod term;

pub use eval::{validate_spf, validate_spf_with_options};
pub use term::{DualCidr, Qualifier, Term, TermKind, tokenize};

pub(crate) use term::is_spf_record;

#[cfg(test)]
mod tests;
