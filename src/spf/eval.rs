use std::net::Ipv4Addr;

use crate::context::{ValidationContext, domain_key};
use crate::ip::{is_public_ipv4, parse_ipv4_cidr, parse_ipv6, parse_prefix};
use crate::options::ValidationOptions;
use crate::report::ValidationResult;
use crate::resolver::LookupDns;

use super::term::{DualCidr, Qualifier, Term, TermKind, is_spf_record, tokenize};

/// Validate one SPF record published at `domain`.
pub fn validate_spf<R>(resolver: &R, record: &str, domain: &str) -> ValidationResult
where
    R: LookupDns,
{
    validate_spf_with_options(resolver, record, domain, &ValidationOptions::default())
}

pub fn validate_spf_with_options<R>(
    resolver: &R,
    record: &str,
    domain: &str,
    options: &ValidationOptions,
) -> ValidationResult
where
    R: LookupDns,
{
    let mut ctx = ValidationContext::new(options);
    let domain = domain_key(domain);
    ctx.enter(&domain);
    Evaluator { resolver }.evaluate(record, &domain, &mut ctx);
    ctx.leave(&domain);
    ctx.finish()
}

/// Per-record ordering state. A fresh one is used for every included or
/// redirected record.
#[derive(Debug, Default)]
struct RecordState {
    all_seen: bool,
    redirect_seen: bool,
}

struct Evaluator<'r, R> {
    resolver: &'r R,
}

impl<R> Evaluator<'_, R>
where
    R: LookupDns,
{
    fn evaluate(&self, record: &str, domain: &str, ctx: &mut ValidationContext) {
        let Some(terms) = tokenize(record) else {
            ctx.diagnostics.critical(format!(
                "record for {domain} is not an SPF record: it must start with v=spf1"
            ));
            return;
        };

        let mut state = RecordState::default();
        let last = terms.len().saturating_sub(1);
        for (index, term) in terms.iter().enumerate() {
            self.evaluate_term(term, index == last, domain, &mut state, ctx);
        }
    }

    fn evaluate_term(
        &self,
        term: &Term,
        is_last: bool,
        domain: &str,
        state: &mut RecordState,
        ctx: &mut ValidationContext,
    ) {
        let raw = term.raw.as_str();
        match &term.kind {
            TermKind::All => {
                if state.all_seen {
                    ctx.diagnostics
                        .critical(format!("all mechanism is used more than once in {domain}"));
                }
                if state.redirect_seen {
                    ctx.diagnostics.critical(format!(
                        "all mechanism is used together with redirect in {domain}"
                    ));
                }
                if !is_last {
                    ctx.diagnostics.critical(format!(
                        "terms after '{raw}' in {domain} are never evaluated; all must be the last mechanism"
                    ));
                }
                if matches!(term.qualifier, None | Some(Qualifier::Pass | Qualifier::Neutral)) {
                    ctx.diagnostics.warning(format!(
                        "'{raw}' in {domain} authorizes everyone; prefer -all or ~all"
                    ));
                }
                state.all_seen = true;
            }
            TermKind::Redirect(target) => {
                if state.all_seen {
                    ctx.diagnostics.critical(format!(
                        "'{raw}' in {domain} follows an all mechanism and is never used"
                    ));
                } else if state.redirect_seen {
                    ctx.diagnostics.critical(format!(
                        "redirect modifier is used more than once in {domain}"
                    ));
                } else {
                    self.follow(target, raw, ctx);
                }
                state.redirect_seen = true;
            }
            TermKind::Include(target) => self.follow(target, raw, ctx),
            TermKind::Ip4(literal) => match parse_ipv4_cidr(literal) {
                Ok(cidr) if !is_public_ipv4(cidr.addr) => ctx.diagnostics.warning(format!(
                    "the ip address {cidr} in {domain} is not a public IPv4 address"
                )),
                Ok(_) => {}
                Err(err) => ctx
                    .diagnostics
                    .critical(format!("invalid ip4 mechanism '{raw}' in {domain}: {err}")),
            },
            TermKind::Ip6(literal) => {
                if let Err(err) = parse_ipv6(literal) {
                    ctx.diagnostics
                        .critical(format!("invalid ip6 mechanism '{raw}' in {domain}: {err}"));
                }
            }
            TermKind::A {
                domain: target,
                cidr,
            } => {
                let target = target.as_deref().unwrap_or(domain);
                if self.check_host_term(target, cidr, raw, domain, ctx) {
                    self.check_addresses(target, raw, ctx);
                }
            }
            TermKind::Mx {
                domain: target,
                cidr,
            } => {
                let target = target.as_deref().unwrap_or(domain);
                if self.check_host_term(target, cidr, raw, domain, ctx) {
                    self.check_mail_hosts(target, raw, ctx);
                }
            }
            TermKind::Exists(target) => {
                if !self.check_target(target, raw, domain, ctx) || !ctx.begin_lookup(raw) {
                    return;
                }
                let found = self
                    .lookup_a(target)
                    .is_some_and(|addresses| !addresses.is_empty());
                if !found {
                    ctx.diagnostics.warning(format!(
                        "domain {target} in '{raw}' has no A record and never matches"
                    ));
                }
            }
            TermKind::Ptr => ctx.diagnostics.warning(format!(
                "ptr mechanism should not be published ('{raw}' in {domain})"
            )),
            TermKind::Explanation(_) => ctx.diagnostics.low(format!(
                "exp modifier is not supported; '{raw}' in {domain} was not checked"
            )),
            TermKind::Invalid => ctx
                .diagnostics
                .critical(format!("invalid mechanism '{raw}' in {domain}")),
        }
    }

    /// Resolve an `include:` / `redirect=` target and evaluate its record
    /// with the same context.
    fn follow(&self, target: &str, raw: &str, ctx: &mut ValidationContext) {
        if target.is_empty() {
            ctx.diagnostics
                .critical(format!("'{raw}' does not name a domain"));
            return;
        }
        if has_macro(target) {
            ctx.diagnostics.low(format!(
                "macro expansion is not supported; '{raw}' was not resolved"
            ));
            return;
        }
        if !ctx.begin_lookup(raw) {
            return;
        }

        let key = domain_key(target);
        if !ctx.enter(&key) {
            tracing::warn!(domain = %key, term = raw, "SPF resolution cycle");
            ctx.diagnostics.critical(format!(
                "resolution cycle: '{raw}' leads back to {key}, which is already being evaluated"
            ));
            return;
        }

        tracing::debug!(domain = %key, term = raw, "following SPF reference");
        let records = match self.resolver.lookup_txt(&key) {
            Ok(records) => records,
            Err(err) => {
                tracing::debug!(domain = %key, error = %err, "TXT lookup failed");
                Vec::new()
            }
        };
        match records.iter().map(|record| record.trim()).find(|record| is_spf_record(record)) {
            Some(record) => self.evaluate(record, &key, ctx),
            None => ctx
                .diagnostics
                .critical(format!("no SPF record found for {key} (referenced by '{raw}')")),
        }
        ctx.leave(&key);
    }

    /// Shared checks for `a` / `mx`: prefix lengths, target and macros.
    fn check_host_term(
        &self,
        target: &str,
        cidr: &DualCidr,
        raw: &str,
        domain: &str,
        ctx: &mut ValidationContext,
    ) -> bool {
        let ip4_ok = cidr
            .ip4
            .as_deref()
            .is_none_or(|prefix| parse_prefix(prefix, 32).is_some());
        let ip6_ok = cidr
            .ip6
            .as_deref()
            .is_none_or(|prefix| parse_prefix(prefix, 128).is_some());
        if !ip4_ok || !ip6_ok {
            ctx.diagnostics
                .error(format!("invalid prefix length in '{raw}' in {domain}"));
            return false;
        }
        self.check_target(target, raw, domain, ctx)
    }

    fn check_target(
        &self,
        target: &str,
        raw: &str,
        domain: &str,
        ctx: &mut ValidationContext,
    ) -> bool {
        if target.is_empty() {
            ctx.diagnostics
                .critical(format!("'{raw}' in {domain} does not name a domain"));
            return false;
        }
        if has_macro(target) {
            ctx.diagnostics.low(format!(
                "macro expansion is not supported; '{raw}' in {domain} was not resolved"
            ));
            return false;
        }
        true
    }

    fn check_addresses(&self, target: &str, raw: &str, ctx: &mut ValidationContext) {
        if !ctx.begin_lookup(raw) {
            return;
        }
        match self.lookup_a(target) {
            Some(addresses) if !addresses.is_empty() => {
                for address in addresses {
                    if !is_public_ipv4(address) {
                        ctx.diagnostics.warning(format!(
                            "the ip address {address} from the A record of {target} is not a public IPv4 address"
                        ));
                    }
                }
            }
            _ => ctx
                .diagnostics
                .error(format!("no A record found for {target} ('{raw}')")),
        }
    }

    fn check_mail_hosts(&self, target: &str, raw: &str, ctx: &mut ValidationContext) {
        if !ctx.begin_lookup(raw) {
            return;
        }
        let hosts = match self.resolver.lookup_mx(target) {
            Ok(hosts) if !hosts.is_empty() => hosts,
            Ok(_) => {
                ctx.diagnostics
                    .error(format!("no MX record found for {target} ('{raw}')"));
                return;
            }
            Err(err) => {
                tracing::debug!(domain = target, error = %err, "MX lookup failed");
                ctx.diagnostics
                    .error(format!("no MX record found for {target} ('{raw}')"));
                return;
            }
        };

        // RFC 7505: a single "." exchange means the domain accepts no mail
        if hosts.iter().any(|host| host.exchange.trim_end_matches('.').is_empty()) {
            ctx.diagnostics.error(format!(
                "domain {target} publishes a null MX and never matches ('{raw}')"
            ));
            return;
        }

        for host in hosts {
            if !ctx.begin_lookup(raw) {
                return;
            }
            match self.lookup_a(&host.exchange) {
                Some(addresses) if !addresses.is_empty() => {
                    for address in addresses {
                        if !is_public_ipv4(address) {
                            ctx.diagnostics.warning(format!(
                                "the ip address {address} of MX host {} for {target} is not a public IPv4 address",
                                host.exchange
                            ));
                        }
                    }
                }
                _ => ctx.diagnostics.error(format!(
                    "MX host {} for {target} has no A record ('{raw}')",
                    host.exchange
                )),
            }
        }
    }

    fn lookup_a(&self, name: &str) -> Option<Vec<Ipv4Addr>> {
        match self.resolver.lookup_a(name) {
            Ok(addresses) => Some(addresses),
            Err(err) => {
                tracing::debug!(domain = name, error = %err, "A lookup failed");
                None
            }
        }
    }
}

fn has_macro(domain: &str) -> bool {
    domain.contains("%{")
}
