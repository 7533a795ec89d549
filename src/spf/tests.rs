use std::time::Duration;

use super::{validate_spf, validate_spf_with_options};
use crate::options::ValidationOptions;
use crate::report::{Severity, ValidationResult};
use crate::test_support::StubResolver;

fn messages(result: &ValidationResult, severity: Severity) -> Vec<String> {
    result
        .issues_with(severity)
        .map(|issue| issue.message.clone())
        .collect()
}

#[test]
fn compliant_record_has_no_issues() {
    let stub = StubResolver::new()
        .txt("_spf.example.net", ["v=spf1 ip4:198.51.100.0/24 -all"])
        .a("example.com", &[[203, 0, 113, 10]])
        .mx("example.com", &[(10, "mx1.example.com")])
        .a("mx1.example.com", &[[203, 0, 113, 25]]);
    let result = validate_spf(
        &stub,
        "v=spf1 a mx ip4:192.0.2.0/24 ip6:2001:db8::/32 include:_spf.example.net ~all",
        "example.com",
    );
    assert!(result.status, "{result}");
    assert!(result.issues.is_empty());
}

#[test]
fn missing_version_is_single_critical() {
    let stub = StubResolver::new();
    let result = validate_spf(&stub, "include:_spf.example.net -all", "example.com");
    assert!(!result.status);
    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].severity, Severity::Critical);
    assert!(stub.queries().is_empty());
}

#[test]
fn all_followed_by_redirect_is_critical() {
    let stub = StubResolver::new().txt("example.com", ["v=spf1 -all"]);
    let result = validate_spf(&stub, "v=spf1 -all redirect=example.com", "example.org");
    assert!(result.count(Severity::Critical) >= 1);
    assert!(!stub.was_queried("TXT example.com"));
}

#[test]
fn duplicate_all_is_critical() {
    let stub = StubResolver::new();
    let result = validate_spf(&stub, "v=spf1 -all ~all", "example.com");
    let critical = messages(&result, Severity::Critical);
    assert!(critical.iter().any(|m| m.contains("more than once")), "{critical:?}");
    assert!(critical.iter().any(|m| m.contains("never evaluated")), "{critical:?}");
}

#[test]
fn permissive_all_is_warning() {
    let stub = StubResolver::new();
    for record in ["v=spf1 +all", "v=spf1 ?all", "v=spf1 all"] {
        let result = validate_spf(&stub, record, "example.com");
        assert_eq!(result.issues.len(), 1, "{record}");
        assert_eq!(result.issues[0].severity, Severity::Warning);
    }
    assert!(validate_spf(&stub, "v=spf1 ~all", "example.com").status);
}

#[test]
fn all_after_redirect_is_critical() {
    let stub = StubResolver::new().txt("_spf.example.com", ["v=spf1 -all"]);
    let result = validate_spf(&stub, "v=spf1 redirect=_spf.example.com -all", "example.com");
    let critical = messages(&result, Severity::Critical);
    assert_eq!(critical.len(), 1, "{critical:?}");
    assert!(critical[0].contains("together with redirect"));
}

#[test]
fn second_redirect_is_critical_and_not_followed() {
    let stub = StubResolver::new()
        .txt("one.example", ["v=spf1 -all"])
        .txt("two.example", ["v=spf1 -all"]);
    let result = validate_spf(&stub, "v=spf1 redirect=one.example redirect=two.example", "example.com");
    assert_eq!(result.count(Severity::Critical), 1);
    assert!(stub.was_queried("TXT one.example"));
    assert!(!stub.was_queried("TXT two.example"));
}

#[test]
fn redirect_alone_is_valid() {
    let stub = StubResolver::new().txt("_spf.example.com", ["google-site-verification=x", "v=spf1 -all"]);
    let result = validate_spf(&stub, "v=spf1 redirect=_spf.example.com", "example.com");
    assert!(result.status, "{result}");
}

#[test]
fn include_without_spf_record_is_critical() {
    let stub = StubResolver::new().txt("nospf.example", ["some other text"]);
    let result = validate_spf(&stub, "v=spf1 include:nospf.example include:missing.example -all", "example.com");
    let critical = messages(&result, Severity::Critical);
    assert_eq!(critical.len(), 2);
    assert!(critical[0].contains("nospf.example"));
    assert!(critical[1].contains("missing.example"));
}

#[test]
fn nested_issues_land_in_the_same_result() {
    let stub = StubResolver::new().txt("_spf.example.net", ["v=spf1 ip4:10.0.0.1 ptr -all"]);
    let result = validate_spf(&stub, "v=spf1 include:_spf.example.net -all", "example.com");
    assert_eq!(result.count(Severity::Warning), 2, "{result}");
}

#[test]
fn eleventh_include_exceeds_budget() {
    let mut stub = StubResolver::new();
    let mut record = String::from("v=spf1");
    for index in 1..=11 {
        let name = format!("inc{index}.example.net");
        stub = stub.txt(&name, ["v=spf1 -all"]);
        record.push_str(&format!(" include:{name}"));
    }
    record.push_str(" -all");

    let result = validate_spf(&stub, &record, "example.com");
    let critical = messages(&result, Severity::Critical);
    assert_eq!(critical.len(), 1, "{critical:?}");
    assert!(critical[0].contains("lookup budget exhausted"));
    assert!(stub.was_queried("TXT inc10.example.net"));
    assert!(!stub.was_queried("TXT inc11.example.net"));
}

#[test]
fn budget_is_shared_across_nested_records() {
    let stub = StubResolver::new()
        .txt("a.example", ["v=spf1 include:b.example -all"])
        .txt("b.example", ["v=spf1 include:c.example -all"])
        .txt("c.example", ["v=spf1 -all"]);
    let options = ValidationOptions::new().with_lookup_budget(2);
    let result = validate_spf_with_options(&stub, "v=spf1 include:a.example -all", "example.com", &options);
    assert_eq!(result.count(Severity::Critical), 1);
    assert!(!stub.was_queried("TXT c.example"));
}

#[test]
fn include_redirect_cycle_terminates() {
    let stub = StubResolver::new()
        .txt("a.example", ["v=spf1 include:b.example -all"])
        .txt("b.example", ["v=spf1 redirect=a.example"]);
    let result = validate_spf(&stub, "v=spf1 include:b.example -all", "a.example");
    let critical = messages(&result, Severity::Critical);
    assert_eq!(critical.len(), 1, "{critical:?}");
    assert!(critical[0].contains("resolution cycle"));
    assert_eq!(result.issues.len(), 1);
}

#[test]
fn self_include_is_a_cycle() {
    let stub = StubResolver::new().txt("loop.example", ["v=spf1 include:loop.example -all"]);
    let result = validate_spf(&stub, "v=spf1 include:loop.example -all", "example.com");
    let critical = messages(&result, Severity::Critical);
    assert_eq!(critical.len(), 1);
    assert!(critical[0].contains("resolution cycle"));
}

#[test]
fn sibling_includes_of_same_domain_are_not_cycles() {
    let stub = StubResolver::new().txt("shared.example", ["v=spf1 -all"]);
    let result = validate_spf(
        &stub,
        "v=spf1 include:shared.example include:shared.example -all",
        "example.com",
    );
    assert!(result.status, "{result}");
}

#[test]
fn ip4_checks() {
    let stub = StubResolver::new();
    assert!(validate_spf(&stub, "v=spf1 ip4:192.0.2.0/24 -all", "example.com").status);

    let private = validate_spf(&stub, "v=spf1 ip4:10.0.2.0/24 -all", "example.com");
    assert_eq!(messages(&private, Severity::Warning).len(), 1);

    let bad_prefix = validate_spf(&stub, "v=spf1 ip4:10.0.2.0/52 -all", "example.com");
    assert_eq!(bad_prefix.count(Severity::Critical), 1);

    let bad_octet = validate_spf(&stub, "v=spf1 ip4:300.1.1.1 -all", "example.com");
    assert_eq!(bad_octet.count(Severity::Critical), 1);
}

#[test]
fn ip6_checks() {
    let stub = StubResolver::new();
    assert!(validate_spf(&stub, "v=spf1 ip6:2001:db8::/32 -all", "example.com").status);
    let bad = validate_spf(&stub, "v=spf1 ip6:001:db8:::/764 -all", "example.org");
    assert_eq!(bad.count(Severity::Critical), 1);
}

#[test]
fn a_mechanism_uses_current_or_given_domain() {
    let stub = StubResolver::new()
        .a("example.com", &[[192, 168, 1, 5]])
        .a("other.example", &[[203, 0, 113, 7]]);
    let result = validate_spf(&stub, "v=spf1 a a:other.example/24 -all", "example.com");
    assert_eq!(messages(&result, Severity::Warning).len(), 1, "{result}");
    assert!(stub.was_queried("A example.com"));
    assert!(stub.was_queried("A other.example"));
}

#[test]
fn a_mechanism_bad_prefix_is_error_without_lookup() {
    let stub = StubResolver::new().a("example.com", &[[203, 0, 113, 10]]);
    let result = validate_spf(&stub, "v=spf1 a/f::f -all", "example.com");
    assert_eq!(result.count(Severity::Error), 1);
    assert!(stub.queries().is_empty());
}

#[test]
fn a_mechanism_without_records_is_error() {
    let stub = StubResolver::new();
    let result = validate_spf(&stub, "v=spf1 a:nowhere.example -all", "example.com");
    assert_eq!(result.count(Severity::Error), 1);
}

#[test]
fn mx_mechanism_resolves_each_host() {
    let stub = StubResolver::new()
        .mx("example.com", &[(10, "mx1.example.com"), (20, "mx2.example.com")])
        .a("mx1.example.com", &[[172, 16, 0, 3]])
        .a("mx2.example.com", &[[203, 0, 113, 25]]);
    let result = validate_spf(&stub, "v=spf1 mx -all", "example.com");
    assert_eq!(messages(&result, Severity::Warning).len(), 1, "{result}");
    assert_eq!(
        stub.queries(),
        ["MX example.com", "A mx1.example.com", "A mx2.example.com"]
    );
}

#[test]
fn mx_hosts_are_charged_to_the_budget() {
    let stub = StubResolver::new()
        .mx("example.com", &[(10, "mx1.example.com"), (20, "mx2.example.com")])
        .a("mx1.example.com", &[[203, 0, 113, 24]])
        .a("mx2.example.com", &[[203, 0, 113, 25]]);
    let options = ValidationOptions::new().with_lookup_budget(2);
    let result = validate_spf_with_options(&stub, "v=spf1 mx -all", "example.com", &options);
    assert_eq!(result.count(Severity::Critical), 1);
    assert!(!stub.was_queried("A mx2.example.com"));
}

#[test]
fn mx_for_unknown_domain_is_error() {
    let stub = StubResolver::new();
    let result = validate_spf(&stub, "v=spf1 mx:dasdas.asd -all", "example.com");
    assert!(!result.status);
    assert_eq!(result.count(Severity::Error), 1);
}

#[test]
fn null_mx_is_error_without_host_lookup() {
    for exchange in [".", ""] {
        let stub = StubResolver::new().mx("example.com", &[(0, exchange)]);
        let result = validate_spf(&stub, "v=spf1 mx -all", "example.com");
        let errors = messages(&result, Severity::Error);
        assert_eq!(errors.len(), 1, "{result}");
        assert!(errors[0].contains("null MX"), "{}", errors[0]);
        assert_eq!(stub.queries(), ["MX example.com"]);
    }
}

#[test]
fn unicode_include_cycle_matches_ascii_domain() {
    let stub = StubResolver::new().txt(
        "xn--bcher-kva.example",
        ["v=spf1 include:xn--bcher-kva.example -all"],
    );
    let result = validate_spf(&stub, "v=spf1 include:bücher.example -all", "bücher.example");
    let critical = messages(&result, Severity::Critical);
    assert_eq!(critical.len(), 1, "{result}");
    assert!(critical[0].contains("resolution cycle"));
    assert!(stub.queries().is_empty());
}

#[test]
fn exists_without_answer_is_warning() {
    let stub = StubResolver::new().a("present.example", &[[127, 0, 0, 2]]);
    assert!(validate_spf(&stub, "v=spf1 exists:present.example -all", "example.com").status);
    let result = validate_spf(&stub, "v=spf1 exists:com -all", "example.org");
    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].severity, Severity::Warning);
}

#[test]
fn ptr_is_warning_without_lookup() {
    let stub = StubResolver::new();
    let result = validate_spf(&stub, "v=spf1 ptr:example.com -all", "example.com");
    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].severity, Severity::Warning);
    assert!(stub.queries().is_empty());
}

#[test]
fn invalid_mechanism_is_critical() {
    let stub = StubResolver::new();
    let result = validate_spf(&stub, "v=spf1 foo:bar -all", "example.com");
    assert_eq!(result.issues.len(), 1);
    assert!(result.issues[0].message.contains("invalid mechanism 'foo:bar'"));
}

#[test]
fn unsupported_features_are_low() {
    let stub = StubResolver::new();
    let result = validate_spf(
        &stub,
        "v=spf1 exists:%{i}._spf.example.com exp=explain.example.com -all",
        "example.com",
    );
    assert_eq!(result.count(Severity::Low), 2, "{result}");
    assert!(stub.queries().is_empty());
}

#[test]
fn expired_deadline_skips_lookups() {
    let stub = StubResolver::new().txt("_spf.example.net", ["v=spf1 -all"]);
    let options = ValidationOptions::new().with_deadline(Duration::ZERO);
    let result = validate_spf_with_options(
        &stub,
        "v=spf1 ip4:10.0.0.1 include:_spf.example.net a -all",
        "example.com",
        &options,
    );
    assert_eq!(result.count(Severity::Warning), 1);
    let critical = messages(&result, Severity::Critical);
    assert_eq!(critical.len(), 1);
    assert!(critical[0].contains("validation timed out"));
    assert!(stub.queries().is_empty());
}
