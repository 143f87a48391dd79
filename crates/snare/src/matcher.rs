//! Rule matching.
//!
//! `find_match` takes a fresh priority-ordered snapshot of the active rules
//! on every call and returns the first rule whose configured predicates all
//! hold. Rule sets are small, so the linear scan with no cache keeps CRUD
//! changes visible on the very next request.

use regex::Regex;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::model::{InboundRequest, Rule};
use crate::store::{RuleStore, StoreError};

#[derive(Clone)]
pub struct RuleMatcher {
    rules: Arc<dyn RuleStore>,
}

impl RuleMatcher {
    pub fn new(rules: Arc<dyn RuleStore>) -> Self {
        Self { rules }
    }

    /// First active rule, in priority-ascending order, whose predicates all
    /// hold for the request. `None` when no rule matches.
    pub async fn find_match(&self, request: &InboundRequest) -> Result<Option<Rule>, StoreError> {
        let rules = self.rules.list_active().await?;
        for rule in rules {
            if rule_matches(&rule, request) {
                debug!(
                    rule = %rule.name,
                    priority = rule.priority,
                    method = %request.method,
                    url = %request.url,
                    "rule matched"
                );
                return Ok(Some(rule));
            }
        }
        Ok(None)
    }
}

/// All configured predicates hold; absent patterns are vacuously true.
/// The body pattern is deliberately not consulted.
fn rule_matches(rule: &Rule, request: &InboundRequest) -> bool {
    method_matches(&rule.method, &request.method)
        && path_matches(&rule.path_pattern, rule, request)
        && query_matches(&rule.query_pattern, rule, &request.query)
        && headers_match(&rule.header_pattern, &request.headers)
}

fn method_matches(pattern: &str, method: &str) -> bool {
    pattern.is_empty() || pattern.eq_ignore_ascii_case(method)
}

/// A pattern anchored with `^` or `$` is a regex over the request path; any
/// other pattern is a required substring of the absolute URL.
fn path_matches(pattern: &str, rule: &Rule, request: &InboundRequest) -> bool {
    if pattern.is_empty() {
        return true;
    }
    if looks_like_regex(pattern) {
        match Regex::new(pattern) {
            Ok(re) => re.is_match(&request.path),
            Err(e) => {
                warn!(rule = %rule.name, pattern, error = %e, "malformed path regex, treating rule as non-matching");
                false
            }
        }
    } else {
        request.url.contains(pattern)
    }
}

/// Same regex-vs-literal dispatch as the path. In literal mode the pattern is
/// split on `&` and every fragment must be a prefix of at least one
/// `&`-split component of the actual query string. This is a loose
/// "parameter present with this literal prefix" check, not key/value parsing.
fn query_matches(pattern: &str, rule: &Rule, query: &str) -> bool {
    if pattern.is_empty() {
        return true;
    }
    if looks_like_regex(pattern) {
        return match Regex::new(pattern) {
            Ok(re) => re.is_match(query),
            Err(e) => {
                warn!(rule = %rule.name, pattern, error = %e, "malformed query regex, treating rule as non-matching");
                false
            }
        };
    }
    let components: Vec<&str> = query.split('&').collect();
    pattern
        .split('&')
        .filter(|fragment| !fragment.is_empty())
        .all(|fragment| components.iter().any(|c| c.starts_with(fragment)))
}

/// `;`-separated `Name:Value` clauses. The header name is matched
/// case-insensitively and the value must contain the required value as a
/// substring. Any failing clause rejects the rule.
fn headers_match(pattern: &str, headers: &[(String, String)]) -> bool {
    pattern
        .split(';')
        .map(str::trim)
        .filter(|clause| !clause.is_empty())
        .all(|clause| {
            let (name, required) = match clause.split_once(':') {
                Some((n, v)) => (n.trim(), v.trim()),
                None => (clause, ""),
            };
            headers
                .iter()
                .any(|(n, v)| n.eq_ignore_ascii_case(name) && v.contains(required))
        })
}

fn looks_like_regex(pattern: &str) -> bool {
    pattern.starts_with('^') || pattern.ends_with('$')
}
