//! Header codec: raw `Content-Security-Policy` value <-> [`Directives`].
//!
//! Parsing never fails. Clauses that cannot be understood are dropped so a
//! partially broken header still yields the directives that were readable.

use tracing::trace;

use crate::directive::{DirectiveKind, DirectiveName, DirectiveValue, Directives};
use crate::token;

/// Parse a raw header value into a directive mapping.
///
/// - clauses are split on `;` and tokens on runs of whitespace
/// - a bare boolean directive becomes `true`
/// - single-quoted tokens are unquoted
/// - unknown directive names are kept verbatim
/// - repeated directives keep the first occurrence, as browsers do
pub fn parse(content: &str) -> Directives {
    let mut directives = Directives::new();

    for clause in content.split(';') {
        let mut tokens = clause.split_whitespace();
        let Some(name) = tokens.next() else {
            continue;
        };

        if !is_valid_name(name) {
            trace!(clause = %clause.trim(), "dropping clause with invalid directive name");
            continue;
        }

        let name = name.to_ascii_lowercase();
        if directives.contains_key(&name) {
            trace!(directive = %name, "ignoring repeated directive");
            continue;
        }

        let values: Vec<String> = tokens.map(|t| token::unquote(t).to_string()).collect();
        let value = DirectiveValue::Sources(values).normalized();

        if !value.is_active() {
            match DirectiveName::from_name(&name).map(|d| d.kind()) {
                Some(DirectiveKind::List) => {
                    trace!(directive = %name, "dropping list directive without values");
                }
                // Known flags, and unknown bare names so future flags survive.
                Some(DirectiveKind::Boolean) | None => {
                    directives.insert(name, DirectiveValue::Flag(true));
                }
            }
            continue;
        }

        directives.insert(name, value);
    }

    directives
}

/// Serialize a directive mapping into a header value.
///
/// Set flags render as the bare name, list directives as `name v1 v2 ...`
/// with keyword, nonce and hash tokens quoted. Unset flags and empty lists
/// are omitted. Each clause is terminated by `;`.
pub fn serialize(directives: &Directives) -> String {
    let clauses: Vec<String> = directives
        .iter()
        .filter_map(|(name, value)| match value {
            DirectiveValue::Flag(true) => Some(name.to_string()),
            DirectiveValue::Flag(false) => None,
            DirectiveValue::Sources(values) if values.is_empty() => None,
            DirectiveValue::Sources(values) => {
                let mut clause = String::with_capacity(name.len() + values.len() * 16);
                clause.push_str(name);
                for value in values {
                    clause.push(' ');
                    clause.push_str(&token::quote(value));
                }
                Some(clause)
            }
        })
        .collect();

    if clauses.is_empty() {
        String::new()
    } else {
        format!("{};", clauses.join("; "))
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}
