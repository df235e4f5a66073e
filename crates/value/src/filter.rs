//! Filter expression escaping for the search endpoints.
//!
//! Data sources accept filters written as `name<op>value` clauses, OR-joined
//! with `,` and AND-joined with `&`:
//!
//! ```text
//! name_tag=web,name_tag=db&status!=disable
//! ```
//!
//! The backend expects one `filter=` query parameter per AND-group, hyphenated
//! field names, and query-escaped values.

use std::sync::LazyLock;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;

/// Characters that may form a clause operator (`=`, `!=`, `>=`, `=@`, ...).
const CLAUSE_PATTERN: &str = r"([^=*!@><]+)([=*!@><]+)([^=*!@><]+)";

/// Everything but the query-unreserved set `A-Z a-z 0-9 - _ . ~`.
const QUERY_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

static CLAUSE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(CLAUSE_PATTERN).ok());

/// One `name<op>value` triplet, as written by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterClause {
    /// Field name, unescaped
    pub name: String,
    /// Operator run, possibly chained (e.g. `!=`)
    pub operator: String,
    /// Field value, unescaped
    pub value: String,
}

impl FilterClause {
    /// Parses the first `name<op>value` triplet found in `clause`.
    #[must_use]
    pub fn parse(clause: &str) -> Option<Self> {
        let re = CLAUSE.as_ref()?;
        let caps = re.captures(clause)?;
        Some(Self {
            name: caps.get(1)?.as_str().to_string(),
            operator: caps.get(2)?.as_str().to_string(),
            value: caps.get(3)?.as_str().to_string(),
        })
    }

    /// Returns the field name as the backend expects it.
    ///
    /// Underscores become hyphens and the `fssid` alias becomes `id` before
    /// backslashes and dots are escaped.
    #[must_use]
    pub fn wire_name(&self) -> String {
        let name = self.name.replace('_', "-");
        let name = if name == "fssid" { "id".to_string() } else { name };
        name.replace('\\', "%5C").replace('.', "%2E")
    }

    /// Returns the query-escaped value.
    #[must_use]
    pub fn wire_value(&self) -> String {
        query_escape(&self.value)
    }

    /// Renders the clause in wire format.
    #[must_use]
    pub fn to_wire(&self) -> String {
        format!("{}{}{}", self.wire_name(), self.operator, self.wire_value())
    }
}

/// Query escaping: unreserved bytes pass through, space becomes `+`.
fn query_escape(value: &str) -> String {
    value
        .split(' ')
        .map(|part| utf8_percent_encode(part, QUERY_ESCAPE).to_string())
        .collect::<Vec<_>>()
        .join("+")
}

/// Splits a filter into AND-groups of OR-clauses.
///
/// Segments without an operator are kept as `None` so the original
/// segmentation survives.
#[must_use]
pub fn parse_filter(filter: &str) -> Vec<Vec<Option<FilterClause>>> {
    filter
        .split('&')
        .map(|group| group.split(',').map(FilterClause::parse).collect())
        .collect()
}

/// Translates a Terraform-side filter expression into the search wire format.
///
/// ```
/// use fortisase_value::escape_filter;
///
/// assert_eq!(escape_filter("fssid=123"), "filter=id=123");
/// assert_eq!(
///     escape_filter("name_tag=foo bar,os=mac&status!=disable"),
///     "filter=name-tag=foo+bar,os=mac&filter=status!=disable"
/// );
/// ```
#[must_use]
pub fn escape_filter(filter: &str) -> String {
    parse_filter(filter)
        .iter()
        .map(|group| {
            let clauses = group
                .iter()
                .map(|clause| clause.as_ref().map(FilterClause::to_wire).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(",");
            format!("filter={clauses}")
        })
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fssid_alias() {
        assert_eq!(escape_filter("fssid=123"), "filter=id=123");
        // Only the whole name is an alias.
        assert_eq!(escape_filter("fssid_ref=1"), "filter=fssid-ref=1");
    }

    #[test]
    fn test_name_and_value_escaping() {
        assert_eq!(escape_filter("name_tag=foo bar"), "filter=name-tag=foo+bar");
        assert_eq!(escape_filter("a.b=x/y"), "filter=a%2Eb=x%2Fy");
        assert_eq!(escape_filter(r"a\b=1"), "filter=a%5Cb=1");
        assert_eq!(escape_filter("name=a~b-c_d.e"), "filter=name=a~b-c_d.e");
        assert_eq!(escape_filter("name=caf\u{e9}"), "filter=name=caf%C3%A9");
    }

    #[test]
    fn test_chained_operators() {
        assert_eq!(escape_filter("status!=disable"), "filter=status!=disable");
        assert_eq!(escape_filter("count>=5"), "filter=count>=5");
        assert_eq!(escape_filter("name=@web"), "filter=name=@web");
    }

    #[test]
    fn test_separators_are_preserved() {
        assert_eq!(
            escape_filter("a=1,b=2&c=3"),
            "filter=a=1,b=2&filter=c=3"
        );
        assert_eq!(escape_filter("a=1&b=2&c=3"), "filter=a=1&filter=b=2&filter=c=3");
    }

    #[test]
    fn test_clause_without_operator_is_empty() {
        assert_eq!(escape_filter("justtext"), "filter=");
        assert_eq!(escape_filter("a=1,junk"), "filter=a=1,");
    }

    #[test]
    fn test_parse_filter_structure() {
        let parsed = parse_filter("a=1,b!=2&c");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].len(), 2);
        assert_eq!(
            parsed[0][1],
            Some(FilterClause {
                name: "b".into(),
                operator: "!=".into(),
                value: "2".into(),
            })
        );
        assert_eq!(parsed[1], vec![None]);
    }
}
