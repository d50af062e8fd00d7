//! Static call-graph edge parsing.
//!
//! The bytecode analyzer prints one edge per line:
//!
//! ```text
//! M:org.demo.Parser:parse(java.lang.String) (M)org.demo.Lexer:next()
//! C:org.demo.Parser$Inner org.demo.Lexer
//! ```
//!
//! Only the class of each endpoint is kept.

use std::collections::BTreeSet;

use tracing::debug;

/// Call-type tags stripped from the analyzer output
pub const CALL_TAGS: [&str; 5] = ["(M)", "(I)", "(D)", "(S)", "(O)"];

/// Package prefixes that void an edge when either endpoint has them
pub const DEFAULT_EXCLUDED_PREFIXES: [&str; 3] = ["java.", "org.junit", "javax."];

/// Reduce one endpoint to its class name
#[must_use]
pub fn endpoint_class(raw: &str) -> &str {
    let mut name = raw.split(':').next().unwrap_or(raw);
    name = name.split('$').next().unwrap_or(name);
    if name.starts_with('[') {
        name = name.get(2..).unwrap_or("");
    }
    name.split('[').next().unwrap_or(name)
}

/// Parse one analyzer line into a `(caller, callee)` class pair.
///
/// Returns `None` for blank or unexpected lines, self edges, and edges
/// touching an excluded prefix.
#[must_use]
pub fn parse_edge_line<S: AsRef<str>>(line: &str, excluded_prefixes: &[S]) -> Option<(String, String)> {
    let mut line = line.trim_end_matches('\r').to_string();
    for tag in CALL_TAGS {
        line = line.replace(tag, "");
    }
    let body = line.get(2..)?;
    let mut tokens = body.split_whitespace();
    let (caller, callee) = (tokens.next()?, tokens.next()?);
    if tokens.next().is_some() {
        return None;
    }

    let caller = endpoint_class(caller);
    let callee = endpoint_class(callee);
    let excluded = |name: &str| {
        excluded_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_ref()))
    };
    if caller.is_empty() || callee.is_empty() || caller == callee || excluded(caller) || excluded(callee) {
        return None;
    }
    Some((caller.to_string(), callee.to_string()))
}

/// Parse the whole analyzer output into distinct class edges
#[must_use]
pub fn parse_edges<S: AsRef<str>>(output: &str, excluded_prefixes: &[S]) -> BTreeSet<(String, String)> {
    let mut skipped = 0usize;
    let edges: BTreeSet<(String, String)> = output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let edge = parse_edge_line(line, excluded_prefixes);
            if edge.is_none() {
                skipped += 1;
            }
            edge
        })
        .collect();
    debug!(edges = edges.len(), skipped, "parsed call-graph edges");
    edges
}
