//! Shared text normalization helpers for test suites.

/// Removes the indentation shared by every non-blank line and a single
/// leading newline, so documents can be written inline in tests.
///
/// ```
/// use strata_test_helpers::text::dedent;
///
/// let doc = dedent("
///     a: 1
///     b:
///       c: 2
/// ");
/// assert_eq!(doc, "a: 1\nb:\n  c: 2\n");
/// ```
#[must_use]
pub fn dedent(text: &str) -> String {
    let body = text.strip_prefix('\n').unwrap_or(text);
    let indent = body
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    let mut out = String::with_capacity(body.len());
    for line in body.lines() {
        let stripped = line.get(indent..).unwrap_or_else(|| line.trim_start());
        out.push_str(stripped.trim_end());
        out.push('\n');
    }
    out
}

/// Lines of a rendered resolution report, without the summary header.
#[must_use]
pub fn report_lines(rendered: &str) -> Vec<&str> {
    rendered
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.ends_with("failed:"))
        .collect()
}
