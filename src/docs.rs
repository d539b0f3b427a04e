//! Documentation-comment condensation.

const DOC_PREFIX: &str = "/// ";
const DOC_MARKER: &str = "///";

/// Condense raw doc-comment text to its first paragraph on one line.
///
/// Each line loses its `/// ` prefix (a bare `///` becomes empty) and its
/// trailing whitespace; lines are taken up to the first empty one and joined
/// with single spaces.
pub fn condense(doc: Option<&str>) -> String {
    let Some(doc) = doc else {
        return String::new();
    };
    doc.lines()
        .map(strip_marker)
        .map(str::trim_end)
        .take_while(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_marker(line: &str) -> &str {
    if line == DOC_MARKER {
        ""
    } else {
        line.strip_prefix(DOC_PREFIX).unwrap_or(line)
    }
}
