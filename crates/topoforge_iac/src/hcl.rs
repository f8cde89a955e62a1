//! HCL quoting helpers.
//!
//! Every identifier interpolated into a generated configuration goes through
//! these functions so names, addresses and list fields are escaped the same
//! way in every section.

/// Quote a value as an HCL string literal.
pub fn string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            // Template sequences must not be evaluated.
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(c);
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Render a list of string literals.
pub fn list<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let items: Vec<String> = values.into_iter().map(|v| string(v.as_ref())).collect();
    format!("[{}]", items.join(", "))
}

/// Turn an arbitrary name into a valid block label / identifier.
///
/// Characters outside `[A-Za-z0-9_-]` become `_`, and a leading digit or dash
/// gets a `_` prefix.
pub fn identifier(value: &str) -> String {
    let mut out: String = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
        out.insert(0, '_');
    }
    out
}
