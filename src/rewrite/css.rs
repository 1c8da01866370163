//! Inline style declarations.
//!
//! Just enough CSS to match `style="…"` attributes by property and value
//! instead of by substring.

use std::ops::Range;

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// Lowercased property name.
    pub property: String,
    /// Trimmed value as written.
    pub value: String,
    /// Value bytes within the style text.
    pub value_span: Range<usize>,
}

/// Split style text on `;` outside parentheses and quotes.
pub fn parse_declarations(style: &str) -> Vec<Declaration> {
    let mut decls = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in style.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                push_declaration(style, start..i, &mut decls);
                start = i + 1;
            }
            _ => {}
        }
    }
    push_declaration(style, start..style.len(), &mut decls);
    decls
}

fn push_declaration(style: &str, range: Range<usize>, decls: &mut Vec<Declaration>) {
    let chunk = &style[range.clone()];
    let Some(colon) = chunk.find(':') else {
        return;
    };
    let property = chunk[..colon].trim().to_ascii_lowercase();
    if property.is_empty() {
        return;
    }
    let raw_value = &chunk[colon + 1..];
    let value = raw_value.trim();
    let lead = raw_value.len() - raw_value.trim_start().len();
    let value_start = range.start + colon + 1 + lead;
    decls.push(Declaration {
        property,
        value: value.to_string(),
        value_span: value_start..value_start + value.len(),
    });
}

/// Last declaration of `property`, which is the one that wins.
pub fn find<'a>(decls: &'a [Declaration], property: &str) -> Option<&'a Declaration> {
    decls.iter().rev().find(|d| d.property == property)
}

/// Lowercase, drop `!important`, and remove whitespace.
pub fn normalize_value(value: &str) -> String {
    let lower = value.to_ascii_lowercase();
    let without = lower.trim_end().strip_suffix("!important").unwrap_or(lower.as_str());
    without.chars().filter(|c| !c.is_whitespace()).collect()
}

/// `0`, `0px`, `0em`, … in any unit.
pub fn is_zero_length(value: &str) -> bool {
    let v = normalize_value(value);
    let digits = v.trim_start_matches(|c: char| c == '0' || c == '.');
    digits.len() < v.len() && digits.chars().all(|c| c.is_ascii_alphabetic() || c == '%')
}

/// Pixel count of `600`, `600px` or `600.0px`. Percentages and other units
/// give `None`.
pub fn pixel_length(value: &str) -> Option<u32> {
    let v = normalize_value(value);
    let number = v.strip_suffix("px").unwrap_or(v.as_str());
    let parsed: f64 = number.parse().ok()?;
    (parsed.is_finite() && parsed > 0.0).then(|| parsed.round() as u32)
}

/// `value` without a trailing `!important`, and whether one was there.
pub fn split_important(value: &str) -> (&str, bool) {
    let trimmed = value.trim_end();
    let tail = trimmed
        .len()
        .checked_sub("!important".len())
        .and_then(|at| trimmed.get(at..).map(|tail| (at, tail)));
    match tail {
        Some((at, tail)) if tail.eq_ignore_ascii_case("!important") => (trimmed[..at].trim_end(), true),
        _ => (trimmed, false),
    }
}

/// Whether a `font-family` list names any of `fonts` (case-insensitive,
/// quotes and `!important` ignored).
pub fn names_font(family_list: &str, fonts: &[String]) -> bool {
    split_important(family_list).0.split(',').any(|family| {
        let name = family
            .replace("&quot;", "")
            .replace("&#39;", "")
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'')
            .trim()
            .to_string();
        fonts.iter().any(|f| f.eq_ignore_ascii_case(&name))
    })
}

/// Append a declaration to style text, adding a separator when needed.
pub fn append_declaration(style: &str, property: &str, value: &str) -> String {
    let trimmed = style.trim_end();
    if trimmed.is_empty() {
        format!("{property}:{value};")
    } else if trimmed.ends_with(';') {
        format!("{trimmed}{property}:{value};")
    } else {
        format!("{trimmed};{property}:{value};")
    }
}
