//! Lightweight HTML tag tokenizer with byte-range edits.
//!
//! Not a DOM. Rules find tags, read their attributes and splice new text in
//! at byte offsets; bytes outside an edit are preserved exactly.
//!
//! Comments (including `<!--[if mso]>…<![endif]-->` blocks) are opaque: the
//! markup inside them never becomes tag tokens. The bodies of `<style>`,
//! `<script>` and `<title>` are raw text.

use std::ops::Range;

const RAW_TEXT_ELEMENTS: &[&str] = &["style", "script", "title"];

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Lowercased attribute name.
    pub name: String,
    /// Raw value without surrounding quotes. `None` for bare attributes.
    pub value: Option<String>,
    /// Whole attribute, name through closing quote.
    pub span: Range<usize>,
    /// Value bytes inside the quotes.
    pub value_span: Option<Range<usize>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartTag {
    /// Lowercased element name.
    pub name: String,
    pub attrs: Vec<Attribute>,
    /// `<` through `>`.
    pub span: Range<usize>,
    /// Offset right after the last attribute (or the name), where new
    /// attributes are inserted.
    pub attrs_end: usize,
    pub self_closing: bool,
}

impl StartTag {
    pub fn attr(&self, name: &str) -> Option<&Attribute> {
        self.attrs.iter().find(|a| a.name == name)
    }

    pub fn attr_value(&self, name: &str) -> Option<&str> {
        self.attr(name).and_then(|a| a.value.as_deref())
    }

    /// Whitespace-separated tokens of the `class` attribute.
    pub fn classes(&self) -> Vec<&str> {
        self.attr_value("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Start(StartTag),
    End { name: String, span: Range<usize> },
    Comment { span: Range<usize> },
    /// `<!doctype …>`, `<?xml …?>` and similar.
    Declaration { span: Range<usize> },
    /// Body of a raw-text element; `element` is its lowercased name.
    RawText { element: String, span: Range<usize> },
}

impl Token {
    pub fn span(&self) -> Range<usize> {
        match self {
            Token::Start(tag) => tag.span.clone(),
            Token::End { span, .. }
            | Token::Comment { span }
            | Token::Declaration { span }
            | Token::RawText { span, .. } => span.clone(),
        }
    }
}

/// A tokenized document. Borrows the source it was built from.
#[derive(Debug)]
pub struct Document<'a> {
    pub source: &'a str,
    pub tokens: Vec<Token>,
}

impl<'a> Document<'a> {
    pub fn parse(source: &'a str) -> Self {
        Self {
            source,
            tokens: tokenize(source),
        }
    }

    pub fn text(&self, span: &Range<usize>) -> &'a str {
        &self.source[span.clone()]
    }

    /// Start tags with the given name, paired with their token index.
    pub fn start_tags<'d>(&'d self, name: &'d str) -> impl Iterator<Item = (usize, &'d StartTag)> + 'd {
        self.tokens.iter().enumerate().filter_map(move |(i, t)| match t {
            Token::Start(tag) if tag.name == name => Some((i, tag)),
            _ => None,
        })
    }

    /// Every start tag, regardless of name.
    pub fn all_start_tags(&self) -> impl Iterator<Item = &StartTag> {
        self.tokens.iter().filter_map(|t| match t {
            Token::Start(tag) => Some(tag),
            _ => None,
        })
    }

    pub fn first_start<'d>(&'d self, name: &'d str) -> Option<&'d StartTag> {
        self.start_tags(name).next().map(|(_, tag)| tag)
    }

    /// Span of the first end tag with the given name.
    pub fn first_end(&self, name: &str) -> Option<Range<usize>> {
        self.tokens.iter().find_map(|t| match t {
            Token::End { name: n, span } if n == name => Some(span.clone()),
            _ => None,
        })
    }

    /// Span of the end tag closing the start tag at token `index`, honouring
    /// nesting of same-named elements.
    pub fn matching_end(&self, index: usize) -> Option<Range<usize>> {
        let Token::Start(open) = self.tokens.get(index)? else {
            return None;
        };
        let mut depth = 0usize;
        for token in &self.tokens[index + 1..] {
            match token {
                Token::Start(tag) if tag.name == open.name && !tag.self_closing => depth += 1,
                Token::End { name, span } if *name == open.name => {
                    if depth == 0 {
                        return Some(span.clone());
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
        None
    }

    /// The token before `index` when only whitespace separates the two.
    pub fn adjacent_before(&self, index: usize) -> Option<&Token> {
        let current = self.tokens.get(index)?;
        let prev = self.tokens.get(index.checked_sub(1)?)?;
        let gap = &self.source[prev.span().end..current.span().start];
        gap.trim().is_empty().then_some(prev)
    }

    /// Raw-text bodies of the given element.
    pub fn raw_texts<'d>(&'d self, element: &'d str) -> impl Iterator<Item = Range<usize>> + 'd {
        self.tokens.iter().filter_map(move |t| match t {
            Token::RawText { element: e, span } if e == element => Some(span.clone()),
            _ => None,
        })
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b':' | b'_' | b'.')
}

fn find_from(source: &str, from: usize, needle: &str) -> Option<usize> {
    source.get(from..)?.find(needle).map(|i| i + from)
}

fn find_ci(source: &str, from: usize, needle: &str) -> Option<usize> {
    let hay = source.as_bytes().get(from..)?;
    let needle = needle.as_bytes();
    hay.windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
        .map(|i| i + from)
}

/// Split a document into tag-level tokens. Text between tags is not
/// tokenized; it is everything no token covers.
pub fn tokenize(source: &str) -> Vec<Token> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while let Some(start) = find_from(source, pos, "<") {
        let rest = &source[start..];

        if rest.starts_with("<!--") {
            let end = find_from(source, start + 4, "-->").map_or(source.len(), |i| i + 3);
            tokens.push(Token::Comment { span: start..end });
            pos = end;
        } else if rest.starts_with("</") {
            let name_end = scan_name(bytes, start + 2);
            if name_end == start + 2 {
                pos = start + 1;
                continue;
            }
            let end = find_from(source, name_end, ">").map_or(source.len(), |i| i + 1);
            tokens.push(Token::End {
                name: source[start + 2..name_end].to_ascii_lowercase(),
                span: start..end,
            });
            pos = end;
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            let end = find_from(source, start, ">").map_or(source.len(), |i| i + 1);
            tokens.push(Token::Declaration { span: start..end });
            pos = end;
        } else if bytes.get(start + 1).is_some_and(u8::is_ascii_alphabetic) {
            let Some(tag) = parse_start_tag(source, start) else {
                pos = start + 1;
                continue;
            };
            pos = tag.span.end;
            let raw = !tag.self_closing && RAW_TEXT_ELEMENTS.contains(&tag.name.as_str());
            let element = tag.name.clone();
            tokens.push(Token::Start(tag));
            if raw {
                let close = find_ci(source, pos, &format!("</{element}")).unwrap_or(source.len());
                tokens.push(Token::RawText {
                    element,
                    span: pos..close,
                });
                pos = close;
            }
        } else {
            pos = start + 1;
        }
    }
    tokens
}

fn scan_name(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    while i < bytes.len() && is_name_byte(bytes[i]) {
        i += 1;
    }
    i
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Parse `<name attr=… …>` starting at `start`. `None` when unterminated.
fn parse_start_tag(source: &str, start: usize) -> Option<StartTag> {
    let bytes = source.as_bytes();
    let name_end = scan_name(bytes, start + 1);
    let name = source[start + 1..name_end].to_ascii_lowercase();
    let mut attrs = Vec::new();
    let mut attrs_end = name_end;
    let mut i = name_end;

    loop {
        i = skip_ws(bytes, i);
        match bytes.get(i)? {
            b'>' => {
                return Some(StartTag {
                    name,
                    attrs,
                    span: start..i + 1,
                    attrs_end,
                    self_closing: false,
                });
            }
            b'/' if bytes.get(i + 1) == Some(&b'>') => {
                return Some(StartTag {
                    name,
                    attrs,
                    span: start..i + 2,
                    attrs_end,
                    self_closing: true,
                });
            }
            b'/' => {
                i += 1;
                continue;
            }
            _ => {}
        }

        let attr_start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && !matches!(bytes[i], b'=' | b'>' | b'/') {
            i += 1;
        }
        if i == attr_start {
            // Stray `=`
            i += 1;
            continue;
        }
        let attr_name = source[attr_start..i].to_ascii_lowercase();
        let after_name = i;
        let j = skip_ws(bytes, i);

        let (value, value_span) = if bytes.get(j) == Some(&b'=') {
            let v = skip_ws(bytes, j + 1);
            match bytes.get(v) {
                Some(&q @ (b'"' | b'\'')) => {
                    let close = source[v + 1..].find(q as char)? + v + 1;
                    i = close + 1;
                    (Some(source[v + 1..close].to_string()), Some(v + 1..close))
                }
                Some(_) => {
                    let mut e = v;
                    while e < bytes.len() && !bytes[e].is_ascii_whitespace() && bytes[e] != b'>' {
                        e += 1;
                    }
                    i = e;
                    (Some(source[v..e].to_string()), Some(v..e))
                }
                None => return None,
            }
        } else {
            i = after_name;
            (None, None)
        };

        attrs_end = i;
        attrs.push(Attribute {
            name: attr_name,
            value,
            span: attr_start..i,
            value_span,
        });
    }
}

/// A set of non-overlapping splices against one source string.
#[derive(Debug, Default)]
pub struct Edits {
    edits: Vec<(Range<usize>, String)>,
}

impl Edits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, at: usize, text: impl Into<String>) {
        self.edits.push((at..at, text.into()));
    }

    pub fn replace(&mut self, range: Range<usize>, text: impl Into<String>) {
        self.edits.push((range, text.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Apply all splices. Insertions at the same offset keep the order in
    /// which they were added.
    pub fn apply(mut self, source: &str) -> String {
        self.edits.sort_by_key(|(range, _)| (range.start, range.end));
        let mut out = String::with_capacity(source.len() + self.edits.iter().map(|(_, t)| t.len()).sum::<usize>());
        let mut cursor = 0;
        for (range, text) in self.edits {
            if range.start < cursor {
                log::warn!("Dropping overlapping edit at byte {}", range.start);
                continue;
            }
            out.push_str(&source[cursor..range.start]);
            out.push_str(&text);
            cursor = range.end;
        }
        out.push_str(&source[cursor..]);
        out
    }
}
