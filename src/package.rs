//! Client-native container formats.
//!
//! Serializes rewritten HTML into the files a mail client imports as a
//! template. Every format is a pure function of `(html, meta)` apart from
//! the MIME boundary tokens.
//!
//! ## Formats
//!
//! | Format | File | Structure |
//! |--------|------|-----------|
//! | [`ContainerFormat::SinglePart`] | `B.oft` | `multipart/related` ⊃ HTML |
//! | [`ContainerFormat::NestedMultipart`] | `B.emltpl` | `mixed` ⊃ `related` ⊃ `alternative` ⊃ HTML |
//! | [`ContainerFormat::Html`] | `B-<client>.html` | the HTML itself |
//!
//! The HTML part is quoted-printable encoded as it declares, with CRLF line
//! endings and soft breaks at 76 columns.
//!
//! ## Boundaries
//!
//! Boundary tokens come from a [`BoundarySource`]. A candidate is rejected
//! when it occurs in the raw or encoded body or overlaps a boundary already
//! chosen for the same message, and a fresh one is drawn. The default
//! source draws random UUIDs, so a rejection is practically never seen.

use crate::rewrite::markup::Document;
use crate::rewrite::{Client, ClientProfile};
use thiserror::Error;
use uuid::Uuid;

const CRLF: &str = "\r\n";
const MAX_LINE: usize = 76;
const MAX_BOUNDARY_ATTEMPTS: usize = 16;

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("no usable MIME boundary after {attempts} attempts")]
    BoundaryExhausted { attempts: usize },
}

/// A container format a client profile can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    /// Single-part MIME template (Outlook for Windows `.oft`).
    SinglePart,
    /// Three-level nested MIME template (Outlook for Mac `.emltpl`).
    NestedMultipart,
    /// Plain HTML file.
    Html,
}

impl ContainerFormat {
    pub fn file_name(self, base: &str, client: Client) -> String {
        match (self, client) {
            (ContainerFormat::SinglePart, _) => format!("{base}.oft"),
            (ContainerFormat::NestedMultipart, _) => format!("{base}.emltpl"),
            (ContainerFormat::Html, Client::Html) => format!("{base}.html"),
            (ContainerFormat::Html, client) => format!("{base}-{client}.html"),
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ContainerFormat::SinglePart => "Outlook Windows Template",
            ContainerFormat::NestedMultipart => "Outlook Mac Template",
            ContainerFormat::Html => "HTML",
        }
    }
}

/// One serialized file.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerArtifact {
    pub format: ContainerFormat,
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Message metadata carried in MIME headers.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateMeta {
    pub subject: String,
}

impl TemplateMeta {
    /// Subject from the document's `<title>`, else `fallback`.
    pub fn from_html(html: &str, fallback: &str) -> Self {
        let doc = Document::parse(html);
        let title = doc
            .raw_texts("title")
            .next()
            .map(|span| collapse_whitespace(doc.text(&span)))
            .filter(|t| !t.is_empty());
        Self {
            subject: title.unwrap_or_else(|| fallback.to_string()),
        }
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Supplies candidate boundary tokens.
pub trait BoundarySource {
    /// A fresh candidate for nesting `level` (0 = outermost).
    fn next_boundary(&mut self, level: usize) -> String;
}

/// `----=_NextPart_<level>_<uuid>` tokens.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomBoundaries;

impl BoundarySource for RandomBoundaries {
    fn next_boundary(&mut self, level: usize) -> String {
        format!("----=_NextPart_{level:03}_{}", Uuid::new_v4().simple())
    }
}

fn choose_boundaries(
    count: usize,
    raw: &str,
    encoded: &str,
    source: &mut impl BoundarySource,
) -> Result<Vec<String>, PackageError> {
    let mut chosen: Vec<String> = Vec::with_capacity(count);
    for level in 0..count {
        let mut attempts = 0;
        loop {
            if attempts == MAX_BOUNDARY_ATTEMPTS {
                return Err(PackageError::BoundaryExhausted { attempts });
            }
            attempts += 1;
            let candidate = source.next_boundary(level);
            let clashes = candidate.is_empty()
                || raw.contains(&candidate)
                || encoded.contains(&candidate)
                || chosen
                    .iter()
                    .any(|b| b.contains(&candidate) || candidate.contains(b.as_str()));
            if clashes {
                log::debug!("Rejected MIME boundary candidate '{candidate}'");
                continue;
            }
            chosen.push(candidate);
            break;
        }
    }
    Ok(chosen)
}

// =============================================================================
// Encodings
// =============================================================================

/// Quoted-printable (RFC 2045) with CRLF hard breaks.
pub fn encode_quoted_printable(input: &[u8]) -> String {
    let mut out = String::with_capacity(input.len() + input.len() / 8);
    let mut lines = input.split(|&b| b == b'\n').peekable();

    while let Some(line) = lines.next() {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let mut width = 0;
        for (i, &byte) in line.iter().enumerate() {
            let last = i + 1 == line.len();
            let literal = matches!(byte, b'!'..=b'<' | b'>'..=b'~') || (matches!(byte, b' ' | b'\t') && !last);
            let token_len = if literal { 1 } else { 3 };
            // Leave room for the `=` of a soft break.
            if width + token_len > MAX_LINE - 1 {
                out.push('=');
                out.push_str(CRLF);
                width = 0;
            }
            if literal {
                out.push(byte as char);
            } else {
                out.push_str(&format!("={byte:02X}"));
            }
            width += token_len;
        }
        if lines.peek().is_some() {
            out.push_str(CRLF);
        }
    }
    out
}

/// RFC 2047 `Q` encoding for a header value; ASCII text is left as is.
pub fn encode_header_value(value: &str) -> String {
    if value.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
        return value.to_string();
    }
    const PREFIX: &str = "=?utf-8?Q?";
    const SUFFIX: &str = "?=";
    let budget = 75 - PREFIX.len() - SUFFIX.len();

    let mut words = Vec::new();
    let mut word = String::new();
    for c in value.chars() {
        let mut buf = [0u8; 4];
        let encoded: String = if c == ' ' {
            "_".to_string()
        } else if c.is_ascii_alphanumeric() || matches!(c, '!' | '*' | '+' | '-' | '/') {
            c.to_string()
        } else {
            c.encode_utf8(&mut buf)
                .bytes()
                .map(|b| format!("={b:02X}"))
                .collect()
        };
        if word.len() + encoded.len() > budget {
            words.push(std::mem::take(&mut word));
        }
        word.push_str(&encoded);
    }
    if !word.is_empty() {
        words.push(word);
    }
    words
        .iter()
        .map(|w| format!("{PREFIX}{w}{SUFFIX}"))
        .collect::<Vec<_>>()
        .join("\r\n ")
}

// =============================================================================
// MIME writers
// =============================================================================

struct MimeWriter {
    out: String,
}

impl MimeWriter {
    fn new() -> Self {
        Self { out: String::new() }
    }

    fn line(&mut self, text: &str) {
        self.out.push_str(text);
        self.out.push_str(CRLF);
    }

    fn headers(&mut self, meta: &TemplateMeta, content_type: &str, boundary: &str) {
        self.line("MIME-Version: 1.0");
        self.line(&format!("Subject: {}", encode_header_value(&meta.subject)));
        self.line("X-Unsent: 1");
        self.line(&format!("Content-Type: {content_type}; boundary=\"{boundary}\""));
        self.line("");
    }

    fn open_multipart(&mut self, content_type: &str, boundary: &str) {
        self.line(&format!("Content-Type: {content_type}; boundary=\"{boundary}\""));
        self.line("");
    }

    fn html_part(&mut self, encoded: &str) {
        self.line("Content-Type: text/html; charset=\"utf-8\"");
        self.line("Content-Transfer-Encoding: quoted-printable");
        self.line("");
        // The CRLF after the body belongs to the next delimiter.
        self.line(encoded);
    }

    fn delimiter(&mut self, boundary: &str) {
        self.line(&format!("--{boundary}"));
    }

    fn close(&mut self, boundary: &str) {
        self.line(&format!("--{boundary}--"));
    }

    fn finish(self) -> Vec<u8> {
        self.out.into_bytes()
    }
}

/// Single-part template: one `multipart/related` level around the HTML.
pub fn single_part(
    html: &str,
    meta: &TemplateMeta,
    boundaries: &mut impl BoundarySource,
) -> Result<Vec<u8>, PackageError> {
    let encoded = encode_quoted_printable(html.as_bytes());
    let chosen = choose_boundaries(1, html, &encoded, boundaries)?;
    let related = &chosen[0];

    let mut w = MimeWriter::new();
    w.headers(meta, "multipart/related", related);
    w.delimiter(related);
    w.html_part(&encoded);
    w.close(related);
    Ok(w.finish())
}

/// Nested template: `multipart/mixed` ⊃ `multipart/related` ⊃
/// `multipart/alternative` ⊃ HTML, each level with its own boundary.
pub fn nested_multipart(
    html: &str,
    meta: &TemplateMeta,
    boundaries: &mut impl BoundarySource,
) -> Result<Vec<u8>, PackageError> {
    let encoded = encode_quoted_printable(html.as_bytes());
    let chosen = choose_boundaries(3, html, &encoded, boundaries)?;
    let (mixed, related, alternative) = (&chosen[0], &chosen[1], &chosen[2]);

    let mut w = MimeWriter::new();
    w.headers(meta, "multipart/mixed", mixed);
    w.delimiter(mixed);
    w.open_multipart("multipart/related", related);
    w.delimiter(related);
    w.open_multipart("multipart/alternative", alternative);
    w.delimiter(alternative);
    w.html_part(&encoded);
    w.close(alternative);
    w.line("");
    w.close(related);
    w.line("");
    w.close(mixed);
    Ok(w.finish())
}

/// Every container the profile requires for one document.
pub fn package(
    profile: &ClientProfile,
    base_name: &str,
    html: &str,
    meta: &TemplateMeta,
    boundaries: &mut impl BoundarySource,
) -> Result<Vec<ContainerArtifact>, PackageError> {
    profile
        .containers
        .iter()
        .map(|&format| -> Result<ContainerArtifact, PackageError> {
            let bytes = match format {
                ContainerFormat::SinglePart => single_part(html, meta, boundaries)?,
                ContainerFormat::NestedMultipart => nested_multipart(html, meta, boundaries)?,
                ContainerFormat::Html => html.as_bytes().to_vec(),
            };
            Ok(ContainerArtifact {
                format,
                filename: format.file_name(base_name, profile.client),
                bytes,
            })
        })
        .collect()
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use std::collections::VecDeque;

    /// Hands out a fixed list of candidates, then numbered fallbacks.
    pub struct ScriptedBoundaries {
        pub queue: VecDeque<String>,
        pub drawn: usize,
    }

    impl ScriptedBoundaries {
        pub fn new(candidates: &[&str]) -> Self {
            Self {
                queue: candidates.iter().map(|s| s.to_string()).collect(),
                drawn: 0,
            }
        }
    }

    impl BoundarySource for ScriptedBoundaries {
        fn next_boundary(&mut self, level: usize) -> String {
            self.drawn += 1;
            self.queue
                .pop_front()
                .unwrap_or_else(|| format!("fallback-{level}-{}", self.drawn))
        }
    }

    /// Always returns the same token.
    struct Stuck(&'static str);

    impl BoundarySource for Stuck {
        fn next_boundary(&mut self, _level: usize) -> String {
            self.0.to_string()
        }
    }

    pub fn decode_quoted_printable(encoded: &str) -> String {
        let joined = encoded.replace("=\r\n", "");
        let bytes = joined.as_bytes();
        let mut out = Vec::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'=' && i + 2 < bytes.len() {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap();
                out.push(u8::from_str_radix(hex, 16).unwrap());
                i += 3;
            } else {
                out.push(bytes[i]);
                i += 1;
            }
        }
        String::from_utf8(out).unwrap().replace("\r\n", "\n")
    }

    fn meta() -> TemplateMeta {
        TemplateMeta {
            subject: "Spring digest".to_string(),
        }
    }

    const HTML: &str = "<html>\n<head><title>Spring digest</title></head>\n<body style=\"margin:0\"><p>Caf\u{e9} \u{1F47E} = 100%</p></body>\n</html>\n";

    /// Body of the single HTML part: between the blank line after its
    /// headers and the CRLF before the next delimiter.
    fn html_part_body(message: &str, boundary: &str) -> String {
        let headers = "Content-Transfer-Encoding: quoted-printable\r\n\r\n";
        let start = message.find(headers).unwrap() + headers.len();
        let end = message[start..].find(&format!("\r\n--{boundary}")).unwrap() + start;
        message[start..end].to_string()
    }

    // =========================================================================
    // Quoted-printable
    // =========================================================================

    #[test]
    fn qp_escapes_equals_and_non_ascii() {
        assert_eq!(encode_quoted_printable(b"a=b"), "a=3Db");
        assert_eq!(encode_quoted_printable("é".as_bytes()), "=C3=A9");
    }

    #[test]
    fn qp_line_endings_become_crlf() {
        assert_eq!(encode_quoted_printable(b"a\nb\r\nc"), "a\r\nb\r\nc");
    }

    #[test]
    fn qp_encodes_trailing_whitespace() {
        assert_eq!(encode_quoted_printable(b"a \nb\t"), "a=20\r\nb=09");
    }

    #[test]
    fn qp_lines_stay_within_limit() {
        let long = "x".repeat(300) + &"=".repeat(50);
        let encoded = encode_quoted_printable(long.as_bytes());
        assert!(encoded.split("\r\n").all(|l| l.len() <= MAX_LINE));
        assert_eq!(decode_quoted_printable(&encoded), long);
    }

    #[test]
    fn qp_round_trips_document() {
        let encoded = encode_quoted_printable(HTML.as_bytes());
        assert_eq!(decode_quoted_printable(&encoded), HTML);
    }

    // =========================================================================
    // Headers
    // =========================================================================

    #[test]
    fn ascii_subject_is_plain() {
        assert_eq!(encode_header_value("Spring digest"), "Spring digest");
    }

    #[test]
    fn non_ascii_subject_is_q_encoded() {
        assert_eq!(encode_header_value("Café news"), "=?utf-8?Q?Caf=C3=A9_news?=");
    }

    #[test]
    fn long_subject_is_split_into_words() {
        let subject = "ü".repeat(40);
        let encoded = encode_header_value(&subject);
        for word in encoded.split("\r\n ") {
            assert!(word.len() <= 75, "{word}");
            assert!(word.starts_with("=?utf-8?Q?") && word.ends_with("?="));
        }
    }

    #[test]
    fn meta_from_title_or_fallback() {
        assert_eq!(TemplateMeta::from_html(HTML, "x").subject, "Spring digest");
        assert_eq!(TemplateMeta::from_html("<title> </title>", "welcome").subject, "welcome");
        assert_eq!(TemplateMeta::from_html("<p>", "welcome").subject, "welcome");
    }

    // =========================================================================
    // Containers
    // =========================================================================

    #[test]
    fn single_part_structure() {
        let mut source = ScriptedBoundaries::new(&["BOUNDARY-A"]);
        let bytes = single_part(HTML, &meta(), &mut source).unwrap();
        let message = String::from_utf8(bytes).unwrap();

        assert!(message.starts_with("MIME-Version: 1.0\r\nSubject: Spring digest\r\nX-Unsent: 1\r\n"));
        assert!(message.contains("Content-Type: multipart/related; boundary=\"BOUNDARY-A\"\r\n"));
        assert!(message.contains("Content-Transfer-Encoding: quoted-printable\r\n"));
        assert_eq!(message.matches("--BOUNDARY-A\r\n").count(), 1);
        assert!(message.ends_with("--BOUNDARY-A--\r\n"));
        assert!(!message.replace("\r\n", "").contains('\n'));
        assert_eq!(decode_quoted_printable(&html_part_body(&message, "BOUNDARY-A")), HTML);
    }

    #[test]
    fn nested_multipart_structure() {
        let mut source = ScriptedBoundaries::new(&["MIXED", "RELATED", "ALTERNATIVE"]);
        let bytes = nested_multipart(HTML, &meta(), &mut source).unwrap();
        let message = String::from_utf8(bytes).unwrap();

        for b in ["MIXED", "RELATED", "ALTERNATIVE"] {
            assert_eq!(message.matches(&format!("--{b}\r\n")).count(), 1, "open {b}");
            assert_eq!(message.matches(&format!("--{b}--")).count(), 1, "close {b}");
        }
        let order: Vec<usize> = [
            "multipart/mixed",
            "multipart/related",
            "multipart/alternative",
            "text/html",
            "--ALTERNATIVE--",
            "--RELATED--",
            "--MIXED--",
        ]
        .iter()
        .map(|needle| message.find(needle).unwrap())
        .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]), "{order:?}");

        assert_eq!(message.matches("Content-Type: text/html").count(), 1);
        assert_eq!(decode_quoted_printable(&html_part_body(&message, "ALTERNATIVE")), HTML);
    }

    #[test]
    fn random_boundaries_are_distinct() {
        let bytes = nested_multipart(HTML, &meta(), &mut RandomBoundaries).unwrap();
        let message = String::from_utf8(bytes).unwrap();
        let mut tokens: Vec<&str> = message
            .lines()
            .filter_map(|l| l.split("boundary=\"").nth(1))
            .map(|rest| rest.trim_end_matches('"'))
            .collect();
        assert_eq!(tokens.len(), 3);
        tokens.sort();
        tokens.dedup();
        assert_eq!(tokens.len(), 3);
        assert!(tokens.iter().all(|t| t.starts_with("----=_NextPart_")));
    }

    #[test]
    fn boundary_found_in_body_is_replaced() {
        let html = "<p>--SEEN-IN-BODY</p>";
        let mut source = ScriptedBoundaries::new(&["SEEN-IN-BODY", "FRESH"]);
        let message = String::from_utf8(single_part(html, &meta(), &mut source).unwrap()).unwrap();
        assert!(message.contains("boundary=\"FRESH\""));
        assert_eq!(source.drawn, 2);
    }

    #[test]
    fn boundary_found_in_encoded_body_is_replaced() {
        // `=3D` only exists after encoding.
        let html = "<p style=\"a\">x</p>";
        let mut source = ScriptedBoundaries::new(&["3D", "FRESH"]);
        let message = String::from_utf8(single_part(html, &meta(), &mut source).unwrap()).unwrap();
        assert!(message.contains("boundary=\"FRESH\""));
    }

    #[test]
    fn overlapping_boundaries_are_rejected() {
        let mut source = ScriptedBoundaries::new(&["PART", "PART", "PART-2", "OTHER", "THIRD"]);
        let message = String::from_utf8(nested_multipart("<p>", &meta(), &mut source).unwrap()).unwrap();
        assert!(message.contains("boundary=\"PART\""));
        assert!(message.contains("boundary=\"OTHER\""));
        assert!(message.contains("boundary=\"THIRD\""));
    }

    #[test]
    fn hopeless_boundary_source_errors() {
        let result = single_part("<p>STUCK</p>", &meta(), &mut Stuck("STUCK"));
        assert!(matches!(
            result,
            Err(PackageError::BoundaryExhausted { attempts: MAX_BOUNDARY_ATTEMPTS })
        ));
    }

    #[test]
    fn output_is_deterministic_for_fixed_boundaries() {
        let a = single_part(HTML, &meta(), &mut ScriptedBoundaries::new(&["B"])).unwrap();
        let b = single_part(HTML, &meta(), &mut ScriptedBoundaries::new(&["B"])).unwrap();
        assert_eq!(a, b);
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    #[test]
    fn outlook_profile_produces_three_artifacts() {
        let profile = ClientProfile::outlook(&ProjectConfig::default());
        let artifacts = package(&profile, "welcome", HTML, &meta(), &mut RandomBoundaries).unwrap();
        let names: Vec<&str> = artifacts.iter().map(|a| a.filename.as_str()).collect();
        assert_eq!(names, vec!["welcome.oft", "welcome.emltpl", "welcome-outlook.html"]);
        assert_eq!(artifacts[2].bytes, HTML.as_bytes());
    }

    #[test]
    fn html_profile_produces_plain_file() {
        let profile = ClientProfile::html(&ProjectConfig::default());
        let artifacts = package(&profile, "welcome", HTML, &meta(), &mut RandomBoundaries).unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].filename, "welcome.html");
        assert_eq!(artifacts[0].format, ContainerFormat::Html);
    }
}
