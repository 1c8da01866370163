//! Outlook rule set.
//!
//! Outlook for Windows renders with Word's HTML engine: no web fonts, no CSS
//! backgrounds on tables, DPI scaling quirks. These rules add the
//! conditional markup and inline fixes it needs, in this order:
//!
//! 1. `cell-classes`: semantic classes on cells matching a style signature
//! 2. `office-settings`: `<o:OfficeDocumentSettings>` block after `<head>`
//! 3. `outlook-styles`: `<style id="outlook-fixes">` before `</head>`
//! 4. `zero-font-spacer`: `line-height:0` on `font-size:0` cells
//! 5. `font-fallback`: web fonts replaced by a safe family list
//! 6. `vml-background`: colored tables wrapped in a VML rectangle
//! 7. `emoji-entities`: a few emoji written as numeric entities

use super::RewriteRule;
use super::css::{self, Declaration};
use super::markup::{Document, Edits, StartTag, Token};
use crate::config::{CellClassRule, OutlookConfig};
use regex::{Captures, Regex};
use std::sync::LazyLock;

const OFFICE_SETTINGS_MARKER: &str = "o:OfficeDocumentSettings";
const STYLE_BLOCK_ID: &str = "outlook-fixes";
/// Fragments of the opening block written by `vml-background`.
const VML_OPEN_MARKERS: [&str; 2] = ["<v:fill type=\"tile\"", "<v:textbox inset="];
const VML_CLOSE_MARKER: &str = "</v:textbox>";

const OFFICE_SETTINGS: &str = r#"
<!--[if gte mso 9]>
<xml>
  <o:OfficeDocumentSettings>
    <o:AllowPNG/>
    <o:PixelsPerInch>96</o:PixelsPerInch>
  </o:OfficeDocumentSettings>
</xml>
<![endif]-->"#;

const EMOJI_ENTITIES: &[(&str, &str)] = &[
    ("\u{1F47E}", "&#x1F47E;"),
    ("\u{1F449}", "&#x1F449;"),
    ("\u{1F4E7}", "&#x1F4E7;"),
    ("\u{1F3AE}", "&#x1F3AE;"),
];

static FONT_FAMILY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)font-family\s*:\s*([^;}]*)").expect("valid regex"));

/// The Outlook rules, configured and in application order.
pub fn rules(config: &OutlookConfig) -> Vec<Box<dyn RewriteRule>> {
    vec![
        Box::new(CellClasses {
            signatures: config.cell_classes.clone(),
        }),
        Box::new(OfficeSettings),
        Box::new(OutlookStyles {
            column_classes: config.column_classes.clone(),
        }),
        Box::new(ZeroFontSpacer),
        Box::new(FontFallback {
            web_fonts: config.web_fonts.clone(),
            fallback: config.fallback_fonts.clone(),
        }),
        Box::new(VmlBackground {
            default_width: config.vml_width.clone(),
        }),
        Box::new(EmojiEntities),
    ]
}

fn style_of(tag: &StartTag) -> Vec<Declaration> {
    tag.attr_value("style")
        .map(css::parse_declarations)
        .unwrap_or_default()
}

/// Replace a tag's `style` value. The tag must have one.
fn replace_style(edits: &mut Edits, tag: &StartTag, new_style: String) {
    if let Some(span) = tag.attr("style").and_then(|a| a.value_span.clone()) {
        edits.replace(span, new_style);
    }
}

// =============================================================================
// 1. Structural class injection
// =============================================================================

struct CellClasses {
    signatures: Vec<CellClassRule>,
}

impl CellClasses {
    fn matches(signature: &CellClassRule, decls: &[Declaration]) -> bool {
        signature.styles.iter().all(|(property, expected)| {
            css::find(decls, &property.to_ascii_lowercase()).is_some_and(|d| {
                expected == "*" || css::normalize_value(&d.value) == css::normalize_value(expected)
            })
        })
    }
}

impl RewriteRule for CellClasses {
    fn name(&self) -> &'static str {
        "cell-classes"
    }

    fn edits(&self, doc: &Document<'_>) -> Edits {
        let mut edits = Edits::new();
        for (_, td) in doc.start_tags("td") {
            let decls = style_of(td);
            if decls.is_empty() {
                continue;
            }
            let existing = td.classes();
            let missing: Vec<&str> = self
                .signatures
                .iter()
                .filter(|sig| Self::matches(sig, &decls))
                .map(|sig| sig.class.as_str())
                .filter(|class| !existing.contains(class))
                .collect();
            if missing.is_empty() {
                continue;
            }

            match td.attr("class") {
                Some(attr) => {
                    let mut tokens = existing.clone();
                    tokens.extend(missing);
                    edits.replace(attr.span.clone(), format!("class=\"{}\"", tokens.join(" ")));
                }
                None => edits.insert(td.attrs_end, format!(" class=\"{}\"", missing.join(" "))),
            }
        }
        edits
    }
}

// =============================================================================
// 2. Office document settings
// =============================================================================

struct OfficeSettings;

fn declares_charset(doc: &Document<'_>) -> bool {
    doc.start_tags("meta").any(|(_, meta)| {
        meta.attr("charset").is_some()
            || meta
                .attr_value("content")
                .is_some_and(|c| c.to_ascii_lowercase().contains("charset"))
    })
}

impl RewriteRule for OfficeSettings {
    fn name(&self) -> &'static str {
        "office-settings"
    }

    fn edits(&self, doc: &Document<'_>) -> Edits {
        let mut edits = Edits::new();
        if doc.source.contains(OFFICE_SETTINGS_MARKER) {
            return edits;
        }
        let Some(head) = doc.first_start("head") else {
            return edits;
        };
        if !declares_charset(doc) {
            edits.insert(head.span.end, "\n<meta charset=\"utf-8\">");
        }
        edits.insert(head.span.end, OFFICE_SETTINGS);
        edits
    }
}

// =============================================================================
// 3. Outlook style block
// =============================================================================

struct OutlookStyles {
    column_classes: Vec<String>,
}

impl OutlookStyles {
    fn block(&self) -> String {
        let mut css = String::from(
            "\n<style type=\"text/css\" id=\"outlook-fixes\">\n\
             .mso-hide { mso-hide: all !important; }\n\
             table { border-collapse: collapse; }\n\
             .outlook-group-fix { width: 100% !important; }\n\
             @media screen and (-webkit-min-device-pixel-ratio: 0) {\n\
             \x20 .outlook-group-fix { width: auto !important; }\n\
             }\n",
        );
        if !self.column_classes.is_empty() {
            let selectors: Vec<String> = self
                .column_classes
                .iter()
                .map(|c| format!(".{c} table[role=\"presentation\"]"))
                .collect();
            css.push_str(&selectors.join(",\n"));
            css.push_str(" {\n  height: 100% !important;\n}\n");
        }
        css.push_str("</style>\n");
        css
    }
}

impl RewriteRule for OutlookStyles {
    fn name(&self) -> &'static str {
        "outlook-styles"
    }

    fn edits(&self, doc: &Document<'_>) -> Edits {
        let mut edits = Edits::new();
        let present = doc
            .start_tags("style")
            .any(|(_, s)| s.attr_value("id") == Some(STYLE_BLOCK_ID));
        if present {
            return edits;
        }
        if let Some(head_end) = doc.first_end("head") {
            edits.insert(head_end.start, self.block());
        }
        edits
    }
}

// =============================================================================
// 4. Zero-font spacer cells
// =============================================================================

struct ZeroFontSpacer;

impl RewriteRule for ZeroFontSpacer {
    fn name(&self) -> &'static str {
        "zero-font-spacer"
    }

    fn edits(&self, doc: &Document<'_>) -> Edits {
        let mut edits = Edits::new();
        for (_, td) in doc.start_tags("td") {
            let decls = style_of(td);
            let zero_font = css::find(&decls, "font-size").is_some_and(|d| css::is_zero_length(&d.value));
            if !zero_font {
                continue;
            }
            match css::find(&decls, "line-height") {
                Some(lh) if css::is_zero_length(&lh.value) => {}
                Some(lh) => {
                    let Some(span) = td.attr("style").and_then(|a| a.value_span.clone()) else {
                        continue;
                    };
                    let value = if css::split_important(&lh.value).1 { "0 !important" } else { "0" };
                    edits.replace(
                        span.start + lh.value_span.start..span.start + lh.value_span.end,
                        value,
                    );
                }
                None => {
                    let style = td.attr_value("style").unwrap_or_default();
                    replace_style(&mut edits, td, css::append_declaration(style, "line-height", "0"));
                }
            }
        }
        edits
    }
}

// =============================================================================
// 5. Web font fallback
// =============================================================================

struct FontFallback {
    web_fonts: Vec<String>,
    fallback: String,
}

impl FontFallback {
    /// The fallback list, keeping `!important` from the replaced value.
    fn replacement(&self, value: &str) -> String {
        if css::split_important(value).1 {
            format!("{} !important", self.fallback)
        } else {
            self.fallback.clone()
        }
    }
}

impl RewriteRule for FontFallback {
    fn name(&self) -> &'static str {
        "font-fallback"
    }

    fn edits(&self, doc: &Document<'_>) -> Edits {
        let mut edits = Edits::new();

        for tag in doc.all_start_tags() {
            let Some(style) = tag.attr("style") else {
                continue;
            };
            let (Some(value), Some(value_span)) = (&style.value, &style.value_span) else {
                continue;
            };
            for decl in css::parse_declarations(value) {
                if decl.property == "font-family" && css::names_font(&decl.value, &self.web_fonts) {
                    let start = value_span.start + decl.value_span.start;
                    let end = value_span.start + decl.value_span.end;
                    edits.replace(start..end, self.replacement(&decl.value));
                }
            }
        }

        for span in doc.raw_texts("style") {
            let text = doc.text(&span);
            let mut changed = false;
            let replaced = FONT_FAMILY_RE.replace_all(text, |caps: &Captures| {
                let family = caps[1].trim_end();
                if css::names_font(family, &self.web_fonts) {
                    changed = true;
                    format!("font-family: {}", self.replacement(family))
                } else {
                    caps[0].to_string()
                }
            });
            if changed {
                edits.replace(span, replaced.into_owned());
            }
        }
        edits
    }
}

// =============================================================================
// 6. VML background emulation
// =============================================================================

struct VmlBackground {
    default_width: String,
}

impl VmlBackground {
    fn background(tag: &StartTag) -> Option<String> {
        let decls = style_of(tag);
        css::find(&decls, "background-color")
            .map(|d| d.value.trim_end_matches("!important").trim().to_string())
            .filter(|c| !c.is_empty())
    }

    fn width(&self, tag: &StartTag) -> String {
        let decls = style_of(tag);
        tag.attr_value("width")
            .and_then(css::pixel_length)
            .or_else(|| css::find(&decls, "width").and_then(|d| css::pixel_length(&d.value)))
            .map(|px| format!("{px}px"))
            .unwrap_or_else(|| self.default_width.clone())
    }

    /// Whether the table directly follows this rule's own opening block.
    /// Closing VML comments (ours or the compiler's) do not count.
    fn already_wrapped(doc: &Document<'_>, index: usize) -> bool {
        match doc.adjacent_before(index) {
            Some(Token::Comment { span }) => {
                let text = doc.text(span);
                VML_OPEN_MARKERS.iter().all(|m| text.contains(m)) && !text.contains(VML_CLOSE_MARKER)
            }
            _ => false,
        }
    }
}

impl RewriteRule for VmlBackground {
    fn name(&self) -> &'static str {
        "vml-background"
    }

    fn edits(&self, doc: &Document<'_>) -> Edits {
        let mut edits = Edits::new();
        for (index, table) in doc.start_tags("table") {
            let Some(color) = Self::background(table) else {
                continue;
            };
            if Self::already_wrapped(doc, index) {
                continue;
            }
            let Some(end) = doc.matching_end(index) else {
                log::debug!("table at byte {} has no closing tag, not wrapping", table.span.start);
                continue;
            };
            edits.insert(
                table.span.start,
                format!(
                    "<!--[if gte mso 9]>\n\
                     <v:rect xmlns:v=\"urn:schemas-microsoft-com:vml\" fill=\"true\" stroke=\"false\" style=\"width:{};\">\n\
                     <v:fill type=\"tile\" color=\"{color}\" />\n\
                     <v:textbox inset=\"0,0,0,0\">\n\
                     <![endif]-->\n",
                    self.width(table)
                ),
            );
            edits.insert(
                end.end,
                "\n<!--[if gte mso 9]>\n</v:textbox>\n</v:rect>\n<![endif]-->",
            );
        }
        edits
    }
}

// =============================================================================
// 7. Emoji entities
// =============================================================================

struct EmojiEntities;

impl RewriteRule for EmojiEntities {
    fn name(&self) -> &'static str {
        "emoji-entities"
    }

    fn edits(&self, doc: &Document<'_>) -> Edits {
        let mut edits = Edits::new();
        for (emoji, entity) in EMOJI_ENTITIES {
            for (at, _) in doc.source.match_indices(emoji) {
                edits.replace(at..at + emoji.len(), *entity);
            }
        }
        edits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::rewrite::tests::COMPILED;
    use crate::rewrite::{ClientProfile, rewrite};

    fn outlook(html: &str) -> String {
        rewrite(html, &ClientProfile::outlook(&ProjectConfig::default())).html
    }

    fn only(rule: &dyn RewriteRule, html: &str) -> String {
        rule.edits(&Document::parse(html)).apply(html)
    }

    fn default_rule(name: &str) -> Box<dyn RewriteRule> {
        rules(&OutlookConfig::default())
            .into_iter()
            .find(|r| r.name() == name)
            .unwrap()
    }

    // =========================================================================
    // Cell classes
    // =========================================================================

    #[test]
    fn article_inner_class_is_appended() {
        let rule = default_rule("cell-classes");
        assert_eq!(
            only(rule.as_ref(), r#"<td style="background-color:#E4E7DB;">"#),
            r#"<td style="background-color:#E4E7DB;" class="article-inner">"#
        );
    }

    #[test]
    fn cell_signature_ignores_spacing_case_and_order() {
        let rule = default_rule("cell-classes");
        let html = r#"<td align="left" style="padding:0; background-color : #e4e7db">"#;
        assert!(only(rule.as_ref(), html).contains(r#"class="article-inner""#));
    }

    #[test]
    fn existing_class_is_kept() {
        let rule = default_rule("cell-classes");
        assert_eq!(
            only(rule.as_ref(), r#"<td class="hero" style="background-color:#E4E7DB;">"#),
            r#"<td class="hero article-inner" style="background-color:#E4E7DB;">"#
        );
    }

    #[test]
    fn class_is_not_duplicated() {
        let rule = default_rule("cell-classes");
        let html = r#"<td class="article-inner" style="background-color:#E4E7DB;">"#;
        assert!(rule.edits(&Document::parse(html)).is_empty());
    }

    #[test]
    fn wildcard_signature_needs_every_property() {
        let rule = default_rule("cell-classes");
        let framed = r#"<td style="border:1px solid #000;padding:24px;">"#;
        assert!(only(rule.as_ref(), framed).contains("article-frame"));
        let unframed = r#"<td style="padding:24px;">"#;
        assert_eq!(only(rule.as_ref(), unframed), unframed);
    }

    #[test]
    fn other_colors_and_elements_untouched() {
        let rule = default_rule("cell-classes");
        let html = r#"<td style="background-color:#FFFFFF;"><div style="background-color:#E4E7DB;">"#;
        assert_eq!(only(rule.as_ref(), html), html);
    }

    #[test]
    fn cells_inside_conditional_comments_untouched() {
        let rule = default_rule("cell-classes");
        let html = r#"<!--[if mso]><td style="background-color:#E4E7DB;"><![endif]-->"#;
        assert_eq!(only(rule.as_ref(), html), html);
    }

    // =========================================================================
    // Head injection
    // =========================================================================

    #[test]
    fn office_settings_follow_head() {
        let out = outlook("<html><head><title>x</title></head><body></body></html>");
        let head = out.find("<head>").unwrap();
        let settings = out.find(OFFICE_SETTINGS_MARKER).unwrap();
        let title = out.find("<title>").unwrap();
        assert!(head < settings && settings < title);
        assert_eq!(out.matches(OFFICE_SETTINGS_MARKER).count(), 2);
    }

    #[test]
    fn charset_meta_added_only_when_missing() {
        let out = outlook("<html><head></head></html>");
        assert!(out.contains(r#"<meta charset="utf-8">"#));

        let out = outlook(COMPILED);
        assert!(!out.contains(r#"<meta charset="utf-8">"#));
    }

    #[test]
    fn head_attributes_are_tolerated() {
        let out = outlook(r#"<html><head lang="en"><meta charset="utf-8"></head></html>"#);
        assert!(out.starts_with(r#"<html><head lang="en">"#));
        assert!(out.contains(OFFICE_SETTINGS_MARKER));
    }

    #[test]
    fn missing_head_skips_head_rules() {
        let profile = ClientProfile::outlook(&ProjectConfig::default());
        let out = rewrite("<body><p>hi</p></body>", &profile);
        assert!(out.skipped.contains(&"office-settings"));
        assert!(out.skipped.contains(&"outlook-styles"));
    }

    // =========================================================================
    // Style block
    // =========================================================================

    #[test]
    fn style_block_closes_head() {
        let out = outlook(COMPILED);
        let block = out.find(r#"id="outlook-fixes""#).unwrap();
        let head_end = out.find("</head>").unwrap();
        assert!(block < head_end);
        assert!(out.contains(".mj-column-per-60 table[role=\"presentation\"]"));
        assert_eq!(out.matches("id=\"outlook-fixes\"").count(), 1);
    }

    #[test]
    fn style_block_without_column_classes() {
        let mut config = OutlookConfig::default();
        config.column_classes.clear();
        let rule = OutlookStyles {
            column_classes: config.column_classes,
        };
        let out = only(&rule, "<head></head>");
        assert!(out.contains("outlook-group-fix"));
        assert!(!out.contains("height: 100%"));
    }

    // =========================================================================
    // Zero-font spacer
    // =========================================================================

    #[test]
    fn zero_font_cell_gets_line_height() {
        let rule = ZeroFontSpacer;
        assert_eq!(
            only(&rule, r#"<td style="direction:ltr;font-size:0px;padding:20px 0;">"#),
            r#"<td style="direction:ltr;font-size:0px;padding:20px 0;line-height:0;">"#
        );
        let sized = r#"<td style="font-size:13px;">"#;
        assert_eq!(only(&rule, sized), sized);
        let done = r#"<td style="font-size:0;line-height:0;">"#;
        assert_eq!(only(&rule, done), done);
    }

    #[test]
    fn zero_font_cell_line_height_is_forced() {
        let rule = ZeroFontSpacer;
        assert_eq!(
            only(&rule, r#"<td style="font-size:0px;line-height:20px;">"#),
            r#"<td style="font-size:0px;line-height:0;">"#
        );
        assert_eq!(
            only(&rule, r#"<td style="font-size:0;line-height: 1.5 !important">"#),
            r#"<td style="font-size:0;line-height: 0 !important">"#
        );
        let forced = only(&rule, r#"<td style="font-size:0px;line-height:20px;">"#);
        assert!(rule.edits(&Document::parse(&forced)).is_empty());
    }

    // =========================================================================
    // Fonts
    // =========================================================================

    #[test]
    fn inline_web_font_replaced() {
        let out = outlook(COMPILED);
        assert!(!out.contains("Montserrat"));
        assert!(out.contains("font-family:Arial, sans-serif;font-size:16px;"));
    }

    #[test]
    fn style_block_web_font_replaced() {
        let rule = default_rule("font-fallback");
        let html = "<style>.a { font-family: 'Montserrat', sans-serif; color: red; }\n.b { font-family: Georgia; }</style>";
        let out = only(rule.as_ref(), html);
        assert_eq!(
            out,
            "<style>.a { font-family: Arial, sans-serif; color: red; }\n.b { font-family: Georgia; }</style>"
        );
    }

    #[test]
    fn important_web_font_replaced_and_kept_important() {
        let rule = default_rule("font-fallback");
        let html = "<style>.a { font-family: Montserrat !important; }</style><p style=\"font-family:Montserrat, sans-serif !important;color:red\">";
        assert_eq!(
            only(rule.as_ref(), html),
            "<style>.a { font-family: Arial, sans-serif !important; }</style><p style=\"font-family:Arial, sans-serif !important;color:red\">"
        );
    }

    #[test]
    fn configured_fonts_and_fallback() {
        let config = OutlookConfig {
            web_fonts: vec!["Lato".to_string()],
            fallback_fonts: "Georgia, serif".to_string(),
            ..OutlookConfig::default()
        };
        let rule = FontFallback {
            web_fonts: config.web_fonts,
            fallback: config.fallback_fonts,
        };
        let out = only(&rule, r#"<p style="font-family:Lato;color:red">"#);
        assert_eq!(out, r#"<p style="font-family:Georgia, serif;color:red">"#);
    }

    // =========================================================================
    // VML
    // =========================================================================

    #[test]
    fn colored_table_is_wrapped_whole() {
        let rule = default_rule("vml-background");
        let html = r#"<table style="background-color:#ffffff;width:100%;"><tr><td>x</td></tr></table><p>after</p>"#;
        let out = only(rule.as_ref(), html);
        let open = out.find("<v:rect").unwrap();
        let table = out.find("<table").unwrap();
        let table_end = out.find("</table>").unwrap();
        let close = out.find("</v:rect>").unwrap();
        assert!(open < table && table < table_end && table_end < close);
        assert!(out.contains(r##"<v:fill type="tile" color="#ffffff" />"##));
        assert!(out.contains("style=\"width:600px;\""));
        assert!(out.ends_with("<p>after</p>"));
    }

    #[test]
    fn table_after_closing_vml_comment_is_wrapped() {
        let html = "<!--[if mso | IE]></v:textbox></v:rect></td></tr></table><![endif]--><table style=\"background-color:#E4E7DB;width:100%;\"><tr><td>x</td></tr></table>";
        let out = outlook(html);
        assert!(out.contains(r##"<v:fill type="tile" color="#E4E7DB" />"##));
        assert_eq!(outlook(&out), out);
    }

    #[test]
    fn sibling_colored_tables_are_each_wrapped() {
        let rule = default_rule("vml-background");
        let html = r#"<table style="background-color:#111"></table><table style="background-color:#222"></table>"#;
        let once = only(rule.as_ref(), html);
        assert_eq!(once.matches("<v:rect").count(), 2);
        assert!(rule.edits(&Document::parse(&once)).is_empty());
    }

    #[test]
    fn vml_width_from_table() {
        let rule = default_rule("vml-background");
        let html = r#"<table width="480" style="background-color:#000"></table>"#;
        assert!(only(rule.as_ref(), html).contains("style=\"width:480px;\""));
    }

    #[test]
    fn nested_colored_tables_close_in_order() {
        let rule = default_rule("vml-background");
        let html = r#"<table style="background-color:#111"><tr><td><table style="background-color:#222"><tr><td></td></tr></table></td></tr></table>"#;
        let out = only(rule.as_ref(), html);
        assert_eq!(out.matches("<v:rect").count(), 2);
        let inner_close = out.find("</v:rect>").unwrap();
        let outer_table_end = out.rfind("</table>").unwrap();
        assert!(inner_close < outer_table_end);
        assert!(out.trim_end().ends_with("<![endif]-->"));
    }

    #[test]
    fn tables_without_background_untouched() {
        let rule = default_rule("vml-background");
        let html = r#"<table role="presentation" width="100%"></table>"#;
        assert_eq!(only(rule.as_ref(), html), html);
    }

    #[test]
    fn vml_wrap_is_idempotent() {
        let rule = default_rule("vml-background");
        let html = r#"<table style="background-color:#fff"></table>"#;
        let once = only(rule.as_ref(), html);
        assert!(rule.edits(&Document::parse(&once)).is_empty());
    }

    // =========================================================================
    // Emoji
    // =========================================================================

    #[test]
    fn emoji_become_entities() {
        let out = outlook("<p>👾 👉 📧 🎮 😀</p>");
        assert_eq!(out, "<p>&#x1F47E; &#x1F449; &#x1F4E7; &#x1F3AE; 😀</p>");
    }

    // =========================================================================
    // Whole profile
    // =========================================================================

    #[test]
    fn conditional_comment_tables_are_not_wrapped() {
        let out = outlook(COMPILED);
        // One colored section table; the mso-only table lives in a comment.
        assert_eq!(out.matches("<v:rect").count(), 1);
    }

    #[test]
    fn rules_run_in_documented_order() {
        let names = ClientProfile::outlook(&ProjectConfig::default()).rule_names();
        assert_eq!(
            names,
            vec![
                "cell-classes",
                "office-settings",
                "outlook-styles",
                "zero-font-spacer",
                "font-fallback",
                "vml-background",
                "emoji-entities",
            ]
        );
    }
}
