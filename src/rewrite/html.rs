//! Generic HTML rule set.
//!
//! One rule: make sure the head carries the meta tags most clients expect,
//! and a non-empty `<title>`.

use super::RewriteRule;
use super::markup::{Document, Edits, StartTag};
use crate::config::HtmlConfig;

pub fn rules(config: &HtmlConfig) -> Vec<Box<dyn RewriteRule>> {
    vec![Box::new(HeadMeta {
        title: config.title.clone(),
    })]
}

/// A meta tag and how to recognise an existing one.
struct MetaTag {
    markup: &'static str,
    present: fn(&StartTag) -> bool,
}

fn attr_is(tag: &StartTag, name: &str, value: &str) -> bool {
    tag.attr_value(name).is_some_and(|v| v.eq_ignore_ascii_case(value))
}

const META_TAGS: &[MetaTag] = &[
    MetaTag {
        markup: r#"<meta charset="utf-8">"#,
        present: |t| {
            t.attr("charset").is_some()
                || t.attr_value("content")
                    .is_some_and(|c| c.to_ascii_lowercase().contains("charset"))
        },
    },
    MetaTag {
        markup: r#"<meta name="viewport" content="width=device-width, initial-scale=1">"#,
        present: |t| attr_is(t, "name", "viewport"),
    },
    MetaTag {
        markup: r#"<meta http-equiv="X-UA-Compatible" content="IE=edge">"#,
        present: |t| attr_is(t, "http-equiv", "X-UA-Compatible"),
    },
    MetaTag {
        markup: r#"<meta name="format-detection" content="telephone=no,address=no,email=no,date=no,url=no">"#,
        present: |t| attr_is(t, "name", "format-detection"),
    },
    MetaTag {
        markup: r#"<meta name="x-apple-disable-message-reformatting">"#,
        present: |t| attr_is(t, "name", "x-apple-disable-message-reformatting"),
    },
];

struct HeadMeta {
    title: String,
}

impl RewriteRule for HeadMeta {
    fn name(&self) -> &'static str {
        "head-meta"
    }

    fn edits(&self, doc: &Document<'_>) -> Edits {
        let mut edits = Edits::new();
        let Some(head) = doc.first_start("head") else {
            return edits;
        };

        let metas: Vec<&StartTag> = doc.start_tags("meta").map(|(_, t)| t).collect();
        for meta in META_TAGS {
            if !metas.iter().any(|t| (meta.present)(t)) {
                edits.insert(head.span.end, format!("\n{}", meta.markup));
            }
        }

        match doc.raw_texts("title").next() {
            Some(span) if doc.text(&span).trim().is_empty() => {
                edits.replace(span, self.title.clone());
            }
            Some(_) => {}
            None => edits.insert(head.span.end, format!("\n<title>{}</title>", self.title)),
        }
        edits
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ProjectConfig;
    use crate::rewrite::{ClientProfile, rewrite};

    fn html(input: &str) -> String {
        rewrite(input, &ClientProfile::html(&ProjectConfig::default())).html
    }

    #[test]
    fn bare_head_gets_everything() {
        let out = html("<html><head></head><body></body></html>");
        for needle in [
            r#"<meta charset="utf-8">"#,
            r#"name="viewport""#,
            r#"http-equiv="X-UA-Compatible""#,
            r#"name="format-detection""#,
            r#"name="x-apple-disable-message-reformatting""#,
            "<title>Newsletter</title>",
        ] {
            assert!(out.contains(needle), "missing {needle}");
        }
        assert!(out.find("<title>").unwrap() < out.find("</head>").unwrap());
    }

    #[test]
    fn existing_tags_are_not_duplicated() {
        let input = r#"<head><meta name="viewport" content="width=device-width"><title>Spring</title></head>"#;
        let out = html(input);
        assert_eq!(out.matches("name=\"viewport\"").count(), 1);
        assert_eq!(out.matches("<title>").count(), 1);
        assert!(out.contains("<title>Spring</title>"));
    }

    #[test]
    fn empty_title_is_filled() {
        let out = html("<head><title></title></head>");
        assert!(out.contains("<title>Newsletter</title>"));
    }

    #[test]
    fn configured_title() {
        let mut config = ProjectConfig::default();
        config.html.title = "Spring Sale".to_string();
        let out = rewrite("<head></head>", &ClientProfile::html(&config)).html;
        assert!(out.contains("<title>Spring Sale</title>"));
    }

    #[test]
    fn no_head_no_change() {
        let out = rewrite("<p>fragment</p>", &ClientProfile::html(&ProjectConfig::default()));
        assert_eq!(out.html, "<p>fragment</p>");
        assert_eq!(out.skipped, vec!["head-meta"]);
    }

    #[test]
    fn content_type_meta_counts_as_charset() {
        let out = html(r#"<head><meta http-equiv="Content-Type" content="text/html; charset=UTF-8"></head>"#);
        assert!(!out.contains(r#"<meta charset="utf-8">"#));
    }
}
