//! Client-specific HTML rewriting.
//!
//! A [`ClientProfile`] is an ordered list of [`RewriteRule`]s plus the
//! container formats the client needs. [`rewrite`] runs the rules over a
//! copy of the compiled HTML; the input is never mutated.
//!
//! Rules are additive and conditional. Each one inspects the tokenized
//! document and proposes a set of splices; an empty set means the rule's
//! precondition did not hold and the rule is skipped. Every rule checks for
//! its own earlier output, so rewriting already rewritten HTML is a no-op:
//!
//! ```text
//! rewrite(rewrite(html)) == rewrite(html)
//! ```
//!
//! Adding a client means adding a rule list and a profile constructor.

pub mod css;
pub mod html;
pub mod markup;
pub mod outlook;

use crate::config::ProjectConfig;
use crate::package::ContainerFormat;
use markup::{Document, Edits};
use std::fmt;

/// Target mail client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Client {
    /// Any standards-leaning client: webmail, Apple Mail, Thunderbird.
    Html,
    Outlook,
}

impl Client {
    pub const ALL: [Client; 2] = [Client::Html, Client::Outlook];

    /// Directory name under `exports/` and suffix of fallback HTML files.
    pub fn name(self) -> &'static str {
        match self {
            Client::Html => "html",
            Client::Outlook => "outlook",
        }
    }

    pub fn profile(self, config: &ProjectConfig) -> ClientProfile {
        match self {
            Client::Html => ClientProfile::html(config),
            Client::Outlook => ClientProfile::outlook(config),
        }
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named, pure transformation with a built-in precondition.
pub trait RewriteRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Splices this rule wants to make. Empty when there is nothing to do.
    fn edits(&self, doc: &Document<'_>) -> Edits;
}

/// Rules and container formats for one client.
pub struct ClientProfile {
    pub client: Client,
    pub rules: Vec<Box<dyn RewriteRule>>,
    pub containers: Vec<ContainerFormat>,
}

impl ClientProfile {
    pub fn outlook(config: &ProjectConfig) -> Self {
        Self {
            client: Client::Outlook,
            rules: outlook::rules(&config.outlook),
            containers: vec![
                ContainerFormat::SinglePart,
                ContainerFormat::NestedMultipart,
                ContainerFormat::Html,
            ],
        }
    }

    pub fn html(config: &ProjectConfig) -> Self {
        Self {
            client: Client::Html,
            rules: html::rules(&config.html),
            containers: vec![ContainerFormat::Html],
        }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }
}

impl fmt::Debug for ClientProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientProfile")
            .field("client", &self.client)
            .field("rules", &self.rule_names())
            .field("containers", &self.containers)
            .finish()
    }
}

/// Rewritten HTML plus which rules fired.
#[derive(Debug, Clone, PartialEq)]
pub struct Rewritten {
    pub html: String,
    pub applied: Vec<&'static str>,
    pub skipped: Vec<&'static str>,
}

/// Apply a profile's rules in order.
///
/// Skipped rules are logged at debug level: a rule that never fires on
/// real compiler output usually means the compiler's markup changed.
pub fn rewrite(html: &str, profile: &ClientProfile) -> Rewritten {
    let mut current = html.to_string();
    let mut applied = Vec::new();
    let mut skipped = Vec::new();

    for rule in &profile.rules {
        let edits = {
            let doc = Document::parse(&current);
            rule.edits(&doc)
        };
        if edits.is_empty() {
            log::debug!("[{}] rule '{}' did not match", profile.client, rule.name());
            skipped.push(rule.name());
            continue;
        }
        log::trace!(
            "[{}] rule '{}' made {} edit(s)",
            profile.client,
            rule.name(),
            edits.len()
        );
        current = edits.apply(&current);
        applied.push(rule.name());
    }

    Rewritten {
        html: current,
        applied,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Representative compiler output: head with a title, a column with
    /// the spacer cell, a colored section table and a web font.
    pub(crate) const COMPILED: &str = r#"<!doctype html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:v="urn:schemas-microsoft-com:vml" xmlns:o="urn:schemas-microsoft-com:office:office">
<head>
<title></title>
<!--[if !mso]><!--><meta http-equiv="X-UA-Compatible" content="IE=edge"><!--<![endif]-->
<meta http-equiv="Content-Type" content="text/html; charset=UTF-8">
<style type="text/css">
body { margin:0; padding:0; }
.title { font-family: Montserrat, Helvetica, sans-serif; }
</style>
</head>
<body>
<div style="background:#ffffff;background-color:#ffffff;margin:0px auto;max-width:600px;">
<table align="center" border="0" cellpadding="0" cellspacing="0" role="presentation" style="background:#ffffff;background-color:#ffffff;width:100%;">
<tbody><tr><td style="direction:ltr;font-size:0px;padding:20px 0;text-align:center;">
<!--[if mso | IE]><table role="presentation" border="0" cellpadding="0" cellspacing="0"><tr><td class="" style="vertical-align:top;width:360px;" ><![endif]-->
<div class="mj-column-per-60 mj-outlook-group-fix">
<table border="0" cellpadding="0" cellspacing="0" role="presentation" width="100%">
<tr><td style="background-color:#E4E7DB;">
<div style="font-family:Montserrat, Helvetica, sans-serif;font-size:16px;">Hello 👾 world 👉</div>
</td></tr>
</table>
</div>
<!--[if mso | IE]></td></tr></table><![endif]-->
</td></tr></tbody>
</table>
</div>
</body>
</html>
"#;

    #[test]
    fn outlook_profile_applies_every_rule_to_compiled_output() {
        let profile = ClientProfile::outlook(&ProjectConfig::default());
        let out = rewrite(COMPILED, &profile);
        assert_eq!(out.applied, profile.rule_names());
        assert!(out.skipped.is_empty());
    }

    #[test]
    fn outlook_rewrite_is_idempotent() {
        let profile = ClientProfile::outlook(&ProjectConfig::default());
        let once = rewrite(COMPILED, &profile);
        let twice = rewrite(&once.html, &profile);
        assert_eq!(twice.html, once.html);
        assert!(twice.applied.is_empty(), "re-applied: {:?}", twice.applied);
    }

    #[test]
    fn html_rewrite_is_idempotent() {
        let profile = ClientProfile::html(&ProjectConfig::default());
        let once = rewrite(COMPILED, &profile);
        let twice = rewrite(&once.html, &profile);
        assert_eq!(twice.html, once.html);
    }

    #[test]
    fn rewrite_does_not_touch_input() {
        let input = COMPILED.to_string();
        let _ = rewrite(&input, &ClientProfile::outlook(&ProjectConfig::default()));
        assert_eq!(input, COMPILED);
    }

    #[test]
    fn non_matching_rules_are_skipped() {
        let profile = ClientProfile::outlook(&ProjectConfig::default());
        let out = rewrite("plain text", &profile);
        assert_eq!(out.html, "plain text");
        assert!(out.applied.is_empty());
        assert_eq!(out.skipped.len(), profile.rules.len());
    }

    #[test]
    fn profiles_declare_containers() {
        let config = ProjectConfig::default();
        assert_eq!(ClientProfile::html(&config).containers, vec![ContainerFormat::Html]);
        assert_eq!(ClientProfile::outlook(&config).containers.len(), 3);
        assert_eq!(Client::Outlook.profile(&config).client, Client::Outlook);
    }
}
