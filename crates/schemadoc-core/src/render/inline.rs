//! Inline markup normalization.
//!
//! Description strings carry a closed set of pseudo-HTML tags, escape
//! sequences and `$(...)` mentions. They are rewritten into RST tokens by
//! an ordered table of literal replacements plus a few regex passes.
//! Reference and permission mentions feed the page accumulators while
//! being rewritten.

use std::collections::BTreeMap;

use regex::{Captures, Regex};

use crate::diagnostics::Diagnostics;
use crate::resolve::{RefResolver, RenderContext, REF_MENTION_PATTERN};

/// Ordered literal substring replacements. Applied after tag repair,
/// before the regex passes.
const LITERAL_REPLACEMENTS: [(&str, &str); 21] = [
    ("<em>", "*"),
    ("</em>", "*"),
    ("<b>", "**"),
    ("</b>", "**"),
    ("<code>", "``"),
    ("</code>", "``"),
    ("<var>", "``"),
    ("</var>", "``"),
    ("<value>", "``"),
    ("</value>", "``"),
    ("<p>", "\n\n"),
    ("</p>", "\n\n"),
    ("<ul>", "\n\n"),
    ("</ul>", "\n\n"),
    ("<ol>", "\n\n"),
    ("</ol>", "\n\n"),
    ("<li>", "\n- "),
    ("</li>", ""),
    ("<br>", "\n\n"),
    ("\\n", "\n"),
    ("\\\"", "\""),
];

/// Tags repaired when opened twice without an intervening close.
const REPAIRABLE_TAGS: [(&str, &str); 6] = [
    ("<em>", "</em>"),
    ("<b>", "</b>"),
    ("<code>", "</code>"),
    ("<var>", "</var>"),
    ("<value>", "</value>"),
    ("<permission>", "</permission>"),
];

/// Rewrites inline markup in description strings.
pub struct InlineFormatter {
    ref_mention: Regex,
    doc_mention: Regex,
    permission_mention: Regex,
    anchor_tag: Regex,
    bare_url: Regex,
    definition_list: Regex,
    definition_item: Regex,
}

impl Default for InlineFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl InlineFormatter {
    /// Build the formatter; all patterns are fixed.
    pub fn new() -> Self {
        Self {
            ref_mention: Regex::new(REF_MENTION_PATTERN).expect("valid ref pattern"),
            doc_mention: Regex::new(r"\$\(doc:([^)]+)\)").expect("valid doc pattern"),
            permission_mention: Regex::new(r"<permission>([^<]*)</permission>")
                .expect("valid permission pattern"),
            anchor_tag: Regex::new(r#"<a href=["']([^"']+)["']>([^<]*)</a>"#)
                .expect("valid anchor pattern"),
            bare_url: Regex::new(r"(^|\s)(https?://[^\s<>`]+)").expect("valid url pattern"),
            definition_list: Regex::new(r"(?s)<dl>(.*?)</dl>").expect("valid dl pattern"),
            definition_item: Regex::new(r"(?s)<dt>([^<]*)</dt>\s*<dd>(.*?)</dd>")
                .expect("valid dt/dd pattern"),
        }
    }

    /// Normalize one description string.
    pub fn format(
        &self,
        text: &str,
        resolver: &RefResolver<'_>,
        ctx: &mut RenderContext,
        diag: &mut Diagnostics,
    ) -> String {
        let mut out = text.to_string();

        for (open, close) in REPAIRABLE_TAGS {
            out = repair_double_open(&out, open, close);
        }

        // Permission mentions feed the tracker while being rewritten.
        out = self
            .permission_mention
            .replace_all(&out, |caps: &Captures<'_>| {
                let permission = caps[1].trim().to_string();
                let markup = format!("``{permission}``");
                if !permission.is_empty() {
                    ctx.permissions.insert(permission);
                }
                markup
            })
            .into_owned();

        for (from, to) in LITERAL_REPLACEMENTS {
            out = out.replace(from, to);
        }

        out = self
            .ref_mention
            .replace_all(&out, |caps: &Captures<'_>| {
                resolver.resolve(caps[1].trim(), ctx, diag).markup()
            })
            .into_owned();

        out = self
            .doc_mention
            .replace_all(&out, |caps: &Captures<'_>| format!(":doc:`/{}`", caps[1].trim()))
            .into_owned();

        out = self
            .anchor_tag
            .replace_all(&out, |caps: &Captures<'_>| {
                format!("`{} <{}>`__", caps[2].trim(), &caps[1])
            })
            .into_owned();

        out = self
            .bare_url
            .replace_all(&out, |caps: &Captures<'_>| {
                let url = caps[2].trim_end_matches(['.', ',', ';', ')']);
                let trailing = &caps[2][url.len()..];
                format!("{}`{url} <{url}>`__{trailing}", &caps[1])
            })
            .into_owned();

        out
    }

    /// Harvest a `<dl><dt>value</dt><dd>text</dd>...</dl>` pattern from a
    /// description, returning the description with the list removed plus
    /// the per-value texts.
    pub fn harvest_definition_list(&self, text: &str) -> (String, BTreeMap<String, String>) {
        let mut values = BTreeMap::new();
        for list in self.definition_list.captures_iter(text) {
            for item in self.definition_item.captures_iter(&list[1]) {
                values.insert(item[1].trim().to_string(), item[2].trim().to_string());
            }
        }
        let cleaned = self.definition_list.replace_all(text, "").trim().to_string();
        (cleaned, values)
    }
}

/// Rewrite the second of two consecutive opening tags into a close, fixing
/// the `"<code>foo<code>"` malformed-input pattern.
fn repair_double_open(text: &str, open: &str, close: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut opened = false;

    loop {
        let next_open = rest.find(open);
        let next_close = rest.find(close);

        let (position, is_open) = match (next_open, next_close) {
            (Some(o), Some(c)) if o < c => (o, true),
            (_, Some(c)) => (c, false),
            (Some(o), None) => (o, true),
            (None, None) => break,
        };

        out.push_str(&rest[..position]);
        if is_open {
            if opened {
                out.push_str(close);
                opened = false;
            } else {
                out.push_str(open);
                opened = true;
            }
            rest = &rest[position + open.len()..];
        } else {
            out.push_str(close);
            opened = false;
            rest = &rest[position + close.len()..];
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBundle;

    fn with_formatter<R>(f: impl FnOnce(&InlineFormatter, &RefResolver<'_>) -> R) -> R {
        let bundle = SchemaBundle::default();
        let resolver = RefResolver::new(&bundle, "mail");
        f(&InlineFormatter::new(), &resolver)
    }

    #[test]
    fn test_literal_replacements() {
        with_formatter(|fmt, resolver| {
            let mut ctx = RenderContext::default();
            let mut diag = Diagnostics::default();
            let out = fmt.format(
                "Use <em>this</em> and <value>that</value>.",
                resolver,
                &mut ctx,
                &mut diag,
            );
            assert_eq!(out, "Use *this* and ``that``.");
        });
    }

    #[test]
    fn test_double_open_tag_is_repaired() {
        with_formatter(|fmt, resolver| {
            let mut ctx = RenderContext::default();
            let mut diag = Diagnostics::default();
            let out = fmt.format("Use <code>foo<code> now.", resolver, &mut ctx, &mut diag);
            assert_eq!(out, "Use ``foo`` now.");
        });
    }

    #[test]
    fn test_permission_mentions_are_tracked() {
        with_formatter(|fmt, resolver| {
            let mut ctx = RenderContext::default();
            let mut diag = Diagnostics::default();
            let out = fmt.format(
                "Requires the <permission>accountsRead</permission> permission.",
                resolver,
                &mut ctx,
                &mut diag,
            );
            assert_eq!(out, "Requires the ``accountsRead`` permission.");
            assert!(ctx.permissions.contains("accountsRead"));
        });
    }

    #[test]
    fn test_ref_mentions_resolve() {
        with_formatter(|fmt, resolver| {
            let mut ctx = RenderContext::default();
            let mut diag = Diagnostics::default();
            let out = fmt.format("See $(ref:mail.Folder).", resolver, &mut ctx, &mut diag);
            assert_eq!(out, "See :ref:`Folder <mail.Folder>`.");
        });
    }

    #[test]
    fn test_doc_and_anchor_links() {
        with_formatter(|fmt, resolver| {
            let mut ctx = RenderContext::default();
            let mut diag = Diagnostics::default();
            let out = fmt.format(
                r#"See $(doc:how-to/theme) and <a href="https://example.org">the guide</a>."#,
                resolver,
                &mut ctx,
                &mut diag,
            );
            assert_eq!(
                out,
                "See :doc:`/how-to/theme` and `the guide <https://example.org>`__."
            );
        });
    }

    #[test]
    fn test_bare_url() {
        with_formatter(|fmt, resolver| {
            let mut ctx = RenderContext::default();
            let mut diag = Diagnostics::default();
            let out = fmt.format(
                "Documented at https://example.org/page.",
                resolver,
                &mut ctx,
                &mut diag,
            );
            assert_eq!(
                out,
                "Documented at `https://example.org/page <https://example.org/page>`__."
            );
        });
    }

    #[test]
    fn test_harvest_definition_list() {
        let fmt = InlineFormatter::new();
        let (cleaned, values) = fmt.harvest_definition_list(
            "The format. <dl><dt>png</dt><dd>Lossless.</dd><dt>jpeg</dt><dd>Lossy.</dd></dl>",
        );
        assert_eq!(cleaned, "The format.");
        assert_eq!(values["png"], "Lossless.");
        assert_eq!(values["jpeg"], "Lossy.");
    }
}
