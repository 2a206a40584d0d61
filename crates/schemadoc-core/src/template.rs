//! Text filters applied to static template files.
//!
//! Template files carry two kinds of directives: conditional blocks
//! (`{{CONDITION: key=value OR key=value}}...{{/CONDITION}}`) kept or
//! dropped against a flat configuration, and placeholder tokens replaced
//! by generated line lists. Both are pure text transforms.

use std::collections::BTreeMap;

use regex::Regex;

/// Flat key=value configuration driving conditional blocks.
pub type TemplateConfig = BTreeMap<String, String>;

const CONDITION_PATTERN: &str = r"(?s)\{\{CONDITION:([^}]*)\}\}(.*?)\{\{/CONDITION\}\}";

/// Apply conditional blocks: a block survives when its condition matches
/// the configuration, otherwise it is removed entirely. Clauses within
/// one tag combine with `OR` (any clause matches) or `AND` (all clauses
/// match); a tag uses one combinator, read from its clause list.
pub fn condition_filter(text: &str, config: &TemplateConfig) -> String {
    let pattern = Regex::new(CONDITION_PATTERN).expect("valid condition pattern");
    pattern
        .replace_all(text, |captures: &regex::Captures<'_>| {
            if condition_matches(&captures[1], config) {
                captures[2].to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

fn condition_matches(condition: &str, config: &TemplateConfig) -> bool {
    let all_required = condition.contains(" AND ");
    let clauses = if all_required {
        condition.split(" AND ")
    } else {
        condition.split(" OR ")
    };

    let mut matched = all_required;
    for clause in clauses {
        let holds = clause
            .trim()
            .split_once('=')
            .is_some_and(|(key, value)| {
                config.get(key.trim()).map(String::as_str) == Some(value.trim())
            });
        if all_required {
            matched = matched && holds;
        } else {
            matched = matched || holds;
        }
    }
    matched
}

/// Replace every line holding `token` with `lines`, each replacement line
/// prefixed with the leading whitespace of the line that held the token.
pub fn substitute_placeholder(text: &str, token: &str, lines: &[String]) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        if line.contains(token) {
            let indent: String = line.chars().take_while(|c| c.is_whitespace()).collect();
            for replacement in lines {
                if replacement.is_empty() {
                    out.push('\n');
                } else {
                    out.push_str(&indent);
                    out.push_str(replacement);
                    out.push('\n');
                }
            }
        } else {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: &[(&str, &str)]) -> TemplateConfig {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_condition_or_keeps_matching_block() {
        let text = "a{{CONDITION: mv=2 OR mv=3}}kept{{/CONDITION}}b";
        let out = condition_filter(text, &config(&[("mv", "3")]));
        assert_eq!(out, "akeptb");
    }

    #[test]
    fn test_condition_or_drops_non_matching_block() {
        let text = "a{{CONDITION: mv=2 OR mv=3}}kept{{/CONDITION}}b";
        let out = condition_filter(text, &config(&[("mv", "4")]));
        assert_eq!(out, "ab");
    }

    #[test]
    fn test_condition_and_requires_all_clauses() {
        let text = "{{CONDITION: mv=3 AND channel=beta}}x{{/CONDITION}}";
        assert_eq!(
            condition_filter(text, &config(&[("mv", "3"), ("channel", "beta")])),
            "x"
        );
        assert_eq!(
            condition_filter(text, &config(&[("mv", "3"), ("channel", "release")])),
            ""
        );
    }

    #[test]
    fn test_condition_spans_lines() {
        let text = "keep\n{{CONDITION: mv=2}}\ndropped\n{{/CONDITION}}\ntail";
        let out = condition_filter(text, &config(&[("mv", "3")]));
        assert_eq!(out, "keep\n\ntail");
    }

    #[test]
    fn test_unknown_key_never_matches() {
        let text = "{{CONDITION: nope=1}}x{{/CONDITION}}";
        assert_eq!(condition_filter(text, &config(&[])), "");
    }

    #[test]
    fn test_placeholder_preserves_indentation() {
        let text = "toctree:\n   __PAGES__\nend\n";
        let lines = vec!["alpha".to_string(), "beta".to_string()];
        let out = substitute_placeholder(text, "__PAGES__", &lines);
        assert_eq!(out, "toctree:\n   alpha\n   beta\nend\n");
    }

    #[test]
    fn test_placeholder_empty_replacement_line_is_unindented() {
        let text = "  __X__\n";
        let lines = vec![String::new(), "a".to_string()];
        assert_eq!(substitute_placeholder(text, "__X__", &lines), "\n  a\n");
    }
}
