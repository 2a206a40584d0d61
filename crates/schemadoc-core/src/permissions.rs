//! Permission descriptions.
//!
//! Permissions collected while rendering a page are cross-referenced
//! against a locale string table, then a small builtin table, then a
//! generic self-referential fallback for permissions that name a known
//! namespace. Anything still undescribed is an advisory diagnostic.

use std::collections::BTreeMap;

/// Line prefix of permission description strings in the locale resource.
const LOCALE_LINE_PREFIX: &str = "webext-perms-description-";

/// Descriptions for permissions the locale resource never carries.
const BUILTIN_DESCRIPTIONS: [(&str, &str); 4] = [
    (
        "activeTab",
        "Grants temporary access to the currently active tab.",
    ),
    (
        "menus.overrideContext",
        "Replace the default context menu.",
    ),
    (
        "theme",
        "Apply and manage custom themes.",
    ),
    (
        "unlimitedStorage",
        "Store an unlimited amount of client-side data.",
    ),
];

/// Resolved permission description table.
#[derive(Debug, Default)]
pub struct PermissionTable {
    locale: BTreeMap<String, String>,
}

impl PermissionTable {
    /// Build a table from a locale resource file's contents.
    ///
    /// Matching lines look like
    /// `webext-perms-description-accountsRead2 = Read your accounts`;
    /// the key slug is the line prefix stripped, hyphens turned into dots
    /// and digits removed, so versioned locale ids collapse onto the
    /// permission they describe.
    pub fn from_locale(text: &str) -> Self {
        let mut locale = BTreeMap::new();
        for line in text.lines() {
            let Some(rest) = line.trim_start().strip_prefix(LOCALE_LINE_PREFIX) else {
                continue;
            };
            let Some((raw_key, value)) = rest.split_once('=') else {
                continue;
            };
            let key: String = raw_key
                .trim()
                .chars()
                .filter(|c| !c.is_ascii_digit())
                .map(|c| if c == '-' { '.' } else { c })
                .collect();
            let value = value.trim();
            if !key.is_empty() && !value.is_empty() {
                locale.insert(key, value.to_string());
            }
        }
        Self { locale }
    }

    /// Describe a permission. `known_namespaces` drives the generic
    /// fallback for API permissions named after a namespace.
    pub fn describe(&self, permission: &str, known_namespaces: &[&str]) -> Option<String> {
        if let Some(description) = self.locale.get(permission) {
            return Some(description.clone());
        }

        if let Some((_, description)) = BUILTIN_DESCRIPTIONS
            .iter()
            .find(|(name, _)| *name == permission)
        {
            return Some((*description).to_string());
        }

        if known_namespaces.contains(&permission) {
            return Some(format!("Grants access to the {permission} API."));
        }

        None
    }

    /// Number of locale-sourced entries.
    pub fn locale_len(&self) -> usize {
        self.locale.len()
    }
}
