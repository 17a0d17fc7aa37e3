//! gettext-style i18n built-ins (§4.9, §6): `dcgettext`, `dcngettext`,
//! `bindtextdomain`.
//!
//! Translation-catalog file loading (locating and parsing `.mo` files)
//! is explicitly an external collaborator per §1/§6 — this module only
//! specifies the *interface* the core calls through. The default
//! [`NullTranslator`] is a pass-through (returns `msgid`/`msgid_plural`
//! unchanged) so the core is fully usable without a catalog loader
//! wired in.

use std::collections::HashMap;

/// Looks up a translated string for a `(domain, msgid[, category])`
/// key. An embedder supplies a real implementation backed by `.mo`
/// catalogs; the core only calls through this trait.
pub trait Translator {
    fn gettext(&self, domain: &str, msgid: &str, category: &str) -> String;
    fn ngettext(&self, domain: &str, msgid: &str, msgid_plural: &str, n: i64, category: &str) -> String;
}

/// The default translator: returns the message unchanged, choosing
/// between singular/plural the same way a C locale catalog would (`n
/// == 1` singular, else plural).
pub struct NullTranslator;

impl Translator for NullTranslator {
    fn gettext(&self, _domain: &str, msgid: &str, _category: &str) -> String {
        msgid.to_string()
    }

    fn ngettext(&self, _domain: &str, msgid: &str, msgid_plural: &str, n: i64, _category: &str) -> String {
        if n == 1 {
            msgid.to_string()
        } else {
            msgid_plural.to_string()
        }
    }
}

/// Tracks `bindtextdomain(domain, directory)` bindings. Catalog paths
/// are computed as `<dir>/<locale>/LC_MESSAGES/<domain>.mo` (§6); this
/// struct only owns the `domain -> dir` side of that, which a real
/// catalog loader consults.
#[derive(Default)]
pub struct TextDomainDirs {
    dirs: HashMap<String, String>,
}

impl TextDomainDirs {
    pub fn new() -> Self {
        Self::default()
    }

    /// `bindtextdomain(domain[, directory])`: set (or, with an empty
    /// directory, merely query) the catalog directory for `domain`.
    /// Returns the directory now bound to `domain`.
    pub fn bind(&mut self, domain: &str, directory: &str) -> String {
        if !directory.is_empty() {
            self.dirs.insert(domain.to_string(), directory.to_string());
        }
        self.dirs.get(domain).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_translator_passes_through() {
        let t = NullTranslator;
        assert_eq!(t.gettext("messages", "hello", "LC_MESSAGES"), "hello");
        assert_eq!(t.ngettext("messages", "one", "many", 1, "LC_MESSAGES"), "one");
        assert_eq!(t.ngettext("messages", "one", "many", 2, "LC_MESSAGES"), "many");
    }

    #[test]
    fn bindtextdomain_sets_and_queries() {
        let mut dirs = TextDomainDirs::new();
        assert_eq!(dirs.bind("messages", "/usr/share/locale"), "/usr/share/locale");
        assert_eq!(dirs.bind("messages", ""), "/usr/share/locale");
    }
}
