//! Language registry: which languages an operator may enable, and the only
//! operations that change which languages exist in a settings document.
//!
//! The registry is built from the defaults store at startup and passed by
//! reference to whoever needs it; it holds no mutable state.

use crate::defaults::ConfigStore;
use crate::model::{LanguageContent, SettingsDocument};
use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("language '{0}' already exists")]
    AlreadyExists(String),

    #[error("language '{0}' is not available")]
    Unavailable(String),

    #[error("language '{0}' does not exist")]
    NotFound(String),

    #[error("cannot remove the last language '{0}'")]
    LastLanguage(String),
}

/// Languages available for content, keyed by code.
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    available: IndexMap<String, String>,
}

impl LanguageRegistry {
    pub fn new(available: IndexMap<String, String>) -> Self {
        Self { available }
    }

    pub fn from_defaults(defaults: &ConfigStore) -> Self {
        Self::new(defaults.available_languages().clone())
    }

    /// Code -> display name, in declaration order.
    pub fn list_available(&self) -> &IndexMap<String, String> {
        &self.available
    }

    pub fn is_available(&self, code: &str) -> bool {
        self.available.contains_key(code)
    }

    /// Display name of `code`, or the code itself when unknown.
    pub fn display_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.available.get(code).map(String::as_str).unwrap_or(code)
    }

    /// Available languages not yet present in `current`.
    pub fn addable(&self, current: &SettingsDocument) -> Vec<(&str, &str)> {
        self.available
            .iter()
            .filter(|(code, _)| !current.has_language(code))
            .map(|(code, name)| (code.as_str(), name.as_str()))
            .collect()
    }

    /// Add an empty content bundle for `code`. The active language is left
    /// untouched; content is filled in by a later settings submission.
    pub fn add(
        &self,
        current: &SettingsDocument,
        code: &str,
    ) -> Result<SettingsDocument, RegistryError> {
        if current.has_language(code) {
            return Err(RegistryError::AlreadyExists(code.to_string()));
        }
        if !self.is_available(code) {
            return Err(RegistryError::Unavailable(code.to_string()));
        }

        let mut next = current.clone();
        next.content
            .insert(code.to_string(), LanguageContent::default());
        debug!("Added language {} ({} total)", code, next.content.len());
        Ok(next)
    }

    /// Remove `code`. At least one language always remains; if the active
    /// language is removed the first remaining one becomes active.
    pub fn remove(
        &self,
        current: &SettingsDocument,
        code: &str,
    ) -> Result<SettingsDocument, RegistryError> {
        if !current.has_language(code) {
            return Err(RegistryError::NotFound(code.to_string()));
        }
        if current.content.len() <= 1 {
            return Err(RegistryError::LastLanguage(code.to_string()));
        }

        let mut next = current.clone();
        next.content.shift_remove(code);
        next.repair_active_language();
        debug!(
            "Removed language {} (active language now {})",
            code, next.config.language
        );
        Ok(next)
    }
}

/// Language for the current request: `requested` when the document has
/// content for it, otherwise the active language.
pub fn select_language(requested: Option<&str>, settings: &SettingsDocument) -> String {
    match requested.map(str::trim) {
        Some(code) if settings.has_language(code) => code.to_string(),
        _ => settings.config.language.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn registry() -> LanguageRegistry {
        LanguageRegistry::from_defaults(&ConfigStore::embedded().unwrap())
    }

    fn default_document() -> SettingsDocument {
        ConfigStore::embedded().unwrap().options_default()
    }

    // ==================== add Tests ====================

    #[test]
    fn test_add_inserts_empty_bundle() {
        let doc = registry().add(&default_document(), "sv").expect("should add");
        assert_eq!(doc.content.len(), 2);
        assert_eq!(doc.content["sv"], LanguageContent::default());
        assert_eq!(doc.config.language, "en");
        assert_eq!(doc.content.keys().last().unwrap(), "sv");
    }

    #[test]
    fn test_add_existing_fails() {
        let result = registry().add(&default_document(), "en");
        assert_eq!(result, Err(RegistryError::AlreadyExists("en".into())));
    }

    #[test]
    fn test_add_unavailable_fails() {
        let result = registry().add(&default_document(), "xx");
        assert_eq!(result, Err(RegistryError::Unavailable("xx".into())));
    }

    // ==================== remove Tests ====================

    #[test]
    fn test_remove_last_language_fails_and_leaves_document() {
        let doc = default_document();
        let result = registry().remove(&doc, "en");
        assert_eq!(result, Err(RegistryError::LastLanguage("en".into())));
        assert_eq!(doc.content.len(), 1);
    }

    #[test]
    fn test_remove_missing_fails() {
        let result = registry().remove(&default_document(), "de");
        assert_eq!(result, Err(RegistryError::NotFound("de".into())));
    }

    #[test]
    fn test_remove_active_language_repairs_config() {
        let reg = registry();
        let doc = reg.add(&default_document(), "de").unwrap();
        let doc = reg.add(&doc, "fr").unwrap();

        let doc = reg.remove(&doc, "en").unwrap();
        assert_eq!(doc.config.language, "de");
        assert!(doc.has_language(&doc.config.language));
    }

    #[test]
    fn test_remove_inactive_language_keeps_order() {
        let reg = registry();
        let mut doc = reg.add(&default_document(), "de").unwrap();
        doc = reg.add(&doc, "fr").unwrap();
        doc = reg.add(&doc, "it").unwrap();

        let doc = reg.remove(&doc, "fr").unwrap();
        let keys: Vec<_> = doc.content.keys().cloned().collect();
        assert_eq!(keys, vec!["en", "de", "it"]);
        assert_eq!(doc.config.language, "en");
    }

    // ==================== listing Tests ====================

    #[test]
    fn test_display_name_falls_back_to_code() {
        let reg = registry();
        assert_eq!(reg.display_name("de"), "Deutsch");
        assert_eq!(reg.display_name("zz"), "zz");
    }

    #[test]
    fn test_addable_excludes_existing() {
        let reg = registry();
        let addable = reg.addable(&default_document());
        assert_eq!(addable.len(), 9);
        assert!(addable.iter().all(|(code, _)| *code != "en"));
    }

    #[test]
    fn test_addable_empty_when_all_added() {
        let reg = registry();
        let mut doc = default_document();
        for code in reg.list_available().keys() {
            if let Ok(next) = reg.add(&doc, code) {
                doc = next;
            }
        }
        assert!(reg.addable(&doc).is_empty());
    }

    // ==================== select_language Tests ====================

    #[test]
    fn test_select_language() {
        let doc = registry().add(&default_document(), "sv").unwrap();
        assert_eq!(select_language(Some("sv"), &doc), "sv");
        assert_eq!(select_language(Some("de"), &doc), "en");
        assert_eq!(select_language(None, &doc), "en");
    }

    // ==================== Property Tests ====================

    #[derive(Debug, Clone)]
    enum Op {
        Add(usize),
        Remove(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..12).prop_map(Op::Add),
            (0usize..12).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn prop_content_never_empty_and_active_language_valid(
            ops in proptest::collection::vec(op_strategy(), 0..40)
        ) {
            let reg = registry();
            let codes: Vec<String> = reg
                .list_available()
                .keys()
                .cloned()
                .chain(["xx".to_string(), "yy".to_string()])
                .collect();
            let mut doc = default_document();

            for op in ops {
                let result = match op {
                    Op::Add(i) => reg.add(&doc, &codes[i]),
                    Op::Remove(i) => reg.remove(&doc, &codes[i]),
                };
                match result {
                    Ok(next) => doc = next,
                    Err(RegistryError::LastLanguage(_)) => {
                        prop_assert_eq!(doc.content.len(), 1);
                    }
                    Err(_) => {}
                }
                prop_assert!(!doc.content.is_empty());
                prop_assert!(doc.has_language(&doc.config.language));
            }
        }
    }
}
