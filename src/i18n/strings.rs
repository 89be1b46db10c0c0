/// User-facing strings of the admin surface.
///
/// Failure messages are returned in action results; notice templates end up
/// in the one-shot admin notice. Placeholders are written as `{language}`.
#[derive(Debug, Clone)]
pub struct AdminStrings {
    // ==================== Action Failures ====================
    /// Anti-forgery token missing, expired or wrong
    pub security_check_failed: &'static str,

    /// Caller lacks the admin capability
    pub permission_denied: &'static str,

    /// Empty or missing language code
    pub language_not_provided: &'static str,

    pub language_already_exists: &'static str,

    /// Code is not in the available-languages list
    pub language_unavailable: &'static str,

    pub persistence_failed: &'static str,

    pub language_not_found: &'static str,

    pub last_language: &'static str,

    pub unexpected_error: &'static str,

    // ==================== Notices ====================
    /// Placeholders: {language}
    pub language_added: &'static str,

    /// Placeholders: {language}
    pub language_removed: &'static str,

    /// Shown instead of the add-language picker
    pub all_languages_added: &'static str,
}

pub const ENGLISH_STRINGS: AdminStrings = AdminStrings {
    security_check_failed: "Security check failed.",
    permission_denied: "You do not have permission to perform this action.",
    language_not_provided: "Language not provided",
    language_already_exists: "Language already exists",
    language_unavailable: "This language is not available",
    persistence_failed: "Failed to update options",
    language_not_found: "Language does not exist",
    last_language: "Cannot remove last language",
    unexpected_error: "An unexpected error occurred.",

    language_added: "Language {language} added successfully!",
    language_removed: "Language {language} removed successfully!",
    all_languages_added: "All languages are already added.",
};
