//! JSON language support: `.json` via `tree-sitter-json`.
//!
//! No custom formatting or semantic linting — reformatting is a Non-goal and
//! C6 covers structural/semantic validation generically across languages.

use super::{LanguageCommon, LanguageName};

pub fn language() -> LanguageCommon {
    LanguageCommon::new(
        LanguageName::Json,
        &["json"],
        tree_sitter_json::LANGUAGE.into(),
    )
}
