//! PHP language support: `.php` via `tree-sitter-php`.

use super::{LanguageCommon, LanguageName};

pub fn language() -> LanguageCommon {
    LanguageCommon::new(
        LanguageName::Php,
        &["php"],
        tree_sitter_php::LANGUAGE_PHP.into(),
    )
}
