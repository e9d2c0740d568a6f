//! Ruby language support: `.rb` via `tree-sitter-ruby`.

use super::{LanguageCommon, LanguageName};

pub fn language() -> LanguageCommon {
    LanguageCommon::new(
        LanguageName::Ruby,
        &["rb"],
        tree_sitter_ruby::LANGUAGE.into(),
    )
}
