//! Go language support: `.go` via `tree-sitter-go`.

use super::{LanguageCommon, LanguageName};

pub fn language() -> LanguageCommon {
    LanguageCommon::new(LanguageName::Go, &["go"], tree_sitter_go::LANGUAGE.into())
}
