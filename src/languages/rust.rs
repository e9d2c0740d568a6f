//! Rust language support: `.rs` via `tree-sitter-rust`.

use super::{LanguageCommon, LanguageName};

pub fn language() -> LanguageCommon {
    LanguageCommon::new(
        LanguageName::Rust,
        &["rs"],
        tree_sitter_rust::LANGUAGE.into(),
    )
}
