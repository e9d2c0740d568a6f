//! TOML language support: `.toml` via `tree-sitter-toml-ng`.

use super::{LanguageCommon, LanguageName};

pub fn language() -> LanguageCommon {
    LanguageCommon::new(
        LanguageName::Toml,
        &["toml"],
        tree_sitter_toml_ng::LANGUAGE.into(),
    )
}
