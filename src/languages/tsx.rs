//! TSX (TypeScript + JSX) language support: `.tsx` via `tree-sitter-typescript`.

use super::{LanguageCommon, LanguageName};

pub fn language() -> LanguageCommon {
    LanguageCommon::new(
        LanguageName::Tsx,
        &["tsx"],
        tree_sitter_typescript::LANGUAGE_TSX.into(),
    )
}
