//! TypeScript language support: `.ts` via `tree-sitter-typescript`.

use super::{LanguageCommon, LanguageName};

pub fn language() -> LanguageCommon {
    LanguageCommon::new(
        LanguageName::Typescript,
        &["ts"],
        tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
    )
}
