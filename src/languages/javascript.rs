//! JavaScript language support: `.js`/`.jsx`/`.mjs`/`.cjs` via `tree-sitter-javascript`.

use super::{LanguageCommon, LanguageName};

pub fn language() -> LanguageCommon {
    LanguageCommon::new(
        LanguageName::Javascript,
        &["js", "jsx", "mjs", "cjs"],
        tree_sitter_javascript::LANGUAGE.into(),
    )
}
