//! Python language support: `.py`/`.pyi` via `tree-sitter-python`.

use super::{LanguageCommon, LanguageName};

pub fn language() -> LanguageCommon {
    LanguageCommon::new(
        LanguageName::Python,
        &["py", "pyi"],
        tree_sitter_python::LANGUAGE.into(),
    )
}
