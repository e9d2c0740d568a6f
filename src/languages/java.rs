//! Java language support: `.java` via `tree-sitter-java`.

use super::{LanguageCommon, LanguageName};

pub fn language() -> LanguageCommon {
    LanguageCommon::new(
        LanguageName::Java,
        &["java"],
        tree_sitter_java::LANGUAGE.into(),
    )
}
