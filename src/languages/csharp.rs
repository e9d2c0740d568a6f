//! C# language support: `.cs` via `tree-sitter-c-sharp`.

use super::{LanguageCommon, LanguageName};

pub fn language() -> LanguageCommon {
    LanguageCommon::new(
        LanguageName::CSharp,
        &["cs"],
        tree_sitter_c_sharp::LANGUAGE.into(),
    )
}
