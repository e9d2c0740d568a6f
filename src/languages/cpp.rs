//! C++ language support: `.cpp`/`.cxx`/`.cc`/`.hpp`/... via `tree-sitter-cpp`.

use super::{LanguageCommon, LanguageName};

pub fn language() -> LanguageCommon {
    LanguageCommon::new(
        LanguageName::Cpp,
        &["cpp", "cxx", "cc", "c++", "hpp", "hxx", "h++"],
        tree_sitter_cpp::LANGUAGE.into(),
    )
}
