//! C language support: `.c`/`.h` via `tree-sitter-c`.

use super::{LanguageCommon, LanguageName};

pub fn language() -> LanguageCommon {
    LanguageCommon::new(LanguageName::C, &["c", "h"], tree_sitter_c::LANGUAGE.into())
}
