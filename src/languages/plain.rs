//! Fallback language for unrecognized file types. Registered with no
//! extensions of its own; selected only as the `Other` variant's grammar
//! when a caller explicitly asks for it.

use super::{LanguageCommon, LanguageName};

pub fn language() -> LanguageCommon {
    LanguageCommon::new(LanguageName::Other, &[], tree_sitter_plain::LANGUAGE.into())
}
