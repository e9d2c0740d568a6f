//! Multi-language grammar registry for the parse service (C4).
//!
//! Every supported language links its `tree-sitter-<lang>` grammar directly
//! (the spec's "grammar... loaded on demand" is satisfied by resolving a
//! static registry by file extension at parse time, not by `dlopen`-ing
//! grammars — see SPEC_FULL.md §1). Each language module in this directory
//! registers its grammar and extensions; nothing here does reformatting or
//! per-language semantic linting, since reformatting is an explicit Non-goal
//! and C6's validator covers structural/semantic correctness generically.

pub mod c;
pub mod cpp;
pub mod csharp;
pub mod go;
pub mod java;
pub mod javascript;
pub mod json;
pub mod php;
pub mod plain;
pub mod python;
pub mod ruby;
pub mod rust;
pub mod toml;
pub mod tsx;
pub mod typescript;
pub mod utils;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use tree_sitter::{Language, Parser};

use crate::error::{AstError, ErrorKind};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LanguageName {
    Rust,
    Json,
    Toml,
    Javascript,
    Typescript,
    Tsx,
    Python,
    Go,
    Cpp,
    C,
    Java,
    Php,
    CSharp,
    Ruby,
    #[serde(other)]
    Other,
}

impl LanguageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageName::Rust => "rust",
            LanguageName::Json => "json",
            LanguageName::Toml => "toml",
            LanguageName::Javascript => "javascript",
            LanguageName::Typescript => "typescript",
            LanguageName::Tsx => "tsx",
            LanguageName::Python => "python",
            LanguageName::Go => "go",
            LanguageName::Cpp => "cpp",
            LanguageName::C => "c",
            LanguageName::Java => "java",
            LanguageName::Php => "php",
            LanguageName::CSharp => "csharp",
            LanguageName::Ruby => "ruby",
            LanguageName::Other => "other",
        }
    }
}

impl fmt::Display for LanguageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single registered language: its grammar and the extensions that select it.
#[derive(Clone)]
pub struct LanguageCommon {
    name: LanguageName,
    file_extensions: &'static [&'static str],
    language: Language,
}

impl fmt::Debug for LanguageCommon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageCommon")
            .field("name", &self.name)
            .field("file_extensions", &self.file_extensions)
            .finish()
    }
}

impl LanguageCommon {
    pub fn new(
        name: LanguageName,
        file_extensions: &'static [&'static str],
        language: Language,
    ) -> Self {
        Self {
            name,
            file_extensions,
            language,
        }
    }

    pub fn name(&self) -> LanguageName {
        self.name
    }

    pub fn file_extensions(&self) -> &'static [&'static str] {
        self.file_extensions
    }

    pub fn tree_sitter_language(&self) -> &Language {
        &self.language
    }

    pub fn tree_sitter_parser(&self) -> Result<Parser, AstError> {
        let mut parser = Parser::new();
        parser.set_language(&self.language).map_err(|e| {
            AstError::new(
                ErrorKind::GeneralError {
                    message: format!("failed to attach {} grammar: {e}", self.name),
                },
                0,
            )
        })?;
        Ok(parser)
    }
}

/// Registry mapping file extensions to languages (the "load_parsers" contract
/// of spec §6, resolved against statically-linked grammars).
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    languages: HashMap<LanguageName, LanguageCommon>,
    extensions: HashMap<&'static str, LanguageName>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            languages: HashMap::new(),
            extensions: HashMap::new(),
        };

        registry.register(rust::language());
        registry.register(json::language());
        registry.register(toml::language());
        registry.register(typescript::language());
        registry.register(tsx::language());
        registry.register(javascript::language());
        registry.register(python::language());
        registry.register(go::language());
        registry.register(cpp::language());
        registry.register(c::language());
        registry.register(java::language());
        registry.register(php::language());
        registry.register(csharp::language());
        registry.register(ruby::language());
        registry.register(plain::language());

        registry
    }

    fn register(&mut self, language: LanguageCommon) {
        let name = language.name();
        for extension in language.file_extensions() {
            self.extensions.insert(extension, name);
        }
        self.languages.insert(name, language);
    }

    pub fn get(&self, name: LanguageName) -> Result<&LanguageCommon, AstError> {
        self.languages.get(&name).ok_or_else(|| {
            AstError::new(
                ErrorKind::ParserNotFound {
                    extension: name.to_string(),
                },
                0,
            )
        })
    }

    /// Resolve a language from a file path's extension (spec §4.4 step 3-4).
    /// An empty or unrecognized extension is `ParserNotFound`.
    pub fn resolve_for_path(&self, path: &Path) -> Result<&LanguageCommon, AstError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .ok_or_else(|| {
                AstError::new(
                    ErrorKind::ParserNotFound {
                        extension: String::new(),
                    },
                    0,
                )
            })?;

        let name = self.extensions.get(extension).copied().ok_or_else(|| {
            AstError::new(
                ErrorKind::ParserNotFound {
                    extension: extension.to_string(),
                },
                0,
            )
        })?;

        self.get(name)
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn resolves_rust_by_extension() {
        let registry = LanguageRegistry::new();
        let language = registry.resolve_for_path(&PathBuf::from("x.rs")).unwrap();
        assert_eq!(language.name(), LanguageName::Rust);
    }

    #[test]
    fn empty_extension_is_parser_not_found() {
        let registry = LanguageRegistry::new();
        let err = registry.resolve_for_path(&PathBuf::from("Makefile")).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ParserNotFound { .. }));
    }

    #[test]
    fn unknown_extension_is_parser_not_found() {
        let registry = LanguageRegistry::new();
        let err = registry
            .resolve_for_path(&PathBuf::from("notes.txt"))
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ParserNotFound { .. }));
    }
}
