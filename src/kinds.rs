//! Universal node-kind tables (spec §4.3, §4.5, §4.8).
//!
//! The spec treats these kind names as consistent across the grammars it
//! targets (tree-sitter grammars converge on this naming for mainstream
//! languages). Centralizing them here is the single implementation of the
//! "duck-typed field access" / kind-matching tables spec §9 Design Notes
//! calls for, instead of scattering string literals through C3/C4/C5/C8.

/// Function/method declaration kinds across the supported grammars. Kind
/// names are not unified across tree-sitter grammars, so this is a flat
/// union rather than one name per language: `function_item` is Rust's only
/// shape for both free functions and methods, `method_definition` is
/// JS/TS's class-method shape, `method_declaration` covers Java/C#/Go, and
/// so on.
pub const FUNCTION_KINDS: &[&str] = &[
    "function_item",         // Rust fn (free function or impl/trait method)
    "function_definition",   // Python, C, C++, PHP
    "function_declaration",  // JS, TS, Go
    "method_definition",     // JS, TS class methods
    "method_declaration",    // Java, C#, Go (receiver methods)
    "constructor_declaration", // Java, C#
    "method",                // Ruby def..end
    "singleton_method",      // Ruby def self.foo
];

/// Function-like kinds the differ (C5) focuses on; a superset of
/// `FUNCTION_KINDS` that also includes arrow functions, since an arrow
/// function assigned to a binding is still diffable as a function body even
/// though it isn't itself a named declaration.
pub const DIFFABLE_FUNCTION_KINDS: &[&str] = &[
    "function_item",
    "function_definition",
    "function_declaration",
    "method_definition",
    "method_declaration",
    "constructor_declaration",
    "method",
    "singleton_method",
    "arrow_function",
];

/// Class/struct/interface-like declaration kinds: anything that names a
/// nested scope for methods and fields.
pub const CLASS_KINDS: &[&str] = &[
    "class_declaration",   // JS, TS, Java, C#, PHP
    "class_definition",    // Python
    "struct_item",         // Rust
    "enum_item",           // Rust
    "trait_item",          // Rust
    "interface_declaration", // Java, C#, TS
    "class",               // Ruby
    "struct_specifier",    // C, C++
    "class_specifier",     // C++
    "type_declaration",    // Go (struct/interface type definitions)
];

pub const VARIABLE_KINDS: &[&str] = &[
    "variable_declaration",
    "lexical_declaration", // JS/TS let/const
    "constant_declaration",
    "let_declaration",
    "var_declaration",
    "const_item", // Rust
    "static_item", // Rust
];

/// Block/body-like container kinds that descent skips when looking for
/// top-level symbols, except when entering them specifically to discover
/// nested class/function members (spec §4.3).
pub const BODY_CONTAINER_KINDS: &[&str] =
    &["block", "function_body", "class_body", "statement_block"];

/// Field-name aliases tried in order for a declaration's name (spec §4.4,
/// §9 "name_field" helper).
pub const NAME_FIELD_ALIASES: &[&str] = &["name", "id", "identifier"];

/// Field-name aliases tried in order for a function/method's body (spec §4.8).
pub const BODY_FIELD_ALIASES: &[&str] = &["body", "block", "statement", "value"];

/// Reference-node kinds the dependency pass (C3) walks for identifier uses.
pub const REFERENCE_KINDS: &[&str] = &["identifier", "property_identifier"];

pub fn is_function_kind(kind: &str) -> bool {
    FUNCTION_KINDS.contains(&kind)
}

pub fn is_diffable_function_kind(kind: &str) -> bool {
    DIFFABLE_FUNCTION_KINDS.contains(&kind)
}

pub fn is_class_kind(kind: &str) -> bool {
    CLASS_KINDS.contains(&kind)
}

pub fn is_variable_kind(kind: &str) -> bool {
    VARIABLE_KINDS.contains(&kind)
}

pub fn is_body_container_kind(kind: &str) -> bool {
    BODY_CONTAINER_KINDS.contains(&kind)
}
