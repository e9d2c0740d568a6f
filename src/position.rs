//! Source positions shared across the cache, symbol index, differ, and validator.
//!
//! Rows are tracked 0-indexed internally (matching tree-sitter) and converted
//! to 1-indexed only at the public API boundary, per the data model.

use serde::{Deserialize, Serialize};
use tree_sitter::Point;

/// A 0-indexed row/column pair, as tree-sitter reports them internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourcePosition {
    pub row: u32,
    pub column: u32,
}

impl SourcePosition {
    pub fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Convert to the 1-indexed line number used at the user-facing boundary.
    pub fn line_1indexed(&self) -> u32 {
        self.row + 1
    }

    /// Wire-visible `{line, column}` pair, both 1-indexed, for fallback payloads.
    pub fn to_wire_location(self) -> WireLocation {
        WireLocation {
            line: self.row + 1,
            column: self.column + 1,
        }
    }
}

impl From<Point> for SourcePosition {
    fn from(p: Point) -> Self {
        Self {
            row: p.row as u32,
            column: p.column as u32,
        }
    }
}

impl From<SourcePosition> for Point {
    fn from(p: SourcePosition) -> Self {
        Point {
            row: p.row as usize,
            column: p.column as usize,
        }
    }
}

/// 1-indexed `{line, column}`, the shape that crosses the public API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireLocation {
    pub line: u32,
    pub column: u32,
}
