//! Template types and error definitions

use thiserror::Error;

/// Name under which top-level content (outside any block) is rendered
pub const ROOT_BLOCK: &str = "";

/// Template-specific error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A block-closing marker with no open block
    #[error("Unexpected end marker at offset {offset}")]
    UnexpectedEndMarker { offset: usize },

    /// Input ended while blocks were still open (innermost first)
    #[error("Unterminated block: {}", .names.first().map(String::as_str).unwrap_or_default())]
    UnterminatedBlock { names: Vec<String> },

    #[error("Unknown block: {0}")]
    UnknownBlock(String),

    /// A block that, directly or transitively, renders itself
    #[error("Cyclic block reference: {}", .chain.join(" -> "))]
    CyclicBlockReference { chain: Vec<String> },
}

/// Result type for template operations
pub type TemplateResult<T> = Result<T, TemplateError>;

/// A lexical token produced from raw template text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Verbatim text outside of any marker
    Literal(String),

    /// Interpolation command; carries the variable reference
    Content(String),

    /// Marker ignored at render time
    Comment(String),

    /// Opens a named block
    Begin { name: String },

    /// Closes the innermost open block; `offset` is the byte offset of the marker
    End { offset: usize },
}

/// One entry of a block body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockItem {
    Text(String),
    Variable(String),
    /// Reference to another block by name
    Block(String),
}

/// A named, reusable template fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub name: String,
    pub body: Vec<BlockItem>,
}
