//! Block template engine.
//!
//! This module provides:
//! - A marker tokenizer (`<!--- command --->`) and command classifier
//! - A block-tree builder producing a flat registry of named blocks
//! - A renderer with variable interpolation, render-each and per-call output caching
//! - Pluggable value stringifiers (plain or HTML-escaping)
//! - An in-memory store of compiled templates
//!
//! # Example
//!
//! ```
//! use microtemplate::template::{Environment, Template};
//!
//! let template = Template::from_string(
//!     "<ul><!--- B row ---><li><!--- name ---></li><!--- /B ---></ul>",
//! )?;
//!
//! let rows: Vec<Environment> = ["a", "b"]
//!     .into_iter()
//!     .map(|name| [("name", name)].into_iter().collect())
//!     .collect();
//!
//! let html = template.render_each("row", &rows, &Environment::new())?;
//! assert_eq!(html, "<li>a</li><li>b</li>");
//! # Ok::<(), microtemplate::template::TemplateError>(())
//! ```

mod builder;
mod environment;
mod lexer;
mod loader;
mod render;
mod store;
mod stringify;
mod types;

pub use builder::{build, Registry};
pub use environment::{Environment, Value};
pub use lexer::{
    clean_name, lex, lex_command, split_marker, BLOCK_KEYWORD, COMMENT_PREFIX, END_KEYWORD,
    MARKER_CLOSE, MARKER_OPEN, MARKER_PATTERN,
};
pub use loader::LoadError;
pub use render::Template;
pub use store::{
    create_template_store, validate_id, CreateTemplateRequest, StoreError, StoreResult,
    StoredTemplate, TemplateInfo, TemplateListResponse, TemplateStore, UpdateTemplateRequest,
};
pub use stringify::{HtmlStringifier, PlainStringifier, Stringifier, LIST_SEPARATOR};
pub use types::{Block, BlockItem, TemplateError, TemplateResult, Token, ROOT_BLOCK};
