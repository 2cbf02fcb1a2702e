//! Block-tree builder: resolves nested begin/end markers into a flat registry

use std::collections::HashMap;

use super::render::Template;
use super::types::{Block, BlockItem, TemplateError, TemplateResult, Token, ROOT_BLOCK};

/// Named blocks of a compiled template, in registration order
#[derive(Debug, Clone, Default)]
pub struct Registry {
    blocks: Vec<Block>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Register a closed block. Re-opening an existing name appends to its body;
    /// the first occurrence keeps its enumeration position.
    fn register(&mut self, name: String, body: Vec<BlockItem>) {
        match self.index.get(&name) {
            Some(&idx) => self.blocks[idx].body.extend(body),
            None => {
                self.index.insert(name.clone(), self.blocks.len());
                self.blocks.push(Block { name, body });
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Block> {
        self.index.get(name).map(|&idx| &self.blocks[idx])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().map(|b| b.name.as_str())
    }

    pub(crate) fn len(&self) -> usize {
        self.blocks.len()
    }
}

/// An open block while its body is being collected
struct Frame {
    name: String,
    body: Vec<BlockItem>,
}

fn current<'a>(root: &'a mut Vec<BlockItem>, open: &'a mut [Frame]) -> &'a mut Vec<BlockItem> {
    match open.last_mut() {
        Some(frame) => &mut frame.body,
        None => root,
    }
}

/// Build a template from a token stream.
///
/// Fails on the first structural error instead of returning a partial registry.
pub fn build(tokens: impl IntoIterator<Item = Token>) -> TemplateResult<Template> {
    let mut registry = Registry::default();
    let mut root = Vec::new();
    let mut open: Vec<Frame> = Vec::new();

    for token in tokens {
        match token {
            Token::Literal(text) => current(&mut root, &mut open).push(BlockItem::Text(text)),
            Token::Content(reference) => {
                current(&mut root, &mut open).push(BlockItem::Variable(reference))
            }
            Token::Comment(_) => {}
            Token::Begin { name } => open.push(Frame {
                name,
                body: Vec::new(),
            }),
            Token::End { offset } => {
                let Some(frame) = open.pop() else {
                    return Err(TemplateError::UnexpectedEndMarker { offset });
                };
                // The reference keeps the block at its original position for plain renders
                current(&mut root, &mut open).push(BlockItem::Block(frame.name.clone()));
                registry.register(frame.name, frame.body);
            }
        }
    }

    if !open.is_empty() {
        return Err(TemplateError::UnterminatedBlock {
            names: open.into_iter().rev().map(|frame| frame.name).collect(),
        });
    }

    tracing::debug!(blocks = registry.len(), "Template compiled");

    Ok(Template::from_parts(
        Block {
            name: ROOT_BLOCK.to_string(),
            body: root,
        },
        registry,
    ))
}
