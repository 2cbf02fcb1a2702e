//! Compiled templates and the block renderer

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use regex::Captures;

use super::builder::{build, Registry};
use super::environment::{Environment, Value};
use super::lexer::{lex, lex_command, marker_regex};
use super::stringify::{PlainStringifier, Stringifier};
use super::types::{Block, BlockItem, TemplateError, TemplateResult, Token, ROOT_BLOCK};

/// A compiled template: the root block plus every named block.
///
/// Immutable once built; share it behind an `Arc` and render from any thread.
/// Each render call keeps its own output cache.
#[derive(Debug, Clone)]
pub struct Template {
    root: Block,
    registry: Registry,
    stringifier: Arc<dyn Stringifier>,
}

impl Template {
    pub(crate) fn from_parts(root: Block, registry: Registry) -> Self {
        Self {
            root,
            registry,
            stringifier: Arc::new(PlainStringifier),
        }
    }

    /// Compile raw template text
    pub fn from_string(text: &str) -> TemplateResult<Self> {
        build(lex(text))
    }

    /// Use `stringifier` for every interpolated value
    pub fn with_stringifier(mut self, stringifier: Arc<dyn Stringifier>) -> Self {
        self.stringifier = stringifier;
        self
    }

    pub fn stringifier(&self) -> &Arc<dyn Stringifier> {
        &self.stringifier
    }

    /// Mark a string as trusted markup so it is never escaped
    pub fn literal(value: impl Into<String>) -> Value {
        Value::literal(value)
    }

    /// Names of all blocks, in registration order (the root is not listed)
    pub fn blocks(&self) -> Vec<&str> {
        self.registry.names().collect()
    }

    /// Resolve a block by name; [`ROOT_BLOCK`] is the implicit root
    pub fn block(&self, name: &str) -> Option<&Block> {
        if name == ROOT_BLOCK {
            Some(&self.root)
        } else {
            self.registry.get(name)
        }
    }

    pub fn has_block(&self, name: &str) -> bool {
        self.block(name).is_some()
    }

    /// Render the block `name` against `environment`.
    ///
    /// Referenced blocks are rendered with the same environment. Output of a
    /// referenced block is computed once per call and reused.
    pub fn render(&self, name: &str, environment: &Environment) -> TemplateResult<String> {
        let mut pass = RenderPass::new(self, environment);
        let output = pass.render_block(name)?;

        tracing::trace!(
            block = name,
            cache_hits = pass.cache.hits,
            bytes = output.len(),
            "Block rendered"
        );

        Ok(output)
    }

    /// Render `name` once per environment, each merged over `defaults`.
    ///
    /// Item keys take precedence over defaults. An empty list renders as an
    /// empty string.
    pub fn render_each(
        &self,
        name: &str,
        environments: &[Environment],
        defaults: &Environment,
    ) -> TemplateResult<String> {
        if !self.has_block(name) {
            return Err(TemplateError::UnknownBlock(name.to_string()));
        }

        let mut output = String::new();
        for environment in environments {
            output.push_str(&self.render(name, &defaults.merged(environment))?);
        }
        Ok(output)
    }

    /// Compile `text` on the fly and render its root with this template's stringifier
    pub fn evaluate(&self, text: &str, environment: &Environment) -> TemplateResult<String> {
        Template::from_string(text)?
            .with_stringifier(self.stringifier.clone())
            .render(ROOT_BLOCK, environment)
    }

    /// Write `value` into `environment` under `key` ahead of a nested render
    pub fn inject(key: impl Into<String>, value: impl Into<Value>, environment: &mut Environment) {
        environment.insert(key, value);
    }

    /// Substitute every interpolation marker in `text`.
    ///
    /// Comment markers are removed; block markers are left as they are.
    pub fn interpolate(&self, text: &str, environment: &Environment) -> String {
        marker_regex()
            .replace_all(text, |caps: &Captures| {
                let offset = caps.get(0).map_or(0, |m| m.start());
                let command = caps.get(1).map_or("", |m| m.as_str());

                match lex_command(command, offset) {
                    Token::Content(reference) => self.resolve(&reference, environment),
                    Token::Comment(_) => String::new(),
                    _ => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    fn resolve(&self, reference: &str, environment: &Environment) -> String {
        match environment.lookup(reference) {
            Some(value) => self.stringifier.stringify(value),
            None => {
                tracing::debug!(variable = reference, "Unresolved template variable");
                String::new()
            }
        }
    }
}

/// Rendered block output, valid for a single render call
#[derive(Debug, Default)]
struct OutputCache {
    outputs: HashMap<String, String>,
    hits: usize,
}

impl OutputCache {
    fn get(&mut self, name: &str) -> Option<&str> {
        let output = self.outputs.get(name)?;
        self.hits += 1;
        Some(output.as_str())
    }

    fn insert(&mut self, name: &str, output: &str) {
        self.outputs.insert(name.to_string(), output.to_string());
    }
}

/// A block whose body is partway through rendering
struct Frame<'a> {
    name: &'a str,
    items: std::slice::Iter<'a, BlockItem>,
    output: String,
}

/// State of one top-level render call
struct RenderPass<'a> {
    template: &'a Template,
    environment: &'a Environment,
    cache: OutputCache,
    /// Names of the blocks on the work stack
    visiting: HashSet<&'a str>,
}

impl<'a> RenderPass<'a> {
    fn new(template: &'a Template, environment: &'a Environment) -> Self {
        Self {
            template,
            environment,
            cache: OutputCache::default(),
            visiting: HashSet::new(),
        }
    }

    fn open(&mut self, name: &str) -> TemplateResult<Frame<'a>> {
        let template = self.template;
        let block = template
            .block(name)
            .ok_or_else(|| TemplateError::UnknownBlock(name.to_string()))?;

        self.visiting.insert(block.name.as_str());
        Ok(Frame {
            name: block.name.as_str(),
            items: block.body.iter(),
            output: String::new(),
        })
    }

    /// Render `name` and every block it references.
    ///
    /// Nested references are walked with an explicit stack of frames, so
    /// nesting depth is bounded by heap memory rather than the thread stack.
    fn render_block(&mut self, name: &str) -> TemplateResult<String> {
        let template = self.template;
        let environment = self.environment;

        let mut current = self.open(name)?;
        let mut parents: Vec<Frame<'a>> = Vec::new();

        loop {
            match current.items.next() {
                Some(BlockItem::Text(text)) => current.output.push_str(text),
                Some(BlockItem::Variable(reference)) => {
                    current.output.push_str(&template.resolve(reference, environment))
                }
                Some(BlockItem::Block(child)) => {
                    if let Some(cached) = self.cache.get(child) {
                        current.output.push_str(cached);
                        continue;
                    }

                    if self.visiting.contains(child.as_str()) {
                        let chain = parents
                            .iter()
                            .chain(std::iter::once(&current))
                            .map(|frame| frame.name.to_string())
                            .chain(std::iter::once(child.clone()))
                            .collect();
                        return Err(TemplateError::CyclicBlockReference { chain });
                    }

                    let next = self.open(child)?;
                    parents.push(std::mem::replace(&mut current, next));
                }
                None => {
                    self.visiting.remove(current.name);
                    let Some(parent) = parents.pop() else {
                        return Ok(current.output);
                    };

                    let done = std::mem::replace(&mut current, parent);
                    self.cache.insert(done.name, &done.output);
                    current.output.push_str(&done.output);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::HtmlStringifier;
    use serde_json::json;

    fn env(value: serde_json::Value) -> Environment {
        Environment::from_json(value).unwrap()
    }

    #[test]
    fn test_render_named_block() {
        let template =
            Template::from_string("Hello <!--- B greet ---> <!--- name ---> <!--- /B --->").unwrap();

        assert_eq!(template.blocks(), vec!["greet"]);
        let out = template.render("greet", &env(json!({"name": "World"}))).unwrap();
        assert_eq!(out, " World ");
    }

    #[test]
    fn test_render_root_expands_blocks_in_place() {
        let template =
            Template::from_string("Hello <!--- B greet ---> <!--- name ---> <!--- /B --->!").unwrap();
        let out = template.render(ROOT_BLOCK, &env(json!({"name": "World"}))).unwrap();
        assert_eq!(out, "Hello  World !");
    }

    #[test]
    fn test_render_plain_text_round_trip() {
        let text = "<html>\n  <body>no markers <!-- html comment --></body>\n</html>";
        let template = Template::from_string(text).unwrap();
        assert_eq!(template.render(ROOT_BLOCK, &Environment::new()).unwrap(), text);
    }

    #[test]
    fn test_render_unknown_block() {
        let template = Template::from_string("x").unwrap();
        assert_eq!(
            template.render("missing", &Environment::new()),
            Err(TemplateError::UnknownBlock("missing".to_string()))
        );
    }

    #[test]
    fn test_missing_variable_renders_empty() {
        let template = Template::from_string("[<!--- nothing --->]").unwrap();
        assert_eq!(template.render(ROOT_BLOCK, &Environment::new()).unwrap(), "[]");
    }

    #[test]
    fn test_render_is_deterministic() {
        let template = Template::from_string(
            "<!--- B card ---><!--- user.name --->:<!--- user.tags ---><!--- /B --->",
        )
        .unwrap();
        let data = env(json!({"user": {"name": "Ann", "tags": ["a", "b"]}}));

        let first = template.render("card", &data).unwrap();
        let second = template.render("card", &data).unwrap();
        assert_eq!(first, "Ann:a, b");
        assert_eq!(first, second);
    }

    #[test]
    fn test_repeated_reference_uses_cache() {
        // "row" is referenced twice from the root after being reopened
        let template = Template::from_string(
            "<!--- B row --->(<!--- v --->)<!--- /B --->-<!--- B row ---><!--- /B --->",
        )
        .unwrap();
        let data = env(json!({"v": 1}));
        let mut pass = RenderPass::new(&template, &data);
        assert_eq!(pass.render_block(ROOT_BLOCK).unwrap(), "(1)-(1)");
        assert_eq!(pass.cache.hits, 1);
    }

    #[test]
    fn test_cache_does_not_outlive_render_call() {
        let template =
            Template::from_string("[<!--- B x --->v=<!--- v ---><!--- /B --->]").unwrap();

        let first = template.render(ROOT_BLOCK, &env(json!({"v": 1}))).unwrap();
        let second = template.render(ROOT_BLOCK, &env(json!({"v": 2}))).unwrap();
        assert_eq!(first, "[v=1]");
        assert_eq!(second, "[v=2]");

        let each = template
            .render_each(
                ROOT_BLOCK,
                &[env(json!({"v": "a"})), env(json!({"v": "b"}))],
                &Environment::new(),
            )
            .unwrap();
        assert_eq!(each, "[v=a][v=b]");
    }

    #[test]
    fn test_deeply_nested_blocks_render_on_small_stack() {
        const DEPTH: usize = 20_000;

        let mut text = String::new();
        for i in 0..DEPTH {
            text.push_str(&format!("<!--- B b{i} --->."));
        }
        text.push_str(&"<!--- /B --->".repeat(DEPTH));

        // Far smaller than a tokio worker stack
        let out = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(move || {
                let template = Template::from_string(&text).unwrap();
                template.render(ROOT_BLOCK, &Environment::new()).unwrap()
            })
            .unwrap()
            .join()
            .unwrap();

        assert_eq!(out, ".".repeat(DEPTH));
    }

    #[test]
    fn test_cyclic_reference_is_detected() {
        let template = Template::from_string(
            "<!--- B a ---><!--- B b ---><!--- B a --->x<!--- /B ---><!--- /B ---><!--- /B --->",
        )
        .unwrap();

        let err = template.render("a", &Environment::new()).unwrap_err();
        assert_eq!(
            err,
            TemplateError::CyclicBlockReference {
                chain: vec!["a".to_string(), "b".to_string(), "a".to_string()]
            }
        );
    }

    #[test]
    fn test_render_each() {
        let template =
            Template::from_string("<!--- B row ---><li><!--- name --->/<!--- color ---></li><!--- /B --->")
                .unwrap();
        let defaults = env(json!({"color": "red"}));
        let rows = vec![
            env(json!({"name": "a"})),
            env(json!({"name": "b", "color": "blue"})),
        ];

        let out = template.render_each("row", &rows, &defaults).unwrap();
        assert_eq!(out, "<li>a/red</li><li>b/blue</li>");

        let expected = template.render("row", &defaults.merged(&rows[0])).unwrap()
            + &template.render("row", &defaults.merged(&rows[1])).unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_render_each_empty() {
        let template = Template::from_string("<!--- B row --->x<!--- /B --->").unwrap();
        assert_eq!(template.render_each("row", &[], &Environment::new()).unwrap(), "");
        assert_eq!(
            template.render_each("nope", &[], &Environment::new()),
            Err(TemplateError::UnknownBlock("nope".to_string()))
        );
    }

    #[test]
    fn test_evaluate() {
        let template = Template::from_string("").unwrap();
        let out = template.evaluate("Sum: <!--- x --->", &env(json!({"x": 5}))).unwrap();
        assert_eq!(out, "Sum: 5");

        assert!(matches!(
            template.evaluate("<!--- /B --->", &Environment::new()),
            Err(TemplateError::UnexpectedEndMarker { .. })
        ));
    }

    #[test]
    fn test_evaluate_keeps_stringifier() {
        let template = Template::from_string("")
            .unwrap()
            .with_stringifier(Arc::new(HtmlStringifier));
        let out = template.evaluate("<!--- v --->", &env(json!({"v": "<b>"}))).unwrap();
        assert_eq!(out, "&lt;b&gt;");
    }

    #[test]
    fn test_inject_rendered_block_into_outer_render() {
        let template = Template::from_string(
            "<!--- B item ---><b><!--- label ---></b><!--- /B --->\
             <!--- B page ---><div><!--- content ---></div><!--- /B --->",
        )
        .unwrap()
        .with_stringifier(Arc::new(HtmlStringifier));

        let item = template.render("item", &env(json!({"label": "x<y"}))).unwrap();
        assert_eq!(item, "<b>x&lt;y</b>");

        let mut page_env = Environment::new();
        Template::inject("content", Template::literal(item), &mut page_env);
        let page = template.render("page", &page_env).unwrap();
        assert_eq!(page, "<div><b>x&lt;y</b></div>");
    }

    #[test]
    fn test_interpolate() {
        let template = Template::from_string("").unwrap();
        let data = env(json!({"who": "you", "n": 2}));

        assert_eq!(
            template.interpolate("hi <!--- who ---> x<!--- n ---><!--- # gone --->", &data),
            "hi you x2"
        );
        // Block markers are not interpolation and stay put
        assert_eq!(
            template.interpolate("<!--- B row --->", &data),
            "<!--- B row --->"
        );
        assert_eq!(template.interpolate("<!--- missing --->!", &data), "!");
    }
}
