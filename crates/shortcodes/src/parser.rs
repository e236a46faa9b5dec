//! Stack-based shortcode parser.
//!
//! Tokens are consumed in a single pass. Block shortcodes push a frame
//! holding their expected end-tag; an end-tag must match the innermost open
//! frame. End-tags are checked before ordinary tags, so a name registered as
//! both always acts as an end-tag.

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, LazyLock, PoisonError};

use crate::args::{Arguments, Kwargs};
use crate::error::{NestingError, ShortcodeError};
use crate::node::{Document, Node, Shortcode};
use crate::registry::{Handler, HandlerResult, Registry, SharedRegistry, process_registry};
use crate::tokenizer::{ParserConfig, Token, Tokenizer};

static DEFAULT_TOKENIZER: LazyLock<Tokenizer> =
    LazyLock::new(|| Tokenizer::new(&ParserConfig::default()).unwrap());

/// Parses and renders shortcodes.
///
/// Handlers registered on the parser take precedence over handlers in its
/// shared registry (by default the process-wide registry for `C`). A single
/// parser can process any number of inputs.
///
/// # Example
///
/// ```
/// use shortcodes::Parser;
///
/// let parser: Parser = Parser::new()
///     .with_tag("hello", |_, _, _, kwargs| {
///         Ok(format!("<p>Hello {}</p>", kwargs.get("name").map_or("World", String::as_str)))
///     })
///     .with_block("div", "enddiv", |_, content, pargs, _| {
///         Ok(format!("<div class=\"{}\">{}</div>", pargs.join(" "), content.unwrap_or_default()))
///     });
///
/// let html = parser
///     .parse("[% div note %][% hello name=Ann %][% enddiv %]", &())
///     .unwrap();
/// assert_eq!(html, "<div class=\"note\"><p>Hello Ann</p></div>");
/// ```
pub struct Parser<C = ()> {
    config: ParserConfig,
    tokenizer: Tokenizer,
    tags: Registry<C>,
    globals: Option<SharedRegistry<C>>,
}

impl<C: 'static> Default for Parser<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: 'static> Parser<C> {
    /// Create a parser with default delimiters that also uses the
    /// process-wide registry for `C`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ParserConfig::default(),
            tokenizer: DEFAULT_TOKENIZER.clone(),
            tags: Registry::new(),
            globals: Some(process_registry::<C>()),
        }
    }

    /// Create a parser with custom delimiters that also uses the
    /// process-wide registry for `C`.
    pub fn with_config(config: ParserConfig) -> Result<Self, ShortcodeError> {
        Ok(Self::isolated(config)?.with_globals(process_registry::<C>()))
    }
}

impl<C> Parser<C> {
    /// Create a parser with custom delimiters and no shared registry.
    pub fn isolated(config: ParserConfig) -> Result<Self, ShortcodeError> {
        let tokenizer = Tokenizer::new(&config)?;
        Ok(Self {
            config,
            tokenizer,
            tags: Registry::new(),
            globals: None,
        })
    }

    /// Use `globals` as the shared registry instead of the current one.
    #[must_use]
    pub fn with_globals(mut self, globals: SharedRegistry<C>) -> Self {
        self.globals = Some(globals);
        self
    }

    /// Stop consulting any shared registry.
    #[must_use]
    pub fn without_globals(mut self) -> Self {
        self.globals = None;
        self
    }

    /// Delimiters used by this parser.
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Handlers registered on this parser (shared registry not included).
    pub fn registry(&self) -> &Registry<C> {
        &self.tags
    }

    /// Register a handler for `tag` on this parser.
    ///
    /// With `end_tag`, the tag opens a block shortcode closed by `end_tag`.
    pub fn register<F>(&mut self, handler: F, tag: impl Into<String>, end_tag: Option<&str>)
    where
        F: Fn(&C, Option<&str>, &[String], &Kwargs) -> HandlerResult + Send + Sync + 'static,
    {
        self.tags.register(handler, tag, end_tag);
    }

    /// Register a shared handler object for `tag` on this parser.
    pub fn register_handler(
        &mut self,
        handler: Arc<dyn Handler<C>>,
        tag: impl Into<String>,
        end_tag: Option<&str>,
    ) {
        self.tags.register_handler(handler, tag, end_tag);
    }

    /// Register an atomic shortcode.
    #[must_use]
    pub fn with_tag<F>(mut self, tag: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&C, Option<&str>, &[String], &Kwargs) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(handler, tag, None);
        self
    }

    /// Register a block shortcode closed by `end_tag`.
    #[must_use]
    pub fn with_block<F>(mut self, tag: impl Into<String>, end_tag: &str, handler: F) -> Self
    where
        F: Fn(&C, Option<&str>, &[String], &Kwargs) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(handler, tag, Some(end_tag));
        self
    }

    /// Parse `text` into a [`Document`] without rendering it.
    pub fn build(&self, text: &str) -> Result<Document<C>, ShortcodeError> {
        let registry = self.merged_registry();
        tracing::debug!(
            input_len = text.len(),
            tags = registry.len(),
            "Parsing shortcodes"
        );

        let mut state = ParseState::new();
        for token in self.tokenizer.tokenize(text) {
            match token {
                Token::Text(text) | Token::Escaped(text) => {
                    state.push(Node::Text(text.to_owned()));
                }
                Token::Shortcode(inner) => parse_shortcode(inner, &registry, &mut state)?,
            }
        }

        state.finish()
    }

    /// Parse `text` and render it with `ctx`.
    ///
    /// Either the whole input renders or an error is returned.
    pub fn parse(&self, text: &str, ctx: &C) -> Result<String, ShortcodeError> {
        self.build(text)?.render(ctx)
    }

    /// Shared registry entries overlaid with this parser's own.
    fn merged_registry(&self) -> Cow<'_, Registry<C>> {
        let Some(globals) = &self.globals else {
            return Cow::Borrowed(&self.tags);
        };
        let globals = globals.read().unwrap_or_else(PoisonError::into_inner);
        if globals.is_empty() {
            Cow::Borrowed(&self.tags)
        } else {
            Cow::Owned(globals.merged(&self.tags))
        }
    }
}

impl<C> fmt::Debug for Parser<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("config", &self.config)
            .field("tags", &self.tags)
            .field("shared", &self.globals.is_some())
            .finish_non_exhaustive()
    }
}

/// Handle one shortcode token.
fn parse_shortcode<C>(
    inner: &str,
    registry: &Registry<C>,
    state: &mut ParseState<C>,
) -> Result<(), ShortcodeError> {
    let content = inner.trim();
    if content.is_empty() {
        return Ok(());
    }

    let (tag, argstring) = content
        .split_once(char::is_whitespace)
        .unwrap_or((content, ""));

    if registry.is_end_tag(tag) {
        return state.close(tag).map_err(ShortcodeError::from);
    }

    let Some(registration) = registry.get(tag) else {
        return Err(ShortcodeError::InvalidTag {
            tag: tag.to_owned(),
        });
    };

    let shortcode = Shortcode::new(
        tag,
        Arguments::parse(argstring),
        Arc::clone(registration.handler()),
    );
    match registration.end_tag() {
        Some(end_tag) => state.open(shortcode, end_tag),
        None => state.push(Node::Atomic(shortcode)),
    }

    Ok(())
}

/// A block shortcode waiting for its end-tag.
struct OpenBlock<C> {
    shortcode: Shortcode<C>,
    end_tag: String,
    children: Vec<Node<C>>,
}

/// Transient state of one parse.
struct ParseState<C> {
    root: Vec<Node<C>>,
    open: Vec<OpenBlock<C>>,
}

impl<C> ParseState<C> {
    fn new() -> Self {
        Self {
            root: Vec::new(),
            open: Vec::new(),
        }
    }

    /// Append a node to the innermost open block (or the root).
    fn push(&mut self, node: Node<C>) {
        match self.open.last_mut() {
            Some(block) => block.children.push(node),
            None => self.root.push(node),
        }
    }

    fn open(&mut self, shortcode: Shortcode<C>, end_tag: &str) {
        tracing::trace!(tag = shortcode.tag(), end_tag, "Opened block shortcode");
        self.open.push(OpenBlock {
            shortcode,
            end_tag: end_tag.to_owned(),
            children: Vec::new(),
        });
    }

    fn close(&mut self, tag: &str) -> Result<(), NestingError> {
        match self.open.pop() {
            None => Err(NestingError::NotExpecting {
                found: tag.to_owned(),
            }),
            Some(block) if block.end_tag != tag => Err(NestingError::Mismatch {
                expected: block.end_tag,
                found: tag.to_owned(),
            }),
            Some(block) => {
                self.push(Node::Block {
                    shortcode: block.shortcode,
                    children: block.children,
                });
                Ok(())
            }
        }
    }

    fn finish(mut self) -> Result<Document<C>, ShortcodeError> {
        if let Some(block) = self.open.pop() {
            return Err(NestingError::Unterminated {
                expected: block.end_tag,
            }
            .into());
        }
        Ok(Document::new(self.root))
    }
}
