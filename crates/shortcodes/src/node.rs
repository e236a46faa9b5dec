//! Parsed shortcode tree and rendering.
//!
//! A [`Document`] is built once by [`Parser::build`](crate::Parser::build)
//! and can be rendered any number of times; rendering never modifies it.

use std::fmt;
use std::sync::Arc;

use crate::args::{Arguments, Kwargs};
use crate::error::ShortcodeError;
use crate::registry::Handler;

/// A shortcode occurrence bound to its handler.
pub struct Shortcode<C> {
    tag: String,
    args: Arguments,
    handler: Arc<dyn Handler<C>>,
}

impl<C> Shortcode<C> {
    pub(crate) fn new(tag: impl Into<String>, args: Arguments, handler: Arc<dyn Handler<C>>) -> Self {
        Self {
            tag: tag.into(),
            args,
            handler,
        }
    }

    /// Tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Positional arguments.
    pub fn pargs(&self) -> &[String] {
        &self.args.positional
    }

    /// Keyword arguments.
    pub fn kwargs(&self) -> &Kwargs {
        &self.args.keyword
    }

    /// Call the handler, wrapping its failure with this shortcode's tag.
    fn invoke(&self, ctx: &C, content: Option<&str>) -> Result<String, ShortcodeError> {
        self.handler
            .render(ctx, content, &self.args.positional, &self.args.keyword)
            .map_err(|source| {
                tracing::debug!(tag = %self.tag, error = %source, "Shortcode handler failed");
                ShortcodeError::Rendering {
                    tag: self.tag.clone(),
                    source,
                }
            })
    }
}

impl<C> fmt::Debug for Shortcode<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shortcode")
            .field("tag", &self.tag)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// A node of the parsed tree.
pub enum Node<C> {
    /// Literal text, rendered unchanged.
    Text(String),
    /// Shortcode without a closing tag.
    Atomic(Shortcode<C>),
    /// Shortcode wrapping nested nodes up to its end-tag.
    Block {
        /// The opening shortcode.
        shortcode: Shortcode<C>,
        /// Nodes between the opening tag and the end-tag.
        children: Vec<Node<C>>,
    },
}

impl<C> Node<C> {
    /// Render this node.
    ///
    /// Block content is rendered before the block's own handler runs. A
    /// failing nested shortcode aborts the render with its own error.
    pub fn render(&self, ctx: &C) -> Result<String, ShortcodeError> {
        match self {
            Self::Text(text) => Ok(text.clone()),
            Self::Atomic(shortcode) => shortcode.invoke(ctx, None),
            Self::Block {
                shortcode,
                children,
            } => {
                let content = render_all(children, ctx)?;
                shortcode.invoke(ctx, Some(&content))
            }
        }
    }

    /// The shortcode of an atomic or block node.
    pub fn shortcode(&self) -> Option<&Shortcode<C>> {
        match self {
            Self::Text(_) => None,
            Self::Atomic(shortcode) | Self::Block { shortcode, .. } => Some(shortcode),
        }
    }
}

impl<C> fmt::Debug for Node<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Atomic(shortcode) => f.debug_tuple("Atomic").field(shortcode).finish(),
            Self::Block {
                shortcode,
                children,
            } => f
                .debug_struct("Block")
                .field("shortcode", shortcode)
                .field("children", children)
                .finish(),
        }
    }
}

/// Root of a parsed input.
pub struct Document<C> {
    children: Vec<Node<C>>,
}

impl<C> Document<C> {
    pub(crate) fn new(children: Vec<Node<C>>) -> Self {
        Self { children }
    }

    /// Top-level nodes in input order.
    pub fn children(&self) -> &[Node<C>] {
        &self.children
    }

    /// Render the whole document, stopping at the first handler error.
    pub fn render(&self, ctx: &C) -> Result<String, ShortcodeError> {
        render_all(&self.children, ctx)
    }
}

impl<C> fmt::Debug for Document<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("children", &self.children)
            .finish()
    }
}

fn render_all<C>(nodes: &[Node<C>], ctx: &C) -> Result<String, ShortcodeError> {
    let mut output = String::new();
    for node in nodes {
        output.push_str(&node.render(ctx)?);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::registry::HandlerResult;

    fn handler<F>(f: F) -> Arc<dyn Handler<String>>
    where
        F: Fn(&String, Option<&str>, &[String], &Kwargs) -> HandlerResult + Send + Sync + 'static,
    {
        Arc::new(f)
    }

    fn wrap(tag: &str) -> Shortcode<String> {
        Shortcode::new(
            tag,
            Arguments::default(),
            handler(|_, content, _, _| Ok(format!("<b>{}</b>", content.unwrap_or_default()))),
        )
    }

    #[test]
    fn test_text_renders_verbatim() {
        let node: Node<String> = Node::Text("a < b".to_owned());
        assert_eq!(node.render(&String::new()).unwrap(), "a < b");
    }

    #[test]
    fn test_atomic_receives_context_and_args() {
        let shortcode = Shortcode::new(
            "greet",
            Arguments::parse("Ann mood=happy"),
            handler(|ctx, content, pargs, kwargs| {
                assert!(content.is_none());
                Ok(format!("{ctx}:{}:{}", pargs[0], kwargs["mood"]))
            }),
        );
        let node = Node::Atomic(shortcode);
        assert_eq!(node.render(&"ctx".to_owned()).unwrap(), "ctx:Ann:happy");
    }

    #[test]
    fn test_block_renders_children_first() {
        let doc = Document::new(vec![
            Node::Text("[".to_owned()),
            Node::Block {
                shortcode: wrap("outer"),
                children: vec![
                    Node::Text("x".to_owned()),
                    Node::Block {
                        shortcode: wrap("inner"),
                        children: vec![Node::Text("y".to_owned())],
                    },
                ],
            },
            Node::Text("]".to_owned()),
        ]);
        assert_eq!(doc.render(&String::new()).unwrap(), "[<b>x<b>y</b></b>]");
    }

    #[test]
    fn test_empty_block_gets_empty_content() {
        let node = Node::Block {
            shortcode: Shortcode::new(
                "b",
                Arguments::default(),
                handler(|_, content, _, _| Ok(format!("{content:?}"))),
            ),
            children: Vec::new(),
        };
        assert_eq!(node.render(&String::new()).unwrap(), r#"Some("")"#);
    }

    #[test]
    fn test_nested_failure_not_rewrapped() {
        let failing = Shortcode::new(
            "inner",
            Arguments::default(),
            handler(|_, _, _, _| Err("inner failed".into())),
        );
        let doc = Document::new(vec![Node::Block {
            shortcode: wrap("outer"),
            children: vec![Node::Atomic(failing)],
        }]);

        let err = doc.render(&String::new()).unwrap_err();
        assert_eq!(err.tag(), Some("inner"));
    }

    #[test]
    fn test_render_stops_at_first_error() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        let counting = || {
            Shortcode::new(
                "count",
                Arguments::default(),
                handler(|_, _, _, _| {
                    CALLS.fetch_add(1, Ordering::SeqCst);
                    Ok(String::new())
                }),
            )
        };
        let failing = Shortcode::new(
            "fail",
            Arguments::default(),
            handler(|_, _, _, _| Err("boom".into())),
        );
        let doc = Document::new(vec![
            Node::Atomic(counting()),
            Node::Atomic(failing),
            Node::Atomic(counting()),
        ]);

        assert!(doc.render(&String::new()).is_err());
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_shortcode_accessors() {
        let node = Node::Atomic(Shortcode::new(
            "img",
            Arguments::parse("a.png alt=x"),
            handler(|_, _, _, _| Ok(String::new())),
        ));
        let shortcode = node.shortcode().unwrap();
        assert_eq!(shortcode.tag(), "img");
        assert_eq!(shortcode.pargs(), ["a.png"]);
        assert_eq!(shortcode.kwargs().get("alt").map(String::as_str), Some("x"));
        assert!(Node::<String>::Text(String::new()).shortcode().is_none());
    }
}
