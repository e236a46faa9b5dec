//! WordPress-style shortcodes with pluggable tag handlers.
//!
//! Text is scanned for shortcode tokens (`[% tag arg key=value %]` by
//! default), parsed into a tree of text and shortcode nodes, and rendered by
//! calling the handler registered for each tag.
//!
//! # Architecture
//!
//! - [`Tokenizer`]: splits input into text, shortcode and escaped tokens
//! - [`Arguments`]: positional and keyword arguments of a shortcode
//! - [`Registry`]: handlers by tag, with end-tags for block shortcodes
//! - [`Parser`]: builds a [`Document`] while checking block nesting
//! - [`Node`]: text, atomic and block nodes, rendered depth-first
//!
//! Block shortcodes wrap content up to their end-tag; the content is rendered
//! first and passed to the block's handler. An escape prefix (`\` by default)
//! before a shortcode turns it into literal text.
//!
//! # Example
//!
//! ```
//! use shortcodes::{Parser, ShortcodeError};
//!
//! let parser: Parser = Parser::new()
//!     .with_tag("image", |_, _, _, kwargs| {
//!         Ok(format!("<img src=\"{}\">", kwargs.get("src").map_or("", String::as_str)))
//!     })
//!     .with_block("note", "endnote", |_, content, _, _| {
//!         Ok(format!("<aside>{}</aside>", content.unwrap_or_default()))
//!     });
//!
//! let html = parser
//!     .parse("[% note %][% image src=a.png %][% endnote %] \\[% image %]", &())
//!     .unwrap();
//! assert_eq!(html, "<aside><img src=\"a.png\"></aside> [% image %]");
//!
//! let err = parser.parse("[% note %]unclosed", &()).unwrap_err();
//! assert!(matches!(err, ShortcodeError::Nesting(_)));
//! ```

mod args;
mod error;
mod escape;
mod node;
mod parser;
mod registry;
mod tokenizer;

pub use args::{Arguments, Kwargs};
pub use error::{BoxError, NestingError, ShortcodeError};
pub use escape::decode_escapes;
pub use node::{Document, Node, Shortcode};
pub use parser::Parser;
pub use registry::{
    Handler, HandlerResult, Registration, Registry, SharedRegistry, process_registry, register,
};
pub use tokenizer::{ParserConfig, Token, Tokenizer};
