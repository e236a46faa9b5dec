//! Tag registries.
//!
//! A [`Registry`] maps tag names to handlers and records the end-tags of
//! block shortcodes. Every [`Parser`](crate::Parser) owns one, and can also
//! consult a [`SharedRegistry`] whose entries it merges with its own at the
//! start of each parse (own entries win).
//!
//! One shared registry exists per context type for the whole process, see
//! [`process_registry`] and [`register`].

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use crate::args::Kwargs;
use crate::error::BoxError;

/// Value returned by shortcode handlers.
pub type HandlerResult = Result<String, BoxError>;

/// Renders a shortcode.
///
/// Receives the caller's context, the rendered content of a block shortcode
/// (`None` for atomic shortcodes), positional and keyword arguments.
///
/// Implemented for every `Fn(&C, Option<&str>, &[String], &Kwargs) -> HandlerResult`
/// closure that is `Send + Sync`.
pub trait Handler<C>: Send + Sync {
    /// Render one shortcode occurrence.
    fn render(
        &self,
        ctx: &C,
        content: Option<&str>,
        pargs: &[String],
        kwargs: &Kwargs,
    ) -> HandlerResult;
}

impl<C, F> Handler<C> for F
where
    F: Fn(&C, Option<&str>, &[String], &Kwargs) -> HandlerResult + Send + Sync,
{
    fn render(
        &self,
        ctx: &C,
        content: Option<&str>,
        pargs: &[String],
        kwargs: &Kwargs,
    ) -> HandlerResult {
        self(ctx, content, pargs, kwargs)
    }
}

/// A registered handler and the end-tag it requires, if any.
pub struct Registration<C> {
    handler: Arc<dyn Handler<C>>,
    end_tag: Option<String>,
}

impl<C> Registration<C> {
    /// The handler invoked for this tag.
    pub fn handler(&self) -> &Arc<dyn Handler<C>> {
        &self.handler
    }

    /// End-tag closing this shortcode, `None` for atomic shortcodes.
    pub fn end_tag(&self) -> Option<&str> {
        self.end_tag.as_deref()
    }

    /// Returns `true` if this is a block shortcode.
    pub fn is_block(&self) -> bool {
        self.end_tag.is_some()
    }
}

impl<C> Clone for Registration<C> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            end_tag: self.end_tag.clone(),
        }
    }
}

impl<C> fmt::Debug for Registration<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("end_tag", &self.end_tag)
            .finish_non_exhaustive()
    }
}

/// Handlers indexed by tag, plus the list of known end-tags.
pub struct Registry<C> {
    tags: HashMap<String, Registration<C>>,
    ends: Vec<String>,
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for Registry<C> {
    fn clone(&self) -> Self {
        Self {
            tags: self.tags.clone(),
            ends: self.ends.clone(),
        }
    }
}

impl<C> fmt::Debug for Registry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("tags", &self.tags)
            .field("ends", &self.ends)
            .finish()
    }
}

impl<C> Registry<C> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tags: HashMap::new(),
            ends: Vec::new(),
        }
    }

    /// Register a handler closure for `tag`.
    ///
    /// Replaces any previous registration of the same tag. When `end_tag` is
    /// given (and non-empty) the tag opens a block closed by `end_tag`.
    pub fn register<F>(&mut self, handler: F, tag: impl Into<String>, end_tag: Option<&str>)
    where
        F: Fn(&C, Option<&str>, &[String], &Kwargs) -> HandlerResult + Send + Sync + 'static,
    {
        self.register_handler(Arc::new(handler), tag, end_tag);
    }

    /// Register a shared handler object for `tag`.
    pub fn register_handler(
        &mut self,
        handler: Arc<dyn Handler<C>>,
        tag: impl Into<String>,
        end_tag: Option<&str>,
    ) {
        let tag = tag.into();
        let end_tag = end_tag.filter(|end| !end.is_empty()).map(str::to_owned);

        if let Some(end) = &end_tag {
            self.ends.push(end.clone());
        }
        tracing::trace!(tag = %tag, end_tag = ?end_tag, "Registered shortcode");
        self.tags.insert(tag, Registration { handler, end_tag });
    }

    /// Look up the registration for `tag`.
    pub fn get(&self, tag: &str) -> Option<&Registration<C>> {
        self.tags.get(tag)
    }

    /// Returns `true` if `tag` is registered.
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }

    /// Returns `true` if `tag` closes some registered block shortcode.
    pub fn is_end_tag(&self, tag: &str) -> bool {
        self.ends.iter().any(|end| end == tag)
    }

    /// End-tags in registration order (duplicates included).
    pub fn end_tags(&self) -> &[String] {
        &self.ends
    }

    /// Registered tag names, in no particular order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    /// Number of registered tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns `true` if no tag is registered.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Remove all registrations and end-tags.
    pub fn clear(&mut self) {
        self.tags.clear();
        self.ends.clear();
    }

    /// Combine `self` with `overrides`.
    ///
    /// Entries of `overrides` replace entries of `self` with the same tag;
    /// the end-tag lists are concatenated.
    #[must_use]
    pub fn merged(&self, overrides: &Self) -> Self {
        let mut tags = self.tags.clone();
        tags.extend(
            overrides
                .tags
                .iter()
                .map(|(tag, registration)| (tag.clone(), registration.clone())),
        );
        let ends = self.ends.iter().chain(&overrides.ends).cloned().collect();

        Self { tags, ends }
    }
}

/// Registry shared between parsers.
///
/// Parsers take a read lock only while merging at the start of a parse, so
/// registrations made between parses are picked up by the next one.
pub type SharedRegistry<C> = Arc<RwLock<Registry<C>>>;

/// Process-wide registries, one per context type.
static PROCESS_REGISTRIES: LazyLock<RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Process-wide registry for handlers taking context type `C`.
///
/// Created empty on first use and shared by every [`Parser::new`](crate::Parser::new)
/// with the same context type.
pub fn process_registry<C: 'static>() -> SharedRegistry<C> {
    let key = TypeId::of::<C>();
    let mut registries = PROCESS_REGISTRIES
        .write()
        .unwrap_or_else(PoisonError::into_inner);

    if let Some(existing) = registries
        .get(&key)
        .and_then(|entry| entry.downcast_ref::<SharedRegistry<C>>())
    {
        return Arc::clone(existing);
    }

    let registry = SharedRegistry::<C>::default();
    registries.insert(key, Box::new(Arc::clone(&registry)));
    registry
}

/// Register a handler in the process-wide registry for context type `C`.
///
/// Same semantics as [`Registry::register`]. Parsers created afterwards with
/// [`Parser::new`](crate::Parser::new) see the tag unless they register their
/// own handler for it.
///
/// # Example
///
/// ```
/// use shortcodes::{Parser, register};
///
/// struct Site;
///
/// register::<Site, _>(|_, _, _, _| Ok("&copy; 2024".to_owned()), "copyright", None);
///
/// let parser = Parser::<Site>::new();
/// assert_eq!(parser.parse("[% copyright %]", &Site).unwrap(), "&copy; 2024");
/// ```
pub fn register<C, F>(handler: F, tag: impl Into<String>, end_tag: Option<&str>)
where
    C: 'static,
    F: Fn(&C, Option<&str>, &[String], &Kwargs) -> HandlerResult + Send + Sync + 'static,
{
    process_registry::<C>()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(handler, tag, end_tag);
}
