//! Error types for parsing and rendering shortcodes.

/// Boxed error returned by shortcode handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Unbalanced block tags.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NestingError {
    /// An end-tag appeared while no block was open.
    #[error("not expecting '{found}'")]
    NotExpecting {
        /// The end-tag that was found.
        found: String,
    },
    /// An end-tag closed a block other than the innermost open one.
    #[error("expecting '{expected}', found '{found}'")]
    Mismatch {
        /// End-tag of the innermost open block.
        expected: String,
        /// The end-tag that was found.
        found: String,
    },
    /// Input ended while a block was still open.
    #[error("expecting '{expected}'")]
    Unterminated {
        /// End-tag of the innermost open block.
        expected: String,
    },
}

/// Error raised while parsing or rendering shortcodes.
#[derive(Debug, thiserror::Error)]
pub enum ShortcodeError {
    /// Block tags are not properly opened and closed.
    #[error("nesting error: {0}")]
    Nesting(#[from] NestingError),
    /// A shortcode names a tag that is not registered.
    #[error("'{tag}' is not a recognised shortcode tag")]
    InvalidTag {
        /// The unrecognised tag name.
        tag: String,
    },
    /// A handler failed while rendering.
    #[error("error rendering '{tag}' shortcode")]
    Rendering {
        /// Tag of the shortcode whose handler failed.
        tag: String,
        /// The error returned by the handler.
        #[source]
        source: BoxError,
    },
    /// Parser delimiters cannot be used for tokenizing.
    #[error("invalid delimiters: {0}")]
    InvalidDelimiters(String),
}

impl ShortcodeError {
    /// Tag involved in the error, if any.
    ///
    /// For nesting errors this is the tag that was found, or the expected
    /// end-tag when the input ended early.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Nesting(
                NestingError::NotExpecting { found } | NestingError::Mismatch { found, .. },
            ) => Some(found.as_str()),
            Self::Nesting(NestingError::Unterminated { expected }) => Some(expected.as_str()),
            Self::InvalidTag { tag } | Self::Rendering { tag, .. } => Some(tag.as_str()),
            Self::InvalidDelimiters(_) => None,
        }
    }
}
