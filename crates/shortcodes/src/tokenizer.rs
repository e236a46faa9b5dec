//! Splitting input into text and shortcode tokens.

use regex::Regex;

use crate::error::ShortcodeError;

/// Delimiters recognized by a [`Parser`](crate::Parser).
///
/// # Example
///
/// ```
/// use shortcodes::ParserConfig;
///
/// let config = ParserConfig::new().with_start("{{%").with_end("%}}");
/// assert_eq!(config.escape, "\\");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct ParserConfig {
    /// Opening delimiter of a shortcode.
    ///
    /// Default: `[%`
    pub start: String,
    /// Closing delimiter of a shortcode.
    ///
    /// Default: `%]`
    pub end: String,
    /// Prefix that turns a shortcode into literal text.
    ///
    /// Default: `\`
    pub escape: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserConfig {
    /// Create a configuration with the default delimiters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: "[%".to_owned(),
            end: "%]".to_owned(),
            escape: "\\".to_owned(),
        }
    }

    /// Set the opening delimiter.
    #[must_use]
    pub fn with_start(mut self, start: impl Into<String>) -> Self {
        self.start = start.into();
        self
    }

    /// Set the closing delimiter.
    #[must_use]
    pub fn with_end(mut self, end: impl Into<String>) -> Self {
        self.end = end.into();
        self
    }

    /// Set the escape prefix. An empty prefix disables escaping.
    #[must_use]
    pub fn with_escape(mut self, escape: impl Into<String>) -> Self {
        self.escape = escape.into();
        self
    }

    /// Check that the delimiters can be tokenized.
    pub fn validate(&self) -> Result<(), ShortcodeError> {
        if self.start.is_empty() {
            return Err(ShortcodeError::InvalidDelimiters(
                "start delimiter cannot be empty".to_owned(),
            ));
        }
        if self.end.is_empty() {
            return Err(ShortcodeError::InvalidDelimiters(
                "end delimiter cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// A piece of input text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Literal text between shortcodes.
    Text(&'a str),
    /// Shortcode; holds the text between the delimiters, untrimmed.
    Shortcode(&'a str),
    /// Escaped shortcode; holds the token without its escape prefix.
    Escaped(&'a str),
}

/// Splits input into [`Token`]s.
///
/// A shortcode runs from a start delimiter to the nearest following end
/// delimiter on the same line. Nested delimiters are not balanced here; the
/// parser builds nesting from block tags instead.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    regex: Regex,
    start_len: usize,
    end_len: usize,
    escape_len: usize,
}

impl Tokenizer {
    /// Build a tokenizer for the given delimiters.
    pub fn new(config: &ParserConfig) -> Result<Self, ShortcodeError> {
        config.validate()?;

        let escape = if config.escape.is_empty() {
            String::new()
        } else {
            format!("({})?", regex::escape(&config.escape))
        };
        let pattern = format!(
            "{escape}{}.*?{}",
            regex::escape(&config.start),
            regex::escape(&config.end)
        );
        let regex =
            Regex::new(&pattern).map_err(|e| ShortcodeError::InvalidDelimiters(e.to_string()))?;

        Ok(Self {
            regex,
            start_len: config.start.len(),
            end_len: config.end.len(),
            escape_len: config.escape.len(),
        })
    }

    /// Split `text` into tokens. Empty text runs are dropped.
    pub fn tokenize<'a>(&self, text: &'a str) -> Vec<Token<'a>> {
        let mut tokens = Vec::new();
        let mut last = 0;

        for caps in self.regex.captures_iter(text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };

            if whole.start() > last {
                tokens.push(Token::Text(&text[last..whole.start()]));
            }

            let raw = whole.as_str();
            if caps.get(1).is_some() {
                tokens.push(Token::Escaped(&raw[self.escape_len..]));
            } else {
                tokens.push(Token::Shortcode(
                    &raw[self.start_len..raw.len() - self.end_len],
                ));
            }

            last = whole.end();
        }

        if last < text.len() {
            tokens.push(Token::Text(&text[last..]));
        }

        tokens
    }
}
