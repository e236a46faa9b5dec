//! Shortcode argument parsing.
//!
//! Parses the text following the tag name: `[% tag a "b c" key=val k2='v' %]`.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::escape::decode_escapes;

/// Keyword arguments passed to handlers.
pub type Kwargs = HashMap<String, String>;

/// Argument grammar, alternatives tried in order at each position:
///
/// 1. optional `key=` followed by a double- or single-quoted value
/// 2. `key=value` with an unquoted value
/// 3. a bare whitespace-delimited token
static ARGS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?x)
        (?:([^\s'"=]+)=)?
        (?:
            "((?:[^\\"]|\\.)*)"
            |
            '((?:[^\\']|\\.)*)'
        )
        |
        ([^\s'"=]+)=(\S+)
        |
        (\S+)
        "#,
    )
    .unwrap()
});

/// Parsed arguments of a single shortcode.
///
/// Quoted values have their backslash escapes decoded; unquoted values are
/// kept exactly as written.
///
/// # Example
///
/// ```
/// use shortcodes::Arguments;
///
/// let args = Arguments::parse(r#"a b key=val "q v" title='Hi \"there\"'"#);
/// assert_eq!(args.positional, vec!["a", "b", "q v"]);
/// assert_eq!(args.get("key"), Some("val"));
/// assert_eq!(args.get("title"), Some(r#"Hi "there""#));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments {
    /// Positional arguments in source order.
    pub positional: Vec<String>,
    /// Keyword arguments; the last occurrence of a key wins.
    pub keyword: Kwargs,
}

impl Arguments {
    /// Parse an argument string.
    #[must_use]
    pub fn parse(argstring: &str) -> Self {
        let mut args = Self::default();

        for caps in ARGS_RE.captures_iter(argstring) {
            if let Some(quoted) = caps.get(2).or_else(|| caps.get(3)) {
                let value = decode_escapes(quoted.as_str());
                match caps.get(1) {
                    Some(key) => {
                        args.keyword.insert(key.as_str().to_owned(), value);
                    }
                    None => args.positional.push(value),
                }
            } else if let (Some(key), Some(value)) = (caps.get(4), caps.get(5)) {
                args.keyword
                    .insert(key.as_str().to_owned(), value.as_str().to_owned());
            } else if let Some(bare) = caps.get(6) {
                args.positional.push(bare.as_str().to_owned());
            }
        }

        args
    }

    /// Get a keyword argument by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.keyword.get(key).map(String::as_str)
    }

    /// Returns `true` if there are no positional and no keyword arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }
}
