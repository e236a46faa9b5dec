//! Configuration for shortcodes.
//!
//! Parses `shortcodes.toml` files with serde and builds ready-to-use
//! [`Parser`]s whose tags are rendered from templates.
//!
//! ## File format
//!
//! ```toml
//! [parser]
//! start = "[%"
//! end = "%]"
//! escape = "\\"
//!
//! [shortcodes.global]
//! year = "2024"
//!
//! [shortcodes.main]
//! hello = "<p>Hello {{ name }}</p>"
//! ```
//!
//! Entries of the `global` section are registered for every section; entries
//! of the requested section (default `main`) replace global ones with the
//! same tag.

mod template;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use minijinja::Environment;
use serde::{Deserialize, Serialize};
use shortcodes::{Parser, ParserConfig, ShortcodeError};

pub use template::TemplateHandler;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "shortcodes.toml";

/// Section whose entries apply to every section.
pub const GLOBAL_SECTION: &str = "global";

/// Section used when none is requested.
pub const DEFAULT_SECTION: &str = "main";

/// Shortcodes configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Delimiters.
    pub parser: ParserConfig,
    /// Template sources by section, then by tag.
    pub shortcodes: BTreeMap<String, BTreeMap<String, String>>,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Parser construction error.
    #[error(transparent)]
    Shortcode(#[from] ShortcodeError),
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise searches
    /// for `shortcodes.toml` in the current directory and its parents, and
    /// falls back to the default configuration.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, or reading,
    /// parsing or validation fails.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::load_from_file(path);
        }

        let discovered = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::discover(&cwd));
        match discovered {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Search for `shortcodes.toml` in `start` and its parents.
    pub fn discover(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILENAME))
            .find(|candidate| candidate.exists())
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.config_path = Some(path.to_path_buf());

        tracing::debug!(
            path = %path.display(),
            sections = config.shortcodes.len(),
            "Loaded shortcodes configuration"
        );

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after parsing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_parser()?;
        self.validate_shortcodes()?;
        Ok(())
    }

    /// Validate delimiters.
    fn validate_parser(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.parser.start, "parser.start")?;
        require_non_empty(&self.parser.end, "parser.end")?;
        Ok(())
    }

    /// Validate tag names.
    fn validate_shortcodes(&self) -> Result<(), ConfigError> {
        for (section, entries) in &self.shortcodes {
            for tag in entries.keys() {
                require_non_empty(tag, &format!("shortcodes.{section} tag name"))?;
                if tag.contains(char::is_whitespace) {
                    return Err(ConfigError::Validation(format!(
                        "shortcodes.{section}: tag '{tag}' cannot contain whitespace"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Names of the configured sections.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.shortcodes.keys().map(String::as_str)
    }

    /// Entries registered for `section`, in registration order.
    ///
    /// Global entries come first, followed by the section's own entries, so
    /// registering them in order lets the section override global tags.
    pub fn entries(&self, section: &str) -> Vec<(&str, &str)> {
        let mut names = vec![GLOBAL_SECTION];
        if section != GLOBAL_SECTION {
            names.push(section);
        }

        names
            .into_iter()
            .filter_map(|name| self.shortcodes.get(name))
            .flat_map(|entries| {
                entries
                    .iter()
                    .map(|(tag, template)| (tag.as_str(), template.as_str()))
            })
            .collect()
    }

    /// Build a parser for [`DEFAULT_SECTION`] with a default template environment.
    pub fn parser<C: Serialize + 'static>(&self) -> Result<Parser<C>, ConfigError> {
        self.parser_for_section(DEFAULT_SECTION, Arc::new(Environment::new()))
    }

    /// Build a parser for `section`.
    ///
    /// Uses the configured delimiters and the process-wide registry for `C`.
    /// Every entry becomes a [`TemplateHandler`] rendered with `env`.
    pub fn parser_for_section<C: Serialize + 'static>(
        &self,
        section: &str,
        env: Arc<Environment<'static>>,
    ) -> Result<Parser<C>, ConfigError> {
        if section != GLOBAL_SECTION && !self.shortcodes.contains_key(section) {
            tracing::debug!(section, "Shortcodes section not configured, using global entries");
        }

        let mut parser = Parser::with_config(self.parser.clone())?;
        for (tag, template) in self.entries(section) {
            let handler = TemplateHandler::with_environment(template, Arc::clone(&env));
            parser.register_handler(Arc::new(handler), tag, None);
        }

        Ok(parser)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    const SAMPLE: &str = r#"
[shortcodes.global]
year = "2024"
greet = "global {{ name }}"

[shortcodes.main]
greet = "<p>Hello {{ name }}</p>"
image = '<img src="{{ src }}">'

[shortcodes.blog]
image = '<figure><img src="{{ src }}"></figure>'
"#;

    #[derive(Serialize)]
    struct NoContext;

    fn assert_validation_error(toml: &str, expected: &[&str]) {
        let err = Config::from_toml_str(toml).unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        let msg = err.to_string();
        for part in expected {
            assert!(msg.contains(part), "{msg:?} should contain {part:?}");
        }
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.parser, ParserConfig::default());
        assert!(config.shortcodes.is_empty());
        assert!(config.config_path.is_none());
    }

    #[test]
    fn test_parse_parser_config() {
        let toml = r#"
[parser]
start = "{{<"
end = ">}}"
"#;
        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.parser.start, "{{<");
        assert_eq!(config.parser.end, ">}}");
        assert_eq!(config.parser.escape, "\\");
    }

    #[test]
    fn test_sections() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.sections().collect::<Vec<_>>(), vec!["blog", "global", "main"]);
    }

    #[test]
    fn test_entries_global_first() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(
            config.entries("main"),
            vec![
                ("greet", "global {{ name }}"),
                ("year", "2024"),
                ("greet", "<p>Hello {{ name }}</p>"),
                ("image", "<img src=\"{{ src }}\">"),
            ]
        );
        assert_eq!(
            config.entries("global"),
            vec![("greet", "global {{ name }}"), ("year", "2024")]
        );
        assert_eq!(config.entries("missing").len(), 2);
    }

    #[test]
    fn test_parser_for_default_section() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        let parser = config.parser::<NoContext>().unwrap();

        let html = parser
            .parse("[% greet name=Ann %] [% image src=a.png %] ([% year %])", &NoContext)
            .unwrap();
        assert_eq!(html, "<p>Hello Ann</p> <img src=\"a.png\"> (2024)");
    }

    #[test]
    fn test_handlers_bind_their_own_template() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        let parser = config
            .parser_for_section::<NoContext>("blog", Arc::new(Environment::new()))
            .unwrap();

        let html = parser
            .parse("[% image src=b.png %][% greet name=Bo %][% year %]", &NoContext)
            .unwrap();
        assert_eq!(html, "<figure><img src=\"b.png\"></figure>global Bo2024");
    }

    #[test]
    fn test_unknown_section_uses_global_only() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        let parser = config
            .parser_for_section::<NoContext>("missing", Arc::new(Environment::new()))
            .unwrap();

        assert_eq!(parser.parse("[% year %]", &NoContext).unwrap(), "2024");
        assert!(matches!(
            parser.parse("[% image %]", &NoContext).unwrap_err(),
            ShortcodeError::InvalidTag { .. }
        ));
    }

    #[test]
    fn test_context_reaches_templates() {
        let config = Config::from_toml_str(
            r#"
[shortcodes.main]
link = '<a href="{{ site }}/{{ path }}">{{ label }}</a>'
"#,
        )
        .unwrap();
        let parser = config.parser::<BTreeMap<String, String>>().unwrap();
        let ctx = BTreeMap::from([("site".to_owned(), "https://example.org".to_owned())]);

        let html = parser
            .parse(r#"[% link path=docs label="Read the docs" %]"#, &ctx)
            .unwrap();
        assert_eq!(html, "<a href=\"https://example.org/docs\">Read the docs</a>");
    }

    #[test]
    fn test_parser_uses_configured_delimiters() {
        let config = Config::from_toml_str(
            r#"
[parser]
start = "<<"
end = ">>"
escape = "!"

[shortcodes.main]
x = "X"
"#,
        )
        .unwrap();
        let parser = config.parser::<NoContext>().unwrap();

        assert_eq!(
            parser.parse("<< x >> !<< x >> [% x %]", &NoContext).unwrap(),
            "X << x >> [% x %]"
        );
    }

    #[test]
    fn test_validate_empty_start() {
        assert_validation_error("[parser]\nstart = \"\"\n", &["parser.start", "empty"]);
    }

    #[test]
    fn test_validate_empty_end() {
        assert_validation_error("[parser]\nend = \"\"\n", &["parser.end", "empty"]);
    }

    #[test]
    fn test_validate_tag_with_whitespace() {
        assert_validation_error(
            "[shortcodes.main]\n\"two words\" = \"x\"\n",
            &["shortcodes.main", "two words", "whitespace"],
        );
    }

    #[test]
    fn test_validate_empty_tag() {
        assert_validation_error(
            "[shortcodes.global]\n\"\" = \"x\"\n",
            &["shortcodes.global", "empty"],
        );
    }

    #[test]
    fn test_parse_error() {
        let err = Config::from_toml_str("[shortcodes.main]\nx = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, SAMPLE).unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.config_path, Some(path));
        assert_eq!(config.entries("blog").len(), 3);
    }

    #[test]
    fn test_load_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let err = Config::load(Some(path.as_path())).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
        assert!(err.to_string().contains("missing.toml"));
    }

    #[test]
    fn test_discover_in_parent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), SAMPLE).unwrap();

        assert_eq!(
            Config::discover(&nested),
            Some(dir.path().join(CONFIG_FILENAME))
        );
    }

    #[test]
    fn test_discover_none() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("empty");
        fs::create_dir_all(&nested).unwrap();

        // Only meaningful when no ancestor of the temp dir has a config file
        if dir.path().ancestors().skip(1).all(|d| !d.join(CONFIG_FILENAME).exists()) {
            assert_eq!(Config::discover(&nested), None);
        }
    }
}
