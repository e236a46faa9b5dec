//! Template-backed shortcode handlers.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use minijinja::value::{Value, ValueKind};
use minijinja::Environment;
use serde::Serialize;
use shortcodes::{Handler, HandlerResult, Kwargs};

/// Environment used when no custom one is supplied.
static DEFAULT_ENV: LazyLock<Arc<Environment<'static>>> =
    LazyLock::new(|| Arc::new(Environment::new()));

/// Handler that renders a minijinja template.
///
/// Template variables are the shortcode's keyword arguments, overlaid with
/// the top-level entries of the render context (context wins on conflict).
/// Positional arguments and block content are not exposed.
///
/// Each handler owns its template source, so handlers created in a loop never
/// share one another's template.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use std::sync::Arc;
/// use shortcodes::Parser;
/// use shortcodes_config::TemplateHandler;
///
/// let mut parser = Parser::<BTreeMap<String, String>>::new();
/// parser.register_handler(
///     Arc::new(TemplateHandler::new("<b>{{ name }}</b> on {{ site }}")),
///     "hello",
///     None,
/// );
///
/// let ctx = BTreeMap::from([("site".to_owned(), "example.org".to_owned())]);
/// let html = parser.parse("[% hello name=Ann %]", &ctx).unwrap();
/// assert_eq!(html, "<b>Ann</b> on example.org");
/// ```
#[derive(Debug, Clone)]
pub struct TemplateHandler {
    source: String,
    env: Arc<Environment<'static>>,
}

impl TemplateHandler {
    /// Create a handler rendering `source` with a default environment.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self::with_environment(source, Arc::clone(&DEFAULT_ENV))
    }

    /// Create a handler rendering `source` with `env` (for custom filters,
    /// globals or syntax).
    #[must_use]
    pub fn with_environment(source: impl Into<String>, env: Arc<Environment<'static>>) -> Self {
        Self {
            source: source.into(),
            env,
        }
    }

    /// The template source.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl<C: Serialize> Handler<C> for TemplateHandler {
    fn render(
        &self,
        ctx: &C,
        _content: Option<&str>,
        _pargs: &[String],
        kwargs: &Kwargs,
    ) -> HandlerResult {
        let mut vars: BTreeMap<String, Value> = kwargs
            .iter()
            .map(|(key, value)| (key.clone(), Value::from(value.as_str())))
            .collect();

        let ctx = Value::from_serialize(ctx);
        if ctx.kind() == ValueKind::Map {
            for key in ctx.try_iter()? {
                if let Some(name) = key.as_str() {
                    vars.insert(name.to_owned(), ctx.get_item(&key)?);
                }
            }
        }

        Ok(self.env.render_str(&self.source, vars)?)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn render(handler: &TemplateHandler, ctx: &impl Serialize, kwargs: &[(&str, &str)]) -> String {
        let kwargs: Kwargs = kwargs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        handler.render(ctx, None, &[], &kwargs).unwrap()
    }

    #[test]
    fn test_renders_kwargs() {
        let handler = TemplateHandler::new("<img src=\"{{ src }}\" alt=\"{{ alt }}\">");
        assert_eq!(
            render(&handler, &(), &[("src", "a.png"), ("alt", "A")]),
            "<img src=\"a.png\" alt=\"A\">"
        );
    }

    #[test]
    fn test_missing_variable_renders_empty() {
        let handler = TemplateHandler::new("[{{ missing }}]");
        assert_eq!(render(&handler, &(), &[]), "[]");
    }

    #[test]
    fn test_context_overrides_kwargs() {
        #[derive(Serialize)]
        struct Ctx {
            name: &'static str,
            site: &'static str,
        }

        let handler = TemplateHandler::new("{{ name }}@{{ site }}/{{ page }}");
        let ctx = Ctx {
            name: "from-context",
            site: "example.org",
        };
        assert_eq!(
            render(&handler, &ctx, &[("name", "from-kwargs"), ("page", "home")]),
            "from-context@example.org/home"
        );
    }

    #[test]
    fn test_non_map_context_ignored() {
        let handler = TemplateHandler::new("{{ x }}");
        assert_eq!(render(&handler, &vec!["x"], &[("x", "1")]), "1");
    }

    #[test]
    fn test_custom_environment() {
        let mut env = Environment::new();
        env.add_filter("shout", |s: String| s.to_uppercase());
        let handler = TemplateHandler::with_environment("{{ word | shout }}", Arc::new(env));

        let ctx: HashMap<String, String> = HashMap::new();
        assert_eq!(render(&handler, &ctx, &[("word", "hey")]), "HEY");
    }

    #[test]
    fn test_template_error_returned() {
        let handler = TemplateHandler::new("{{ unclosed ");
        let result = handler.render(&(), None, &[], &Kwargs::new());
        assert!(result.is_err());
    }
}
