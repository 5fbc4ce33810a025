//! `${VAR}` expansion for chart value templates
//!
//! Rendering uses minijinja with `${...}` as the variable delimiter, so
//! filters such as `${ORGANIZATION|tojson}` are available. `$${` renders a
//! literal `${`. Undefined variables are errors.

use std::collections::BTreeMap;

use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, UndefinedBehavior};

use crate::{Error, Result};

/// Variables available to a template
pub type TemplateVars = BTreeMap<String, String>;

/// Placeholder for escaped `$${` during rendering
const ESCAPED_PLACEHOLDER: &str = "\x00__CLUSTER_OPERATOR_ESCAPED_DOLLAR_BRACE__\x00";

fn environment<'s>() -> Result<Environment<'s>> {
    let syntax = SyntaxConfig::builder()
        .variable_delimiters("${", "}")
        .block_delimiters("{%", "%}")
        .comment_delimiters("{#", "#}")
        .build()
        .map_err(|e| Error::template(format!("invalid template syntax config: {}", e)))?;

    let mut env = Environment::new();
    env.set_syntax(syntax);
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    Ok(env)
}

fn render_error(err: minijinja::Error) -> Error {
    Error::template(err.to_string())
}

/// Expand every `${NAME}` placeholder in `template`
///
/// Fails on malformed placeholders and on names missing from `vars`,
/// so a typo in a template never ships an empty value into a tenant cluster.
pub fn expand(template: &str, vars: &TemplateVars) -> Result<String> {
    let source = template.replace("$${", ESCAPED_PLACEHOLDER);
    let env = environment()?;
    let compiled = env.template_from_str(&source).map_err(render_error)?;

    let unknown = compiled
        .undeclared_variables(false)
        .into_iter()
        .filter(|name| !vars.contains_key(name))
        .min();
    if let Some(name) = unknown {
        return Err(Error::template(format!("unknown variable ${{{}}}", name)));
    }

    let rendered = compiled.render(vars).map_err(render_error)?;
    Ok(rendered.replace(ESCAPED_PLACEHOLDER, "${"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> TemplateVars {
        TemplateVars::from([
            ("API_DOMAIN".to_string(), "api.al9qy.k8s.example.com".to_string()),
            ("WORKER_COUNT".to_string(), "3".to_string()),
            ("ORGANIZATION".to_string(), r#"acme "labs" \ co"#.to_string()),
        ])
    }

    #[test]
    fn replaces_all_placeholders() {
        let out = expand(
            r#"{"api":"${API_DOMAIN}","replicas":${WORKER_COUNT},"again":"${API_DOMAIN}"}"#,
            &vars(),
        )
        .unwrap();
        assert_eq!(
            out,
            r#"{"api":"api.al9qy.k8s.example.com","replicas":3,"again":"api.al9qy.k8s.example.com"}"#
        );
    }

    #[test]
    fn text_without_placeholders_is_unchanged() {
        let text = "price: $5 and {braces}";
        assert_eq!(expand(text, &vars()).unwrap(), text);
    }

    #[test]
    fn escaped_placeholder_renders_literally() {
        let out = expand("literal: $${API_DOMAIN}, value: ${API_DOMAIN}", &vars()).unwrap();
        assert_eq!(out, "literal: ${API_DOMAIN}, value: api.al9qy.k8s.example.com");
    }

    #[test]
    fn tojson_quotes_and_escapes_strings() {
        let out = expand(r#"{"organization":${ORGANIZATION|tojson}}"#, &vars()).unwrap();
        assert_eq!(out, r#"{"organization":"acme \"labs\" \\ co"}"#);
    }

    #[test]
    fn unknown_variable_is_an_error() {
        let err = expand("${NOPE}", &vars()).unwrap_err();
        assert!(matches!(err, Error::Template { .. }));
        assert!(err.to_string().contains("${NOPE}"));
    }

    #[test]
    fn unterminated_placeholder_is_an_error() {
        let err = expand("a: ${API_DOMAIN", &vars()).unwrap_err();
        assert!(matches!(err, Error::Template { .. }));
    }
}
