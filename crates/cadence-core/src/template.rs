//! Argument templating.
//!
//! Arguments may reference job parameters as `{{.name}}` (whitespace inside
//! the braces is allowed). Anything else inside `{{ }}` is unsupported.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::TemplateError;

static ACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(.*?)\}\}").expect("action pattern is valid"));

static BINDING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\.([A-Za-z_][A-Za-z0-9_]*)\s*$").expect("binding pattern is valid")
});

/// Render `template` against `params`.
pub fn render(template: &str, params: &BTreeMap<String, String>) -> Result<String, TemplateError> {
    if !template.contains("{{") {
        return Ok(template.to_string());
    }

    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;

    for caps in ACTION.captures_iter(template) {
        let (Some(action), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        rendered.push_str(&template[last..action.start()]);

        let name = BINDING
            .captures(inner.as_str())
            .and_then(|binding| binding.get(1))
            .ok_or_else(|| TemplateError::InvalidAction(inner.as_str().trim().to_string()))?
            .as_str();
        let value = params
            .get(name)
            .ok_or_else(|| TemplateError::MissingParam(name.to_string()))?;
        rendered.push_str(value);

        last = action.end();
    }

    let tail = &template[last..];
    if let Some(pos) = tail.find("{{") {
        return Err(TemplateError::Unclosed(last + pos));
    }
    rendered.push_str(tail);

    Ok(rendered)
}

/// Render `template`, or hand it back untouched when rendering fails.
pub fn render_or_literal(template: &str, params: &BTreeMap<String, String>) -> String {
    match render(template, params) {
        Ok(rendered) => rendered,
        Err(e) => {
            debug!(argument = template, error = %e, "Template not rendered, passing literally");
            template.to_string()
        }
    }
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
