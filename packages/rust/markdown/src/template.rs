//! Minimal page templates.
//!
//! Supports `{{field}}` (HTML-escaped), `{{{field}}}` (verbatim) and a single
//! repetition block, `{{#each list}}...{{/each}}`, whose body is rendered once
//! per list element with fields resolved against that element.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use sitesync_shared::{Result, SiteSyncError};

/// Name of the per-example page template.
pub const EXAMPLE_TEMPLATE: &str = "example";

/// Name of the examples index template.
pub const INDEX_TEMPLATE: &str = "index";

const EXAMPLE_BODY: &str = "# {{title}}\n\n\
    Raw file: [{{url}}]({{url}})\n\n\
    ```{{type}}\n\
    {{{code}}}\
    ```\n";

const INDEX_BODY: &str = "# Examples\n\n\
    {{#each files}}- [{{title}}]({{url}})\n{{/each}}\
    \n\
    # Browser examples\n\n\
    {{#each browserFiles}}- [{{title}}]({{url}})\n{{/each}}";

// ---------------------------------------------------------------------------
// Parsed template
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Field { name: String, escape: bool },
    Each { list: String, body: Vec<Node> },
}

/// A parsed template.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    nodes: Vec<Node>,
}

impl Template {
    /// Parse `source`. Unbalanced or unsupported blocks are errors.
    pub fn parse(name: &str, source: &str) -> Result<Self> {
        // Each frame is an open `each` block: (list name, nodes so far).
        let mut stack: Vec<(Option<String>, Vec<Node>)> = vec![(None, Vec::new())];
        let mut rest = source;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                push_node(&mut stack, Node::Text(rest[..start].to_string()));
            }
            let after = &rest[start..];

            if let Some(inner) = after.strip_prefix("{{{") {
                let end = inner
                    .find("}}}")
                    .ok_or_else(|| SiteSyncError::template(name, "unclosed `{{{`"))?;
                let field = parse_field_name(name, &inner[..end])?;
                push_node(&mut stack, Node::Field { name: field, escape: false });
                rest = &inner[end + 3..];
                continue;
            }

            let inner = &after[2..];
            let end = inner
                .find("}}")
                .ok_or_else(|| SiteSyncError::template(name, "unclosed `{{`"))?;
            let tag = inner[..end].trim();
            rest = &inner[end + 2..];

            if let Some(list) = tag.strip_prefix("#each ") {
                let list = parse_field_name(name, list)?;
                stack.push((Some(list), Vec::new()));
            } else if tag == "/each" {
                if stack.len() < 2 {
                    return Err(SiteSyncError::template(name, "`{{/each}}` without `{{#each}}`"));
                }
                let (list, body) = stack.pop().unwrap_or_default();
                let list = list.unwrap_or_default();
                push_node(&mut stack, Node::Each { list, body });
            } else if tag.starts_with('#') || tag.starts_with('/') {
                return Err(SiteSyncError::template(
                    name,
                    format!("unsupported block `{{{{{tag}}}}}`"),
                ));
            } else {
                let field = parse_field_name(name, tag)?;
                push_node(&mut stack, Node::Field { name: field, escape: true });
            }
        }

        if !rest.is_empty() {
            push_node(&mut stack, Node::Text(rest.to_string()));
        }

        if stack.len() != 1 {
            return Err(SiteSyncError::template(name, "unclosed `{{#each}}` block"));
        }
        let (_, nodes) = stack.pop().unwrap_or_default();

        Ok(Self {
            name: name.to_string(),
            nodes,
        })
    }

    /// Render against a JSON object context.
    pub fn render(&self, context: &Value) -> Result<String> {
        let mut out = String::new();
        self.render_nodes(&self.nodes, context, &mut out)?;
        Ok(out)
    }

    fn render_nodes(&self, nodes: &[Node], scope: &Value, out: &mut String) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Field { name, escape } => {
                    let value = self.scalar(scope, name)?;
                    if *escape {
                        escape_html(&value, out);
                    } else {
                        out.push_str(&value);
                    }
                }
                Node::Each { list, body } => {
                    let items = scope
                        .get(list)
                        .ok_or_else(|| self.missing(list))?
                        .as_array()
                        .ok_or_else(|| {
                            SiteSyncError::template(&self.name, format!("field `{list}` is not a list"))
                        })?;
                    for item in items {
                        self.render_nodes(body, item, out)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn scalar(&self, scope: &Value, field: &str) -> Result<String> {
        match scope.get(field) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(Value::Bool(b)) => Ok(b.to_string()),
            Some(Value::Null) | None => Err(self.missing(field)),
            Some(_) => Err(SiteSyncError::template(
                &self.name,
                format!("field `{field}` is not a scalar value"),
            )),
        }
    }

    fn missing(&self, field: &str) -> SiteSyncError {
        SiteSyncError::template(&self.name, format!("missing required field `{field}`"))
    }
}

fn push_node(stack: &mut [(Option<String>, Vec<Node>)], node: Node) {
    if let Some((_, nodes)) = stack.last_mut() {
        nodes.push(node);
    }
}

fn parse_field_name(template: &str, raw: &str) -> Result<String> {
    let name = raw.trim();
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(SiteSyncError::template(
            template,
            format!("invalid field name `{name}`"),
        ));
    }
    Ok(name.to_string())
}

/// Escape the same characters Handlebars-style templates escape.
fn escape_html(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '`' => out.push_str("&#x60;"),
            '=' => out.push_str("&#x3D;"),
            _ => out.push(c),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Named templates, parsed once and rendered many times.
#[derive(Debug, Clone, Default)]
pub struct TemplateRenderer {
    templates: BTreeMap<String, Template>,
}

impl TemplateRenderer {
    /// An empty renderer.
    pub fn new() -> Self {
        Self::default()
    }

    /// A renderer holding the example page and index templates, each
    /// starting with `layout_header`.
    pub fn with_site_templates(layout_header: &str) -> Result<Self> {
        let mut renderer = Self::new();
        renderer.register(EXAMPLE_TEMPLATE, &format!("{layout_header}{EXAMPLE_BODY}"))?;
        renderer.register(INDEX_TEMPLATE, &format!("{layout_header}{INDEX_BODY}"))?;
        Ok(renderer)
    }

    /// Parse and register a template under `name`, replacing any previous one.
    pub fn register(&mut self, name: &str, source: &str) -> Result<()> {
        let template = Template::parse(name, source)?;
        debug!(template = name, "registered template");
        self.templates.insert(name.to_string(), template);
        Ok(())
    }

    /// Render the template `name` against `context`.
    pub fn render(&self, name: &str, context: &Value) -> Result<String> {
        self.templates
            .get(name)
            .ok_or_else(|| SiteSyncError::template(name, "no template registered under this name"))?
            .render(context)
    }
}
