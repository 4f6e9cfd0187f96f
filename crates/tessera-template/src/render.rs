//! Template evaluation.

use std::borrow::Cow;

use serde_json::Value;

use crate::{
    error::{FragmentFault, RenderError, RenderErrorKind},
    fragment::Render,
    props::{Props, escape_html, is_truthy, scalar_text, type_name},
    registry::RenderScope,
    syntax::{Arg, Expr, Invocation, Node, Path, PathRoot, Span, Template},
};

type Fault<T> = std::result::Result<T, FragmentFault>;

/// One level of `each` iteration.
struct Frame<'f, 'a> {
    parent: Option<&'f Frame<'f, 'a>>,
    this: Cow<'a, Value>,
    index: usize,
    key: Option<String>,
    len: usize,
}

impl Render for Template {
    fn render(&self, scope: &RenderScope<'_>) -> Fault<String> {
        let mut out = String::new();
        self.eval(self.nodes(), scope, None, &mut out)?;
        Ok(out)
    }
}

impl Template {
    fn eval<'a>(
        &self,
        nodes: &[Node],
        scope: &RenderScope<'a>,
        frame: Option<&Frame<'_, 'a>>,
        out: &mut String,
    ) -> Fault<()> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Output { expr, raw, span } => self.output(expr, *raw, *span, scope, frame, out)?,
                Node::If {
                    cond,
                    negate,
                    then,
                    otherwise,
                    ..
                } => {
                    let truthy = lookup(cond, frame, scope.config()).is_some_and(|v| is_truthy(&v));
                    let branch = if truthy != *negate { then } else { otherwise };
                    self.eval(branch, scope, frame, out)?;
                }
                Node::Each {
                    source,
                    body,
                    otherwise,
                    span,
                } => {
                    let items = match lookup(source, frame, scope.config()) {
                        Some(value) => self.entries(source, value, *span)?,
                        None => Vec::new(),
                    };
                    if items.is_empty() {
                        self.eval(otherwise, scope, frame, out)?;
                        continue;
                    }
                    let len = items.len();
                    for (index, (key, this)) in items.into_iter().enumerate() {
                        let child = Frame {
                            parent: frame,
                            this,
                            index,
                            key,
                            len,
                        };
                        self.eval(body, scope, Some(&child), out)?;
                    }
                }
                Node::Invoke(invocation) => self.invoke(invocation, scope, frame, out)?,
            }
        }
        Ok(())
    }

    fn output<'a>(
        &self,
        expr: &Expr,
        raw: bool,
        span: Span,
        scope: &RenderScope<'a>,
        frame: Option<&Frame<'_, 'a>>,
        out: &mut String,
    ) -> Fault<()> {
        match expr {
            Expr::Path(path) => {
                let Some(value) = lookup(path, frame, scope.config()) else {
                    return Ok(());
                };
                let Some(text) = scalar_text(&value) else {
                    return Err(self.fault(
                        RenderErrorKind::NotText {
                            path: path.raw.clone(),
                            found: type_name(&value),
                        },
                        span,
                    ));
                };
                if raw {
                    out.push_str(&text);
                } else {
                    out.push_str(&escape_html(&text));
                }
            }
            Expr::Children => {
                let html = scope
                    .children()
                    .map_err(|err| self.located(err.into(), span))?;
                out.push_str(&html);
            }
            Expr::Classes => out.push_str(&escape_html(&scope.classes().to_string())),
            Expr::A11y => out.push_str(&scope.a11y().to_string()),
            Expr::Attrs => out.push_str(&scope.attrs().to_string()),
        }
        Ok(())
    }

    fn invoke<'a>(
        &self,
        invocation: &Invocation,
        scope: &RenderScope<'a>,
        frame: Option<&Frame<'_, 'a>>,
        out: &mut String,
    ) -> Fault<()> {
        let props = self.invocation_props(invocation, scope, frame)?;

        let html = match &invocation.block {
            Some(block) => {
                // Block content evaluates in the caller's scope.
                let producer = || -> std::result::Result<String, RenderError> {
                    let mut html = String::new();
                    self.eval(block, scope, frame, &mut html)
                        .map_err(|fault| scope.tag(fault))?;
                    Ok(html)
                };
                scope.invoke(&invocation.name, &props, Some(&producer))
            }
            None => scope.invoke(&invocation.name, &props, None),
        };

        out.push_str(&html.map_err(|fault| self.located(fault, invocation.span))?);
        Ok(())
    }

    fn invocation_props<'a>(
        &self,
        invocation: &Invocation,
        scope: &RenderScope<'a>,
        frame: Option<&Frame<'_, 'a>>,
    ) -> Fault<Props> {
        let mut props = match &invocation.base {
            Some(path) => match lookup(path, frame, scope.config()).as_deref() {
                None | Some(Value::Null) => Props::new(),
                Some(Value::Object(map)) => map.clone(),
                Some(other) => {
                    return Err(self.fault(
                        RenderErrorKind::Message(format!(
                            "props for `{}` must be a map, `{}` is a {}",
                            invocation.name,
                            path.raw,
                            type_name(other)
                        )),
                        invocation.span,
                    ));
                }
            },
            None => Props::new(),
        };

        for (key, arg) in &invocation.args {
            match arg {
                Arg::Literal(value) => {
                    props.insert(key.clone(), value.clone());
                }
                // Missing values leave the callee's default in place.
                Arg::Path(path) => {
                    if let Some(value) = lookup(path, frame, scope.config()) {
                        props.insert(key.clone(), value.into_owned());
                    }
                }
            }
        }
        Ok(props)
    }

    fn entries<'a>(
        &self,
        path: &Path,
        value: Cow<'a, Value>,
        span: Span,
    ) -> Fault<Vec<(Option<String>, Cow<'a, Value>)>> {
        let entries: Vec<(Option<String>, Cow<'a, Value>)> = match value {
            Cow::Borrowed(Value::Array(items)) => items.iter().map(|v| (None, Cow::Borrowed(v))).collect(),
            Cow::Borrowed(Value::Object(map)) => map
                .iter()
                .map(|(k, v)| (Some(k.clone()), Cow::Borrowed(v)))
                .collect(),
            Cow::Owned(Value::Array(items)) => items.into_iter().map(|v| (None, Cow::Owned(v))).collect(),
            Cow::Owned(Value::Object(map)) => map
                .into_iter()
                .map(|(k, v)| (Some(k), Cow::Owned(v)))
                .collect(),
            Cow::Borrowed(Value::Null) | Cow::Owned(Value::Null) => Vec::new(),
            other => {
                return Err(self.fault(
                    RenderErrorKind::NotIterable {
                        path: path.raw.clone(),
                        found: type_name(&other),
                    },
                    span,
                ));
            }
        };
        Ok(entries)
    }

    fn fault(&self, kind: RenderErrorKind, span: Span) -> FragmentFault {
        FragmentFault::new(kind, Some(self.location(span)))
    }

    fn located(&self, mut fault: FragmentFault, span: Span) -> FragmentFault {
        if fault.location.is_none() {
            fault.location = Some(self.location(span));
        }
        fault
    }
}

/// Resolve a path against the iteration frames, then the configuration.
///
/// A missing value is `None`.
fn lookup<'a>(path: &Path, frame: Option<&Frame<'_, 'a>>, config: &'a Props) -> Option<Cow<'a, Value>> {
    match path.root {
        PathRoot::Index => frame.map(|f| Cow::Owned(Value::from(f.index))),
        PathRoot::Key => frame
            .and_then(|f| f.key.clone())
            .map(|k| Cow::Owned(Value::String(k))),
        PathRoot::First => frame.map(|f| Cow::Owned(Value::Bool(f.index == 0))),
        PathRoot::Last => frame.map(|f| Cow::Owned(Value::Bool(f.index + 1 == f.len))),
        PathRoot::This => match frame {
            Some(f) => walk(f.this.clone(), &path.segments),
            None => {
                let (first, rest) = path.segments.split_first()?;
                walk(Cow::Borrowed(config.get(first)?), rest)
            }
        },
        PathRoot::Scope => {
            let (first, rest) = path.segments.split_first()?;
            let mut current = frame;
            while let Some(f) = current {
                if let Value::Object(map) = f.this.as_ref() {
                    if map.contains_key(first) {
                        return walk(f.this.clone(), &path.segments);
                    }
                }
                current = f.parent;
            }
            walk(Cow::Borrowed(config.get(first)?), rest)
        }
    }
}

fn walk<'a>(start: Cow<'a, Value>, segments: &[String]) -> Option<Cow<'a, Value>> {
    match start {
        Cow::Borrowed(value) => {
            let mut current = value;
            for segment in segments {
                current = child(current, segment)?;
            }
            Some(Cow::Borrowed(current))
        }
        Cow::Owned(value) => {
            let mut current = &value;
            for segment in segments {
                current = child(current, segment)?;
            }
            Some(Cow::Owned(current.clone()))
        }
    }
}

fn child<'v>(value: &'v Value, segment: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::{
        classes::ClassRules,
        error::TemplateError,
        fragment::FragmentDef,
        registry::FragmentRegistry,
    };

    fn obj(value: Value) -> Props {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test helper takes objects"),
        }
    }

    fn template(name: &str, text: &str) -> FragmentDef {
        let template = Template::parse(text, name, 1).expect("parse");
        let dependencies = template.invocations();
        FragmentDef::new(name, template).with_dependencies(dependencies)
    }

    fn render(registry: &FragmentRegistry, name: &str, props: Value) -> String {
        registry.render(name, &obj(props), None).expect("render")
    }

    fn render_err(registry: &FragmentRegistry, name: &str, props: Value) -> RenderError {
        match registry.render(name, &obj(props), None) {
            Err(TemplateError::Render(err)) => err,
            other => panic!("expected render error, got {other:?}"),
        }
    }

    fn button() -> FragmentDef {
        template(
            "button",
            r#"<button class="{{ @classes }}"{{ @a11y }}{{ @attrs }}>{{ label }}</button>"#,
        )
        .with_defaults(obj(json!({
            "variant": "default", "size": "md", "label": "", "className": "", "a11y": {}, "attrs": {}
        })))
        .with_classes(ClassRules::base("btn").with_modifiers(["variant", "size"]).with_flags(["disabled"]))
    }

    #[test]
    fn test_button_markup() {
        let mut registry = FragmentRegistry::new();
        registry.register(button()).expect("register");

        assert_eq!(
            render(&registry, "button", json!({"label": "Save <all>"})),
            r#"<button class="btn">Save &lt;all&gt;</button>"#
        );
        assert_eq!(
            render(
                &registry,
                "button",
                json!({
                    "size": "lg",
                    "disabled": true,
                    "a11y": {"ariaLabel": "Close"},
                    "attrs": {"type": "button", "disabled": true}
                })
            ),
            r#"<button class="btn btn-lg btn--disabled" aria-label="Close" type="button" disabled></button>"#
        );
    }

    #[test]
    fn test_raw_output_is_not_escaped() {
        let mut registry = FragmentRegistry::new();
        registry.register(template("prose", "<div>{{{ html }}}|{{ html }}</div>")).expect("register");
        assert_eq!(
            render(&registry, "prose", json!({"html": "<b>x</b>"})),
            "<div><b>x</b>|&lt;b&gt;x&lt;/b&gt;</div>"
        );
    }

    #[test]
    fn test_missing_values_render_empty() {
        let mut registry = FragmentRegistry::new();
        registry.register(template("empty", "[{{ nope }}][{{ a.b.c }}]")).expect("register");
        assert_eq!(render(&registry, "empty", json!({"a": {"b": 1}})), "[][]");
    }

    #[test]
    fn test_if_unless_else() {
        let mut registry = FragmentRegistry::new();
        registry
            .register(template(
                "flag",
                "{{#if on}}yes{{else}}no{{/if}}/{{#unless on}}off{{/unless}}",
            ))
            .expect("register");
        assert_eq!(render(&registry, "flag", json!({"on": true})), "yes/");
        assert_eq!(render(&registry, "flag", json!({"on": 0})), "no/off");
        assert_eq!(render(&registry, "flag", json!({})), "no/off");
    }

    #[test]
    fn test_each_preserves_order_and_metadata() {
        let mut registry = FragmentRegistry::new();
        registry
            .register(template(
                "list",
                "<ul>{{#each items}}<li data-i=\"{{ @index }}\">{{ label }}{{#if @last}}!{{/if}}</li>{{else}}<li>none</li>{{/each}}</ul>",
            ))
            .expect("register");

        assert_eq!(
            render(
                &registry,
                "list",
                json!({"items": [{"label": "c"}, {"label": "a"}, {"label": "b"}]})
            ),
            r#"<ul><li data-i="0">c</li><li data-i="1">a</li><li data-i="2">b!</li></ul>"#
        );
        assert_eq!(render(&registry, "list", json!({"items": []})), "<ul><li>none</li></ul>");
        assert_eq!(render(&registry, "list", json!({})), "<ul><li>none</li></ul>");
    }

    #[test]
    fn test_each_over_map_and_scalars() {
        let mut registry = FragmentRegistry::new();
        registry
            .register(template(
                "dl",
                "{{#each meta}}{{ @key }}={{ this }};{{/each}}{{#each tags}}[{{ this }}]{{/each}}",
            ))
            .expect("register");
        assert_eq!(
            render(&registry, "dl", json!({"meta": {"z": 1, "a": "two"}, "tags": ["x", "y"]})),
            "z=1;a=two;[x][y]"
        );
    }

    #[test]
    fn test_lookup_falls_back_to_config() {
        let mut registry = FragmentRegistry::new();
        registry
            .register(template(
                "menu",
                "{{#each items}}<a class=\"{{ linkClass }}\">{{ label }}</a>{{/each}}",
            ))
            .expect("register");
        assert_eq!(
            render(
                &registry,
                "menu",
                json!({"linkClass": "nav", "items": [{"label": "Home"}, {"label": "Docs", "linkClass": "nav active"}]})
            ),
            r#"<a class="nav">Home</a><a class="nav active">Docs</a>"#
        );
    }

    #[test]
    fn test_each_over_scalar_fails() {
        let mut registry = FragmentRegistry::new();
        registry
            .register(template("bad", "line one\n  {{#each title}}x{{/each}}"))
            .expect("register");
        let err = render_err(&registry, "bad", json!({"title": "hello"}));
        assert_eq!(err.fragment(), "bad");
        assert_eq!(err.location().map(ToString::to_string).as_deref(), Some("bad:2:3"));
        assert!(matches!(
            err.kind(),
            RenderErrorKind::NotIterable { path, found: "string" } if path == "title"
        ));
    }

    #[test]
    fn test_output_of_map_fails() {
        let mut registry = FragmentRegistry::new();
        registry.register(template("bad", "{{ a11y }}")).expect("register");
        let err = render_err(&registry, "bad", json!({"a11y": {"role": "x"}}));
        assert!(matches!(err.kind(), RenderErrorKind::NotText { found: "map", .. }));
    }

    #[test]
    fn test_invocation_with_args_and_base() {
        let mut registry = FragmentRegistry::new();
        registry.register(button()).expect("button");
        registry
            .register(template(
                "toolbar",
                r#"<nav>{{#each actions}}{{> button this size="sm" }}{{/each}}{{> button primary label=cta }}</nav>"#,
            ))
            .expect("toolbar");

        assert_eq!(
            render(
                &registry,
                "toolbar",
                json!({
                    "actions": [{"label": "Cut"}, {"label": "Copy", "variant": "ghost"}],
                    "primary": {"variant": "primary"},
                    "cta": "Go"
                })
            ),
            concat!(
                r#"<nav><button class="btn btn-sm">Cut</button>"#,
                r#"<button class="btn btn-ghost btn-sm">Copy</button>"#,
                r#"<button class="btn btn-primary">Go</button></nav>"#
            )
        );
    }

    #[test]
    fn test_missing_argument_keeps_default() {
        let mut registry = FragmentRegistry::new();
        registry
            .register(template("chip", "{{ label }}").with_defaults(obj(json!({"label": "chip"}))))
            .expect("chip");
        registry
            .register(template("row", "{{> chip label=missing }}"))
            .expect("row");
        assert_eq!(render(&registry, "row", json!({})), "chip");
    }

    #[test]
    fn test_block_children_use_caller_scope() {
        let mut registry = FragmentRegistry::new();
        registry
            .register(template(
                "card",
                r#"<article class="{{ @classes }}"><h2>{{ title }}</h2>{{ children }}</article>"#,
            ))
            .expect("card");
        registry
            .register(template(
                "page",
                "{{#> card title=heading }}<p>{{ title }}</p>{{/card}}",
            ))
            .expect("page");

        assert_eq!(
            render(&registry, "page", json!({"heading": "Inner", "title": "Outer"})),
            r#"<article class="card"><h2>Inner</h2><p>Outer</p></article>"#
        );
    }

    #[test]
    fn test_children_without_block_are_empty() {
        let mut registry = FragmentRegistry::new();
        registry.register(template("box", "<div>{{ children }}</div>")).expect("box");
        registry.register(template("outer", "{{> box }}")).expect("outer");
        assert_eq!(render(&registry, "outer", json!({})), "<div></div>");
    }

    #[test]
    fn test_nested_template_error_chain() {
        let mut registry = FragmentRegistry::new();
        registry
            .register(template("icon", "{{#each paths}}<path/>{{/each}}"))
            .expect("icon");
        registry
            .register(template("button", "<button>{{> icon paths=glyph }}</button>"))
            .expect("button");
        registry
            .register(template("card", "<div>\n{{> button glyph=\"oops\" }}</div>"))
            .expect("card");

        let err = render_err(&registry, "card", json!({}));
        assert_eq!(err.fragment_chain(), vec!["card", "button", "icon"]);
        assert_eq!(err.location().map(ToString::to_string).as_deref(), Some("card:2:1"));
        let inner = err.innermost();
        assert_eq!(inner.fragment(), "icon");
        assert_eq!(inner.location().map(ToString::to_string).as_deref(), Some("icon:1:1"));
    }

    #[test]
    fn test_block_child_error_is_tagged_with_caller() {
        let mut registry = FragmentRegistry::new();
        registry.register(template("box", "<div>{{ children }}</div>")).expect("box");
        registry
            .register(template("outer", "{{#> box }}{{ items }}{{/box}}"))
            .expect("outer");
        let err = render_err(&registry, "outer", json!({"items": [1]}));
        assert_eq!(err.fragment_chain(), vec!["outer", "box", "outer"]);
        assert!(matches!(err.innermost().kind(), RenderErrorKind::NotText { .. }));
    }

    #[test]
    fn test_unregistered_dependency_fails_at_render() {
        let mut registry = FragmentRegistry::new();
        registry.register(template("shell", "{{> missing }}")).expect("shell");
        let err = render_err(&registry, "shell", json!({}));
        assert!(matches!(err.kind(), RenderErrorKind::UnknownFragment(name) if name == "missing"));
        assert_eq!(err.location().map(ToString::to_string).as_deref(), Some("shell:1:1"));
    }
}
