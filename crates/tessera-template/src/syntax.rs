//! Fragment template syntax.
//!
//! Templates are markup with `{{ … }}` tags:
//!
//! - `{{ path }}` / `{{{ path }}}`: escaped / raw lookup
//! - `{{ children }}`, `{{ @classes }}`, `{{ @a11y }}`, `{{ @attrs }}`
//! - `{{#if path}}…{{else}}…{{/if}}`, `{{#unless path}}…{{/unless}}`
//! - `{{#each path}}…{{else}}…{{/each}}`
//! - `{{> name base key=value}}` and `{{#> name key=value}}…{{/name}}`
//! - `{{! comment }}`, `{{!-- comment --}}`, and `\{{` for a literal `{{`

use std::sync::Arc;

use serde_json::Value;

use crate::error::{Result, SourceLocation, TemplateError};

/// Line and column of a tag inside its template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

/// Where a path lookup starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRoot {
    /// Innermost `each` item that has the key, then the configuration.
    Scope,
    /// Current `each` item (`this`).
    This,
    /// `@index`
    Index,
    /// `@key`
    Key,
    /// `@first`
    First,
    /// `@last`
    Last,
}

/// A dotted lookup path such as `item.label` or `this.href`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub raw: String,
    pub root: PathRoot,
    pub segments: Vec<String>,
}

/// What an output tag writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Path(Path),
    Children,
    Classes,
    A11y,
    Attrs,
}

/// An invocation argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Path(Path),
    Literal(Value),
}

/// A fragment invocation, optionally with block child content.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub name: String,
    pub base: Option<Path>,
    pub args: Vec<(String, Arg)>,
    pub block: Option<Vec<Node>>,
    pub span: Span,
}

/// Parsed template node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Output {
        expr: Expr,
        raw: bool,
        span: Span,
    },
    If {
        cond: Path,
        negate: bool,
        then: Vec<Node>,
        otherwise: Vec<Node>,
        span: Span,
    },
    Each {
        source: Path,
        body: Vec<Node>,
        otherwise: Vec<Node>,
        span: Span,
    },
    Invoke(Invocation),
}

/// A parsed fragment template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    source: Arc<str>,
    nodes: Vec<Node>,
}

impl Template {
    /// Parse template text.
    ///
    /// `source` names the template in locations; `first_line` is the line of
    /// the first character of `text` in that source.
    pub fn parse(text: &str, source: impl Into<Arc<str>>, first_line: usize) -> Result<Self> {
        let source = source.into();
        let locator = Locator::new(text, first_line);
        let tokens = lex(text, &locator, &source)?;
        let nodes = Parser::new(&source).parse(tokens)?;
        Ok(Self { source, nodes })
    }

    /// Source name used in locations.
    #[must_use]
    pub fn source(&self) -> &Arc<str> {
        &self.source
    }

    /// Top-level nodes.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Location of a span in this template.
    #[must_use]
    pub fn location(&self, span: Span) -> SourceLocation {
        SourceLocation {
            source: Arc::clone(&self.source),
            line: span.line,
            column: span.column,
        }
    }

    /// Names of every fragment this template invokes, in first-use order.
    #[must_use]
    pub fn invocations(&self) -> Vec<String> {
        let mut names = Vec::new();
        collect_invocations(&self.nodes, &mut names);
        names
    }
}

fn collect_invocations(nodes: &[Node], names: &mut Vec<String>) {
    for node in nodes {
        match node {
            Node::Text(_) | Node::Output { .. } => {}
            Node::If {
                then, otherwise, ..
            } => {
                collect_invocations(then, names);
                collect_invocations(otherwise, names);
            }
            Node::Each {
                body, otherwise, ..
            } => {
                collect_invocations(body, names);
                collect_invocations(otherwise, names);
            }
            Node::Invoke(invocation) => {
                if !names.contains(&invocation.name) {
                    names.push(invocation.name.clone());
                }
                if let Some(block) = &invocation.block {
                    collect_invocations(block, names);
                }
            }
        }
    }
}

/// Whether `name` is a valid fragment name.
#[must_use]
pub fn is_fragment_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphanumeric())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'))
}

struct Locator {
    line_starts: Vec<usize>,
    first_line: usize,
}

impl Locator {
    fn new(text: &str, first_line: usize) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            line_starts,
            first_line,
        }
    }

    fn span(&self, text: &str, offset: usize) -> Span {
        let index = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let column = text[self.line_starts[index]..offset].chars().count() + 1;
        Span {
            line: self.first_line + index,
            column,
        }
    }
}

#[derive(Debug)]
enum BlockKeyword {
    If,
    Unless,
    Each,
}

#[derive(Debug)]
enum TokenKind {
    Text(String),
    Output { content: String, raw: bool },
    Open { keyword: BlockKeyword, content: String },
    OpenInvoke(String),
    Invoke(String),
    Else,
    Close(String),
}

#[derive(Debug)]
struct Token {
    kind: TokenKind,
    span: Span,
}

fn syntax_error(source: &Arc<str>, span: Span, message: impl Into<String>) -> TemplateError {
    TemplateError::Syntax {
        location: SourceLocation {
            source: Arc::clone(source),
            line: span.line,
            column: span.column,
        },
        message: message.into(),
    }
}

fn lex(text: &str, locator: &Locator, source: &Arc<str>) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut literal_span = locator.span(text, 0);
    let mut pos = 0;

    while let Some(found) = text[pos..].find("{{") {
        let start = pos + found;

        if start > 0 && text.as_bytes()[start - 1] == b'\\' {
            if literal.is_empty() {
                literal_span = locator.span(text, pos);
            }
            literal.push_str(&text[pos..start - 1]);
            literal.push_str("{{");
            pos = start + 2;
            continue;
        }

        if start > pos {
            if literal.is_empty() {
                literal_span = locator.span(text, pos);
            }
            literal.push_str(&text[pos..start]);
        }

        let span = locator.span(text, start);
        let rest = &text[start..];

        let (kind, consumed) = if rest.starts_with("{{!--") {
            let end = rest
                .find("--}}")
                .ok_or_else(|| syntax_error(source, span, "unclosed comment"))?;
            (None, end + 4)
        } else if rest.starts_with("{{!") {
            let end = rest
                .find("}}")
                .ok_or_else(|| syntax_error(source, span, "unclosed comment"))?;
            (None, end + 2)
        } else if rest.starts_with("{{{") {
            let end = rest
                .find("}}}")
                .ok_or_else(|| syntax_error(source, span, "unclosed `{{{` tag"))?;
            let content = rest[3..end].trim().to_string();
            (
                Some(TokenKind::Output { content, raw: true }),
                end + 3,
            )
        } else {
            let end = rest
                .find("}}")
                .ok_or_else(|| syntax_error(source, span, "unclosed `{{` tag"))?;
            let content = rest[2..end].trim();
            (Some(classify(content, span, source)?), end + 2)
        };

        // Comments leave surrounding text as one run.
        if let Some(kind) = kind {
            if !literal.is_empty() {
                tokens.push(Token {
                    kind: TokenKind::Text(std::mem::take(&mut literal)),
                    span: literal_span,
                });
            }
            tokens.push(Token { kind, span });
        }
        pos = start + consumed;
    }

    if pos < text.len() {
        if literal.is_empty() {
            literal_span = locator.span(text, pos);
        }
        literal.push_str(&text[pos..]);
    }
    if !literal.is_empty() {
        tokens.push(Token {
            kind: TokenKind::Text(literal),
            span: literal_span,
        });
    }

    Ok(tokens)
}

fn classify(content: &str, span: Span, source: &Arc<str>) -> Result<TokenKind> {
    if content.is_empty() {
        return Err(syntax_error(source, span, "empty tag"));
    }

    if let Some(block) = content.strip_prefix('#') {
        let block = block.trim_start();
        if let Some(invoke) = block.strip_prefix('>') {
            return Ok(TokenKind::OpenInvoke(invoke.trim().to_string()));
        }
        let (word, rest) = block.split_once(char::is_whitespace).unwrap_or((block, ""));
        let keyword = match word {
            "if" => BlockKeyword::If,
            "unless" => BlockKeyword::Unless,
            "each" => BlockKeyword::Each,
            other => {
                return Err(syntax_error(
                    source,
                    span,
                    format!("unknown block `#{other}`"),
                ));
            }
        };
        return Ok(TokenKind::Open {
            keyword,
            content: rest.trim().to_string(),
        });
    }

    if let Some(name) = content.strip_prefix('/') {
        return Ok(TokenKind::Close(name.trim().to_string()));
    }

    if let Some(invoke) = content.strip_prefix('>') {
        return Ok(TokenKind::Invoke(invoke.trim().to_string()));
    }

    if content == "else" {
        return Ok(TokenKind::Else);
    }

    Ok(TokenKind::Output {
        content: content.to_string(),
        raw: false,
    })
}

enum FrameKind {
    Root,
    If { cond: Path, negate: bool },
    Each { source: Path },
    Invoke {
        name: String,
        base: Option<Path>,
        args: Vec<(String, Arg)>,
    },
}

struct Frame {
    kind: FrameKind,
    span: Span,
    nodes: Vec<Node>,
    otherwise: Option<Vec<Node>>,
}

impl Frame {
    fn new(kind: FrameKind, span: Span) -> Self {
        Self {
            kind,
            span,
            nodes: Vec::new(),
            otherwise: None,
        }
    }

    fn current(&mut self) -> &mut Vec<Node> {
        match &mut self.otherwise {
            Some(otherwise) => otherwise,
            None => &mut self.nodes,
        }
    }

    fn closing_name(&self) -> &str {
        match &self.kind {
            FrameKind::Root => "",
            FrameKind::If { negate: false, .. } => "if",
            FrameKind::If { negate: true, .. } => "unless",
            FrameKind::Each { .. } => "each",
            FrameKind::Invoke { name, .. } => name,
        }
    }
}

struct Parser<'s> {
    source: &'s Arc<str>,
}

impl<'s> Parser<'s> {
    fn new(source: &'s Arc<str>) -> Self {
        Self { source }
    }

    fn error(&self, span: Span, message: impl Into<String>) -> TemplateError {
        syntax_error(self.source, span, message)
    }

    fn parse(&self, tokens: Vec<Token>) -> Result<Vec<Node>> {
        let mut stack = vec![Frame::new(FrameKind::Root, Span { line: 1, column: 1 })];

        for token in tokens {
            let span = token.span;
            match token.kind {
                TokenKind::Text(text) => push(&mut stack, Node::Text(text)),
                TokenKind::Output { content, raw } => {
                    let expr = self.expr(&content, span)?;
                    push(&mut stack, Node::Output { expr, raw, span });
                }
                TokenKind::Open { keyword, content } => {
                    let path = self.single_path(&content, span)?;
                    let kind = match keyword {
                        BlockKeyword::If => FrameKind::If {
                            cond: path,
                            negate: false,
                        },
                        BlockKeyword::Unless => FrameKind::If {
                            cond: path,
                            negate: true,
                        },
                        BlockKeyword::Each => FrameKind::Each { source: path },
                    };
                    stack.push(Frame::new(kind, span));
                }
                TokenKind::OpenInvoke(content) => {
                    let (name, base, args) = self.invocation(&content, span)?;
                    stack.push(Frame::new(FrameKind::Invoke { name, base, args }, span));
                }
                TokenKind::Invoke(content) => {
                    let (name, base, args) = self.invocation(&content, span)?;
                    push(
                        &mut stack,
                        Node::Invoke(Invocation {
                            name,
                            base,
                            args,
                            block: None,
                            span,
                        }),
                    );
                }
                TokenKind::Else => {
                    let Some(top) = stack.last_mut() else {
                        return Err(self.error(span, "`{{else}}` outside a block"));
                    };
                    match top.kind {
                        FrameKind::If { .. } | FrameKind::Each { .. } if top.otherwise.is_none() => {
                            top.otherwise = Some(Vec::new());
                        }
                        FrameKind::If { .. } | FrameKind::Each { .. } => {
                            return Err(self.error(span, "duplicate `{{else}}`"));
                        }
                        _ => return Err(self.error(span, "`{{else}}` outside `if`, `unless` or `each`")),
                    }
                }
                TokenKind::Close(name) => {
                    if stack.len() == 1 {
                        return Err(self.error(span, format!("unexpected `{{{{/{name}}}}}`")));
                    }
                    let expected = stack.last().map(Frame::closing_name).unwrap_or_default();
                    if expected != name {
                        let open = stack.last().map(|f| f.span).unwrap_or(span);
                        return Err(self.error(
                            span,
                            format!(
                                "`{{{{/{name}}}}}` closes `{expected}` opened at {}:{}",
                                open.line, open.column
                            ),
                        ));
                    }
                    let Some(frame) = stack.pop() else {
                        return Err(self.error(span, "unbalanced block"));
                    };
                    let node = finish(frame);
                    push(&mut stack, node);
                }
            }
        }

        if stack.len() > 1 {
            let open = &stack[stack.len() - 1];
            return Err(self.error(
                open.span,
                format!("unclosed `{}` block", open.closing_name()),
            ));
        }

        Ok(stack.pop().map(|root| root.nodes).unwrap_or_default())
    }

    fn expr(&self, content: &str, span: Span) -> Result<Expr> {
        match content {
            "children" => Ok(Expr::Children),
            "@classes" => Ok(Expr::Classes),
            "@a11y" => Ok(Expr::A11y),
            "@attrs" => Ok(Expr::Attrs),
            other => Ok(Expr::Path(self.path(other, span)?)),
        }
    }

    fn single_path(&self, content: &str, span: Span) -> Result<Path> {
        let words = split_words(content).map_err(|m| self.error(span, m))?;
        match words.as_slice() {
            [word] if !word.contains('=') => self.path(word, span),
            [] => Err(self.error(span, "block needs a path")),
            _ => Err(self.error(span, format!("block takes a single path, got `{content}`"))),
        }
    }

    fn path(&self, raw: &str, span: Span) -> Result<Path> {
        let (root, rest) = match raw {
            "@index" => (PathRoot::Index, None),
            "@key" => (PathRoot::Key, None),
            "@first" => (PathRoot::First, None),
            "@last" => (PathRoot::Last, None),
            "this" => (PathRoot::This, None),
            _ => match raw.strip_prefix("this.") {
                Some(rest) => (PathRoot::This, Some(rest)),
                None => (PathRoot::Scope, Some(raw)),
            },
        };

        let segments: Vec<String> = rest
            .map(|r| r.split('.').map(str::to_string).collect())
            .unwrap_or_default();
        let valid = segments.iter().all(|s| {
            !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        });
        if !valid || (root == PathRoot::Scope && segments.is_empty()) {
            return Err(self.error(span, format!("invalid path `{raw}`")));
        }

        Ok(Path {
            raw: raw.to_string(),
            root,
            segments,
        })
    }

    fn invocation(
        &self,
        content: &str,
        span: Span,
    ) -> Result<(String, Option<Path>, Vec<(String, Arg)>)> {
        let words = split_words(content).map_err(|m| self.error(span, m))?;
        let Some((name, rest)) = words.split_first() else {
            return Err(self.error(span, "invocation needs a fragment name"));
        };
        if !is_fragment_name(name) {
            return Err(self.error(span, format!("invalid fragment name `{name}`")));
        }

        let mut base = None;
        let mut args = Vec::new();
        for word in rest {
            match split_assignment(word) {
                Some((key, value)) => {
                    if key.is_empty() || args.iter().any(|(k, _)| k == key) {
                        return Err(self.error(span, format!("invalid or repeated argument `{key}`")));
                    }
                    args.push((key.to_string(), self.arg(value, span)?));
                }
                None if base.is_none() && args.is_empty() => {
                    base = Some(self.path(word, span)?);
                }
                None => {
                    return Err(self.error(
                        span,
                        format!("positional argument `{word}` must come first and only once"),
                    ));
                }
            }
        }

        Ok((name.clone(), base, args))
    }

    fn arg(&self, value: &str, span: Span) -> Result<Arg> {
        if let Some(text) = unquote(value) {
            return Ok(Arg::Literal(Value::String(text)));
        }
        match value {
            "true" => return Ok(Arg::Literal(Value::Bool(true))),
            "false" => return Ok(Arg::Literal(Value::Bool(false))),
            "null" => return Ok(Arg::Literal(Value::Null)),
            _ => {}
        }
        if let Ok(n) = value.parse::<i64>() {
            return Ok(Arg::Literal(Value::from(n)));
        }
        if let Ok(f) = value.parse::<f64>() {
            if let Some(n) = serde_json::Number::from_f64(f) {
                return Ok(Arg::Literal(Value::Number(n)));
            }
        }
        Ok(Arg::Path(self.path(value, span)?))
    }
}

fn push(stack: &mut [Frame], node: Node) {
    if let Some(top) = stack.last_mut() {
        top.current().push(node);
    }
}

fn finish(frame: Frame) -> Node {
    let span = frame.span;
    let otherwise = frame.otherwise.unwrap_or_default();
    match frame.kind {
        FrameKind::If { cond, negate } => Node::If {
            cond,
            negate,
            then: frame.nodes,
            otherwise,
            span,
        },
        FrameKind::Each { source } => Node::Each {
            source,
            body: frame.nodes,
            otherwise,
            span,
        },
        FrameKind::Invoke { name, base, args } => Node::Invoke(Invocation {
            name,
            base,
            args,
            block: Some(frame.nodes),
            span,
        }),
        // The root frame is never popped by a closing tag.
        FrameKind::Root => Node::Text(String::new()),
    }
}

/// Split tag content on whitespace, keeping quoted strings whole.
fn split_words(content: &str) -> std::result::Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for ch in content.chars() {
        match quote {
            Some(q) => {
                current.push(ch);
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == q {
                    quote = None;
                }
            }
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                current.push(ch);
            }
            None if ch.is_whitespace() => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            None => current.push(ch),
        }
    }

    if quote.is_some() {
        return Err(format!("unterminated string in `{content}`"));
    }
    if !current.is_empty() {
        words.push(current);
    }
    Ok(words)
}

/// `key=value` with the `=` before any quote.
fn split_assignment(word: &str) -> Option<(&str, &str)> {
    let eq = word.find('=')?;
    let quote = word.find(['"', '\'']).unwrap_or(usize::MAX);
    (eq < quote).then(|| (&word[..eq], &word[eq + 1..]))
}

fn unquote(value: &str) -> Option<String> {
    let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let inner = value.strip_prefix(quote)?.strip_suffix(quote)?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn parse(text: &str) -> Template {
        Template::parse(text, "test.html", 1).expect("parse")
    }

    fn parse_err(text: &str) -> String {
        Template::parse(text, "test.html", 1).unwrap_err().to_string()
    }

    #[test]
    fn test_text_and_output() {
        let template = parse("<b>{{ label }}</b>{{{ html }}}");
        assert_eq!(template.nodes().len(), 4);
        assert_eq!(template.nodes()[0], Node::Text("<b>".to_string()));
        assert!(matches!(
            &template.nodes()[1],
            Node::Output { expr: Expr::Path(p), raw: false, .. } if p.raw == "label"
        ));
        assert!(matches!(&template.nodes()[3], Node::Output { raw: true, .. }));
    }

    #[test]
    fn test_special_expressions() {
        let template = parse("{{ @classes }}{{ @a11y }}{{ @attrs }}{{ children }}");
        let exprs: Vec<_> = template
            .nodes()
            .iter()
            .map(|n| match n {
                Node::Output { expr, .. } => expr.clone(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(exprs, vec![Expr::Classes, Expr::A11y, Expr::Attrs, Expr::Children]);
    }

    #[test]
    fn test_if_else_and_each() {
        let template = parse("{{#if open}}A{{else}}B{{/if}}{{#each items}}{{ this }}{{else}}none{{/each}}");
        match &template.nodes()[0] {
            Node::If {
                then, otherwise, negate, ..
            } => {
                assert!(!negate);
                assert_eq!(then, &vec![Node::Text("A".into())]);
                assert_eq!(otherwise, &vec![Node::Text("B".into())]);
            }
            other => panic!("expected if, got {other:?}"),
        }
        match &template.nodes()[1] {
            Node::Each {
                source, otherwise, ..
            } => {
                assert_eq!(source.segments, vec!["items"]);
                assert_eq!(otherwise.len(), 1);
            }
            other => panic!("expected each, got {other:?}"),
        }
    }

    #[test]
    fn test_invocation_arguments() {
        let template = parse(r#"{{> icon item name="close" size=16 filled=true label=item.label}}"#);
        let Node::Invoke(invocation) = &template.nodes()[0] else {
            panic!("expected invocation");
        };
        assert_eq!(invocation.name, "icon");
        assert_eq!(invocation.base.as_ref().map(|p| p.raw.as_str()), Some("item"));
        assert_eq!(invocation.args.len(), 4);
        assert_eq!(invocation.args[0], ("name".to_string(), Arg::Literal(json!("close"))));
        assert_eq!(invocation.args[1], ("size".to_string(), Arg::Literal(json!(16))));
        assert_eq!(invocation.args[2], ("filled".to_string(), Arg::Literal(json!(true))));
        assert!(matches!(&invocation.args[3].1, Arg::Path(p) if p.segments == vec!["item", "label"]));
        assert!(invocation.block.is_none());
    }

    #[test]
    fn test_quoted_argument_with_spaces_and_equals() {
        let template = parse(r#"{{> link label="a = b \"c\"" }}"#);
        let Node::Invoke(invocation) = &template.nodes()[0] else {
            panic!("expected invocation");
        };
        assert_eq!(invocation.args[0].1, Arg::Literal(json!("a = b \"c\"")));
    }

    #[test]
    fn test_block_invocation() {
        let template = parse("{{#> card title=heading}}<p>{{ body }}</p>{{/card}}");
        let Node::Invoke(invocation) = &template.nodes()[0] else {
            panic!("expected invocation");
        };
        assert_eq!(invocation.block.as_ref().map(Vec::len), Some(3));
    }

    #[test]
    fn test_invocations_are_collected_in_order() {
        let template = parse("{{> b}}{{#if x}}{{> a}}{{/if}}{{#> c}}{{> b}}{{> d}}{{/c}}");
        assert_eq!(template.invocations(), vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_comments_and_escape() {
        let template = parse("a{{! note }}b{{!-- {{ ignored }} --}}c\\{{ literal }}");
        assert_eq!(template.nodes(), &[Node::Text("abc{{ literal }}".to_string())]);
    }

    #[test]
    fn test_this_and_meta_paths() {
        let template = parse("{{ this.href }}{{ @index }}{{ this }}");
        let roots: Vec<_> = template
            .nodes()
            .iter()
            .map(|n| match n {
                Node::Output { expr: Expr::Path(p), .. } => p.root,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(roots, vec![PathRoot::This, PathRoot::Index, PathRoot::This]);
    }

    #[test]
    fn test_spans_account_for_first_line() {
        let template = Template::parse("<div>\n  {{#if x}}{{/if}}</div>", "card.html", 5).expect("parse");
        let Node::If { span, .. } = &template.nodes()[1] else {
            panic!("expected if");
        };
        assert_eq!(*span, Span { line: 6, column: 3 });
        assert_eq!(template.location(*span).to_string(), "card.html:6:3");
    }

    #[test]
    fn test_unclosed_block() {
        let err = parse_err("<div>{{#if open}}</div>");
        assert!(err.contains("test.html:1:6"), "{err}");
        assert!(err.contains("unclosed `if` block"), "{err}");
    }

    #[test]
    fn test_mismatched_close() {
        let err = parse_err("{{#each items}}{{/if}}");
        assert!(err.contains("closes `each`"), "{err}");
    }

    #[test]
    fn test_unexpected_close() {
        assert!(parse_err("{{/if}}").contains("unexpected"));
    }

    #[test]
    fn test_else_outside_block() {
        assert!(parse_err("{{else}}").contains("outside"));
        assert!(parse_err("{{#> card}}{{else}}{{/card}}").contains("outside"));
        assert!(parse_err("{{#if a}}{{else}}{{else}}{{/if}}").contains("duplicate"));
    }

    #[test]
    fn test_unknown_block_and_bad_paths() {
        assert!(parse_err("{{#with x}}{{/with}}").contains("unknown block"));
        assert!(parse_err("{{ a..b }}").contains("invalid path"));
        assert!(parse_err("{{#if}}{{/if}}").contains("needs a path"));
        assert!(parse_err("{{ }}").contains("empty tag"));
        assert!(parse_err("{{ open").contains("unclosed"));
        assert!(parse_err(r#"{{> x a="b}}"#).contains("unterminated"));
    }

    #[test]
    fn test_positional_after_hash_rejected() {
        assert!(parse_err("{{> x a=1 base}}").contains("positional"));
        assert!(parse_err("{{> x a=1 a=2}}").contains("repeated"));
    }

    #[test]
    fn test_fragment_names() {
        assert!(is_fragment_name("button"));
        assert!(is_fragment_name("forms/text-input"));
        assert!(is_fragment_name("h1"));
        assert!(!is_fragment_name(""));
        assert!(!is_fragment_name("-x"));
        assert!(!is_fragment_name("a b"));
    }
}
