//! Path expressions: the query language for addressing nodes in a tree.
//!
//! ```text
//! server.port             key lookup
//! 'host.name'.port        quoted key containing a literal dot
//! servers[0].port         index
//! servers[last]           last element
//! servers[*].port         every element ([] is the same)
//! servers[env=prod].port  predicate over a list of mappings (also !=)
//! *.name                  every child's `name`
//! logging.**              every leaf below `logging`
//! ```
//!
//! The canonical index form is `key[N]`. A token that consists only of
//! brackets applies them to the current node, so `key.[N]` parses to the
//! same expression. Parsing never fails: a bracket expression that is not
//! understood makes the whole token a literal key, and an unclosed `[` is
//! ordinary key text.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Comparison used by a [`Predicate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateOp {
    Eq,
    Ne,
}

/// `[field=value]` / `[field!=value]` filter over a sequence of mappings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub field: String,
    pub op: PredicateOp,
    pub value: String,
}

/// One unit of a [`PathExpression`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
    LastIndex,
    Wildcard,
    DoubleWildcard,
    Predicate(Predicate),
}

impl PathSegment {
    /// Segments that can match more than one node.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, PathSegment::Wildcard | PathSegment::DoubleWildcard)
    }

    fn is_bracket(&self) -> bool {
        !matches!(self, PathSegment::Key(_) | PathSegment::DoubleWildcard)
    }
}

/// A parsed path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathExpression {
    segments: Vec<PathSegment>,
}

impl PathExpression {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let raw = raw.strip_prefix('.').unwrap_or(raw);
        let segments = split_tokens(raw)
            .iter()
            .flat_map(|token| parse_token(token))
            .collect();
        PathExpression { segments }
    }

    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        PathExpression { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True if the path contains `*`, `[*]`, `[]` or `**`.
    pub fn is_multi_valued(&self) -> bool {
        self.segments.iter().any(PathSegment::is_wildcard)
    }

    /// True if the path needs the visitor to collect every match, i.e. it
    /// has a wildcard or a predicate.
    pub fn needs_visitor(&self) -> bool {
        self.segments
            .iter()
            .any(|s| s.is_wildcard() || matches!(s, PathSegment::Predicate(_)))
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }
}

impl FromStr for PathExpression {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(PathExpression::parse(s))
    }
}

impl From<&str> for PathExpression {
    fn from(s: &str) -> Self {
        PathExpression::parse(s)
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(&self.segments))
    }
}

/// Render segments in canonical path syntax. Used for error messages on
/// partially walked paths as well as for `Display`.
pub(crate) fn render(segments: &[PathSegment]) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 && !segment.is_bracket() {
            out.push('.');
        }
        match segment {
            PathSegment::Key(key) => push_key(&mut out, key),
            PathSegment::Index(n) => out.push_str(&format!("[{n}]")),
            PathSegment::LastIndex => out.push_str("[last]"),
            PathSegment::Wildcard => out.push_str("[*]"),
            PathSegment::DoubleWildcard => out.push_str("**"),
            PathSegment::Predicate(p) => {
                let op = match p.op {
                    PredicateOp::Eq => "=",
                    PredicateOp::Ne => "!=",
                };
                out.push('[');
                out.push_str(&p.field);
                out.push_str(op);
                if p.value.contains(']') || p.value.contains('\'') || p.value.contains('"') {
                    out.push_str(&quote(&p.value));
                } else {
                    out.push_str(&p.value);
                }
                out.push(']');
            }
        }
    }
    out
}

fn push_key(out: &mut String, key: &str) {
    let needs_quotes = key.is_empty()
        || key == "*"
        || key == "**"
        || key.contains(['.', '[', ']', '\'', '"']);
    if needs_quotes {
        out.push_str(&quote(key));
    } else {
        out.push_str(key);
    }
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        if c == '\'' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// Split on `.` outside quotes and brackets. Tokens keep their raw text.
/// A `[` with no closing `]` is plain text and does not stop splitting.
fn split_tokens(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut chars = raw.char_indices();

    while let Some((i, c)) = chars.next() {
        match (quote, c) {
            (Some(_), '\\') => {
                current.push(c);
                if let Some((_, next)) = chars.next() {
                    current.push(next);
                }
            }
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                current.push(c);
            }
            (None, '[') => {
                if closing_bracket(&raw[i + 1..]).is_some() {
                    depth += 1;
                }
                current.push(c);
            }
            (None, ']') => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            (None, '.') if depth == 0 => tokens.push(std::mem::take(&mut current)),
            (None, c) => current.push(c),
        }
    }
    tokens.push(current);
    tokens
}

fn parse_token(token: &str) -> Vec<PathSegment> {
    let (key, quoted, brackets) = split_key(token);
    let mut segments = Vec::new();
    match (quoted, key.as_str()) {
        (false, "") => {}
        (false, "*") => segments.push(PathSegment::Wildcard),
        (false, "**") => segments.push(PathSegment::DoubleWildcard),
        _ => segments.push(PathSegment::Key(key.clone())),
    }
    if brackets.is_empty() {
        return segments;
    }
    match parse_brackets(brackets) {
        Some(parsed) => {
            segments.extend(parsed);
            segments
        }
        None => vec![PathSegment::Key(format!("{key}{brackets}"))],
    }
}

/// Separate the key text (quotes removed, escapes resolved) from the trailing
/// bracket expressions.
fn split_key(token: &str) -> (String, bool, &str) {
    let mut key = String::new();
    let mut quoted = false;
    let mut chars = token.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '\'' | '"' => {
                quoted = true;
                let q = c;
                while let Some((_, c)) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some((_, escaped)) = chars.next() {
                                key.push(escaped);
                            }
                        }
                        c if c == q => break,
                        c => key.push(c),
                    }
                }
            }
            '[' => return (key, quoted, &token[i..]),
            c => key.push(c),
        }
    }
    (key, quoted, "")
}

/// Parse `[a][b]...`. `None` if anything is malformed.
fn parse_brackets(mut rest: &str) -> Option<Vec<PathSegment>> {
    let mut segments = Vec::new();
    while !rest.is_empty() {
        rest = rest.strip_prefix('[')?;
        let end = closing_bracket(rest)?;
        segments.push(parse_bracket_content(rest[..end].trim())?);
        rest = &rest[end + 1..];
    }
    Some(segments)
}

fn closing_bracket(text: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            _ if escaped => escaped = false,
            (Some(_), '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, ']') => return Some(i),
            (None, _) => {}
        }
    }
    None
}

fn parse_bracket_content(content: &str) -> Option<PathSegment> {
    match content {
        "" | "*" => return Some(PathSegment::Wildcard),
        "last" => return Some(PathSegment::LastIndex),
        _ => {}
    }
    if content.bytes().all(|b| b.is_ascii_digit()) {
        return content.parse().ok().map(PathSegment::Index);
    }

    let eq = content.find('=')?;
    let (field, op) = match content[..eq].strip_suffix('!') {
        Some(field) => (field, PredicateOp::Ne),
        None => (&content[..eq], PredicateOp::Eq),
    };
    let field = unquote(field.trim());
    if field.is_empty() {
        return None;
    }
    Some(PathSegment::Predicate(Predicate {
        field,
        op,
        value: unquote(content[eq + 1..].trim()),
    }))
}

fn unquote(text: &str) -> String {
    let mut chars = text.chars();
    let Some(q @ ('\'' | '"')) = chars.next() else {
        return text.to_string();
    };
    if text.len() < 2 || !text.ends_with(q) {
        return text.to_string();
    }
    let inner = &text[1..text.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut inner_chars = inner.chars();
    while let Some(c) = inner_chars.next() {
        if c == '\\' {
            if let Some(escaped) = inner_chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}
