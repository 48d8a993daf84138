use std::fmt;
use std::ops::{Not, Range};

use super::value::{Data, Value};

/// Byte offsets into the source an expression was parsed from.
pub type Span = Range<usize>;

/// Comparison operators supported in condition expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// A static index applied to a traversal, such as `[0]` or `["blue"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Int(i64),
    String(String),
}

/// One step of a [`Traversal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Attr(String),
    Index(Key),
}

/// A dotted reference like `aws_instance.web[0].ami`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Traversal {
    pub segments: Vec<Segment>,
    pub span: Span,
}

impl Traversal {
    /// The first attribute name, e.g. `var` in `var.region`.
    #[must_use]
    pub fn root_name(&self) -> &str {
        match self.segments.first() {
            Some(Segment::Attr(name)) => name,
            _ => "",
        }
    }

    /// Render the traversal as a lookup path. Attributes are joined with `.`;
    /// indexes attach to the preceding attribute.
    #[must_use]
    pub fn path(&self) -> String {
        render_path(&self.segments)
    }
}

pub(crate) fn render_path(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Attr(name) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(name);
            }
            Segment::Index(key) => out.push_str(&key.to_string()),
        }
    }
    out
}

/// A piece of a string template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Literal(String),
    Interpolation(Expr),
}

/// Condition expression AST.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    List(Vec<Expr>),
    Template(Vec<TemplatePart>),
    Traversal(Traversal),
    Call { name: String, args: Vec<Expr> },
    Compare {
        lhs: Box<Expr>,
        op: CompareOp,
        rhs: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "=="),
            CompareOp::Neq => write!(f, "!="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Gte => write!(f, ">="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Lte => write!(f, "<="),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "[{i}]"),
            Key::String(s) => write!(f, "[\"{s}\"]"),
        }
    }
}

impl fmt::Display for Traversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => match value.data() {
                Data::Unknown => write!(f, "(unknown)"),
                _ => write!(f, "{value}"),
            },
            Expr::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Expr::Template(parts) => {
                write!(f, "\"")?;
                for part in parts {
                    match part {
                        TemplatePart::Literal(s) => write!(f, "{s}")?,
                        TemplatePart::Interpolation(e) => write!(f, "${{{e}}}")?,
                    }
                }
                write!(f, "\"")
            }
            Expr::Traversal(t) => write!(f, "{t}"),
            Expr::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Expr::Compare { lhs, op, rhs } => write!(f, "({lhs} {op} {rhs})"),
            Expr::And(a, b) => write!(f, "({a} && {b})"),
            Expr::Or(a, b) => write!(f, "({a} || {b})"),
            Expr::Not(inner) => write!(f, "!{inner}"),
        }
    }
}

impl Expr {
    #[must_use]
    pub fn and(self, other: Expr) -> Expr {
        Expr::And(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn or(self, other: Expr) -> Expr {
        Expr::Or(Box::new(self), Box::new(other))
    }

    /// Visit every traversal in this expression, in source order.
    pub fn walk_traversals<'a>(&'a self, f: &mut impl FnMut(&'a Traversal)) {
        match self {
            Expr::Literal(_) => {}
            Expr::Traversal(t) => f(t),
            Expr::List(items) => items.iter().for_each(|e| e.walk_traversals(f)),
            Expr::Call { args, .. } => args.iter().for_each(|e| e.walk_traversals(f)),
            Expr::Template(parts) => {
                for part in parts {
                    if let TemplatePart::Interpolation(e) = part {
                        e.walk_traversals(f);
                    }
                }
            }
            Expr::Compare { lhs, rhs, .. } => {
                lhs.walk_traversals(f);
                rhs.walk_traversals(f);
            }
            Expr::And(a, b) | Expr::Or(a, b) => {
                a.walk_traversals(f);
                b.walk_traversals(f);
            }
            Expr::Not(inner) => inner.walk_traversals(f),
        }
    }
}

impl Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }
}

/// Intermediate builder for comparisons against a traversal.
/// Created by [`traversal()`]; requires a comparison method to produce an [`Expr`].
#[derive(Debug, Clone)]
pub struct TraversalExpr {
    traversal: Traversal,
}

impl TraversalExpr {
    fn compare(self, op: CompareOp, value: impl Into<Value>) -> Expr {
        Expr::Compare {
            lhs: Box::new(Expr::Traversal(self.traversal)),
            op,
            rhs: Box::new(Expr::Literal(value.into())),
        }
    }

    #[must_use]
    pub fn eq(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Eq, value)
    }

    #[must_use]
    pub fn neq(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Neq, value)
    }

    #[must_use]
    pub fn gt(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Gt, value)
    }

    #[must_use]
    pub fn gte(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Gte, value)
    }

    #[must_use]
    pub fn lt(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Lt, value)
    }

    #[must_use]
    pub fn lte(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Lte, value)
    }

    /// Use the traversal on its own, without comparing it.
    #[must_use]
    pub fn get(self) -> Expr {
        Expr::Traversal(self.traversal)
    }
}

/// Start building an expression from a dotted attribute path such as
/// `"self.instance_count"`. Index steps are not supported here; parse the
/// expression instead.
#[must_use]
pub fn traversal(path: &str) -> TraversalExpr {
    TraversalExpr {
        traversal: Traversal {
            segments: path
                .split('.')
                .map(|s| Segment::Attr(s.to_owned()))
                .collect(),
            span: 0..0,
        },
    }
}

/// A literal expression.
#[must_use]
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

/// A line/column position in a source file. Lines and columns start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pos {
    pub line: usize,
    pub column: usize,
    pub byte: usize,
}

impl Pos {
    /// The position reached after consuming `text` from `self`.
    #[must_use]
    pub fn advance(self, text: &str) -> Pos {
        let mut pos = self;
        for c in text.chars() {
            if c == '\n' {
                pos.line += 1;
                pos.column = 1;
            } else {
                pos.column += 1;
            }
            pos.byte += c.len_utf8();
        }
        pos
    }
}

/// A span of source text, used as the subject of a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRange {
    pub filename: String,
    pub start: Pos,
    pub end: Pos,
}

impl SourceRange {
    /// A synthetic range for expressions built in code rather than parsed.
    #[must_use]
    pub fn synthetic() -> Self {
        let start = Pos {
            line: 1,
            column: 1,
            byte: 0,
        };
        Self {
            filename: "<builtin>".to_owned(),
            start,
            end: start,
        }
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            write!(
                f,
                "{}:{},{}-{}",
                self.filename, self.start.line, self.start.column, self.end.column
            )
        } else {
            write!(
                f,
                "{}:{},{}-{},{}",
                self.filename, self.start.line, self.start.column, self.end.line, self.end.column
            )
        }
    }
}

/// A parsed expression together with its source text and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    expr: Expr,
    text: String,
    range: SourceRange,
}

impl Expression {
    pub(crate) fn new(expr: Expr, text: String, range: SourceRange) -> Self {
        Self { expr, text, range }
    }

    /// Wrap an expression built in code. The source text is its rendering.
    #[must_use]
    pub fn from_expr(expr: Expr) -> Self {
        let text = expr.to_string();
        let range = SourceRange::synthetic();
        let end = range.start.advance(&text);
        Self {
            expr,
            text,
            range: SourceRange { end, ..range },
        }
    }

    /// Parse a standalone expression.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`](crate::parse::ParseError) if the input is not a
    /// valid expression.
    pub fn parse(input: &str) -> Result<Self, crate::parse::ParseError> {
        crate::parse::parse_expression(input)
    }

    #[must_use]
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn range(&self) -> &SourceRange {
        &self.range
    }

    /// Resolve a byte span inside this expression to a source range. Spans
    /// outside the expression (including synthetic `0..0` spans) resolve to
    /// the whole expression.
    #[must_use]
    pub fn subrange(&self, span: &Span) -> SourceRange {
        let base = self.range.start.byte;
        let (Some(from), Some(to)) = (span.start.checked_sub(base), span.end.checked_sub(base))
        else {
            return self.range.clone();
        };
        if span.is_empty() || to > self.text.len() {
            return self.range.clone();
        }
        let (Some(lead), Some(inner)) = (self.text.get(..from), self.text.get(from..to)) else {
            return self.range.clone();
        };
        let start = self.range.start.advance(lead);
        SourceRange {
            filename: self.range.filename.clone(),
            start,
            end: start.advance(inner),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}
