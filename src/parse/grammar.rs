use winnow::ascii::till_line_ending;
use winnow::combinator::{alt, cut_err, fail, opt, preceded, repeat, separated, terminated};
use winnow::error::{ContextError, ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::stream::{LocatingSlice, Stateful};
use winnow::token::{any, take_while};

use crate::types::{CompareOp, Expr, Key, Segment, Span, TemplatePart, Traversal};
use crate::Value;

use super::parser::{RawAttr, RawBlock, RawBody};

/// Deepest allowed nesting of groups, lists, calls, interpolations, `!`
/// operators and block bodies.
pub(crate) const MAX_NESTING: usize = 64;

/// Current nesting level, carried alongside the input.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Depth(usize);

pub(crate) type Input<'i> = Stateful<LocatingSlice<&'i str>, Depth>;

pub(crate) fn input(src: &str) -> Input<'_> {
    Stateful {
        input: LocatingSlice::new(src),
        state: Depth::default(),
    }
}

/// Run `inner` one nesting level deeper, failing without recursing once
/// [`MAX_NESTING`] is reached.
fn nested<'i, O>(
    input: &mut Input<'i>,
    mut inner: impl Parser<Input<'i>, O, ErrMode<ContextError>>,
) -> ModalResult<O> {
    if input.state.0 >= MAX_NESTING {
        return cut_err(fail)
            .context(expected("at most 64 levels of nesting"))
            .parse_next(input);
    }
    input.state.0 += 1;
    let out = inner.parse_next(input);
    input.state.0 -= 1;
    out
}

fn expected(what: &'static str) -> StrContext {
    StrContext::Expected(StrContextValue::Description(what))
}

// -- Whitespace & comments --------------------------------------------------

fn ws(input: &mut Input<'_>) -> ModalResult<()> {
    let _: () = repeat(
        0..,
        alt((
            take_while(1.., |c: char| c.is_ascii_whitespace()).void(),
            ('#', till_line_ending).void(),
            ("//", till_line_ending).void(),
        )),
    )
    .parse_next(input)?;
    Ok(())
}

// -- Identifiers ------------------------------------------------------------

fn ident<'i>(input: &mut Input<'i>) -> ModalResult<&'i str> {
    (
        take_while(1, |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
    )
        .take()
        .parse_next(input)
}

// -- Literals ---------------------------------------------------------------

fn digits<'i>(input: &mut Input<'i>) -> ModalResult<&'i str> {
    take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)
}

fn integer(input: &mut Input<'_>) -> ModalResult<i64> {
    (opt('-'), digits)
        .take()
        .try_map(|s: &str| s.parse::<i64>())
        .parse_next(input)
}

fn number(input: &mut Input<'_>) -> ModalResult<Value> {
    alt((
        (opt('-'), digits, '.', digits)
            .take()
            .try_map(|s: &str| s.parse::<f64>())
            .map(Value::from),
        integer.map(Value::from),
    ))
    .parse_next(input)
}

fn escape(input: &mut Input<'_>, out: &mut String) -> ModalResult<()> {
    let esc = cut_err(any).context(expected("escape sequence")).parse_next(input)?;
    match esc {
        '"' => out.push('"'),
        '\\' => out.push('\\'),
        'n' => out.push('\n'),
        't' => out.push('\t'),
        'r' => out.push('\r'),
        other => {
            out.push('\\');
            out.push(other);
        }
    }
    Ok(())
}

/// A quoted string without interpolation, used for block labels and index
/// keys.
fn quoted(input: &mut Input<'_>) -> ModalResult<String> {
    '"'.parse_next(input)?;
    let mut s = String::new();
    loop {
        let ch = cut_err(any).context(expected("closing quote")).parse_next(input)?;
        match ch {
            '"' => return Ok(s),
            '\\' => escape(input, &mut s)?,
            c => s.push(c),
        }
    }
}

/// A quoted string that may contain `${...}` interpolations. `$${` is a
/// literal `${`.
fn template(input: &mut Input<'_>) -> ModalResult<Expr> {
    '"'.parse_next(input)?;
    let mut parts = Vec::new();
    let mut literal = String::new();
    loop {
        let ch = cut_err(any).context(expected("closing quote")).parse_next(input)?;
        match ch {
            '"' => break,
            '\\' => escape(input, &mut literal)?,
            '$' => {
                if opt("${").parse_next(input)?.is_some() {
                    literal.push_str("${");
                } else if opt('{').parse_next(input)?.is_some() {
                    let inner = nested(
                        input,
                        cut_err(terminated(preceded(ws, or_expr), (ws, '}')))
                            .context(expected("interpolation")),
                    )?;
                    if !literal.is_empty() {
                        parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(TemplatePart::Interpolation(inner));
                } else {
                    literal.push('$');
                }
            }
            c => literal.push(c),
        }
    }
    if parts.is_empty() {
        return Ok(Expr::Literal(Value::from(literal)));
    }
    if !literal.is_empty() {
        parts.push(TemplatePart::Literal(literal));
    }
    Ok(Expr::Template(parts))
}

// -- Traversals & calls -----------------------------------------------------

fn index_key(input: &mut Input<'_>) -> ModalResult<Key> {
    alt((integer.map(Key::Int), quoted.map(Key::String)))
        .context(expected("number or string index"))
        .parse_next(input)
}

fn segment(input: &mut Input<'_>) -> ModalResult<Segment> {
    alt((
        preceded('.', cut_err(ident).context(expected("attribute name")))
            .map(|name: &str| Segment::Attr(name.to_owned())),
        preceded(
            '[',
            cut_err(terminated(preceded(ws, index_key), (ws, ']'))),
        )
        .map(Segment::Index),
    ))
    .parse_next(input)
}

fn traversal_segments(input: &mut Input<'_>) -> ModalResult<Vec<Segment>> {
    let root = ident.parse_next(input)?;
    let rest: Vec<Segment> = repeat(0.., segment).parse_next(input)?;
    let mut segments = Vec::with_capacity(rest.len() + 1);
    segments.push(Segment::Attr(root.to_owned()));
    segments.extend(rest);
    Ok(segments)
}

fn traversal(input: &mut Input<'_>) -> ModalResult<Traversal> {
    let (segments, span) = traversal_segments.with_span().parse_next(input)?;
    Ok(Traversal { segments, span })
}

/// Comma-separated expressions up to `close`, allowing a trailing comma.
fn arguments(close: char) -> impl FnMut(&mut Input<'_>) -> ModalResult<Vec<Expr>> {
    move |input: &mut Input<'_>| {
        terminated(
            separated(0.., preceded(ws, or_expr), (ws, ',')),
            (ws, opt(','), ws, close),
        )
        .parse_next(input)
    }
}

fn call_or_traversal(input: &mut Input<'_>) -> ModalResult<Expr> {
    let checkpoint = input.checkpoint();
    let name = ident.parse_next(input)?;
    match name {
        "true" => return Ok(Expr::Literal(Value::from(true))),
        "false" => return Ok(Expr::Literal(Value::from(false))),
        "null" => return Ok(Expr::Literal(Value::null())),
        _ => {}
    }
    if opt('(').parse_next(input)?.is_some() {
        let args = nested(
            input,
            cut_err(arguments(')')).context(expected("function arguments")),
        )?;
        return Ok(Expr::Call {
            name: name.to_owned(),
            args,
        });
    }
    input.reset(&checkpoint);
    traversal.map(Expr::Traversal).parse_next(input)
}

// -- Expressions (precedence: OR < AND < comparison < NOT < primary) --------

fn list(input: &mut Input<'_>) -> ModalResult<Expr> {
    '['.parse_next(input)?;
    let items = nested(input, cut_err(arguments(']')).context(expected("list items")))?;
    Ok(Expr::List(items))
}

fn group(input: &mut Input<'_>) -> ModalResult<Expr> {
    '('.parse_next(input)?;
    nested(
        input,
        cut_err(terminated(preceded(ws, or_expr), (ws, ')')))
            .context(expected("closing parenthesis")),
    )
}

fn primary(input: &mut Input<'_>) -> ModalResult<Expr> {
    alt((
        group,
        list,
        template,
        number.map(Expr::Literal),
        call_or_traversal,
    ))
    .context(expected("expression"))
    .parse_next(input)
}

fn unary(input: &mut Input<'_>) -> ModalResult<Expr> {
    if opt('!').parse_next(input)?.is_some() {
        let inner = nested(input, cut_err(preceded(ws, unary)))?;
        return Ok(Expr::Not(Box::new(inner)));
    }
    primary(input)
}

fn compare_op(input: &mut Input<'_>) -> ModalResult<CompareOp> {
    alt((
        ">=".value(CompareOp::Gte),
        ">".value(CompareOp::Gt),
        "<=".value(CompareOp::Lte),
        "<".value(CompareOp::Lt),
        "==".value(CompareOp::Eq),
        "!=".value(CompareOp::Neq),
    ))
    .parse_next(input)
}

fn comparison(input: &mut Input<'_>) -> ModalResult<Expr> {
    let lhs = unary(input)?;
    let Some(op) = opt(preceded(ws, compare_op)).parse_next(input)? else {
        return Ok(lhs);
    };
    let rhs = cut_err(preceded(ws, unary))
        .context(expected("right-hand operand"))
        .parse_next(input)?;
    Ok(Expr::Compare {
        lhs: Box::new(lhs),
        op,
        rhs: Box::new(rhs),
    })
}

fn and_expr(input: &mut Input<'_>) -> ModalResult<Expr> {
    let first = comparison(input)?;
    let rest: Vec<Expr> =
        repeat(0.., preceded((ws, "&&"), cut_err(preceded(ws, comparison)))).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| Expr::And(Box::new(acc), Box::new(r))))
}

fn or_expr(input: &mut Input<'_>) -> ModalResult<Expr> {
    let first = and_expr(input)?;
    let rest: Vec<Expr> =
        repeat(0.., preceded((ws, "||"), cut_err(preceded(ws, and_expr)))).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| Expr::Or(Box::new(acc), Box::new(r))))
}

/// A complete standalone expression with its span, surrounding whitespace
/// excluded.
pub(crate) fn expression(input: &mut Input<'_>) -> ModalResult<(Expr, Span)> {
    ws.parse_next(input)?;
    let spanned = or_expr.with_span().parse_next(input)?;
    ws.parse_next(input)?;
    Ok(spanned)
}

// -- Blocks -----------------------------------------------------------------

enum BodyItem {
    Attr(RawAttr),
    Block(RawBlock),
}

fn body_item(input: &mut Input<'_>) -> ModalResult<BodyItem> {
    let ((name, labels), header): ((&str, Vec<String>), Span) =
        (ident, repeat(0.., preceded(ws, quoted)))
            .with_span()
            .parse_next(input)?;
    ws.parse_next(input)?;
    if labels.is_empty() && opt('=').parse_next(input)?.is_some() {
        ws.parse_next(input)?;
        let (expr, span) = cut_err(or_expr.with_span())
            .context(expected("attribute value"))
            .parse_next(input)?;
        return Ok(BodyItem::Attr(RawAttr {
            name: name.to_owned(),
            expr,
            span,
        }));
    }
    let body = nested(input, cut_err(body).context(expected("block body")))?;
    Ok(BodyItem::Block(RawBlock {
        kind: name.to_owned(),
        labels,
        body,
        header,
    }))
}

fn push_item(body: &mut RawBody, item: BodyItem) {
    match item {
        BodyItem::Attr(attr) => body.attrs.push(attr),
        BodyItem::Block(block) => body.blocks.push(block),
    }
}

fn body(input: &mut Input<'_>) -> ModalResult<RawBody> {
    '{'.parse_next(input)?;
    let mut out = RawBody::default();
    loop {
        ws.parse_next(input)?;
        if opt('}').parse_next(input)?.is_some() {
            return Ok(out);
        }
        let item = cut_err(body_item)
            .context(expected("attribute, block, or closing brace"))
            .parse_next(input)?;
        push_item(&mut out, item);
    }
}

/// A whole configuration file: a sequence of top-level items.
pub(crate) fn config(input: &mut Input<'_>) -> ModalResult<RawBody> {
    let items: Vec<BodyItem> = repeat(0.., preceded(ws, body_item)).parse_next(input)?;
    ws.parse_next(input)?;
    let mut out = RawBody::default();
    for item in items {
        push_item(&mut out, item);
    }
    Ok(out)
}
