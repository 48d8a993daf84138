use crate::types::{Expr, Expression, Pos, Resource, SourceRange, Span};

use super::ParseError;

/// `name = expr` inside a block body.
#[derive(Debug)]
pub(crate) struct RawAttr {
    pub name: String,
    pub expr: Expr,
    pub span: Span,
}

/// `kind "label" ... { body }`. `header` spans the kind and labels.
#[derive(Debug)]
pub(crate) struct RawBlock {
    pub kind: String,
    pub labels: Vec<String>,
    pub body: RawBody,
    pub header: Span,
}

#[derive(Debug, Default)]
pub(crate) struct RawBody {
    pub attrs: Vec<RawAttr>,
    pub blocks: Vec<RawBlock>,
}

/// A `precondition` or `postcondition` block before validation. Either
/// argument may be missing.
#[derive(Debug, Clone)]
pub struct ParsedRule {
    pub condition: Option<Expression>,
    pub error_message: Option<Expression>,
    pub decl_range: SourceRange,
}

#[derive(Debug, Clone)]
pub struct ParsedResource {
    pub resource: Resource,
    pub attributes: Vec<(String, Expression)>,
    pub preconditions: Vec<ParsedRule>,
    pub postconditions: Vec<ParsedRule>,
    pub decl_range: SourceRange,
}

#[derive(Debug, Clone)]
pub struct ParsedOutput {
    pub name: String,
    pub value: Option<Expression>,
    pub preconditions: Vec<ParsedRule>,
    pub decl_range: SourceRange,
}

/// The result of parsing configuration source, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ParsedConfig {
    pub resources: Vec<ParsedResource>,
    pub outputs: Vec<ParsedOutput>,
}

/// Maps byte offsets in a source text back to positions and slices.
pub(crate) struct Source<'a> {
    text: &'a str,
    filename: &'a str,
}

impl<'a> Source<'a> {
    pub(crate) fn new(text: &'a str, filename: &'a str) -> Self {
        Self { text, filename }
    }

    fn pos(&self, offset: usize) -> Pos {
        let start = Pos {
            line: 1,
            column: 1,
            byte: 0,
        };
        start.advance(self.text.get(..offset).unwrap_or(self.text))
    }

    fn range(&self, span: &Span) -> SourceRange {
        let start = self.pos(span.start);
        let end = start.advance(self.text.get(span.clone()).unwrap_or_default());
        SourceRange {
            filename: self.filename.to_owned(),
            start,
            end,
        }
    }

    pub(crate) fn expression(&self, expr: Expr, span: &Span) -> Expression {
        let text = self.text.get(span.clone()).unwrap_or_default().to_owned();
        Expression::new(expr, text, self.range(span))
    }

    pub(crate) fn error(&self, offset: usize, message: impl Into<String>) -> ParseError {
        ParseError::new(self.filename, self.pos(offset), message)
    }

    fn block_error(&self, block: &RawBlock, message: impl Into<String>) -> ParseError {
        self.error(block.header.start, message)
    }
}

pub(crate) fn build_config(source: &Source<'_>, raw: RawBody) -> Result<ParsedConfig, ParseError> {
    if let Some(attr) = raw.attrs.first() {
        return Err(source.error(
            attr.span.start,
            format!("unexpected argument \"{}\" outside of any block", attr.name),
        ));
    }

    let mut config = ParsedConfig::default();
    for block in raw.blocks {
        match block.kind.as_str() {
            "resource" | "data" => config.resources.push(build_resource(source, block)?),
            "output" => config.outputs.push(build_output(source, block)?),
            other => {
                return Err(source.block_error(
                    &block,
                    format!("unsupported block type \"{other}\""),
                ));
            }
        }
    }
    Ok(config)
}

fn expect_labels<'b>(
    source: &Source<'_>,
    block: &'b RawBlock,
    names: &[&str],
) -> Result<&'b [String], ParseError> {
    if block.labels.len() == names.len() {
        return Ok(&block.labels);
    }
    Err(source.block_error(
        block,
        format!(
            "{} block requires {} label(s) ({}), found {}",
            block.kind,
            names.len(),
            names.join(", "),
            block.labels.len()
        ),
    ))
}

fn build_resource(source: &Source<'_>, block: RawBlock) -> Result<ParsedResource, ParseError> {
    let labels = expect_labels(source, &block, &["type", "name"])?;
    let resource = if block.kind == "data" {
        Resource::data(&labels[0], &labels[1])
    } else {
        Resource::managed(&labels[0], &labels[1])
    };
    let decl_range = source.range(&block.header);

    let mut preconditions = Vec::new();
    let mut postconditions = Vec::new();
    for nested in &block.body.blocks {
        match nested.kind.as_str() {
            "lifecycle" => {
                expect_labels(source, nested, &[])?;
                for rule in &nested.body.blocks {
                    match rule.kind.as_str() {
                        "precondition" => preconditions.push(build_rule(source, rule)?),
                        "postcondition" => postconditions.push(build_rule(source, rule)?),
                        _ => {}
                    }
                }
            }
            "precondition" | "postcondition" => {
                return Err(source.block_error(
                    nested,
                    format!("{} blocks belong inside a lifecycle block", nested.kind),
                ));
            }
            _ => {}
        }
    }

    let attributes = block
        .body
        .attrs
        .into_iter()
        .map(|attr| {
            let expr = source.expression(attr.expr, &attr.span);
            (attr.name, expr)
        })
        .collect();

    Ok(ParsedResource {
        resource,
        attributes,
        preconditions,
        postconditions,
        decl_range,
    })
}

fn build_output(source: &Source<'_>, block: RawBlock) -> Result<ParsedOutput, ParseError> {
    let name = expect_labels(source, &block, &["name"])?[0].clone();
    let decl_range = source.range(&block.header);

    let mut preconditions = Vec::new();
    for nested in &block.body.blocks {
        match nested.kind.as_str() {
            "precondition" => preconditions.push(build_rule(source, nested)?),
            "postcondition" => {
                return Err(source.block_error(
                    nested,
                    "output values only support precondition blocks",
                ));
            }
            other => {
                return Err(source.block_error(
                    nested,
                    format!("unsupported block type \"{other}\" in output"),
                ));
            }
        }
    }

    let mut value = None;
    for attr in block.body.attrs {
        if attr.name == "value" {
            value = Some(source.expression(attr.expr, &attr.span));
        }
    }

    Ok(ParsedOutput {
        name,
        value,
        preconditions,
        decl_range,
    })
}

fn build_rule(source: &Source<'_>, block: &RawBlock) -> Result<ParsedRule, ParseError> {
    expect_labels(source, block, &[])?;
    if let Some(nested) = block.body.blocks.first() {
        return Err(source.block_error(
            nested,
            format!("unexpected block \"{}\" in {}", nested.kind, block.kind),
        ));
    }

    let mut condition = None;
    let mut error_message = None;
    for attr in &block.body.attrs {
        let slot = match attr.name.as_str() {
            "condition" => &mut condition,
            "error_message" => &mut error_message,
            other => {
                return Err(source.error(
                    attr.span.start,
                    format!("unsupported argument \"{other}\" in {}", block.kind),
                ));
            }
        };
        if slot.is_some() {
            return Err(source.error(
                attr.span.start,
                format!("duplicate argument \"{}\" in {}", attr.name, block.kind),
            ));
        }
        *slot = Some(source.expression(attr.expr.clone(), &attr.span));
    }

    Ok(ParsedRule {
        condition,
        error_message,
        decl_range: source.range(&block.header),
    })
}
