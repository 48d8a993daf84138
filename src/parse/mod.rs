mod error;
mod grammar;
mod parser;

use winnow::Parser;

use crate::types::Expression;

pub use error::ParseError;
pub use parser::{ParsedConfig, ParsedOutput, ParsedResource, ParsedRule};

/// Source name used for standalone expressions.
const EXPRESSION_SOURCE: &str = "<expr>";

fn describe(inner: &winnow::error::ContextError) -> String {
    let rendered = inner.to_string();
    if rendered.trim().is_empty() {
        "unexpected input".to_owned()
    } else {
        rendered.lines().collect::<Vec<_>>().join("; ")
    }
}

/// Parse a standalone condition or error-message expression.
///
/// The returned [`Expression`] keeps the trimmed source text, and its range
/// points into a source named `<expr>`.
///
/// # Errors
///
/// Returns [`ParseError`] if the input is not a valid expression.
pub fn parse_expression(input: &str) -> Result<Expression, ParseError> {
    let source = parser::Source::new(input, EXPRESSION_SOURCE);
    let (expr, span) = grammar::expression
        .parse(grammar::input(input))
        .map_err(|e| source.error(e.offset(), describe(e.inner())))?;
    Ok(source.expression(expr, &span))
}

/// Parse configuration source into unvalidated blocks. `filename` is used
/// in source ranges and error messages.
///
/// # Errors
///
/// Returns [`ParseError`] if the input is not valid configuration syntax or
/// uses a block or argument that does not belong where it appears.
pub fn parse_config(input: &str, filename: &str) -> Result<ParsedConfig, ParseError> {
    let source = parser::Source::new(input, filename);
    let raw = grammar::config
        .parse(grammar::input(input))
        .map_err(|e| source.error(e.offset(), describe(e.inner())))?;
    parser::build_config(&source, raw)
}
