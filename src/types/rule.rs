use super::expr::{Expr, Expression, SourceRange};

/// One declared assertion: a condition that must hold and the message to
/// show when it does not.
///
/// Rules are immutable once loaded. Their kind and position come from the
/// list they sit in, not from the rule itself; see
/// [`CheckType::rule_addr`](crate::CheckType::rule_addr).
#[derive(Debug, Clone, PartialEq)]
pub struct CheckRule {
    pub condition: Expression,
    pub error_message: Expression,
    pub decl_range: SourceRange,
}

impl CheckRule {
    /// Build a rule from two parsed expressions. The declaration range is the
    /// condition's range.
    #[must_use]
    pub fn new(condition: Expression, error_message: Expression) -> Self {
        let decl_range = condition.range().clone();
        Self {
            condition,
            error_message,
            decl_range,
        }
    }

    /// Build a rule from expressions constructed in code.
    #[must_use]
    pub fn from_exprs(condition: Expr, error_message: Expr) -> Self {
        Self::new(
            Expression::from_expr(condition),
            Expression::from_expr(error_message),
        )
    }

    /// Parse both expressions from source text.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`](crate::parse::ParseError) if either input is
    /// not a valid expression.
    pub fn parse(condition: &str, error_message: &str) -> Result<Self, crate::parse::ParseError> {
        Ok(Self::new(
            Expression::parse(condition)?,
            Expression::parse(error_message)?,
        ))
    }
}
