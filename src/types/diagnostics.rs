use std::fmt;

use thiserror::Error;

use super::context::Context;
use super::expr::{Expression, SourceRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "Error"),
            Severity::Warning => write!(f, "Warning"),
        }
    }
}

/// A single problem report.
///
/// `expression` and `eval_context` are attached for conditions so that a
/// renderer can show the values that led to the outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    pub subject: Option<SourceRange>,
    pub expression: Option<Expression>,
    pub eval_context: Option<Context>,
}

impl Diagnostic {
    pub fn new(severity: Severity, summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity,
            summary: summary.into(),
            detail: detail.into(),
            subject: None,
            expression: None,
            eval_context: None,
        }
    }

    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(Severity::Error, summary, detail)
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(Severity::Warning, summary, detail)
    }

    #[must_use]
    pub fn with_subject(mut self, subject: SourceRange) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Attach the expression and the context it was evaluated in. The
    /// subject defaults to the expression's range.
    #[must_use]
    pub fn with_expression(mut self, expression: &Expression, ctx: &Context) -> Self {
        if self.subject.is_none() {
            self.subject = Some(expression.range().clone());
        }
        self.expression = Some(expression.clone());
        self.eval_context = Some(ctx.clone());
        self
    }

    /// The values of each reference in the attached expression, as
    /// `(path, rendered value)` pairs. Sensitive values never render their
    /// content.
    #[must_use]
    pub fn expression_values(&self) -> Vec<(String, String)> {
        let (Some(expression), Some(ctx)) = (&self.expression, &self.eval_context) else {
            return Vec::new();
        };
        let mut out: Vec<(String, String)> = Vec::new();
        expression.expr().walk_traversals(&mut |t| {
            let path = t.path();
            if out.iter().any(|(p, _)| *p == path) {
                return;
            }
            if let Some(value) = ctx.get(&path) {
                out.push((path, value.to_string()));
            }
        });
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.summary)?;
        if let Some(subject) = &self.subject {
            write!(f, "\n\n  on {subject}:")?;
            if let Some(expression) = &self.expression {
                write!(f, "\n  {expression}")?;
            }
            for (path, value) in self.expression_values() {
                write!(f, "\n    {path} is {value}")?;
            }
        }
        if !self.detail.is_empty() {
            write!(f, "\n\n{}", self.detail)?;
        }
        Ok(())
    }
}

/// The error-severity diagnostics of a [`Diagnostics`] collection, as a
/// standard error value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render_problems(.problems))]
pub struct DiagnosticsError {
    problems: Vec<String>,
}

impl DiagnosticsError {
    #[must_use]
    pub fn problems(&self) -> &[String] {
        &self.problems
    }
}

fn render_problems(problems: &[String]) -> String {
    match problems {
        [one] => one.clone(),
        many => {
            let mut out = format!("{} problems:\n", many.len());
            for p in many {
                out.push_str("\n- ");
                out.push_str(p);
            }
            out
        }
    }
}

/// An ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diag: Diagnostic) {
        self.0.push(diag);
    }

    /// Append every diagnostic from `other`, preserving order.
    pub fn append(&mut self, other: impl IntoIterator<Item = Diagnostic>) {
        self.0.extend(other);
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    /// The error diagnostics combined into one error value, or `None` if
    /// there are no errors.
    #[must_use]
    pub fn err(&self) -> Option<DiagnosticsError> {
        let problems: Vec<String> = self
            .errors()
            .map(|d| {
                if d.detail.is_empty() {
                    d.summary.clone()
                } else {
                    format!("{}: {}", d.summary, d.detail)
                }
            })
            .collect();
        if problems.is_empty() {
            None
        } else {
            Some(DiagnosticsError { problems })
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diag: Diagnostic) -> Self {
        Self(vec![diag])
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<T: IntoIterator<Item = Diagnostic>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diag) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "\n\n")?;
            }
            write!(f, "{diag}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::expr::{traversal, Expression};
    use crate::Value;

    #[test]
    fn empty_has_no_errors() {
        let diags = Diagnostics::new();
        assert!(diags.is_empty());
        assert!(!diags.has_errors());
        assert!(diags.err().is_none());
    }

    #[test]
    fn warnings_are_not_errors() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::warning("Heads up", "just a warning"));
        assert!(!diags.has_errors());
        assert!(diags.err().is_none());
        assert_eq!(diags.warnings().count(), 1);
    }

    #[test]
    fn single_error_message() {
        let diags = Diagnostics::from(Diagnostic::error("Bad thing", "it broke"));
        assert!(diags.has_errors());
        assert_eq!(diags.err().unwrap().to_string(), "Bad thing: it broke");
    }

    #[test]
    fn multiple_error_message() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::error("First", "one"));
        diags.push(Diagnostic::warning("Ignored", "warning"));
        diags.push(Diagnostic::error("Second", ""));
        assert_eq!(
            diags.err().unwrap().to_string(),
            "2 problems:\n\n- First: one\n- Second"
        );
    }

    #[test]
    fn append_preserves_order() {
        let mut a = Diagnostics::from(Diagnostic::error("a", ""));
        let b: Diagnostics = vec![Diagnostic::error("b", ""), Diagnostic::error("c", "")]
            .into_iter()
            .collect();
        a.append(b);
        let summaries: Vec<&str> = a.iter().map(|d| d.summary.as_str()).collect();
        assert_eq!(summaries, vec!["a", "b", "c"]);
    }

    #[test]
    fn expression_values_hide_sensitive_content() {
        let expr = Expression::from_expr(traversal("var.password").eq("x"));
        let ctx = Context::new().set("var.password", Value::from("hunter2").mark_sensitive());
        let diag = Diagnostic::error("Failed", "").with_expression(&expr, &ctx);
        assert_eq!(
            diag.expression_values(),
            vec![("var.password".to_owned(), "(sensitive value)".to_owned())]
        );
        assert!(!diag.to_string().contains("hunter2"));
    }

    #[test]
    fn display_includes_location_and_detail() {
        let expr = Expression::from_expr(traversal("var.count").gt(0_i64));
        let ctx = Context::new().set("var.count", 0_i64);
        let diag = Diagnostic::error("Resource precondition failed", "Need instances.")
            .with_expression(&expr, &ctx);
        let rendered = diag.to_string();
        assert!(rendered.starts_with("Error: Resource precondition failed"));
        assert!(rendered.contains("on <builtin>:1,1-"));
        assert!(rendered.contains("var.count is 0"));
        assert!(rendered.ends_with("Need instances."));
    }
}
