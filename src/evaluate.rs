use crate::types::{
    CompareOp, Context, Data, Diagnostic, Diagnostics, Expr, Expression, TemplatePart, Traversal,
};
use crate::Value;

/// Evaluate an expression against bound values.
///
/// Never fails outright: problems become error diagnostics and the affected
/// part of the expression evaluates to an unknown value. Unknown operands
/// make results unknown unless the other operand of `&&` or `||` already
/// decides them, and every result carries the sensitive mark of the values
/// it was computed from.
pub fn eval_expr(expression: &Expression, ctx: &Context) -> (Value, Diagnostics) {
    let mut eval = Evaluator {
        expression,
        ctx,
        diags: Diagnostics::new(),
    };
    let value = eval.eval(expression.expr());
    (value, eval.diags)
}

struct Evaluator<'a> {
    expression: &'a Expression,
    ctx: &'a Context,
    diags: Diagnostics,
}

impl Evaluator<'_> {
    fn error(&mut self, summary: &str, detail: String) -> Value {
        self.diags.push(
            Diagnostic::error(summary, detail)
                .with_subject(self.expression.range().clone())
                .with_expression(self.expression, self.ctx),
        );
        Value::unknown()
    }

    fn eval(&mut self, expr: &Expr) -> Value {
        match expr {
            Expr::Literal(value) => value.clone(),
            Expr::List(items) => {
                let values: Vec<Value> = items.iter().map(|e| self.eval(e)).collect();
                Value::new(Data::List(values))
            }
            Expr::Template(parts) => self.template(parts),
            Expr::Traversal(t) => self.traversal(t),
            Expr::Call { name, args } => {
                let args: Vec<Value> = args.iter().map(|e| self.eval(e)).collect();
                self.call(name, args)
            }
            Expr::Compare { lhs, op, rhs } => {
                let lhs = self.eval(lhs);
                let rhs = self.eval(rhs);
                self.compare(*op, &lhs, &rhs)
            }
            Expr::And(a, b) => {
                let a = self.eval(a);
                let b = self.eval(b);
                self.logical(a, b, false)
            }
            Expr::Or(a, b) => {
                let a = self.eval(a);
                let b = self.eval(b);
                self.logical(a, b, true)
            }
            Expr::Not(inner) => {
                let value = self.eval(inner);
                match self.bool_operand(value, "operand") {
                    Some((Some(b), mark)) => Value::from(!b).with_mark(mark),
                    Some((None, mark)) => Value::unknown().with_mark(mark),
                    None => Value::unknown(),
                }
            }
        }
    }

    fn traversal(&mut self, t: &Traversal) -> Value {
        let path = t.path();
        if let Some(value) = self.ctx.get(&path) {
            return value;
        }
        let subject = self.expression.subrange(&t.span);
        let root = t.root_name();
        let diag = if self.ctx.contains(root) {
            Diagnostic::error(
                "Unsupported attribute",
                format!("This object does not have an attribute at \"{path}\"."),
            )
        } else {
            Diagnostic::error(
                "Unknown variable",
                format!("There is no variable named \"{root}\"."),
            )
        };
        self.diags.push(diag.with_subject(subject));
        Value::unknown()
    }

    fn template(&mut self, parts: &[TemplatePart]) -> Value {
        if let [TemplatePart::Interpolation(only)] = parts {
            return self.eval(only);
        }
        let mut out = String::new();
        let mut known = true;
        let mut mark = false;
        for part in parts {
            match part {
                TemplatePart::Literal(s) => out.push_str(s),
                TemplatePart::Interpolation(e) => {
                    let value = self.eval(e);
                    mark |= value.is_sensitive();
                    if value.is_null() {
                        self.error(
                            "Invalid template interpolation value",
                            "The expression result is null. Cannot include a null value in a string template.".to_owned(),
                        );
                        known = false;
                        continue;
                    }
                    match value.convert_to_string() {
                        Ok(v) => match v.as_str() {
                            Some(s) => out.push_str(s),
                            None => known = false,
                        },
                        Err(err) => {
                            self.error(
                                "Invalid template interpolation value",
                                format!("Cannot include the given value in a string template: {err}."),
                            );
                            known = false;
                        }
                    }
                }
            }
        }
        if known {
            Value::from(out).with_mark(mark)
        } else {
            Value::unknown().with_mark(mark)
        }
    }

    fn compare(&mut self, op: CompareOp, lhs: &Value, rhs: &Value) -> Value {
        let mark = lhs.has_sensitive() || rhs.has_sensitive();
        if matches!(op, CompareOp::Eq | CompareOp::Neq) {
            return match equal(lhs, rhs) {
                Some(eq) => Value::from(eq == (op == CompareOp::Eq)).with_mark(mark),
                None => Value::unknown().with_mark(mark),
            };
        }
        if !lhs.is_known() || !rhs.is_known() {
            return Value::unknown().with_mark(mark);
        }
        let orderable = matches!(
            (lhs.data(), rhs.data()),
            (Data::Int(_) | Data::Float(_), Data::Int(_) | Data::Float(_))
                | (Data::String(_), Data::String(_))
        );
        match lhs.compare(op, rhs) {
            Some(result) if orderable => Value::from(result).with_mark(mark),
            _ => self.error(
                "Invalid operand",
                format!(
                    "Cannot compare a {} value with a {} value using \"{op}\".",
                    lhs.type_name(),
                    rhs.type_name()
                ),
            ),
        }
    }

    /// Convert a logical operand. `None` means an error was reported;
    /// otherwise the bool (if known) and the operand's mark.
    fn bool_operand(&mut self, value: Value, side: &str) -> Option<(Option<bool>, bool)> {
        let mark = value.is_sensitive();
        if value.is_null() {
            self.error(
                "Invalid operand",
                format!("Unsuitable value for {side}: a bool is required, not null."),
            );
            return None;
        }
        match value.convert_to_bool() {
            Ok(v) => Some((v.as_bool(), mark)),
            Err(err) => {
                self.error("Invalid operand", format!("Unsuitable value for {side}: {err}."));
                None
            }
        }
    }

    /// `&&` when `decisive` is false, `||` when it is true.
    fn logical(&mut self, a: Value, b: Value, decisive: bool) -> Value {
        let a = self.bool_operand(a, "left operand");
        let b = self.bool_operand(b, "right operand");
        let (Some((a, a_mark)), Some((b, b_mark))) = (a, b) else {
            return Value::unknown();
        };
        let mark = a_mark || b_mark;
        match (a, b) {
            (Some(x), _) | (_, Some(x)) if x == decisive => Value::from(decisive).with_mark(mark),
            (Some(_), Some(_)) => Value::from(!decisive).with_mark(mark),
            _ => Value::unknown().with_mark(mark),
        }
    }

    fn call(&mut self, name: &str, args: Vec<Value>) -> Value {
        let params: &[&str] = match name {
            "sensitive" | "nonsensitive" | "length" => &["value"],
            "tostring" | "tobool" => &["v"],
            "contains" => &["list", "value"],
            _ => {
                return self.error(
                    "Call to unknown function",
                    format!("There is no function named \"{name}\"."),
                );
            }
        };
        if args.len() < params.len() {
            return self.error(
                "Not enough function arguments",
                format!(
                    "Function \"{name}\" expects {} argument(s). Missing value for \"{}\".",
                    params.len(),
                    params[args.len()]
                ),
            );
        }
        if args.len() > params.len() {
            return self.error(
                "Too many function arguments",
                format!("Function \"{name}\" expects only {} argument(s).", params.len()),
            );
        }

        let mut args = args.into_iter();
        let Some(first) = args.next() else {
            return Value::unknown();
        };
        match name {
            "sensitive" => first.mark_sensitive(),
            "nonsensitive" => first.unmark().0,
            "length" => self.length(first),
            "tostring" => match first.convert_to_string() {
                Ok(v) => v,
                Err(err) => self.invalid_argument(params[0], &err.to_string()),
            },
            "tobool" => match first.convert_to_bool() {
                Ok(v) => v,
                Err(err) => self.invalid_argument(params[0], &err.to_string()),
            },
            _ => {
                let needle = args.next().unwrap_or_else(Value::unknown);
                self.contains(first, &needle)
            }
        }
    }

    fn invalid_argument(&mut self, param: &str, err: &str) -> Value {
        self.error(
            "Invalid function argument",
            format!("Invalid value for \"{param}\" parameter: {err}."),
        )
    }

    fn length(&mut self, value: Value) -> Value {
        let mark = value.has_sensitive();
        let len = match value.data() {
            Data::Unknown => return Value::unknown().with_mark(mark),
            Data::String(s) => s.chars().count(),
            Data::List(items) => items.len(),
            Data::Null => return self.invalid_argument("value", "argument must not be null"),
            _ => {
                return self.invalid_argument(
                    "value",
                    "argument must be a string or a list",
                );
            }
        };
        Value::from(i64::try_from(len).unwrap_or(i64::MAX)).with_mark(mark)
    }

    fn contains(&mut self, list: Value, needle: &Value) -> Value {
        let mark = list.has_sensitive() || needle.has_sensitive();
        match list.data() {
            Data::Unknown => Value::unknown().with_mark(mark),
            Data::List(items) => {
                let mut unknown = false;
                for item in items {
                    match equal(item, needle) {
                        Some(true) => return Value::from(true).with_mark(mark),
                        Some(false) => {}
                        None => unknown = true,
                    }
                }
                if unknown {
                    Value::unknown().with_mark(mark)
                } else {
                    Value::from(false).with_mark(mark)
                }
            }
            _ => self.invalid_argument("list", "a list is required"),
        }
    }
}

/// Structural equality ignoring marks. `None` when an unknown value makes
/// the answer undecidable.
fn equal(a: &Value, b: &Value) -> Option<bool> {
    match (a.data(), b.data()) {
        (Data::Unknown, _) | (_, Data::Unknown) => None,
        (Data::Null, Data::Null) => Some(true),
        (Data::Null, _) | (_, Data::Null) => Some(false),
        (Data::List(xs), Data::List(ys)) => {
            if xs.len() != ys.len() {
                return Some(false);
            }
            let mut unknown = false;
            for (x, y) in xs.iter().zip(ys) {
                match equal(x, y) {
                    Some(false) => return Some(false),
                    None => unknown = true,
                    Some(true) => {}
                }
            }
            if unknown {
                None
            } else {
                Some(true)
            }
        }
        _ => Some(a.compare(CompareOp::Eq, b).unwrap_or(false)),
    }
}
