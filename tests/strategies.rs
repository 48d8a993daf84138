#![allow(dead_code)]

use condcheck::{lit, traversal, CheckRule, Context, Expr, Expression, Value};
use proptest::prelude::*;

// --- Fixed variable schema ---
// var.a, var.b : i64 (-5..=5), possibly unknown, possibly sensitive
// var.flag     : bool, null, or unknown
// var.name     : string, one of NAMES, possibly sensitive

const NAMES: &[&str] = &["web", "db", "cache", "queue"];

/// Secret content that must never appear in stored messages.
pub const SECRET: &str = "s3cr3t-value";

fn maybe_sensitive(value: Value, sensitive: bool) -> Value {
    if sensitive {
        value.mark_sensitive()
    } else {
        value
    }
}

fn arb_int() -> impl Strategy<Value = Value> {
    prop_oneof![
        8 => (-5_i64..=5, any::<bool>()).prop_map(|(v, s)| maybe_sensitive(Value::from(v), s)),
        1 => Just(Value::unknown()),
    ]
}

fn arb_flag() -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => any::<bool>().prop_map(Value::from),
        1 => Just(Value::null()),
        1 => Just(Value::unknown()),
    ]
}

/// A context that binds every variable in the schema.
pub fn arb_context() -> impl Strategy<Value = Context> {
    (
        arb_int(),
        arb_int(),
        arb_flag(),
        prop::sample::select(NAMES),
        any::<bool>(),
    )
        .prop_map(|(a, b, flag, name, secret_name)| {
            Context::new()
                .set("var.a", a)
                .set("var.b", b)
                .set("var.flag", flag)
                .set("var.name", maybe_sensitive(Value::from(name), secret_name))
                .set("var.secret", Value::from(SECRET).mark_sensitive())
        })
}

/// A context in which every variable has a known, non-sensitive value.
pub fn arb_known_context() -> impl Strategy<Value = Context> {
    (-5_i64..=5, -5_i64..=5, any::<bool>(), prop::sample::select(NAMES)).prop_map(
        |(a, b, flag, name)| {
            Context::new()
                .set("var.a", a)
                .set("var.b", b)
                .set("var.flag", flag)
                .set("var.name", name)
                .set("var.secret", Value::from(SECRET).mark_sensitive())
        },
    )
}

fn arb_leaf() -> impl Strategy<Value = Expr> {
    prop_oneof![
        (prop::sample::select(&["var.a", "var.b"][..]), -5_i64..=5, 0u8..6).prop_map(
            |(path, v, op)| {
                let t = traversal(path);
                match op {
                    0 => t.eq(v),
                    1 => t.neq(v),
                    2 => t.gt(v),
                    3 => t.gte(v),
                    4 => t.lt(v),
                    _ => t.lte(v),
                }
            }
        ),
        prop::sample::select(NAMES).prop_map(|n| traversal("var.name").eq(n)),
        Just(traversal("var.flag").get()),
        any::<bool>().prop_map(|b| lit(b)),
    ]
}

/// A boolean-shaped condition over the schema.
pub fn arb_condition() -> impl Strategy<Value = Expr> {
    arb_leaf().prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| l.and(r)),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| l.or(r)),
            inner.prop_map(|e| Expr::Not(Box::new(e))),
        ]
    })
}

/// A rule whose error message is a plain literal.
pub fn arb_rule() -> impl Strategy<Value = CheckRule> {
    (arb_condition(), "[A-Z][a-z ]{0,20}\\.").prop_map(|(condition, message)| {
        CheckRule::new(Expression::from_expr(condition), Expression::from_expr(lit(message)))
    })
}

/// A rule whose error message interpolates the secret.
pub fn arb_leaky_rule() -> impl Strategy<Value = CheckRule> {
    arb_condition().prop_map(|condition| {
        CheckRule::new(
            Expression::from_expr(condition),
            Expression::parse("\"The secret is ${var.secret}.\"").unwrap(),
        )
    })
}

pub fn arb_rules() -> impl Strategy<Value = Vec<CheckRule>> {
    prop::collection::vec(arb_rule(), 0..6)
}
