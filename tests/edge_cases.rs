use condcheck::{eval_expr, references_in_expr, Context, Data, Expression, Referenceable, Value};

fn eval(src: &str, ctx: &Context) -> (Value, condcheck::Diagnostics) {
    eval_expr(&Expression::parse(src).unwrap(), ctx)
}

fn ctx() -> Context {
    Context::new()
        .set("var.u", Value::unknown())
        .set("var.n", 3_i64)
        .set("var.s", Value::from("x").mark_sensitive())
        .set("var.nothing", Value::null())
}

#[test]
fn decisive_operand_beats_unknown() {
    let ctx = ctx();
    let (v, diags) = eval("false && var.u", &ctx);
    assert!(diags.is_empty());
    assert_eq!(v.as_bool(), Some(false));

    let (v, _) = eval("var.u || true", &ctx);
    assert_eq!(v.as_bool(), Some(true));

    let (v, diags) = eval("true && var.u", &ctx);
    assert!(diags.is_empty());
    assert!(!v.is_known());
}

#[test]
fn unknown_spreads_through_comparisons() {
    let ctx = ctx();
    for src in ["var.u == 1", "var.u != 1", "var.u > 1", "!(var.u <= 2)"] {
        let (v, diags) = eval(src, &ctx);
        assert!(!v.is_known(), "{src} should be unknown");
        assert!(diags.is_empty());
    }
}

#[test]
fn sensitivity_propagates() {
    let ctx = ctx();
    let (v, _) = eval("var.s == \"x\"", &ctx);
    assert!(v.is_sensitive());
    assert_eq!(v.clone().unmark().0.as_bool(), Some(true));

    let (v, _) = eval("\"value: ${var.s}\"", &ctx);
    assert!(v.is_sensitive());

    let (v, _) = eval("nonsensitive(var.s)", &ctx);
    assert!(!v.is_sensitive());

    let (v, _) = eval("sensitive(var.n) > 1", &ctx);
    assert!(v.is_sensitive());
}

#[test]
fn lone_interpolation_keeps_type() {
    let (v, _) = eval("\"${var.n}\"", &ctx());
    assert_eq!(v.data(), &Data::Int(3));

    let (v, _) = eval("\"n=${var.n}\"", &ctx());
    assert_eq!(v.as_str(), Some("n=3"));
}

#[test]
fn null_in_template_is_an_error() {
    let (v, diags) = eval("\"got ${var.nothing}\"", &ctx());
    assert!(!v.is_known());
    assert_eq!(
        diags.iter().next().unwrap().summary,
        "Invalid template interpolation value"
    );
}

#[test]
fn mismatched_ordering_is_an_error() {
    let (v, diags) = eval("var.n < \"a\"", &ctx());
    assert!(!v.is_known());
    assert_eq!(diags.iter().next().unwrap().summary, "Invalid operand");
}

#[test]
fn equality_across_types_is_false() {
    let (v, diags) = eval("var.n == \"3\"", &ctx());
    assert!(diags.is_empty());
    assert_eq!(v.as_bool(), Some(false));
}

#[test]
fn missing_variable_is_reported() {
    let (v, diags) = eval("foo.bar == 1", &ctx());
    assert!(!v.is_known());
    let diag = diags.iter().next().unwrap();
    assert_eq!(diag.summary, "Unknown variable");
    assert_eq!(diag.detail, "There is no variable named \"foo\".");
}

#[test]
fn functions() {
    let ctx = ctx();
    assert_eq!(eval("contains([\"a\", \"b\"], \"b\")", &ctx).0.as_bool(), Some(true));
    assert_eq!(eval("tobool(\"false\")", &ctx).0.as_bool(), Some(false));
    assert_eq!(eval("length(\"héllo\")", &ctx).0.data(), &Data::Int(5));
    assert_eq!(eval("tostring(var.n)", &ctx).0.as_str(), Some("3"));

    let (_, diags) = eval("length(var.nothing)", &ctx);
    assert_eq!(diags.iter().next().unwrap().summary, "Invalid function argument");
    let (_, diags) = eval("upper(\"a\")", &ctx);
    assert_eq!(diags.iter().next().unwrap().summary, "Call to unknown function");
    let (_, diags) = eval("contains([1])", &ctx);
    assert_eq!(diags.iter().next().unwrap().summary, "Not enough function arguments");
    let (_, diags) = eval("length(1, 2)", &ctx);
    assert_eq!(diags.iter().next().unwrap().summary, "Too many function arguments");
}

#[test]
fn references_in_templates_and_calls() {
    let expr = Expression::parse("\"${var.a} ${length(local.items)} ${each.key}\"").unwrap();
    let (refs, diags) = references_in_expr(&expr);
    assert!(diags.is_empty());
    let subjects: Vec<Referenceable> = refs.into_iter().map(|r| r.subject).collect();
    assert_eq!(
        subjects,
        vec![
            Referenceable::InputVariable("a".into()),
            Referenceable::LocalValue("items".into()),
            Referenceable::EachKey,
        ]
    );
}
