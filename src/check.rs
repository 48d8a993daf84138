use std::fmt;

use tracing::{debug, debug_span, error, trace};

use crate::evaluate::eval_expr;
use crate::references::references_in_expr;
use crate::scope::EvalContext;
use crate::types::{
    CheckRule, Checkable, ConditionResult, ConditionType, Diagnostic, Diagnostics, RepetitionData,
    ResourceInstance, Severity,
};

const INVALID_CONDITION: &str = "Invalid condition result";
const NULL_CONDITION: &str = "Condition expression must return either true or false, not null.";
const FALLBACK_MESSAGE: &str = "Failed to evaluate condition error message.";
const SENSITIVE_MESSAGE: &str =
    "The error message included a sensitive value, so it will not be displayed.";
const SENSITIVE_DETAIL: &str = "The error expression used to explain this condition refers to sensitive values, so the resulting message will not be displayed.

You can correct this by removing references to sensitive values, or by carefully using the nonsensitive() function if the expression will not reveal the sensitive data.";

/// The kind of rule list being evaluated.
///
/// `Invalid` only exists to catch dispatch bugs upstream; no configuration
/// produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckType {
    Invalid,
    ResourcePrecondition,
    ResourcePostcondition,
    OutputPrecondition,
}

impl CheckType {
    /// Summary of the diagnostic reported when a rule of this kind fails.
    #[must_use]
    pub fn failure_summary(self) -> &'static str {
        match self {
            CheckType::ResourcePrecondition => "Resource precondition failed",
            CheckType::ResourcePostcondition => "Resource postcondition failed",
            CheckType::OutputPrecondition => "Module output value precondition failed",
            CheckType::Invalid => {
                error!("condition failure reported for an invalid check type");
                "Failed condition for invalid check type"
            }
        }
    }

    /// Stable address of rule `index` of `owner`, e.g.
    /// `aws_instance.web.postconditions[2]`.
    #[must_use]
    pub fn rule_addr(self, owner: &Checkable, index: usize) -> String {
        let list = match self {
            CheckType::ResourcePrecondition | CheckType::OutputPrecondition => "preconditions",
            CheckType::ResourcePostcondition => "postconditions",
            CheckType::Invalid => {
                error!(owner = %owner, index, "rule address requested for an invalid check type");
                "conditions"
            }
        };
        format!("{owner}.{list}[{index}]")
    }

    #[must_use]
    pub fn condition_type(self) -> ConditionType {
        match self {
            CheckType::ResourcePrecondition => ConditionType::ResourcePrecondition,
            CheckType::ResourcePostcondition => ConditionType::ResourcePostcondition,
            CheckType::OutputPrecondition => ConditionType::OutputPrecondition,
            CheckType::Invalid => ConditionType::InvalidCondition,
        }
    }

    /// Whether rules of this kind may refer to `self`.
    #[must_use]
    pub fn references_self(self) -> bool {
        self == CheckType::ResourcePostcondition
    }
}

impl fmt::Display for CheckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckType::Invalid => write!(f, "Invalid"),
            CheckType::ResourcePrecondition => write!(f, "ResourcePrecondition"),
            CheckType::ResourcePostcondition => write!(f, "ResourcePostcondition"),
            CheckType::OutputPrecondition => write!(f, "OutputPrecondition"),
        }
    }
}

/// Evaluate every rule in `rules` for `owner` and record each outcome in
/// the context's result store under its rule address.
///
/// Failed rules produce diagnostics at `severity`; unknown rules are
/// recorded as unknown and reported as nothing. Diagnostics keep the
/// declared rule order. An empty rule list records nothing.
///
/// # Panics
///
/// Panics if `typ` is [`CheckType::ResourcePostcondition`] and `owner` is
/// not a resource instance.
pub fn eval_check_rules<C: EvalContext + ?Sized>(
    typ: CheckType,
    rules: &[CheckRule],
    ctx: &C,
    owner: &Checkable,
    key_data: &RepetitionData,
    severity: Severity,
) -> Diagnostics {
    let mut diags = Diagnostics::new();
    if rules.is_empty() {
        return diags;
    }

    let span = debug_span!("eval_check_rules", check_type = %typ, owner = %owner, rules = rules.len());
    let _guard = span.enter();

    for (i, rule) in rules.iter().enumerate() {
        let rule_addr = typ.rule_addr(owner, i);
        let (result, rule_diags) = eval_check_rule(typ, rule, ctx, owner, key_data, severity);
        debug!(
            rule = %rule_addr,
            unknown = result.unknown,
            result = result.result,
            diagnostics = rule_diags.len(),
            "condition evaluated"
        );
        diags.append(rule_diags);
        ctx.conditions().set_result(&rule_addr, result);
    }

    diags
}

fn self_reference(typ: CheckType, owner: &Checkable) -> Option<&ResourceInstance> {
    if !typ.references_self() {
        return None;
    }
    match owner {
        Checkable::ResourceInstance(addr) => Some(&addr.resource),
        Checkable::OutputValue(_) => {
            panic!("{typ} rules need a resource instance owner for self, got {owner}")
        }
    }
}

/// Evaluate a single rule. Does not touch the result store.
///
/// # Panics
///
/// Panics if `typ` is [`CheckType::ResourcePostcondition`] and `owner` is
/// not a resource instance.
pub fn eval_check_rule<C: EvalContext + ?Sized>(
    typ: CheckType,
    rule: &CheckRule,
    ctx: &C,
    owner: &Checkable,
    key_data: &RepetitionData,
    severity: Severity,
) -> (ConditionResult, Diagnostics) {
    let mut diags = Diagnostics::new();
    let mut result = ConditionResult::pending(owner.clone(), typ.condition_type());

    let (mut refs, more) = references_in_expr(&rule.condition);
    diags.append(more);
    let (message_refs, more) = references_in_expr(&rule.error_message);
    diags.append(more);
    refs.extend(message_refs);

    let self_ref = self_reference(typ, owner);
    let (scope, more) = ctx.resolve_references(&refs, self_ref, key_data);
    diags.append(more);

    let (value, more) = eval_expr(&rule.condition, &scope);
    diags.append(more);
    let (message_value, message_diags) = eval_expr(&rule.error_message, &scope);
    let message_failed = message_diags.has_errors();
    diags.append(message_diags);

    if let Some(err) = diags.err() {
        trace!(check_type = %typ, owner = %owner, error = %err, "condition evaluation reported errors");
    }

    if !value.is_known() {
        return (result, diags);
    }
    result.unknown = false;

    let failure = |summary: &str, detail: &str| {
        Diagnostic::new(severity, summary, detail)
            .with_subject(rule.condition.range().clone())
            .with_expression(&rule.condition, &scope)
    };

    if value.is_null() {
        diags.push(failure(INVALID_CONDITION, NULL_CONDITION));
        result.error_message = NULL_CONDITION.to_owned();
        return (result, diags);
    }
    let value = match value.convert_to_bool() {
        Ok(v) => v,
        Err(err) => {
            let detail = format!("Invalid condition result value: {err}.");
            diags.push(failure(INVALID_CONDITION, &detail));
            result.error_message = detail;
            return (result, diags);
        }
    };

    let (value, _) = value.unmark();
    result.result = value.as_bool() == Some(true);
    if result.result {
        return (result, diags);
    }

    let mut message = String::new();
    if !message_failed && message_value.is_known() && !message_value.is_null() {
        let about_message = |d: Diagnostic| {
            d.with_subject(rule.error_message.range().clone())
                .with_expression(&rule.error_message, &scope)
        };
        match message_value.convert_to_string() {
            Err(err) => diags.push(about_message(Diagnostic::new(
                severity,
                "Invalid error message",
                format!("Unsuitable value for error message: {err}."),
            ))),
            Ok(v) if v.is_sensitive() => {
                diags.push(about_message(Diagnostic::warning(
                    "Error message refers to sensitive values",
                    SENSITIVE_DETAIL,
                )));
                message = SENSITIVE_MESSAGE.to_owned();
            }
            Ok(v) => message = v.as_str().unwrap_or_default().trim().to_owned(),
        }
    }
    if message.is_empty() {
        message = FALLBACK_MESSAGE.to_owned();
    }

    diags.push(failure(typ.failure_summary(), &message));
    result.error_message = message;
    (result, diags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::MemoryEvalContext;
    use crate::types::{Context, InstanceKey, ModuleInstance, OutputValue, Resource};
    use crate::Value;

    fn web() -> Checkable {
        Resource::managed("aws_instance", "web")
            .instance(InstanceKey::NoKey)
            .absolute(ModuleInstance::root())
            .into()
    }

    fn output() -> Checkable {
        OutputValue::new("id").absolute(ModuleInstance::root()).into()
    }

    fn rule(condition: &str, message: &str) -> CheckRule {
        CheckRule::parse(condition, message).unwrap()
    }

    fn run(ctx: &MemoryEvalContext, typ: CheckType, r: &CheckRule, owner: &Checkable) -> (ConditionResult, Diagnostics) {
        eval_check_rule(typ, r, ctx, owner, &RepetitionData::none(), Severity::Error)
    }

    #[test]
    fn failure_summaries() {
        assert_eq!(
            CheckType::ResourcePrecondition.failure_summary(),
            "Resource precondition failed"
        );
        assert_eq!(
            CheckType::ResourcePostcondition.failure_summary(),
            "Resource postcondition failed"
        );
        assert_eq!(
            CheckType::OutputPrecondition.failure_summary(),
            "Module output value precondition failed"
        );
        assert_eq!(
            CheckType::Invalid.failure_summary(),
            "Failed condition for invalid check type"
        );
    }

    #[test]
    fn rule_addresses() {
        assert_eq!(
            CheckType::ResourcePostcondition.rule_addr(&web(), 2),
            "aws_instance.web.postconditions[2]"
        );
        assert_eq!(
            CheckType::ResourcePrecondition.rule_addr(&web(), 0),
            "aws_instance.web.preconditions[0]"
        );
        assert_eq!(
            CheckType::OutputPrecondition.rule_addr(&output(), 1),
            "output.id.preconditions[1]"
        );
        assert_eq!(
            CheckType::Invalid.rule_addr(&web(), 3),
            "aws_instance.web.conditions[3]"
        );
    }

    #[test]
    fn condition_types_and_self() {
        assert_eq!(
            CheckType::OutputPrecondition.condition_type(),
            ConditionType::OutputPrecondition
        );
        assert_eq!(
            CheckType::Invalid.condition_type(),
            ConditionType::InvalidCondition
        );
        assert!(CheckType::ResourcePostcondition.references_self());
        assert!(!CheckType::ResourcePrecondition.references_self());
        assert!(!CheckType::OutputPrecondition.references_self());
    }

    #[test]
    fn passing_rule() {
        let ctx = MemoryEvalContext::new(Context::new().set("var.n", 2_i64));
        let (result, diags) = run(&ctx, CheckType::ResourcePrecondition, &rule("var.n > 0", "\"n\""), &web());
        assert!(diags.is_empty());
        assert!(result.result);
        assert!(!result.unknown);
        assert!(result.error_message.is_empty());
    }

    #[test]
    fn failing_rule_uses_trimmed_message() {
        let ctx = MemoryEvalContext::new(Context::new().set("var.n", 0_i64));
        let (result, diags) = run(
            &ctx,
            CheckType::ResourcePrecondition,
            &rule("var.n > 0", "\"  Need instances.  \""),
            &web(),
        );
        assert!(!result.result);
        assert_eq!(result.error_message, "Need instances.");
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.summary, "Resource precondition failed");
        assert_eq!(diag.detail, "Need instances.");
        assert_eq!(diag.subject.as_ref(), Some(rule("var.n > 0", "\"x\"").condition.range()));
        assert!(diag.eval_context.as_ref().unwrap().get("var.n").is_some());
    }

    #[test]
    fn unknown_condition_defers() {
        let ctx = MemoryEvalContext::new(Context::new().set("var.n", Value::unknown()));
        let (result, diags) = run(&ctx, CheckType::ResourcePrecondition, &rule("var.n > 0", "\"x\""), &web());
        assert!(result.unknown);
        assert!(diags.is_empty());
    }

    #[test]
    fn null_condition() {
        let ctx = MemoryEvalContext::new(Context::new().set("var.flag", Value::null()));
        let (result, diags) = run(&ctx, CheckType::ResourcePrecondition, &rule("var.flag", "\"x\""), &web());
        assert!(!result.unknown);
        assert!(!result.result);
        assert_eq!(result.error_message, NULL_CONDITION);
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.summary, "Invalid condition result");
        assert_eq!(diag.detail, NULL_CONDITION);
    }

    #[test]
    fn non_bool_condition() {
        let ctx = MemoryEvalContext::new(Context::new().set("var.n", 5_i64));
        let (result, diags) = run(&ctx, CheckType::ResourcePrecondition, &rule("var.n", "\"x\""), &web());
        assert!(!result.result);
        assert_eq!(
            result.error_message,
            "Invalid condition result value: a bool is required."
        );
        assert_eq!(diags.iter().next().unwrap().summary, "Invalid condition result");
    }

    #[test]
    fn string_true_converts() {
        let ctx = MemoryEvalContext::new(Context::new().set("var.s", "true"));
        let (result, diags) = run(&ctx, CheckType::ResourcePrecondition, &rule("var.s", "\"x\""), &web());
        assert!(diags.is_empty());
        assert!(result.result);
    }

    #[test]
    fn sensitive_condition_is_unmarked() {
        let ctx = MemoryEvalContext::new(Context::new().set("var.p", Value::from("x").mark_sensitive()));
        let (result, diags) = run(&ctx, CheckType::ResourcePrecondition, &rule("var.p == \"x\"", "\"m\""), &web());
        assert!(diags.is_empty());
        assert!(result.result);
    }

    #[test]
    fn sensitive_message_is_withheld() {
        let ctx = MemoryEvalContext::new(
            Context::new()
                .set("var.ok", false)
                .set("var.secret", Value::from("hunter2").mark_sensitive()),
        );
        let (result, diags) = run(
            &ctx,
            CheckType::ResourcePrecondition,
            &rule("var.ok", "\"secret is ${var.secret}\""),
            &web(),
        );
        assert_eq!(result.error_message, SENSITIVE_MESSAGE);
        let all: Vec<&Diagnostic> = diags.iter().collect();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].severity, Severity::Warning);
        assert_eq!(all[0].summary, "Error message refers to sensitive values");
        assert_eq!(all[1].detail, SENSITIVE_MESSAGE);
        assert!(!diags.to_string().contains("hunter2"));
    }

    #[test]
    fn marks_inside_lists_withhold_the_message() {
        let list = Value::new(crate::Data::List(vec![Value::from("hunter2").mark_sensitive()]));
        let ctx = MemoryEvalContext::new(Context::new().set("var.ok", false).set("var.l", list));
        for message in [
            "\"has=${contains(var.l, \"hunter2\")}\"",
            "\"eq=${var.l == [\"hunter2\"]}\"",
        ] {
            let (result, diags) = run(&ctx, CheckType::ResourcePrecondition, &rule("var.ok", message), &web());
            assert_eq!(result.error_message, SENSITIVE_MESSAGE, "failed for {message}");
            assert_eq!(diags.warnings().count(), 1);
            assert_eq!(diags.len(), 2);
        }
    }

    #[test]
    fn message_fallbacks() {
        let ctx = MemoryEvalContext::new(
            Context::new()
                .set("var.ok", false)
                .set("var.u", Value::unknown())
                .set("var.n", Value::null())
                .set("var.blank", "   "),
        );
        for message in ["var.u", "var.n", "var.blank", "var.missing"] {
            let (result, _) = run(&ctx, CheckType::ResourcePrecondition, &rule("var.ok", message), &web());
            assert_eq!(result.error_message, FALLBACK_MESSAGE, "failed for {message}");
        }
    }

    #[test]
    fn unsuitable_message() {
        let ctx = MemoryEvalContext::new(Context::new().set("var.ok", false));
        let (result, diags) = run(&ctx, CheckType::ResourcePrecondition, &rule("var.ok", "[1]"), &web());
        assert_eq!(result.error_message, FALLBACK_MESSAGE);
        let summaries: Vec<&str> = diags.iter().map(|d| d.summary.as_str()).collect();
        assert_eq!(summaries, vec!["Invalid error message", "Resource precondition failed"]);
        assert_eq!(
            diags.iter().next().unwrap().detail,
            "Unsuitable value for error message: a string is required."
        );
    }

    #[test]
    fn self_is_bound_for_postconditions() {
        let ctx = MemoryEvalContext::new(Context::new().set("aws_instance.web.count", 0_i64));
        let (result, diags) = run(
            &ctx,
            CheckType::ResourcePostcondition,
            &rule("self.count > 0", "\"no instances\""),
            &web(),
        );
        assert!(!result.result);
        assert_eq!(result.error_message, "no instances");
        assert_eq!(
            diags.iter().next().unwrap().summary,
            "Resource postcondition failed"
        );
    }

    #[test]
    fn self_in_precondition_stays_unknown() {
        let ctx = MemoryEvalContext::new(Context::new().set("aws_instance.web.count", 1_i64));
        let (result, diags) = run(
            &ctx,
            CheckType::ResourcePrecondition,
            &rule("self.count > 0", "\"x\""),
            &web(),
        );
        assert!(result.unknown);
        assert_eq!(diags.iter().next().unwrap().summary, "Invalid \"self\" reference");
    }

    #[test]
    #[should_panic(expected = "need a resource instance owner")]
    fn postcondition_on_output_panics() {
        let ctx = MemoryEvalContext::default();
        let _ = run(&ctx, CheckType::ResourcePostcondition, &rule("true", "\"x\""), &output());
    }

    #[test]
    fn warning_severity_is_applied() {
        let ctx = MemoryEvalContext::new(Context::new().set("var.ok", false));
        let (_, diags) = eval_check_rule(
            CheckType::ResourcePrecondition,
            &rule("var.ok", "\"drifted\""),
            &ctx,
            &web(),
            &RepetitionData::none(),
            Severity::Warning,
        );
        assert!(!diags.has_errors());
        assert_eq!(diags.warnings().count(), 1);
    }

    #[test]
    fn empty_rule_list_is_a_no_op() {
        let ctx = MemoryEvalContext::default();
        let diags = eval_check_rules(
            CheckType::ResourcePrecondition,
            &[],
            &ctx,
            &web(),
            &RepetitionData::none(),
            Severity::Error,
        );
        assert!(diags.is_empty());
        assert!(ctx.conditions().is_empty());
    }

    #[test]
    fn rules_are_stored_under_their_addresses() {
        let ctx = MemoryEvalContext::new(Context::new().set("var.n", 1_i64).set("var.u", Value::unknown()));
        let rules = vec![
            rule("var.n > 0", "\"a\""),
            rule("var.n > 5", "\"b\""),
            rule("var.u", "\"c\""),
        ];
        let diags = eval_check_rules(
            CheckType::OutputPrecondition,
            &rules,
            &ctx,
            &output(),
            &RepetitionData::none(),
            Severity::Error,
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags.iter().next().unwrap().detail, "b");

        let store = ctx.conditions();
        assert_eq!(store.len(), 3);
        assert!(store.get("output.id.preconditions[0]").unwrap().result);
        let failed = store.get("output.id.preconditions[1]").unwrap();
        assert!(failed.failed());
        assert_eq!(failed.error_message, "b");
        assert_eq!(failed.condition_type, ConditionType::OutputPrecondition);
        assert!(store.get("output.id.preconditions[2]").unwrap().unknown);
    }
}
