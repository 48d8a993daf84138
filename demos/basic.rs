use condcheck::{
    eval_check_rules, CheckRule, CheckType, Checkable, Context, EvalContext, InstanceKey,
    MemoryEvalContext, ModuleInstance, RepetitionData, Resource, Severity, Value,
};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let rules = vec![
        CheckRule::parse(
            "var.instance_count > 0",
            "\"At least one instance is required.\"",
        )
        .expect("failed to parse rule"),
        CheckRule::parse(
            "aws_instance.web.ami != \"\"",
            "\"The instance ${aws_instance.web.id} has no AMI.\"",
        )
        .expect("failed to parse rule"),
    ];

    // The AMI is not known until the data source is read.
    let ctx = MemoryEvalContext::new(
        Context::new()
            .set("var.instance_count", 0_i64)
            .set("aws_instance.web.ami", Value::unknown())
            .set("aws_instance.web.id", "i-0abc"),
    );
    let owner: Checkable = Resource::managed("aws_instance", "web")
        .instance(InstanceKey::NoKey)
        .absolute(ModuleInstance::root())
        .into();

    let diags = eval_check_rules(
        CheckType::ResourcePrecondition,
        &rules,
        &ctx,
        &owner,
        &RepetitionData::none(),
        Severity::Error,
    );

    for diag in diags.iter() {
        println!("{diag}\n");
    }

    let mut results: Vec<String> = ctx
        .conditions()
        .snapshot()
        .iter()
        .map(|(addr, r)| {
            let outcome = if r.unknown {
                "unknown".to_owned()
            } else if r.result {
                "passed".to_owned()
            } else {
                format!("failed: {}", r.error_message)
            };
            format!("{addr}: {outcome}")
        })
        .collect();
    results.sort();
    for line in results {
        println!("{line}");
    }
}
