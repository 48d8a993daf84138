use condcheck::{
    eval_check_rules, to_json, CheckRule, CheckType, Checkable, Context, InstanceKey,
    MemoryEvalContext, ModuleInstance, OutputValue, RepetitionData, Resource, Severity, Value,
};

fn main() -> Result<(), condcheck::CondcheckError> {
    let ctx = MemoryEvalContext::new(
        Context::new()
            .set("var.environment", "prod")
            .set("var.db_password", Value::from("hunter2").mark_sensitive())
            .set("aws_db_instance.main.endpoint", Value::unknown()),
    );

    let db: Checkable = Resource::managed("aws_db_instance", "main")
        .instance(InstanceKey::NoKey)
        .absolute(ModuleInstance::root())
        .into();
    let _ = eval_check_rules(
        CheckType::ResourcePrecondition,
        &[
            CheckRule::parse("var.environment == \"prod\"", "\"Only prod is managed here.\"")?,
            CheckRule::parse(
                "length(var.db_password) >= 12",
                "\"Password ${var.db_password} is too short.\"",
            )?,
        ],
        &ctx,
        &db,
        &RepetitionData::none(),
        Severity::Error,
    );

    let endpoint: Checkable = OutputValue::new("endpoint")
        .absolute(ModuleInstance::root())
        .into();
    let _ = eval_check_rules(
        CheckType::OutputPrecondition,
        &[CheckRule::parse(
            "aws_db_instance.main.endpoint != \"\"",
            "\"The database has no endpoint.\"",
        )?],
        &ctx,
        &endpoint,
        &RepetitionData::none(),
        Severity::Error,
    );

    println!("{}", to_json(&ctx.into_conditions())?);
    Ok(())
}
