use std::sync::Arc;
use std::thread;

use condcheck::{
    eval_check_rules, CheckRule, CheckType, Checkable, Context, Data, EvalContext, InstanceKey,
    MemoryEvalContext, ModuleInstance, RepetitionData, Resource, Severity, Value,
};

fn main() {
    let ctx = Arc::new(MemoryEvalContext::new(
        Context::new().set(
            "var.zones",
            Value::new(Data::List(vec![Value::from("a"), Value::from("b")])),
        ),
    ));
    let rules = Arc::new(vec![CheckRule::parse(
        "count.index < length(var.zones)",
        "\"No zone is available for instance ${count.index}.\"",
    )
    .expect("failed to parse rule")]);

    let handles: Vec<_> = (0..4_i64)
        .map(|i| {
            let ctx = Arc::clone(&ctx);
            let rules = Arc::clone(&rules);
            thread::spawn(move || {
                let owner: Checkable = Resource::managed("aws_instance", "web")
                    .instance(InstanceKey::Int(i))
                    .absolute(ModuleInstance::root())
                    .into();
                let diags = eval_check_rules(
                    CheckType::ResourcePrecondition,
                    &rules,
                    ctx.as_ref(),
                    &owner,
                    &RepetitionData::count(i),
                    Severity::Error,
                );
                println!("Thread {i}: {} problem(s)", diags.len());
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    println!("{} result(s) recorded", ctx.conditions().len());
}
