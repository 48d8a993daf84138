use condcheck::{
    eval_check_rules, CheckType, Checkable, Config, Context, InstanceKey, MemoryEvalContext,
    ModuleInstance, OutputValue, RepetitionData, WalkOperation,
};

const MAIN_TF: &str = r#"
resource "aws_instance" "web" {
  count = 3

  lifecycle {
    precondition {
      condition     = count.index < var.max_instances
      error_message = "Instance ${count.index} exceeds the limit of ${var.max_instances}."
    }
    postcondition {
      condition     = self.public_ip != null
      error_message = "Instance did not get a public IP."
    }
  }
}

output "first_ip" {
  value = aws_instance.web[0].public_ip

  precondition {
    condition     = aws_instance.web[0].public_ip != ""
    error_message = "The first instance has no address."
  }
}
"#;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // Pass a path to load a different configuration.
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(path),
        None => Config::from_source(MAIN_TF, "main.tf"),
    }
    .expect("failed to load configuration");
    println!("{} condition rule(s) loaded", config.rule_count());

    let ctx = MemoryEvalContext::new(
        Context::new()
            .set("var.max_instances", 2_i64)
            .set("aws_instance.web[0].public_ip", "10.0.0.1")
            .set("aws_instance.web[1].public_ip", condcheck::Value::null())
            .set("aws_instance.web[2].public_ip", "10.0.0.3"),
    );
    let severity = WalkOperation::Apply.check_rule_severity();

    for resource in config.resources() {
        for i in 0..3 {
            let key = InstanceKey::Int(i);
            let owner: Checkable = resource
                .resource
                .clone()
                .instance(key.clone())
                .absolute(ModuleInstance::root())
                .into();
            let key_data = RepetitionData::from_key(&key);
            for (typ, rules) in [
                (CheckType::ResourcePrecondition, &resource.preconditions),
                (CheckType::ResourcePostcondition, &resource.postconditions),
            ] {
                let diags = eval_check_rules(typ, rules, &ctx, &owner, &key_data, severity);
                for diag in diags.iter() {
                    println!("{diag}\n");
                }
            }
        }
    }

    for output in config.outputs() {
        let owner: Checkable = OutputValue::new(&output.name)
            .absolute(ModuleInstance::root())
            .into();
        let diags = eval_check_rules(
            CheckType::OutputPrecondition,
            &output.preconditions,
            &ctx,
            &owner,
            &RepetitionData::none(),
            severity,
        );
        println!("output.{}: {} problem(s)", output.name, diags.len());
    }
}
