use std::collections::HashSet;

use crate::parse::{ParsedConfig, ParsedRule};
use crate::types::{CheckRule, Config, ConfigError, Expression, OutputConfig, ResourceConfig};

pub(crate) fn validate(parsed: ParsedConfig) -> Result<Config, ConfigError> {
    check_duplicates(&parsed)?;

    let mut resources = Vec::with_capacity(parsed.resources.len());
    for r in parsed.resources {
        let owner = r.resource.to_string();
        let preconditions = build_rules(r.preconditions, &owner, "precondition")?;
        let postconditions = build_rules(r.postconditions, &owner, "postcondition")?;
        resources.push(ResourceConfig {
            resource: r.resource,
            attributes: r.attributes,
            preconditions,
            postconditions,
            decl_range: r.decl_range,
        });
    }

    let mut outputs = Vec::with_capacity(parsed.outputs.len());
    for o in parsed.outputs {
        let owner = format!("output.{}", o.name);
        let preconditions = build_rules(o.preconditions, &owner, "precondition")?;
        outputs.push(OutputConfig {
            name: o.name,
            value: o.value,
            preconditions,
            decl_range: o.decl_range,
        });
    }

    Ok(Config { resources, outputs })
}

fn check_duplicates(parsed: &ParsedConfig) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for r in &parsed.resources {
        if !seen.insert(&r.resource) {
            return Err(ConfigError::DuplicateResource {
                address: r.resource.to_string(),
            });
        }
    }
    let mut seen = HashSet::new();
    for o in &parsed.outputs {
        if !seen.insert(o.name.as_str()) {
            return Err(ConfigError::DuplicateOutput {
                name: o.name.clone(),
            });
        }
    }
    Ok(())
}

fn build_rules(
    rules: Vec<ParsedRule>,
    owner: &str,
    block: &'static str,
) -> Result<Vec<CheckRule>, ConfigError> {
    rules
        .into_iter()
        .enumerate()
        .map(|(index, rule)| build_rule(rule, owner, block, index))
        .collect()
}

fn build_rule(
    rule: ParsedRule,
    owner: &str,
    block: &'static str,
    index: usize,
) -> Result<CheckRule, ConfigError> {
    let missing = |attribute| ConfigError::MissingArgument {
        owner: owner.to_owned(),
        block,
        index,
        attribute,
    };
    let condition = rule.condition.ok_or_else(|| missing("condition"))?;
    let error_message = rule.error_message.ok_or_else(|| missing("error_message"))?;

    if block == "precondition" && (refers_to_self(&condition) || refers_to_self(&error_message)) {
        return Err(ConfigError::SelfInPrecondition {
            owner: owner.to_owned(),
            block,
            index,
        });
    }

    Ok(CheckRule {
        condition,
        error_message,
        decl_range: rule.decl_range,
    })
}

fn refers_to_self(expression: &Expression) -> bool {
    let mut found = false;
    expression.expr().walk_traversals(&mut |t| {
        if t.root_name() == "self" {
            found = true;
        }
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_config;

    fn check(src: &str) -> Result<Config, ConfigError> {
        validate(parse_config(src, "main.tf").unwrap())
    }

    #[test]
    fn valid_config_keeps_order() {
        let config = check(
            r#"
resource "a" "one" {
  lifecycle {
    precondition {
      condition     = var.x
      error_message = "first"
    }
    precondition {
      condition     = var.y
      error_message = "second"
    }
  }
}
"#,
        )
        .unwrap();
        let rules = &config.resources()[0].preconditions;
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].condition.text(), "var.x");
        assert_eq!(rules[1].error_message.text(), "\"second\"");
        assert_eq!(rules[1].decl_range.start.line, 8);
    }

    #[test]
    fn duplicate_resource() {
        let err = check("resource \"a\" \"b\" {\n}\nresource \"a\" \"b\" {\n}\n").unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateResource { ref address } if address == "a.b"));
    }

    #[test]
    fn managed_and_data_do_not_collide() {
        assert!(check("resource \"a\" \"b\" {\n}\ndata \"a\" \"b\" {\n}\n").is_ok());
    }

    #[test]
    fn duplicate_output() {
        let err = check("output \"x\" {\n}\noutput \"x\" {\n}\n").unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateOutput { ref name } if name == "x"));
    }

    #[test]
    fn missing_error_message() {
        let err = check("output \"x\" {\n  precondition {\n    condition = true\n  }\n}\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "precondition block 0 in 'output.x' is missing the 'error_message' argument"
        );
    }

    #[test]
    fn missing_condition_in_postcondition() {
        let src = "resource \"a\" \"b\" {\n  lifecycle {\n    postcondition {\n      error_message = \"m\"\n    }\n  }\n}\n";
        let err = check(src).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingArgument {
                block: "postcondition",
                attribute: "condition",
                index: 0,
                ..
            }
        ));
    }

    #[test]
    fn self_rejected_in_preconditions() {
        let src = "resource \"a\" \"b\" {\n  lifecycle {\n    precondition {\n      condition     = true\n      error_message = \"id ${self.id}\"\n    }\n  }\n}\n";
        let err = check(src).unwrap_err();
        assert!(matches!(err, ConfigError::SelfInPrecondition { ref owner, .. } if owner == "a.b"));

        let src = "output \"x\" {\n  precondition {\n    condition     = self.ok\n    error_message = \"m\"\n  }\n}\n";
        assert!(matches!(
            check(src).unwrap_err(),
            ConfigError::SelfInPrecondition { .. }
        ));
    }

    #[test]
    fn self_allowed_in_postconditions() {
        let src = "resource \"a\" \"b\" {\n  lifecycle {\n    postcondition {\n      condition     = self.ok\n      error_message = \"m\"\n    }\n  }\n}\n";
        assert_eq!(check(src).unwrap().rule_count(), 1);
    }
}
