use std::io::Write;

use condcheck::{
    parse_expression, CondcheckError, Config, ConfigError, Expr, Resource, ResourceMode,
};

const MAIN_TF: &str = r#"
# Instances behind the load balancer.
resource "aws_instance" "web" {
  ami           = data.aws_ami.base.id
  instance_type = var.instance_type
  count         = var.instance_count

  lifecycle {
    create_before_destroy = true

    precondition {
      condition     = var.instance_count > 0 && var.instance_count <= 10
      error_message = "Instance count must be between 1 and 10, got ${var.instance_count}."
    }

    // Checked after apply.
    postcondition {
      condition     = self.public_ip != null
      error_message = "Instance ${self.id} did not get a public IP."
    }
  }
}

data "aws_ami" "base" {
  most_recent = true

  lifecycle {
    postcondition {
      condition     = contains(["x86_64", "arm64"], self.architecture)
      error_message = "Unsupported architecture."
    }
  }
}

output "web_ips" {
  value = aws_instance.web[0].public_ip

  precondition {
    condition     = length(aws_instance.web) > 0
    error_message = "No instances were created."
  }
}
"#;

#[test]
fn full_configuration() {
    let config = Config::from_source(MAIN_TF, "main.tf").unwrap();
    assert_eq!(config.resources().len(), 2);
    assert_eq!(config.outputs().len(), 1);
    assert_eq!(config.rule_count(), 4);

    let web = &config.resources()[0];
    assert_eq!(web.resource.to_string(), "aws_instance.web");
    assert_eq!(web.attribute("count").unwrap().text(), "var.instance_count");
    assert_eq!(
        web.preconditions[0].condition.text(),
        "var.instance_count > 0 && var.instance_count <= 10"
    );
    assert!(matches!(web.preconditions[0].condition.expr(), Expr::And(..)));
    assert!(matches!(
        web.preconditions[0].error_message.expr(),
        Expr::Template(_)
    ));

    let ami = &config.resources()[1];
    assert_eq!(ami.resource.mode, ResourceMode::Data);
    assert_eq!(ami.postconditions.len(), 1);

    let out = config.output("web_ips").unwrap();
    assert_eq!(out.preconditions[0].error_message.text(), "\"No instances were created.\"");
}

#[test]
fn ranges_point_into_the_file() {
    let config = Config::from_source(MAIN_TF, "main.tf").unwrap();
    let web = config
        .resource(&Resource::managed("aws_instance", "web"))
        .unwrap();
    let post = &web.postconditions[0];
    assert_eq!(post.decl_range.start.line, 17);
    assert_eq!(post.condition.range().start.line, 18);
    assert_eq!(post.condition.range().start.column, 23);
    assert_eq!(post.condition.range().filename, "main.tf");
}

#[test]
fn from_file_reads_and_validates() {
    let dir = std::env::temp_dir().join(format!("condcheck-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("main.tf");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(MAIN_TF.as_bytes())
        .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.rule_count(), 4);
    assert_eq!(
        config.resources()[0].preconditions[0].condition.range().filename,
        path.display().to_string()
    );
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn syntax_errors_are_parse_errors() {
    let err = Config::from_source("resource \"a\" \"b\" {\n  ami = \n}\n", "bad.tf").unwrap_err();
    match err {
        CondcheckError::Parse(e) => {
            assert_eq!(e.filename(), "bad.tf");
            assert!(e.to_string().starts_with("parse error at bad.tf:"));
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn deeply_nested_input_is_rejected() {
    let src = format!("{}true{}", "(".repeat(5000), ")".repeat(5000));
    let err = parse_expression(&src).unwrap_err();
    assert!(err.message().contains("nesting"), "{err}");

    let src = format!("{}{}", "a {\n".repeat(5000), "}\n".repeat(5000));
    assert!(matches!(
        Config::from_source(&src, "deep.tf").unwrap_err(),
        CondcheckError::Parse(_)
    ));

    let src = format!("{}true{}", "(".repeat(20), ")".repeat(20));
    assert!(parse_expression(&src).is_ok());
}

#[test]
fn validation_errors_are_config_errors() {
    let src = "output \"a\" {\n  precondition {\n    condition     = self.ok\n    error_message = \"m\"\n  }\n}\n";
    assert!(matches!(
        Config::from_source(src, "main.tf").unwrap_err(),
        CondcheckError::Config(ConfigError::SelfInPrecondition { .. })
    ));
}

#[test]
fn expressions_parse_standalone() {
    for src in [
        "true",
        "!var.enabled",
        "var.a == 1 || var.b != \"x\"",
        "length(var.list) >= 2",
        "aws_instance.web[\"blue\"].tags[\"Name\"] == \"web\"",
        "\"${var.a}-${var.b}\"",
        "[1, 2, 3]",
        "(var.a)",
        "-1.5 < var.n",
    ] {
        assert!(parse_expression(src).is_ok(), "failed to parse {src}");
    }
    for src in ["", "var.", "1 ==", "f(", "\"unterminated"] {
        assert!(parse_expression(src).is_err(), "accepted {src}");
    }
}
