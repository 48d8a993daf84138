//! Precondition and postcondition evaluation for declarative infrastructure
//! plans.
//!
//! Rules are evaluated with [`eval_check_rules`] against an [`EvalContext`]
//! that binds references to values. Outcomes are recorded in a shared
//! [`ConditionsSync`] store and problems are reported as [`Diagnostics`].

mod check;
mod error;
mod evaluate;
mod json;
pub mod parse;
mod references;
mod scope;
#[cfg(feature = "plan-file")]
pub mod serial;
mod types;
mod validate;

pub use check::{eval_check_rule, eval_check_rules, CheckType};
pub use error::CondcheckError;
pub use evaluate::eval_expr;
pub use json::{marshal_condition_results, to_json, JsonConditionResult};
pub use parse::{parse_config, parse_expression, ParseError};
pub use references::{references_in_expr, Reference, Referenceable};
pub use scope::{EvalContext, MemoryEvalContext};
pub use types::*;
