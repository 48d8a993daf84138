pub mod address;
mod condition;
mod config;
mod context;
mod diagnostics;
mod error;
pub mod expr;
mod repetition;
mod rule;
mod value;
mod walk;

pub use address::{
    AbsOutputValue, AbsResourceInstance, Checkable, CheckableKind, InstanceKey, ModuleInstance,
    ModuleInstanceStep, OutputValue, Resource, ResourceInstance, ResourceMode,
};
pub use condition::{ConditionResult, ConditionType, Conditions, ConditionsSync};
pub use config::{Config, OutputConfig, ResourceConfig};
pub use context::Context;
pub(crate) use context::split_path;
pub use diagnostics::{Diagnostic, Diagnostics, DiagnosticsError, Severity};
pub use error::{ConfigError, ConversionError};
pub use expr::{
    lit, traversal, CompareOp, Expr, Expression, Key, Pos, Segment, SourceRange, Span,
    TemplatePart, Traversal, TraversalExpr,
};
pub use repetition::RepetitionData;
pub use rule::CheckRule;
pub use value::{Data, Value};
pub use walk::WalkOperation;
