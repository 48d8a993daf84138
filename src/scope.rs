use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::trace;

use crate::references::{Reference, Referenceable};
use crate::types::expr::render_path;
use crate::types::{
    Conditions, ConditionsSync, Context, Data, Diagnostic, Diagnostics, InstanceKey, Key,
    RepetitionData, ResourceInstance, ResourceMode, Segment,
};
use crate::Value;

/// What the condition engine needs from the surrounding graph walk.
///
/// Implementations must be safe to share across the threads of a walk.
pub trait EvalContext: Send + Sync {
    /// Bind every reference to a value. `self_ref` is the resource instance
    /// that `self` stands for, if any; `key_data` supplies `count` and
    /// `each`.
    ///
    /// Every reference must end up bound in the returned context, as an
    /// unknown value if it cannot be resolved, so that evaluation can
    /// proceed.
    fn resolve_references(
        &self,
        refs: &[Reference],
        self_ref: Option<&ResourceInstance>,
        key_data: &RepetitionData,
    ) -> (Context, Diagnostics);

    /// The run's condition result store.
    fn conditions(&self) -> &ConditionsSync;
}

/// An [`EvalContext`] backed by an in-memory value map.
///
/// Values are addressed by the same dotted paths expressions use, e.g.
/// `var.region` or `aws_instance.web[0].ami`. A value set to unknown at an
/// object path (`aws_instance.web`) makes every attribute under it unknown.
/// Values can be added while a walk is in progress.
#[derive(Debug, Default)]
pub struct MemoryEvalContext {
    values: RwLock<Context>,
    conditions: ConditionsSync,
}

impl MemoryEvalContext {
    #[must_use]
    pub fn new(values: Context) -> Self {
        Self::with_conditions(values, ConditionsSync::new())
    }

    /// Use an existing result store, e.g. one that already holds results
    /// from an earlier phase.
    #[must_use]
    pub fn with_conditions(values: Context, conditions: ConditionsSync) -> Self {
        Self {
            values: RwLock::new(values),
            conditions,
        }
    }

    /// Record a value that has become known during the walk.
    ///
    /// # Panics
    ///
    /// Panics if a writer panicked while holding the value lock.
    pub fn set(&self, path: &str, value: impl Into<Value>) {
        self.write().insert(path, value.into());
    }

    /// A copy of the current values.
    #[must_use]
    pub fn values(&self) -> Context {
        self.read().clone()
    }

    /// Consume the context, keeping only the recorded condition results.
    #[must_use]
    pub fn into_conditions(self) -> Conditions {
        self.conditions.into_conditions()
    }

    fn read(&self) -> RwLockReadGuard<'_, Context> {
        match self.values.read() {
            Ok(guard) => guard,
            Err(_) => panic!("evaluation values poisoned by a panicking writer"),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Context> {
        match self.values.write() {
            Ok(guard) => guard,
            Err(_) => panic!("evaluation values poisoned by a panicking writer"),
        }
    }
}

enum Lookup {
    Found(Value),
    /// The object exists but the remaining traversal does not apply to it.
    NoAttribute,
    /// Nothing is bound for the object at all.
    Undeclared,
}

/// Find the value at `segments`, walking into list values for index steps
/// past the deepest bound leaf.
fn lookup(values: &Context, subject: &[Segment], rest: &[Segment]) -> Lookup {
    let full: Vec<Segment> = subject.iter().chain(rest).cloned().collect();
    for split in (subject.len().max(1)..=full.len()).rev() {
        let Some(base) = values.get(&render_path(&full[..split])) else {
            continue;
        };
        return match step_into(base, &full[split..]) {
            Some(value) => Lookup::Found(value),
            None => Lookup::NoAttribute,
        };
    }
    if values.contains(&render_path(subject)) {
        Lookup::NoAttribute
    } else {
        Lookup::Undeclared
    }
}

fn step_into(mut value: Value, segments: &[Segment]) -> Option<Value> {
    for segment in segments {
        let mark = value.is_sensitive();
        value = match (value.into_data(), segment) {
            (Data::Unknown, _) => Value::unknown(),
            (Data::List(items), Segment::Index(Key::Int(i))) => {
                usize::try_from(*i).ok().and_then(|i| items.into_iter().nth(i))?
            }
            _ => return None,
        }
        .with_mark(mark);
    }
    Some(value)
}

fn undeclared(subject: &Referenceable) -> Diagnostic {
    let (summary, detail) = match subject {
        Referenceable::InputVariable(name) => (
            "Reference to undeclared input variable",
            format!("An input variable with the name \"{name}\" has not been declared."),
        ),
        Referenceable::LocalValue(name) => (
            "Reference to undeclared local value",
            format!("A local value with the name \"{name}\" has not been declared."),
        ),
        Referenceable::ModuleCall(call) | Referenceable::ModuleCallOutput { call, .. } => (
            "Reference to undeclared module",
            format!("No module call named \"{call}\" is declared."),
        ),
        Referenceable::Resource(r) | Referenceable::ResourceInstance(ResourceInstance { resource: r, .. }) => {
            let kind = match r.mode {
                ResourceMode::Managed => "managed resource",
                ResourceMode::Data => "data resource",
            };
            (
                "Reference to undeclared resource",
                format!(
                    "A {kind} \"{}\" \"{}\" has not been declared.",
                    r.type_name, r.name
                ),
            )
        }
        Referenceable::SelfRef
        | Referenceable::CountIndex
        | Referenceable::EachKey
        | Referenceable::EachValue => (
            "Reference to undeclared object",
            format!("\"{subject}\" has not been declared."),
        ),
    };
    Diagnostic::error(summary, detail)
}

fn subject_segments(r: &Reference) -> &[Segment] {
    let taken = r.traversal.segments.len() - r.remaining.len();
    &r.traversal.segments[..taken]
}

impl EvalContext for MemoryEvalContext {
    fn resolve_references(
        &self,
        refs: &[Reference],
        self_ref: Option<&ResourceInstance>,
        key_data: &RepetitionData,
    ) -> (Context, Diagnostics) {
        let values = self.read();
        let mut diags = Diagnostics::new();
        let mut bindings: Vec<(String, Value)> = Vec::with_capacity(refs.len());

        for r in refs {
            let attribute = |diags: &mut Diagnostics| {
                diags.push(Diagnostic::error(
                    "Unsupported attribute",
                    format!(
                        "{} does not have an attribute at \"{}\".",
                        r.subject,
                        r.remaining_path()
                    ),
                ));
            };

            let value = match &r.subject {
                Referenceable::SelfRef => match self_ref {
                    None => {
                        diags.push(Diagnostic::error(
                            "Invalid \"self\" reference",
                            "The \"self\" object is not available in this context. It can be used only in postcondition blocks of a resource.",
                        ));
                        Value::unknown()
                    }
                    Some(instance) => {
                        let mut subject = vec![
                            Segment::Attr(instance.resource.type_name.clone()),
                            Segment::Attr(instance.resource.name.clone()),
                        ];
                        if instance.resource.mode == ResourceMode::Data {
                            subject.insert(0, Segment::Attr("data".to_owned()));
                        }
                        if let Some(key) = instance_index(instance) {
                            subject.push(Segment::Index(key));
                        }
                        match lookup(&values, &subject, &r.remaining) {
                            Lookup::Found(v) => v,
                            Lookup::NoAttribute => {
                                attribute(&mut diags);
                                Value::unknown()
                            }
                            // The instance has no recorded attributes yet.
                            Lookup::Undeclared => Value::unknown(),
                        }
                    }
                },
                Referenceable::CountIndex => match &key_data.count_index {
                    Some(v) if r.remaining.is_empty() => v.clone(),
                    Some(_) => {
                        attribute(&mut diags);
                        Value::unknown()
                    }
                    None => {
                        diags.push(Diagnostic::error(
                            "Reference to \"count\" in non-counted context",
                            "The \"count\" object can only be used in \"resource\" and \"data\" blocks, and only when the \"count\" argument is set.",
                        ));
                        Value::unknown()
                    }
                },
                Referenceable::EachKey | Referenceable::EachValue => {
                    let slot = if r.subject == Referenceable::EachKey {
                        &key_data.each_key
                    } else {
                        &key_data.each_value
                    };
                    match slot {
                        Some(v) => match step_into(v.clone(), &r.remaining) {
                            Some(v) => v,
                            None => {
                                attribute(&mut diags);
                                Value::unknown()
                            }
                        },
                        None => {
                            diags.push(Diagnostic::error(
                                "Reference to \"each\" in context without for_each",
                                "The \"each\" object can be used only in \"resource\" and \"data\" blocks, and only when the \"for_each\" argument is set.",
                            ));
                            Value::unknown()
                        }
                    }
                }
                subject => match lookup(&values, subject_segments(r), &r.remaining) {
                    Lookup::Found(v) => v,
                    Lookup::NoAttribute => {
                        attribute(&mut diags);
                        Value::unknown()
                    }
                    Lookup::Undeclared => {
                        diags.push(undeclared(subject));
                        Value::unknown()
                    }
                },
            };
            trace!(reference = %r.path(), value = %value, "bound reference");
            bindings.push((r.path(), value));
        }
        drop(values);

        // Shallow paths first, so a deeper path under an already bound leaf
        // does not replace that leaf.
        bindings.sort_by_key(|(path, _)| crate::types::split_path(path).len());
        let mut ctx = Context::new();
        for (path, value) in bindings {
            if ctx.get(&path).is_none() {
                ctx.insert(&path, value);
            }
        }
        (ctx, diags)
    }

    fn conditions(&self) -> &ConditionsSync {
        &self.conditions
    }
}

fn instance_index(instance: &ResourceInstance) -> Option<Key> {
    match &instance.key {
        InstanceKey::NoKey => None,
        InstanceKey::Int(i) => Some(Key::Int(*i)),
        InstanceKey::String(s) => Some(Key::String(s.clone())),
    }
}
