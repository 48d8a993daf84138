use std::fmt;

use crate::types::expr::render_path;
use crate::types::{
    Diagnostic, Diagnostics, Expression, InstanceKey, Key, Resource, ResourceInstance, Segment,
    Traversal,
};

/// The kinds of object an expression can refer to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Referenceable {
    /// `self`, the resource instance that owns a postcondition.
    SelfRef,
    /// `count.index`
    CountIndex,
    /// `each.key`
    EachKey,
    /// `each.value`
    EachValue,
    /// `var.<name>`
    InputVariable(String),
    /// `local.<name>`
    LocalValue(String),
    /// `module.<call>` without an output name.
    ModuleCall(String),
    /// `module.<call>.<output>`
    ModuleCallOutput { call: String, name: String },
    /// `<type>.<name>` or `data.<type>.<name>` without an instance key.
    Resource(Resource),
    /// `<type>.<name>[<key>]` or `data.<type>.<name>[<key>]`
    ResourceInstance(ResourceInstance),
}

impl fmt::Display for Referenceable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Referenceable::SelfRef => write!(f, "self"),
            Referenceable::CountIndex => write!(f, "count.index"),
            Referenceable::EachKey => write!(f, "each.key"),
            Referenceable::EachValue => write!(f, "each.value"),
            Referenceable::InputVariable(name) => write!(f, "var.{name}"),
            Referenceable::LocalValue(name) => write!(f, "local.{name}"),
            Referenceable::ModuleCall(call) => write!(f, "module.{call}"),
            Referenceable::ModuleCallOutput { call, name } => write!(f, "module.{call}.{name}"),
            Referenceable::Resource(r) => write!(f, "{r}"),
            Referenceable::ResourceInstance(r) => write!(f, "{r}"),
        }
    }
}

/// One reference found in an expression.
///
/// `traversal` is the full traversal as written; `remaining` is the part of
/// it that follows the referenced object, e.g. `.id` in
/// `aws_instance.web.id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub subject: Referenceable,
    pub traversal: Traversal,
    pub remaining: Vec<Segment>,
}

impl Reference {
    /// The lookup path the evaluator will use for this reference.
    #[must_use]
    pub fn path(&self) -> String {
        self.traversal.path()
    }

    /// The remaining traversal rendered as a path, without the subject.
    #[must_use]
    pub fn remaining_path(&self) -> String {
        render_path(&self.remaining)
    }
}

/// Find every reference in `expression`, in source order.
///
/// Malformed references produce error diagnostics whose subject is the
/// offending traversal; the rest of the expression is still scanned.
pub fn references_in_expr(expression: &Expression) -> (Vec<Reference>, Diagnostics) {
    let mut refs = Vec::new();
    let mut diags = Diagnostics::new();
    expression.expr().walk_traversals(&mut |t| match parse_ref(t) {
        Ok(r) => refs.push(r),
        Err((summary, detail)) => {
            diags.push(Diagnostic::error(summary, detail).with_subject(expression.subrange(&t.span)));
        }
    });
    (refs, diags)
}

type RefError = (&'static str, String);

fn attr(segment: Option<&Segment>) -> Option<&str> {
    match segment {
        Some(Segment::Attr(name)) => Some(name),
        _ => None,
    }
}

fn instance_key(segment: Option<&Segment>) -> Option<InstanceKey> {
    match segment {
        Some(Segment::Index(Key::Int(i))) => Some(InstanceKey::Int(*i)),
        Some(Segment::Index(Key::String(s))) => Some(InstanceKey::String(s.clone())),
        _ => None,
    }
}

fn must_access(root: &str) -> RefError {
    (
        "Invalid reference",
        format!(
            "The \"{root}\" object cannot be accessed directly. Instead, access one of its attributes."
        ),
    )
}

fn parse_ref(t: &Traversal) -> Result<Reference, RefError> {
    let segments = &t.segments;
    let root = t.root_name();
    let (subject, consumed) = match root {
        "self" => (Referenceable::SelfRef, 1),
        "count" => match attr(segments.get(1)) {
            Some("index") => (Referenceable::CountIndex, 2),
            Some(other) => {
                return Err((
                    "Invalid \"count\" attribute",
                    format!(
                        "The \"count\" object does not have an attribute named \"{other}\". The only supported attribute is count.index, which is the index of each instance of a resource block that has the \"count\" argument set."
                    ),
                ));
            }
            None => return Err(must_access("count")),
        },
        "each" => match attr(segments.get(1)) {
            Some("key") => (Referenceable::EachKey, 2),
            Some("value") => (Referenceable::EachValue, 2),
            Some(other) => {
                return Err((
                    "Invalid \"each\" attribute",
                    format!(
                        "The \"each\" object does not have an attribute named \"{other}\". The supported attributes are each.key and each.value, the current key and value pair of the \"for_each\" attribute set."
                    ),
                ));
            }
            None => return Err(must_access("each")),
        },
        "var" => match attr(segments.get(1)) {
            Some(name) => (Referenceable::InputVariable(name.to_owned()), 2),
            None => return Err(must_access("var")),
        },
        "local" => match attr(segments.get(1)) {
            Some(name) => (Referenceable::LocalValue(name.to_owned()), 2),
            None => return Err(must_access("local")),
        },
        "module" => match (attr(segments.get(1)), attr(segments.get(2))) {
            (Some(call), Some(name)) => (
                Referenceable::ModuleCallOutput {
                    call: call.to_owned(),
                    name: name.to_owned(),
                },
                3,
            ),
            (Some(call), None) => (Referenceable::ModuleCall(call.to_owned()), 2),
            (None, _) => return Err(must_access("module")),
        },
        "data" => match (attr(segments.get(1)), attr(segments.get(2))) {
            (Some(type_name), Some(name)) => resource_subject(
                Resource::data(type_name, name),
                instance_key(segments.get(3)),
                3,
            ),
            _ => {
                return Err((
                    "Invalid reference",
                    "A reference to a data source must be followed by at least one attribute access, specifying the resource type and name.".to_owned(),
                ));
            }
        },
        type_name => match attr(segments.get(1)) {
            Some(name) => resource_subject(
                Resource::managed(type_name, name),
                instance_key(segments.get(2)),
                2,
            ),
            None => {
                return Err((
                    "Invalid reference",
                    "A reference to a resource type must be followed by at least one attribute access, specifying the resource name.".to_owned(),
                ));
            }
        },
    };
    Ok(Reference {
        subject,
        traversal: t.clone(),
        remaining: segments.get(consumed..).unwrap_or_default().to_vec(),
    })
}

fn resource_subject(
    resource: Resource,
    key: Option<InstanceKey>,
    consumed: usize,
) -> (Referenceable, usize) {
    match key {
        Some(key) => (
            Referenceable::ResourceInstance(resource.instance(key)),
            consumed + 1,
        ),
        None => (Referenceable::Resource(resource), consumed),
    }
}
