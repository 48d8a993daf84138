use std::collections::HashMap;

use super::Value;

/// Values bound for evaluation, addressed by dotted paths like
/// `"aws_instance.web[0].ami"`.
///
/// Index steps stay attached to the preceding segment, so `web[0]` is a
/// single level. A leaf that is unknown stands in for everything beneath it:
/// looking up `a.b.c` when `a.b` is unknown yields an unknown value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    data: HashMap<String, ContextValue>,
}

#[derive(Debug, Clone, PartialEq)]
enum ContextValue {
    Leaf(Value),
    Nested(HashMap<String, ContextValue>),
}

impl Context {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value at a dotted path. Creates intermediate nested maps as needed.
    #[must_use]
    pub fn set(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.insert(path, value.into());
        self
    }

    /// Insert a value at a dotted path (mutable reference version).
    pub fn insert(&mut self, path: &str, value: Value) {
        let segments = split_path(path);
        Self::insert_recursive(&mut self.data, &segments, value);
    }

    /// Look up a value by dotted path.
    ///
    /// Returns `None` if the path does not exist or points to a nested map.
    /// If an unknown leaf is reached before the path is exhausted, an
    /// unknown value carrying that leaf's mark is returned.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Value> {
        let segments = split_path(path);
        Self::get_recursive(&self.data, &segments)
    }

    /// Whether anything at all is bound at or beneath `path`.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        let segments = split_path(path);
        let mut map = &self.data;
        for (i, segment) in segments.iter().enumerate() {
            match map.get(*segment) {
                None => return false,
                Some(ContextValue::Leaf(_)) => return true,
                Some(ContextValue::Nested(nested)) => {
                    if i + 1 == segments.len() {
                        return true;
                    }
                    map = nested;
                }
            }
        }
        !segments.is_empty()
    }

    /// Whether the context holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// All leaf paths and their values, sorted by path.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, &Value)> {
        let mut out = Vec::new();
        Self::collect(&self.data, "", &mut out);
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    fn collect<'a>(
        map: &'a HashMap<String, ContextValue>,
        prefix: &str,
        out: &mut Vec<(String, &'a Value)>,
    ) {
        for (key, entry) in map {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            match entry {
                ContextValue::Leaf(v) => out.push((path, v)),
                ContextValue::Nested(nested) => Self::collect(nested, &path, out),
            }
        }
    }

    fn insert_recursive(map: &mut HashMap<String, ContextValue>, segments: &[&str], value: Value) {
        match segments {
            [] => {}
            [last] => {
                map.insert((*last).to_owned(), ContextValue::Leaf(value));
            }
            [first, rest @ ..] => {
                let entry = map
                    .entry((*first).to_owned())
                    .or_insert_with(|| ContextValue::Nested(HashMap::new()));
                match entry {
                    ContextValue::Nested(nested) => {
                        Self::insert_recursive(nested, rest, value);
                    }
                    ContextValue::Leaf(_) => {
                        let mut nested = HashMap::new();
                        Self::insert_recursive(&mut nested, rest, value);
                        *entry = ContextValue::Nested(nested);
                    }
                }
            }
        }
    }

    fn get_recursive(map: &HashMap<String, ContextValue>, segments: &[&str]) -> Option<Value> {
        match segments {
            [] => None,
            [last] => match map.get(*last)? {
                ContextValue::Leaf(v) => Some(v.clone()),
                ContextValue::Nested(_) => None,
            },
            [first, rest @ ..] => match map.get(*first)? {
                ContextValue::Nested(nested) => Self::get_recursive(nested, rest),
                ContextValue::Leaf(v) if !v.is_known() => {
                    Some(Value::unknown().with_mark(v.is_sensitive()))
                }
                ContextValue::Leaf(_) => None,
            },
        }
    }
}

/// Split a dotted path on `.`, ignoring dots inside `[...]` index steps.
pub(crate) fn split_path(path: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0_usize;
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in path.char_indices() {
        match c {
            '"' if depth > 0 => in_quotes = !in_quotes,
            '[' if !in_quotes => depth += 1,
            ']' if !in_quotes => depth = depth.saturating_sub(1),
            '.' if depth == 0 => {
                out.push(&path[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&path[start..]);
    out
}
