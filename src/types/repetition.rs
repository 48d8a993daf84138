use super::address::InstanceKey;
use super::Value;

/// The `count.index`, `each.key`, and `each.value` values available to one
/// instance of a repeated resource.
///
/// A resource without `count` or `for_each` has none of them set, and any
/// reference to `count` or `each` from its conditions is an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepetitionData {
    pub count_index: Option<Value>,
    pub each_key: Option<Value>,
    pub each_value: Option<Value>,
}

impl RepetitionData {
    /// No repetition.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// The instance at `index` of a `count` resource.
    #[must_use]
    pub fn count(index: i64) -> Self {
        Self {
            count_index: Some(Value::from(index)),
            ..Self::default()
        }
    }

    /// The instance at `key` of a `for_each` resource.
    #[must_use]
    pub fn for_each(key: &str, value: impl Into<Value>) -> Self {
        Self {
            each_key: Some(Value::from(key)),
            each_value: Some(value.into()),
            ..Self::default()
        }
    }

    /// Derive the data implied by an instance key. `for_each` values are
    /// left unknown since the key alone does not carry them.
    #[must_use]
    pub fn from_key(key: &InstanceKey) -> Self {
        match key {
            InstanceKey::NoKey => Self::none(),
            InstanceKey::Int(i) => Self::count(*i),
            InstanceKey::String(s) => Self::for_each(s, Value::unknown()),
        }
    }

    #[must_use]
    pub fn is_counted(&self) -> bool {
        self.count_index.is_some()
    }

    #[must_use]
    pub fn is_for_each(&self) -> bool {
        self.each_key.is_some() || self.each_value.is_some()
    }
}
