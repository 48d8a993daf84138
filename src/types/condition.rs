use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use super::address::Checkable;

/// Public-facing tag for the kind of condition a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionType {
    InvalidCondition,
    ResourcePrecondition,
    ResourcePostcondition,
    OutputPrecondition,
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionType::InvalidCondition => write!(f, "InvalidCondition"),
            ConditionType::ResourcePrecondition => write!(f, "ResourcePrecondition"),
            ConditionType::ResourcePostcondition => write!(f, "ResourcePostcondition"),
            ConditionType::OutputPrecondition => write!(f, "OutputPrecondition"),
        }
    }
}

/// The outcome of evaluating one condition rule.
///
/// When `unknown` is set, `result` and `error_message` carry no meaning and
/// must not be reported as a failure. When a known result is `false`,
/// `error_message` is never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionResult {
    pub address: Checkable,
    pub result: bool,
    pub unknown: bool,
    pub condition_type: ConditionType,
    pub error_message: String,
}

impl ConditionResult {
    /// A result that has not been determined yet.
    #[must_use]
    pub fn pending(address: Checkable, condition_type: ConditionType) -> Self {
        Self {
            address,
            result: false,
            unknown: true,
            condition_type,
            error_message: String::new(),
        }
    }

    /// Whether this result is a known failure.
    #[must_use]
    pub fn failed(&self) -> bool {
        !self.unknown && !self.result
    }
}

/// Condition results keyed by rule address, e.g.
/// `aws_instance.web.postconditions[0]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    results: HashMap<String, ConditionResult>,
}

impl Conditions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap this map for concurrent writes during a walk.
    #[must_use]
    pub fn sync_wrapper(self) -> ConditionsSync {
        ConditionsSync {
            results: Mutex::new(self),
        }
    }

    pub fn insert(&mut self, rule_addr: impl Into<String>, result: ConditionResult) {
        self.results.insert(rule_addr.into(), result);
    }

    #[must_use]
    pub fn get(&self, rule_addr: &str) -> Option<&ConditionResult> {
        self.results.get(rule_addr)
    }

    /// Iterate over `(rule address, result)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConditionResult)> {
        self.results.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Run-scoped, thread-safe store of condition results.
///
/// Created at the start of a walk and handed to every evaluation through the
/// [`EvalContext`](crate::EvalContext). Writes are serialized by a single
/// lock; later writes to the same rule address replace earlier ones.
#[derive(Debug, Default)]
pub struct ConditionsSync {
    results: Mutex<Conditions>,
}

impl ConditionsSync {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one rule, replacing any earlier outcome for the
    /// same address.
    ///
    /// # Panics
    ///
    /// Panics if another writer panicked while holding the lock. The walk is
    /// already broken at that point and continuing would record results
    /// against a store nobody can trust.
    pub fn set_result(&self, rule_addr: &str, result: ConditionResult) {
        self.lock().insert(rule_addr, result);
    }

    /// A copy of the current result for `rule_addr`, if any.
    #[must_use]
    pub fn get(&self, rule_addr: &str) -> Option<ConditionResult> {
        self.lock().get(rule_addr).cloned()
    }

    /// A copy of every result recorded so far.
    #[must_use]
    pub fn snapshot(&self) -> Conditions {
        self.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Consume the store once the walk has finished.
    ///
    /// # Panics
    ///
    /// Panics if a writer panicked while holding the lock.
    #[must_use]
    pub fn into_conditions(self) -> Conditions {
        match self.results.into_inner() {
            Ok(conditions) => conditions,
            Err(_) => panic!("condition result store poisoned by a panicking writer"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Conditions> {
        match self.results.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("condition result store poisoned by a panicking writer"),
        }
    }
}
