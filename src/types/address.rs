use std::fmt;

/// Whether a resource is managed or read from a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceMode {
    Managed,
    Data,
}

/// A resource within a module, e.g. `aws_instance.web` or `data.aws_ami.base`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Resource {
    pub mode: ResourceMode,
    pub type_name: String,
    pub name: String,
}

impl Resource {
    #[must_use]
    pub fn managed(type_name: &str, name: &str) -> Self {
        Self {
            mode: ResourceMode::Managed,
            type_name: type_name.to_owned(),
            name: name.to_owned(),
        }
    }

    #[must_use]
    pub fn data(type_name: &str, name: &str) -> Self {
        Self {
            mode: ResourceMode::Data,
            type_name: type_name.to_owned(),
            name: name.to_owned(),
        }
    }

    #[must_use]
    pub fn instance(self, key: InstanceKey) -> ResourceInstance {
        ResourceInstance {
            resource: self,
            key,
        }
    }
}

/// The `count`/`for_each` key of one instance among many.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum InstanceKey {
    #[default]
    NoKey,
    Int(i64),
    String(String),
}

/// A single instance of a resource within a module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceInstance {
    pub resource: Resource,
    pub key: InstanceKey,
}

impl ResourceInstance {
    #[must_use]
    pub fn absolute(self, module: ModuleInstance) -> AbsResourceInstance {
        AbsResourceInstance {
            module,
            resource: self,
        }
    }
}

/// One `module.<name>[<key>]` step of a module path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleInstanceStep {
    pub name: String,
    pub key: InstanceKey,
}

/// A path of module calls from the root module. Empty for the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ModuleInstance(pub Vec<ModuleInstanceStep>);

impl ModuleInstance {
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn child(mut self, name: &str, key: InstanceKey) -> Self {
        self.0.push(ModuleInstanceStep {
            name: name.to_owned(),
            key,
        });
        self
    }
}

/// A resource instance qualified by its module path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AbsResourceInstance {
    pub module: ModuleInstance,
    pub resource: ResourceInstance,
}

/// A named output value within a module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputValue {
    pub name: String,
}

impl OutputValue {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
        }
    }

    #[must_use]
    pub fn absolute(self, module: ModuleInstance) -> AbsOutputValue {
        AbsOutputValue {
            module,
            output: self,
        }
    }
}

/// An output value qualified by its module path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AbsOutputValue {
    pub module: ModuleInstance,
    pub output: OutputValue,
}

/// The kinds of object that can own condition rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckableKind {
    ResourceInstance,
    OutputValue,
}

/// The owner of a list of condition rules.
///
/// Matching is exhaustive, so adding a new owner kind is a compile-time
/// checked change everywhere addresses are dispatched on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Checkable {
    ResourceInstance(AbsResourceInstance),
    OutputValue(AbsOutputValue),
}

impl Checkable {
    #[must_use]
    pub fn kind(&self) -> CheckableKind {
        match self {
            Checkable::ResourceInstance(_) => CheckableKind::ResourceInstance,
            Checkable::OutputValue(_) => CheckableKind::OutputValue,
        }
    }
}

impl From<AbsResourceInstance> for Checkable {
    fn from(addr: AbsResourceInstance) -> Self {
        Checkable::ResourceInstance(addr)
    }
}

impl From<AbsOutputValue> for Checkable {
    fn from(addr: AbsOutputValue) -> Self {
        Checkable::OutputValue(addr)
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceKey::NoKey => Ok(()),
            InstanceKey::Int(i) => write!(f, "[{i}]"),
            InstanceKey::String(s) => write!(f, "[\"{s}\"]"),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            ResourceMode::Managed => write!(f, "{}.{}", self.type_name, self.name),
            ResourceMode::Data => write!(f, "data.{}.{}", self.type_name, self.name),
        }
    }
}

impl fmt::Display for ResourceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.resource, self.key)
    }
}

impl fmt::Display for ModuleInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "module.{}{}", step.name, step.key)?;
        }
        Ok(())
    }
}

impl fmt::Display for AbsResourceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.module.is_root() {
            write!(f, "{}", self.resource)
        } else {
            write!(f, "{}.{}", self.module, self.resource)
        }
    }
}

impl fmt::Display for AbsOutputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.module.is_root() {
            write!(f, "output.{}", self.output.name)
        } else {
            write!(f, "{}.output.{}", self.module, self.output.name)
        }
    }
}

impl fmt::Display for Checkable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Checkable::ResourceInstance(addr) => write!(f, "{addr}"),
            Checkable::OutputValue(addr) => write!(f, "{addr}"),
        }
    }
}
