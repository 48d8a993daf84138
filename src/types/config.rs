use super::address::Resource;
use super::expr::{Expression, SourceRange};
use super::rule::CheckRule;

/// A `resource` or `data` block and the conditions declared in its
/// `lifecycle` block.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceConfig {
    pub resource: Resource,
    pub attributes: Vec<(String, Expression)>,
    pub preconditions: Vec<CheckRule>,
    pub postconditions: Vec<CheckRule>,
    pub decl_range: SourceRange,
}

impl ResourceConfig {
    /// The expression assigned to a top-level attribute, if any.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Expression> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, e)| e)
    }
}

/// An `output` block.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub name: String,
    pub value: Option<Expression>,
    pub preconditions: Vec<CheckRule>,
    pub decl_range: SourceRange,
}

/// A validated set of condition-bearing blocks.
///
/// Built with [`Config::from_source`] or [`Config::from_file`]. Blocks keep
/// their declared order so rule indexes match the source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub(crate) resources: Vec<ResourceConfig>,
    pub(crate) outputs: Vec<OutputConfig>,
}

impl Config {
    /// Parse and validate configuration source text. `filename` is only used
    /// in source ranges.
    ///
    /// # Errors
    ///
    /// Returns [`CondcheckError`](crate::CondcheckError) on parse or
    /// validation failure.
    pub fn from_source(input: &str, filename: &str) -> Result<Self, crate::CondcheckError> {
        let parsed = crate::parse::parse_config(input, filename)?;
        let config = crate::validate::validate(parsed)?;
        Ok(config)
    }

    /// Read a configuration file, then parse and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`CondcheckError`](crate::CondcheckError) on I/O, parse, or
    /// validation failure.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::CondcheckError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)?;
        Self::from_source(&input, &path.display().to_string())
    }

    #[must_use]
    pub fn resources(&self) -> &[ResourceConfig] {
        &self.resources
    }

    #[must_use]
    pub fn outputs(&self) -> &[OutputConfig] {
        &self.outputs
    }

    #[must_use]
    pub fn resource(&self, resource: &Resource) -> Option<&ResourceConfig> {
        self.resources.iter().find(|r| r.resource == *resource)
    }

    #[must_use]
    pub fn output(&self, name: &str) -> Option<&OutputConfig> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// Total number of condition rules across all blocks.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        let resources: usize = self
            .resources
            .iter()
            .map(|r| r.preconditions.len() + r.postconditions.len())
            .sum();
        let outputs: usize = self.outputs.iter().map(|o| o.preconditions.len()).sum();
        resources + outputs
    }
}
