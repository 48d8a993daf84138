use thiserror::Error;

/// Static validation failures for a parsed [`Config`](super::Config).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("duplicate resource block '{address}'")]
    DuplicateResource { address: String },

    #[error("duplicate output block '{name}'")]
    DuplicateOutput { name: String },

    #[error("{block} block {index} in '{owner}' is missing the '{attribute}' argument")]
    MissingArgument {
        owner: String,
        block: &'static str,
        index: usize,
        attribute: &'static str,
    },

    #[error("{block} block {index} in '{owner}' refers to 'self', which is only available in postconditions")]
    SelfInPrecondition {
        owner: String,
        block: &'static str,
        index: usize,
    },
}

/// A value could not be converted to the type an operation required.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("a bool is required")]
    BoolRequired,

    #[error("a string is required")]
    StringRequired,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_resource_message() {
        let err = ConfigError::DuplicateResource {
            address: "aws_instance.web".into(),
        };
        assert_eq!(err.to_string(), "duplicate resource block 'aws_instance.web'");
    }

    #[test]
    fn duplicate_output_message() {
        let err = ConfigError::DuplicateOutput { name: "id".into() };
        assert_eq!(err.to_string(), "duplicate output block 'id'");
    }

    #[test]
    fn missing_argument_message() {
        let err = ConfigError::MissingArgument {
            owner: "output.id".into(),
            block: "precondition",
            index: 0,
            attribute: "error_message",
        };
        assert_eq!(
            err.to_string(),
            "precondition block 0 in 'output.id' is missing the 'error_message' argument"
        );
    }

    #[test]
    fn self_in_precondition_message() {
        let err = ConfigError::SelfInPrecondition {
            owner: "aws_instance.web".into(),
            block: "precondition",
            index: 1,
        };
        assert_eq!(
            err.to_string(),
            "precondition block 1 in 'aws_instance.web' refers to 'self', which is only available in postconditions"
        );
    }

    #[test]
    fn conversion_messages() {
        assert_eq!(ConversionError::BoolRequired.to_string(), "a bool is required");
        assert_eq!(
            ConversionError::StringRequired.to_string(),
            "a string is required"
        );
    }
}
