//! Error types for clause construction and compilation.

/// Errors raised while building, transforming or compiling clause trees.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed construction input.
    #[error("Argument error: {message}")]
    Argument {
        /// Description naming the offending construct.
        message: String,
    },

    /// A structural problem only detectable while rendering SQL.
    #[error("Compile error: {message}")]
    Compile {
        /// Description naming the offending construct.
        message: String,
    },

    /// A node kind with no renderer reached the compiler.
    #[error("No such visit method: the {dialect} compiler can't render element of kind '{kind}'")]
    UnsupportedCompilation {
        /// Visit name of the element.
        kind: String,
        /// Dialect the statement was compiled for.
        dialect: String,
    },

    /// A well-formed request that is invalid for the current state.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description naming the offending construct.
        message: String,
    },

    /// Invalid dialect configuration document.
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn argument(message: impl Into<String>) -> Self {
        Self::Argument {
            message: message.into(),
        }
    }

    pub(crate) fn compile(message: impl Into<String>) -> Self {
        Self::Compile {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }
}

/// Result type for clause operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_construct() {
        let err = Error::argument("Can't find any foreign key relationships between 'a' and 'b'");
        assert_eq!(
            err.to_string(),
            "Argument error: Can't find any foreign key relationships between 'a' and 'b'"
        );

        let err = Error::UnsupportedCompilation {
            kind: String::from("my_element"),
            dialect: String::from("sqlite"),
        };
        assert!(err.to_string().contains("my_element"));
        assert!(err.to_string().contains("sqlite"));
    }

    #[test]
    fn test_config_error_from_serde() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::Config(_)));
    }
}
