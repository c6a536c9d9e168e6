//! Error types
//!
//! Three families, matching how each failure is surfaced:
//! - `ConfigError`: bank construction failed; returned from initialization
//! - `DispatchError`: a single member failed during a handler pass; logged, never propagated
//! - `ConstructError`: an object constructor could not build an area's objects
//!
//! Lookup misses (unknown area, missing route) are not errors - they come back
//! as `bool` / `Option`.

use thiserror::Error;

/// Failure while building area banks from a declarative description.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An area line has an empty name field.
    #[error("line {line}: area descriptor is missing the area name")]
    MissingAreaName {
        /// 1-based source line (0 when the descriptor didn't come from text).
        line: usize,
    },

    /// An area line has more than four `#`-separated fields.
    #[error("line {line}: too many fields in area descriptor `{content}`")]
    TooManyFields {
        /// 1-based source line.
        line: usize,
        /// The offending line.
        content: String,
    },

    /// A bank scope marker without a name.
    #[error("line {line}: bank scope marker without a bank name")]
    EmptyBankName {
        /// 1-based source line (0 when the manifest didn't come from text).
        line: usize,
    },

    /// Two areas with the same name in one bank.
    #[error("area `{area}` is defined twice in bank `{bank}`")]
    DuplicateArea {
        /// Bank containing the duplicate.
        bank: String,
        /// Duplicated area name.
        area: String,
    },

    /// The same bank is declared twice.
    #[error("bank `{0}` is declared twice")]
    DuplicateBank(String),

    /// A recording refers to a bank that was never initialized.
    #[error("unknown area bank `{0}`")]
    UnknownBank(String),

    /// A recording refers to an area its bank doesn't have.
    #[error("bank `{bank}` has no area `{area}`")]
    UnknownArea {
        /// Bank the area was looked up in.
        bank: String,
        /// Missing area name.
        area: String,
    },

    /// Reading the description failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A RON manifest could not be parsed.
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// A manifest could not be written as RON.
    #[error("RON serialize error: {0}")]
    RonSerialize(#[from] ron::Error),
}

/// Failure reported by one member during a dispatch pass.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The member could not handle the operation.
    #[error("member failed: {0}")]
    Failed(String),

    /// The member's object constructor failed.
    #[error(transparent)]
    Construct(#[from] ConstructError),
}

impl DispatchError {
    /// Shorthand for [`DispatchError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        DispatchError::Failed(message.into())
    }
}

/// Failure while constructing the objects of an area.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructError {
    /// The object constructor file could not be found.
    #[error("object constructor file not found: {0}")]
    MissingFile(String),

    /// One construction instruction could not be carried out.
    #[error("invalid construction instruction `{instruction}`: {message}")]
    InvalidInstruction {
        /// The instruction that failed.
        instruction: String,
        /// Why it failed.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::TooManyFields {
            line: 3,
            content: "a#b#c#d#e".into(),
        };
        assert_eq!(
            err.to_string(),
            "line 3: too many fields in area descriptor `a#b#c#d#e`"
        );

        let err = ConfigError::DuplicateArea {
            bank: "test".into(),
            area: "area1".into(),
        };
        assert_eq!(err.to_string(), "area `area1` is defined twice in bank `test`");

        let err = ConfigError::UnknownArea {
            bank: "world".into(),
            area: "vault".into(),
        };
        assert_eq!(err.to_string(), "bank `world` has no area `vault`");
        assert_eq!(ConfigError::UnknownBank("moon".into()).to_string(), "unknown area bank `moon`");
    }

    #[test]
    fn test_construct_error_converts_to_dispatch_error() {
        let err: DispatchError = ConstructError::MissingFile("objects.txt".into()).into();
        assert_eq!(
            err.to_string(),
            "object constructor file not found: objects.txt"
        );
        assert!(matches!(err, DispatchError::Construct(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ConfigError = io.into();
        assert!(err.to_string().starts_with("I/O error"));
    }
}
