//! Error type for composition and object-model operations
//!
//! Every fatal condition the engine can raise lives in [`ComposeError`].
//! Messages always name the member involved so a failure can be located;
//! procedures that do not know which name they are bound to leave the member
//! empty and callers fill it in with [`ComposeError::with_member`].

/// Placeholder used when a failing procedure does not know its binding.
const UNKNOWN_MEMBER: &str = "<anonymous>";

/// Unified error type for the composition engine
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComposeError {
    /// A composition argument was absent or not a function/object
    #[error("compose arguments must be functions or objects (argument {position} was {found})")]
    InvalidCompositionInput {
        /// Zero-based position of the offending argument
        position: usize,
        /// Kind of value that was supplied
        found: String,
    },

    /// Two unrelated traits supplied the same member and nobody resolved it
    #[error(
        "conflicted method `{member}`, final composer must explicitly override with correct method"
    )]
    UnresolvedMemberConflict {
        /// Member name
        member: String,
    },

    /// A required member was invoked before an implementation was provided
    #[error("member `{}` is required and no implementation has been provided", display_member(.member))]
    UnfulfilledRequirement {
        /// Member name, when known
        member: Option<String>,
    },

    /// A decorator was called directly instead of being installed
    #[error("decorator not applied for member `{}`", display_member(.member))]
    DecoratorNotApplied {
        /// Member name, when known
        member: Option<String>,
    },

    /// An alias decorator could not find its source member
    #[error("source method `{source_member}` was not available to be renamed to `{target}`")]
    AliasResolutionFailure {
        /// Member that was looked up
        source_member: String,
        /// Name the alias was to be installed under
        target: String,
    },

    /// A member was invoked but does not hold a procedure
    #[error("member `{member}` is not callable")]
    NotCallable {
        /// Member name
        member: String,
    },

    /// Assignment to a read-only data member or an accessor without setter
    #[error("cannot assign to read-only member `{member}`")]
    ReadOnlyMember {
        /// Member name
        member: String,
    },

    /// Redefinition of a non-configurable member
    #[error("cannot redefine non-configurable member `{member}`")]
    NotConfigurable {
        /// Member name
        member: String,
    },

    /// A descriptor object mixed data and accessor fields or had bad field types
    #[error("invalid descriptor for `{member}`: {reason}")]
    InvalidDescriptor {
        /// Member name
        member: String,
        /// What was wrong with it
        reason: String,
    },

    /// Configuration could not be parsed or failed validation
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Error message describing the configuration problem
        message: String,
    },

    /// Failure raised by an application procedure
    #[error("{message}")]
    Thrown {
        /// Error message supplied by the procedure
        message: String,
    },
}

fn display_member(member: &Option<String>) -> &str {
    member.as_deref().unwrap_or(UNKNOWN_MEMBER)
}

impl ComposeError {
    /// Create an error raised by application code
    pub fn thrown(message: impl Into<String>) -> Self {
        Self::Thrown {
            message: message.into(),
        }
    }

    /// Create an invalid composition input error
    pub fn invalid_input(position: usize, found: impl Into<String>) -> Self {
        Self::InvalidCompositionInput {
            position,
            found: found.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an invalid descriptor error
    pub fn invalid_descriptor(member: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            member: member.into(),
            reason: reason.into(),
        }
    }

    /// Fill in the member name on errors raised by an unbound procedure.
    ///
    /// Errors that already name a member are returned unchanged.
    pub fn with_member(self, name: &str) -> Self {
        match self {
            Self::UnfulfilledRequirement { member: None } => Self::UnfulfilledRequirement {
                member: Some(name.to_string()),
            },
            Self::DecoratorNotApplied { member: None } => Self::DecoratorNotApplied {
                member: Some(name.to_string()),
            },
            other => other,
        }
    }

    /// The member this error refers to, if any
    pub fn member(&self) -> Option<&str> {
        match self {
            Self::UnresolvedMemberConflict { member }
            | Self::NotCallable { member }
            | Self::ReadOnlyMember { member }
            | Self::NotConfigurable { member }
            | Self::InvalidDescriptor { member, .. } => Some(member),
            Self::UnfulfilledRequirement { member } | Self::DecoratorNotApplied { member } => {
                member.as_deref()
            }
            Self::AliasResolutionFailure { target, .. } => Some(target),
            Self::InvalidCompositionInput { .. }
            | Self::InvalidConfig { .. }
            | Self::Thrown { .. } => None,
        }
    }
}

/// Standard Result type for composition operations
pub type Result<T> = std::result::Result<T, ComposeError>;

impl From<toml::de::Error> for ComposeError {
    fn from(err: toml::de::Error) -> Self {
        Self::invalid_config(err.to_string())
    }
}

impl From<std::io::Error> for ComposeError {
    fn from(err: std::io::Error) -> Self {
        Self::invalid_config(err.to_string())
    }
}
