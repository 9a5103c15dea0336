use thiserror::Error;

pub type Result<T, E = PropertyError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropertyError {
	/// The value was rejected by the property's contract or by one of
	/// the constraints installed by a dependent property.
	#[error("invalid value for {property}: {message}")]
	Validation { property: String, message: String },

	#[error("usage error on {property}: {error}")]
	Usage { property: String, error: UsageError },

	/// The contract contradicts itself and can never be satisfied as written.
	#[error("invalid configuration: {0}")]
	Configuration(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
	#[error("property is disposed")]
	Disposed,

	#[error("reentrant write of {value} while listeners are being notified")]
	Reentrant { value: String },

	#[error("property is already deferred, nested deferral is not supported")]
	NestedDeferral,

	#[error("property is not deferred")]
	NotDeferred,

	#[error("commit was already notified")]
	AlreadyCommitted,

	#[error("commit notified before its dependency: {0}")]
	CommitOrder(String),

	#[error("number has no range")]
	NoRange,

	#[error("listener is already registered")]
	DuplicateListener,

	#[error("name `{0}` is already registered")]
	DuplicateName(String),

	#[error("property has no name, instrumentation requires one")]
	Unnamed,
}

impl PropertyError {
	pub(crate) fn validation(property: &str, message: impl Into<String>) -> Self {
		PropertyError::Validation {
			property: property.to_owned(),
			message: message.into(),
		}
	}

	pub(crate) fn usage(property: &str, error: UsageError) -> Self {
		PropertyError::Usage {
			property: property.to_owned(),
			error,
		}
	}

	pub fn is_validation(&self) -> bool {
		matches!(self, PropertyError::Validation { .. })
	}

	pub fn usage_error(&self) -> Option<&UsageError> {
		match self {
			PropertyError::Usage { error, .. } => Some(error),
			_ => None,
		}
	}
}
