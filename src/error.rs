//! Construction errors and call-time warnings.

use std::fmt;

/// Fatal error raised while constructing a [`CachedSelector`](crate::CachedSelector).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	/// A required function was not supplied to the builder.
	#[error("invalid arguments passed to cached selector: {0}")]
	InvalidArgument(&'static str),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Non-fatal condition reported while a cached selector is being called.
///
/// Warnings never abort a call. They are logged through `tracing` and handed to the
/// optional hook registered with
/// [`CachedSelectorBuilder::on_warning`](crate::CachedSelectorBuilder::on_warning),
/// but only in [`Mode::Development`](crate::Mode::Development).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
	/// The dependents extractor returned an empty record. The call returned `None`.
	InvalidDependents,
	/// A positional argument is a composite value whose key form is unlikely to be stable.
	UnstableArgument {
		/// Position of the first composite argument.
		index: usize,
	},
}

impl fmt::Display for Warning {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Warning::InvalidDependents => {
				f.write_str("getDependents must return a non-empty dependents record")
			}
			Warning::UnstableArgument {
				index,
			} => write!(
				f,
				"do not pass complex objects as arguments to a cached selector (argument {index})"
			),
		}
	}
}
