//! Central error type shared by the core services and the storage backends.

use std::fmt;

pub type ScResult<T> = std::result::Result<T, Error>;

/// Which mapper operation was in progress when the declared property set
/// came up incomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
	Loading,
	Saving,
}

impl fmt::Display for Operation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Operation::Loading => write!(f, "loading"),
			Operation::Saving => write!(f, "saving"),
		}
	}
}

#[derive(Debug)]
pub enum Error {
	/// The declared property set of a group is not fully satisfied by the
	/// merged or supplied values. Not retried, surfaced to the caller.
	MissingSettings { group: Box<str>, names: Vec<Box<str>>, operation: Operation },
	NotFound,
	/// Backend-level connectivity or constraint error, message preserved.
	Store(Box<str>),
	Json(Box<str>),
	Cast(Box<str>),
	Crypto(Box<str>),
	Config(Box<str>),

	// externals
	Io(std::io::Error),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::MissingSettings { group, names, operation } => {
				write!(
					f,
					"missing settings for group '{}' while {}: {}",
					group,
					operation,
					names.join(", ")
				)
			}
			Error::NotFound => write!(f, "not found"),
			Error::Store(msg) => write!(f, "store error: {}", msg),
			Error::Json(msg) => write!(f, "json error: {}", msg),
			Error::Cast(msg) => write!(f, "cast error: {}", msg),
			Error::Crypto(msg) => write!(f, "crypto error: {}", msg),
			Error::Config(msg) => write!(f, "config error: {}", msg),
			Error::Io(err) => write!(f, "io error: {}", err),
		}
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Error::Io(err) => Some(err),
			_ => None,
		}
	}
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Self::Io(err)
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Self::Json(err.to_string().into())
	}
}

impl Error {
	/// Build a `MissingSettings` error from the declared names absent in a bag.
	pub fn missing_settings<G, I, N>(group: G, names: I, operation: Operation) -> Self
	where
		G: Into<Box<str>>,
		I: IntoIterator<Item = N>,
		N: Into<Box<str>>,
	{
		Error::MissingSettings {
			group: group.into(),
			names: names.into_iter().map(Into::into).collect(),
			operation,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_missing_settings_display() {
		let err = Error::missing_settings("general", ["site_name", "max_users"], Operation::Loading);
		assert_eq!(
			err.to_string(),
			"missing settings for group 'general' while loading: site_name, max_users"
		);
	}

	#[test]
	fn test_operation_display() {
		assert_eq!(Operation::Loading.to_string(), "loading");
		assert_eq!(Operation::Saving.to_string(), "saving");
	}
}

// vim: ts=4
