//! Bidirectional casts between stored payloads and typed values.
//!
//! A cast translates between the storage form of a payload and the form
//! the typed settings struct serializes to. Casts run inside the mapper
//! pipeline: on save the cast runs before encryption, on load decryption
//! runs before the cast.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use scopeset_types::prelude::*;

/// Bidirectional transform between the stored and typed representations
/// of a property value.
///
/// `set(get(x))` must encode back to the same storage form whenever `x`
/// is already in canonical storage form.
pub trait Cast: Send + Sync {
	/// Storage form to typed form
	fn get(&self, payload: Value) -> ScResult<Value>;

	/// Typed form to storage form
	fn set(&self, value: Value) -> ScResult<Value>;
}

/// Stores RFC 3339 datetimes as Unix epoch seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeCast;

impl Cast for DateTimeCast {
	fn get(&self, payload: Value) -> ScResult<Value> {
		let secs = payload.as_i64().ok_or_else(|| {
			Error::Cast(format!("datetime payload is not an integer: {}", payload).into())
		})?;
		let datetime = DateTime::<Utc>::from_timestamp(secs, 0)
			.ok_or_else(|| Error::Cast(format!("datetime payload out of range: {}", secs).into()))?;

		Ok(Value::String(datetime.to_rfc3339_opts(SecondsFormat::Secs, true)))
	}

	fn set(&self, value: Value) -> ScResult<Value> {
		let raw = value.as_str().ok_or_else(|| {
			Error::Cast(format!("datetime value is not a string: {}", value).into())
		})?;
		let datetime = DateTime::parse_from_rfc3339(raw)
			.map_err(|err| Error::Cast(format!("invalid datetime '{}': {}", raw, err).into()))?;

		Ok(Value::from(datetime.timestamp()))
	}
}

/// Stores string lists as a single comma-separated string.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringListCast;

impl Cast for StringListCast {
	fn get(&self, payload: Value) -> ScResult<Value> {
		let raw = payload.as_str().ok_or_else(|| {
			Error::Cast(format!("string list payload is not a string: {}", payload).into())
		})?;

		if raw.is_empty() {
			return Ok(Value::Array(Vec::new()));
		}

		Ok(Value::Array(
			raw.split(',').map(|item| Value::String(item.trim().to_string())).collect(),
		))
	}

	fn set(&self, value: Value) -> ScResult<Value> {
		let Value::Array(items) = value else {
			return Err(Error::Cast(format!("string list value is not an array: {}", value).into()));
		};

		let mut parts = Vec::with_capacity(items.len());
		for item in items {
			match item {
				Value::String(part) => parts.push(part),
				other => {
					return Err(Error::Cast(
						format!("string list item is not a string: {}", other).into(),
					));
				}
			}
		}

		Ok(Value::String(parts.join(",")))
	}
}


// vim: ts=4
