//! Scope model and property bag types.
//!
//! A scope is a `(team, user)` pair. Property values resolve through a
//! fixed precedence chain of up to four storage cells, most general to
//! most specific:
//!
//! ```text
//! (0, none) -> (team, none) -> (0, user) -> (team, user)
//! ```
//!
//! Layers whose precondition does not hold (no team, no user) are skipped
//! entirely. Merging happens per property name, never per record: a more
//! specific layer overrides only the names it actually stores.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Team (tenant) identifier. `TeamId(0)` denotes the global scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamId(pub u32);

/// User (sub-tenant) identifier. User ids are strictly positive; the
/// absence of a user layer is modelled as `Option<UserId>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub u32);

/// Ordered name/payload mapping. Keeps insertion order so exports follow
/// the declared property order of a group.
pub type PropertyBag = serde_json::Map<String, serde_json::Value>;

/// A `(team, user)` pair narrowing which override layers a read sees and
/// which single cell a write targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Scope {
	pub team_id: TeamId,
	pub user_id: Option<UserId>,
}

impl Scope {
	/// Global default scope: `(0, none)`.
	pub fn global() -> Self {
		Self { team_id: TeamId(0), user_id: None }
	}

	/// Team scope without a user layer.
	pub fn team(team_id: TeamId) -> Self {
		Self { team_id, user_id: None }
	}

	/// User scope without a team: stored at cell `(0, user)`.
	pub fn user(user_id: UserId) -> Self {
		Self { team_id: TeamId(0), user_id: Some(user_id) }
	}

	/// Fully qualified user-in-team scope.
	pub fn team_user(team_id: TeamId, user_id: UserId) -> Self {
		Self { team_id, user_id: Some(user_id) }
	}

	pub fn is_global(&self) -> bool {
		self.team_id.0 == 0 && self.user_id.is_none()
	}

	/// The precedence chain for this scope, most general first.
	///
	/// Each element is an exact storage cell; backends fetch the cells
	/// independently and merge them in this order with [`merge_layers`].
	pub fn layers(&self) -> Vec<Scope> {
		let mut layers = vec![Scope::global()];

		if self.team_id.0 > 0 {
			layers.push(Scope::team(self.team_id));
		}
		if let Some(user_id) = self.user_id {
			layers.push(Scope::user(user_id));
			if self.team_id.0 > 0 {
				layers.push(Scope::team_user(self.team_id, user_id));
			}
		}

		layers
	}

	/// The single most specific cell a write at this scope targets.
	pub fn write_target(&self) -> Scope {
		match (self.team_id.0, self.user_id) {
			(team, Some(user_id)) if team > 0 => Scope::team_user(self.team_id, user_id),
			(_, Some(user_id)) => Scope::user(user_id),
			(team, None) if team > 0 => Scope::team(self.team_id),
			_ => Scope::global(),
		}
	}
}

impl fmt::Display for Scope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.user_id {
			Some(user_id) => write!(f, "{}/{}", self.team_id.0, user_id.0),
			None => write!(f, "{}/-", self.team_id.0),
		}
	}
}

/// Merge per-layer property bags in precedence order: later (more
/// specific) layers overwrite earlier ones name by name.
pub fn merge_layers<I>(layers: I) -> PropertyBag
where
	I: IntoIterator<Item = PropertyBag>,
{
	let mut merged = PropertyBag::new();
	for layer in layers {
		for (name, payload) in layer {
			merged.insert(name, payload);
		}
	}
	merged
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn bag(entries: &[(&str, serde_json::Value)]) -> PropertyBag {
		entries.iter().map(|(name, value)| ((*name).to_string(), value.clone())).collect()
	}

	#[test]
	fn test_global_scope_has_one_layer() {
		assert_eq!(Scope::global().layers(), vec![Scope::global()]);
	}

	#[test]
	fn test_team_scope_layers() {
		let scope = Scope::team(TeamId(5));
		assert_eq!(scope.layers(), vec![Scope::global(), Scope::team(TeamId(5))]);
	}

	#[test]
	fn test_user_scope_layers() {
		let scope = Scope::user(UserId(9));
		assert_eq!(scope.layers(), vec![Scope::global(), Scope::user(UserId(9))]);
	}

	#[test]
	fn test_team_user_scope_has_four_layers() {
		let scope = Scope::team_user(TeamId(5), UserId(9));
		assert_eq!(
			scope.layers(),
			vec![
				Scope::global(),
				Scope::team(TeamId(5)),
				Scope::user(UserId(9)),
				Scope::team_user(TeamId(5), UserId(9)),
			]
		);
	}

	#[test]
	fn test_write_target_picks_most_specific_cell() {
		assert_eq!(Scope::global().write_target(), Scope::global());
		assert_eq!(Scope::team(TeamId(5)).write_target(), Scope::team(TeamId(5)));
		assert_eq!(Scope::user(UserId(9)).write_target(), Scope::user(UserId(9)));
		assert_eq!(
			Scope::team_user(TeamId(5), UserId(9)).write_target(),
			Scope::team_user(TeamId(5), UserId(9))
		);
	}

	#[test]
	fn test_merge_overwrites_per_name() {
		let merged = merge_layers([
			bag(&[("site_name", json!("Acme")), ("max_users", json!(10))]),
			bag(&[("max_users", json!(50))]),
		]);

		assert_eq!(merged.get("site_name"), Some(&json!("Acme")));
		assert_eq!(merged.get("max_users"), Some(&json!(50)));
	}

	#[test]
	fn test_merge_empty_layers_contribute_nothing() {
		let merged = merge_layers([bag(&[("a", json!(1))]), PropertyBag::new()]);
		assert_eq!(merged.len(), 1);
	}
}

// vim: ts=4
